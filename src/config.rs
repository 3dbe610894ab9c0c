use std::{
    fmt,
    num::{NonZeroU16, NonZeroUsize},
    time::Duration,
};

use crate::error::ConfigError;

/// How long a worker waits for the server's reply by default.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable settings shared by every worker of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    host: String,
    port: NonZeroU16,
    clients: NonZeroUsize,
    recv_timeout: Duration,
}

impl RunConfig {
    /// Creates a new run configuration, validating the raw values.
    ///
    /// # Arguments
    /// * `host` - The server's ip address or host name.
    /// * `port` - The server's port, must be in `1..=65535`.
    /// * `clients` - The amount of concurrent clients, must be positive.
    ///
    /// # Errors
    /// A `ConfigError` naming the first invalid value.
    pub fn new(host: impl Into<String>, port: i64, clients: i64) -> Result<Self, ConfigError> {
        let clients = usize::try_from(clients)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::InvalidClientCount(clients))?;

        let port = u16::try_from(port)
            .ok()
            .and_then(NonZeroU16::new)
            .ok_or(ConfigError::InvalidPort(port))?;

        Ok(Self {
            host: host.into(),
            port,
            clients,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        })
    }

    /// Builds the configuration from the positional command line arguments
    /// `<server-ip> <server-port> <client-count>`, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let host = args
            .next()
            .ok_or(ConfigError::MissingArgument("server ip"))?;
        let port = args
            .next()
            .ok_or(ConfigError::MissingArgument("server port"))?;
        let clients = args
            .next()
            .ok_or(ConfigError::MissingArgument("number of clients"))?;

        let clients = parse_number("number of clients", &clients)?;
        let port = parse_number("server port", &port)?;
        Self::new(host, port, clients)
    }

    /// Replaces the time a worker waits for the reply.
    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port.get()
    }

    pub fn clients(&self) -> usize {
        self.clients.get()
    }

    pub(crate) fn client_slots(&self) -> NonZeroUsize {
        self.clients
    }

    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    /// The server address in `host:port` form.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "server ip: {}", self.host)?;
        writeln!(f, "server port: {}", self.port)?;
        write!(f, "number of clients: {}", self.clients)
    }
}

fn parse_number(what: &'static str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::NotANumber {
        what,
        got: raw.to_string(),
    })
}
