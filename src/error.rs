use std::{error::Error, fmt, io};

use comms::DecodeError;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Invalid run settings, caught before any connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingArgument(&'static str),
    NotANumber { what: &'static str, got: String },
    InvalidClientCount(i64),
    InvalidPort(i64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument(what) => write!(f, "missing argument: {what}"),
            Self::NotANumber { what, got } => write!(f, "the {what} must be a number, got: {got}"),
            Self::InvalidClientCount(got) => {
                write!(f, "the number of clients needs to be a number > 0, got: {got}")
            }
            Self::InvalidPort(got) => {
                write!(f, "the server port needs to be >0 and <={}, got: {got}", u16::MAX)
            }
        }
    }
}

impl Error for ConfigError {}

/// Failures of a single connection worker.
///
/// None of them is fatal for the run, they only leave the worker's slot unset.
#[derive(Debug)]
pub enum WorkerErr {
    /// Couldn't reach the server.
    Connect { addr: String, source: io::Error },
    /// Writing the request or reading the reply failed.
    Io(io::Error),
    /// The peer closed the connection without replying.
    NoResponse,
    /// The peer didn't reply within the receive timeout.
    Timeout,
    /// The reply didn't have the protocol's fixed size.
    BadLength { got: usize, expected: usize },
    /// The reply failed verification or carried another command.
    Decode(DecodeError),
    /// The worker's slot had already been written.
    AlreadyRecorded { worker_id: usize },
    /// The worker id has no slot in the results.
    UnknownSlot { worker_id: usize, size: usize },
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { addr, source } => write!(f, "failed to connect to {addr}: {source}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::NoResponse => f.write_str("no response"),
            Self::Timeout => f.write_str("timed out waiting for a response"),
            Self::BadLength { got, expected } => {
                write!(f, "response length mismatch: got {got}, expected {expected}")
            }
            Self::Decode(e) => write!(f, "invalid response: {e}"),
            Self::AlreadyRecorded { worker_id } => {
                write!(f, "result of worker {worker_id} was already recorded")
            }
            Self::UnknownSlot { worker_id, size } => {
                write!(f, "worker {worker_id} has no result slot, there are {size}")
            }
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DecodeError> for WorkerErr {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl WorkerErr {
    /// Whether the failure happened before the connection was established.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}
