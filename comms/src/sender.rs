//! The sending end of a connection.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::Serialize;

/// The sending end handle of the communication.
pub struct Sender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> Sender<W> {
    /// Creates a new `Sender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Sends `msg` through the inner writer as a single encoded buffer.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// The amount of bytes written or an `io::Error` on failure.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> io::Result<usize> {
        let Self { buf, tx } = self;

        buf.clear();
        msg.serialize(buf);

        tx.write_all(buf).await?;
        tx.flush().await?;
        Ok(buf.len())
    }
}
