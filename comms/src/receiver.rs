use std::io;

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::{self, Instant},
};

/// Why a frame read stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    /// The caller's buffer is full, more bytes may follow.
    Full,
    /// The peer closed its end.
    Closed,
    /// The deadline passed before the buffer filled or the peer closed.
    Expired,
}

/// The outcome of `Receiver::recv_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Amount of bytes written into the caller's buffer.
    pub len: usize,
    pub end: FrameEnd,
}

/// The receiving end handle of the communication.
///
/// The protocol has no length prefix, a message is whatever the peer wrote
/// before closing its end, filling the caller's buffer or running out of time.
pub struct Receiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> Receiver<R> {
    /// Creates a new `Receiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Reads into `buf` until it's full, the peer closes the connection or
    /// `deadline` passes.
    ///
    /// Bytes read before the deadline are kept, the frame's `end` tells the
    /// caller which condition stopped the read.
    ///
    /// # Arguments
    /// * `buf` - The destination, its length is the maximum frame size.
    /// * `deadline` - When to stop waiting for more bytes.
    ///
    /// # Returns
    /// The received `Frame` or an `io::Error` if the read failed.
    pub async fn recv_frame(&mut self, buf: &mut [u8], deadline: Instant) -> io::Result<Frame> {
        let mut len = 0;

        while len < buf.len() {
            let Ok(read) = time::timeout_at(deadline, self.rx.read(&mut buf[len..])).await else {
                return Ok(Frame {
                    len,
                    end: FrameEnd::Expired,
                });
            };

            match read? {
                0 => {
                    return Ok(Frame {
                        len,
                        end: FrameEnd::Closed,
                    });
                }
                n => len += n,
            }
        }

        Ok(Frame {
            len,
            end: FrameEnd::Full,
        })
    }
}
