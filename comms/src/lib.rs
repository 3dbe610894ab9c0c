//! Wire codec for the `MnistProt` inference protocol.
//!
//! Messages are FlatBuffers encoded `Commands` tables. Requests carry a
//! 28x28 digit as 784 floats, responses carry the class scores together with
//! the time the peer spent running the inference.

mod deserialize;
mod error;
pub mod mnist_prot;
pub mod msg;
mod receiver;
mod sender;
mod serialize;

use std::borrow::Cow;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use error::DecodeError;
pub use msg::{Command, InferenceOutput, Msg, Stats};
pub use receiver::{Frame, FrameEnd, Receiver};
pub use sender::Sender;
pub use serialize::Serialize;

/// Amount of pixels in a single digit.
pub const DIGIT_SIZE: usize = 784;
/// Encoded size of an inference request for a full digit.
pub const REQUEST_CAPACITY: usize = 3180;
/// Encoded size of every inference response.
pub const RESPONSE_SIZE: usize = 96;

/// A decoded inference response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The time the peer spent on the inference, in milliseconds.
    pub timer_ms: f32,
    /// The score of each class.
    pub output: Vec<f32>,
}

impl Response {
    /// Index of the class with the highest score.
    pub fn predicted(&self) -> Option<usize> {
        self.output
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
    }
}

/// Builds the inference request for `digit`.
pub fn encode_request(digit: &[f32; DIGIT_SIZE]) -> Vec<u8> {
    Msg::Input(Cow::Borrowed(digit.as_slice())).encode()
}

/// Builds the inference response a peer sends back.
pub fn encode_response(timer_ms: f32, output: &[f32]) -> Vec<u8> {
    Msg::Output(InferenceOutput {
        output: Cow::Borrowed(output),
        timer_ms,
    })
    .encode()
}

/// Verifies and decodes an inference response.
///
/// # Errors
/// `DecodeError::Invalid` if the buffer fails the FlatBuffers verifier,
/// `DecodeError::UnexpectedCommand` if it isn't an inference output.
pub fn decode_response(buf: &[u8]) -> Result<Response, DecodeError> {
    let (cmd, root) = msg::verified_root(buf)?;

    if cmd != Command::InferenceOutput as u8 {
        return Err(DecodeError::UnexpectedCommand(cmd));
    }

    let output = msg::read_output(&root)?;
    Ok(Response {
        timer_ms: output.timer_ms,
        output: output.output.into_owned(),
    })
}

/// Creates both `Receiver` and `Sender` network channel parts.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of a receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (Receiver<R>, Sender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (Receiver::new(rx), Sender::new(tx))
}
