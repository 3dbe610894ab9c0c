use std::{error::Error, fmt};

use flatbuffers::InvalidFlatbuffer;

use crate::msg::Command;

/// The codec's result type.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Failures while interpreting a received buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The buffer failed the FlatBuffers verifier.
    Invalid(InvalidFlatbuffer),
    /// The buffer verified but lacks the table its command needs.
    Malformed(&'static str),
    /// The buffer is well formed but carries a different command.
    UnexpectedCommand(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid flatbuffer: {e}"),
            Self::Malformed(detail) => write!(f, "malformed message: {detail}"),
            Self::UnexpectedCommand(raw) => match Command::try_from(*raw) {
                Ok(cmd) => write!(f, "unexpected command {cmd:?}"),
                Err(_) => write!(f, "unknown command byte {raw}"),
            },
        }
    }
}

impl Error for DecodeError {}

impl From<InvalidFlatbuffer> for DecodeError {
    fn from(value: InvalidFlatbuffer) -> Self {
        Self::Invalid(value)
    }
}
