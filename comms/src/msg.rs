use std::borrow::Cow;

use flatbuffers::FlatBufferBuilder;

use crate::{
    Deserialize, Serialize,
    error::{DecodeError, Result},
    mnist_prot::{self, Commands, Payload},
};

const SMALL_MSG_CAPACITY: usize = 128;

/// The command tag of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    GetStats = 0,
    InferenceInput = 1,
    InferenceOutput = 2,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::GetStats),
            1 => Ok(Self::InferenceInput),
            2 => Ok(Self::InferenceOutput),
            other => Err(other),
        }
    }
}

/// Device statistics reported by the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub version: u8,
    pub freq: u32,
    /// Raw value of the peer's acceleration `Mode` enum.
    pub mode: i8,
}

/// The result of a single inference run on the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutput<'a> {
    /// The model's score for every class.
    pub output: Cow<'a, [f32]>,
    /// How long the inference took on the peer, in milliseconds.
    pub timer_ms: f32,
}

/// The application layer message, one per connection and direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg<'a> {
    GetStats(Option<Stats>),
    Input(Cow<'a, [f32]>),
    Output(InferenceOutput<'a>),
}

impl Msg<'_> {
    /// The command tag this message is sent with.
    pub fn command(&self) -> Command {
        match self {
            Msg::GetStats(_) => Command::GetStats,
            Msg::Input(_) => Command::InferenceInput,
            Msg::Output(_) => Command::InferenceOutput,
        }
    }

    /// Encodes the message into a new buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize(&mut buf);
        buf
    }

    fn capacity(&self) -> usize {
        match self {
            Msg::Input(digit) => {
                crate::REQUEST_CAPACITY.max(digit.len() * size_of::<f32>() + SMALL_MSG_CAPACITY)
            }
            _ => SMALL_MSG_CAPACITY,
        }
    }
}

impl Serialize for Msg<'_> {
    fn serialize(&self, buf: &mut Vec<u8>) {
        let mut fbb = FlatBufferBuilder::with_capacity(self.capacity());

        let payload = match self {
            Msg::GetStats(None) => Payload::None,
            Msg::GetStats(Some(stats)) => Payload::Stats(mnist_prot::create_stats(
                &mut fbb,
                stats.version,
                stats.freq,
                stats.mode,
            )),
            Msg::Input(digit) => Payload::Input(mnist_prot::create_inference_input(&mut fbb, digit)),
            Msg::Output(out) => Payload::Output(mnist_prot::create_inference_output(
                &mut fbb,
                &out.output,
                out.timer_ms,
            )),
        };

        mnist_prot::finish_commands(&mut fbb, self.command() as i8, payload);
        buf.extend_from_slice(fbb.finished_data());
    }
}

/// The command tag and payload of a verified `Commands` root.
pub(crate) fn verified_root(buf: &[u8]) -> Result<(u8, Commands<'_>)> {
    let root = mnist_prot::root_as_commands(buf)?;
    Ok((root.cmd() as u8, root))
}

/// Copies the scores and timing out of a verified output table.
pub(crate) fn read_output(root: &Commands<'_>) -> Result<InferenceOutput<'static>> {
    let out = root
        .ouput()
        .ok_or(DecodeError::Malformed("output command without output table"))?;

    Ok(InferenceOutput {
        output: Cow::Owned(out.output_f().map(|v| v.iter().collect()).unwrap_or_default()),
        timer_ms: out.timer_ms(),
    })
}

impl Deserialize for Msg<'_> {
    fn deserialize(buf: &[u8]) -> Result<Self> {
        let (cmd, root) = verified_root(buf)?;
        let cmd = Command::try_from(cmd).map_err(DecodeError::UnexpectedCommand)?;

        match cmd {
            Command::GetStats => Ok(Msg::GetStats(root.stats().map(|stats| Stats {
                version: stats.version(),
                freq: stats.freq(),
                mode: stats.mode(),
            }))),
            Command::InferenceInput => root
                .input()
                .map(|input| {
                    let digit = input.digit().map(|v| v.iter().collect()).unwrap_or_default();
                    Msg::Input(Cow::Owned(digit))
                })
                .ok_or(DecodeError::Malformed("input command without input table")),
            Command::InferenceOutput => read_output(&root).map(Msg::Output),
        }
    }
}
