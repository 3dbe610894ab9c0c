use std::{borrow::Cow, sync::Arc, time::Duration};

use comms::{DIGIT_SIZE, FrameEnd, Msg, RESPONSE_SIZE, Receiver, Response, Sender};
use log::{debug, info};
use rand::Rng;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    time::Instant,
};

use crate::{
    buffer::RecvBuffer,
    coordinator::RunContext,
    error::{Result, WorkerErr},
};

/// A single client performing one connect, send, receive and record cycle.
pub struct Worker {
    worker_id: usize,
    ctx: Arc<RunContext>,
}

impl Worker {
    /// Creates a new `Worker`.
    ///
    /// # Arguments
    /// * `worker_id` - 1-based identifier, also selects the worker's result slot.
    /// * `ctx` - The run's shared configuration and results.
    pub fn new(worker_id: usize, ctx: Arc<RunContext>) -> Self {
        Self { worker_id, ctx }
    }

    pub fn id(&self) -> usize {
        self.worker_id
    }

    /// Runs the worker's whole lifecycle, recording the server's timing.
    ///
    /// The socket is closed and the receive buffer zeroed when this returns,
    /// whatever the outcome.
    ///
    /// # Returns
    /// The inference time reported by the server, in milliseconds.
    ///
    /// # Errors
    /// Returns `WorkerErr` if the server couldn't be reached or didn't send a
    /// valid inference output. The worker's slot is left unset in that case.
    pub async fn run(self) -> Result<f32> {
        let worker_id = self.worker_id;
        let config = &self.ctx.config;

        let stream = TcpStream::connect((config.host(), config.port()))
            .await
            .map_err(|source| WorkerErr::Connect {
                addr: config.addr(),
                source,
            })?;
        info!("[worker={worker_id}] connected");

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        let digit = random_digit();
        let request = Msg::Input(Cow::Borrowed(digit.as_slice()));
        let response = exchange(rx, tx, &request, config.recv_timeout()).await?;

        debug!(
            worker_id = worker_id;
            "predicted class {:?} from scores {:?}",
            response.predicted(),
            response.output
        );

        self.ctx.results.set(worker_id, response.timer_ms)?;
        info!(
            "[worker={worker_id}] inference time in ms: {}",
            response.timer_ms
        );

        Ok(response.timer_ms)
    }
}

/// Sends `request` and waits for the single fixed size reply.
///
/// The reply ends when the peer closes, when more than `RESPONSE_SIZE`
/// bytes arrived, or when `recv_timeout` runs out.
///
/// # Arguments
/// * `rx` - Receiving end of the connection.
/// * `tx` - Sending end of the connection.
/// * `request` - The message to send.
/// * `recv_timeout` - Upper bound for the wait on the reply.
///
/// # Errors
/// `WorkerErr::Timeout` if nothing arrived in time, otherwise whatever
/// `parse_reply` rejects.
pub async fn exchange<R, W>(
    mut rx: Receiver<R>,
    mut tx: Sender<W>,
    request: &Msg<'_>,
    recv_timeout: Duration,
) -> Result<Response>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let sent = tx.send(request).await?;
    debug!("sent {sent} byte request");

    let mut buf = RecvBuffer::new();
    let frame = rx
        .recv_frame(&mut buf, Instant::now() + recv_timeout)
        .await?;

    if frame.len == 0 && frame.end == FrameEnd::Expired {
        return Err(WorkerErr::Timeout);
    }

    parse_reply(&buf[..frame.len])
}

/// Decodes a received frame, only frames of exactly `RESPONSE_SIZE` bytes are
/// looked at.
pub fn parse_reply(frame: &[u8]) -> Result<Response> {
    match frame.len() {
        0 => Err(WorkerErr::NoResponse),
        RESPONSE_SIZE => Ok(comms::decode_response(frame)?),
        got => Err(WorkerErr::BadLength {
            got,
            expected: RESPONSE_SIZE,
        }),
    }
}

/// The pixels carry no meaning for the server's timing, any values will do.
fn random_digit() -> [f32; DIGIT_SIZE] {
    let mut rng = rand::rng();
    std::array::from_fn(|_| rng.random())
}

#[cfg(test)]
mod tests {
    use comms::{Command, DecodeError};
    use tokio::io::{self, AsyncWriteExt};
    use tokio_test::io::Builder;

    use super::*;

    const SCORES: [f32; 10] = [0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.8, 0.1, 0.0];

    #[test]
    fn empty_frame_is_no_response() {
        assert!(matches!(parse_reply(&[]), Err(WorkerErr::NoResponse)));
    }

    #[test]
    fn short_frames_are_not_decoded() {
        let reply = comms::encode_response(12.5, &SCORES);

        assert!(matches!(
            parse_reply(&reply[..RESPONSE_SIZE - 1]),
            Err(WorkerErr::BadLength { got, .. }) if got == RESPONSE_SIZE - 1
        ));
    }

    #[test]
    fn frame_with_another_command_is_rejected() {
        let mut frame = comms::encode_response(12.5, &SCORES);
        // Follow the root table to its vtable, whose first slot is the command.
        let root = u32::from_le_bytes(frame[..4].try_into().unwrap()) as usize;
        let soffset = i32::from_le_bytes(frame[root..root + 4].try_into().unwrap());
        let vtable = (root as i64 - soffset as i64) as usize;
        let voffset = u16::from_le_bytes(frame[vtable + 4..vtable + 6].try_into().unwrap());
        frame[root + voffset as usize] = Command::GetStats as u8;

        assert!(matches!(
            parse_reply(&frame),
            Err(WorkerErr::Decode(DecodeError::UnexpectedCommand(0)))
        ));
    }

    #[test]
    fn digits_have_the_fixed_shape() {
        let digit = random_digit();
        assert_eq!(digit.len(), DIGIT_SIZE);
        assert!(digit.iter().all(|p| (0.0..1.0).contains(p)));
    }

    fn request() -> Msg<'static> {
        Msg::Input(Cow::Owned(vec![0.5; DIGIT_SIZE]))
    }

    fn mock_channel(
        mock: tokio_test::io::Mock,
    ) -> (
        Receiver<io::ReadHalf<tokio_test::io::Mock>>,
        Sender<io::WriteHalf<tokio_test::io::Mock>>,
    ) {
        let (rx, tx) = io::split(mock);
        comms::channel(rx, tx)
    }

    #[tokio::test]
    async fn exchange_sends_request_and_decodes_reply() {
        let expected = comms::encode_request(&[0.5; DIGIT_SIZE]);
        let reply = comms::encode_response(12.5, &SCORES);

        let mock = Builder::new().write(&expected).read(&reply).build();
        let (rx, tx) = mock_channel(mock);

        let response = exchange(rx, tx, &request(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(response.timer_ms, 12.5);
        assert_eq!(response.predicted(), Some(7));
    }

    #[tokio::test]
    async fn exchange_rejects_a_reply_running_past_the_response_size() {
        let expected = comms::encode_request(&[0.5; DIGIT_SIZE]);
        let mut reply = comms::encode_response(12.5, &SCORES);
        reply.push(0);

        let mock = Builder::new().write(&expected).read(&reply).build();
        let (rx, tx) = mock_channel(mock);

        let err = exchange(rx, tx, &request(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerErr::BadLength { got, expected: RESPONSE_SIZE } if got == RESPONSE_SIZE + 1
        ));
    }

    #[tokio::test]
    async fn exchange_rejects_a_short_reply() {
        let expected = comms::encode_request(&[0.5; DIGIT_SIZE]);
        let reply = comms::encode_response(12.5, &SCORES);

        let mock = Builder::new()
            .write(&expected)
            .read(&reply[..RESPONSE_SIZE / 2])
            .build();
        let (rx, tx) = mock_channel(mock);

        let err = exchange(rx, tx, &request(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerErr::BadLength { got, .. } if got == RESPONSE_SIZE / 2));
    }

    #[tokio::test]
    async fn exchange_reports_a_closed_peer() {
        let expected = comms::encode_request(&[0.5; DIGIT_SIZE]);

        let mock = Builder::new().write(&expected).build();
        let (rx, tx) = mock_channel(mock);

        let err = exchange(rx, tx, &request(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerErr::NoResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_gives_up_after_the_timeout() {
        // The peer end is kept alive but never written to.
        let (client, _server) = io::duplex(2 * comms::REQUEST_CAPACITY);
        let (rx, tx) = io::split(client);
        let (rx, tx) = comms::channel(rx, tx);

        let err = exchange(rx, tx, &request(), Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerErr::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_accepts_a_full_reply_on_a_connection_left_open() {
        let reply = comms::encode_response(3.0, &SCORES);

        let (client, mut server) = io::duplex(2 * comms::REQUEST_CAPACITY);
        server.write_all(&reply).await.unwrap();
        let (rx, tx) = io::split(client);
        let (rx, tx) = comms::channel(rx, tx);

        let response = exchange(rx, tx, &request(), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(response.timer_ms, 3.0);
    }
}
