use std::ops::{Deref, DerefMut};

use comms::RESPONSE_SIZE;

/// An owned, fixed size receive buffer that is zeroed when dropped.
///
/// Holding it in a scope guarantees the clearing on every exit path of a
/// worker, including early returns through `?`.
///
/// The default size is one byte over a response, so a reply that runs past
/// `RESPONSE_SIZE` is still seen as too long.
pub struct RecvBuffer {
    bytes: Box<[u8]>,
}

impl RecvBuffer {
    /// Creates a new buffer sized for a single response plus one byte.
    pub fn new() -> Self {
        Self::with_size(RESPONSE_SIZE + 1)
    }

    pub fn with_size(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    fn clear(&mut self) {
        self.bytes.fill(0);
        std::hint::black_box(&self.bytes);
    }
}

impl Default for RecvBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for RecvBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for RecvBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl Drop for RecvBuffer {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_room_past_a_response() {
        assert_eq!(RecvBuffer::new().len(), RESPONSE_SIZE + 1);
    }

    #[test]
    fn clear_zeroes_every_byte() {
        let mut buf = RecvBuffer::with_size(8);
        buf.copy_from_slice(&[0xFF; 8]);

        buf.clear();
        assert!(buf.iter().all(|&b| b == 0));
    }
}
