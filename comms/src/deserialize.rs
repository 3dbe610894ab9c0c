use crate::error::Result;

pub trait Deserialize: Sized {
    /// Verifies `buf` and decodes it into `Self`.
    fn deserialize(buf: &[u8]) -> Result<Self>;
}
