pub trait Serialize {
    /// Appends the encoded form of `self` to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>);
}
