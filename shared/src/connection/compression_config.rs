/// Compression applied to every payload sent over a session. Both ends of a
/// peer pair must agree on it.
#[derive(Clone, Debug, Default)]
pub struct CompressionConfig {
    pub mode: Option<CompressionMode>,
}

impl CompressionConfig {
    pub fn new(mode: CompressionMode) -> Self {
        Self { mode: Some(mode) }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    /// Compression mode using default zstd dictionary implementation
    Default(i32),
    /// Compression mode using custom dictionary
    Dictionary(i32, Vec<u8>),
}
