use thiserror::Error;

/// Errors surfaced by a `DataChannel` implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Channel is closed")]
    ChannelClosed,

    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
}

/// Errors that can occur during connection encoding operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// Failed to create compressor with the specified configuration
    #[error("Failed to create compressor with compression level {level}")]
    CompressorCreationFailed { level: i32 },

    /// Failed to create compressor with dictionary
    #[error("Failed to create compressor with dictionary (compression level {level})")]
    CompressorWithDictionaryFailed { level: i32 },

    /// Compression operation failed
    #[error("Failed to compress payload of {payload_size} bytes")]
    CompressionFailed { payload_size: usize },
}

/// Errors that can occur during connection decoding operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    /// Failed to create decompressor
    #[error("Failed to create decompressor")]
    DecompressorCreationFailed,

    /// Failed to create decompressor with dictionary
    #[error("Failed to create decompressor with dictionary")]
    DecompressorWithDictionaryFailed,

    /// Decompressed size is unknown or above the limit (SECURITY: potentially malicious payload)
    #[error("Payload of {payload_size} bytes would decompress beyond {limit} bytes")]
    SizeLimitExceeded { payload_size: usize, limit: usize },

    /// Decompression operation failed (SECURITY: potentially malicious payload)
    #[error("Failed to decompress payload of {payload_size} bytes (possible malformed or malicious data)")]
    DecompressionFailed { payload_size: usize },
}

/// General connection-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Message error: {0}")]
    Message(#[from] crate::messages::error::MessageError),

    #[error("Unknown channel label {label:?}")]
    UnknownChannel { label: String },

    #[error("Unknown peer {peer}")]
    UnknownPeer { peer: String },

    #[error("Peer {peer} has no open {label} channel")]
    ChannelNotOpen { peer: String, label: &'static str },
}
