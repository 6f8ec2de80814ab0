/// Largest payload a peer may make us inflate
pub const MAX_DECOMPRESSED_SIZE: usize = 1 << 20;

cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use log::warn;

        use zstd::bulk::Decompressor;

        use super::compression_config::{CompressionConfig, CompressionMode};
        use super::error::DecoderError;

        pub struct Decoder {
            result: Vec<u8>,
            decompressor: Option<Decompressor<'static>>,
        }

        impl Decoder {
            /// Try to create a new Decoder with the configured compression mode
            pub fn try_new(config: &CompressionConfig) -> Result<Self, DecoderError> {
                let decompressor = match &config.mode {
                    None => None,
                    Some(CompressionMode::Default(_)) => Some(
                        Decompressor::new().map_err(|_| DecoderError::DecompressorCreationFailed)?,
                    ),
                    Some(CompressionMode::Dictionary(_, dictionary)) => Some(
                        Decompressor::with_dictionary(dictionary)
                            .map_err(|_| DecoderError::DecompressorWithDictionaryFailed)?,
                    ),
                };

                Ok(Self {
                    decompressor,
                    result: Vec::new(),
                })
            }

            /// Create a new Decoder, passing payloads through untouched if the
            /// decompressor cannot be built
            pub fn new(config: &CompressionConfig) -> Self {
                Self::try_new(config).unwrap_or_else(|error| {
                    warn!("{}, reading uncompressed", error);
                    Self {
                        decompressor: None,
                        result: Vec::new(),
                    }
                })
            }

            /// SECURITY: This method processes untrusted network data. Any malformed or
            /// malicious payload will return an error instead of panicking.
            pub fn try_decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                if let Some(decompressor) = &mut self.decompressor {
                    self.result = decompressor
                        .decompress(payload, MAX_DECOMPRESSED_SIZE)
                        .map_err(|_| DecoderError::DecompressionFailed {
                            payload_size: payload.len(),
                        })?;
                } else {
                    self.result = payload.to_vec();
                }
                Ok(&self.result)
            }
        }
    }
    else
    {
        use super::compression_config::CompressionConfig;
        use super::error::DecoderError;

        pub struct Decoder {
            result: Vec<u8>,
        }

        impl Decoder {
            pub fn new(_: &CompressionConfig) -> Self {
                Self {
                    result: Vec::new(),
                }
            }

            pub fn try_decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                if payload.len() > MAX_DECOMPRESSED_SIZE {
                    return Err(DecoderError::SizeLimitExceeded {
                        payload_size: payload.len(),
                        limit: MAX_DECOMPRESSED_SIZE,
                    });
                }
                self.result = payload.to_vec();
                Ok(&self.result)
            }
        }
    }
}
