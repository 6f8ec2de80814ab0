cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use log::warn;

        use zstd::bulk::Compressor;

        use super::compression_config::{CompressionConfig, CompressionMode};
        use super::error::EncoderError;

        pub struct Encoder {
            result: Vec<u8>,
            compressor: Option<Compressor<'static>>,
        }

        impl Encoder {
            /// Try to create a new Encoder with the configured compression mode
            pub fn try_new(config: &CompressionConfig) -> Result<Self, EncoderError> {
                let compressor = match &config.mode {
                    None => None,
                    Some(CompressionMode::Default(compression_level)) => Some(
                        Compressor::new(*compression_level).map_err(|_| {
                            EncoderError::CompressorCreationFailed {
                                level: *compression_level,
                            }
                        })?,
                    ),
                    Some(CompressionMode::Dictionary(compression_level, dictionary)) => Some(
                        Compressor::with_dictionary(*compression_level, dictionary).map_err(|_| {
                            EncoderError::CompressorWithDictionaryFailed {
                                level: *compression_level,
                            }
                        })?,
                    ),
                };

                Ok(Self {
                    result: Vec::new(),
                    compressor,
                })
            }

            /// Create a new Encoder, sending uncompressed if the compressor
            /// cannot be built
            pub fn new(config: &CompressionConfig) -> Self {
                Self::try_new(config).unwrap_or_else(|error| {
                    warn!("{}, sending uncompressed", error);
                    Self {
                        result: Vec::new(),
                        compressor: None,
                    }
                })
            }

            pub fn try_encode(&mut self, payload: &[u8]) -> Result<&[u8], EncoderError> {
                match &mut self.compressor {
                    Some(compressor) => {
                        self.result = compressor.compress(payload).map_err(|_| {
                            EncoderError::CompressionFailed {
                                payload_size: payload.len(),
                            }
                        })?;
                    }
                    None => self.result = payload.to_vec(),
                }
                Ok(&self.result)
            }
        }
    }
    else
    {
        use super::compression_config::CompressionConfig;
        use super::error::EncoderError;

        pub struct Encoder {
            result: Vec<u8>,
        }

        impl Encoder {
            pub fn new(_: &CompressionConfig) -> Self {
                Self {
                    result: Vec::new(),
                }
            }

            pub fn try_encode(&mut self, payload: &[u8]) -> Result<&[u8], EncoderError> {
                self.result = payload.to_vec();
                Ok(&self.result)
            }
        }
    }
}
