use naia_serde::SerdeErr;
use thiserror::Error;

use crate::world::wire::WireError;

/// Errors raised while decoding a message off a channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The message carried no type discriminator
    #[error("Message has no type")]
    MissingType,

    /// Unknown type index received (SECURITY: potentially malicious message)
    #[error("Unknown message type index {index}")]
    UnknownType { index: u8 },

    #[error("Malformed message: {0}")]
    Wire(#[from] WireError),
}

impl From<SerdeErr> for MessageError {
    fn from(error: SerdeErr) -> Self {
        MessageError::Wire(error.into())
    }
}
