use naia_serde::{BitReader, BitWrite, Serde};

use crate::messages::error::MessageError;

/// What a message is for. Everything but `GameState` is handed to the
/// registered callbacks as soon as it arrives.
#[derive(Copy, Debug, Clone, Eq, PartialEq, Hash)]
pub enum MessageType {
    // Replicated data for the object tree
    GameState,
    // Liveness heartbeat
    Ping,
    // Binds a peer's transport name to its game client id
    Identity,
    // Graceful goodbye before the channels close
    Disconnect,
    // Gameplay message (chat, input, ...) carried in the data map
    Event,
}

impl MessageType {
    fn index(&self) -> u8 {
        match self {
            MessageType::GameState => 0,
            MessageType::Ping => 1,
            MessageType::Identity => 2,
            MessageType::Disconnect => 3,
            MessageType::Event => 4,
        }
    }

    fn from_index(index: u8) -> Result<Self, MessageError> {
        match index {
            0 => Ok(MessageType::GameState),
            1 => Ok(MessageType::Ping),
            2 => Ok(MessageType::Identity),
            3 => Ok(MessageType::Disconnect),
            4 => Ok(MessageType::Event),
            // SECURITY: Malicious or malformed messages could send invalid indices.
            index => Err(MessageError::UnknownType { index }),
        }
    }

    /// Writes the type behind a presence bit
    pub(crate) fn ser_optional(msg_type: Option<MessageType>, writer: &mut dyn BitWrite) {
        msg_type.map(|msg_type| msg_type.index()).ser(writer);
    }

    pub(crate) fn de_required(reader: &mut BitReader) -> Result<Self, MessageError> {
        match Option::<u8>::de(reader)? {
            Some(index) => Self::from_index(index),
            None => Err(MessageError::MissingType),
        }
    }

    pub(crate) fn bit_length(&self) -> u32 {
        Some(self.index()).bit_length()
    }
}
