use naia_serde::{BitReader, FileBitWriter, Serde};

use crate::{
    messages::{error::MessageError, message_type::MessageType},
    types::{ClientId, SeqNum},
    world::wire::{de_varint, ser_varint, varint_bit_length, DataMap},
};

/// Envelope for everything sent over a peer's channels
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    msg_type: MessageType,
    seq_num: SeqNum,
    client_id: Option<ClientId>,
    data: DataMap,
}

impl Message {
    pub fn new(msg_type: MessageType, seq_num: SeqNum, data: DataMap) -> Self {
        Self {
            msg_type,
            seq_num,
            client_id: None,
            data,
        }
    }

    pub fn game_state(seq_num: SeqNum, data: DataMap) -> Self {
        Self::new(MessageType::GameState, seq_num, data)
    }

    pub fn ping() -> Self {
        Self::new(MessageType::Ping, 0, DataMap::new())
    }

    pub fn identity(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::new(MessageType::Identity, 0, DataMap::new())
        }
    }

    pub fn disconnect() -> Self {
        Self::new(MessageType::Disconnect, 0, DataMap::new())
    }

    pub fn event(data: DataMap) -> Self {
        Self::new(MessageType::Event, 0, data)
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn seq_num(&self) -> SeqNum {
        self.seq_num
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub fn into_data(self) -> DataMap {
        self.data
    }

    pub fn bit_length(&self) -> u32 {
        self.msg_type.bit_length()
            + varint_bit_length(self.seq_num)
            + self.client_id.bit_length()
            + self.data.bit_length()
    }

    pub fn encode(&self) -> Box<[u8]> {
        let mut writer = FileBitWriter::new();
        MessageType::ser_optional(Some(self.msg_type), &mut writer);
        ser_varint(self.seq_num, &mut writer);
        self.client_id.ser(&mut writer);
        self.data.ser(&mut writer);
        writer.to_bytes()
    }

    /// SECURITY: decodes untrusted peer data, failing instead of panicking
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut reader = BitReader::new(bytes);
        let msg_type = MessageType::de_required(&mut reader)?;
        let seq_num = de_varint(&mut reader)?;
        let client_id = Option::<ClientId>::de(&mut reader)?;
        let data = DataMap::decode(&mut reader)?;
        Ok(Self {
            msg_type,
            seq_num,
            client_id,
            data,
        })
    }
}
