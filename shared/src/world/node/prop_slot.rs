use std::any::Any;

use log::trace;

use naia_serde::{BitReader, FileBitWriter, Serde};

use crate::{
    types::SeqNum,
    world::{
        node::{authority::NetworkBehavior, prop_handler::PropHandler},
        value::{channel_kind::ChannelKind, replicate::Replicate, replicated_value::ReplicatedValue},
        wire::WireError,
    },
    Instant,
};

/// Seq numbers of one remote write: `source` in the sender's domain, `local`
/// in the domain this peer re-publishes in. They differ only when a host
/// relays a client's data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportStamp {
    pub source: SeqNum,
    pub local: SeqNum,
}

impl ImportStamp {
    pub fn new(source: SeqNum, local: SeqNum) -> Self {
        Self { source, local }
    }

    /// Sender and receiver share a seq domain
    pub fn direct(seq_num: SeqNum) -> Self {
        Self::new(seq_num, seq_num)
    }
}

/// Type-erased view of a registered field, so one node can hold fields of
/// any value type and move them on and off the wire as leaf bytes
pub(crate) trait PropSlot {
    fn is_optional(&self) -> bool;
    fn has_value(&self) -> bool;
    /// Pulls the game's current value into the replicated value
    fn update(&mut self, seq_num: SeqNum);
    fn publish(&mut self, kind: ChannelKind, seq_num: SeqNum, now: &Instant) -> Option<Box<[u8]>>;
    fn import(
        &mut self,
        bytes: &[u8],
        stamp: ImportStamp,
        behavior: NetworkBehavior,
    ) -> Result<bool, WireError>;
    fn rollback(&mut self, bytes: &[u8], seq_num: SeqNum) -> Result<(), WireError>;
    fn reset(&mut self);
    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct Field<T: Replicate> {
    pub(crate) value: ReplicatedValue<T>,
    handler: Box<dyn PropHandler<T>>,
    // newest sender seq a relay accepted
    source_seq: Option<SeqNum>,
}

impl<T: Replicate> Field<T> {
    pub fn new(value: ReplicatedValue<T>, handler: Box<dyn PropHandler<T>>) -> Self {
        Self {
            value,
            handler,
            source_seq: None,
        }
    }

    fn decode(bytes: &[u8]) -> Result<T, WireError> {
        let mut reader = BitReader::new(bytes);
        Ok(T::de(&mut reader)?)
    }
}

impl<T: Replicate> PropSlot for Field<T> {
    fn is_optional(&self) -> bool {
        self.value.config().is_optional()
    }

    fn has_value(&self) -> bool {
        self.value.has()
    }

    fn update(&mut self, seq_num: SeqNum) {
        if self.handler.has() {
            self.value.set(self.handler.export(), seq_num);
        }
    }

    fn publish(&mut self, kind: ChannelKind, seq_num: SeqNum, now: &Instant) -> Option<Box<[u8]>> {
        let value = self.value.publish(kind, seq_num, now)?;
        let mut writer = FileBitWriter::new();
        value.ser(&mut writer);
        Some(writer.to_bytes())
    }

    fn import(
        &mut self,
        bytes: &[u8],
        stamp: ImportStamp,
        behavior: NetworkBehavior,
    ) -> Result<bool, WireError> {
        let value = Self::decode(bytes)?;
        let seq_num = stamp.local;
        match behavior {
            NetworkBehavior::Source | NetworkBehavior::Offline => {
                self.handler.validate(&value, stamp.source);
                Ok(false)
            }
            NetworkBehavior::Relay => {
                if let Some(last) = self.source_seq {
                    if stamp.source <= last {
                        trace!(
                            "Dropping stale relay write from seq {} (last {})",
                            stamp.source,
                            last
                        );
                        return Ok(false);
                    }
                }
                self.source_seq = Some(stamp.source);
                if self.value.set(value.clone(), seq_num) {
                    self.handler.import(&value, seq_num);
                    return Ok(true);
                }
                Ok(false)
            }
            NetworkBehavior::Copy => {
                if seq_num < self.value.seq_num() {
                    trace!(
                        "Dropping stale import at seq {} (current {})",
                        seq_num,
                        self.value.seq_num()
                    );
                    return Ok(false);
                }
                let changed = self.value.set(value.clone(), seq_num);
                self.handler.import(&value, seq_num);
                Ok(changed)
            }
        }
    }

    fn rollback(&mut self, bytes: &[u8], seq_num: SeqNum) -> Result<(), WireError> {
        let value = Self::decode(bytes)?;
        self.handler.rollback(&value, seq_num);
        self.value.rollback(value, seq_num);
        Ok(())
    }

    fn reset(&mut self) {
        self.value.reset();
        self.source_seq = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
