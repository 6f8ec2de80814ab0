use std::collections::{btree_map, BTreeMap};

use naia_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};
use thiserror::Error;

use crate::types::{ChildId, PropNumber};

/// Deepest node nesting accepted off the wire
pub const MAX_DEPTH: usize = 32;

// 7-bit groups needed for any u64
const MAX_VARINT_GROUPS: usize = 10;

/// Errors raised while reading a data map off the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("Payload ended early or was malformed")]
    Malformed,

    /// SECURITY: nesting limit for untrusted payloads
    #[error("Data map nested deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },

    #[error("Integer on the wire does not fit in 64 bits")]
    IntegerOverflow,
}

impl From<SerdeErr> for WireError {
    fn from(_: SerdeErr) -> Self {
        WireError::Malformed
    }
}

pub(crate) fn ser_varint(value: u64, writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<7>::new(value).ser(writer);
}

pub(crate) fn varint_bit_length(value: u64) -> u32 {
    UnsignedVariableInteger::<7>::new(value).bit_length()
}

/// Reads an `UnsignedVariableInteger<7>`, refusing values wider than u64
/// instead of decoding an unbounded run of groups
pub(crate) fn de_varint(reader: &mut BitReader) -> Result<u64, WireError> {
    let mut value: u64 = 0;
    for group in 0..MAX_VARINT_GROUPS {
        let proceed = bool::de(reader)?;
        for bit in 0..7 {
            if bool::de(reader)? {
                let shift = group * 7 + bit;
                if shift >= 64 {
                    return Err(WireError::IntegerOverflow);
                }
                value |= 1u64 << shift;
            }
        }
        if !proceed {
            return Ok(value);
        }
    }
    Err(WireError::IntegerOverflow)
}

fn de_length(reader: &mut BitReader) -> Result<usize, WireError> {
    usize::try_from(de_varint(reader)?).map_err(|_| WireError::IntegerOverflow)
}

/// Key of a data map entry, resolved against the owning node's prop count.
/// Raw keys `1..=num_props` name fields; anything above names the child
/// `raw - num_props`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WireKey {
    Field(PropNumber),
    Child(ChildId),
}

impl WireKey {
    /// Returns `None` for keys no node can own (zero, or out of range)
    pub fn classify(raw: u64, num_props: PropNumber) -> Option<WireKey> {
        if raw == 0 {
            return None;
        }
        if raw <= num_props as u64 {
            return Some(WireKey::Field(raw as PropNumber));
        }
        let child = raw - num_props as u64;
        ChildId::try_from(child).ok().map(WireKey::Child)
    }

    pub fn to_raw(&self, num_props: PropNumber) -> u64 {
        match self {
            WireKey::Field(number) => *number as u64,
            WireKey::Child(id) => *id as u64 + num_props as u64,
        }
    }
}

/// Either a serialized leaf field or a nested child map
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    Leaf(Box<[u8]>),
    Node(DataMap),
}

/// Nested payload exchanged between peers, mirroring the object tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataMap {
    entries: BTreeMap<u64, WireValue>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, raw_key: u64, value: WireValue) {
        self.entries.insert(raw_key, value);
    }

    pub fn insert_field(&mut self, number: PropNumber, bytes: Box<[u8]>) {
        self.insert(WireKey::Field(number).to_raw(0), WireValue::Leaf(bytes));
    }

    pub fn insert_child(&mut self, id: ChildId, num_props: PropNumber, data: DataMap) {
        self.insert(WireKey::Child(id).to_raw(num_props), WireValue::Node(data));
    }

    pub fn get(&self, raw_key: u64) -> Option<&WireValue> {
        self.entries.get(&raw_key)
    }

    pub fn field(&self, number: PropNumber) -> Option<&[u8]> {
        match self.entries.get(&(number as u64)) {
            Some(WireValue::Leaf(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn child(&self, id: ChildId, num_props: PropNumber) -> Option<&DataMap> {
        match self.entries.get(&WireKey::Child(id).to_raw(num_props)) {
            Some(WireValue::Node(data)) => Some(data),
            _ => None,
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u64, WireValue> {
        self.entries.iter()
    }

    /// Folds `other` into this map. Nested maps merge recursively, any other
    /// collision is won by `other`.
    pub fn merge(&mut self, other: DataMap) {
        for (key, value) in other.entries {
            match (self.entries.get_mut(&key), value) {
                (Some(WireValue::Node(mine)), WireValue::Node(theirs)) => mine.merge(theirs),
                (_, value) => {
                    self.entries.insert(key, value);
                }
            }
        }
    }

    /// Decodes a map from untrusted bytes, reporting why it was refused
    pub fn decode(reader: &mut BitReader) -> Result<Self, WireError> {
        Self::de_nested(reader, 0)
    }

    fn de_nested(reader: &mut BitReader, depth: usize) -> Result<Self, WireError> {
        if depth > MAX_DEPTH {
            return Err(WireError::DepthExceeded {
                max_depth: MAX_DEPTH,
            });
        }
        let count = de_length(reader)?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let key = de_varint(reader)?;
            let value = if bool::de(reader)? {
                WireValue::Node(Self::de_nested(reader, depth + 1)?)
            } else {
                let length = de_length(reader)?;
                let mut bytes = Vec::new();
                for _ in 0..length {
                    bytes.push(u8::de(reader)?);
                }
                WireValue::Leaf(bytes.into_boxed_slice())
            };
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a DataMap {
    type Item = (&'a u64, &'a WireValue);
    type IntoIter = btree_map::Iter<'a, u64, WireValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serde for DataMap {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_varint(self.entries.len() as u64, writer);
        for (key, value) in &self.entries {
            ser_varint(*key, writer);
            match value {
                WireValue::Leaf(bytes) => {
                    false.ser(writer);
                    ser_varint(bytes.len() as u64, writer);
                    for byte in bytes.iter() {
                        byte.ser(writer);
                    }
                }
                WireValue::Node(data) => {
                    true.ser(writer);
                    data.ser(writer);
                }
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Self::decode(reader).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        let mut output = varint_bit_length(self.entries.len() as u64);
        for (key, value) in &self.entries {
            output += varint_bit_length(*key) + 1;
            output += match value {
                WireValue::Leaf(bytes) => {
                    varint_bit_length(bytes.len() as u64) + bytes.len() as u32 * 8
                }
                WireValue::Node(data) => data.bit_length(),
            };
        }
        output
    }
}
