use proptest::prelude::*;

use replica_shared::{DataMap, FileBitWriter, Message, MessageError, Serde, WireValue};
use replica_test::decode;

fn build_map(entries: Vec<(u64, WireValue)>) -> DataMap {
    let mut map = DataMap::new();
    for (key, value) in entries {
        map.insert(key, value);
    }
    map
}

fn data_map_strategy() -> impl Strategy<Value = DataMap> {
    let leaf = prop::collection::vec(any::<u8>(), 0..8)
        .prop_map(|bytes| WireValue::Leaf(bytes.into_boxed_slice()));
    let value = leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec((1u64..40, inner), 0..4)
            .prop_map(|entries| WireValue::Node(build_map(entries)))
    });
    prop::collection::vec((1u64..200, value), 0..6).prop_map(build_map)
}

proptest! {
    #[test]
    fn prop_data_maps_survive_the_wire(map in data_map_strategy()) {
        let mut writer = FileBitWriter::new();
        map.ser(&mut writer);
        let bytes = writer.to_bytes();
        prop_assert_eq!(bytes.len(), (map.bit_length() as usize + 7) / 8);

        let decoded: DataMap = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, map);
    }

    #[test]
    fn prop_game_state_messages_survive_the_wire(
        seq in any::<u64>(),
        map in data_map_strategy()
    ) {
        let message = Message::game_state(seq, map);
        let decoded = Message::decode(&message.encode()).unwrap();
        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn prop_merging_a_map_into_itself_is_a_no_op(map in data_map_strategy()) {
        let mut merged = map.clone();
        merged.merge(map.clone());
        prop_assert_eq!(merged, map);
    }

    #[test]
    fn prop_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = Message::decode(&bytes);
    }
}

#[test]
fn empty_payload_has_no_message_type() {
    assert!(matches!(
        Message::decode(&[]),
        Err(MessageError::MissingType) | Err(MessageError::Wire(_))
    ));
}
