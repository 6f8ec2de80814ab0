use replica_shared::{
    initialize_object, step_object, ChannelKind, DataMap, GameObject, Instant, NetworkBehavior,
    Phase, ReplicationContext, WireValue,
};
use replica_test::{decode, encode, replicated_pos, Player, ANGLE, POS};

fn tick(object: &mut dyn GameObject) {
    for phase in Phase::ALL {
        step_object(object, phase, 16.0);
    }
    object.node_mut().cleanup();
}

fn pos_payload(pos: (f32, f32)) -> DataMap {
    let mut data = DataMap::new();
    data.insert_field(POS, encode(&pos));
    data
}

/// Host-side source player with children at `ids`, each with a position
fn host_tree(context: &ReplicationContext, ids: &[u32]) -> Player {
    let mut parent = Player::new(context, None);
    parent.set_pos((1.0, 2.0));
    for id in ids {
        let child = Player::new(context, None);
        child.set_pos((*id as f32, 0.0));
        assert!(parent.node_mut().register_child(*id, Box::new(child)));
    }
    initialize_object(&mut parent);
    tick(&mut parent);
    parent
}

#[test]
fn early_child_data_is_replayed_once_on_registration() {
    let host = ReplicationContext::host();
    let now = Instant::now();
    let mut source = host_tree(&host, &[1, 2, 3]);
    source.node_mut().update_data(1);
    let (data, has_data) = source.node_mut().data_map(ChannelKind::Init, 1, &now);
    assert!(has_data);

    let client = ReplicationContext::client(Some(9));
    let mut copy = Player::new(&client, None);
    copy.node_mut().import_data(&data, 1);

    assert_eq!(copy.pos(), Some((1.0, 2.0)));
    for id in 1..=3 {
        assert_eq!(copy.node().buffered(id), 1);
        assert!(!copy.node().has_child(id));
    }

    let mut states = Vec::new();
    for id in 1..=3 {
        let child = Player::new(&client, None);
        states.push(child.state());
        assert!(copy.node_mut().register_child(id, Box::new(child)));
        assert_eq!(copy.node().buffered(id), 0);
    }

    for (index, state) in states.iter().enumerate() {
        let state = state.borrow();
        assert_eq!(state.pos, Some(((index + 1) as f32, 0.0)));
        assert_eq!(state.imports, 1);
    }
}

#[test]
fn child_keys_follow_the_fields() {
    let host = ReplicationContext::host();
    let now = Instant::now();
    let mut source = host_tree(&host, &[4]);
    source.node_mut().update_data(1);
    let (data, _) = source.node_mut().data_map(ChannelKind::Unreliable, 1, &now);

    // pos only; the unset optional angle stays off the wire
    assert!(data.field(ANGLE).is_none());
    let pos: (f32, f32) = decode(data.field(POS).unwrap()).unwrap();
    assert_eq!(pos, (1.0, 2.0));

    assert!(matches!(data.get(4 + 2), Some(WireValue::Node(_))));
    assert_eq!(data.child(4, 2).unwrap().len(), 1);
}

#[test]
fn source_only_validates_remote_writes() {
    let host = ReplicationContext::host();
    let mut player = Player::new(&host, None);
    player.set_pos((1.0, 2.0));
    initialize_object(&mut player);
    player.node_mut().update_data(1);
    assert_eq!(player.node().network_behavior(), NetworkBehavior::Source);

    player.node_mut().import_data(&pos_payload((9.0, 9.0)), 2);

    let state = player.state();
    assert_eq!(state.borrow().pos, Some((1.0, 2.0)));
    assert_eq!(state.borrow().validated, vec![(9.0, 9.0)]);
    assert_eq!(replicated_pos(player.node()), Some((1.0, 2.0)));
}

#[test]
fn relay_re_emits_only_real_changes() {
    let host = ReplicationContext::host();
    let now = Instant::now();
    let mut relay = Player::new(&host, Some(2));
    assert_eq!(relay.node().network_behavior(), NetworkBehavior::Relay);
    assert!(!relay.ready());

    relay.node_mut().import_data(&pos_payload((1.0, 1.0)), 1);
    assert!(relay.ready());
    initialize_object(&mut relay);
    relay.node_mut().update_data(1);
    let (_, has_data) = relay.node_mut().data_map(ChannelKind::Unreliable, 1, &now);
    assert!(has_data);

    // same value, and one inside the float tolerance
    relay.node_mut().import_data(&pos_payload((1.0, 1.0)), 10);
    relay.node_mut().import_data(&pos_payload((1.001, 1.0)), 11);
    relay.node_mut().update_data(11);
    let (_, has_data) = relay.node_mut().data_map(ChannelKind::Unreliable, 11, &now);
    assert!(!has_data);
    assert_eq!(relay.state().borrow().imports, 1);

    relay.node_mut().import_data(&pos_payload((3.0, 1.0)), 12);
    relay.node_mut().update_data(12);
    let (data, has_data) = relay.node_mut().data_map(ChannelKind::Unreliable, 12, &now);
    assert!(has_data);
    let pos: (f32, f32) = decode(data.field(POS).unwrap()).unwrap();
    assert_eq!(pos, (3.0, 1.0));
    assert_eq!(relay.state().borrow().imports, 2);
}

#[test]
fn copy_accepts_everything_not_older() {
    let client = ReplicationContext::client(Some(3));
    let mut copy = Player::new(&client, None);
    assert_eq!(copy.node().network_behavior(), NetworkBehavior::Copy);

    copy.node_mut().import_data(&pos_payload((1.0, 1.0)), 1);
    copy.node_mut().import_data(&pos_payload((1.0, 1.0)), 2);
    assert_eq!(copy.state().borrow().imports, 2);

    copy.node_mut().import_data(&pos_payload((8.0, 8.0)), 1);
    assert_eq!(copy.state().borrow().imports, 2);
    assert_eq!(copy.pos(), Some((1.0, 1.0)));
}

#[test]
fn behavior_follows_the_shared_context() {
    let client = ReplicationContext::client(None);
    let player = Player::new(&client, Some(4));
    assert_eq!(player.node().network_behavior(), NetworkBehavior::Copy);

    client.set_client_id(Some(4));
    assert_eq!(player.node().network_behavior(), NetworkBehavior::Source);

    let host = ReplicationContext::host();
    let mut offline = Player::new(&host, Some(4));
    offline.node_mut().set_offline(true);
    assert_eq!(offline.node().network_behavior(), NetworkBehavior::Offline);
}

#[test]
fn offline_nodes_neither_import_nor_publish() {
    let host = ReplicationContext::host();
    let now = Instant::now();
    let mut player = Player::new(&host, None);
    player.node_mut().set_offline(true);
    player.set_pos((1.0, 1.0));
    initialize_object(&mut player);

    player.node_mut().import_data(&pos_payload((5.0, 5.0)), 1);
    player.node_mut().update_data(1);
    let (_, has_data) = player.node_mut().data_map(ChannelKind::Init, 1, &now);

    assert!(!has_data);
    assert!(player.state().borrow().validated.is_empty());
}
