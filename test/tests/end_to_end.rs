use replica_shared::{
    initialize_object, step_object, ChannelKind, ChannelMode, DataMap, GameObject, Instant, Message,
    PeerSession, Phase, ReplicationContext, SessionConfig, WireValue, FIRST_CLIENT_ID,
};
use replica_test::{
    encode, player_list, replicated_pos, LocalLink, Player, TestCluster, POS,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pre_update(object: &mut dyn GameObject) {
    step_object(object, Phase::PreUpdate, 16.0);
}

fn player_payload(id: u32, pos: (f32, f32)) -> DataMap {
    let mut player = DataMap::new();
    player.insert_field(POS, encode(&pos));
    let mut data = DataMap::new();
    data.insert_child(id, 0, player);
    data
}

fn pos_in(cluster_root: &dyn GameObject, id: u32) -> Option<(f32, f32)> {
    cluster_root
        .node()
        .child(id)
        .and_then(|player| replicated_pos(player.node()))
}

#[test]
fn nested_state_reaches_a_copy_and_waits_for_its_child() {
    init_logging();
    let now = Instant::now();
    let host = ReplicationContext::host();

    let mut parent = Player::new(&host, None);
    let child = Player::new(&host, None);
    let child_state = child.state();
    parent.node_mut().register_child(5, Box::new(child));
    initialize_object(&mut parent);
    pre_update(&mut parent);

    // only the parent has data yet
    parent.set_pos((1.0, 2.0));
    parent.node_mut().update_data(1);
    let (data, _) = parent.node_mut().data_map(ChannelKind::Init, 1, &now);
    assert_eq!(data.len(), 1);
    assert!(data.get(7).is_none());

    child_state.borrow_mut().pos = Some((5.0, 6.0));
    parent.node_mut().update_data(2);
    let (data, has_data) = parent.node_mut().data_map(ChannelKind::Init, 2, &now);
    assert!(has_data);
    assert_eq!(data.len(), 2);
    assert!(matches!(data.get(7), Some(WireValue::Node(_))));

    let wire = Message::game_state(2, data).encode();
    let message = Message::decode(&wire).unwrap();

    let client = ReplicationContext::client(Some(9));
    let mut copy = Player::new(&client, None);
    copy.node_mut().import_data(message.data(), message.seq_num());
    assert_eq!(copy.pos(), Some((1.0, 2.0)));
    assert_eq!(copy.node().buffered(5), 1);

    let copy_child = Player::new(&client, None);
    let copy_child_state = copy_child.state();
    copy.node_mut().register_child(5, Box::new(copy_child));

    assert_eq!(copy.node().buffered(5), 0);
    assert_eq!(copy_child_state.borrow().pos, Some((5.0, 6.0)));
    assert_eq!(copy_child_state.borrow().imports, 1);
}

#[test]
fn reordered_unreliable_state_settles_on_the_newest() {
    init_logging();
    let now = Instant::now();
    let mut host = PeerSession::new(SessionConfig::default(), &now);
    let mut client = PeerSession::new(SessionConfig::default(), &now);
    let mut link = LocalLink::connect("host", &mut host, "client", &mut client);

    for (seq, x) in [(1, 1.0f32), (2, 2.0)] {
        let mut data = DataMap::new();
        data.insert_field(POS, encode(&(x, 0.0f32)));
        host.send(
            "client",
            ChannelKind::Unreliable,
            &Message::game_state(seq, data),
        );
    }
    link.reorder_from_a(ChannelMode::Unreliable);
    link.deliver(&mut host, &mut client);

    let inbound = client.pre_update(&now).messages;
    let seqs: Vec<u64> = inbound.iter().map(|inbound| inbound.message.seq_num()).collect();
    assert_eq!(seqs, vec![2, 1]);

    let context = ReplicationContext::client(Some(1));
    let mut copy = Player::new(&context, None);
    for inbound in &inbound {
        copy.node_mut()
            .import_data(inbound.message.data(), inbound.message.seq_num());
    }
    assert_eq!(copy.pos(), Some((2.0, 0.0)));
    assert_eq!(copy.state().borrow().imports, 1);
}

#[test]
fn client_owned_player_is_relayed_to_other_clients() {
    init_logging();
    let mut cluster = TestCluster::new(|context| Box::new(player_list(context)));
    let alice = cluster.add_client("alice", |context| Box::new(player_list(context)));
    let bob = cluster.add_client("bob", |context| Box::new(player_list(context)));

    cluster.tick(16);
    assert_eq!(cluster.client(alice).context().client_id(), Some(FIRST_CLIENT_ID));
    assert_eq!(cluster.client(bob).context().client_id(), Some(FIRST_CLIENT_ID + 1));
    assert_eq!(cluster.host.session().peer_id("alice"), Some(FIRST_CLIENT_ID));

    let alice_context = cluster.client(alice).context().clone();
    let player = Player::new(&alice_context, Some(FIRST_CLIENT_ID));
    player.set_pos((3.0, 4.0));
    let alice_state = player.state();
    cluster
        .client_mut(alice)
        .root_mut()
        .node_mut()
        .register_child(FIRST_CLIENT_ID, Box::new(player));

    for _ in 0..4 {
        cluster.tick(16);
    }

    assert_eq!(pos_in(cluster.host.root(), FIRST_CLIENT_ID), Some((3.0, 4.0)));
    assert_eq!(pos_in(cluster.client(bob).root(), FIRST_CLIENT_ID), Some((3.0, 4.0)));
    assert!(alice_state.borrow().validated.contains(&(3.0, 4.0)));
    assert_eq!(alice_state.borrow().imports, 0);

    alice_state.borrow_mut().pos = Some((7.0, 8.0));
    for _ in 0..4 {
        cluster.tick(16);
    }
    assert_eq!(pos_in(cluster.client(bob).root(), FIRST_CLIENT_ID), Some((7.0, 8.0)));
    assert_eq!(alice_state.borrow().pos, Some((7.0, 8.0)));
}

#[test]
fn delayed_client_packet_does_not_overwrite_newer_relay_state() {
    init_logging();
    let mut cluster = TestCluster::new(|context| Box::new(player_list(context)));
    let alice = cluster.add_client("alice", |context| Box::new(player_list(context)));
    let bob = cluster.add_client("bob", |context| Box::new(player_list(context)));
    cluster.tick(16);

    for (seq, x) in [(11, 2.0f32), (10, 1.0)] {
        assert!(cluster.client_mut(alice).session_mut().send(
            "host",
            ChannelKind::Unreliable,
            &Message::game_state(seq, player_payload(FIRST_CLIENT_ID, (x, 0.0))),
        ));
    }
    cluster.deliver();
    cluster.tick(16);
    cluster.tick(16);

    assert_eq!(pos_in(cluster.host.root(), FIRST_CLIENT_ID), Some((2.0, 0.0)));
    assert_eq!(pos_in(cluster.client(bob).root(), FIRST_CLIENT_ID), Some((2.0, 0.0)));

    assert!(cluster.client_mut(alice).session_mut().send(
        "host",
        ChannelKind::Unreliable,
        &Message::game_state(12, player_payload(FIRST_CLIENT_ID, (3.0, 0.0))),
    ));
    cluster.deliver();
    cluster.tick(16);
    cluster.tick(16);

    assert_eq!(pos_in(cluster.host.root(), FIRST_CLIENT_ID), Some((3.0, 0.0)));
    assert_eq!(pos_in(cluster.client(bob).root(), FIRST_CLIENT_ID), Some((3.0, 0.0)));
}

#[test]
fn late_joiner_receives_a_snapshot() {
    init_logging();
    let mut cluster = TestCluster::new(|context| {
        let mut root = player_list(context);
        let player = Player::new(context, None);
        player.set_pos((9.0, 9.0));
        root.register_child(100, Box::new(player));
        Box::new(root)
    });
    for _ in 0..20 {
        cluster.tick(16);
    }

    let carol = cluster.add_client("carol", |context| Box::new(player_list(context)));
    for _ in 0..3 {
        cluster.tick(16);
    }

    assert_eq!(pos_in(cluster.client(carol).root(), 100), Some((9.0, 9.0)));
}

#[test]
fn disconnecting_client_is_reported_left() {
    init_logging();
    let mut cluster = TestCluster::new(|context| Box::new(player_list(context)));
    let alice = cluster.add_client("alice", |context| Box::new(player_list(context)));
    cluster.tick(16);

    cluster.client_mut(alice).disconnect();
    cluster.deliver();
    let events = cluster.tick(16);

    assert_eq!(events.left, vec!["alice".to_string()]);
    assert!(!cluster.host.session().has_peer("alice"));
    assert_eq!(cluster.host.session().peer_id("alice"), None);
}
