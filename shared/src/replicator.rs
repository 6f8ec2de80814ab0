use log::{debug, info};

use crate::{
    connection::peer_session::{PeerSession, SessionEvents},
    messages::{message::Message, message_type::MessageType},
    types::{ClientId, SeqNum},
    world::{
        node::{
            authority::ReplicationContext,
            game_object::{GameObject, Phase},
            replicated_node::{initialize_object, step_object},
        },
        value::channel_kind::ChannelKind,
    },
    Instant,
};

/// First id the host hands out to joining clients
pub const FIRST_CLIENT_ID: ClientId = 1;

/// Drives one peer's replication: owns the session, the root of the object
/// tree and the tick counter, and runs them in tick order
pub struct Replicator {
    context: ReplicationContext,
    session: PeerSession,
    root: Box<dyn GameObject>,
    seq_num: SeqNum,
    next_client_id: ClientId,
}

impl Replicator {
    pub fn new(context: &ReplicationContext, mut session: PeerSession, mut root: Box<dyn GameObject>) -> Self {
        initialize_object(root.as_mut());

        if !context.is_host() {
            let identity_context = context.clone();
            session.register_callback(MessageType::Identity, move |peer, message| {
                info!("Assigned client id {:?} by {}", message.client_id(), peer);
                identity_context.set_client_id(message.client_id());
            });
        }

        Self {
            context: context.clone(),
            session,
            root,
            seq_num: 0,
            next_client_id: FIRST_CLIENT_ID,
        }
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.context
    }

    pub fn session(&self) -> &PeerSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PeerSession {
        &mut self.session
    }

    pub fn root(&self) -> &dyn GameObject {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut dyn GameObject {
        self.root.as_mut()
    }

    pub fn seq_num(&self) -> SeqNum {
        self.seq_num
    }

    /// Runs one tick: drain the session, import remote state, step the tree,
    /// then snapshot and publish. Returns what the session reported.
    pub fn tick(&mut self, now: &Instant, millis: f64) -> SessionEvents {
        self.seq_num += 1;
        let seq_num = self.seq_num;
        let is_host = self.context.is_host();

        let events = self.session.pre_update(now);

        if is_host {
            for name in &events.joined {
                let id = self.next_client_id;
                self.next_client_id += 1;
                self.session.assign_id(name, id);
                self.session
                    .send(name, ChannelKind::Reliable, &Message::identity(id));
            }
        }

        // The host re-publishes relayed values in its own seq domain. Staleness
        // is still judged against the sender's seq.
        for inbound in &events.messages {
            let message = &inbound.message;
            if is_host {
                self.root
                    .node_mut()
                    .import_relayed(message.data(), message.seq_num(), seq_num);
            } else {
                self.root
                    .node_mut()
                    .import_data(message.data(), message.seq_num());
            }
        }

        for phase in Phase::ALL {
            step_object(self.root.as_mut(), phase, millis);
        }
        self.root.node_mut().cleanup();

        self.root.node_mut().update_data(seq_num);
        for kind in [ChannelKind::Reliable, ChannelKind::Unreliable] {
            let (data, has_data) = self.root.node_mut().data_map(kind, seq_num, now);
            if has_data {
                self.session.broadcast(kind, &Message::game_state(seq_num, data));
            }
        }

        if !events.joined.is_empty() {
            let (data, _) = self.root.node_mut().data_map(ChannelKind::Init, seq_num, now);
            for name in &events.joined {
                debug!("Sending snapshot to {} at seq {}", name, seq_num);
                self.session.send(
                    name,
                    ChannelKind::Init,
                    &Message::game_state(seq_num, data.clone()),
                );
            }
        }

        events
    }

    /// Says goodbye to every peer
    pub fn disconnect(&mut self) {
        self.session.disconnect_all();
    }
}
