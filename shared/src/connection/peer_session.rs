use std::{
    collections::{HashMap, VecDeque},
    mem,
};

use log::{debug, info, trace, warn};

use crate::{
    connection::{
        channel::{ChannelMode, DataChannel},
        decoder::Decoder,
        encoder::Encoder,
        error::ConnectionError,
        peer_connection::{PeerConnection, PeerState},
        session_config::SessionConfig,
    },
    messages::{message::Message, message_type::MessageType},
    types::ClientId,
    world::value::channel_kind::ChannelKind,
    Instant, TimeQueue,
};

/// Addresses a peer by transport name or by assigned game id
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PeerRef<'a> {
    Name(&'a str),
    Id(ClientId),
}

impl<'a> From<&'a str> for PeerRef<'a> {
    fn from(name: &'a str) -> Self {
        PeerRef::Name(name)
    }
}

impl<'a> From<&'a String> for PeerRef<'a> {
    fn from(name: &'a String) -> Self {
        PeerRef::Name(name)
    }
}

impl From<ClientId> for PeerRef<'_> {
    fn from(id: ClientId) -> Self {
        PeerRef::Id(id)
    }
}

/// A game-state message waiting to be imported
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub peer: String,
    pub message: Message,
}

/// Everything that happened on the session since the last `pre_update`
#[derive(Debug, Default)]
pub struct SessionEvents {
    pub joined: Vec<String>,
    pub left: Vec<String>,
    pub messages: Vec<InboundMessage>,
}

type MessageCallback = Box<dyn FnMut(&str, &Message)>;
type PeerCallback = Box<dyn FnMut(&str)>;

#[derive(PartialEq, Eq)]
struct DelayedPayload {
    peer: String,
    mode: ChannelMode,
    payload: Box<[u8]>,
}

/// Owns the channel pairs to every remote peer. Transport events only
/// buffer; the tick loop drains them through `pre_update`.
pub struct PeerSession {
    config: SessionConfig,
    now: Instant,
    peers: HashMap<String, PeerConnection>,
    name_to_id: HashMap<String, ClientId>,
    id_to_name: HashMap<ClientId, String>,
    joined: VecDeque<String>,
    left: VecDeque<String>,
    inbound: VecDeque<InboundMessage>,
    message_callbacks: HashMap<MessageType, Vec<MessageCallback>>,
    join_callbacks: Vec<PeerCallback>,
    leave_callbacks: Vec<PeerCallback>,
    last_ping: Instant,
    delayed: TimeQueue<DelayedPayload>,
    encoder: Encoder,
    decoder: Decoder,
}

impl PeerSession {
    pub fn new(config: SessionConfig, now: &Instant) -> Self {
        Self {
            last_ping: now.clone(),
            encoder: Encoder::new(&config.compression),
            decoder: Decoder::new(&config.compression),
            config,
            now: now.clone(),
            peers: HashMap::new(),
            name_to_id: HashMap::new(),
            id_to_name: HashMap::new(),
            joined: VecDeque::new(),
            left: VecDeque::new(),
            inbound: VecDeque::new(),
            message_callbacks: HashMap::new(),
            join_callbacks: Vec::new(),
            leave_callbacks: Vec::new(),
            delayed: TimeQueue::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // Callbacks

    /// Registers a handler for a non game-state message type. Handlers run
    /// as soon as the message arrives.
    pub fn register_callback(
        &mut self,
        msg_type: MessageType,
        callback: impl FnMut(&str, &Message) + 'static,
    ) {
        if msg_type == MessageType::GameState {
            warn!("Game-state messages are drained by pre_update, ignoring callback");
            return;
        }
        self.message_callbacks
            .entry(msg_type)
            .or_default()
            .push(Box::new(callback));
    }

    pub fn on_peer_joined(&mut self, callback: impl FnMut(&str) + 'static) {
        self.join_callbacks.push(Box::new(callback));
    }

    pub fn on_peer_left(&mut self, callback: impl FnMut(&str) + 'static) {
        self.leave_callbacks.push(Box::new(callback));
    }

    // Peers

    pub fn has_peer(&self, name: &str) -> bool {
        self.peers.contains_key(name)
    }

    pub fn peer_state(&self, name: &str) -> Option<PeerState> {
        self.peers.get(name).map(|peer| peer.state())
    }

    pub fn is_ready<'p>(&self, peer: impl Into<PeerRef<'p>>) -> bool {
        self.resolve(peer.into())
            .and_then(|name| self.peers.get(name))
            .map_or(false, |peer| peer.is_ready())
    }

    /// Names of every peer with both channels open
    pub fn ready_peers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .peers
            .values()
            .filter(|peer| peer.is_ready())
            .map(|peer| peer.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn assign_id(&mut self, name: &str, id: ClientId) {
        if let Some(previous) = self.id_to_name.insert(id, name.to_string()) {
            if previous != name {
                warn!("Client id {} moved from {} to {}", id, previous, name);
                self.name_to_id.remove(&previous);
            }
        }
        if let Some(previous_id) = self.name_to_id.insert(name.to_string(), id) {
            if previous_id != id {
                self.id_to_name.remove(&previous_id);
            }
        }
    }

    pub fn peer_id(&self, name: &str) -> Option<ClientId> {
        self.name_to_id.get(name).copied()
    }

    pub fn peer_name(&self, id: ClientId) -> Option<&str> {
        self.id_to_name.get(&id).map(|name| name.as_str())
    }

    fn resolve<'s>(&'s self, peer: PeerRef<'s>) -> Option<&'s str> {
        match peer {
            PeerRef::Name(name) => Some(name),
            PeerRef::Id(id) => self.peer_name(id),
        }
    }

    // Transport events

    /// A transport channel to `name` opened. Returns false for unknown labels.
    pub fn on_channel_open(&mut self, name: &str, label: &str, channel: Box<dyn DataChannel>) -> bool {
        let Some(mode) = ChannelMode::from_label(label) else {
            warn!("Dropping channel {:?} to {}: unknown label", label, name);
            return false;
        };
        let now = self.now.clone();
        let peer = self
            .peers
            .entry(name.to_string())
            .or_insert_with(|| PeerConnection::new(name, &now));
        peer.open(mode, channel);
        peer.mark_heard(&now);
        debug!("Opened {} channel to {}", label, name);

        if peer.is_ready() && peer.announce() {
            info!("Peer {} is ready", name);
            self.joined.push_back(name.to_string());
        }
        true
    }

    /// A transport channel to `name` closed. A peer left with no channels is
    /// removed.
    pub fn on_channel_close(&mut self, name: &str, label: &str) {
        let Some(mode) = ChannelMode::from_label(label) else {
            warn!("Close for unknown channel {:?} to {}", label, name);
            return;
        };
        let Some(peer) = self.peers.get_mut(name) else {
            return;
        };
        peer.remove(mode);
        debug!("Closed {} channel to {}", label, name);
        if peer.state() == PeerState::NoChannels {
            self.remove_peer(name);
        }
    }

    /// Bytes arrived from `name`. Game-state messages are buffered for the
    /// next `pre_update`, everything else is dispatched immediately.
    pub fn on_data(&mut self, name: &str, label: &str, bytes: &[u8]) {
        if ChannelMode::from_label(label).is_none() {
            warn!("Dropping data from {} on unknown channel {:?}", name, label);
            return;
        }
        let Some(peer) = self.peers.get_mut(name) else {
            warn!("Dropping data from unknown peer {}", name);
            return;
        };
        peer.mark_heard(&self.now);

        let message = match self.decode(bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!("Dropping message from {}: {}", name, error);
                return;
            }
        };
        trace!("Received {:?} from {}", message.msg_type(), name);

        match message.msg_type() {
            MessageType::GameState => {
                self.inbound.push_back(InboundMessage {
                    peer: name.to_string(),
                    message,
                });
            }
            MessageType::Disconnect => {
                self.dispatch(name, &message);
                info!("Peer {} disconnected", name);
                if let Some(mut peer) = self.peers.remove(name) {
                    peer.close_all();
                    self.forget(peer);
                }
            }
            _ => self.dispatch(name, &message),
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<Message, ConnectionError> {
        let payload = self.decoder.try_decode(bytes)?;
        Ok(Message::decode(payload)?)
    }

    fn dispatch(&mut self, name: &str, message: &Message) {
        if let Some(callbacks) = self.message_callbacks.get_mut(&message.msg_type()) {
            for callback in callbacks.iter_mut() {
                callback(name, message);
            }
        }
    }

    // Tick

    /// Drains the join buffer, sweeps dead peers, sends due pings and
    /// delayed payloads, then hands back the buffered game-state messages
    pub fn pre_update(&mut self, now: &Instant) -> SessionEvents {
        self.now = now.clone();
        let mut events = SessionEvents::default();

        while let Some(name) = self.joined.pop_front() {
            let Some(peer) = self.peers.get_mut(&name) else {
                continue;
            };
            if peer.joined() {
                continue;
            }
            if !peer.is_ready() {
                // lost a channel before the join went out, so it is queued
                // again once the pair is back
                peer.withdraw();
                continue;
            }
            peer.mark_joined();
            for callback in self.join_callbacks.iter_mut() {
                callback(&name);
            }
            events.joined.push(name);
        }

        let timeout = self.config.disconnect_timeout;
        let mut timed_out: Vec<String> = self
            .peers
            .values()
            .filter(|peer| peer.timed_out(now, timeout))
            .map(|peer| peer.name().to_string())
            .collect();
        timed_out.sort();
        for name in timed_out {
            info!("Peer {} timed out", name);
            self.remove_peer(&name);
        }

        while let Some(name) = self.left.pop_front() {
            for callback in self.leave_callbacks.iter_mut() {
                callback(&name);
            }
            events.left.push(name);
        }

        if self.last_ping.elapsed(now) >= self.config.ping_interval {
            self.last_ping = now.clone();
            self.broadcast(ChannelKind::Reliable, &Message::ping());
        }

        self.flush();

        events.messages = mem::take(&mut self.inbound).into();
        events
    }

    /// Transmits delayed payloads whose delay has passed on the wall clock
    pub fn flush(&mut self) {
        while let Some(delayed) = self.delayed.pop_item(&Instant::now()) {
            if let Err(error) = self.transmit(&delayed.peer, delayed.mode, &delayed.payload) {
                warn!("Dropping delayed payload to {}: {}", delayed.peer, error);
            }
        }
    }

    // Sending

    /// Sends to one ready peer. Logs and returns false on failure.
    pub fn send<'p>(&mut self, peer: impl Into<PeerRef<'p>>, kind: ChannelKind, message: &Message) -> bool {
        match self.try_send(peer, kind, message) {
            Ok(()) => true,
            Err(error) => {
                warn!("{}", error);
                false
            }
        }
    }

    pub fn try_send<'p>(
        &mut self,
        peer: impl Into<PeerRef<'p>>,
        kind: ChannelKind,
        message: &Message,
    ) -> Result<(), ConnectionError> {
        let name = match peer.into() {
            PeerRef::Name(name) => name.to_string(),
            PeerRef::Id(id) => self
                .peer_name(id)
                .map(|name| name.to_string())
                .ok_or_else(|| ConnectionError::UnknownPeer {
                    peer: format!("#{}", id),
                })?,
        };
        self.send_bytes(&name, kind.mode(), message.encode())
    }

    /// Sends to every ready peer, returning how many were reached
    pub fn broadcast(&mut self, kind: ChannelKind, message: &Message) -> usize {
        let payload = message.encode();
        let mut sent = 0;
        for name in self.ready_peers() {
            match self.send_bytes(&name, kind.mode(), payload.clone()) {
                Ok(()) => sent += 1,
                Err(error) => warn!("{}", error),
            }
        }
        sent
    }

    fn send_bytes(&mut self, name: &str, mode: ChannelMode, payload: Box<[u8]>) -> Result<(), ConnectionError> {
        let Some(peer) = self.peers.get(name) else {
            return Err(ConnectionError::UnknownPeer {
                peer: name.to_string(),
            });
        };
        if !peer.is_ready() {
            return Err(ConnectionError::ChannelNotOpen {
                peer: name.to_string(),
                label: mode.label(),
            });
        }

        match self.config.artificial_delay {
            Some(delay) => {
                let mut due = Instant::now();
                due.add_millis(u32::try_from(delay.as_millis()).unwrap_or(u32::MAX));
                self.delayed.add_item(
                    due,
                    DelayedPayload {
                        peer: name.to_string(),
                        mode,
                        payload,
                    },
                );
                Ok(())
            }
            None => self.transmit(name, mode, &payload),
        }
    }

    fn transmit(&mut self, name: &str, mode: ChannelMode, payload: &[u8]) -> Result<(), ConnectionError> {
        let peer = self
            .peers
            .get_mut(name)
            .ok_or_else(|| ConnectionError::UnknownPeer {
                peer: name.to_string(),
            })?;
        let encoded = self.encoder.try_encode(payload)?;
        peer.send(mode, encoded)
    }

    // Teardown

    /// Says goodbye to a peer, best-effort, and closes its channels
    pub fn disconnect<'p>(&mut self, peer: impl Into<PeerRef<'p>>) -> bool {
        let Some(name) = self.resolve(peer.into()).map(|name| name.to_string()) else {
            return false;
        };
        if !self.has_peer(&name) {
            return false;
        }
        if let Err(error) = self.transmit(&name, ChannelMode::Reliable, &Message::disconnect().encode()) {
            debug!("Could not notify {} of disconnect: {}", name, error);
        }
        info!("Disconnecting {}", name);
        self.remove_peer(&name);
        true
    }

    pub fn disconnect_all(&mut self) {
        let mut names: Vec<String> = self.peers.keys().cloned().collect();
        names.sort();
        for name in names {
            self.disconnect(name.as_str());
        }
    }

    fn remove_peer(&mut self, name: &str) {
        if let Some(mut peer) = self.peers.remove(name) {
            peer.close_all();
            self.forget(peer);
        }
    }

    fn forget(&mut self, peer: PeerConnection) {
        if let Some(id) = self.name_to_id.remove(peer.name()) {
            self.id_to_name.remove(&id);
        }
        if peer.joined() {
            self.left.push_back(peer.name().to_string());
        }
    }
}
