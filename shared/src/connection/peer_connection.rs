use std::time::Duration;

use crate::{
    connection::{
        channel::{ChannelMode, DataChannel},
        error::ConnectionError,
    },
    Instant,
};

/// How far along a peer's channel pair is
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PeerState {
    NoChannels,
    Partial,
    Ready,
}

/// The reliable/unreliable channel pair to one remote peer, plus liveness
pub struct PeerConnection {
    name: String,
    reliable: Option<Box<dyn DataChannel>>,
    unreliable: Option<Box<dyn DataChannel>>,
    last_heard: Instant,
    announced: bool,
    joined: bool,
}

impl PeerConnection {
    pub fn new(name: &str, now: &Instant) -> Self {
        Self {
            name: name.to_string(),
            reliable: None,
            unreliable: None,
            last_heard: now.clone(),
            announced: false,
            joined: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn slot(&mut self, mode: ChannelMode) -> &mut Option<Box<dyn DataChannel>> {
        match mode {
            ChannelMode::Reliable => &mut self.reliable,
            ChannelMode::Unreliable => &mut self.unreliable,
        }
    }

    pub fn state(&self) -> PeerState {
        match (self.reliable.is_some(), self.unreliable.is_some()) {
            (true, true) => PeerState::Ready,
            (false, false) => PeerState::NoChannels,
            _ => PeerState::Partial,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == PeerState::Ready
    }

    /// Installs a channel, closing any channel it replaces
    pub fn open(&mut self, mode: ChannelMode, channel: Box<dyn DataChannel>) {
        if let Some(mut previous) = self.slot(mode).replace(channel) {
            previous.close();
        }
    }

    /// Drops a channel the transport reported closed. Returns whether it was
    /// open.
    pub fn remove(&mut self, mode: ChannelMode) -> bool {
        self.slot(mode).take().is_some()
    }

    pub fn close_all(&mut self) {
        for mode in ChannelMode::ALL {
            if let Some(mut channel) = self.slot(mode).take() {
                channel.close();
            }
        }
    }

    pub fn send(&mut self, mode: ChannelMode, payload: &[u8]) -> Result<(), ConnectionError> {
        let channel = match mode {
            ChannelMode::Reliable => self.reliable.as_mut(),
            ChannelMode::Unreliable => self.unreliable.as_mut(),
        };
        let Some(channel) = channel else {
            return Err(ConnectionError::ChannelNotOpen {
                peer: self.name.clone(),
                label: mode.label(),
            });
        };
        channel.send(payload)?;
        Ok(())
    }

    pub fn mark_heard(&mut self, now: &Instant) {
        self.last_heard = now.clone();
    }

    pub fn timed_out(&self, now: &Instant, timeout: Duration) -> bool {
        self.last_heard.elapsed(now) > timeout
    }

    /// Queues the join report. Returns false if it is already queued or
    /// delivered, so a join goes out once per connection even if a channel
    /// drops and reopens.
    pub(crate) fn announce(&mut self) -> bool {
        !std::mem::replace(&mut self.announced, true)
    }

    /// Takes back a queued join that could not be delivered
    pub(crate) fn withdraw(&mut self) {
        if !self.joined {
            self.announced = false;
        }
    }

    pub(crate) fn mark_joined(&mut self) {
        self.joined = true;
    }

    /// Whether the join was delivered. Only then is a leave reported.
    pub(crate) fn joined(&self) -> bool {
        self.joined
    }
}
