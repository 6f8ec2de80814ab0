use crate::connection::error::TransportError;

/// Delivery guarantee of one of the two channels every peer pair opens
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Reliable,
    Unreliable,
}

impl ChannelMode {
    pub const ALL: [ChannelMode; 2] = [ChannelMode::Reliable, ChannelMode::Unreliable];

    /// Label the transport opens this channel under
    pub fn label(&self) -> &'static str {
        match self {
            ChannelMode::Reliable => "reliable",
            ChannelMode::Unreliable => "unreliable",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "reliable" => Some(ChannelMode::Reliable),
            "unreliable" => Some(ChannelMode::Unreliable),
            _ => None,
        }
    }
}

/// Sending half of one transport channel to a peer. The transport feeds
/// received bytes and open/close events into `PeerSession` separately.
pub trait DataChannel {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;
    fn close(&mut self);
}
