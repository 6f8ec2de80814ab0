use std::time::Duration;

use crate::connection::compression_config::CompressionConfig;

/// Contains config properties which will be used by a `PeerSession`
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How often a Ping is sent to every ready peer
    pub ping_interval: Duration,
    /// A peer that has not been heard from for longer than this is
    /// disconnected
    pub disconnect_timeout: Duration,
    /// Holds every outgoing payload back by this long, to simulate latency
    pub artificial_delay: Option<Duration>,
    pub compression: CompressionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(1),
            disconnect_timeout: Duration::from_secs(10),
            artificial_delay: None,
            compression: CompressionConfig::default(),
        }
    }
}
