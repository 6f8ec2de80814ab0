pub mod channel;
pub mod compression_config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod peer_connection;
pub mod peer_session;
pub mod session_config;
