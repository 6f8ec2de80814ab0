pub mod channel_kind;
pub mod replicate;
pub mod replicated_value;
pub mod value_config;
