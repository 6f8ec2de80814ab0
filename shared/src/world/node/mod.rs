pub mod authority;
pub mod error;
pub mod game_object;
pub mod name;
pub mod prop_handler;
pub(crate) mod prop_slot;
pub mod replicated_node;
