pub mod node;
pub mod value;
pub mod wire;
