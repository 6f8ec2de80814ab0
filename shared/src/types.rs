/// Tick counter used to order writes per field
pub type SeqNum = u64;
/// Number of a leaf field within a node, starting at 1
pub type PropNumber = u16;
/// Id of a child within its parent, starting at 1
pub type ChildId = u32;
/// Stable game id assigned to a connected client
pub type ClientId = u32;

/// Expected seq step between two consecutive ticks. A larger jump is treated
/// as a discontinuity (e.g. a stall).
pub const SEQ_STEP: SeqNum = 1;
