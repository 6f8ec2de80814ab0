use thiserror::Error;

use crate::types::{ChildId, PropNumber};

/// Misuse of the node API. These are logged and turned into no-ops by the
/// non-`try_` entry points; they never corrupt the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Prop numbers start at 1
    #[error("Invalid prop number {number} on {node}, prop numbers start at 1")]
    InvalidPropNumber { node: String, number: PropNumber },

    #[error("Prop {number} is already registered on {node}")]
    DuplicateProp { node: String, number: PropNumber },

    /// Props must be fully declared before the node initializes
    #[error("Cannot register prop {number} on {node} after initialization")]
    AlreadyInitialized { node: String, number: PropNumber },

    /// Child ids start at 1
    #[error("Invalid child id {id} on {node}, child ids start at 1")]
    InvalidChildId { node: String, id: ChildId },

    #[error("Child {id} is already registered on {node}")]
    DuplicateChild { node: String, id: ChildId },

    #[error("No free child id left on {node}")]
    ChildIdsExhausted { node: String },
}
