use std::{cell::Cell, fmt, rc::Rc};

use crate::types::ClientId;

/// Who may author a node's values on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkBehavior {
    /// Authors values locally and pushes them out
    Source,
    /// Only ever accepts remote writes
    Copy,
    /// Host forwarding a value authored by a client; re-validates and re-broadcasts
    Relay,
    /// Excluded from the wire, locally authoritative
    Offline,
}

impl NetworkBehavior {
    /// `client_id_matches` is `None` for host-authored nodes, and otherwise
    /// whether the owning client is the local one
    pub fn derive(is_offline: bool, is_host: bool, client_id_matches: Option<bool>) -> Self {
        if is_offline {
            return NetworkBehavior::Offline;
        }
        match client_id_matches {
            None if is_host => NetworkBehavior::Source,
            None => NetworkBehavior::Copy,
            Some(true) => NetworkBehavior::Source,
            Some(false) if is_host => NetworkBehavior::Relay,
            Some(false) => NetworkBehavior::Copy,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NetworkBehavior::Source | NetworkBehavior::Offline)
    }

    pub fn should_broadcast(&self) -> bool {
        matches!(self, NetworkBehavior::Source | NetworkBehavior::Relay)
    }
}

struct ContextInner {
    is_host: Cell<bool>,
    client_id: Cell<Option<ClientId>>,
}

/// Handle carrying the local peer's identity, shared by every node built
/// from it. The client id is assigned after connecting, so it can change.
#[derive(Clone)]
pub struct ReplicationContext {
    inner: Rc<ContextInner>,
}

impl ReplicationContext {
    pub fn host() -> Self {
        Self::new(true, None)
    }

    pub fn client(client_id: Option<ClientId>) -> Self {
        Self::new(false, client_id)
    }

    pub fn new(is_host: bool, client_id: Option<ClientId>) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                is_host: Cell::new(is_host),
                client_id: Cell::new(client_id),
            }),
        }
    }

    pub fn is_host(&self) -> bool {
        self.inner.is_host.get()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.inner.client_id.get()
    }

    pub fn set_client_id(&self, client_id: Option<ClientId>) {
        self.inner.client_id.set(client_id);
    }

    pub fn set_host(&self, is_host: bool) {
        self.inner.is_host.set(is_host);
    }

    pub fn client_id_matches(&self, owner: ClientId) -> bool {
        self.client_id() == Some(owner)
    }
}

impl fmt::Debug for ReplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicationContext")
            .field("is_host", &self.is_host())
            .field("client_id", &self.client_id())
            .finish()
    }
}
