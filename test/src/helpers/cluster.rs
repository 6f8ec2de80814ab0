use replica_shared::{
    GameObject, Instant, PeerSession, ReplicationContext, Replicator, SessionConfig, SessionEvents,
};

use crate::local_channel::LocalLink;

pub const HOST_NAME: &str = "host";

/// A host and its clients, each driven by a `Replicator` and wired together
/// with in-memory links
pub struct TestCluster {
    pub now: Instant,
    pub host: Replicator,
    pub clients: Vec<(Replicator, LocalLink)>,
}

impl TestCluster {
    pub fn new(root: impl FnOnce(&ReplicationContext) -> Box<dyn GameObject>) -> Self {
        let now = Instant::now();
        let context = ReplicationContext::host();
        let session = PeerSession::new(SessionConfig::default(), &now);
        let host = Replicator::new(&context, session, root(&context));
        Self {
            now,
            host,
            clients: Vec::new(),
        }
    }

    /// Connects a new client. Returns its index in `clients`.
    pub fn add_client(
        &mut self,
        name: &str,
        root: impl FnOnce(&ReplicationContext) -> Box<dyn GameObject>,
    ) -> usize {
        let context = ReplicationContext::client(None);
        let session = PeerSession::new(SessionConfig::default(), &self.now);
        let mut client = Replicator::new(&context, session, root(&context));
        let link = LocalLink::connect(
            name,
            client.session_mut(),
            HOST_NAME,
            self.host.session_mut(),
        );
        self.clients.push((client, link));
        self.clients.len() - 1
    }

    pub fn client(&self, index: usize) -> &Replicator {
        &self.clients[index].0
    }

    pub fn client_mut(&mut self, index: usize) -> &mut Replicator {
        &mut self.clients[index].0
    }

    /// Delivers everything queued on every link
    pub fn deliver(&mut self) {
        for (client, link) in self.clients.iter_mut() {
            link.deliver(client.session_mut(), self.host.session_mut());
        }
    }

    /// Advances time, ticks the host, then each client, delivering in
    /// between. Returns the host's events.
    pub fn tick(&mut self, millis: u32) -> SessionEvents {
        self.now.add_millis(millis);
        let events = self.host.tick(&self.now, millis as f64);
        self.deliver();
        for (client, _) in self.clients.iter_mut() {
            client.tick(&self.now, millis as f64);
        }
        self.deliver();
        events
    }
}
