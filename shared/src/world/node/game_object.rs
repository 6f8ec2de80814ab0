use crate::world::node::replicated_node::ReplicatedNode;

/// The nine phases a tick walks the tree through, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    PreUpdate,
    Update,
    PostUpdate,
    PrePhysics,
    Physics,
    PostPhysics,
    PreRender,
    Render,
    PostRender,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::PreUpdate,
        Phase::Update,
        Phase::PostUpdate,
        Phase::PrePhysics,
        Phase::Physics,
        Phase::PostPhysics,
        Phase::PreRender,
        Phase::Render,
        Phase::PostRender,
    ];
}

/// Per-phase hooks. Everything defaults to a no-op so objects only
/// implement the phases they care about.
pub trait Steppable {
    fn pre_update(&mut self, _millis: f64) {}
    fn update(&mut self, _millis: f64) {}
    fn post_update(&mut self, _millis: f64) {}
    fn pre_physics(&mut self, _millis: f64) {}
    fn physics(&mut self, _millis: f64) {}
    fn post_physics(&mut self, _millis: f64) {}
    fn pre_render(&mut self, _millis: f64) {}
    fn render(&mut self, _millis: f64) {}
    fn post_render(&mut self, _millis: f64) {}

    fn run_phase(&mut self, phase: Phase, millis: f64) {
        match phase {
            Phase::PreUpdate => self.pre_update(millis),
            Phase::Update => self.update(millis),
            Phase::PostUpdate => self.post_update(millis),
            Phase::PrePhysics => self.pre_physics(millis),
            Phase::Physics => self.physics(millis),
            Phase::PostPhysics => self.post_physics(millis),
            Phase::PreRender => self.pre_render(millis),
            Phase::Render => self.render(millis),
            Phase::PostRender => self.post_render(millis),
        }
    }
}

/// Whether a node takes part in stepping and publication
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GameObjectState {
    #[default]
    Normal,
    /// Skipped by stepping, still replicated
    Deactivated,
    /// Skipped by stepping and left out of published data
    Disabled,
}

/// A game entity in the replicated tree. The node carries the replication
/// state; the implementor carries the game state behind it.
pub trait GameObject: Steppable {
    fn node(&self) -> &ReplicatedNode;
    fn node_mut(&mut self) -> &mut ReplicatedNode;

    /// Gate for lazy initialization. By default an object is ready once it
    /// is locally authored or every non-optional field has arrived.
    fn ready(&self) -> bool {
        self.node().is_source() || self.node().props_ready()
    }

    fn on_initialize(&mut self) {}
    fn on_dispose(&mut self) {}
    fn on_reset(&mut self) {}
}

impl Steppable for ReplicatedNode {}

impl GameObject for ReplicatedNode {
    fn node(&self) -> &ReplicatedNode {
        self
    }

    fn node_mut(&mut self) -> &mut ReplicatedNode {
        self
    }
}
