use std::collections::{BTreeMap, HashMap};

use log::{debug, trace, warn};

use crate::{
    types::{ChildId, ClientId, PropNumber, SeqNum},
    world::{
        node::{
            authority::{NetworkBehavior, ReplicationContext},
            error::NodeError,
            game_object::{GameObject, GameObjectState, Phase},
            name::NameParams,
            prop_handler::PropHandler,
            prop_slot::{Field, ImportStamp, PropSlot},
        },
        value::{
            channel_kind::ChannelKind, replicate::Replicate, replicated_value::ReplicatedValue,
            value_config::ValueConfig,
        },
        wire::{DataMap, WireKey, WireValue},
    },
    Instant,
};

/// Builds a child on demand when data arrives for an id the node does not
/// know yet. Returning `None` buffers the data until the child is registered.
pub type ChildFactory = Box<dyn FnMut(ChildId, &ReplicationContext) -> Option<Box<dyn GameObject>>>;

/// Most children a node holds payloads for before they are registered
pub const MAX_PENDING_CHILDREN: usize = 256;

/// Data that arrived for a child before it existed, folded into one map
struct PendingData {
    data: DataMap,
    stamp: ImportStamp,
}

impl PendingData {
    /// Folds a payload in so the newer of the two wins on every key
    fn fold(&mut self, data: &DataMap, stamp: ImportStamp) {
        if stamp.source >= self.stamp.source {
            self.data.merge(data.clone());
            self.stamp = stamp;
        } else {
            let mut older = data.clone();
            older.merge(std::mem::take(&mut self.data));
            self.data = older;
        }
    }
}

/// Children in insertion order, with an id index for lookups
#[derive(Default)]
struct ChildArena {
    slots: Vec<(ChildId, Box<dyn GameObject>)>,
    index: HashMap<ChildId, usize>,
}

impl ChildArena {
    fn contains(&self, id: ChildId) -> bool {
        self.index.contains_key(&id)
    }

    fn insert(&mut self, id: ChildId, child: Box<dyn GameObject>) {
        self.index.insert(id, self.slots.len());
        self.slots.push((id, child));
    }

    fn get(&self, id: ChildId) -> Option<&Box<dyn GameObject>> {
        self.index.get(&id).map(|slot| &self.slots[*slot].1)
    }

    fn get_mut(&mut self, id: ChildId) -> Option<&mut Box<dyn GameObject>> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.slots[slot].1)
    }

    fn iter(&self) -> impl Iterator<Item = &(ChildId, Box<dyn GameObject>)> {
        self.slots.iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut (ChildId, Box<dyn GameObject>)> {
        self.slots.iter_mut()
    }

    fn retain(&mut self, keep: impl Fn(&dyn GameObject) -> bool) {
        self.slots.retain(|(_, child)| keep(child.as_ref()));
        self.index.clear();
        for (slot, (id, _)) in self.slots.iter().enumerate() {
            self.index.insert(*id, slot);
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Runs one phase on an object: its own hook first, then its subtree
pub fn step_object(object: &mut dyn GameObject, phase: Phase, millis: f64) {
    object.run_phase(phase, millis);
    object.node_mut().step(phase, millis);
}

pub fn initialize_object(object: &mut dyn GameObject) {
    if object.node().initialized() {
        return;
    }
    object.node_mut().initialize();
    object.on_initialize();
}

pub fn dispose_object(object: &mut dyn GameObject) {
    if object.node().disposed() {
        return;
    }
    object.on_dispose();
    object.node_mut().dispose();
}

/// A node of the replicated object tree: numbered leaf fields plus keyed
/// children, with the authority rules that decide who writes what
pub struct ReplicatedNode {
    name: NameParams,
    context: ReplicationContext,
    owner: Option<ClientId>,
    offline: bool,
    state: GameObjectState,
    initialized: bool,
    deleted: bool,
    disposed: bool,
    props: BTreeMap<PropNumber, Box<dyn PropSlot>>,
    num_props: PropNumber,
    children: ChildArena,
    next_child_id: ChildId,
    pending: HashMap<ChildId, PendingData>,
    factory: Option<ChildFactory>,
}

impl ReplicatedNode {
    pub fn new(base: impl Into<String>, context: &ReplicationContext) -> Self {
        Self {
            name: NameParams::new(base),
            context: context.clone(),
            owner: None,
            offline: false,
            state: GameObjectState::Normal,
            initialized: false,
            deleted: false,
            disposed: false,
            props: BTreeMap::new(),
            num_props: 0,
            children: ChildArena::default(),
            next_child_id: 1,
            pending: HashMap::new(),
            factory: None,
        }
    }

    /// Marks the node as authored by a client rather than the host
    pub fn with_owner(mut self, owner: ClientId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_factory(
        mut self,
        factory: impl FnMut(ChildId, &ReplicationContext) -> Option<Box<dyn GameObject>> + 'static,
    ) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn set_factory(
        &mut self,
        factory: impl FnMut(ChildId, &ReplicationContext) -> Option<Box<dyn GameObject>> + 'static,
    ) {
        self.factory = Some(Box::new(factory));
    }

    pub fn name(&self) -> &NameParams {
        &self.name
    }

    pub fn name_mut(&mut self) -> &mut NameParams {
        &mut self.name
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.context
    }

    // Authority

    pub fn owner(&self) -> Option<ClientId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<ClientId>) {
        self.owner = owner;
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn network_behavior(&self) -> NetworkBehavior {
        NetworkBehavior::derive(
            self.offline,
            self.context.is_host(),
            self.owner.map(|owner| self.context.client_id_matches(owner)),
        )
    }

    pub fn is_source(&self) -> bool {
        self.network_behavior().is_source()
    }

    pub fn is_host(&self) -> bool {
        self.context.is_host()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn should_broadcast(&self) -> bool {
        self.network_behavior().should_broadcast()
    }

    // Fields

    /// Registers a leaf field. Logs and returns false on misuse.
    pub fn register_prop<T: Replicate>(
        &mut self,
        number: PropNumber,
        config: ValueConfig<T>,
        handler: impl PropHandler<T> + 'static,
    ) -> bool {
        match self.try_register_prop(number, config, handler) {
            Ok(()) => true,
            Err(error) => {
                warn!("{}", error);
                false
            }
        }
    }

    pub fn try_register_prop<T: Replicate>(
        &mut self,
        number: PropNumber,
        config: ValueConfig<T>,
        handler: impl PropHandler<T> + 'static,
    ) -> Result<(), NodeError> {
        if number == 0 {
            return Err(NodeError::InvalidPropNumber {
                node: self.name.to_string(),
                number,
            });
        }
        if self.initialized {
            return Err(NodeError::AlreadyInitialized {
                node: self.name.to_string(),
                number,
            });
        }
        if self.props.contains_key(&number) {
            return Err(NodeError::DuplicateProp {
                node: self.name.to_string(),
                number,
            });
        }
        let field = Field::new(ReplicatedValue::new(config), Box::new(handler));
        self.props.insert(number, Box::new(field));
        self.num_props = self.num_props.max(number);
        Ok(())
    }

    /// Typed access to a registered field's replicated value
    pub fn value<T: Replicate>(&self, number: PropNumber) -> Option<&ReplicatedValue<T>> {
        let slot = self.props.get(&number)?;
        slot.as_any()
            .downcast_ref::<Field<T>>()
            .map(|field| &field.value)
    }

    pub fn num_props(&self) -> PropNumber {
        self.num_props
    }

    /// Whether every non-optional field holds a value
    pub fn props_ready(&self) -> bool {
        self.props
            .values()
            .all(|slot| slot.is_optional() || slot.has_value())
    }

    // Children

    pub fn register_child(&mut self, id: ChildId, child: Box<dyn GameObject>) -> bool {
        match self.try_register_child(id, child) {
            Ok(()) => true,
            Err(error) => {
                warn!("{}", error);
                false
            }
        }
    }

    /// Attaches a child under `id`, first replaying any data that arrived
    /// for it before it existed
    pub fn try_register_child(
        &mut self,
        id: ChildId,
        mut child: Box<dyn GameObject>,
    ) -> Result<(), NodeError> {
        if id == 0 {
            return Err(NodeError::InvalidChildId {
                node: self.name.to_string(),
                id,
            });
        }
        if self.children.contains(id) {
            return Err(NodeError::DuplicateChild {
                node: self.name.to_string(),
                id,
            });
        }

        {
            let name = &mut child.node_mut().name;
            name.parent = Some(self.name.to_string());
            name.id = Some(id);
        }

        if let Some(pending) = self.pending.remove(&id) {
            debug!(
                "Replaying buffered data from seq {} into {}",
                pending.stamp.source,
                child.node().name
            );
            child.node_mut().import_stamped(&pending.data, pending.stamp);
        }

        self.children.insert(id, child);
        self.next_child_id = self.next_child_id.max(id.saturating_add(1));
        Ok(())
    }

    /// Registers a child under the next free id
    pub fn add_child(&mut self, child: Box<dyn GameObject>) -> Option<ChildId> {
        match self.try_add_child(child) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    pub fn try_add_child(&mut self, child: Box<dyn GameObject>) -> Result<ChildId, NodeError> {
        let id = self.next_child_id;
        if id == ChildId::MAX {
            return Err(NodeError::ChildIdsExhausted {
                node: self.name.to_string(),
            });
        }
        self.try_register_child(id, child)?;
        Ok(id)
    }

    pub fn has_child(&self, id: ChildId) -> bool {
        self.children.contains(id)
    }

    pub fn child(&self, id: ChildId) -> Option<&dyn GameObject> {
        self.children.get(id).map(|child| child.as_ref())
    }

    pub fn child_mut(&mut self, id: ChildId) -> Option<&mut (dyn GameObject + 'static)> {
        self.children.get_mut(id).map(|child| child.as_mut())
    }

    /// Child ids in registration order
    pub fn child_ids(&self) -> Vec<ChildId> {
        self.children.iter().map(|(id, _)| *id).collect()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Number of payloads waiting for a child that does not exist yet.
    /// Payloads for one id are merged, so this is 0 or 1.
    pub fn buffered(&self, id: ChildId) -> usize {
        usize::from(self.pending.contains_key(&id))
    }

    /// Number of unknown child ids holding buffered data
    pub fn pending_children(&self) -> usize {
        self.pending.len()
    }

    // Lifecycle

    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        debug!("Initialized {}", self.name);
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Marks this subtree as dead. It stops stepping immediately and is
    /// disposed by the parent's next `cleanup`.
    pub fn delete(&mut self) {
        self.deleted = true;
        for (_, child) in self.children.iter_mut() {
            child.node_mut().delete();
        }
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub fn dispose(&mut self) {
        for (_, child) in self.children.iter_mut() {
            dispose_object(child.as_mut());
        }
        self.children.clear();
        self.pending.clear();
        self.disposed = true;
        debug!("Disposed {}", self.name);
    }

    pub fn disposed(&self) -> bool {
        self.disposed
    }

    pub fn state(&self) -> GameObjectState {
        self.state
    }

    pub fn set_state(&mut self, state: GameObjectState) {
        self.state = state;
    }

    pub fn can_step(&self) -> bool {
        self.initialized && !self.deleted && self.state == GameObjectState::Normal
    }

    /// Walks the children through one phase. Uninitialized children are
    /// initialized during `PreUpdate` as soon as they report ready.
    pub fn step(&mut self, phase: Phase, millis: f64) {
        for (_, child) in self.children.iter_mut() {
            if phase == Phase::PreUpdate
                && !child.node().initialized()
                && !child.node().deleted()
                && child.ready()
            {
                initialize_object(child.as_mut());
            }
            if child.node().can_step() {
                step_object(child.as_mut(), phase, millis);
            }
        }
    }

    /// Disposes deleted children and unregisters disposed ones
    pub fn cleanup(&mut self) {
        for (_, child) in self.children.iter_mut() {
            if child.node().deleted() {
                dispose_object(child.as_mut());
            } else {
                child.node_mut().cleanup();
            }
        }
        self.children.retain(|child| !child.node().disposed());
    }

    /// Clears every field's replication state, down the whole subtree
    pub fn reset(&mut self) {
        for slot in self.props.values_mut() {
            slot.reset();
        }
        self.pending.clear();
        for (_, child) in self.children.iter_mut() {
            child.on_reset();
            child.node_mut().reset();
        }
    }

    // Replication

    /// Pulls local values into the replicated fields of every broadcasting
    /// node in the subtree
    pub fn update_data(&mut self, seq_num: SeqNum) {
        if self.initialized && !self.offline && self.should_broadcast() {
            for slot in self.props.values_mut() {
                slot.update(seq_num);
            }
        }
        for (_, child) in self.children.iter_mut() {
            child.node_mut().update_data(seq_num);
        }
    }

    /// Collects what this subtree wants to publish on `kind`. The flag is
    /// false when there is nothing to send.
    pub fn data_map(&mut self, kind: ChannelKind, seq_num: SeqNum, now: &Instant) -> (DataMap, bool) {
        let mut data = DataMap::new();
        if !self.initialized || self.offline || self.state == GameObjectState::Disabled {
            return (data, false);
        }

        if self.should_broadcast() {
            for (number, slot) in self.props.iter_mut() {
                if let Some(bytes) = slot.publish(kind, seq_num, now) {
                    data.insert_field(*number, bytes);
                }
            }
        }

        for (id, child) in self.children.iter_mut() {
            let (child_data, has_data) = child.node_mut().data_map(kind, seq_num, now);
            if has_data {
                data.insert_child(*id, self.num_props, child_data);
            }
        }

        let has_data = !data.is_empty();
        (data, has_data)
    }

    /// Applies a remote payload according to this node's authority, creating
    /// or buffering children as needed
    pub fn import_data(&mut self, data: &DataMap, seq_num: SeqNum) {
        self.import_stamped(data, ImportStamp::direct(seq_num));
    }

    /// Imports a payload a peer sent at `source_seq` in its own seq domain.
    /// Relayed fields drop writes not newer than the last one they took from
    /// the sender, and store accepted ones at `local_seq`.
    pub fn import_relayed(&mut self, data: &DataMap, source_seq: SeqNum, local_seq: SeqNum) {
        self.import_stamped(data, ImportStamp::new(source_seq, local_seq));
    }

    fn import_stamped(&mut self, data: &DataMap, stamp: ImportStamp) {
        if self.offline {
            trace!("Ignoring import into offline {}", self.name);
            return;
        }
        let behavior = self.network_behavior();

        for (raw_key, value) in data {
            match (WireKey::classify(*raw_key, self.num_props), value) {
                (Some(WireKey::Field(number)), WireValue::Leaf(bytes)) => {
                    let Some(slot) = self.props.get_mut(&number) else {
                        warn!("{} has no prop {}, dropping it", self.name, number);
                        continue;
                    };
                    if let Err(error) = slot.import(bytes, stamp, behavior) {
                        warn!("Failed to decode prop {} of {}: {}", number, self.name, error);
                    }
                }
                (Some(WireKey::Child(id)), WireValue::Node(child_data)) => {
                    self.import_child(id, child_data, stamp);
                }
                _ => {
                    warn!("Malformed entry {} in payload for {}", raw_key, self.name);
                }
            }
        }
    }

    fn import_child(&mut self, id: ChildId, data: &DataMap, stamp: ImportStamp) {
        if !self.children.contains(id) {
            let created = self
                .factory
                .as_mut()
                .and_then(|factory| factory(id, &self.context));
            if let Some(child) = created {
                self.register_child(id, child);
            }
        }

        match self.children.get_mut(id) {
            Some(child) => child.node_mut().import_stamped(data, stamp),
            None => {
                if let Some(pending) = self.pending.get_mut(&id) {
                    trace!("Merging payload for child {} of {}", id, self.name);
                    pending.fold(data, stamp);
                    return;
                }
                // SECURITY: a peer can name any id, so unknown ones are capped
                if self.pending.len() >= MAX_PENDING_CHILDREN {
                    warn!(
                        "{} already buffers {} unknown children, dropping data for {}",
                        self.name, MAX_PENDING_CHILDREN, id
                    );
                    return;
                }
                trace!("Buffering payload for child {} of {}", id, self.name);
                self.pending.insert(
                    id,
                    PendingData {
                        data: data.clone(),
                        stamp,
                    },
                );
            }
        }
    }

    /// Forces a past payload back into the subtree, bypassing authority and
    /// change tracking
    pub fn rollback(&mut self, data: &DataMap, seq_num: SeqNum) {
        for (raw_key, value) in data {
            match (WireKey::classify(*raw_key, self.num_props), value) {
                (Some(WireKey::Field(number)), WireValue::Leaf(bytes)) => {
                    let Some(slot) = self.props.get_mut(&number) else {
                        warn!("{} has no prop {} to roll back", self.name, number);
                        continue;
                    };
                    if let Err(error) = slot.rollback(bytes, seq_num) {
                        warn!("Failed to decode prop {} of {}: {}", number, self.name, error);
                    }
                }
                (Some(WireKey::Child(id)), WireValue::Node(child_data)) => {
                    if let Some(child) = self.children.get_mut(id) {
                        child.node_mut().rollback(child_data, seq_num);
                    }
                }
                _ => {
                    warn!("Malformed entry {} in rollback for {}", raw_key, self.name);
                }
            }
        }
    }
}
