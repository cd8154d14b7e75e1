use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::constants::{NETWORK_NAME, WORM_NAME};
use crate::domain::fact::{EntityRef, Property};

/// Closed set of things the loader can talk about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Neuron,
    Muscle,
    Network,
    Worm,
    Connection,
    Evidence,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Neuron => "Neuron",
            EntityKind::Muscle => "Muscle",
            EntityKind::Network => "Network",
            EntityKind::Worm => "Worm",
            EntityKind::Connection => "Connection",
            EntityKind::Evidence => "Evidence",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub attributes: BTreeMap<Property, Vec<String>>,
}

impl Entity {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind, &self.name)
    }

    /// Record an attribute value; values accumulate and are never removed.
    pub fn record(&mut self, property: Property, value: &str) {
        self.attributes
            .entry(property)
            .or_default()
            .push(value.to_string());
    }

    pub fn values(&self, property: Property) -> &[String] {
        self.attributes
            .get(&property)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Name-keyed arena. `get_or_create` is the only way an entity comes into existence.
#[derive(Debug, Default)]
pub struct EntityArena {
    entities: Vec<Entity>,
    index: HashMap<(EntityKind, String), EntityId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id and whether the entity was created by this call.
    pub fn get_or_create(&mut self, kind: EntityKind, name: &str) -> (EntityId, bool) {
        if let Some(id) = self.index.get(&(kind, name.to_string())) {
            return (*id, false);
        }
        let id = EntityId(self.entities.len());
        self.entities.push(Entity {
            id,
            kind,
            name: name.to_string(),
            attributes: BTreeMap::new(),
        });
        self.index.insert((kind, name.to_string()), id);
        (id, true)
    }

    pub fn lookup(&self, kind: EntityKind, name: &str) -> Option<EntityId> {
        self.index.get(&(kind, name.to_string())).copied()
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Aggregate root for one organism: owns the network, its cells and muscles.
#[derive(Debug)]
pub struct Worm {
    arena: EntityArena,
    worm: EntityId,
    network: EntityId,
    network_neurons: BTreeSet<EntityId>,
    cells: BTreeSet<EntityId>,
    muscles: BTreeSet<EntityId>,
    synapses: BTreeSet<EntityId>,
}

impl Default for Worm {
    fn default() -> Self {
        Self::new()
    }
}

impl Worm {
    pub fn new() -> Self {
        let mut arena = EntityArena::new();
        let (worm, _) = arena.get_or_create(EntityKind::Worm, WORM_NAME);
        let (network, _) = arena.get_or_create(EntityKind::Network, NETWORK_NAME);
        Self {
            arena,
            worm,
            network,
            network_neurons: BTreeSet::new(),
            cells: BTreeSet::new(),
            muscles: BTreeSet::new(),
            synapses: BTreeSet::new(),
        }
    }

    pub fn arena(&self) -> &EntityArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut EntityArena {
        &mut self.arena
    }

    pub fn worm_ref(&self) -> EntityRef {
        self.arena.get(self.worm).entity_ref()
    }

    pub fn network_ref(&self) -> EntityRef {
        self.arena.get(self.network).entity_ref()
    }

    /// Bare neuron, not (yet) a network member.
    pub fn neuron(&mut self, name: &str) -> (EntityId, bool) {
        self.arena.get_or_create(EntityKind::Neuron, name)
    }

    /// Neuron that belongs to the network. Returns true when membership is new.
    pub fn add_network_neuron(&mut self, name: &str) -> (EntityId, bool) {
        let (id, _) = self.neuron(name);
        (id, self.network_neurons.insert(id))
    }

    pub fn add_muscle(&mut self, name: &str) -> (EntityId, bool) {
        let (id, _) = self.arena.get_or_create(EntityKind::Muscle, name);
        (id, self.muscles.insert(id))
    }

    pub fn add_cell(&mut self, id: EntityId) -> bool {
        self.cells.insert(id)
    }

    pub fn add_synapse(&mut self, name: &str) -> (EntityId, bool) {
        let (id, _) = self.arena.get_or_create(EntityKind::Connection, name);
        (id, self.synapses.insert(id))
    }

    pub fn network_neuron(&self, name: &str) -> Option<EntityId> {
        self.arena
            .lookup(EntityKind::Neuron, name)
            .filter(|id| self.network_neurons.contains(id))
    }

    /// Names of neurons that belong to the network
    pub fn known_neurons(&self) -> HashSet<String> {
        self.network_neurons
            .iter()
            .map(|id| self.arena.get(*id).name.clone())
            .collect()
    }

    pub fn neuron_count(&self) -> usize {
        self.network_neurons.len()
    }

    pub fn muscle_count(&self) -> usize {
        self.muscles.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }
}
