use serde::Serialize;
use uuid::Uuid;

use crate::domain::entity::EntityKind;
use crate::domain::graph::encode_segment;
use crate::types::{AttributeKind, SynapseType};

/// Predicates the loader asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Property {
    Name,
    NeuronNetwork,
    Neuron,
    Muscle,
    Cell,
    InnervatedBy,
    Synapse,
    LineageName,
    Description,
    Neurotransmitter,
    Innexin,
    Neuropeptide,
    Receptor,
    Type,
}

impl Property {
    pub fn local_name(self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::NeuronNetwork => "neuron_network",
            Property::Neuron => "neuron",
            Property::Muscle => "muscle",
            Property::Cell => "cell",
            Property::InnervatedBy => "innervatedBy",
            Property::Synapse => "synapse",
            Property::LineageName => "lineageName",
            Property::Description => "description",
            Property::Neurotransmitter => "neurotransmitter",
            Property::Innexin => "innexin",
            Property::Neuropeptide => "neuropeptide",
            Property::Receptor => "receptor",
            Property::Type => "type",
        }
    }

    /// Literal-valued property for an annotation attribute, if it has one
    pub fn for_attribute(kind: AttributeKind) -> Option<Self> {
        match kind {
            AttributeKind::Neurotransmitter => Some(Property::Neurotransmitter),
            AttributeKind::Innexin => Some(Property::Innexin),
            AttributeKind::Neuropeptide => Some(Property::Neuropeptide),
            AttributeKind::Receptor => Some(Property::Receptor),
            AttributeKind::Type => Some(Property::Type),
            AttributeKind::LineageName => Some(Property::LineageName),
            AttributeKind::Description => Some(Property::Description),
            AttributeKind::Neuron | AttributeKind::InnervatedBy => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }

    pub fn neuron(name: &str) -> Self {
        Self::new(EntityKind::Neuron, name)
    }

    pub fn muscle(name: &str) -> Self {
        Self::new(EntityKind::Muscle, name)
    }

    pub fn connection(connection: &Connection) -> Self {
        Self::new(EntityKind::Connection, &connection.key_name())
    }
}

/// Deduplicated, weight-summed connectivity between two neurons
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Connection {
    pub pre: String,
    pub post: String,
    pub synapse_type: SynapseType,
    pub weight: u64,
}

impl Connection {
    /// Arena name and IRI path of the connection node, one per (pre, post, synapse type)
    pub fn key_name(&self) -> String {
        format!(
            "{}/{}/{}",
            encode_segment(&self.pre),
            encode_segment(&self.post),
            self.synapse_type
        )
    }
}

/// One statement submitted to the fact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Statement {
    Attribute {
        subject: EntityRef,
        property: Property,
        value: String,
    },
    Link {
        subject: EntityRef,
        property: Property,
        object: EntityRef,
    },
    Connection(Connection),
}

impl Statement {
    /// `name` assertion, which also carries the entity's type
    pub fn named(entity: EntityRef) -> Self {
        let value = entity.name.clone();
        Statement::Attribute {
            subject: entity,
            property: Property::Name,
            value,
        }
    }

    pub fn attribute(subject: EntityRef, property: Property, value: &str) -> Self {
        Statement::Attribute {
            subject,
            property,
            value: value.to_string(),
        }
    }

    pub fn link(subject: EntityRef, property: Property, object: EntityRef) -> Self {
        Statement::Link {
            subject,
            property,
            object,
        }
    }
}

/// Opaque handle to a statement; fresh id per assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub id: Uuid,
    pub statement: Statement,
}

impl Fact {
    pub fn new(statement: Statement) -> Self {
        Self {
            id: Uuid::new_v4(),
            statement,
        }
    }
}
