use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the document or dataset a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceTag {
    pub label: String,
    pub uri: Option<String>,
}

impl SourceTag {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            uri: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        if !uri.trim().is_empty() {
            self.uri = Some(uri);
        }
        self
    }
}

/// Relation code on a raw connectivity row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Chemical,
    ChemicalPoly,
    Electrical,
    Receives,
    ReceivesPoly,
    NeuromuscularJunction,
}

impl EdgeKind {
    /// Parse a relation code from either the connectivity sheet or the edgelist.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "S" | "Send" | "chemical" => Some(EdgeKind::Chemical),
            "Sp" | "SendPoly" => Some(EdgeKind::ChemicalPoly),
            "EJ" | "ElectricalJunction" | "electrical" => Some(EdgeKind::Electrical),
            "R" | "Receives" => Some(EdgeKind::Receives),
            "Rp" | "ReceivesPoly" => Some(EdgeKind::ReceivesPoly),
            "NMJ" | "NeuromuscularJunction" => Some(EdgeKind::NeuromuscularJunction),
            _ => None,
        }
    }

    /// The synapse type this kind aggregates under, or `None` when the kind is
    /// never asserted (receives-variants mirror sends; NMJ has no consumer).
    pub fn synapse_type(self) -> Option<SynapseType> {
        match self {
            EdgeKind::Chemical | EdgeKind::ChemicalPoly => Some(SynapseType::Send),
            EdgeKind::Electrical => Some(SynapseType::GapJunction),
            EdgeKind::Receives | EdgeKind::ReceivesPoly | EdgeKind::NeuromuscularJunction => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SynapseType {
    Send,
    GapJunction,
}

impl SynapseType {
    pub fn as_str(self) -> &'static str {
        match self {
            SynapseType::Send => "send",
            SynapseType::GapJunction => "gapJunction",
        }
    }
}

impl fmt::Display for SynapseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a raw attribute row says about its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// The entity is a neuron (value unused)
    Neuron,
    /// The muscle is innervated by the neuron named in `value`
    InnervatedBy,
    Neurotransmitter,
    Innexin,
    Neuropeptide,
    Receptor,
    Type,
    LineageName,
    Description,
}

impl AttributeKind {
    /// Relation kinds accepted in the annotation table (case-insensitive).
    pub fn from_relation(relation: &str) -> Option<Self> {
        match relation.trim().to_lowercase().as_str() {
            "neurotransmitter" => Some(AttributeKind::Neurotransmitter),
            "innexin" => Some(AttributeKind::Innexin),
            "neuropeptide" => Some(AttributeKind::Neuropeptide),
            "receptor" => Some(AttributeKind::Receptor),
            "type" => Some(AttributeKind::Type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub pre_name: String,
    pub post_name: String,
    pub weight: u32,
    pub kind: EdgeKind,
    pub source_tag: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttribute {
    pub entity_name: String,
    pub attribute: AttributeKind,
    pub value: String,
    pub source_tag: SourceTag,
}

/// The only record shape the core consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawRecord {
    Edge(RawEdge),
    Attribute(RawAttribute),
}

/// Core trait that every dataset reader must implement
pub trait SourceAdapter: Send {
    /// Name used in logs and error messages
    fn source_name(&self) -> &str;

    /// Read every record from the underlying source, in source order
    fn read_records(&mut self) -> Result<Vec<RawRecord>>;

    /// Well-formed rows dropped by the last read (unrecognized codes or relations)
    fn skipped(&self) -> usize {
        0
    }
}
