use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::domain::Connection;
use crate::pipeline::processing::normalize::canonical_name;
use crate::types::{RawEdge, SourceTag, SynapseType};

/// Key under which duplicate connectivity rows are merged
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub pre: String,
    pub post: String,
    pub synapse_type: SynapseType,
}

/// Deduplicated, weight-summed connectivity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedEdge {
    pub key: EdgeKey,
    pub weight: u64,
    /// Number of raw rows folded into this edge
    pub contributions: usize,
    /// Every distinct source tag that contributed a row
    pub source_tags: BTreeSet<SourceTag>,
}

impl AggregatedEdge {
    pub fn to_connection(&self) -> Connection {
        Connection {
            pre: self.key.pre.clone(),
            post: self.key.post.clone(),
            synapse_type: self.key.synapse_type,
            weight: self.weight,
        }
    }
}

/// Result of one aggregation pass
#[derive(Debug, Default)]
pub struct Aggregation {
    pub edges: HashMap<EdgeKey, AggregatedEdge>,
    /// Rows whose relation kind is never asserted (receives variants, NMJ)
    pub excluded: usize,
    /// Rows dropped because an endpoint is not a known entity
    pub filtered: usize,
}

impl Aggregation {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges sorted by key, for deterministic assertion order
    pub fn into_sorted(self) -> Vec<AggregatedEdge> {
        let mut edges: Vec<AggregatedEdge> = self.edges.into_values().collect();
        edges.sort_by(|a, b| a.key.cmp(&b.key));
        edges
    }
}

/// Folds raw connectivity rows into one edge per (pre, post, synapse type)
pub struct EdgeAggregator<'a> {
    known: &'a HashSet<String>,
}

impl<'a> EdgeAggregator<'a> {
    pub fn new(known: &'a HashSet<String>) -> Self {
        Self { known }
    }

    pub fn aggregate<I>(&self, edges: I) -> Aggregation
    where
        I: IntoIterator<Item = RawEdge>,
    {
        let mut result = Aggregation::default();
        for edge in edges {
            let Some(synapse_type) = edge.kind.synapse_type() else {
                result.excluded += 1;
                continue;
            };
            let pre = canonical_name(&edge.pre_name, None);
            let post = canonical_name(&edge.post_name, None);
            if !self.known.contains(&pre) || !self.known.contains(&post) {
                debug!("Dropping edge {} -> {}: unknown endpoint", pre, post);
                result.filtered += 1;
                continue;
            }

            let key = EdgeKey {
                pre,
                post,
                synapse_type,
            };
            let entry = result
                .edges
                .entry(key.clone())
                .or_insert_with(|| AggregatedEdge {
                    key,
                    weight: 0,
                    contributions: 0,
                    source_tags: BTreeSet::new(),
                });
            entry.weight = entry.weight.saturating_add(u64::from(edge.weight));
            entry.contributions += 1;
            entry.source_tags.insert(edge.source_tag);
        }
        result
    }
}
