// Core processing: name normalization, edge aggregation, provenance binding

pub mod aggregate;
pub mod normalize;
pub mod provenance;

pub use aggregate::{AggregatedEdge, Aggregation, EdgeAggregator, EdgeKey};
pub use normalize::{canonical_name, Disambiguator, Normalizer};
pub use provenance::{BoundBatch, BoundFact, EvidenceBinder, Provider};
