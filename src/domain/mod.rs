// Domain data shapes shared across layers

pub mod entity;
pub mod evidence;
pub mod fact;
pub mod graph;

pub use entity::{Entity, EntityArena, EntityId, EntityKind, Worm};
pub use evidence::{Evidence, EvidenceBuilder, EvidenceFields};
pub use fact::{Connection, EntityRef, Fact, Property, Statement};
pub use graph::{Term, Triple};
