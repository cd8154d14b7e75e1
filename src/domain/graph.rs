use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ENTITY_NS, RDF_NS};
use crate::domain::entity::EntityKind;
use crate::domain::evidence::Evidence;
use crate::domain::fact::{Connection, EntityRef, Fact, Property, Statement};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Literal(String),
    Integer(i64),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(value.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Literal(value) => write!(f, "\"{}\"", value),
            Term::Integer(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

/// Percent-encode one IRI path segment
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_unreserved(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

pub fn rdf(local: &str) -> Term {
    Term::Iri(format!("{RDF_NS}{local}"))
}

pub fn ow(local: &str) -> Term {
    Term::Iri(format!("{ENTITY_NS}{local}"))
}

pub fn class_term(kind: EntityKind) -> Term {
    ow(kind.as_str())
}

pub fn property_term(property: Property) -> Term {
    ow(property.local_name())
}

pub fn entity_term(entity: &EntityRef) -> Term {
    // Connection names are already an encoded `pre/post/syntype` path
    let name = match entity.kind {
        EntityKind::Connection => entity.name.clone(),
        _ => encode_segment(&entity.name),
    };
    Term::Iri(format!("{ENTITY_NS}{}/{}", entity.kind.as_str(), name))
}

pub fn connection_term(connection: &Connection) -> Term {
    entity_term(&EntityRef::connection(connection))
}

pub fn uuid_term(id: Uuid) -> Term {
    Term::Iri(format!("urn:uuid:{}", id))
}

impl Statement {
    /// The triple that stands for this statement when it is reified
    pub fn primary_triple(&self) -> Triple {
        match self {
            Statement::Attribute {
                subject,
                property,
                value,
            } => Triple::new(
                entity_term(subject),
                property_term(*property),
                Term::literal(value.as_str()),
            ),
            Statement::Link {
                subject,
                property,
                object,
            } => Triple::new(
                entity_term(subject),
                property_term(*property),
                entity_term(object),
            ),
            Statement::Connection(connection) => Triple::new(
                connection_term(connection),
                rdf("type"),
                class_term(EntityKind::Connection),
            ),
        }
    }

    pub fn to_triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        match self {
            Statement::Attribute {
                subject,
                property: Property::Name,
                ..
            } => {
                triples.push(Triple::new(
                    entity_term(subject),
                    rdf("type"),
                    class_term(subject.kind),
                ));
                triples.push(self.primary_triple());
            }
            Statement::Attribute { .. } | Statement::Link { .. } => {
                triples.push(self.primary_triple());
            }
            Statement::Connection(connection) => {
                let node = connection_term(connection);
                triples.push(self.primary_triple());
                triples.push(Triple::new(
                    node.clone(),
                    ow("pre_cell"),
                    entity_term(&EntityRef::neuron(&connection.pre)),
                ));
                triples.push(Triple::new(
                    node.clone(),
                    ow("post_cell"),
                    entity_term(&EntityRef::neuron(&connection.post)),
                ));
                triples.push(Triple::new(
                    node.clone(),
                    ow("syntype"),
                    Term::literal(connection.synapse_type.as_str()),
                ));
                triples.push(Triple::new(
                    node,
                    ow("number"),
                    Term::Integer(i64::try_from(connection.weight).unwrap_or(i64::MAX)),
                ));
            }
        }
        triples
    }
}

impl Fact {
    pub fn term(&self) -> Term {
        uuid_term(self.id)
    }

    /// Statement triples plus the reification node evidence points at
    pub fn to_triples(&self) -> Vec<Triple> {
        let node = self.term();
        let primary = self.statement.primary_triple();
        let mut triples = self.statement.to_triples();
        triples.push(Triple::new(node.clone(), rdf("type"), rdf("Statement")));
        triples.push(Triple::new(node.clone(), rdf("subject"), primary.subject));
        triples.push(Triple::new(node.clone(), rdf("predicate"), primary.predicate));
        triples.push(Triple::new(node, rdf("object"), primary.object));
        triples
    }
}

impl Evidence {
    pub fn term(&self) -> Term {
        uuid_term(self.id)
    }

    pub fn to_triples(&self) -> Vec<Triple> {
        let node = self.term();
        let mut triples = vec![Triple::new(
            node.clone(),
            rdf("type"),
            class_term(EntityKind::Evidence),
        )];
        for (field, value) in self.fields.entries() {
            triples.push(Triple::new(node.clone(), ow(field), Term::literal(value)));
        }
        for fact in &self.asserts {
            triples.push(Triple::new(node.clone(), ow("asserts"), uuid_term(*fact)));
        }
        triples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evidence::EvidenceFields;
    use crate::types::SynapseType;

    #[test]
    fn test_entity_names_are_percent_encoded() {
        let term = entity_term(&EntityRef::neuron("AVAL(1)"));
        assert_eq!(
            term,
            Term::iri("http://openworm.org/entities/Neuron/AVAL%281%29")
        );
        assert_eq!(encode_segment("AVFL/R"), "AVFL%2FR");
    }

    #[test]
    fn test_name_statement_carries_type() {
        let triples = Statement::named(EntityRef::neuron("AVAL")).to_triples();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].predicate, rdf("type"));
        assert_eq!(triples[0].object, ow("Neuron"));
        assert_eq!(triples[1].object, Term::literal("AVAL"));
    }

    #[test]
    fn test_connection_lowers_to_node_with_weight() {
        let statement = Statement::Connection(Connection {
            pre: "AVAL".to_string(),
            post: "AVBL".to_string(),
            synapse_type: SynapseType::Send,
            weight: 8,
        });
        let triples = statement.to_triples();
        assert_eq!(triples.len(), 5);
        assert!(triples
            .iter()
            .any(|t| t.predicate == ow("number") && t.object == Term::Integer(8)));
        assert!(triples
            .iter()
            .any(|t| t.predicate == ow("syntype") && t.object == Term::literal("send")));
    }

    #[test]
    fn test_synapse_link_points_at_connection_node() {
        let connection = Connection {
            pre: "AVFL/R".to_string(),
            post: "AVBL".to_string(),
            synapse_type: SynapseType::GapJunction,
            weight: 1,
        };
        let link = Statement::link(
            EntityRef::new(EntityKind::Network, "celegans"),
            Property::Synapse,
            EntityRef::connection(&connection),
        );
        assert_eq!(link.primary_triple().object, connection_term(&connection));
        assert_eq!(
            connection_term(&connection),
            Term::iri("http://openworm.org/entities/Connection/AVFL%2FR/AVBL/gapJunction")
        );
    }

    #[test]
    fn test_fact_is_reified() {
        let fact = Fact::new(Statement::attribute(
            EntityRef::neuron("AVAL"),
            Property::Receptor,
            "GLR-1",
        ));
        let triples = fact.to_triples();
        let node = fact.term();
        assert!(triples
            .iter()
            .any(|t| t.subject == node && t.object == rdf("Statement")));
        assert!(triples
            .iter()
            .any(|t| t.subject == node && t.predicate == rdf("object") && t.object == Term::literal("GLR-1")));
    }

    #[test]
    fn test_evidence_lists_fields_and_assertions() {
        let fact_id = Uuid::new_v4();
        let evidence = Evidence {
            id: Uuid::new_v4(),
            fields: EvidenceFields::titled("C. elegans sqlite database"),
            asserts: vec![fact_id],
        };
        let triples = evidence.to_triples();
        assert_eq!(triples.len(), 3);
        assert!(triples
            .iter()
            .any(|t| t.predicate == ow("asserts") && t.object == uuid_term(fact_id)));
    }
}
