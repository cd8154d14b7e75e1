use tracing::debug;
use uuid::Uuid;

use crate::domain::{Evidence, EvidenceBuilder, EvidenceFields, Fact, Statement, Triple};
use crate::types::SourceTag;

/// A known data provider and the evidence fields it starts with
#[derive(Debug, Clone)]
pub struct Provider {
    pub key: String,
    pub seed: EvidenceFields,
}

impl Provider {
    pub fn new(key: &str, seed: EvidenceFields) -> Self {
        Self {
            key: key.to_lowercase(),
            seed,
        }
    }
}

/// A fact paired with the evidence that justifies it
#[derive(Debug, Clone)]
pub struct BoundFact {
    pub fact: Fact,
    pub evidence: Uuid,
}

/// Everything one stage submits to the fact store
#[derive(Debug, Default)]
pub struct BoundBatch {
    pub facts: Vec<BoundFact>,
    pub evidence: Vec<Evidence>,
}

impl BoundBatch {
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn evidence_count(&self) -> usize {
        self.evidence.len()
    }

    pub fn to_triples(&self) -> Vec<Triple> {
        let mut triples = Vec::new();
        for bound in &self.facts {
            triples.extend(bound.fact.to_triples());
        }
        for evidence in &self.evidence {
            triples.extend(evidence.to_triples());
        }
        triples
    }
}

/// Attaches provenance to facts. Provider evidence is shared by every fact it
/// matches and keeps accumulating fields until [`EvidenceBinder::seal`].
pub struct EvidenceBinder {
    providers: Vec<(String, EvidenceBuilder)>,
    fresh: Vec<EvidenceBuilder>,
    facts: Vec<BoundFact>,
}

impl EvidenceBinder {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.key, EvidenceBuilder::seeded(p.seed)))
                .collect(),
            fresh: Vec::new(),
            facts: Vec::new(),
        }
    }

    /// Binder whose every fact is justified by one provider record
    pub fn single(key: &str, seed: EvidenceFields) -> Self {
        Self::new(vec![Provider::new(key, seed)])
    }

    /// Bind `fact` to the evidence chosen by `tag` and return that evidence for
    /// further in-place updates. First provider whose key occurs in the tag
    /// label (case-insensitive) wins; otherwise the fact gets its own
    /// unattributed evidence.
    pub fn bind(&mut self, fact: Fact, tag: &SourceTag) -> &mut EvidenceBuilder {
        let label = tag.label.to_lowercase();
        let matched = self
            .providers
            .iter()
            .position(|(key, _)| label.contains(key.as_str()));

        let builder = match matched {
            Some(index) => {
                let builder = &mut self.providers[index].1;
                if let Some(uri) = &tag.uri {
                    builder.uri(uri);
                }
                builder
            }
            None => {
                debug!("No provider matches source tag '{}'", tag.label);
                self.fresh.push(EvidenceBuilder::new());
                let last = self.fresh.len() - 1;
                &mut self.fresh[last]
            }
        };

        builder.asserts(fact.id);
        self.facts.push(BoundFact {
            fact,
            evidence: builder.id(),
        });
        builder
    }

    pub fn bind_statement(
        &mut self,
        statement: Statement,
        tag: &SourceTag,
    ) -> &mut EvidenceBuilder {
        self.bind(Fact::new(statement), tag)
    }

    /// Close the binder: each distinct evidence that justifies at least one
    /// fact is emitted exactly once.
    pub fn seal(self) -> BoundBatch {
        let evidence = self
            .providers
            .into_iter()
            .map(|(_, builder)| builder)
            .chain(self.fresh)
            .filter(|builder| builder.assertion_count() > 0)
            .map(EvidenceBuilder::build)
            .collect();
        BoundBatch {
            facts: self.facts,
            evidence,
        }
    }
}
