use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use super::{commit, Stage, StepResult};
use crate::constants::{ALTUN_PROVIDER, ANNOTATIONS_STAGE, NEURONS_STAGE, WORMATLAS_PROVIDER};
use crate::domain::{EntityRef, EvidenceFields, Property, Statement, Worm};
use crate::error::Result;
use crate::pipeline::ingestion::read_first_entry;
use crate::pipeline::processing::{canonical_name, EvidenceBinder, Provider};
use crate::pipeline::storage::FactStore;
use crate::types::{AttributeKind, RawRecord, SourceAdapter};

/// Neuron classes recognized inside free-text `type` values
const NEURON_CLASSES: &[&str] = &["sensory", "interneuron", "motor"];

/// Receptors, neurotransmitters, neuropeptides, innexins and neuron types.
pub struct AnnotationsStage {
    adapter: Box<dyn SourceAdapter>,
    providers: Vec<(&'static str, Option<PathBuf>)>,
}

impl AnnotationsStage {
    /// `altun_bib` and `wormatlas_bib` seed the two provider evidence records
    pub fn new(
        adapter: Box<dyn SourceAdapter>,
        altun_bib: Option<PathBuf>,
        wormatlas_bib: Option<PathBuf>,
    ) -> Self {
        Self {
            adapter,
            providers: vec![(ALTUN_PROVIDER, altun_bib), (WORMATLAS_PROVIDER, wormatlas_bib)],
        }
    }

    fn load_providers(&self) -> Result<Vec<Provider>> {
        self.providers
            .iter()
            .map(|(key, bib)| -> Result<Provider> {
                let seed = match bib {
                    Some(path) => read_first_entry(path)?,
                    None => EvidenceFields::default(),
                };
                Ok(Provider::new(key, seed))
            })
            .collect()
    }
}

fn neuron_classes(value: &str) -> Vec<&'static str> {
    let value = value.to_lowercase();
    NEURON_CLASSES
        .iter()
        .copied()
        .filter(|class| value.contains(class))
        .collect()
}

#[async_trait]
impl Stage for AnnotationsStage {
    fn step_name(&self) -> &'static str {
        ANNOTATIONS_STAGE
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![NEURONS_STAGE]
    }

    #[instrument(skip_all, fields(source = %self.adapter.source_name()))]
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult> {
        let mut binder = EvidenceBinder::new(self.load_providers()?);
        let records = self.adapter.read_records()?;
        let record_count = records.len();

        let mut filtered = 0;
        for record in records {
            let RawRecord::Attribute(attr) = record else {
                filtered += 1;
                continue;
            };
            let Some(property) = Property::for_attribute(attr.attribute) else {
                filtered += 1;
                continue;
            };

            let name = canonical_name(&attr.entity_name, None);
            let neuron = EntityRef::neuron(&name);
            let (id, created) = worm.neuron(&name);
            if created {
                debug!("Annotation created bare neuron {}", name);
                binder.bind_statement(Statement::named(neuron.clone()), &attr.source_tag);
            }

            let values: Vec<String> = if attr.attribute == AttributeKind::Type {
                neuron_classes(&attr.value)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                vec![attr.value.clone()]
            };
            for value in values {
                worm.arena_mut().get_mut(id).record(property, &value);
                binder.bind_statement(
                    Statement::attribute(neuron.clone(), property, &value),
                    &attr.source_tag,
                );
            }
        }

        let mut result = commit(store, binder, record_count).await?;
        result.skipped = self.adapter.skipped();
        result.filtered = filtered;
        info!("Committed {} annotation facts", result.facts_committed);
        Ok(result)
    }
}
