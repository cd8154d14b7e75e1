use async_trait::async_trait;
use tracing::{info, instrument};

use super::{commit, Stage, StepResult};
use crate::constants::{CELEGANS_DB_PROVIDER, CELEGANS_DB_TITLE, MUSCLES_STAGE, NEURONS_STAGE};
use crate::domain::{EntityRef, EvidenceFields, Property, Statement, Worm};
use crate::error::Result;
use crate::pipeline::processing::{canonical_name, EvidenceBinder};
use crate::pipeline::storage::FactStore;
use crate::types::{AttributeKind, RawRecord, SourceAdapter};

/// Body muscles and the neurons that innervate them.
pub struct MusclesStage {
    adapter: Box<dyn SourceAdapter>,
}

impl MusclesStage {
    pub fn new(adapter: Box<dyn SourceAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Stage for MusclesStage {
    fn step_name(&self) -> &'static str {
        MUSCLES_STAGE
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![NEURONS_STAGE]
    }

    #[instrument(skip_all, fields(source = %self.adapter.source_name()))]
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult> {
        let records = self.adapter.read_records()?;
        let record_count = records.len();
        let mut binder = EvidenceBinder::single(
            CELEGANS_DB_PROVIDER,
            EvidenceFields::titled(CELEGANS_DB_TITLE),
        );

        let mut filtered = 0;
        for record in records {
            let attr = match record {
                RawRecord::Attribute(attr) if attr.attribute == AttributeKind::InnervatedBy => attr,
                _ => {
                    filtered += 1;
                    continue;
                }
            };
            let tag = &attr.source_tag;
            let muscle_name = attr.entity_name.trim();
            let muscle = EntityRef::muscle(muscle_name);
            let (muscle_id, new_muscle) = worm.add_muscle(muscle_name);
            if new_muscle {
                binder.bind_statement(Statement::named(muscle.clone()), tag);
                binder.bind_statement(
                    Statement::link(worm.worm_ref(), Property::Muscle, muscle.clone()),
                    tag,
                );
            }

            // Innervating neurons need not be in the network yet
            let neuron_name = canonical_name(&attr.value, None);
            let (_, created) = worm.neuron(&neuron_name);
            let neuron = EntityRef::neuron(&neuron_name);
            if created {
                binder.bind_statement(Statement::named(neuron.clone()), tag);
            }
            worm.arena_mut()
                .get_mut(muscle_id)
                .record(Property::InnervatedBy, &neuron_name);
            binder.bind_statement(Statement::link(muscle, Property::InnervatedBy, neuron), tag);
        }

        let mut result = commit(store, binder, record_count).await?;
        result.skipped = self.adapter.skipped();
        result.filtered = filtered;
        info!("Registered {} muscles", worm.muscle_count());
        Ok(result)
    }
}
