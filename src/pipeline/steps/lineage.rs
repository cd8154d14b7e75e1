use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::{commit, Stage, StepResult};
use crate::constants::{
    CELL_LIST_PROVIDER, CELL_LIST_SOURCE, CELL_LIST_URI, LINEAGE_STAGE, NEURONS_STAGE,
};
use crate::domain::{EntityRef, EvidenceFields, Property, Statement, Worm};
use crate::error::Result;
use crate::pipeline::processing::{EvidenceBinder, Normalizer};
use crate::pipeline::storage::FactStore;
use crate::types::{AttributeKind, RawRecord, SourceAdapter, SourceTag};

#[derive(Debug, Default)]
struct CellEntry {
    lineage_name: String,
    description: String,
}

/// Lineage names and descriptions for neurons already in the network. Each
/// annotated neuron is also registered as a cell of the worm.
pub struct LineageStage {
    adapter: Box<dyn SourceAdapter>,
}

impl LineageStage {
    pub fn new(adapter: Box<dyn SourceAdapter>) -> Self {
        Self { adapter }
    }
}

/// Key the cell list by disambiguated name. Descriptions attach to whichever
/// name the preceding lineage record of the same row was given.
fn index_cells(records: Vec<RawRecord>) -> (HashMap<String, CellEntry>, usize) {
    let mut normalizer = Normalizer::disambiguating();
    let mut cells: HashMap<String, CellEntry> = HashMap::new();
    let mut last_assigned: HashMap<String, String> = HashMap::new();
    let mut filtered = 0;

    for record in records {
        let RawRecord::Attribute(attr) = record else {
            filtered += 1;
            continue;
        };
        match attr.attribute {
            AttributeKind::LineageName => {
                let name = normalizer.normalize(&attr.entity_name, Some(&attr.value));
                cells.entry(name.clone()).or_default().lineage_name = attr.value;
                last_assigned.insert(attr.entity_name, name);
            }
            AttributeKind::Description => match last_assigned.get(&attr.entity_name) {
                Some(name) => {
                    cells.entry(name.clone()).or_default().description = attr.value;
                }
                None => filtered += 1,
            },
            _ => filtered += 1,
        }
    }
    (cells, filtered)
}

#[async_trait]
impl Stage for LineageStage {
    fn step_name(&self) -> &'static str {
        LINEAGE_STAGE
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![NEURONS_STAGE]
    }

    #[instrument(skip_all, fields(source = %self.adapter.source_name()))]
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult> {
        let records = self.adapter.read_records()?;
        let record_count = records.len();
        let (cells, mut filtered) = index_cells(records);

        let mut binder =
            EvidenceBinder::single(CELL_LIST_PROVIDER, EvidenceFields::with_uri(CELL_LIST_URI));
        let tag = SourceTag::new(CELL_LIST_SOURCE);

        let mut neurons: Vec<String> = worm.known_neurons().into_iter().collect();
        neurons.sort();
        let mut annotated = 0;
        for name in neurons {
            let Some(entry) = cells.get(&name) else {
                debug!("Network neuron {} has no cell list entry", name);
                continue;
            };
            let Some(id) = worm.network_neuron(&name) else {
                continue;
            };
            let neuron = EntityRef::neuron(&name);
            let entity = worm.arena_mut().get_mut(id);
            entity.record(Property::LineageName, &entry.lineage_name);
            entity.record(Property::Description, &entry.description);

            binder.bind_statement(
                Statement::attribute(neuron.clone(), Property::LineageName, &entry.lineage_name),
                &tag,
            );
            binder.bind_statement(
                Statement::attribute(neuron.clone(), Property::Description, &entry.description),
                &tag,
            );
            if worm.add_cell(id) {
                binder.bind_statement(
                    Statement::link(worm.worm_ref(), Property::Cell, neuron),
                    &tag,
                );
            }
            annotated += 1;
        }
        // Cell list rows with no network neuron are not asserted
        filtered += cells.len() - annotated;

        let mut result = commit(store, binder, record_count).await?;
        result.skipped = self.adapter.skipped();
        result.filtered = filtered;
        info!("Annotated {} neurons with lineage data", annotated);
        Ok(result)
    }
}
