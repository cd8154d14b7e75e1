use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{commit, Stage, StepResult};
use crate::constants::{CELEGANS_DB_PROVIDER, CELEGANS_DB_SOURCE, CELEGANS_DB_TITLE, NEURONS_STAGE};
use crate::domain::{EntityRef, EvidenceFields, Property, Statement, Worm};
use crate::error::Result;
use crate::pipeline::processing::{canonical_name, EvidenceBinder};
use crate::pipeline::storage::FactStore;
use crate::types::{AttributeKind, RawRecord, SourceAdapter, SourceTag};

/// Registers the network and every neuron listed in the relational dump.
pub struct NeuronsStage {
    adapter: Box<dyn SourceAdapter>,
}

impl NeuronsStage {
    pub fn new(adapter: Box<dyn SourceAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Stage for NeuronsStage {
    fn step_name(&self) -> &'static str {
        NEURONS_STAGE
    }

    #[instrument(skip_all, fields(source = %self.adapter.source_name()))]
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult> {
        let records = self.adapter.read_records()?;
        let record_count = records.len();

        let mut binder = EvidenceBinder::single(
            CELEGANS_DB_PROVIDER,
            EvidenceFields::titled(CELEGANS_DB_TITLE),
        );
        let network = worm.network_ref();
        binder.bind_statement(
            Statement::link(worm.worm_ref(), Property::NeuronNetwork, network.clone()),
            &SourceTag::new(CELEGANS_DB_SOURCE),
        );

        let mut filtered = 0;
        for record in records {
            let RawRecord::Attribute(attr) = record else {
                filtered += 1;
                continue;
            };
            if attr.attribute != AttributeKind::Neuron {
                filtered += 1;
                continue;
            }
            let name = canonical_name(&attr.entity_name, None);
            let (_, added) = worm.add_network_neuron(&name);
            if !added {
                debug!("Neuron {} already registered", name);
                continue;
            }
            let neuron = EntityRef::neuron(&name);
            binder.bind_statement(Statement::named(neuron.clone()), &attr.source_tag);
            binder.bind_statement(
                Statement::link(network.clone(), Property::Neuron, neuron),
                &attr.source_tag,
            );
        }

        let mut result = commit(store, binder, record_count).await?;
        result.skipped = self.adapter.skipped();
        result.filtered = filtered;
        info!("Registered {} network neurons", worm.neuron_count());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::steps::test_support::StaticAdapter;
    use crate::pipeline::storage::InMemoryFactStore;
    use crate::types::RawAttribute;

    fn neuron(name: &str) -> RawRecord {
        RawRecord::Attribute(RawAttribute {
            entity_name: name.to_string(),
            attribute: AttributeKind::Neuron,
            value: String::new(),
            source_tag: SourceTag::new(CELEGANS_DB_SOURCE),
        })
    }

    #[tokio::test]
    async fn test_neurons_join_the_network_once() {
        let mut stage = NeuronsStage::new(StaticAdapter::boxed(vec![
            neuron("AVAL"),
            neuron("VB01"),
            neuron("VB1"),
        ]));
        let mut worm = Worm::new();
        let store = InMemoryFactStore::new();

        let result = stage.execute(&mut worm, &store).await.unwrap();
        assert_eq!(worm.neuron_count(), 2);
        assert!(worm.network_neuron("VB1").is_some());
        // network link + (name, membership) per distinct neuron
        assert_eq!(result.facts_committed, 5);
        assert_eq!(result.evidence_committed, 1);
        assert_eq!(result.triples_written, store.len().await.unwrap());
    }
}
