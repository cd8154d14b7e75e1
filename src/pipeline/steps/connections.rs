use async_trait::async_trait;
use tracing::{info, instrument};

use super::{commit, Stage, StepResult};
use crate::constants::{
    CONNECTIONS_STAGE, NEURONS_STAGE, NEURON_CONNECT_PROVIDER, NEURON_CONNECT_URI,
    WORMWIRING_PROVIDER, WORMWIRING_URI,
};
use crate::domain::{EntityRef, EvidenceFields, Property, Statement, Worm};
use crate::error::Result;
use crate::pipeline::processing::{EdgeAggregator, EvidenceBinder, Provider};
use crate::pipeline::storage::FactStore;
use crate::types::{RawRecord, SourceAdapter};

/// Aggregated synapses and gap junctions between network neurons.
pub struct ConnectionsStage {
    adapter: Box<dyn SourceAdapter>,
}

impl ConnectionsStage {
    pub fn new(adapter: Box<dyn SourceAdapter>) -> Self {
        Self { adapter }
    }

    fn binder() -> EvidenceBinder {
        EvidenceBinder::new(vec![
            Provider::new(WORMWIRING_PROVIDER, EvidenceFields::with_uri(WORMWIRING_URI)),
            Provider::new(NEURON_CONNECT_PROVIDER, EvidenceFields::with_uri(NEURON_CONNECT_URI)),
        ])
    }
}

#[async_trait]
impl Stage for ConnectionsStage {
    fn step_name(&self) -> &'static str {
        CONNECTIONS_STAGE
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![NEURONS_STAGE]
    }

    #[instrument(skip_all, fields(source = %self.adapter.source_name()))]
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult> {
        let records = self.adapter.read_records()?;
        let record_count = records.len();

        let mut not_edges = 0;
        let edges = records.into_iter().filter_map(|record| match record {
            RawRecord::Edge(edge) => Some(edge),
            RawRecord::Attribute(_) => {
                not_edges += 1;
                None
            }
        });
        let known = worm.known_neurons();
        let aggregation = EdgeAggregator::new(&known).aggregate(edges);
        let excluded = aggregation.excluded;
        let filtered = aggregation.filtered + not_edges;
        info!(
            "Aggregated {} raw edges into {} connections ({} excluded, {} unknown endpoints)",
            record_count,
            aggregation.len(),
            excluded,
            aggregation.filtered
        );

        let mut binder = Self::binder();
        let network = worm.network_ref();
        for edge in aggregation.into_sorted() {
            let connection = edge.to_connection();
            worm.add_synapse(&connection.key_name());
            let node = EntityRef::connection(&connection);
            // Each contributing source asserts the merged connection on its own evidence
            for tag in &edge.source_tags {
                binder.bind_statement(Statement::Connection(connection.clone()), tag);
                binder.bind_statement(
                    Statement::link(network.clone(), Property::Synapse, node.clone()),
                    tag,
                );
            }
        }

        let mut result = commit(store, binder, record_count).await?;
        result.skipped = self.adapter.skipped();
        result.excluded = excluded;
        result.filtered = filtered;
        info!("Network now has {} synapses", worm.synapse_count());
        Ok(result)
    }
}
