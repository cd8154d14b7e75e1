use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Worm;
use crate::error::Result;
use crate::pipeline::processing::EvidenceBinder;
use crate::pipeline::storage::FactStore;

/// Common trait for all dataset stages
#[async_trait]
pub trait Stage: Send {
    /// Name used on the command line and in run reports
    fn step_name(&self) -> &'static str;

    /// Stages whose entities this one annotates or connects
    fn dependencies(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Read the dataset, bind evidence and commit the resulting facts
    async fn execute(&mut self, worm: &mut Worm, store: &dyn FactStore) -> Result<StepResult>;
}

/// Counts from one successful stage execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub records_read: usize,
    pub facts_committed: usize,
    pub evidence_committed: usize,
    pub triples_written: usize,
    /// Well-formed rows the adapter could not classify
    pub skipped: usize,
    /// Edge rows of a kind that is never asserted
    pub excluded: usize,
    /// Records dropped because their referent is unknown
    pub filtered: usize,
}

impl StepResult {
    pub fn message(&self) -> String {
        format!(
            "{} records -> {} facts, {} evidence ({} skipped, {} excluded, {} filtered)",
            self.records_read,
            self.facts_committed,
            self.evidence_committed,
            self.skipped,
            self.excluded,
            self.filtered
        )
    }
}

/// Seal the binder and write facts plus evidence in a single store call.
pub(crate) async fn commit(
    store: &dyn FactStore,
    binder: EvidenceBinder,
    records_read: usize,
) -> Result<StepResult> {
    let batch = binder.seal();
    let triples = batch.to_triples();
    let written = store.insert(&triples).await?;
    Ok(StepResult {
        records_read,
        facts_committed: batch.fact_count(),
        evidence_committed: batch.evidence_count(),
        triples_written: written,
        ..StepResult::default()
    })
}

pub mod annotations;
pub mod connections;
pub mod lineage;
pub mod muscles;
pub mod neurons;

pub use annotations::AnnotationsStage;
pub use connections::ConnectionsStage;
pub use lineage::LineageStage;
pub use muscles::MusclesStage;
pub use neurons::NeuronsStage;
