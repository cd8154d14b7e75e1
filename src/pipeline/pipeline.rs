use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use crate::config::InputPaths;
use crate::constants::{
    get_stage_order, ANNOTATIONS_STAGE, CONNECTIONS_STAGE, LINEAGE_STAGE, MUSCLES_STAGE,
    NEURONS_STAGE,
};
use crate::domain::Worm;
use crate::error::{ErrorKind, IngestError, Result};
use crate::pipeline::inference::InferenceReport;
use crate::pipeline::ingestion::{
    AnnotationsCsv, CelegansDb, ConnectomeSheet, EdgelistCsv, LineageTsv, RelationalQuery,
};
use crate::pipeline::steps::{
    AnnotationsStage, ConnectionsStage, LineageStage, MusclesStage, NeuronsStage, Stage,
    StepResult,
};
use crate::pipeline::storage::FactStore;

/// Outcome of one stage within a run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed(StepResult),
    Failed { kind: ErrorKind, message: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    #[serde(flatten)]
    pub status: StageStatus,
    pub duration_ms: u64,
}

impl StageReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, StageStatus::Completed(_))
    }
}

/// A store failure stopped the run. The report covers every stage that ran,
/// the aborting one included.
#[derive(Debug, thiserror::Error)]
#[error("run aborted: {source}")]
pub struct RunAborted {
    pub report: Box<RunReport>,
    pub source: IngestError,
}

impl From<RunAborted> for IngestError {
    fn from(aborted: RunAborted) -> Self {
        aborted.source
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
    pub inference: Option<InferenceReport>,
    pub store_triples: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            inference: None,
            store_triples: 0,
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn failed_stages(&self) -> Vec<&StageReport> {
        self.stages
            .iter()
            .filter(|s| matches!(s.status, StageStatus::Failed { .. }))
            .collect()
    }

    pub fn facts_committed(&self) -> usize {
        self.stages
            .iter()
            .filter_map(|s| match &s.status {
                StageStatus::Completed(result) => Some(result.facts_committed),
                _ => None,
            })
            .sum()
    }

    pub fn finish(&mut self, store_triples: usize) {
        self.finished_at = Some(Utc::now());
        self.store_triples = store_triples;
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Run report written to {}", path.display());
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n📊 Ingestion results:");
        for report in &self.stages {
            match &report.status {
                StageStatus::Completed(result) => {
                    println!("   ✅ {}: {}", report.stage, result.message())
                }
                StageStatus::Failed { kind, message } => {
                    println!("   ❌ {}: {:?} error: {}", report.stage, kind, message)
                }
                StageStatus::Skipped { reason } => {
                    println!("   ⏭️  {}: skipped ({})", report.stage, reason)
                }
            }
        }
        if let Some(inference) = &self.inference {
            println!(
                "   🧠 inference: {} derived, {} new triples in {} rounds",
                inference.derived, inference.inserted, inference.rounds
            );
        }
        println!("   Store holds {} triples", self.store_triples);
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

enum Planned {
    Run(Box<dyn Stage>),
    Skip { name: &'static str, reason: String },
}

/// Sequential stage runner. A failing stage is reported and the next one
/// still runs; only a store failure ends the run.
pub struct Pipeline {
    planned: Vec<Planned>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            planned: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.planned.push(Planned::Run(stage));
        self
    }

    pub fn with_skipped(mut self, name: &'static str, reason: impl Into<String>) -> Self {
        self.planned.push(Planned::Skip {
            name,
            reason: reason.into(),
        });
        self
    }

    /// Build the default stage list from configured inputs. `only` limits the
    /// run to the named stages; unknown names are a configuration error.
    pub fn from_inputs(inputs: &InputPaths, only: Option<&[String]>) -> Result<Self> {
        let order = get_stage_order();
        if let Some(names) = only {
            if let Some(unknown) = names.iter().find(|n| !order.iter().any(|o| *o == n.as_str())) {
                return Err(IngestError::Config(format!(
                    "unknown stage '{}' (expected one of {})",
                    unknown,
                    order.join(", ")
                )));
            }
        }

        let mut pipeline = Self::new();
        for name in order {
            if let Some(names) = only {
                if !names.iter().any(|n| n == name) {
                    pipeline = pipeline.with_skipped(name, "not selected");
                    continue;
                }
            }
            pipeline = match build_stage(name, inputs) {
                Some(stage) => pipeline.with_stage(stage),
                None => pipeline.with_skipped(name, "input not configured"),
            };
        }
        Ok(pipeline)
    }

    #[instrument(skip_all)]
    pub async fn run(
        &mut self,
        worm: &mut Worm,
        store: &dyn FactStore,
    ) -> std::result::Result<RunReport, RunAborted> {
        let mut report = RunReport::new();
        let mut completed: HashSet<&'static str> = HashSet::new();
        info!("🚀 Starting ingestion into {} store", store.backend());

        for planned in self.planned.iter_mut() {
            let stage = match planned {
                Planned::Skip { name, reason } => {
                    warn!("Skipping stage {}: {}", name, reason);
                    counter!("worm_ingest_stages_total", "stage" => *name, "status" => "skipped")
                        .increment(1);
                    report.stages.push(StageReport {
                        stage: name.to_string(),
                        status: StageStatus::Skipped {
                            reason: reason.clone(),
                        },
                        duration_ms: 0,
                    });
                    continue;
                }
                Planned::Run(stage) => stage,
            };

            let name = stage.step_name();
            for dependency in stage.dependencies() {
                if !completed.contains(dependency) {
                    warn!(
                        "Stage {} runs without {}; references to its entities will be dropped",
                        name, dependency
                    );
                }
            }

            info!("Running stage {}", name);
            println!("🔧 Running {}...", name);
            let started = std::time::Instant::now();
            let outcome = stage.execute(worm, store).await;
            let elapsed = started.elapsed();
            histogram!("worm_ingest_stage_duration_seconds", "stage" => name)
                .record(elapsed.as_secs_f64());

            let status = match outcome {
                Ok(result) => {
                    info!("Stage {} completed: {}", name, result.message());
                    counter!("worm_ingest_stages_total", "stage" => name, "status" => "completed")
                        .increment(1);
                    counter!("worm_ingest_facts_committed_total", "stage" => name)
                        .increment(result.facts_committed as u64);
                    counter!("worm_ingest_evidence_committed_total", "stage" => name)
                        .increment(result.evidence_committed as u64);
                    completed.insert(name);
                    StageStatus::Completed(result)
                }
                Err(e) if e.is_fatal() => {
                    error!("Stage {} hit a fatal store error, aborting run: {}", name, e);
                    counter!("worm_ingest_stages_total", "stage" => name, "status" => "aborted")
                        .increment(1);
                    report.stages.push(StageReport {
                        stage: name.to_string(),
                        status: StageStatus::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                        duration_ms: elapsed.as_millis() as u64,
                    });
                    report.finished_at = Some(Utc::now());
                    return Err(RunAborted {
                        report: Box::new(report),
                        source: e,
                    });
                }
                Err(e) => {
                    error!("Stage {} failed: {}", name, e);
                    counter!("worm_ingest_stages_total", "stage" => name, "status" => "failed")
                        .increment(1);
                    StageStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            report.stages.push(StageReport {
                stage: name.to_string(),
                status,
                duration_ms: elapsed.as_millis() as u64,
            });
        }

        match store.len().await {
            Ok(triples) => {
                report.finish(triples);
                Ok(report)
            }
            Err(e) => {
                report.finished_at = Some(Utc::now());
                Err(RunAborted {
                    report: Box::new(report),
                    source: e,
                })
            }
        }
    }
}

/// Stage for `name` over its configured input, or `None` when the input is absent.
fn build_stage(name: &str, inputs: &InputPaths) -> Option<Box<dyn Stage>> {
    match name {
        NEURONS_STAGE => inputs.celegans_db.as_ref().map(|path| {
            Box::new(NeuronsStage::new(Box::new(CelegansDb::new(
                path,
                RelationalQuery::Neurons,
            )))) as Box<dyn Stage>
        }),
        MUSCLES_STAGE => inputs.celegans_db.as_ref().map(|path| {
            Box::new(MusclesStage::new(Box::new(CelegansDb::new(
                path,
                RelationalQuery::MuscleInnervation,
            )))) as Box<dyn Stage>
        }),
        ANNOTATIONS_STAGE => inputs.annotations.as_ref().map(|path| {
            Box::new(AnnotationsStage::new(
                Box::new(AnnotationsCsv::new(path)),
                inputs.altun_bib.clone(),
                inputs.wormatlas_bib.clone(),
            )) as Box<dyn Stage>
        }),
        LINEAGE_STAGE => inputs.lineage.as_ref().map(|path| {
            Box::new(LineageStage::new(Box::new(LineageTsv::new(path)))) as Box<dyn Stage>
        }),
        CONNECTIONS_STAGE => {
            // The edgelist supersedes the older connectivity sheet
            if let Some(path) = &inputs.edgelist {
                Some(
                    Box::new(ConnectionsStage::new(Box::new(EdgelistCsv::new(path))))
                        as Box<dyn Stage>,
                )
            } else {
                inputs.connectome_sheet.as_ref().map(|path| {
                    Box::new(ConnectionsStage::new(Box::new(ConnectomeSheet::new(path))))
                        as Box<dyn Stage>
                })
            }
        }
        _ => None,
    }
}
