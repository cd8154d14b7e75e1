// Data pipeline: ingestion, processing, stages, storage and inference

pub mod inference;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod steps;
pub mod storage;

pub use pipeline::{Pipeline, RunAborted, RunReport, StageReport, StageStatus};
