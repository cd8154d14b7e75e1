use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use worm_ingest::config::{Config, DEFAULT_CONFIG_PATH};
use worm_ingest::domain::Worm;
use worm_ingest::export::write_ntriples;
use worm_ingest::logging;
use worm_ingest::pipeline::inference::{infer, HornRuleEngine, InferenceReport};
use worm_ingest::pipeline::storage::{open_store, FactStore};
use worm_ingest::pipeline::{Pipeline, RunReport};

#[derive(Parser)]
#[command(name = "worm_ingest")]
#[command(about = "Load C. elegans anatomy and connectivity datasets into a fact store")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every configured dataset, export, then run inference
    Run {
        /// Stages to run (comma-separated). Default: all configured
        #[arg(long, value_delimiter = ',')]
        stages: Option<Vec<String>>,
    },
    /// Ingest datasets without exporting or inferring
    Ingest {
        #[arg(long, value_delimiter = ',')]
        stages: Option<Vec<String>>,
    },
    /// Apply the inference rules to the current store contents
    Infer,
    /// Write the store contents as N-Triples
    Export {
        /// Output path, overriding output.ntriples
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli_path: Option<PathBuf>) -> Result<Config> {
    let explicit = cli_path.is_some();
    let path = Config::resolve_path(cli_path);
    if !explicit && !path.exists() && path == PathBuf::from(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }
    Config::load(&path).with_context(|| format!("loading {}", path.display()))
}

async fn ingest(
    config: &Config,
    store: &dyn FactStore,
    stages: Option<Vec<String>>,
) -> Result<RunReport> {
    let mut pipeline = Pipeline::from_inputs(&config.inputs, stages.as_deref())?;
    let mut worm = Worm::new();
    let report = match pipeline.run(&mut worm, store).await {
        Ok(report) => report,
        Err(aborted) => {
            println!("❌ Ingestion aborted: {}", aborted.source);
            if let Err(e) = finish_report(config, &aborted.report) {
                warn!("Could not record the partial run report: {:#}", e);
            }
            return Err(aborted.into());
        }
    };
    info!(
        "Network holds {} neurons, {} muscles, {} synapses",
        worm.neuron_count(),
        worm.muscle_count(),
        worm.synapse_count()
    );
    Ok(report)
}

async fn export(store: &dyn FactStore, path: &Path) -> Result<usize> {
    let triples = store.triples().await?;
    let written = write_ntriples(path, &triples)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("📄 Exported {} triples to {}", written, path.display());
    Ok(written)
}

async fn run_inference(config: &Config, store: &dyn FactStore) -> Result<InferenceReport> {
    let engine = HornRuleEngine::load(&config.inference.rules, config.inference.max_rounds)?;
    let report = infer(store, &engine).await?;
    println!(
        "🧠 Inference derived {} triples ({} new) in {} rounds",
        report.derived, report.inserted, report.rounds
    );
    Ok(report)
}

async fn execute(command: Commands, config: &Config, store: &dyn FactStore) -> Result<()> {
    match command {
        Commands::Ingest { stages } => {
            println!("📥 Ingesting datasets...");
            let report = ingest(config, store, stages).await?;
            finish_report(config, &report)?;
        }
        Commands::Run { stages } => {
            println!("🚀 Running full ingestion...");
            let mut report = ingest(config, store, stages).await?;

            match &config.output.ntriples {
                Some(path) => {
                    export(store, path).await?;
                }
                None => warn!("output.ntriples not configured; skipping export"),
            }

            if config.inference.enabled {
                // A bad rule file is reported but does not discard the ingested facts
                match run_inference(config, store).await {
                    Ok(inference) => report.inference = Some(inference),
                    Err(e) => {
                        error!("Inference failed: {:#}", e);
                        println!("❌ Inference failed: {:#}", e);
                    }
                }
                report.finish(store.len().await?);
            }
            finish_report(config, &report)?;
        }
        Commands::Infer => {
            run_inference(config, store).await?;
        }
        Commands::Export { output } => {
            let path = output
                .or_else(|| config.output.ntriples.clone())
                .context("no export path: pass --output or set output.ntriples")?;
            export(store, &path).await?;
        }
    }
    Ok(())
}

fn finish_report(config: &Config, report: &RunReport) -> Result<()> {
    report.print_summary();
    if let Some(path) = &config.output.report {
        report.write_json(path)?;
        println!("📝 Run report written to {}", path.display());
    }
    let failed = report.failed_stages();
    if !failed.is_empty() {
        warn!("{} stage(s) failed", failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let _guard = logging::init_logging(cli.verbose, &config.logging);

    let store: Arc<dyn FactStore> = open_store(&config.store)?;
    info!("Opened {} fact store", store.backend());

    let outcome = execute(cli.command, &config, store.as_ref()).await;
    // Close on every path so pending writes are flushed even after a failure
    let closed = store.close().await;
    outcome?;
    closed?;
    Ok(())
}
