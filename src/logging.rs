use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes console logging plus a daily-rotated JSON log file.
///
/// `RUST_LOG` still applies on top of the crate default. The returned guard
/// flushes the file writer when dropped, so hold it until exit.
pub fn init_logging(verbose: bool, config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("worm_ingest={}", level)
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A missing log directory degrades to console-only output
    let (file_layer, guard) = match fs::create_dir_all(&config.directory) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "⚠️  Could not create log directory {}: {}",
                config.directory.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
