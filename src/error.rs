use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Malformed input in {source_name} (line {line}): {message}")]
    SourceFormat {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Fact store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rule error: {0}")]
    Rule(String),
}

/// Coarse classification used in stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    SourceFormat,
    Store,
    Config,
    Rule,
}

impl IngestError {
    pub fn source_format(source_name: &str, line: usize, message: impl Into<String>) -> Self {
        IngestError::SourceFormat {
            source_name: source_name.to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        IngestError::Store {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            // Adapter-side failures all surface as malformed or unreadable input
            IngestError::SourceFormat { .. } | IngestError::Csv(_) | IngestError::Io(_) => {
                ErrorKind::SourceFormat
            }
            IngestError::Sqlite(_) | IngestError::Store { .. } => ErrorKind::Store,
            // JSON only appears when writing the run report
            IngestError::Config(_) | IngestError::Toml(_) | IngestError::Json(_) => {
                ErrorKind::Config
            }
            IngestError::Rule(_) => ErrorKind::Rule,
        }
    }

    /// Store failures abort the whole run; everything else is contained to its stage.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Store
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
