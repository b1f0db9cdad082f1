use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Confined to one input file; logged and the run continues.
    FileLocal,
    /// The run stopped, committed files are intact and re-running is safe.
    Retryable,
    /// Needs operator intervention before another run.
    Fatal,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot read {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid date '{value}' on line {line}")]
    InvalidDate { line: usize, value: String },

    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Cannot derive station name from file: {0}")]
    InvalidFileName(PathBuf),

    #[error("Station '{name}' could neither be inserted nor found")]
    StationIntegrity { name: String },

    #[error("Operation '{operation}' timed out after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },

    #[error("Ingestion interrupted after {files_committed} committed files: {source}")]
    Interrupted {
        files_committed: usize,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub fn severity(&self) -> Severity {
        match self {
            IngestError::InvalidDate { .. }
            | IngestError::MalformedLine { .. }
            | IngestError::InvalidFileName(_)
            | IngestError::UnreadableFile { .. } => Severity::FileLocal,
            IngestError::Io(_) | IngestError::Timeout { .. } | IngestError::Interrupted { .. } => {
                Severity::Retryable
            }
            IngestError::Database(e) if is_transient_sqlx(e) => Severity::Retryable,
            IngestError::Database(_)
            | IngestError::StationIntegrity { .. }
            | IngestError::Config(_)
            | IngestError::ConfigLoad(_)
            | IngestError::Validation(_)
            | IngestError::TaskJoin(_) => Severity::Fatal,
        }
    }

    /// Whether repeating the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::Database(e) => is_transient_sqlx(e),
            IngestError::Timeout { .. } => true,
            _ => false,
        }
    }
}

// SQLITE_BUSY (5) and SQLITE_LOCKED (6); extended codes keep the primary code in the low byte
fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}
