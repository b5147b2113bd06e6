use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Failed to load env file {}: {reason}", .path.display())]
    EnvFile { path: PathBuf, reason: String },
}

/// Failures of the deployment-record reader and writer.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Deployment history directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("No deployment records found in {}", .0.display())]
    NoRecords(PathBuf),

    #[error("Field '{field}' not found in deployment record {}", .path.display())]
    MissingField { field: &'static str, path: PathBuf },

    #[error("Field '{field}' in deployment record {} is malformed: {value:?}", .path.display())]
    MalformedField {
        field: &'static str,
        value: String,
        path: PathBuf,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize deployment record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Missing or malformed compiler artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("{kind} file not found: {}", .path.display())]
    NotFound { kind: &'static str, path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field '{field}' missing from {}", .path.display())]
    MissingField { field: String, path: PathBuf },
}

// ---------------------------------------------------------------------------
// Step outcomes
// ---------------------------------------------------------------------------

/// How a single procedure step ended.
///
/// Soft failures (liquidity, verification, mint) become `Degraded` so the
/// caller can still persist what succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Skipped(String),
    Degraded(String),
}

impl Outcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    /// Collapse an error into a degraded outcome, keeping the full context chain.
    pub fn degraded(error: &anyhow::Error) -> Self {
        Outcome::Degraded(format!("{error:#}"))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => f.write_str("ok"),
            Outcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            Outcome::Degraded(reason) => write!(f, "failed ({reason})"),
        }
    }
}
