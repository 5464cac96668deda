//! Application error type.

use acisfp_core::ClassificationError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop an acisfp command.
///
/// Catalog failures are not listed: they degrade enrichment and are only
/// logged.
#[derive(Debug, Error)]
pub enum AppError {
    /// An input file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file is not valid JSON for the expected records.
    #[error("invalid records in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be serialized.
    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// The HTTP client for the catalog could not be built.
    #[error("failed to build Ocat client: {0}")]
    Client(#[from] reqwest::Error),

    /// The runtime driving the catalog client could not be started.
    #[error("failed to start catalog runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// An observation fits none of the thermal-limit buckets.
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

impl AppError {
    /// Process exit code for this error. Classification failures exit with 2.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Classification(_) => 2,
            _ => 1,
        }
    }
}
