//! Error taxonomy for the discovery engine.
//!
//! Only `CatalogUnavailable` is fatal to a run. `MalformedRecord` is recovered
//! per record and `Persistence` is reported after publishing has happened.
//! An empty selection is a normal outcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadarError {
    /// Network, auth or protocol failure talking to the source catalog.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A raw record lacks a usable `id` or submission timestamp.
    #[error("malformed record {}: {reason}", id.as_deref().unwrap_or("<no id>"))]
    MalformedRecord {
        id: Option<String>,
        reason: &'static str,
    },

    /// Dedup state could not be written back.
    #[error("failed to persist state to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = RadarError> = std::result::Result<T, E>;
