// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod metrics;
pub mod notify;
pub mod retry;
pub mod scheduler;
pub mod state;

pub use crate::discovery::{Discovery, RunParameters, RunSummary};
pub use crate::error::RadarError;
pub use crate::notify::{PublishResult, Publisher};
pub use crate::state::{DedupState, StateStore};
