//! # Dedup State
//! Published post ids and the round-robin cursor, persisted across runs.
//!
//! `seen_ids` only grows; there is no eviction. The file store keeps one JSON
//! document and replaces it atomically (write temp file, then rename) while
//! holding an in-process writer lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::discovery::whitelist::TopicWhitelist;
use crate::error::RadarError;

pub const DEFAULT_STATE_PATH: &str = ".state/posted_ids.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupState {
    pub seen_ids: HashSet<String>,
    pub rr_cursor: usize,
    /// Topic id of the bucket the last round-robin pick came from.
    pub last_topic: Option<String>,
}

impl DedupState {
    pub fn is_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn mark_seen<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seen_ids.extend(ids.into_iter().map(Into::into));
    }

    /// Where the next round-robin walk starts. The bucket after `last_topic`
    /// wins over the stored index, so edits to the whitelist order do not
    /// shift the rotation; an unknown topic falls back to `rr_cursor`.
    pub fn resume_cursor(&self, whitelist: &TopicWhitelist) -> usize {
        match self.last_topic.as_deref().and_then(|t| whitelist.position(t)) {
            Some(i) => (i + 1) % whitelist.len(),
            None => self.rr_cursor,
        }
    }
}

/// Durable home of `DedupState`. `save` must be atomic with respect to other
/// `save` calls on the same store.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<DedupState, RadarError>;
    fn save(&self, state: &DedupState) -> Result<(), RadarError>;
}

/// On-disk shapes. Older files hold a bare array of ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Legacy(Vec<String>),
    Current {
        posted_ids: Vec<String>,
        #[serde(default)]
        rr_cursor: usize,
        #[serde(default)]
        last_topic: Option<String>,
    },
}

#[derive(Serialize)]
struct OnDiskOut<'a> {
    posted_ids: Vec<&'a str>,
    rr_cursor: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_topic: Option<&'a str>,
    last_updated: String,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_err(&self, source: std::io::Error) -> RadarError {
        RadarError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }
}

impl StateStore for JsonFileStore {
    /// A missing or unreadable file yields an empty state; it is logged, not fatal.
    fn load(&self) -> Result<DedupState, RadarError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file yet, starting empty");
                return Ok(DedupState::default());
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state unreadable, starting empty");
                return Ok(DedupState::default());
            }
        };

        let state = match serde_json::from_str::<OnDisk>(&content) {
            Ok(OnDisk::Legacy(ids)) => DedupState {
                seen_ids: ids.into_iter().collect(),
                ..Default::default()
            },
            Ok(OnDisk::Current {
                posted_ids,
                rr_cursor,
                last_topic,
            }) => DedupState {
                seen_ids: posted_ids.into_iter().collect(),
                rr_cursor,
                last_topic,
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state corrupt, starting empty");
                DedupState::default()
            }
        };

        tracing::info!(
            path = %self.path.display(),
            seen = state.seen_ids.len(),
            rr_cursor = state.rr_cursor,
            "state loaded"
        );
        Ok(state)
    }

    fn save(&self, state: &DedupState) -> Result<(), RadarError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.persist_err(e))?;
        }

        let mut ids: Vec<&str> = state.seen_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        let doc = OnDiskOut {
            posted_ids: ids,
            rr_cursor: state.rr_cursor,
            last_topic: state.last_topic.as_deref(),
            last_updated: Utc::now().to_rfc3339(),
        };
        let body = serde_json::to_string_pretty(&doc)
            .map_err(|e| self.persist_err(std::io::Error::other(e)))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(|e| self.persist_err(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.persist_err(e));
        }

        tracing::info!(
            path = %self.path.display(),
            seen = state.seen_ids.len(),
            rr_cursor = state.rr_cursor,
            "state saved"
        );
        Ok(())
    }
}

/// Process-local store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<DedupState>,
    saves: Mutex<usize>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(state: DedupState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    /// A store whose `save` always fails with `Persistence`.
    pub fn failing(state: DedupState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: Mutex::new(0),
            fail_saves: true,
        }
    }

    pub fn snapshot(&self) -> DedupState {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<DedupState, RadarError> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &DedupState) -> Result<(), RadarError> {
        *self.saves.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        if self.fail_saves {
            return Err(RadarError::Persistence {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("save disabled"),
            });
        }
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state.clone();
        Ok(())
    }
}
