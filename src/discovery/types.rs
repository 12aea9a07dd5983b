// src/discovery/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// One post as the catalog hands it over: flat, every field optional.
/// Validation happens in the normalizer, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub votes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub created_at: Option<String>,
    pub url: Option<String>,
    pub website: Option<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub tagline: String,
    /// Topic slugs, unique, in source order.
    pub topics: Vec<String>,
    pub votes: u32,
    pub comments: u32,
    pub submitted_at: DateTime<Utc>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    /// Whitelisted subset of `candidate.topics`, in bucket order. Never empty.
    pub matched_topics: Vec<String>,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }
}

/// Source catalog collaborator. Pagination and the time window are its
/// concern; the engine only asks for posts submitted after `since`.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RawRecord>, RadarError>;
    fn name(&self) -> &'static str;
}
