// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

use fintech_radar::discovery::select::Strategy;
use fintech_radar::discovery::types::{CatalogSource, RawRecord, ScoredCandidate};
use fintech_radar::{PublishResult, Publisher, RadarError, RunParameters};

pub fn since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

pub fn post(id: &str, topics: &[&str], votes: i64) -> RawRecord {
    RawRecord {
        id: Some(id.into()),
        name: Some(format!("Product {id}")),
        tagline: Some("Money, but better".into()),
        votes_count: Some(votes),
        comments_count: Some(0),
        created_at: Some("2025-05-01T10:00:00Z".into()),
        url: Some(format!("https://www.producthunt.com/posts/{id}")),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

pub fn params(strategy: Strategy, top_n: usize, dry_run: bool) -> RunParameters {
    RunParameters {
        since: since(),
        limit: 50,
        top_n,
        strategy,
        dry_run,
        debug: false,
    }
}

pub struct StaticCatalog(pub Vec<RawRecord>);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch(&self, _since: DateTime<Utc>, limit: usize) -> Result<Vec<RawRecord>, RadarError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct DownCatalog;

#[async_trait]
impl CatalogSource for DownCatalog {
    async fn fetch(&self, _since: DateTime<Utc>, _limit: usize) -> Result<Vec<RawRecord>, RadarError> {
        Err(RadarError::CatalogUnavailable("connection refused".into()))
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

/// Records every call; optionally fails every real publish.
#[derive(Default)]
pub struct RecordingPublisher {
    pub calls: Mutex<Vec<(String, bool)>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, pick: &ScoredCandidate, dry_run: bool) -> PublishResult {
        self.calls
            .lock()
            .unwrap()
            .push((pick.candidate.id.clone(), dry_run));
        if dry_run {
            PublishResult::Skipped
        } else if self.fail {
            PublishResult::Failed("channel down".into())
        } else {
            PublishResult::Delivered
        }
    }
    fn name(&self) -> &'static str {
        "recording"
    }
    async fn send_notice(&self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
