use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::discovery::types::{CatalogSource, RawRecord};
use crate::error::RadarError;

/// Catalog backed by a JSON array of flat post records, for offline runs.
/// Applies the `since` window and `limit` like the live catalog. Records whose
/// `createdAt` does not parse are passed through for the normalizer to reject.
pub struct FixtureCatalog {
    records: Vec<RawRecord>,
}

impl FixtureCatalog {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<RawRecord> =
            serde_json::from_str(content).context("parsing fixture posts")?;
        Ok(Self::new(records))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&content)
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn fetch(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RawRecord>, RadarError> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.created_at
                    .as_deref()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map_or(true, |dt| dt.with_timezone(&Utc) >= since)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn window_and_limit_apply() {
        let cat = FixtureCatalog::from_json(
            r#"[
              {"id":"1","createdAt":"2025-01-02T00:00:00Z"},
              {"id":"2","createdAt":"2024-12-30T00:00:00Z"},
              {"id":"3","createdAt":"not a date"},
              {"id":"4","createdAt":"2025-01-03T00:00:00Z"}
            ]"#,
        )
        .unwrap();
        let since = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let got = cat.fetch(since, 10).await.unwrap();
        let ids: Vec<_> = got.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert_eq!(cat.fetch(since, 1).await.unwrap().len(), 1);
    }
}
