// src/discovery/filter.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::types::Candidate;
use super::whitelist::TopicWhitelist;

/// Why candidates were dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub too_old: usize,
    pub off_topic: usize,
    pub already_seen: usize,
}

impl FilterStats {
    pub fn total(&self) -> usize {
        self.too_old + self.off_topic + self.already_seen
    }
}

/// Keep the first occurrence of every id within one fetch batch.
pub fn dedup_batch(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut ids: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut dropped = 0usize;
    let kept = candidates
        .into_iter()
        .filter(|c| {
            let fresh = ids.insert(c.id.clone());
            if !fresh {
                dropped += 1;
            }
            fresh
        })
        .collect();
    (kept, dropped)
}

/// Admit candidates submitted at or after `since`, carrying at least one
/// whitelisted topic, and never selected before. Off-topic candidates are the
/// common case and are dropped silently.
pub fn filter_candidates(
    candidates: Vec<Candidate>,
    since: DateTime<Utc>,
    whitelist: &TopicWhitelist,
    seen_ids: &HashSet<String>,
) -> (Vec<Candidate>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut kept = Vec::with_capacity(candidates.len());

    for c in candidates {
        if c.submitted_at < since {
            stats.too_old += 1;
        } else if whitelist.match_topics(&c.topics).is_empty() {
            stats.off_topic += 1;
        } else if seen_ids.contains(&c.id) {
            stats.already_seen += 1;
            tracing::debug!(target: "discovery", id = %c.id, "already published, skipping");
        } else {
            kept.push(c);
        }
    }

    (kept, stats)
}
