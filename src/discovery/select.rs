//! Selection strategies over scored candidates.
//!
//! - `Random`: unweighted sample of `top_n` distinct candidates.
//! - `RoundRobin`: walk topic buckets from the persisted cursor, taking the
//!   best unpicked candidate per bucket. Best effort: a shortfall is not
//!   topped up from other strategies.
//!
//! Selection has no side effects; the caller decides whether the proposed
//! cursor is persisted.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::types::ScoredCandidate;
use super::whitelist::TopicWhitelist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round_robin" | "round-robin" | "rr" => Ok(Strategy::RoundRobin),
            "random" => Ok(Strategy::Random),
            other => Err(format!("unknown strategy `{other}` (expected round_robin|random)")),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RoundRobin => f.write_str("round_robin"),
            Strategy::Random => f.write_str("random"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub picks: Vec<ScoredCandidate>,
    /// Cursor to persist after a round-robin pick; `None` leaves it untouched.
    pub next_cursor: Option<usize>,
    /// Topic id of the last bucket a round-robin pick came from.
    pub last_topic: Option<String>,
}

impl Selection {
    fn empty() -> Self {
        Self {
            picks: Vec::new(),
            next_cursor: None,
            last_topic: None,
        }
    }
}

/// Higher score first, then earlier submission, then smaller id.
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.submitted_at.cmp(&b.candidate.submitted_at))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

pub fn select<R: Rng + ?Sized>(
    scored: &[ScoredCandidate],
    top_n: usize,
    strategy: Strategy,
    rr_cursor: usize,
    whitelist: &TopicWhitelist,
    rng: &mut R,
) -> Selection {
    if scored.is_empty() || top_n == 0 {
        return Selection::empty();
    }
    match strategy {
        Strategy::Random => pick_random(scored, top_n, rng),
        Strategy::RoundRobin => pick_round_robin(scored, top_n, rr_cursor, whitelist),
    }
}

pub fn pick_random<R: Rng + ?Sized>(
    scored: &[ScoredCandidate],
    top_n: usize,
    rng: &mut R,
) -> Selection {
    let amount = top_n.min(scored.len());
    let picks = rand::seq::index::sample(rng, scored.len(), amount)
        .into_iter()
        .map(|i| scored[i].clone())
        .collect();
    Selection {
        picks,
        next_cursor: None,
        last_topic: None,
    }
}

pub fn pick_round_robin(
    scored: &[ScoredCandidate],
    top_n: usize,
    rr_cursor: usize,
    whitelist: &TopicWhitelist,
) -> Selection {
    let buckets = whitelist.buckets();
    let n = buckets.len();
    if n == 0 {
        return Selection::empty();
    }

    // Per bucket: indices into `scored`, best first.
    let per_bucket: Vec<Vec<usize>> = buckets
        .iter()
        .map(|b| {
            let mut idx: Vec<usize> = (0..scored.len())
                .filter(|&i| scored[i].matched_topics.contains(&b.topic_id))
                .collect();
            idx.sort_by(|&x, &y| rank_order(&scored[x], &scored[y]));
            idx
        })
        .collect();

    let mut taken = vec![false; scored.len()];
    let mut picks = Vec::with_capacity(top_n);
    let mut pos = rr_cursor % n;
    let mut last_used: Option<usize> = None;
    let mut misses = 0usize;

    while picks.len() < top_n && misses < n {
        match per_bucket[pos].iter().copied().find(|&i| !taken[i]) {
            Some(i) => {
                taken[i] = true;
                picks.push(scored[i].clone());
                last_used = Some(pos);
                misses = 0;
                tracing::debug!(
                    target: "discovery",
                    bucket = %buckets[pos].topic_id,
                    id = %scored[i].candidate.id,
                    "round-robin pick"
                );
            }
            None => misses += 1,
        }
        pos = (pos + 1) % n;
    }

    Selection {
        next_cursor: last_used.map(|i| (i + 1) % n),
        last_topic: last_used.map(|i| buckets[i].topic_id.clone()),
        picks,
    }
}
