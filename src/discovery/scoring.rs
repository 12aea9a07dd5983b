//! Relevance scoring for filtered candidates.
//!
//! score = VOTE_WEIGHT * votes + COMMENT_WEIGHT * comments
//!       + TOPIC_MATCH_BONUS * |matched_topics|
//!
//! Pure and deterministic: no clock, no randomness. Engagement dominates;
//! the topic bonus only separates candidates with similar engagement.
//! Ties are left to the selector.

use super::types::{Candidate, ScoredCandidate};
use super::whitelist::TopicWhitelist;

/// Points per upvote.
pub const VOTE_WEIGHT: f64 = 1.0;
/// Points per comment. Lower than a vote: comments are a weaker signal.
pub const COMMENT_WEIGHT: f64 = 0.5;
/// Points per matched whitelist topic.
pub const TOPIC_MATCH_BONUS: f64 = 10.0;

pub fn score(candidate: &Candidate, matched_topics: &[String]) -> f64 {
    VOTE_WEIGHT * f64::from(candidate.votes)
        + COMMENT_WEIGHT * f64::from(candidate.comments)
        + TOPIC_MATCH_BONUS * matched_topics.len() as f64
}

/// Attach matched topics and score. Candidates with no whitelisted topic are
/// skipped, so every output has a non-empty `matched_topics`.
pub fn score_all(candidates: Vec<Candidate>, whitelist: &TopicWhitelist) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let matched_topics = whitelist.match_topics(&candidate.topics);
            if matched_topics.is_empty() {
                return None;
            }
            let score = score(&candidate, &matched_topics);
            Some(ScoredCandidate {
                candidate,
                score,
                matched_topics,
            })
        })
        .collect()
}
