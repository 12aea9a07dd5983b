// src/discovery/mod.rs
//! Discovery run: fetch → normalize → filter → score → select → publish →
//! persist. One call is one invocation; there is no loop in here.

pub mod filter;
pub mod normalize;
pub mod providers;
pub mod scoring;
pub mod select;
pub mod types;
pub mod whitelist;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::notify::{PublishResult, Publisher};
use crate::state::StateStore;
use filter::{dedup_batch, filter_candidates, FilterStats};
use normalize::normalize_batch;
use scoring::score_all;
use select::{select, Strategy};
use types::{CatalogSource, ScoredCandidate};
use whitelist::TopicWhitelist;

/// One-time metrics registration (so series show up in the exposition).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("discovery_fetched_total", "Raw records returned by the catalog.");
        describe_counter!("discovery_malformed_total", "Records rejected by the normalizer.");
        describe_counter!(
            "discovery_filtered_total",
            "Candidates dropped by window, topic or dedup filtering."
        );
        describe_counter!("discovery_selected_total", "Candidates selected for publishing.");
        describe_counter!("discovery_catalog_errors_total", "Runs aborted by catalog failures.");
        describe_counter!("discovery_publish_failures_total", "Publish attempts that failed.");
        describe_counter!(
            "discovery_state_save_errors_total",
            "Dedup state saves that failed after publishing."
        );
        describe_histogram!("discovery_fetch_ms", "Catalog fetch time in milliseconds.");
        describe_gauge!("discovery_last_run_ts", "Unix ts when a discovery run last finished.");
    });
}

/// Per-invocation input. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    pub since: DateTime<Utc>,
    pub limit: usize,
    pub top_n: usize,
    pub strategy: Strategy,
    pub dry_run: bool,
    pub debug: bool,
}

/// Start of a window of `hours` ending at `now`. Windows that reach past the
/// representable time range are a config error.
pub fn window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, RadarError> {
    Duration::try_hours(hours)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| RadarError::Config(format!("time window of {hours}h is out of range")))
}

impl RunParameters {
    /// Defaults from config: window of `since_hours` ending at `now`.
    pub fn from_config(cfg: &RadarConfig, now: DateTime<Utc>) -> Result<Self, RadarError> {
        Ok(Self {
            since: window_start(now, cfg.since_hours)?,
            limit: cfg.limit,
            top_n: cfg.top_n,
            strategy: cfg.strategy,
            dry_run: false,
            debug: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickSummary {
    pub id: String,
    pub title: String,
    pub score: f64,
    pub topics: Vec<String>,
    pub outcome: String,
}

/// Counts at each stage, plus what happened to the picks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub normalized: usize,
    pub dropped: FilterStats,
    pub filtered: usize,
    pub scored: usize,
    pub selected: usize,
    pub delivered: usize,
    pub publish_failures: usize,
    pub strategy: Strategy,
    pub dry_run: bool,
    pub rr_cursor_before: usize,
    pub rr_cursor_after: usize,
    pub state_saved: bool,
    /// Set when persisting failed after publishing.
    pub state_error: Option<String>,
    pub picks: Vec<PickSummary>,
}

/// Wires the collaborators for one run. Holds no state between runs.
pub struct Discovery<'a> {
    catalog: &'a dyn CatalogSource,
    store: &'a dyn StateStore,
    publisher: &'a dyn Publisher,
    whitelist: &'a TopicWhitelist,
}

impl<'a> Discovery<'a> {
    pub fn new(
        catalog: &'a dyn CatalogSource,
        store: &'a dyn StateStore,
        publisher: &'a dyn Publisher,
        whitelist: &'a TopicWhitelist,
    ) -> Self {
        Self {
            catalog,
            store,
            publisher,
            whitelist,
        }
    }

    pub async fn run(&self, params: &RunParameters) -> Result<RunSummary, RadarError> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.run_with_rng(params, &mut rng).await
    }

    /// Only a catalog failure (or an unreadable store) returns `Err`; in that
    /// case nothing has been published or persisted.
    pub async fn run_with_rng<R: Rng + Send + ?Sized>(
        &self,
        params: &RunParameters,
        rng: &mut R,
    ) -> Result<RunSummary, RadarError> {
        ensure_metrics_described();

        let mut state = self.store.load()?;
        let rr_cursor_before = state.resume_cursor(self.whitelist);

        let t0 = std::time::Instant::now();
        let raw = match self.catalog.fetch(params.since, params.limit).await {
            Ok(v) => v,
            Err(e) => {
                counter!("discovery_catalog_errors_total").increment(1);
                tracing::error!(target: "discovery", catalog = self.catalog.name(), error = %e, "fetch failed, aborting run");
                return Err(e);
            }
        };
        histogram!("discovery_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        let fetched = raw.len();
        counter!("discovery_fetched_total").increment(fetched as u64);

        let (candidates, malformed) = normalize_batch(raw);
        let (candidates, duplicates) = dedup_batch(candidates);
        let normalized = candidates.len();
        counter!("discovery_malformed_total").increment(malformed as u64);

        let (eligible, dropped) =
            filter_candidates(candidates, params.since, self.whitelist, &state.seen_ids);
        let filtered = eligible.len();
        counter!("discovery_filtered_total").increment(dropped.total() as u64);

        let scored = score_all(eligible, self.whitelist);
        if params.debug {
            log_scored(&scored);
        }

        let selection = select(
            &scored,
            params.top_n,
            params.strategy,
            rr_cursor_before,
            self.whitelist,
            rng,
        );
        counter!("discovery_selected_total").increment(selection.picks.len() as u64);

        tracing::info!(
            target: "discovery",
            fetched,
            malformed,
            duplicates,
            normalized,
            filtered,
            scored = scored.len(),
            selected = selection.picks.len(),
            strategy = %params.strategy,
            dry_run = params.dry_run,
            "selection done"
        );

        let mut picks = Vec::with_capacity(selection.picks.len());
        let mut delivered = 0usize;
        let mut publish_failures = 0usize;
        for pick in &selection.picks {
            let result = self.publisher.publish(pick, params.dry_run).await;
            let outcome = match &result {
                PublishResult::Delivered => {
                    delivered += 1;
                    "delivered".to_string()
                }
                PublishResult::Skipped => "skipped (dry run)".to_string(),
                PublishResult::Failed(reason) => {
                    publish_failures += 1;
                    counter!("discovery_publish_failures_total").increment(1);
                    tracing::warn!(target: "discovery", id = %pick.id(), publisher = self.publisher.name(), %reason, "publish failed");
                    format!("failed: {reason}")
                }
            };
            picks.push(PickSummary {
                id: pick.candidate.id.clone(),
                title: pick.candidate.title.clone(),
                score: pick.score,
                topics: pick.matched_topics.clone(),
                outcome,
            });
        }

        // Publish first, persist second: a failed save is reported, the
        // publish stands.
        let mut state_saved = false;
        let mut state_error = None;
        if !params.dry_run && !selection.picks.is_empty() {
            state.mark_seen(selection.picks.iter().map(|p| p.candidate.id.clone()));
            if let Some(c) = selection.next_cursor {
                state.rr_cursor = c;
            }
            if let Some(topic) = &selection.last_topic {
                state.last_topic = Some(topic.clone());
            }
            match self.store.save(&state) {
                Ok(()) => state_saved = true,
                Err(e) => {
                    counter!("discovery_state_save_errors_total").increment(1);
                    tracing::warn!(target: "discovery", error = %e, "state not saved; published items may repeat");
                    state_error = Some(e.to_string());
                }
            }
        }

        gauge!("discovery_last_run_ts").set(Utc::now().timestamp() as f64);

        Ok(RunSummary {
            fetched,
            malformed,
            duplicates,
            normalized,
            dropped,
            filtered,
            scored: scored.len(),
            selected: selection.picks.len(),
            delivered,
            publish_failures,
            strategy: params.strategy,
            dry_run: params.dry_run,
            rr_cursor_before,
            rr_cursor_after: if state_saved { state.rr_cursor } else { rr_cursor_before },
            state_saved,
            state_error,
            picks,
        })
    }
}

fn log_scored(scored: &[ScoredCandidate]) {
    let mut ranked: Vec<&ScoredCandidate> = scored.iter().collect();
    ranked.sort_by(|a, b| select::rank_order(a, b));
    for s in ranked {
        tracing::debug!(
            target: "discovery",
            id = %s.candidate.id,
            title = %s.candidate.title,
            score = s.score,
            votes = s.candidate.votes,
            comments = s.candidate.comments,
            topics = ?s.matched_topics,
            "scored candidate"
        );
    }
}
