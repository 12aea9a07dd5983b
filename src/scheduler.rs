// src/scheduler.rs
//! Daily trigger: sleep until the next `post_time` (UTC), run once, repeat.
//! A failed run is logged and the loop carries on to the next day.
//! Before the loop starts the channel is checked and told the post time.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::future::Future;

use crate::discovery::RunSummary;
use crate::notify::Publisher;

/// Next occurrence of `post_time` strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, post_time: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(post_time).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

pub fn startup_message(post_time: NaiveTime) -> String {
    format!(
        "Fintech Radar Bot started\nDaily pick scheduled for {} UTC",
        post_time.format("%H:%M")
    )
}

/// Check the channel, then announce the schedule. Failures are logged and
/// the scheduler starts anyway; returns whether the notice went out.
pub async fn announce_startup(publisher: &dyn Publisher, post_time: NaiveTime) -> bool {
    if let Err(e) = publisher.check_connection().await {
        let error = format!("{e:#}");
        tracing::error!(target: "scheduler", publisher = publisher.name(), %error, "channel check failed");
        return false;
    }
    match publisher.send_notice(&startup_message(post_time)).await {
        Ok(()) => {
            tracing::info!(target: "scheduler", publisher = publisher.name(), "startup notification sent");
            true
        }
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(target: "scheduler", publisher = publisher.name(), %error, "startup notification failed");
            false
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DailySchedule {
    pub post_time: NaiveTime,
}

impl DailySchedule {
    pub fn new(post_time: NaiveTime) -> Self {
        Self { post_time }
    }

    /// Run `job` every day at `post_time` until `shutdown` resolves.
    pub async fn run<J, Fut, E, S>(&self, mut job: J, shutdown: S)
    where
        J: FnMut() -> Fut,
        Fut: Future<Output = Result<RunSummary, E>>,
        E: std::fmt::Display,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.post_time);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(target: "scheduler", next_run = %next.to_rfc3339(), "waiting for next run");

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(target: "scheduler", "shutdown requested, scheduler stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match job().await {
                Ok(summary) => tracing::info!(
                    target: "scheduler",
                    selected = summary.selected,
                    delivered = summary.delivered,
                    "daily run finished"
                ),
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::error!(target: "scheduler", %error, "daily run failed");
                }
            }
        }
    }
}
