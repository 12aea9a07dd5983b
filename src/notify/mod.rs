//! Outbound channel publishers.
//!
//! One publisher per run. Every implementation returns `Skipped` on a dry run
//! without touching the network.

pub mod discord;
pub mod telegram;

use std::time::Duration;

use crate::config::RadarConfig;
use crate::discovery::types::ScoredCandidate;
use crate::format::MessageFormatter;
use crate::retry::backoff;

pub use discord::DiscordPublisher;
pub use telegram::TelegramPublisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Delivered,
    /// Dry run: formatted but not sent.
    Skipped,
    Failed(String),
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, pick: &ScoredCandidate, dry_run: bool) -> PublishResult;
    fn name(&self) -> &'static str;

    /// Confirm the channel is reachable before unattended runs.
    async fn check_connection(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Free-form notice outside the daily pick (startup, test message).
    async fn send_notice(&self, text: &str) -> anyhow::Result<()>;
}

/// POST `body` as JSON, retrying transport errors, 429 and 5xx with backoff.
/// Other non-2xx statuses fail immediately.
pub(crate) async fn post_json_with_retry<T: serde::Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
    timeout: Duration,
    max_retries: u8,
) -> Result<(), String> {
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        let res = client.post(url).timeout(timeout).json(body).send().await;

        let retryable = match res {
            Ok(rsp) => {
                let status = rsp.status();
                if status.is_success() {
                    return Ok(());
                }
                let detail = rsp.text().await.unwrap_or_default();
                if !(status.is_server_error() || status.as_u16() == 429) {
                    return Err(format!("HTTP {status}: {}", detail.trim()));
                }
                format!("HTTP {status}: {}", detail.trim())
            }
            Err(e) => format!("request failed: {e}"),
        };

        if attempt >= max_retries {
            return Err(retryable);
        }
        tracing::debug!(attempt, error = %retryable, "publish attempt failed, retrying");
        tokio::time::sleep(backoff(attempt)).await;
    }
}

/// Writes the message to stdout. Used when no channel is configured.
pub struct LogPublisher {
    formatter: MessageFormatter,
}

impl LogPublisher {
    pub fn new(formatter: MessageFormatter) -> Self {
        Self { formatter }
    }
}

#[async_trait::async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, pick: &ScoredCandidate, dry_run: bool) -> PublishResult {
        println!("{}\n", self.formatter.plain_text(pick));
        if dry_run {
            PublishResult::Skipped
        } else {
            PublishResult::Delivered
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_notice(&self, text: &str) -> anyhow::Result<()> {
        println!("{text}\n");
        Ok(())
    }
}

/// Telegram when its token and chat are set, else Discord when a webhook is
/// set, else stdout.
pub fn publisher_from_config(cfg: &RadarConfig, formatter: MessageFormatter) -> Box<dyn Publisher> {
    match (&cfg.telegram_bot_token, &cfg.telegram_chat_id, &cfg.discord_webhook_url) {
        (Some(token), Some(chat), _) => {
            Box::new(TelegramPublisher::new(token.clone(), chat.clone(), formatter))
        }
        (_, _, Some(hook)) => Box::new(DiscordPublisher::new(hook.clone(), formatter)),
        _ => {
            tracing::info!("no channel configured, publishing to stdout");
            Box::new(LogPublisher::new(formatter))
        }
    }
}
