use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{post_json_with_retry, PublishResult, Publisher};
use crate::discovery::types::ScoredCandidate;
use crate::format::MessageFormatter;

#[derive(Clone)]
pub struct DiscordPublisher {
    webhook: String,
    client: Client,
    formatter: MessageFormatter,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordPublisher {
    pub fn new(webhook: String, formatter: MessageFormatter) -> Self {
        Self {
            webhook,
            client: Client::new(),
            formatter,
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn payload(&self, pick: &ScoredCandidate) -> DiscordWebhookPayload {
        DiscordWebhookPayload {
            content: None,
            embeds: vec![DiscordEmbed {
                title: self.formatter.title(pick),
                description: self.formatter.plain_text(pick),
                url: pick.candidate.url.clone(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl Publisher for DiscordPublisher {
    async fn publish(&self, pick: &ScoredCandidate, dry_run: bool) -> PublishResult {
        if dry_run {
            tracing::info!(id = %pick.id(), "dry run, discord message not sent");
            return PublishResult::Skipped;
        }
        let payload = self.payload(pick);
        match post_json_with_retry(&self.client, &self.webhook, &payload, self.timeout, self.max_retries)
            .await
        {
            Ok(()) => PublishResult::Delivered,
            Err(e) => PublishResult::Failed(format!("discord webhook: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }

    /// A GET on the webhook URL returns the webhook object when it is valid.
    async fn check_connection(&self) -> anyhow::Result<()> {
        let rsp = self
            .client
            .get(&self.webhook)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("discord webhook check: request failed: {e}"))?;
        let status = rsp.status();
        if !status.is_success() {
            anyhow::bail!("discord webhook check: HTTP {status}");
        }
        tracing::info!("discord webhook reachable");
        Ok(())
    }

    async fn send_notice(&self, text: &str) -> anyhow::Result<()> {
        let payload = DiscordWebhookPayload {
            content: Some(text.to_string()),
            embeds: Vec::new(),
        };
        post_json_with_retry(&self.client, &self.webhook, &payload, self.timeout, self.max_retries)
            .await
            .map_err(|e| anyhow::anyhow!("discord webhook: {e}"))
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<DiscordEmbed>,
}
