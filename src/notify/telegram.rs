use anyhow::{anyhow, Result};
use serde_json::Value;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{post_json_with_retry, PublishResult, Publisher};
use crate::discovery::types::ScoredCandidate;
use crate::format::MessageFormatter;

const API_BASE: &str = "https://api.telegram.org";

/// Bot API `sendMessage` into one chat or channel.
#[derive(Clone)]
pub struct TelegramPublisher {
    token: String,
    chat_id: String,
    client: Client,
    formatter: MessageFormatter,
    api_base: String,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

impl TelegramPublisher {
    pub fn new(token: String, chat_id: String, formatter: MessageFormatter) -> Self {
        Self {
            token,
            chat_id,
            client: Client::new(),
            formatter,
            api_base: API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    /// Point at a different Bot API host (local bot server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    fn endpoint(&self) -> String {
        self.method_url("sendMessage")
    }

    /// GET a Bot API method and unwrap its `result`.
    async fn call(&self, method: &str, query: &[(&str, &str)]) -> Result<Value, String> {
        self.call_raw(method, query)
            .await
            .map_err(|e| e.replace(&self.token, "<token>"))
    }

    async fn call_raw(&self, method: &str, query: &[(&str, &str)]) -> Result<Value, String> {
        let rsp = self
            .client
            .get(self.method_url(method))
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        let status = rsp.status();
        let body: Value = rsp.json().await.map_err(|e| format!("HTTP {status}: {e}"))?;
        if !status.is_success() || body.get("ok").and_then(Value::as_bool) != Some(true) {
            let detail = body.get("description").and_then(Value::as_str).unwrap_or("not ok");
            return Err(format!("HTTP {status}: {detail}"));
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn send(&self, text: &str, parse_mode: Option<&'static str>) -> Result<(), String> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode,
            disable_web_page_preview: false,
        };
        post_json_with_retry(&self.client, &self.endpoint(), &body, self.timeout, self.max_retries)
            .await
            // The token is part of the URL; keep it out of error text.
            .map_err(|e| e.replace(&self.token, "<token>"))
    }

    /// Send a plain text message (startup / connectivity check).
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.send(text, None)
            .await
            .map_err(|e| anyhow!("telegram sendMessage: {e}"))
    }
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, pick: &ScoredCandidate, dry_run: bool) -> PublishResult {
        let html = self.formatter.telegram_html(pick);
        if dry_run {
            tracing::info!(id = %pick.id(), message = %html, "dry run, telegram message not sent");
            return PublishResult::Skipped;
        }
        match self.send(&html, Some("HTML")).await {
            Ok(()) => {
                tracing::info!(id = %pick.id(), chat = %self.chat_id, "posted to telegram");
                PublishResult::Delivered
            }
            Err(e) => PublishResult::Failed(format!("telegram sendMessage: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }

    /// `getMe` for the token, then `getChat` for channel access.
    async fn check_connection(&self) -> Result<()> {
        let me = self
            .call("getMe", &[])
            .await
            .map_err(|e| anyhow!("telegram getMe: {e}"))?;
        let bot = me.get("username").and_then(Value::as_str).unwrap_or("?");
        tracing::info!(%bot, "telegram bot connected");

        let chat = self
            .call("getChat", &[("chat_id", self.chat_id.as_str())])
            .await
            .map_err(|e| anyhow!("telegram getChat {}: {e}", self.chat_id))?;
        let title = chat.get("title").and_then(Value::as_str).unwrap_or(self.chat_id.as_str());
        tracing::info!(chat = %title, "telegram channel reachable");
        Ok(())
    }

    async fn send_notice(&self, text: &str) -> Result<()> {
        self.send_text(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token_and_trims_base() {
        let p = TelegramPublisher::new("123:abc".into(), "@radar".into(), MessageFormatter::new(Default::default()))
            .with_api_base("http://localhost:8081/");
        assert_eq!(p.endpoint(), "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[test]
    fn request_body_shape() {
        let body = SendMessage {
            chat_id: "@radar",
            text: "<b>hi</b>",
            parse_mode: Some("HTML"),
            disable_web_page_preview: false,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["chat_id"], "@radar");
        assert_eq!(v["parse_mode"], "HTML");

        let plain = SendMessage {
            chat_id: "@radar",
            text: "hi",
            parse_mode: None,
            disable_web_page_preview: false,
        };
        assert!(serde_json::to_value(&plain).unwrap().get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn unreachable_api_reports_failure_without_token() {
        let p = TelegramPublisher::new("secret-token".into(), "@radar".into(), MessageFormatter::new(Default::default()))
            .with_api_base("http://127.0.0.1:9")
            .with_retries(1);
        let err = p.send_text("ping").await.unwrap_err().to_string();
        assert!(!err.contains("secret-token"));
    }

    #[tokio::test]
    async fn connection_check_fails_on_unreachable_api_without_token() {
        let p = TelegramPublisher::new("secret-token".into(), "@radar".into(), MessageFormatter::new(Default::default()))
            .with_api_base("http://127.0.0.1:9");
        let err = format!("{:#}", p.check_connection().await.unwrap_err());
        assert!(err.contains("getMe"));
        assert!(!err.contains("secret-token"));
    }
}
