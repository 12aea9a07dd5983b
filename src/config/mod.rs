// src/config/mod.rs
//! Run configuration, read once from the environment (and `.env`) and passed
//! explicitly into the engine.

pub mod whitelist;

use chrono::NaiveTime;
use std::path::PathBuf;

use crate::discovery::select::Strategy;
use crate::discovery::whitelist::TopicWhitelist;
use crate::error::RadarError;
use crate::state::DEFAULT_STATE_PATH;

pub const ENV_PRODUCTHUNT_TOKEN: &str = "PRODUCTHUNT_TOKEN";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const ENV_STATE_PATH: &str = "RADAR_STATE_PATH";
pub const ENV_WHITELIST_PATH: &str = "RADAR_WHITELIST_PATH";
pub const ENV_POST_TIME: &str = "POST_TIME";
pub const ENV_LIMIT: &str = "RADAR_LIMIT";
pub const ENV_TOP: &str = "RADAR_TOP";
pub const ENV_SINCE_HOURS: &str = "RADAR_SINCE_HOURS";
pub const ENV_STRATEGY: &str = "RADAR_STRATEGY";

/// Upper bound for the look-back window.
pub const MAX_SINCE_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone)]
pub struct RadarConfig {
    pub producthunt_token: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_webhook_url: Option<String>,
    pub state_path: PathBuf,
    pub whitelist_path: Option<PathBuf>,
    /// Daily post time, UTC.
    pub post_time: NaiveTime,
    pub limit: usize,
    pub top_n: usize,
    pub since_hours: i64,
    pub strategy: Strategy,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            producthunt_token: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            discord_webhook_url: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            whitelist_path: None,
            post_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            limit: 60,
            top_n: 1,
            since_hours: 24,
            strategy: Strategy::RoundRobin,
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, RadarError> {
    raw.trim()
        .parse()
        .map_err(|_| RadarError::Config(format!("{key} must be a number, got `{raw}`")))
}

impl RadarConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, RadarError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RadarError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        cfg.producthunt_token = get(ENV_PRODUCTHUNT_TOKEN);
        cfg.telegram_bot_token = get(ENV_TELEGRAM_BOT_TOKEN);
        cfg.telegram_chat_id = get(ENV_TELEGRAM_CHAT_ID);
        cfg.discord_webhook_url = get(ENV_DISCORD_WEBHOOK_URL);

        if let Some(p) = get(ENV_STATE_PATH) {
            cfg.state_path = PathBuf::from(p);
        }
        cfg.whitelist_path = get(ENV_WHITELIST_PATH).map(PathBuf::from);

        if let Some(t) = get(ENV_POST_TIME) {
            cfg.post_time = NaiveTime::parse_from_str(t.trim(), "%H:%M")
                .map_err(|_| RadarError::Config(format!("{ENV_POST_TIME} must be HH:MM, got `{t}`")))?;
        }
        if let Some(v) = get(ENV_LIMIT) {
            cfg.limit = parse_num(ENV_LIMIT, &v)?;
        }
        if let Some(v) = get(ENV_TOP) {
            cfg.top_n = parse_num(ENV_TOP, &v)?;
        }
        if let Some(v) = get(ENV_SINCE_HOURS) {
            cfg.since_hours = parse_num(ENV_SINCE_HOURS, &v)?;
        }
        if let Some(v) = get(ENV_STRATEGY) {
            cfg.strategy = v.parse().map_err(RadarError::Config)?;
        }

        if cfg.limit == 0 {
            return Err(RadarError::Config(format!("{ENV_LIMIT} must be positive")));
        }
        if cfg.since_hours <= 0 {
            return Err(RadarError::Config(format!("{ENV_SINCE_HOURS} must be positive")));
        }
        if cfg.since_hours > MAX_SINCE_HOURS {
            return Err(RadarError::Config(format!(
                "{ENV_SINCE_HOURS} must be at most {MAX_SINCE_HOURS} (one year)"
            )));
        }
        Ok(cfg)
    }

    pub fn require_producthunt_token(&self) -> Result<&str, RadarError> {
        self.producthunt_token
            .as_deref()
            .ok_or_else(|| RadarError::Config(format!("{ENV_PRODUCTHUNT_TOKEN} is not set")))
    }

    /// Telegram credentials, both required together.
    pub fn require_telegram(&self) -> Result<(&str, &str), RadarError> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(t), Some(c)) => Ok((t, c)),
            _ => Err(RadarError::Config(format!(
                "{ENV_TELEGRAM_BOT_TOKEN} and {ENV_TELEGRAM_CHAT_ID} must both be set"
            ))),
        }
    }

    /// A real channel must be configured; a half-set Telegram pair is an error
    /// even when Discord is available.
    pub fn validate_for_publish(&self) -> Result<(), RadarError> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(_), Some(_)) => Ok(()),
            (Some(_), None) | (None, Some(_)) => self.require_telegram().map(|_| ()),
            (None, None) if self.discord_webhook_url.is_some() => Ok(()),
            (None, None) => Err(RadarError::Config(format!(
                "no channel configured: set {ENV_TELEGRAM_BOT_TOKEN} and {ENV_TELEGRAM_CHAT_ID}, or {ENV_DISCORD_WEBHOOK_URL}"
            ))),
        }
    }

    /// Whitelist from `RADAR_WHITELIST_PATH`, or the built-in finance list.
    pub fn whitelist(&self) -> anyhow::Result<TopicWhitelist> {
        match &self.whitelist_path {
            Some(p) => whitelist::load_whitelist_from(p),
            None => Ok(TopicWhitelist::finance_default()),
        }
    }
}
