// src/config/whitelist.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

use crate::discovery::whitelist::TopicWhitelist;

/// Load a topic whitelist from TOML (`topics = [...]`) or a JSON array of
/// display labels. File order is the round-robin order.
pub fn load_whitelist_from(path: &Path) -> Result<TopicWhitelist> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading whitelist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let labels = parse_labels(&content, ext.as_str())
        .with_context(|| format!("parsing whitelist {}", path.display()))?;
    let wl = TopicWhitelist::from_labels(labels);
    if wl.is_empty() {
        return Err(anyhow!("whitelist {} has no topics", path.display()));
    }
    Ok(wl)
}

fn parse_labels(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml_first = hint_ext == "toml" || s.contains("topics");
    if try_toml_first {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str::<Vec<String>>(s) {
        return Ok(v);
    }
    if !try_toml_first {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported whitelist format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlWl {
        topics: Vec<String>,
    }
    let v: TomlWl = toml::from_str(s)?;
    Ok(v.topics)
}
