//! Raw catalog record → `Candidate`.
//!
//! Records without an id or a parseable `createdAt` are rejected one by one;
//! a bad record never fails the batch.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use super::types::{Candidate, RawRecord};
use super::whitelist::slugify;
use crate::error::RadarError;

const MAX_TEXT_CHARS: usize = 500;

/// Decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

fn non_negative(v: Option<i64>) -> u32 {
    v.and_then(|x| u32::try_from(x).ok()).unwrap_or(0)
}

pub fn normalize_record(raw: RawRecord) -> Result<Candidate, RadarError> {
    let id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(RadarError::MalformedRecord {
            id: None,
            reason: "missing id",
        })?;

    let submitted_at = raw
        .created_at
        .as_deref()
        .ok_or(RadarError::MalformedRecord {
            id: Some(id.clone()),
            reason: "missing createdAt",
        })
        .and_then(|ts| {
            DateTime::parse_from_rfc3339(ts.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| RadarError::MalformedRecord {
                    id: Some(id.clone()),
                    reason: "unparseable createdAt",
                })
        })?;

    let mut topics: Vec<String> = Vec::with_capacity(raw.topics.len());
    for t in &raw.topics {
        let slug = slugify(t);
        if !slug.is_empty() && !topics.contains(&slug) {
            topics.push(slug);
        }
    }

    Ok(Candidate {
        title: normalize_text(raw.name.as_deref().unwrap_or_default()),
        tagline: normalize_text(raw.tagline.as_deref().unwrap_or_default()),
        topics,
        votes: non_negative(raw.votes_count),
        comments: non_negative(raw.comments_count),
        submitted_at,
        url: raw.url.or(raw.website).filter(|u| !u.trim().is_empty()),
        id,
    })
}

/// Normalize a batch. Returns the candidates and the number of rejected records.
pub fn normalize_batch(raws: Vec<RawRecord>) -> (Vec<Candidate>, usize) {
    let mut out = Vec::with_capacity(raws.len());
    let mut malformed = 0usize;
    for raw in raws {
        match normalize_record(raw) {
            Ok(c) => out.push(c),
            Err(e) => {
                malformed += 1;
                tracing::warn!(target: "discovery", error = %e, "dropping record");
            }
        }
    }
    (out, malformed)
}
