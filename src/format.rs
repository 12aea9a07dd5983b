//! Channel message formatting for a picked launch.
//!
//! Telegram gets HTML (parse_mode=HTML, every interpolated value escaped);
//! Discord and the log publisher get plain text.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::discovery::types::ScoredCandidate;
use crate::discovery::whitelist::TopicWhitelist;

const TAGLINE_MAX: usize = 180;

/// Cut `text` to at most `max_chars`, ending with `...` when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(SUFFIX.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(SUFFIX);
    out
}

#[derive(Debug, Clone)]
pub struct MessageFormatter {
    whitelist: TopicWhitelist,
}

impl MessageFormatter {
    pub fn new(whitelist: TopicWhitelist) -> Self {
        Self { whitelist }
    }

    fn labels(&self, pick: &ScoredCandidate) -> Vec<String> {
        pick.matched_topics
            .iter()
            .map(|t| self.whitelist.label_for(t).unwrap_or(t).to_string())
            .collect()
    }

    pub fn title(&self, pick: &ScoredCandidate) -> String {
        if pick.candidate.title.is_empty() {
            format!("Launch {}", pick.candidate.id)
        } else {
            pick.candidate.title.clone()
        }
    }

    pub fn telegram_html(&self, pick: &ScoredCandidate) -> String {
        let c = &pick.candidate;
        let mut parts = vec![
            "🚀 <b>Fintech Radar pick</b>".to_string(),
            String::new(),
            format!("<b>{}</b>", encode_text(&self.title(pick))),
        ];
        if !c.tagline.is_empty() {
            parts.push(encode_text(&truncate_text(&c.tagline, TAGLINE_MAX)).into_owned());
        }
        parts.push(String::new());
        parts.push(format!("🏷 {}", encode_text(&self.labels(pick).join(" · "))));
        parts.push(format!("▲ {} upvotes · 💬 {} comments", c.votes, c.comments));
        if let Some(url) = &c.url {
            parts.push(format!(
                "🔗 <a href=\"{}\">Open on Product Hunt</a>",
                encode_double_quoted_attribute(url)
            ));
        }
        parts.join("\n")
    }

    pub fn plain_text(&self, pick: &ScoredCandidate) -> String {
        let c = &pick.candidate;
        let mut out = self.title(pick);
        if !c.tagline.is_empty() {
            out.push_str(": ");
            out.push_str(&truncate_text(&c.tagline, TAGLINE_MAX));
        }
        out.push_str(&format!(
            "\nTopics: {}\nUpvotes: {} · Comments: {}",
            self.labels(pick).join(", "),
            c.votes,
            c.comments
        ));
        if let Some(url) = &c.url {
            out.push('\n');
            out.push_str(url);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::types::Candidate;
    use chrono::{TimeZone, Utc};

    fn pick(title: &str, tagline: &str, url: Option<&str>) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: "p9".into(),
                title: title.into(),
                tagline: tagline.into(),
                topics: vec!["payroll-software".into()],
                votes: 80,
                comments: 4,
                submitted_at: Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap(),
                url: url.map(Into::into),
            },
            score: 92.0,
            matched_topics: vec!["payroll-software".into()],
        }
    }

    #[test]
    fn truncate_respects_limit() {
        assert_eq!(truncate_text("short", 10), "short");
        let t = truncate_text(&"x".repeat(20), 10);
        assert_eq!(t, "xxxxxxx...");
        assert_eq!(t.chars().count(), 10);
    }

    #[test]
    fn telegram_html_escapes_and_labels() {
        let f = MessageFormatter::new(TopicWhitelist::finance_default());
        let msg = f.telegram_html(&pick("Pay<Roll>", "A & B", Some("https://ph.example/p?a=1&b=2")));
        assert!(msg.contains("<b>Pay&lt;Roll&gt;</b>"));
        assert!(msg.contains("A &amp; B"));
        assert!(msg.contains("Payroll software"));
        assert!(msg.contains("▲ 80 upvotes"));
        assert!(msg.contains("href=\"https://ph.example/p?a=1&amp;b=2\""));
    }

    #[test]
    fn plain_text_without_url_or_title() {
        let f = MessageFormatter::new(TopicWhitelist::finance_default());
        let msg = f.plain_text(&pick("", "", None));
        assert!(msg.starts_with("Launch p9"));
        assert!(msg.contains("Topics: Payroll software"));
        assert!(!msg.contains("http"));
    }
}
