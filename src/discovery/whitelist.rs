//! Finance subcategory whitelist.
//!
//! Buckets are ordered: the order is the round-robin sequence. Membership
//! lookups go through a slug index so they stay O(1).

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Built-in finance subcategories, in round-robin order.
pub const FINANCE_SUBCATS: &[&str] = &[
    "Accounting software",
    "Budgeting apps",
    "Credit score tools",
    "Financial planning",
    "Fundraising resources",
    "Investing",
    "Invoicing tools",
    "Money transfer",
    "Neobanks",
    "Online banking",
    "Payroll software",
    "Remote workforce tools",
    "Retirement planning",
    "Savings apps",
    "Startup financial planning",
    "Startup incorporation",
    "Stock trading platforms",
    "Tax preparation",
    "Treasury management platforms",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicBucket {
    pub topic_id: String,
    pub display_label: String,
}

#[derive(Debug, Clone)]
pub struct TopicWhitelist {
    buckets: Vec<TopicBucket>,
    index: HashMap<String, usize>,
}

/// Canonical topic id: lowercase ASCII words joined by `-`.
/// "Payroll software", "payroll-software" and "PAYROLL  Software" all map to
/// `payroll-software`.
pub fn slugify(s: &str) -> String {
    static RE_SEP: OnceCell<Regex> = OnceCell::new();
    let re = RE_SEP.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lower = s.trim().to_lowercase();
    re.replace_all(&lower, "-").trim_matches('-').to_string()
}

impl TopicWhitelist {
    /// Build from display labels. Empty labels and repeated slugs are skipped;
    /// the first occurrence keeps its position.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buckets = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            let label = label.as_ref().trim();
            let id = slugify(label);
            if id.is_empty() || index.contains_key(&id) {
                continue;
            }
            index.insert(id.clone(), buckets.len());
            buckets.push(TopicBucket {
                topic_id: id,
                display_label: label.to_string(),
            });
        }
        Self { buckets, index }
    }

    pub fn finance_default() -> Self {
        Self::from_labels(FINANCE_SUBCATS.iter().copied())
    }

    pub fn buckets(&self) -> &[TopicBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains(&self, topic_id: &str) -> bool {
        self.index.contains_key(topic_id)
    }

    pub fn position(&self, topic_id: &str) -> Option<usize> {
        self.index.get(topic_id).copied()
    }

    pub fn label_for(&self, topic_id: &str) -> Option<&str> {
        self.position(topic_id)
            .map(|i| self.buckets[i].display_label.as_str())
    }

    /// Whitelisted topic ids among `topics`, in bucket order, without repeats.
    pub fn match_topics<S: AsRef<str>>(&self, topics: &[S]) -> Vec<String> {
        let mut hits: Vec<usize> = topics
            .iter()
            .filter_map(|t| self.position(&slugify(t.as_ref())))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter()
            .map(|i| self.buckets[i].topic_id.clone())
            .collect()
    }
}

impl Default for TopicWhitelist {
    fn default() -> Self {
        Self::finance_default()
    }
}
