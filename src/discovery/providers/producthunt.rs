// src/discovery/providers/producthunt.rs
//! Product Hunt GraphQL v2 catalog client.
//!
//! Pages through `posts(postedAfter:, first:, after:)` until `limit` posts are
//! collected or the connection is exhausted. A failed page fails the whole
//! fetch; nothing partial is returned.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::discovery::types::{CatalogSource, RawRecord};
use crate::error::RadarError;
use crate::retry::backoff;

pub const ENDPOINT: &str = "https://api.producthunt.com/v2/api/graphql";
pub const DEFAULT_PAGE_SIZE: usize = 20;

const POSTS_QUERY: &str = r#"
query ($after: DateTime!, $first: Int!, $cursor: String) {
  posts(postedAfter: $after, first: $first, after: $cursor) {
    edges {
      node {
        id
        name
        tagline
        description
        votesCount
        commentsCount
        url
        website
        createdAt
        topics(first: 10) { edges { node { name slug } } }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    posts: Option<PostConnection>,
}

#[derive(Debug, Deserialize)]
struct PostConnection {
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct Edge {
    #[serde(default)]
    node: Value,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    id: Option<String>,
    name: Option<String>,
    tagline: Option<String>,
    description: Option<String>,
    votes_count: Option<i64>,
    comments_count: Option<i64>,
    url: Option<String>,
    website: Option<String>,
    created_at: Option<String>,
    topics: Option<TopicConnection>,
}

#[derive(Debug, Deserialize)]
struct TopicConnection {
    #[serde(default)]
    edges: Vec<TopicEdge>,
}

#[derive(Debug, Deserialize)]
struct TopicEdge {
    node: Option<TopicNode>,
}

#[derive(Debug, Deserialize)]
struct TopicNode {
    name: Option<String>,
    slug: Option<String>,
}

impl From<PostNode> for RawRecord {
    fn from(n: PostNode) -> Self {
        let topics = n
            .topics
            .map(|t| t.edges)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| e.node)
            .filter_map(|t| t.slug.or(t.name))
            .collect();
        RawRecord {
            id: n.id,
            name: n.name,
            tagline: n.tagline,
            description: n.description,
            votes_count: n.votes_count,
            comments_count: n.comments_count,
            created_at: n.created_at,
            url: n.url,
            website: n.website,
            topics,
        }
    }
}

/// A node that does not fit the expected shape keeps only its id, so the
/// normalizer rejects and counts it.
fn node_to_record(node: Value) -> RawRecord {
    let id = node.get("id").and_then(Value::as_str).map(str::to_string);
    match serde_json::from_value::<PostNode>(node) {
        Ok(n) => n.into(),
        Err(e) => {
            tracing::debug!(target: "discovery", ?id, error = %e, "unexpected post shape");
            RawRecord {
                id,
                ..Default::default()
            }
        }
    }
}

/// Parse one GraphQL page. GraphQL-level `errors` count as catalog failure.
pub fn parse_posts_page(body: &str) -> Result<(Vec<RawRecord>, PageInfo), RadarError> {
    let rsp: GqlResponse = serde_json::from_str(body)
        .map_err(|e| RadarError::CatalogUnavailable(format!("invalid GraphQL response: {e}")))?;

    if !rsp.errors.is_empty() {
        let msgs: Vec<String> = rsp
            .errors
            .into_iter()
            .map(|e| e.message.unwrap_or_else(|| "unknown error".into()))
            .collect();
        return Err(RadarError::CatalogUnavailable(format!(
            "GraphQL errors: {}",
            msgs.join("; ")
        )));
    }

    let posts = rsp
        .data
        .and_then(|d| d.posts)
        .ok_or_else(|| RadarError::CatalogUnavailable("response has no posts".into()))?;

    let records = posts
        .edges
        .into_iter()
        .filter(|e| !e.node.is_null())
        .map(|e| node_to_record(e.node))
        .collect();
    Ok((records, posts.page_info))
}

pub struct ProductHuntCatalog {
    token: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl ProductHuntCatalog {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: ENDPOINT.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// POST one query. Auth failures are final; transport errors, 429 and
    /// 5xx are retried with backoff.
    async fn request(&self, payload: &Value) -> Result<String, RadarError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .header(reqwest::header::ACCEPT, "application/json")
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let failure = match res {
                Ok(rsp) => match rsp.status() {
                    StatusCode::UNAUTHORIZED => {
                        return Err(RadarError::CatalogUnavailable(
                            "invalid PRODUCTHUNT_TOKEN (401)".into(),
                        ))
                    }
                    StatusCode::FORBIDDEN => {
                        return Err(RadarError::CatalogUnavailable(
                            "PRODUCTHUNT_TOKEN lacks permissions (403)".into(),
                        ))
                    }
                    s if s.is_success() => {
                        return rsp.text().await.map_err(|e| {
                            RadarError::CatalogUnavailable(format!("reading response: {e}"))
                        })
                    }
                    s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                        format!("HTTP {s}")
                    }
                    s => return Err(RadarError::CatalogUnavailable(format!("HTTP {s}"))),
                },
                Err(e) => format!("request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(RadarError::CatalogUnavailable(failure));
            }
            tracing::warn!(target: "discovery", attempt, error = %failure, "catalog request failed, retrying");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

#[async_trait]
impl CatalogSource for ProductHuntCatalog {
    async fn fetch(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RawRecord>, RadarError> {
        let after = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut out: Vec<RawRecord> = Vec::new();
        let mut cursor: Option<String> = None;

        while out.len() < limit {
            let first = DEFAULT_PAGE_SIZE.min(limit - out.len());
            let payload = json!({
                "query": POSTS_QUERY,
                "variables": { "after": after, "first": first, "cursor": cursor },
            });
            let body = self.request(&payload).await?;
            let (records, page) = parse_posts_page(&body)?;
            let got = records.len();
            out.extend(records);
            tracing::debug!(target: "discovery", got, total = out.len(), "fetched page");

            if !page.has_next_page || got == 0 {
                break;
            }
            match page.end_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        out.truncate(limit);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "producthunt"
    }
}
