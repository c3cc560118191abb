use crate::config::Settings;
use crate::domain::security::SecurityIdentity;
use crate::signal::{bullet_lines, SignalSlot, SignalSource};
use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_POSTS: usize = 5;
// The endpoint rejects max_results below 10; trim locally instead.
const REQUEST_MAX_RESULTS: &str = "10";
const LANGUAGE: &str = "zh";
const WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct TwitterSearchClient {
    http: reqwest::Client,
    bearer_token: String,
}

impl TwitterSearchClient {
    pub fn new(settings: &Settings, bearer_token: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.quote_timeout)
            .build()
            .context("failed to build twitter http client")?;
        Ok(Self {
            http,
            bearer_token: bearer_token.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SignalSource for TwitterSearchClient {
    fn slot(&self) -> SignalSlot {
        SignalSlot::SocialTwitter
    }

    async fn fetch(&self, identity: &SecurityIdentity) -> anyhow::Result<String> {
        let query = search_query(identity);
        let start_time = window_start(Utc::now());

        let res = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", REQUEST_MAX_RESULTS),
                ("start_time", start_time.as_str()),
                ("tweet.fields", "created_at"),
            ])
            .send()
            .await
            .context("twitter search request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read twitter response")?;
        if !status.is_success() {
            anyhow::bail!("twitter search HTTP {status}");
        }

        let posts = parse_posts(&text)?;
        tracing::debug!(code = %identity.code, count = posts.len(), "twitter posts fetched");
        Ok(bullet_lines(posts.iter().map(|p| match &p.created_at {
            Some(at) => format!("[{at}] {}", p.text),
            None => p.text.clone(),
        })))
    }
}

pub fn search_query(identity: &SecurityIdentity) -> String {
    format!("\"{}\" lang:{LANGUAGE} -is:retweet", identity.name)
}

pub fn window_start(now: DateTime<Utc>) -> String {
    (now - Duration::hours(WINDOW_HOURS)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A response without `data` means no matches in the window.
pub fn parse_posts(text: &str) -> anyhow::Result<Vec<Post>> {
    let parsed = serde_json::from_str::<SearchResponse>(text)
        .context("twitter response is not valid JSON")?;
    Ok(parsed
        .data
        .into_iter()
        .map(|p| Post {
            text: p.text.split_whitespace().collect::<Vec<_>>().join(" "),
            created_at: p.created_at,
        })
        .filter(|p| !p.text.is_empty())
        .take(MAX_POSTS)
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Post>,
}
