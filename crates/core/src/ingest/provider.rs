use crate::config::Settings;
use crate::domain::quote::QuoteSnapshot;
use crate::domain::security::SecurityIdentity;
use crate::error::PipelineError;
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::KlineResponse;
use anyhow::Context;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const KLINE_LIMIT: &str = "60";

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, identity: &SecurityIdentity) -> Result<QuoteSnapshot, PipelineError>;
}

/// One raw kline request for a market-qualified id. Retries are layered on top.
#[async_trait::async_trait]
pub trait KlineFeed: Send + Sync {
    async fn klines(&self, market_id: &str) -> Result<Vec<String>, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct EastmoneyKlineFeed {
    http: reqwest::Client,
    url: String,
}

impl EastmoneyKlineFeed {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.quote_timeout)
            .build()
            .context("failed to build quote http client")?;

        Ok(Self {
            http,
            url: KLINE_URL.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl KlineFeed for EastmoneyKlineFeed {
    async fn klines(&self, market_id: &str) -> Result<Vec<String>, PipelineError> {
        let params = [
            ("secid", market_id),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61,f116"),
            ("klt", "101"),
            ("fqt", "1"),
            ("beg", "0"),
            ("end", "20500101"),
            ("lmt", KLINE_LIMIT),
        ];

        let res = self
            .http
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PipelineError::upstream(format!("kline request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| PipelineError::upstream(format!("failed to read kline response: {e}")))?;
        if !status.is_success() {
            return Err(PipelineError::upstream(format!(
                "kline HTTP {status}: {}",
                truncate(&text, 200)
            )));
        }

        parse_kline_body(&text)
    }
}

/// Quote adapter: retried kline fetch, then snapshot derivation.
pub struct EastmoneyQuoteClient {
    feed: Box<dyn KlineFeed>,
    retry: RetryPolicy,
}

impl EastmoneyQuoteClient {
    pub fn new(feed: Box<dyn KlineFeed>, retry: RetryPolicy) -> Self {
        Self { feed, retry }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(
            Box::new(EastmoneyKlineFeed::from_settings(settings)?),
            settings.quote_retry,
        ))
    }
}

#[async_trait::async_trait]
impl QuoteSource for EastmoneyQuoteClient {
    async fn fetch(&self, identity: &SecurityIdentity) -> Result<QuoteSnapshot, PipelineError> {
        let market_id = identity.market_id();
        let klines = self
            .retry
            .run("kline fetch", |_| self.feed.klines(&market_id))
            .await?;

        tracing::debug!(code = %identity.code, %market_id, bars = klines.len(), "klines fetched");
        // Short history is a property of the security, not a transient failure.
        QuoteSnapshot::from_klines(&identity.code, &klines)
    }
}

pub fn parse_kline_body(text: &str) -> Result<Vec<String>, PipelineError> {
    let parsed = serde_json::from_str::<KlineResponse>(text).map_err(|e| {
        PipelineError::malformed(format!("kline response is not valid JSON: {e}"))
    })?;

    parsed
        .data
        .and_then(|d| d.klines)
        .ok_or_else(|| PipelineError::malformed("kline response missing data.klines"))
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}
