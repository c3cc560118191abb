use crate::config::Settings;
use crate::domain::security::SecurityIdentity;
use crate::signal::{bullet_lines, SignalSlot, SignalSource};
use anyhow::Context;
use serde::Deserialize;

const ANNOUNCEMENT_URL: &str = "https://np-anotice-stock.eastmoney.com/api/security/ann";
const MAX_ANNOUNCEMENTS: usize = 3;
// Headroom for untitled entries dropped before the cap.
const REQUEST_PAGE_SIZE: &str = "10";

#[derive(Debug, Clone)]
pub struct AnnouncementClient {
    http: reqwest::Client,
    url: String,
}

impl AnnouncementClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.quote_timeout)
            .build()
            .context("failed to build announcement http client")?;
        Ok(Self {
            http,
            url: ANNOUNCEMENT_URL.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SignalSource for AnnouncementClient {
    fn slot(&self) -> SignalSlot {
        SignalSlot::Announcements
    }

    async fn fetch(&self, identity: &SecurityIdentity) -> anyhow::Result<String> {
        let res = self
            .http
            .get(&self.url)
            .query(&query_params(&identity.code))
            .send()
            .await
            .context("announcement request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read announcement response")?;
        if !status.is_success() {
            anyhow::bail!("announcement HTTP {status}");
        }

        let entries = parse_announcements(&text)?;
        tracing::debug!(code = %identity.code, count = entries.len(), "announcements fetched");
        Ok(bullet_lines(
            entries.iter().map(|(date, title)| format!("{date} {title}")),
        ))
    }
}

fn query_params(code: &str) -> [(&'static str, &str); 6] {
    [
        ("sr", "-1"),
        ("page_size", REQUEST_PAGE_SIZE),
        ("page_index", "1"),
        ("ann_type", "A"),
        ("client_source", "web"),
        ("stock_list", code),
    ]
}

/// `(date, title)` pairs, newest first as served, capped.
pub fn parse_announcements(text: &str) -> anyhow::Result<Vec<(String, String)>> {
    let parsed = serde_json::from_str::<AnnouncementResponse>(text)
        .context("announcement response is not valid JSON")?;
    let list = parsed
        .data
        .map(|d| d.list)
        .context("announcement response missing data")?;

    Ok(list
        .into_iter()
        .filter(|a| !a.title.trim().is_empty())
        .take(MAX_ANNOUNCEMENTS)
        .map(|a| {
            // notice_date is "YYYY-MM-DD HH:MM:SS"; keep the day.
            let date = a.notice_date.trim().chars().take(10).collect::<String>();
            (date, a.title.trim().to_string())
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
struct AnnouncementResponse {
    #[serde(default)]
    data: Option<AnnouncementData>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnnouncementData {
    #[serde(default)]
    list: Vec<Announcement>,
}

#[derive(Debug, Clone, Deserialize)]
struct Announcement {
    #[serde(default)]
    title: String,
    #[serde(default)]
    notice_date: String,
}
