use crate::config::Settings;
use crate::domain::security::SecurityIdentity;
use crate::signal::{bullet_lines, SignalSlot, SignalSource};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};

const SEARCH_URL: &str = "https://s.weibo.com/weibo";
const MAX_SNIPPETS: usize = 8;
const MAX_SNIPPET_CHARS: usize = 140;

const SNIPPET_OPEN: &str = "<p class=\"txt\"";
const SNIPPET_CLOSE: &str = "</p>";

/// Hosts that serve the visitor/login interstitial instead of results.
const CHALLENGE_HOSTS: [&str; 2] = ["passport.weibo.com", "passport.weibo.cn"];
const CHALLENGE_TITLE: &str = "Sina Visitor System";

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Clone)]
pub struct WeiboSearchClient {
    http: reqwest::Client,
    cookie: String,
}

impl WeiboSearchClient {
    pub fn new(settings: &Settings, cookie: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.quote_timeout)
            .build()
            .context("failed to build weibo http client")?;
        Ok(Self {
            http,
            cookie: cookie.to_string(),
        })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&self.cookie)?);
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl SignalSource for WeiboSearchClient {
    fn slot(&self) -> SignalSlot {
        SignalSlot::SocialWeibo
    }

    async fn fetch(&self, identity: &SecurityIdentity) -> anyhow::Result<String> {
        let res = self
            .http
            .get(SEARCH_URL)
            .headers(self.headers()?)
            .query(&[("q", identity.name.as_str())])
            .send()
            .await
            .context("weibo search request failed")?;

        let status = res.status();
        let final_url = res.url().to_string();
        let html = res.text().await.context("failed to read weibo response")?;
        if !status.is_success() {
            anyhow::bail!("weibo search HTTP {status}");
        }

        if is_auth_challenge(&final_url, &html) {
            tracing::info!(code = %identity.code, "weibo returned a login challenge; cookie likely expired");
            return Ok(String::new());
        }

        let snippets = extract_snippets(&html, MAX_SNIPPETS);
        tracing::debug!(code = %identity.code, count = snippets.len(), "weibo snippets extracted");
        Ok(bullet_lines(snippets))
    }
}

/// True when the request landed on the login system, or the body is the visitor interstitial
/// with no search results in it. Links to passport inside a results page do not count.
pub fn is_auth_challenge(final_url: &str, html: &str) -> bool {
    let redirected = reqwest::Url::parse(final_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| CHALLENGE_HOSTS.contains(&host.as_str()));

    redirected || (html.contains(CHALLENGE_TITLE) && !html.contains(SNIPPET_OPEN))
}

/// Text of each `<p class="txt" ...>` block, tags stripped, exact duplicates dropped, then
/// truncated for the prompt.
pub fn extract_snippets(html: &str, limit: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut rest = html;

    while seen.len() < limit {
        let Some(start) = rest.find(SNIPPET_OPEN) else {
            break;
        };
        let after_open = &rest[start + SNIPPET_OPEN.len()..];
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let body = &after_open[tag_end + 1..];
        let Some(close) = body.find(SNIPPET_CLOSE) else {
            break;
        };

        let text = clean_text(&body[..close]);
        rest = &body[close + SNIPPET_CLOSE.len()..];

        if text.is_empty() || seen.contains(&text) {
            continue;
        }
        seen.push(text);
    }

    seen.into_iter()
        .map(|text| text.chars().take(MAX_SNIPPET_CHARS).collect::<String>())
        .collect()
}

fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
