pub mod announcements;
pub mod twitter;
pub mod weibo;

use crate::config::Settings;
use crate::domain::security::SecurityIdentity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSlot {
    Announcements,
    SocialWeibo,
    SocialTwitter,
}

impl SignalSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Announcements => "announcements",
            Self::SocialWeibo => "social_weibo",
            Self::SocialTwitter => "social_twitter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Ok,
    /// Source not configured; nothing was requested.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBlock {
    pub text: String,
    pub status: SignalStatus,
}

impl SignalBlock {
    fn skipped() -> Self {
        Self {
            text: String::new(),
            status: SignalStatus::Skipped,
        }
    }

    fn failed() -> Self {
        Self {
            text: String::new(),
            status: SignalStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub announcements: SignalBlock,
    pub social_weibo: SignalBlock,
    pub social_twitter: SignalBlock,
}

impl SignalBundle {
    pub fn empty() -> Self {
        Self {
            announcements: SignalBlock::skipped(),
            social_weibo: SignalBlock::skipped(),
            social_twitter: SignalBlock::skipped(),
        }
    }
}

/// One best-effort source of qualitative context.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    fn slot(&self) -> SignalSlot;

    async fn fetch(&self, identity: &SecurityIdentity) -> anyhow::Result<String>;
}

/// Collects every configured source; never fails.
pub struct SignalAggregator {
    announcements: Option<Box<dyn SignalSource>>,
    weibo: Option<Box<dyn SignalSource>>,
    twitter: Option<Box<dyn SignalSource>>,
}

impl SignalAggregator {
    pub fn new(
        announcements: Option<Box<dyn SignalSource>>,
        weibo: Option<Box<dyn SignalSource>>,
        twitter: Option<Box<dyn SignalSource>>,
    ) -> Self {
        Self {
            announcements,
            weibo,
            twitter,
        }
    }

    /// Social sources are only built when their credential is configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let announcements: Box<dyn SignalSource> =
            Box::new(announcements::AnnouncementClient::from_settings(settings)?);

        let weibo = match settings.weibo_cookie.as_deref() {
            Some(cookie) => Some(Box::new(weibo::WeiboSearchClient::new(settings, cookie)?)
                as Box<dyn SignalSource>),
            None => None,
        };

        let twitter = match settings.twitter_bearer_token.as_deref() {
            Some(token) => Some(Box::new(twitter::TwitterSearchClient::new(settings, token)?)
                as Box<dyn SignalSource>),
            None => None,
        };

        tracing::info!(
            weibo = weibo.is_some(),
            twitter = twitter.is_some(),
            "signal sources configured"
        );

        Ok(Self::new(Some(announcements), weibo, twitter))
    }

    pub async fn collect(&self, identity: &SecurityIdentity) -> SignalBundle {
        SignalBundle {
            announcements: gather(self.announcements.as_deref(), identity).await,
            social_weibo: gather(self.weibo.as_deref(), identity).await,
            social_twitter: gather(self.twitter.as_deref(), identity).await,
        }
    }
}

async fn gather(source: Option<&dyn SignalSource>, identity: &SecurityIdentity) -> SignalBlock {
    let Some(source) = source else {
        return SignalBlock::skipped();
    };

    match source.fetch(identity).await {
        Ok(text) => SignalBlock {
            text,
            status: SignalStatus::Ok,
        },
        Err(err) => {
            tracing::warn!(
                code = %identity.code,
                slot = source.slot().as_str(),
                error = %format!("{err:#}"),
                "signal source failed; continuing without it"
            );
            SignalBlock::failed()
        }
    }
}

/// Bulleted lines, one per entry.
pub(crate) fn bullet_lines<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| format!("- {}", s.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) struct FakeSource {
        pub slot: SignalSlot,
        pub reply: Result<String, String>,
        pub calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl SignalSource for FakeSource {
        fn slot(&self) -> SignalSlot {
            self.slot
        }

        async fn fetch(&self, _identity: &SecurityIdentity) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(anyhow::Error::msg)
        }
    }

    fn identity() -> SecurityIdentity {
        SecurityIdentity::new("603087", "甘李药业")
    }

    #[tokio::test]
    async fn failing_source_degrades_to_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let agg = SignalAggregator::new(
            Some(Box::new(FakeSource {
                slot: SignalSlot::Announcements,
                reply: Err("connection reset".to_string()),
                calls: calls.clone(),
            })),
            Some(Box::new(FakeSource {
                slot: SignalSlot::SocialWeibo,
                reply: Ok("- 讨论很热".to_string()),
                calls: calls.clone(),
            })),
            None,
        );

        let bundle = agg.collect(&identity()).await;
        assert_eq!(bundle.announcements, SignalBlock::failed());
        assert_eq!(bundle.social_weibo.status, SignalStatus::Ok);
        assert_eq!(bundle.social_weibo.text, "- 讨论很热");
        assert_eq!(bundle.social_twitter, SignalBlock::skipped());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn absent_credentials_build_no_social_sources() {
        let settings = Settings::default();
        let agg = SignalAggregator::from_settings(&settings).unwrap();
        assert!(agg.weibo.is_none());
        assert!(agg.twitter.is_none());

        // Nothing is requested for unconfigured slots.
        assert_eq!(
            gather(agg.weibo.as_deref(), &identity()).await,
            SignalBlock::skipped()
        );
        assert_eq!(
            gather(agg.twitter.as_deref(), &identity()).await,
            SignalBlock::skipped()
        );
    }

    #[tokio::test]
    async fn configured_credentials_build_social_sources() {
        let settings = Settings {
            weibo_cookie: Some("SUB=abc".to_string()),
            twitter_bearer_token: Some("token".to_string()),
            ..Default::default()
        };
        let agg = SignalAggregator::from_settings(&settings).unwrap();
        assert_eq!(agg.weibo.as_ref().map(|s| s.slot()), Some(SignalSlot::SocialWeibo));
        assert_eq!(
            agg.twitter.as_ref().map(|s| s.slot()),
            Some(SignalSlot::SocialTwitter)
        );
    }

    #[test]
    fn bullet_lines_prefixes_each_entry() {
        assert_eq!(bullet_lines(["a", "b"]), "- a\n- b");
        assert_eq!(bullet_lines(Vec::<String>::new()), "");
    }
}
