pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod signal;
pub mod time;

pub mod config {
    use crate::domain::security::{parse_security_list, SecurityIdentity};
    use crate::ingest::retry::RetryPolicy;
    use crate::llm::Provider;
    use anyhow::Context;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_PROVIDER: &str = "deepseek";
    const DEFAULT_STOCKS: &str = "603087:甘李药业";
    const DEFAULT_PROFILE_CODE: &str = "603087";
    const DEFAULT_PROFILE: &str =
        "当前标的为甘李药业，属于A股医药板块，核心产品包括胰岛素等糖尿病用药。";
    const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 300;
    const DEFAULT_QUOTE_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_QUOTE_RETRY_ATTEMPTS: u32 = 3;
    const DEFAULT_QUOTE_RETRY_DELAY_MS: u64 = 1500;
    const DEFAULT_UNIT_SPACING_MS: u64 = 2000;
    const DEFAULT_SMTP_HOST: &str = "smtp.qq.com";
    const DEFAULT_SMTP_PORT: u16 = 465;

    const PROFILE_ENV_PREFIX: &str = "REPORT_COMPANY_PROFILE_";

    /// Process-wide configuration, read once at startup and passed by reference.
    #[derive(Clone)]
    pub struct Settings {
        pub provider: String,
        pub gemini_api_key: Option<String>,
        pub deepseek_api_key: Option<String>,
        pub grok_api_key: Option<String>,
        pub qwen_api_key: Option<String>,
        pub narrative_model: Option<String>,
        pub narrative_base_url: Option<String>,
        pub narrative_timeout: Duration,

        pub stocks: String,
        pub company_profiles: BTreeMap<String, String>,

        pub quote_timeout: Duration,
        pub quote_retry: RetryPolicy,
        pub unit_spacing: Duration,

        pub weibo_cookie: Option<String>,
        pub twitter_bearer_token: Option<String>,

        pub mail_user: Option<String>,
        pub mail_pass: Option<String>,
        pub smtp_host: String,
        pub smtp_port: u16,
        pub output_dir: PathBuf,

        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let mut company_profiles = default_profiles();
            company_profiles.extend(std::env::vars().filter_map(|(k, v)| {
                let code = k.strip_prefix(PROFILE_ENV_PREFIX)?;
                let v = v.trim();
                (!code.is_empty() && !v.is_empty()).then(|| (code.to_string(), v.to_string()))
            }));

            Ok(Self {
                provider: env_non_empty("REPORT_PROVIDER")
                    .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
                gemini_api_key: env_non_empty("GEMINI_API_KEY"),
                deepseek_api_key: env_non_empty("DEEPSEEK_API_KEY"),
                grok_api_key: env_non_empty("GROK_API_KEY"),
                qwen_api_key: env_non_empty("QWEN_API_KEY"),
                narrative_model: env_non_empty("NARRATIVE_MODEL"),
                narrative_base_url: env_non_empty("NARRATIVE_BASE_URL"),
                narrative_timeout: Duration::from_secs(
                    env_parse("NARRATIVE_TIMEOUT_SECS").unwrap_or(DEFAULT_NARRATIVE_TIMEOUT_SECS),
                ),
                stocks: env_non_empty("REPORT_STOCKS").unwrap_or_else(|| DEFAULT_STOCKS.to_string()),
                company_profiles,
                quote_timeout: Duration::from_secs(
                    env_parse("QUOTE_TIMEOUT_SECS").unwrap_or(DEFAULT_QUOTE_TIMEOUT_SECS),
                ),
                quote_retry: RetryPolicy::fixed(
                    env_parse("QUOTE_RETRY_ATTEMPTS").unwrap_or(DEFAULT_QUOTE_RETRY_ATTEMPTS),
                    Duration::from_millis(
                        env_parse("QUOTE_RETRY_DELAY_MS").unwrap_or(DEFAULT_QUOTE_RETRY_DELAY_MS),
                    ),
                ),
                unit_spacing: Duration::from_millis(
                    env_parse("UNIT_SPACING_MS").unwrap_or(DEFAULT_UNIT_SPACING_MS),
                ),
                weibo_cookie: env_non_empty("WEIBO_COOKIE"),
                twitter_bearer_token: env_non_empty("TWITTER_BEARER_TOKEN"),
                mail_user: env_non_empty("REPORT_MAIL"),
                mail_pass: env_non_empty("REPORT_MAIL_PASS"),
                smtp_host: env_non_empty("REPORT_SMTP_HOST")
                    .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: env_parse("REPORT_SMTP_PORT").unwrap_or(DEFAULT_SMTP_PORT),
                output_dir: env_non_empty("REPORT_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                sentry_dsn: env_non_empty("SENTRY_DSN"),
            })
        }

        pub fn require_provider(&self) -> anyhow::Result<Provider> {
            self.provider
                .parse::<Provider>()
                .with_context(|| format!("REPORT_PROVIDER is not a known provider: {}", self.provider))
        }

        /// Credential for a provider, or an error naming the variable that must be set.
        pub fn require_api_key(&self, provider: Provider) -> anyhow::Result<&str> {
            let key = match provider {
                Provider::Gemini => self.gemini_api_key.as_deref(),
                Provider::DeepSeek => self.deepseek_api_key.as_deref(),
                Provider::Grok => self.grok_api_key.as_deref(),
                Provider::Qwen => self.qwen_api_key.as_deref(),
            };
            key.with_context(|| format!("{} is required", provider.api_key_env()))
        }

        pub fn require_mail_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let user = self.mail_user.as_deref().context("REPORT_MAIL is required")?;
            let pass = self
                .mail_pass
                .as_deref()
                .context("REPORT_MAIL_PASS is required")?;
            Ok((user, pass))
        }

        /// Ordered security list. Malformed entries are skipped with a warning.
        pub fn securities(&self) -> Vec<SecurityIdentity> {
            parse_security_list(&self.stocks)
                .into_iter()
                .map(|identity| match self.company_profiles.get(&identity.code) {
                    Some(profile) => identity.with_profile(profile.clone()),
                    None => identity,
                })
                .collect()
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                provider: DEFAULT_PROVIDER.to_string(),
                gemini_api_key: None,
                deepseek_api_key: None,
                grok_api_key: None,
                qwen_api_key: None,
                narrative_model: None,
                narrative_base_url: None,
                narrative_timeout: Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS),
                stocks: DEFAULT_STOCKS.to_string(),
                company_profiles: default_profiles(),
                quote_timeout: Duration::from_secs(DEFAULT_QUOTE_TIMEOUT_SECS),
                quote_retry: RetryPolicy::fixed(
                    DEFAULT_QUOTE_RETRY_ATTEMPTS,
                    Duration::from_millis(DEFAULT_QUOTE_RETRY_DELAY_MS),
                ),
                unit_spacing: Duration::from_millis(DEFAULT_UNIT_SPACING_MS),
                weibo_cookie: None,
                twitter_bearer_token: None,
                mail_user: None,
                mail_pass: None,
                smtp_host: DEFAULT_SMTP_HOST.to_string(),
                smtp_port: DEFAULT_SMTP_PORT,
                output_dir: PathBuf::from("."),
                sentry_dsn: None,
            }
        }
    }

    impl std::fmt::Debug for Settings {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            fn secret(v: &Option<String>) -> &'static str {
                if v.is_some() {
                    "<redacted>"
                } else {
                    "<unset>"
                }
            }

            f.debug_struct("Settings")
                .field("provider", &self.provider)
                .field("gemini_api_key", &secret(&self.gemini_api_key))
                .field("deepseek_api_key", &secret(&self.deepseek_api_key))
                .field("grok_api_key", &secret(&self.grok_api_key))
                .field("qwen_api_key", &secret(&self.qwen_api_key))
                .field("narrative_model", &self.narrative_model)
                .field("narrative_base_url", &self.narrative_base_url)
                .field("narrative_timeout", &self.narrative_timeout)
                .field("stocks", &self.stocks)
                .field("company_profiles", &self.company_profiles)
                .field("quote_timeout", &self.quote_timeout)
                .field("quote_retry", &self.quote_retry)
                .field("unit_spacing", &self.unit_spacing)
                .field("weibo_cookie", &secret(&self.weibo_cookie))
                .field("twitter_bearer_token", &secret(&self.twitter_bearer_token))
                .field("mail_user", &self.mail_user)
                .field("mail_pass", &secret(&self.mail_pass))
                .field("smtp_host", &self.smtp_host)
                .field("smtp_port", &self.smtp_port)
                .field("output_dir", &self.output_dir)
                .field("sentry_dsn", &secret(&self.sentry_dsn))
                .finish()
        }
    }

    /// Profile of the default security; env entries override it.
    fn default_profiles() -> BTreeMap<String, String> {
        BTreeMap::from([(DEFAULT_PROFILE_CODE.to_string(), DEFAULT_PROFILE.to_string())])
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        env_non_empty(key).and_then(|s| s.parse::<T>().ok())
    }

}
