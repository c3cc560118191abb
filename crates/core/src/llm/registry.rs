use crate::config::Settings;
use crate::llm::{Envelope, Provider};

/// Endpoint and model for one provider, plus the credential to reach it.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Built-in `(base_url, model)` for each provider.
pub fn defaults(provider: Provider) -> (&'static str, &'static str) {
    match provider {
        Provider::Gemini => (
            "https://generativelanguage.googleapis.com/v1beta/models",
            "gemini-1.5-flash",
        ),
        Provider::DeepSeek => ("https://api.deepseek.com/chat/completions", "deepseek-chat"),
        Provider::Grok => ("https://api.x.ai/v1/chat/completions", "grok-beta"),
        Provider::Qwen => (
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions",
            "qwen-plus",
        ),
    }
}

impl ProviderConfig {
    pub fn from_settings(settings: &Settings, provider: Provider) -> anyhow::Result<Self> {
        let api_key = settings.require_api_key(provider)?.to_string();
        let (base_url, model) = defaults(provider);
        Ok(Self {
            provider,
            api_key,
            base_url: settings
                .narrative_base_url
                .clone()
                .unwrap_or_else(|| base_url.to_string()),
            model: settings
                .narrative_model
                .clone()
                .unwrap_or_else(|| model.to_string()),
        })
    }

    /// Full request URL. For generate-content this embeds the credential, so never log it.
    pub fn request_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider.envelope() {
            Envelope::GenerateContent => {
                format!("{base}/{}:generateContent?key={}", self.model, self.api_key)
            }
            Envelope::ChatCompletions => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_url_combines_model_and_key() {
        let settings = Settings {
            gemini_api_key: Some("k123".to_string()),
            ..Default::default()
        };
        let cfg = ProviderConfig::from_settings(&settings, Provider::Gemini).unwrap();
        assert_eq!(
            cfg.request_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=k123"
        );
    }

    #[test]
    fn chat_completions_url_is_the_endpoint() {
        let settings = Settings {
            grok_api_key: Some("g".to_string()),
            ..Default::default()
        };
        let cfg = ProviderConfig::from_settings(&settings, Provider::Grok).unwrap();
        assert_eq!(cfg.request_url(), "https://api.x.ai/v1/chat/completions");
        assert_eq!(cfg.model, "grok-beta");
    }

    #[test]
    fn overrides_replace_model_and_endpoint() {
        let settings = Settings {
            deepseek_api_key: Some("d".to_string()),
            narrative_model: Some("deepseek-reasoner".to_string()),
            narrative_base_url: Some("http://localhost:8080/v1/chat/completions/".to_string()),
            ..Default::default()
        };
        let cfg = ProviderConfig::from_settings(&settings, Provider::DeepSeek).unwrap();
        assert_eq!(cfg.model, "deepseek-reasoner");
        assert_eq!(cfg.request_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn debug_output_hides_the_key() {
        let settings = Settings {
            qwen_api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let cfg = ProviderConfig::from_settings(&settings, Provider::Qwen).unwrap();
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
