pub mod fences;
pub mod gateway;
pub mod registry;

use crate::error::PipelineError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Gemini,
    DeepSeek,
    Grok,
    Qwen,
}

/// Wire shape of a provider's request/response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{contents:[{parts:[{text}]}]}` → `candidates[0].content.parts[0].text`
    GenerateContent,
    /// `{model, messages, temperature}` → `choices[0].message.content`
    ChatCompletions,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Gemini,
        Provider::DeepSeek,
        Provider::Grok,
        Provider::Qwen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
            Self::Grok => "grok",
            Self::Qwen => "qwen",
        }
    }

    pub fn envelope(self) -> Envelope {
        match self {
            Self::Gemini => Envelope::GenerateContent,
            Self::DeepSeek | Self::Grok | Self::Qwen => Envelope::ChatCompletions,
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::Grok => "GROK_API_KEY",
            Self::Qwen => "QWEN_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown provider: {s}"))
    }
}

/// Turns a rendered prompt into narrative text.
#[async_trait::async_trait]
pub trait NarrativeBackend: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String, PipelineError>;
}
