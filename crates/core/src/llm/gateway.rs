use crate::config::Settings;
use crate::error::PipelineError;
use crate::ingest::provider::truncate;
use crate::llm::fences::strip_code_fences;
use crate::llm::registry::ProviderConfig;
use crate::llm::{Envelope, NarrativeBackend, Provider};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

const CHAT_TEMPERATURE: f64 = 0.7;
const ERROR_BODY_MAX_CHARS: usize = 500;

/// HTTP narrative backend; the envelope is fixed by the provider at construction.
#[derive(Debug, Clone)]
pub struct HttpNarrativeGateway {
    http: reqwest::Client,
    config: ProviderConfig,
    envelope: Envelope,
}

impl HttpNarrativeGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let provider = settings.require_provider()?;
        let config = ProviderConfig::from_settings(settings, provider)?;

        let http = reqwest::Client::builder()
            .timeout(settings.narrative_timeout)
            .build()
            .context("failed to build narrative http client")?;

        tracing::info!(
            %provider,
            model = %config.model,
            timeout = ?settings.narrative_timeout,
            "narrative backend configured"
        );

        Ok(Self {
            http,
            envelope: provider.envelope(),
            config,
        })
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let url = self.config.request_url();
        match self.envelope {
            Envelope::GenerateContent => self.http.post(url).json(&GenerateContentRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            }),
            Envelope::ChatCompletions => self
                .http
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&ChatRequest {
                    model: &self.config.model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: CHAT_TEMPERATURE,
                }),
        }
    }
}

#[async_trait::async_trait]
impl NarrativeBackend for HttpNarrativeGateway {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
        let t0 = std::time::Instant::now();
        // reqwest errors can carry the URL, which holds the key for generate-content.
        let res = self.request(prompt).send().await.map_err(|e| {
            PipelineError::upstream(format!(
                "{} request failed: {}",
                self.config.provider,
                e.without_url()
            ))
        })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            PipelineError::upstream(format!(
                "failed to read {} response: {}",
                self.config.provider,
                e.without_url()
            ))
        })?;

        tracing::debug!(
            provider = %self.config.provider,
            http_status = %status,
            elapsed_ms = t0.elapsed().as_millis(),
            "narrative backend responded"
        );

        classify_response(self.envelope, status.as_u16(), &text)
    }
}

/// Maps a raw backend reply to narrative text or a typed failure.
pub fn classify_response(
    envelope: Envelope,
    status_code: u16,
    body: &str,
) -> Result<String, PipelineError> {
    if !(200..300).contains(&status_code) {
        return Err(PipelineError::Backend {
            status_code,
            body: truncate(body, ERROR_BODY_MAX_CHARS),
        });
    }

    let json = serde_json::from_str::<Value>(body).map_err(|e| {
        PipelineError::BackendProtocol(format!("response is not valid JSON: {e}"))
    })?;

    extract_content(envelope, &json)
        .map(strip_code_fences)
        .ok_or_else(|| {
            PipelineError::BackendProtocol(format!(
                "missing {}: {}",
                content_path(envelope),
                truncate(&json.to_string(), ERROR_BODY_MAX_CHARS)
            ))
        })
}

fn content_path(envelope: Envelope) -> &'static str {
    match envelope {
        Envelope::GenerateContent => "/candidates/0/content/parts/0/text",
        Envelope::ChatCompletions => "/choices/0/message/content",
    }
}

fn extract_content(envelope: Envelope, json: &Value) -> Option<&str> {
    json.pointer(content_path(envelope)).and_then(Value::as_str)
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}
