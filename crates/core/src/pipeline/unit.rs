use crate::domain::fragment::Fragment;
use crate::domain::security::SecurityIdentity;
use crate::error::PipelineError;
use crate::ingest::QuoteSource;
use crate::llm::NarrativeBackend;
use crate::pipeline::prompt::{GenerationRequest, PromptTemplate};
use crate::signal::SignalAggregator;

/// Turns one security into one fragment. Errors never escape `process`.
pub struct UnitProcessor {
    quotes: Box<dyn QuoteSource>,
    signals: SignalAggregator,
    backend: Box<dyn NarrativeBackend>,
    template: PromptTemplate,
}

impl UnitProcessor {
    pub fn new(
        quotes: Box<dyn QuoteSource>,
        signals: SignalAggregator,
        backend: Box<dyn NarrativeBackend>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            quotes,
            signals,
            backend,
            template,
        }
    }

    pub async fn process(&self, identity: &SecurityIdentity) -> Fragment {
        let t0 = std::time::Instant::now();
        match self.narrate(identity).await {
            Ok(html) => {
                tracing::info!(
                    code = %identity.code,
                    name = %identity.name,
                    chars = html.chars().count(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "unit succeeded"
                );
                Fragment::Success {
                    identity: identity.clone(),
                    html,
                }
            }
            Err(err) => {
                tracing::warn!(
                    code = %identity.code,
                    name = %identity.name,
                    kind = %err.kind(),
                    error = %err,
                    elapsed_ms = t0.elapsed().as_millis(),
                    "unit failed"
                );
                Fragment::failure(identity.clone(), &err)
            }
        }
    }

    async fn narrate(&self, identity: &SecurityIdentity) -> Result<String, PipelineError> {
        let snapshot = self.quotes.fetch(identity).await?;
        let signals = self.signals.collect(identity).await;

        let prompt = GenerationRequest {
            identity,
            snapshot,
            signals,
            template: &self.template,
        }
        .render();

        self.backend.invoke(&prompt).await
    }
}
