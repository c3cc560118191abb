pub mod batch;
pub mod prompt;
pub mod unit;

pub use batch::BatchOrchestrator;
pub use prompt::{GenerationRequest, PromptTemplate};
pub use unit::UnitProcessor;

/// In-memory collaborators for exercising the pipeline without a network.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::quote::tests::synthetic_klines;
    use crate::domain::quote::QuoteSnapshot;
    use crate::domain::security::SecurityIdentity;
    use crate::error::PipelineError;
    use crate::ingest::QuoteSource;
    use crate::llm::{NarrativeBackend, Provider};
    use crate::signal::SignalAggregator;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    /// Serves `n` synthetic bars per configured code; unknown codes fail upstream.
    pub(crate) struct FakeQuotes {
        pub bars: BTreeMap<String, usize>,
    }

    #[async_trait::async_trait]
    impl QuoteSource for FakeQuotes {
        async fn fetch(&self, identity: &SecurityIdentity) -> Result<QuoteSnapshot, PipelineError> {
            let n = self
                .bars
                .get(&identity.code)
                .copied()
                .ok_or_else(|| PipelineError::upstream("connection refused"))?;
            QuoteSnapshot::from_klines(&identity.code, &synthetic_klines(n))
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) enum BackendReply {
        /// Wraps the prompt's first line in a paragraph.
        Echo,
        Status(u16),
    }

    pub(crate) struct FakeBackend {
        pub reply: BackendReply,
    }

    #[async_trait::async_trait]
    impl NarrativeBackend for FakeBackend {
        fn provider(&self) -> Provider {
            Provider::DeepSeek
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
            match self.reply {
                BackendReply::Echo => {
                    Ok(format!("<p>{}</p>", prompt.lines().next().unwrap_or_default()))
                }
                BackendReply::Status(status_code) => Err(PipelineError::Backend {
                    status_code,
                    body: "upstream exploded".to_string(),
                }),
            }
        }
    }

    pub(crate) fn processor(bars: BTreeMap<&str, usize>, reply: BackendReply) -> UnitProcessor {
        UnitProcessor::new(
            Box::new(FakeQuotes {
                bars: bars.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            }),
            SignalAggregator::new(None, None, None),
            Box::new(FakeBackend { reply }),
            PromptTemplate {
                report_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            },
        )
    }
}
