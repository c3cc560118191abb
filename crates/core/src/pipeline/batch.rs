use crate::domain::fragment::BatchResult;
use crate::domain::security::SecurityIdentity;
use crate::pipeline::unit::UnitProcessor;
use std::time::Duration;

/// Runs units one after another in list order, pausing between them.
pub struct BatchOrchestrator {
    processor: UnitProcessor,
    spacing: Duration,
}

impl BatchOrchestrator {
    pub fn new(processor: UnitProcessor, spacing: Duration) -> Self {
        Self { processor, spacing }
    }

    pub async fn run(&self, securities: &[SecurityIdentity]) -> BatchResult {
        let mut batch = BatchResult::new();
        let total = securities.len();
        tracing::info!(run_id = %batch.run_id, total, "batch started");

        for (idx, identity) in securities.iter().enumerate() {
            // Spacing applies after failures too, to keep the upstream request rate bounded.
            if idx != 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }

            tracing::info!(
                run_id = %batch.run_id,
                processed = idx,
                total,
                code = %identity.code,
                "processing unit"
            );
            let fragment = self.processor.process(identity).await;
            batch.push(fragment);
        }

        tracing::info!(
            run_id = %batch.run_id,
            total,
            succeeded = batch.success_count,
            failed = batch.failure_count(),
            "batch finished"
        );
        batch
    }
}
