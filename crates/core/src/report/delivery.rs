use crate::config::Settings;
use crate::domain::fragment::BatchResult;
use crate::report::{assemble, Report, ReportMeta};
use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::PathBuf;
use std::time::Duration;

const SMTP_TIMEOUT_SECS: u64 = 30;
const SENDER_NAME: &str = "AI 投研助手";
const RECIPIENT_NAME: &str = "投资者";

/// A destination for the finished report.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, report: &Report) -> anyhow::Result<()>;
}

/// Writes the report under a local directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, report: &Report) -> PathBuf {
        self.dir.join(&report.file_name)
    }
}

#[async_trait::async_trait]
impl ReportSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn deliver(&self, report: &Report) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create report dir {}", self.dir.display()))?;
        let path = self.path_for(report);
        tokio::fs::write(&path, report.html.as_bytes())
            .await
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "report saved");
        Ok(())
    }
}

/// Sends the report as an HTML mail to the configured account itself.
pub struct MailSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl MailSink {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (user, pass) = settings.require_mail_credentials()?;
        let address = user
            .parse::<Address>()
            .with_context(|| format!("REPORT_MAIL is not a valid address: {user}"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .with_context(|| format!("invalid SMTP relay {}", settings.smtp_host))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(SENDER_NAME.to_string()), address.clone()),
            to: Mailbox::new(Some(RECIPIENT_NAME.to_string()), address),
        })
    }

    fn message(&self, report: &Report) -> anyhow::Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(report.html.clone())
            .context("failed to build report mail")
    }
}

#[async_trait::async_trait]
impl ReportSink for MailSink {
    fn name(&self) -> &'static str {
        "mail"
    }

    async fn deliver(&self, report: &Report) -> anyhow::Result<()> {
        let message = self.message(report)?;
        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;
        tracing::info!(to = %self.to.email, "report mailed");
        Ok(())
    }
}

#[derive(Debug)]
pub struct SinkFailure {
    pub sink: &'static str,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    /// No unit succeeded; nothing was assembled or sent.
    Skipped,
    Attempted {
        report: Report,
        delivered: Vec<&'static str>,
        failures: Vec<SinkFailure>,
    },
}

/// Assembles and hands the report to every sink, but only when at least one unit succeeded.
/// Sink errors are collected, never propagated.
pub async fn deliver_batch(
    batch: &BatchResult,
    meta: &ReportMeta,
    sinks: &[Box<dyn ReportSink>],
) -> DeliveryOutcome {
    if !batch.is_deliverable() {
        tracing::warn!(
            run_id = %batch.run_id,
            total = batch.fragments.len(),
            "no unit succeeded; delivery skipped"
        );
        return DeliveryOutcome::Skipped;
    }

    let report = assemble(batch, meta);
    let mut delivered = Vec::new();
    let mut failures = Vec::new();

    for sink in sinks {
        match sink.deliver(&report).await {
            Ok(()) => delivered.push(sink.name()),
            Err(error) => {
                tracing::error!(
                    run_id = %batch.run_id,
                    sink = sink.name(),
                    error = %format!("{error:#}"),
                    "report delivery failed"
                );
                failures.push(SinkFailure {
                    sink: sink.name(),
                    error,
                });
            }
        }
    }

    DeliveryOutcome::Attempted {
        report,
        delivered,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fragment::Fragment;
    use crate::domain::security::SecurityIdentity;
    use crate::error::PipelineError;
    use crate::report::tests::meta;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        name: &'static str,
        fail: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ReportSink for RecordingSink {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn deliver(&self, report: &Report) -> anyhow::Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, report.subject));
            if self.fail {
                anyhow::bail!("{} is down", self.name);
            }
            Ok(())
        }
    }

    fn sinks(seen: &Arc<Mutex<Vec<String>>>) -> Vec<Box<dyn ReportSink>> {
        vec![
            Box::new(RecordingSink {
                name: "first",
                fail: true,
                seen: seen.clone(),
            }),
            Box::new(RecordingSink {
                name: "second",
                fail: false,
                seen: seen.clone(),
            }),
        ]
    }

    #[tokio::test]
    async fn skips_when_nothing_succeeded() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut batch = BatchResult::new();
        batch.push(Fragment::failure(
            SecurityIdentity::new("999999", "Beta"),
            &PipelineError::upstream("down"),
        ));

        let outcome = deliver_batch(&batch, &meta(), &sinks(&seen)).await;
        assert!(matches!(outcome, DeliveryOutcome::Skipped));
        assert!(seen.lock().unwrap().is_empty());

        let outcome = deliver_batch(&BatchResult::new(), &meta(), &sinks(&seen)).await;
        assert!(matches!(outcome, DeliveryOutcome::Skipped));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_sink_does_not_block_the_next() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut batch = BatchResult::new();
        batch.push(Fragment::Success {
            identity: SecurityIdentity::new("000001", "Alpha"),
            html: "<p>ok</p>".to_string(),
        });

        let outcome = deliver_batch(&batch, &meta(), &sinks(&seen)).await;
        match outcome {
            DeliveryOutcome::Attempted {
                delivered,
                failures,
                report,
            } => {
                assert_eq!(delivered, vec!["second"]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].sink, "first");
                assert!(report.html.contains("<p>ok</p>"));
            }
            DeliveryOutcome::Skipped => panic!("expected delivery"),
        }
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn file_sink_writes_report() {
        let dir = std::env::temp_dir().join(format!("dailywatch-test-{}", uuid::Uuid::new_v4()));
        let sink = FileSink::new(&dir);
        let report = Report {
            subject: "s".to_string(),
            file_name: "report_2026-01-20.html".to_string(),
            html: "<html>甘李药业</html>".to_string(),
        };

        sink.deliver(&report).await.unwrap();
        let written = tokio::fs::read_to_string(sink.path_for(&report)).await.unwrap();
        assert_eq!(written, report.html);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn mail_sink_requires_credentials() {
        let err = MailSink::from_settings(&Settings::default())
            .err()
            .expect("missing credentials must fail");
        assert!(err.to_string().contains("REPORT_MAIL"));
    }
}
