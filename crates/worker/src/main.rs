use clap::Parser;
use dailywatch_core::config::Settings;
use dailywatch_core::ingest::EastmoneyQuoteClient;
use dailywatch_core::llm::gateway::HttpNarrativeGateway;
use dailywatch_core::llm::NarrativeBackend;
use dailywatch_core::pipeline::{BatchOrchestrator, PromptTemplate, UnitProcessor};
use dailywatch_core::report::delivery::{
    deliver_batch, DeliveryOutcome, FileSink, MailSink, ReportSink,
};
use dailywatch_core::report::ReportMeta;
use dailywatch_core::signal::SignalAggregator;
use dailywatch_core::time::cn_market::resolve_report_date;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dailywatch_worker")]
struct Args {
    /// Narrative provider (gemini, deepseek, grok, qwen). Overrides REPORT_PROVIDER.
    #[arg(long)]
    provider: Option<String>,

    /// Securities as "code:name" pairs separated by commas. Overrides REPORT_STOCKS.
    #[arg(long)]
    stocks: Option<String>,

    /// Report date (YYYY-MM-DD). Defaults to today's CST date.
    #[arg(long)]
    report_date: Option<String>,

    /// Write the report file but do not send mail.
    #[arg(long)]
    dry_run: bool,

    /// Directory for the HTML report. Overrides REPORT_OUTPUT_DIR.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut settings = Settings::from_env()?;
    apply_overrides(&mut settings, &args);

    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(err) = run(&args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "daily report run aborted");
        return Err(err);
    }
    Ok(())
}

async fn run(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    let report_date = resolve_report_date(args.report_date.as_deref(), chrono::Utc::now())?;
    let securities = settings.securities();
    if securities.is_empty() {
        tracing::warn!(stocks = %settings.stocks, "no valid securities configured");
    }

    let backend = HttpNarrativeGateway::from_settings(settings)?;
    let meta = ReportMeta {
        report_date,
        provider: backend.provider(),
        model: backend.model().to_string(),
    };

    let processor = UnitProcessor::new(
        Box::new(EastmoneyQuoteClient::from_settings(settings)?),
        SignalAggregator::from_settings(settings)?,
        Box::new(backend),
        PromptTemplate { report_date },
    );
    let orchestrator = BatchOrchestrator::new(processor, settings.unit_spacing);

    tracing::info!(
        %report_date,
        provider = %meta.provider,
        model = %meta.model,
        units = securities.len(),
        dry_run = args.dry_run,
        "daily report run starting"
    );

    let batch = orchestrator.run(&securities).await;
    let sinks = build_sinks(settings, args.dry_run);

    match deliver_batch(&batch, &meta, &sinks).await {
        DeliveryOutcome::Skipped => {
            tracing::warn!(
                run_id = %batch.run_id,
                %report_date,
                failed = batch.failure_count(),
                "no report produced"
            );
        }
        DeliveryOutcome::Attempted {
            report,
            delivered,
            failures,
        } => {
            for failure in &failures {
                sentry_anyhow::capture_anyhow(&failure.error);
            }
            tracing::info!(
                run_id = %batch.run_id,
                subject = %report.subject,
                succeeded = batch.success_count,
                failed = batch.failure_count(),
                ?delivered,
                sink_failures = failures.len(),
                "daily report run finished"
            );
        }
    }

    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(provider) = &args.provider {
        settings.provider = provider.clone();
    }
    if let Some(stocks) = &args.stocks {
        settings.stocks = stocks.clone();
    }
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
}

fn build_sinks(settings: &Settings, dry_run: bool) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(FileSink::new(&settings.output_dir))];

    if dry_run {
        tracing::info!("dry-run: mail delivery disabled");
        return sinks;
    }

    match MailSink::from_settings(settings) {
        Ok(mail) => sinks.push(Box::new(mail)),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "mail delivery disabled");
        }
    }
    sinks
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
