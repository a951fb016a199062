use analise_seguros::{
    config::PipelineConfig,
    pipeline::{self, RunStatus},
    report::ReportOutcome,
};
use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration: optional YAML path, else built-in sources ──
    let cfg = match env::args().nth(1) {
        Some(path) => PipelineConfig::from_yaml_file(&path)?,
        None => PipelineConfig::default(),
    };

    // ─── 3) load → clean → report ────────────────────────────────────
    let report = pipeline::run(&cfg)?;

    let charts = [&report.revenue, &report.profit]
        .into_iter()
        .flatten()
        .filter(|o| matches!(o, ReportOutcome::Rendered { .. }))
        .count();
    match report.status {
        RunStatus::NoData => info!("finished without data"),
        RunStatus::EmptyAfterCleaning => info!("finished; nothing left to chart"),
        RunStatus::Completed => info!(charts, failed_sources = report.failures.len(), "all done"),
    }
    Ok(())
}
