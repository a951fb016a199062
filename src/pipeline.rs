//! Load → clean → report, in that order, with every stage's problems turned
//! into log lines rather than errors.

use anyhow::Result;
use arrow::{record_batch::RecordBatch, util::pretty::pretty_format_batches};
use tracing::{error, info, instrument, warn};

use crate::{
    clean::{clean, CleanStats, CleanedTable},
    config::PipelineConfig,
    load::{load_sources, ReadOptions, SourceFailure},
    report::{profit_by_region, revenue_by_product, ReportOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing could be loaded; no cleaning, no charts.
    NoData,
    /// Rows were loaded but none survived cleaning.
    EmptyAfterCleaning,
    Completed,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub status: RunStatus,
    pub loaded_rows: usize,
    pub failures: Vec<SourceFailure>,
    pub clean_stats: Option<CleanStats>,
    pub revenue: Option<ReportOutcome>,
    pub profit: Option<ReportOutcome>,
}

/// Load and clean without rendering anything.
///
/// `None` means no source produced rows.
pub fn prepare(cfg: &PipelineConfig) -> Result<(Option<CleanedTable>, Vec<SourceFailure>)> {
    cfg.validate()?;
    let opts = ReadOptions::from_config(cfg)?;

    let loaded = load_sources(&cfg.sources, &opts);
    if loaded.is_empty() {
        error!("no data was loaded; check the source CSV files");
        return Ok((None, loaded.failures));
    }
    info!(columns = ?column_names(&loaded.table), "columns after loading");

    let cleaned = clean(&loaded.table)?;
    info!(columns = ?column_names(&cleaned.table), "columns after cleaning");
    log_preview(&cleaned.table, cfg.preview_rows);

    Ok((Some(cleaned), loaded.failures))
}

#[instrument(level = "info", skip_all, fields(sources = cfg.sources.len()))]
pub fn run(cfg: &PipelineConfig) -> Result<PipelineReport> {
    let (cleaned, failures) = prepare(cfg)?;

    let Some(cleaned) = cleaned else {
        return Ok(PipelineReport {
            status: RunStatus::NoData,
            loaded_rows: 0,
            failures,
            clean_stats: None,
            revenue: None,
            profit: None,
        });
    };

    let mut report = PipelineReport {
        status: RunStatus::EmptyAfterCleaning,
        loaded_rows: cleaned.stats.input_rows,
        failures,
        clean_stats: Some(cleaned.stats.clone()),
        revenue: None,
        profit: None,
    };

    if cleaned.is_empty() {
        warn!("no rows left after cleaning; no charts produced");
        return Ok(report);
    }

    report.revenue = Some(settle(
        "revenue",
        revenue_by_product(&cleaned, &cfg.labels.revenue, &cfg.revenue_chart_path()),
    ));
    report.profit = Some(settle(
        "profit",
        profit_by_region(
            &cleaned,
            &cfg.labels.profit,
            &cfg.profit_chart_path(),
            cfg.open_viewer,
        ),
    ));
    report.status = RunStatus::Completed;

    Ok(report)
}

fn settle(chart: &str, result: Result<ReportOutcome>) -> ReportOutcome {
    result.unwrap_or_else(|e| {
        error!(chart, "could not produce chart: {:#}", e);
        ReportOutcome::Failed {
            reason: format!("{:#}", e),
        }
    })
}

pub fn column_names(table: &RecordBatch) -> Vec<String> {
    table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

fn log_preview(table: &RecordBatch, rows: usize) {
    let head = table.slice(0, rows.min(table.num_rows()));
    match pretty_format_batches(&[head]) {
        Ok(preview) => info!("first rows after cleaning:\n{}", preview),
        Err(e) => warn!("could not format preview: {}", e),
    }
}
