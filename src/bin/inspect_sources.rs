//! Load and clean the configured sources, then print what came out.
//! Renders no charts.
//!
//! Usage: inspect_sources [CONFIG.yaml]

use analise_seguros::{
    clean::{CanonicalColumn, Completeness},
    config::PipelineConfig,
    pipeline::{self, column_names},
};
use anyhow::Result;
use arrow::util::pretty::pretty_format_batches;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cfg = match env::args().nth(1) {
        Some(path) => PipelineConfig::from_yaml_file(&path)?,
        None => PipelineConfig::default(),
    };

    let (cleaned, failures) = pipeline::prepare(&cfg)?;
    for f in &failures {
        println!("✘ {:<12} {}", f.label, f.error);
    }

    let Some(cleaned) = cleaned else {
        println!("no data loaded");
        return Ok(());
    };

    println!("columns: {}", column_names(&cleaned.table).join(", "));
    for col in CanonicalColumn::ALL {
        let mark = if cleaned.presence.has(col) { "✔" } else { "·" };
        println!("  {} {}", mark, col);
    }
    match cleaned.completeness() {
        Completeness::Complete => println!("critical columns: complete"),
        Completeness::Partial { missing } => {
            let names: Vec<&str> = missing.iter().map(|c| c.name()).collect();
            println!("critical columns missing: {}", names.join(", "));
        }
    }

    let s = &cleaned.stats;
    println!(
        "rows: {} in → {} out ({} duplicate, {} incomplete; {} bad dates, {} bad amounts, {} bad profits)",
        s.input_rows,
        s.output_rows,
        s.duplicates_removed,
        s.incomplete_removed,
        s.invalid_dates,
        s.invalid_amounts,
        s.invalid_profits
    );

    let head = cleaned
        .table
        .slice(0, cfg.preview_rows.min(cleaned.table.num_rows()));
    println!("{}", pretty_format_batches(&[head])?);
    Ok(())
}
