//! Normalization of the combined table.
//!
//! Order matters: rename, check critical columns, drop duplicates, coerce
//! dates and amounts, then drop incomplete rows. Each step after renaming is
//! skipped when the column it needs is absent. A last duplicate pass over the
//! typed table keeps the output free of duplicates, so cleaning is idempotent.

mod coerce;
mod columns;
mod dedup;
mod presence;

pub use coerce::{coerce_amount_column, coerce_date_column, parse_amount, parse_day_first_date};
pub use columns::{canonical_name, rename_columns, CanonicalColumn};
pub use dedup::drop_duplicates;
pub use presence::{Completeness, SchemaPresence};

use anyhow::{Context, Result};
use arrow::{
    compute::{and, filter_record_batch, is_not_null},
    record_batch::RecordBatch,
};
use tracing::{error, info, instrument, warn};

/// What cleaning did, for the run log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub invalid_dates: usize,
    pub invalid_amounts: usize,
    pub invalid_profits: usize,
    pub incomplete_removed: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub table: RecordBatch,
    pub presence: SchemaPresence,
    pub stats: CleanStats,
}

impl CleanedTable {
    pub fn is_empty(&self) -> bool {
        self.table.num_rows() == 0
    }

    pub fn completeness(&self) -> Completeness {
        self.presence.completeness()
    }
}

#[instrument(level = "info", skip_all, fields(rows = table.num_rows()))]
pub fn clean(table: &RecordBatch) -> Result<CleanedTable> {
    let mut stats = CleanStats {
        input_rows: table.num_rows(),
        ..Default::default()
    };

    let renamed = rename_columns(table).context("renaming columns")?;
    let presence = SchemaPresence::of(&renamed.schema());

    for missing in presence.missing(&CanonicalColumn::CRITICAL) {
        warn!(column = %missing, "critical column not found in the data");
    }

    let (deduped, removed) = drop_duplicates(&renamed).context("dropping duplicate rows")?;
    stats.duplicates_removed = removed;

    let (dated, bad) = coerce_date_column(&deduped, CanonicalColumn::ContractDate.name())
        .context("parsing contract dates")?;
    stats.invalid_dates = bad;

    let (valued, bad) = coerce_amount_column(&dated, CanonicalColumn::ContractValue.name())
        .context("parsing contract values")?;
    stats.invalid_amounts = bad;

    let (profited, bad) = coerce_amount_column(&valued, CanonicalColumn::Profit.name())
        .context("parsing profits")?;
    stats.invalid_profits = bad;

    let out = match presence.completeness() {
        Completeness::Complete => {
            let kept = drop_incomplete(&profited)?;
            stats.incomplete_removed = profited.num_rows() - kept.num_rows();
            kept
        }
        Completeness::Partial { missing } => {
            let names: Vec<&str> = missing.iter().map(|c| c.name()).collect();
            error!(missing = ?names, "critical columns are missing; data cannot be processed");
            profited
        }
    };

    // values that only differed in spelling ("10" vs "10.0") are equal now
    let (out, removed) = drop_duplicates(&out).context("dropping duplicate typed rows")?;
    stats.duplicates_removed += removed;
    stats.output_rows = out.num_rows();

    info!(
        duplicates = stats.duplicates_removed,
        invalid_dates = stats.invalid_dates,
        invalid_amounts = stats.invalid_amounts,
        incomplete = stats.incomplete_removed,
        rows = stats.output_rows,
        "cleaned"
    );

    Ok(CleanedTable {
        table: out,
        presence,
        stats,
    })
}

/// Keep rows where every critical column is non-null. All must be present.
fn drop_incomplete(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut mask = None;
    for col in CanonicalColumn::CRITICAL {
        let idx = schema
            .index_of(col.name())
            .with_context(|| format!("column `{}` vanished", col))?;
        let present = is_not_null(batch.column(idx).as_ref())?;
        mask = Some(match mask {
            None => present,
            Some(acc) => and(&acc, &present)?,
        });
    }

    match mask {
        Some(m) => Ok(filter_record_batch(batch, &m)?),
        None => Ok(batch.clone()),
    }
}
