//! Aggregate the cleaned table and render the two charts.
//!
//! Each reporter checks its own columns first; when they are missing it logs
//! the fact and returns [`ReportOutcome::Skipped`] instead of failing.

pub mod profit;
pub mod revenue;

pub use profit::profit_by_region;
pub use revenue::revenue_by_product;

use anyhow::{anyhow, Result};
use arrow::{
    array::{Float64Array, StringArray},
    record_batch::RecordBatch,
};
use std::{collections::BTreeMap, collections::BTreeSet, path::PathBuf};

use crate::clean::CanonicalColumn;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Rendered { path: PathBuf, groups: usize },
    Skipped { missing: Vec<CanonicalColumn> },
    /// Aggregation or rendering failed; the run carries on without this chart.
    Failed { reason: String },
}

impl ReportOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ReportOutcome::Rendered { .. })
    }
}

/// Sums of a value column keyed by (category, series), both sorted.
///
/// Categories go on the horizontal axis, series become bar colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSums {
    pub categories: Vec<String>,
    pub series: Vec<String>,
    values: BTreeMap<(String, String), f64>,
}

impl GroupedSums {
    pub fn get(&self, category: &str, series: &str) -> Option<f64> {
        self.values
            .get(&(category.to_string(), series.to_string()))
            .copied()
    }

    /// Number of non-empty (category, series) groups.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest and largest group sum, with zero always inside the range.
    pub fn value_range(&self) -> (f64, f64) {
        self.values
            .values()
            .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
    }

    /// Values of one series laid out along `categories`; `None` where the
    /// series has no rows for that category.
    pub fn series_values(&self, series: &str) -> Vec<Option<f64>> {
        self.categories
            .iter()
            .map(|c| self.get(c, series))
            .collect()
    }
}

/// Group `batch` by (`category`, `series`) and sum `value`.
///
/// Rows with a null key are left out; null values count as zero, so a group
/// exists as soon as one of its rows has both keys.
pub fn sum_by(
    batch: &RecordBatch,
    category: CanonicalColumn,
    series: CanonicalColumn,
    value: CanonicalColumn,
) -> Result<GroupedSums> {
    let cats = string_column(batch, category)?;
    let sers = string_column(batch, series)?;
    let vals = float_column(batch, value)?;

    let mut values: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut categories = BTreeSet::new();
    let mut series_names = BTreeSet::new();

    for ((c, s), v) in cats.iter().zip(sers.iter()).zip(vals.iter()) {
        let (Some(c), Some(s)) = (c, s) else {
            continue;
        };
        categories.insert(c.to_string());
        series_names.insert(s.to_string());
        *values.entry((c.to_string(), s.to_string())).or_insert(0.0) += v.unwrap_or(0.0);
    }

    Ok(GroupedSums {
        categories: categories.into_iter().collect(),
        series: series_names.into_iter().collect(),
        values,
    })
}

fn string_column(batch: &RecordBatch, column: CanonicalColumn) -> Result<&StringArray> {
    let idx = batch.schema().index_of(column.name())?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column `{}` is not text", column))
}

fn float_column(batch: &RecordBatch, column: CanonicalColumn) -> Result<&Float64Array> {
    let idx = batch.schema().index_of(column.name())?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow!("column `{}` is not numeric", column))
}
