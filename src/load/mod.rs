//! Multi-source loading: read every configured export, tag rows with their
//! source label and stack them into one table.
//!
//! A source that fails is logged and skipped. If every source fails the result
//! is an empty table with no columns, which callers must check for.

mod concat;
mod error;
mod source;

pub use concat::union_tables;
pub use error::{LoadError, LoadFailureKind};
pub use source::{
    is_na_token, parse_delimited, read_source, tag_with_label, unique_header_names, ReadOptions,
    TextEncoding,
};

use arrow::{datatypes::Schema, record_batch::RecordBatch};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::config::SourceSpec;

/// Column that carries the source label.
pub const COMPANY_COLUMN: &str = "Empresa";

#[derive(Debug)]
pub struct SourceFailure {
    pub label: String,
    pub error: LoadError,
}

#[derive(Debug)]
pub struct LoadOutcome {
    /// Row-wise union of every source that loaded, in source order.
    pub table: RecordBatch,
    /// `(label, rows)` for each source that loaded.
    pub loaded: Vec<(String, usize)>,
    pub failures: Vec<SourceFailure>,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.table.num_rows() == 0
    }
}

pub fn empty_table() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::empty()))
}

/// Load all sources, one after another.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub fn load_sources(sources: &[SourceSpec], opts: &ReadOptions) -> LoadOutcome {
    let mut parts = Vec::with_capacity(sources.len());
    let mut loaded = Vec::with_capacity(sources.len());
    let mut failures = Vec::new();

    for spec in sources {
        match read_source(spec, opts) {
            Ok(batch) => {
                info!(source = %spec.label, path = %spec.path.display(), rows = batch.num_rows(), "loaded source");
                loaded.push((spec.label.clone(), batch.num_rows()));
                parts.push(batch);
            }
            Err(err) => {
                report_failure(&spec.label, &err);
                failures.push(SourceFailure {
                    label: spec.label.clone(),
                    error: err,
                });
            }
        }
    }

    let table = if parts.is_empty() {
        empty_table()
    } else {
        match union_tables(&parts) {
            Ok(t) => t,
            Err(e) => {
                // every part is all-Utf8, so this only trips on a broken invariant
                error!("could not combine loaded sources: {}", e);
                empty_table()
            }
        }
    };

    LoadOutcome {
        table,
        loaded,
        failures,
    }
}

fn report_failure(label: &str, err: &LoadError) {
    let path = err.path().display();
    match err.kind() {
        LoadFailureKind::NotFound => {
            error!(source = %label, path = %path, "file not found");
        }
        LoadFailureKind::Decode => {
            error!(source = %label, path = %path, "encoding error: {}", err);
        }
        LoadFailureKind::Other => {
            error!(source = %label, path = %path, "error loading file: {}", err);
        }
    }
}
