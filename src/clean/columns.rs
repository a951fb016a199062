use arrow::{
    datatypes::{Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::load::COMPANY_COLUMN;

/// The unified column vocabulary every source is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalColumn {
    Company,
    ContractValue,
    Product,
    ContractDate,
    Profit,
    Region,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 6] = [
        CanonicalColumn::Company,
        CanonicalColumn::ContractValue,
        CanonicalColumn::Product,
        CanonicalColumn::ContractDate,
        CanonicalColumn::Profit,
        CanonicalColumn::Region,
    ];

    /// Columns a row cannot do without.
    pub const CRITICAL: [CanonicalColumn; 3] = [
        CanonicalColumn::ContractValue,
        CanonicalColumn::Product,
        CanonicalColumn::Company,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::Company => COMPANY_COLUMN,
            CanonicalColumn::ContractValue => "Valor Contrato",
            CanonicalColumn::Product => "Produto",
            CanonicalColumn::ContractDate => "Data Contrato",
            CanonicalColumn::Profit => "Lucro",
            CanonicalColumn::Region => "Região",
        }
    }

    /// Header used by the provider exports, if the column comes from the file.
    pub fn raw_name(self) -> Option<&'static str> {
        match self {
            CanonicalColumn::Company => None,
            CanonicalColumn::ContractValue => Some("Premium"),
            CanonicalColumn::Product => Some("Product"),
            CanonicalColumn::ContractDate => Some("Policy Date"),
            CanonicalColumn::Profit => Some("Profit"),
            CanonicalColumn::Region => Some("Region"),
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    CanonicalColumn::ALL
        .iter()
        .filter_map(|c| c.raw_name().map(|raw| (raw, c.name())))
        .collect()
});

/// Canonical name for a raw header; unknown headers map to themselves.
pub fn canonical_name(raw: &str) -> &str {
    RENAMES.get(raw).copied().unwrap_or(raw)
}

/// Rename known raw headers to their canonical names, leaving data untouched.
pub fn rename_columns(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_name(canonical_name(f.name())))
        .collect();
    let renamed = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(renamed), batch.columns().to_vec())
}
