use arrow::datatypes::Schema;
use std::collections::BTreeSet;

use super::columns::CanonicalColumn;

/// Which canonical columns a table carries, computed once after renaming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaPresence {
    present: BTreeSet<CanonicalColumn>,
}

/// Whether the completeness filter can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Partial { missing: Vec<CanonicalColumn> },
}

impl SchemaPresence {
    pub fn of(schema: &Schema) -> Self {
        let present = CanonicalColumn::ALL
            .into_iter()
            .filter(|c| schema.index_of(c.name()).is_ok())
            .collect();
        Self { present }
    }

    pub fn has(&self, column: CanonicalColumn) -> bool {
        self.present.contains(&column)
    }

    /// The subset of `required` that is absent, in the order given.
    pub fn missing(&self, required: &[CanonicalColumn]) -> Vec<CanonicalColumn> {
        required.iter().copied().filter(|c| !self.has(*c)).collect()
    }

    pub fn completeness(&self) -> Completeness {
        let missing = self.missing(&CanonicalColumn::CRITICAL);
        if missing.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Partial { missing }
        }
    }
}
