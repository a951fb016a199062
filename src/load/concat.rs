use arrow::{
    array::{new_null_array, ArrayRef},
    datatypes::{Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Stack tables that may not share a schema.
///
/// Columns come out in first-seen order; a table lacking a column contributes
/// nulls for it. Same-named columns must share a type.
pub fn union_tables(parts: &[RecordBatch]) -> Result<RecordBatch, ArrowError> {
    let mut fields: Vec<Field> = Vec::new();
    for part in parts {
        for f in part.schema().fields() {
            match fields.iter().find(|seen| seen.name() == f.name()) {
                Some(seen) if seen.data_type() != f.data_type() => {
                    return Err(ArrowError::SchemaError(format!(
                        "column `{}` is {} in one source and {} in another",
                        f.name(),
                        seen.data_type(),
                        f.data_type()
                    )));
                }
                Some(_) => {}
                None => fields.push(Field::new(f.name(), f.data_type().clone(), true)),
            }
        }
    }
    let schema = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(parts.len());
    for part in parts {
        let cols: Vec<ArrayRef> = schema
            .fields()
            .iter()
            .map(|f| match part.schema().index_of(f.name()) {
                Ok(i) => part.column(i).clone(),
                Err(_) => new_null_array(f.data_type(), part.num_rows()),
            })
            .collect();
        aligned.push(RecordBatch::try_new(schema.clone(), cols)?);
    }

    arrow::compute::concat_batches(&schema, &aligned)
}
