use arrow::{
    array::BooleanArray,
    compute::filter_record_batch,
    error::ArrowError,
    record_batch::RecordBatch,
    row::{RowConverter, SortField},
};
use std::collections::HashSet;

/// Drop rows equal to an earlier row in every column. Nulls compare equal.
///
/// Returns the filtered table and how many rows were removed.
pub fn drop_duplicates(batch: &RecordBatch) -> Result<(RecordBatch, usize), ArrowError> {
    if batch.num_columns() == 0 || batch.num_rows() < 2 {
        return Ok((batch.clone(), 0));
    }

    let converter = RowConverter::new(
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| SortField::new(f.data_type().clone()))
            .collect(),
    )?;
    let rows = converter.convert_columns(batch.columns())?;

    let mut seen = HashSet::with_capacity(batch.num_rows());
    let keep: BooleanArray = rows.iter().map(|row| Some(seen.insert(row))).collect();
    let removed = batch.num_rows() - seen.len();
    if removed == 0 {
        return Ok((batch.clone(), 0));
    }

    Ok((filter_record_batch(batch, &keep)?, removed))
}
