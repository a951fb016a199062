use arrow::{
    array::{Array, ArrayRef, Date32Builder, Float64Builder, StringArray},
    datatypes::{DataType, Date32Type, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Parse a day-first calendar date such as `01/02/2023` (1 February).
///
/// Accepts `/`, `-` and `.` separators, two-digit years, and year-first ISO
/// dates. A trailing time of day is ignored. When the day-first reading is not
/// a real date the month-first reading is tried.
pub fn parse_day_first_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(&[' ', 'T'][..]).next()?;
    let sep = date_part.chars().find(|c| matches!(c, '/' | '-' | '.'))?;

    let parts: Vec<&str> = date_part.split(sep).collect();
    let numeric = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(numeric) {
        return None;
    }
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;

    if parts[0].len() == 4 {
        return NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2]);
    }

    let year = match parts[2].len() {
        2 if nums[2] < 69 => 2000 + nums[2] as i32,
        2 => 1900 + nums[2] as i32,
        4 => nums[2] as i32,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, nums[1], nums[0])
        .or_else(|| NaiveDate::from_ymd_opt(year, nums[0], nums[1]))
}

/// Parse a decimal amount; surrounding whitespace is fine, `NaN`/`inf` are not.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Replace text column `name` with a nullable `Date32` column.
///
/// Returns the new table and how many non-null values failed to parse. Tables
/// without the column, or where it is already typed, pass through.
pub fn coerce_date_column(
    batch: &RecordBatch,
    name: &str,
) -> Result<(RecordBatch, usize), ArrowError> {
    coerce_column(batch, name, DataType::Date32, |sarr| {
        let mut b = Date32Builder::with_capacity(sarr.len());
        let mut failed = 0;
        for opt in sarr.iter() {
            let v = opt.and_then(|s| {
                let d = parse_day_first_date(s);
                if d.is_none() {
                    failed += 1;
                }
                d
            });
            b.append_option(v.map(Date32Type::from_naive_date));
        }
        (Arc::new(b.finish()) as ArrayRef, failed)
    })
}

/// Replace text column `name` with a nullable `Float64` column.
pub fn coerce_amount_column(
    batch: &RecordBatch,
    name: &str,
) -> Result<(RecordBatch, usize), ArrowError> {
    coerce_column(batch, name, DataType::Float64, |sarr| {
        let mut b = Float64Builder::with_capacity(sarr.len());
        let mut failed = 0;
        for opt in sarr.iter() {
            let v = opt.and_then(|s| {
                let n = parse_amount(s);
                if n.is_none() {
                    failed += 1;
                }
                n
            });
            b.append_option(v);
        }
        (Arc::new(b.finish()) as ArrayRef, failed)
    })
}

fn coerce_column<F>(
    batch: &RecordBatch,
    name: &str,
    to: DataType,
    convert: F,
) -> Result<(RecordBatch, usize), ArrowError>
where
    F: FnOnce(&StringArray) -> (ArrayRef, usize),
{
    let schema = batch.schema();
    let Ok(idx) = schema.index_of(name) else {
        return Ok((batch.clone(), 0));
    };
    let Some(sarr) = batch.column(idx).as_any().downcast_ref::<StringArray>() else {
        return Ok((batch.clone(), 0));
    };

    let (converted, failed) = convert(sarr);

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[idx] = Field::new(name, to, true);
    let mut cols = batch.columns().to_vec();
    cols[idx] = converted;

    let out = RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        cols,
    )?;
    Ok((out, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array};

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn dates_are_day_first() {
        assert_eq!(parse_day_first_date("01/02/2023"), ymd(2023, 2, 1));
        assert_eq!(parse_day_first_date(" 31-12-2022 "), ymd(2022, 12, 31));
        assert_eq!(parse_day_first_date("5.6.2021"), ymd(2021, 6, 5));
        assert_eq!(parse_day_first_date("01/02/23"), ymd(2023, 2, 1));
        assert_eq!(parse_day_first_date("01/02/99"), ymd(1999, 2, 1));
    }

    #[test]
    fn iso_dates_and_times_are_accepted() {
        assert_eq!(parse_day_first_date("2023-02-01"), ymd(2023, 2, 1));
        assert_eq!(parse_day_first_date("2023-02-01T10:30:00"), ymd(2023, 2, 1));
        assert_eq!(parse_day_first_date("01/02/2023 08:15"), ymd(2023, 2, 1));
    }

    #[test]
    fn impossible_day_first_falls_back_to_month_first() {
        assert_eq!(parse_day_first_date("12/31/2023"), ymd(2023, 12, 31));
    }

    #[test]
    fn garbage_dates_are_none() {
        for raw in ["", "yesterday", "32/13/2023", "01/02", "1/2/3/4", "aa/bb/cccc", "01/02/202"] {
            assert_eq!(parse_day_first_date(raw), None, "{raw}");
        }
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("100"), Some(100.0));
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount("+3"), Some(3.0));
        assert_eq!(parse_amount("1e3"), Some(1000.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1.234,56"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    fn one_col(name: &str, values: Vec<Option<&str>>) -> RecordBatch {
        let schema = Schema::new(vec![Field::new(name, DataType::Utf8, true)]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(values)) as ArrayRef],
        )
        .unwrap()
    }

    #[test]
    fn amount_column_counts_failures_but_not_nulls() {
        let t = one_col("v", vec![Some("1"), Some("x"), None]);
        let (out, failed) = coerce_amount_column(&t, "v").unwrap();
        assert_eq!(failed, 1);
        assert_eq!(out.schema().field(0).data_type(), &DataType::Float64);
        let arr = out.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(arr.iter().collect::<Vec<_>>(), vec![Some(1.0), None, None]);
    }

    #[test]
    fn date_column_nulls_bad_values() {
        let t = one_col("d", vec![Some("01/02/2023"), Some("soon")]);
        let (out, failed) = coerce_date_column(&t, "d").unwrap();
        assert_eq!(failed, 1);
        let arr = out.column(0).as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(arr.value_as_date(0), ymd(2023, 2, 1));
        assert!(arr.is_null(1));
    }

    #[test]
    fn typed_or_missing_columns_pass_through() {
        let t = one_col("v", vec![Some("1")]);
        let (once, _) = coerce_amount_column(&t, "v").unwrap();
        let (twice, failed) = coerce_amount_column(&once, "v").unwrap();
        assert_eq!(failed, 0);
        assert_eq!(once, twice);

        let (same, _) = coerce_date_column(&t, "absent").unwrap();
        assert_eq!(same, t);
    }
}
