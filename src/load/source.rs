use arrow::{
    array::{ArrayRef, StringArray},
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use encoding_rs::{mem::decode_latin1, Encoding, WINDOWS_1252};
use std::{borrow::Cow, collections::HashSet, fs, io::Cursor, sync::Arc};
use tracing::debug;

use super::{LoadError, COMPANY_COLUMN};
use crate::config::{resolve_encoding, PipelineConfig, SourceSpec};

/// WHATWG labels for ISO-8859-1. `encoding_rs` maps them to windows-1252,
/// which would turn bytes 0x80..=0x9F into `€`, `‚` and friends.
const LATIN1_LABELS: [&str; 11] = [
    "latin1",
    "l1",
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "csisolatin1",
    "ibm819",
    "cp819",
];

/// Cell values read as missing: the usual dataframe NA markers.
const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Character encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    Whatwg(&'static Encoding),
}

impl TextEncoding {
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            return Some(TextEncoding::Latin1);
        }
        Encoding::for_label(label.as_bytes()).map(TextEncoding::Whatwg)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Whatwg(enc) => enc.name(),
        }
    }

    /// Decode `bytes`, letting a byte-order mark override the encoding.
    ///
    /// Returns the text, the encoding actually used, and whether malformed
    /// sequences were replaced.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> (Cow<'a, str>, &'static str, bool) {
        let enc = match *self {
            TextEncoding::Latin1 if Encoding::for_bom(bytes).is_none() => {
                return (decode_latin1(bytes), self.name(), false);
            }
            TextEncoding::Latin1 => WINDOWS_1252,
            TextEncoding::Whatwg(enc) => enc,
        };
        let (text, used, had_errors) = enc.decode(bytes);
        (text, used.name(), had_errors)
    }
}

/// How source files are decoded and split into fields.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: u8,
    /// Used for every source that does not name its own encoding.
    pub encoding: TextEncoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: TextEncoding::Latin1,
        }
    }
}

impl ReadOptions {
    pub fn from_config(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            delimiter: cfg.delimiter_byte()?,
            encoding: resolve_encoding(&cfg.encoding)?,
        })
    }

    /// The encoding that applies to `spec`.
    pub fn encoding_for(&self, spec: &SourceSpec) -> Result<TextEncoding, LoadError> {
        match &spec.encoding {
            Some(label) => resolve_encoding(label).map_err(|_| LoadError::UnknownEncoding {
                path: spec.path.clone(),
                label: label.clone(),
            }),
            None => Ok(self.encoding),
        }
    }
}

/// Read one source into a table of nullable text columns, tagged with its label.
pub fn read_source(spec: &SourceSpec, opts: &ReadOptions) -> Result<RecordBatch, LoadError> {
    let path = spec.path.clone();
    let encoding = opts.encoding_for(spec)?;

    // the handle lives only for the duration of this read
    let bytes = fs::read(&path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound { path: path.clone() },
        _ => LoadError::Io {
            path: path.clone(),
            source,
        },
    })?;

    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(LoadError::Decode {
            path,
            encoding: used,
        });
    }
    debug!(path = %path.display(), encoding = used, bytes = bytes.len(), "decoded");

    let batch = parse_delimited(&text, opts.delimiter)
        .map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?
        .ok_or_else(|| LoadError::NoColumns { path: path.clone() })?;

    tag_with_label(&batch, &spec.label).map_err(|source| LoadError::Parse { path, source })
}

/// Parse delimited text with a header line into Utf8 columns.
///
/// Returns `None` when there is no header at all. Short rows are padded with
/// nulls and long rows are an error. Empty cells and NA tokens (`NA`, `N/A`,
/// `NULL`, `nan`, ...) are null.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Option<RecordBatch>, ArrowError> {
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (inferred, _) = format.infer_schema(Cursor::new(text.as_bytes()), Some(0))?;
    if inferred.fields().is_empty() {
        return Ok(None);
    }

    let raw_names: Vec<&str> = inferred.fields().iter().map(|f| f.name().as_str()).collect();
    let fields: Vec<Field> = unique_header_names(&raw_names)
        .into_iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(delimiter)
        .with_truncated_rows(true)
        .build(Cursor::new(text.as_bytes()))?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let batch = arrow::compute::concat_batches(&schema, &batches)?;

    missing_cells_to_null(&batch).map(Some)
}

/// Blank header cells become `Unnamed: <i>`, repeats get `.1`, `.2`, ...
pub fn unique_header_names(raw: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());

    for (i, name) in raw.iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

pub fn is_na_token(cell: &str) -> bool {
    NA_TOKENS.iter().any(|t| *t == cell)
}

fn missing_cells_to_null(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for arr in batch.columns() {
        match arr.as_any().downcast_ref::<StringArray>() {
            Some(sarr) => {
                let cleaned: StringArray = sarr
                    .iter()
                    .map(|opt| opt.filter(|s| !is_na_token(s)))
                    .collect();
                cols.push(Arc::new(cleaned) as ArrayRef);
            }
            None => cols.push(arr.clone()),
        }
    }
    RecordBatch::try_new(batch.schema(), cols)
}

/// Set `Empresa` to `label` on every row, replacing any column of that name.
pub fn tag_with_label(batch: &RecordBatch, label: &str) -> Result<RecordBatch, ArrowError> {
    let labels: ArrayRef = Arc::new(StringArray::from(vec![label; batch.num_rows()]));

    let mut fields = Vec::with_capacity(batch.num_columns() + 1);
    let mut cols = Vec::with_capacity(batch.num_columns() + 1);
    let mut replaced = false;
    for (field, arr) in batch.schema().fields().iter().zip(batch.columns()) {
        if field.name() == COMPANY_COLUMN {
            fields.push(Field::new(COMPANY_COLUMN, DataType::Utf8, true));
            cols.push(labels.clone());
            replaced = true;
        } else {
            fields.push(field.as_ref().clone());
            cols.push(arr.clone());
        }
    }
    if !replaced {
        fields.push(Field::new(COMPANY_COLUMN, DataType::Utf8, true));
        cols.push(labels);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn column_values(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn parses_semicolon_text_as_nullable_strings() {
        let text = "Premium;Product;Region\n100;Car;North\n;Home;\n250;Life\n";
        let batch = parse_delimited(text, b';').unwrap().unwrap();

        assert_eq!(batch.num_rows(), 3);
        assert!(batch
            .schema()
            .fields()
            .iter()
            .all(|f| f.data_type() == &DataType::Utf8));
        assert_eq!(
            column_values(&batch, "Premium"),
            vec![Some("100".into()), None, Some("250".into())]
        );
        // short row padded
        assert_eq!(
            column_values(&batch, "Region"),
            vec![Some("North".into()), None, None]
        );
    }

    #[test]
    fn rows_longer_than_header_fail_the_source() {
        let text = "A;B\n1;2;3\n";
        assert!(parse_delimited(text, b';').is_err());
    }

    #[test]
    fn empty_text_has_no_columns() {
        assert!(parse_delimited("", b';').unwrap().is_none());
    }

    #[test]
    fn header_names_are_made_unique() {
        let names = unique_header_names(&["A", "", "A", "A", "B"]);
        assert_eq!(names, vec!["A", "Unnamed: 1", "A.1", "A.2", "B"]);
    }

    #[test]
    fn label_overwrites_existing_company_column() {
        let text = "Empresa;Premium\nOld;10\n";
        let batch = parse_delimited(text, b';').unwrap().unwrap();
        let tagged = tag_with_label(&batch, "New").unwrap();
        assert_eq!(tagged.num_columns(), 2);
        assert_eq!(column_values(&tagged, COMPANY_COLUMN), vec![Some("New".into())]);
    }

    #[test]
    fn decodes_latin1_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        let mut f = fs::File::create(&path).unwrap();
        // "Região;Premium\nSão Paulo;10\n" in ISO-8859-1
        f.write_all(b"Regi\xe3o;Premium\nS\xe3o Paulo;10\n").unwrap();
        drop(f);

        let batch = read_source(&SourceSpec::new("X", &path), &ReadOptions::default()).unwrap();
        assert_eq!(column_values(&batch, "Região"), vec![Some("São Paulo".into())]);
        assert_eq!(column_values(&batch, COMPANY_COLUMN), vec![Some("X".into())]);
    }

    #[test]
    fn invalid_utf8_is_a_decode_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, b"Premium\n\xe3 10\n").unwrap();

        let spec = SourceSpec {
            encoding: Some("utf-8".into()),
            ..SourceSpec::new("X", &path)
        };
        let err = read_source(&spec, &ReadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::load::LoadFailureKind::Decode);
    }

    #[test]
    fn na_tokens_read_as_null() {
        let text = "Premium;Product\n10;NA\n20;N/A\nNULL;Car\n30;nan\n40; NA\n";
        let batch = parse_delimited(text, b';').unwrap().unwrap();
        assert_eq!(
            column_values(&batch, "Product"),
            vec![None, None, Some("Car".into()), None, Some(" NA".into())]
        );
        assert_eq!(column_values(&batch, "Premium")[2], None);
    }

    #[test]
    fn latin1_keeps_c1_bytes_that_windows_1252_remaps() {
        let latin1 = TextEncoding::for_label("latin1").unwrap();
        assert_eq!(latin1, TextEncoding::Latin1);
        let (text, used, had_errors) = latin1.decode(b"\x80\xe3");
        assert_eq!(text, "\u{80}ã");
        assert_eq!(used, "ISO-8859-1");
        assert!(!had_errors);

        let cp1252 = TextEncoding::for_label("windows-1252").unwrap();
        assert_eq!(cp1252.decode(b"\x80").0, "€");
    }

    #[test]
    fn byte_order_mark_overrides_latin1() {
        let (text, used, _) = TextEncoding::Latin1.decode(b"\xef\xbb\xbfS\xc3\xa3o");
        assert_eq!(text, "São");
        assert_eq!(used, "UTF-8");
    }

    #[test]
    fn unknown_source_encoding_fails_only_that_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.csv");
        fs::write(&path, "Premium\n1\n").unwrap();

        let spec = SourceSpec {
            encoding: Some("klingon".into()),
            ..SourceSpec::new("X", &path)
        };
        let err = read_source(&spec, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownEncoding { .. }));
        assert_eq!(err.kind(), crate::load::LoadFailureKind::Other);
    }
}
