//! Read entry points.
//!
//! Every read splits the header off the source, resolves the CSV format (caller options layered
//! over the header's `csv_dialect`), and hands the positioned payload to one engine. Each
//! path-based function has a `*_from_reader` twin for in-memory or already-open sources.
//!
//! ```no_run
//! use csvy::options::ReadOptions;
//! use csvy::read::read_to_list;
//!
//! # fn main() -> Result<(), csvy::CsvyError> {
//! let (rows, metadata) = read_to_list("data.csvy", &ReadOptions::default())?;
//! println!("rows={} keys={}", rows.len(), metadata.len());
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use ndarray::Array2;

use crate::engines::{Container, PolarsFrame, Tabular, array, dataset, frame, rows};
use crate::error::{CsvyError, CsvyResult};
use crate::header::{PayloadReader, split_header};
use crate::metadata::{ENCODING_KEY, Metadata, header_dialect};
use crate::observability::{CsvyContext, Operation, observe};
use crate::options::{CsvFormat, ReadOptions, resolve_encoding};
use crate::types::{ColumnNaming, Columns, DataSet, Schema};

/// What [`read_header`] reports about a source.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    /// The header mapping, empty when there is no header.
    pub metadata: Metadata,
    /// Lines taken by the header block, both markers included (0 without a header).
    pub line_count: usize,
    /// Comment string of the header block (empty without a header).
    pub comment: String,
}

/// Parse only the header of the file at `path`.
pub fn read_header(path: impl AsRef<Path>, options: &ReadOptions) -> CsvyResult<HeaderInfo> {
    let path = path.as_ref();
    run(Some(path), Container::Header, options, || {
        header_info(File::open(path)?, options)
    })
}

/// [`read_header`] over any reader.
pub fn read_header_from_reader<R: Read>(reader: R, options: &ReadOptions) -> CsvyResult<HeaderInfo> {
    run(None, Container::Header, options, || header_info(reader, options))
}

/// Parse only the header and return its mapping (empty without a header).
pub fn read_metadata(path: impl AsRef<Path>, options: &ReadOptions) -> CsvyResult<Metadata> {
    read_header(path, options).map(|info| info.metadata)
}

/// [`read_metadata`] over any reader.
pub fn read_metadata_from_reader<R: Read>(reader: R, options: &ReadOptions) -> CsvyResult<Metadata> {
    read_header_from_reader(reader, options).map(|info| info.metadata)
}

/// Read the payload as rows of strings. No row is treated as column names.
pub fn read_to_list(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> CsvyResult<(Vec<Vec<String>>, Metadata)> {
    let path = path.as_ref();
    run(Some(path), Container::Rows, options, || {
        load(File::open(path)?, options, rows::read_rows)
    })
    .map(Loaded::into_parts)
}

/// [`read_to_list`] over any reader.
pub fn read_to_list_from_reader<R: Read>(
    reader: R,
    options: &ReadOptions,
) -> CsvyResult<(Vec<Vec<String>>, Metadata)> {
    run(None, Container::Rows, options, || load(reader, options, rows::read_rows))
        .map(Loaded::into_parts)
}

/// Read the payload as named string columns.
pub fn read_to_columns(
    path: impl AsRef<Path>,
    naming: ColumnNaming,
    options: &ReadOptions,
) -> CsvyResult<(Columns, Metadata)> {
    let path = path.as_ref();
    run(Some(path), Container::Columns, options, || {
        load(File::open(path)?, options, |payload, format| {
            rows::rows_to_columns(rows::read_rows(payload, format)?, naming)
        })
    })
    .map(Loaded::into_parts)
}

/// [`read_to_columns`] over any reader.
pub fn read_to_columns_from_reader<R: Read>(
    reader: R,
    naming: ColumnNaming,
    options: &ReadOptions,
) -> CsvyResult<(Columns, Metadata)> {
    run(None, Container::Columns, options, || {
        load(reader, options, |payload, format| {
            rows::rows_to_columns(rows::read_rows(payload, format)?, naming)
        })
    })
    .map(Loaded::into_parts)
}

/// Read the payload as a 2D `f64` array. Every payload row is data; use
/// [`crate::options::CsvOptions::skip_rows`] to drop a names row.
pub fn read_to_array(path: impl AsRef<Path>, options: &ReadOptions) -> CsvyResult<(Array2<f64>, Metadata)> {
    let path = path.as_ref();
    run(Some(path), Container::Array, options, || {
        load(File::open(path)?, options, array::read_array)
    })
    .map(Loaded::into_parts)
}

/// [`read_to_array`] over any reader.
pub fn read_to_array_from_reader<R: Read>(
    reader: R,
    options: &ReadOptions,
) -> CsvyResult<(Array2<f64>, Metadata)> {
    run(None, Container::Array, options, || load(reader, options, array::read_array))
        .map(Loaded::into_parts)
}

/// Read the payload into a labeled [`DataSet`]. The first payload row holds the column names.
///
/// Column types come from `schema` when given, else every column is text. The header's own
/// `schema` entry is never applied to the payload; use [`crate::metadata::TypedHeader`] and
/// [`crate::metadata::TableSchema::to_schema`] to opt into it.
pub fn read_to_dataframe(
    path: impl AsRef<Path>,
    schema: Option<&Schema>,
    options: &ReadOptions,
) -> CsvyResult<(DataSet, Metadata)> {
    let path = path.as_ref();
    run(Some(path), Container::DataSet, options, || {
        load_dataset(File::open(path)?, schema, options)
    })
    .map(Loaded::into_parts)
}

/// [`read_to_dataframe`] over any reader.
pub fn read_to_dataframe_from_reader<R: Read>(
    reader: R,
    schema: Option<&Schema>,
    options: &ReadOptions,
) -> CsvyResult<(DataSet, Metadata)> {
    run(None, Container::DataSet, options, || load_dataset(reader, schema, options))
        .map(Loaded::into_parts)
}

/// Read the payload into a Polars frame, eager or lazy. The first payload row holds the
/// column names.
///
/// With `eager = false` the file is scanned lazily: only the header is read here and the
/// payload is parsed when the frame is collected. Non-UTF-8 files and a non-zero
/// [`crate::options::CsvOptions::skip_rows`] are read into memory first instead.
pub fn read_to_polars_frame(
    path: impl AsRef<Path>,
    eager: bool,
    options: &ReadOptions,
) -> CsvyResult<(PolarsFrame, Metadata)> {
    let path = path.as_ref();
    run(Some(path), Container::Polars, options, || {
        if eager {
            load(File::open(path)?, options, |payload, format| {
                frame::read_frame(payload, true, format)
            })
        } else {
            scan_polars(path, options)
        }
    })
    .map(Loaded::into_parts)
}

/// [`read_to_polars_frame`] over any reader. The payload is always buffered; a lazy frame
/// wraps the parsed data.
pub fn read_to_polars_frame_from_reader<R: Read>(
    reader: R,
    eager: bool,
    options: &ReadOptions,
) -> CsvyResult<(PolarsFrame, Metadata)> {
    run(None, Container::Polars, options, || {
        load(reader, options, |payload, format| {
            frame::read_frame(payload, eager, format)
        })
    })
    .map(Loaded::into_parts)
}

/// A decoded payload and the header it came with.
struct Loaded<T> {
    value: T,
    metadata: Metadata,
}

impl<T> Loaded<T> {
    fn into_parts(self) -> (T, Metadata) {
        (self.value, self.metadata)
    }
}

impl<T: Tabular> Tabular for Loaded<T> {
    fn row_count(&self) -> Option<usize> {
        self.value.row_count()
    }
}

/// A source with its header split off.
struct Opened<'a> {
    metadata: Metadata,
    comment: String,
    header_lines: usize,
    payload: PayloadReader<Box<dyn BufRead + 'a>>,
}

fn run<T: Tabular>(
    path: Option<&Path>,
    container: Container,
    options: &ReadOptions,
    read: impl FnOnce() -> CsvyResult<(T, usize)>,
) -> CsvyResult<T> {
    let ctx = || CsvyContext {
        path: path.map(Path::to_path_buf),
        operation: Operation::Read,
        container,
    };
    observe(options.observer.as_ref(), options.alert_at_or_above, ctx, read()).map(|(value, _)| value)
}

fn header_info<R: Read>(reader: R, options: &ReadOptions) -> CsvyResult<(HeaderInfo, usize)> {
    let opened = open(reader, options)?;
    let lines = opened.header_lines;
    Ok((
        HeaderInfo {
            metadata: opened.metadata,
            line_count: lines,
            comment: opened.comment,
        },
        lines,
    ))
}

fn load<'a, R, T, F>(reader: R, options: &ReadOptions, decode: F) -> CsvyResult<(Loaded<T>, usize)>
where
    R: Read + 'a,
    F: FnOnce(PayloadReader<Box<dyn BufRead + 'a>>, &CsvFormat) -> CsvyResult<T>,
{
    let opened = open(reader, options)?;
    let format = options.csv.resolve(header_dialect(&opened.metadata).as_ref())?;
    let value = decode(opened.payload, &format)?;
    Ok((
        Loaded {
            value,
            metadata: opened.metadata,
        },
        opened.header_lines,
    ))
}

fn load_dataset<R: Read>(
    reader: R,
    schema: Option<&Schema>,
    options: &ReadOptions,
) -> CsvyResult<(Loaded<DataSet>, usize)> {
    let opened = open(reader, options)?;
    let format = options.csv.resolve(header_dialect(&opened.metadata).as_ref())?;
    let value = dataset::read_dataset(opened.payload, schema, &format)?;
    Ok((
        Loaded {
            value,
            metadata: opened.metadata,
        },
        opened.header_lines,
    ))
}

fn scan_polars(path: &Path, options: &ReadOptions) -> CsvyResult<(Loaded<PolarsFrame>, usize)> {
    let utf8 = resolve_encoding(&options.encoding)? == UTF_8;
    let opened = open(File::open(path)?, options)?;
    let format = options.csv.resolve(header_dialect(&opened.metadata).as_ref())?;
    let value = if utf8 && format.skip_rows == 0 {
        frame::scan_frame(path, opened.header_lines, &format)?
    } else {
        frame::read_frame(opened.payload, false, &format)?
    };
    Ok((
        Loaded {
            value,
            metadata: opened.metadata,
        },
        opened.header_lines,
    ))
}

fn open<'a, R: Read + 'a>(reader: R, options: &ReadOptions) -> CsvyResult<Opened<'a>> {
    let encoding = resolve_encoding(&options.encoding)?;
    let source = decode_source(reader, encoding)?;
    let (header, payload) = split_header(source, &options.yaml)?.into_parts();
    let (metadata, comment, header_lines) = match header {
        Some(block) => (block.metadata, block.comment, block.line_count),
        None => (Metadata::new(), String::new(), 0),
    };
    check_declared_encoding(&metadata, encoding);
    Ok(Opened {
        metadata,
        comment,
        header_lines,
        payload,
    })
}

fn decode_source<'a, R: Read + 'a>(
    mut reader: R,
    encoding: &'static Encoding,
) -> CsvyResult<Box<dyn BufRead + 'a>> {
    if encoding == UTF_8 {
        return Ok(Box::new(BufReader::new(reader)));
    }
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    if had_errors {
        return Err(CsvyError::Decode {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(Box::new(Cursor::new(text.into_owned().into_bytes())))
}

// The header's `encoding` entry is informational; it never changes how the source is decoded.
fn check_declared_encoding(metadata: &Metadata, used: &'static Encoding) {
    let Some(declared) = metadata.get(ENCODING_KEY).and_then(|v| v.as_str()) else {
        return;
    };
    if Encoding::for_label(declared.trim().as_bytes()) != Some(used) {
        tracing::warn!(
            declared,
            used = used.name(),
            "header declares a different encoding than the one used to read; header value ignored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn header_only_read_leaves_payload_alone() {
        let info = read_header_from_reader("# ---\n# a: 1\n# ---\nnot,read\n".as_bytes(), &ReadOptions::default())
            .unwrap();
        assert_eq!(info.comment, "# ");
        assert_eq!(info.line_count, 3);
        assert_eq!(info.metadata.get("a").and_then(|v| v.as_u64()), Some(1));
    }

    #[test]
    fn header_dialect_fills_csv_options() {
        let input = "---\ncsv_dialect:\n  delimiter: ';'\n---\na;b\n1;2\n";
        let (rows, _) = read_to_list_from_reader(input.as_bytes(), &ReadOptions::default()).unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn header_schema_is_not_applied_to_the_payload() {
        // Declared types disagree with the cells and name a column the payload lacks.
        let input = "---\nschema:\n  fields:\n  - name: id\n    type: integer\n  - name: missing\n    type: number\n---\nid\nabc\n";
        let (ds, metadata) = read_to_dataframe_from_reader(input.as_bytes(), None, &ReadOptions::default()).unwrap();
        assert_eq!(ds.rows, vec![vec![Value::Utf8("abc".to_string())]]);
        assert_eq!(ds.schema, Schema::utf8(["id"]));
        assert!(metadata.contains_key("schema"));
    }

    #[test]
    fn single_byte_encodings_are_decoded() {
        let input = b"---\nname: caf\xe9\n---\nna\xefve\n";
        let options = ReadOptions {
            encoding: "latin1".to_string(),
            ..Default::default()
        };
        let (rows, metadata) = read_to_list_from_reader(&input[..], &options).unwrap();
        assert_eq!(metadata.get("name").and_then(|v| v.as_str()), Some("café"));
        assert_eq!(rows, vec![vec!["naïve"]]);
    }

    #[test]
    fn unknown_encoding_label_fails_before_reading() {
        let options = ReadOptions {
            encoding: "klingon".to_string(),
            ..Default::default()
        };
        let err = read_to_list_from_reader("a\n".as_bytes(), &options).unwrap_err();
        assert!(matches!(err, CsvyError::UnsupportedEncoding { .. }));
    }
}
