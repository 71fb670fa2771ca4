//! Write entry points.
//!
//! [`write`] takes a [`Payload`], the closed set of table shapes this crate can encode, and
//! writes the header block followed by the payload. Everything that can fail without touching
//! the destination (payload shape, comment string, encoding label, CSV options) is checked
//! before the destination is created or written to.
//!
//! [`Writer`] writes the header once and then accepts rows one at a time.
//!
//! ```no_run
//! use csvy::metadata::Metadata;
//! use csvy::options::WriteOptions;
//! use csvy::write::write;
//!
//! # fn main() -> Result<(), csvy::CsvyError> {
//! let rows = vec![
//!     vec!["a".to_string(), "b".to_string()],
//!     vec!["1".to_string(), "2".to_string()],
//! ];
//! let mut metadata = Metadata::new();
//! metadata.insert("name".into(), "demo".into());
//!
//! let opts = WriteOptions {
//!     comment: "#".to_string(),
//!     ..Default::default()
//! };
//! write("demo.csvy", &rows, &metadata, &opts)?;
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};
use ndarray::Array2;
use polars::prelude::{DataFrame, LazyFrame};

use crate::engines::{Container, Tabular, array, dataset, frame, rows};
use crate::error::{CsvyError, CsvyResult};
use crate::header::{is_valid_comment, write_header};
use crate::metadata::{Metadata, header_dialect};
use crate::observability::{CsvyContext, CsvyObserver, CsvySeverity, Operation, observe};
use crate::options::{CsvFormat, WriteOptions, resolve_encoding};
use crate::types::{Columns, DataSet};

/// A table to write, tagged by shape.
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    /// Rows of strings, written as-is (rows may differ in length).
    Rows(&'a [Vec<String>]),
    /// Named columns: a names row, then the zipped columns.
    Columns(&'a Columns),
    /// A 2D `f64` array, one record per array row.
    Array(&'a Array2<f64>),
    /// A typed table: a names row, then the rows.
    DataSet(&'a DataSet),
    /// An eager Polars frame.
    Polars(&'a DataFrame),
    /// A lazy Polars frame, collected before anything is written.
    Lazy(&'a LazyFrame),
    /// JSON data, accepted when it has a tabular shape: an array of arrays, an array of
    /// objects, or an object of arrays.
    Json(&'a serde_json::Value),
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.container()).finish()
    }
}

impl Payload<'_> {
    /// The container the payload is written from.
    pub fn container(&self) -> Container {
        match self {
            Self::Rows(_) | Self::Json(_) => Container::Rows,
            Self::Columns(_) => Container::Columns,
            Self::Array(_) => Container::Array,
            Self::DataSet(_) => Container::DataSet,
            Self::Polars(_) | Self::Lazy(_) => Container::Polars,
        }
    }
}

impl<'a> From<&'a [Vec<String>]> for Payload<'a> {
    fn from(rows: &'a [Vec<String>]) -> Self {
        Self::Rows(rows)
    }
}

impl<'a> From<&'a Vec<Vec<String>>> for Payload<'a> {
    fn from(rows: &'a Vec<Vec<String>>) -> Self {
        Self::Rows(rows.as_slice())
    }
}

impl<'a> From<&'a Columns> for Payload<'a> {
    fn from(columns: &'a Columns) -> Self {
        Self::Columns(columns)
    }
}

impl<'a> From<&'a Array2<f64>> for Payload<'a> {
    fn from(array: &'a Array2<f64>) -> Self {
        Self::Array(array)
    }
}

impl<'a> From<&'a DataSet> for Payload<'a> {
    fn from(ds: &'a DataSet) -> Self {
        Self::DataSet(ds)
    }
}

impl<'a> From<&'a DataFrame> for Payload<'a> {
    fn from(df: &'a DataFrame) -> Self {
        Self::Polars(df)
    }
}

impl<'a> From<&'a LazyFrame> for Payload<'a> {
    fn from(lf: &'a LazyFrame) -> Self {
        Self::Lazy(lf)
    }
}

impl<'a> From<&'a serde_json::Value> for Payload<'a> {
    fn from(value: &'a serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Write `metadata` and `payload` to the file at `path`, replacing it.
///
/// With `options.line_buffering` the file is line-buffered, so every line becomes visible to
/// readers of the file as soon as it is written.
///
/// # Errors
///
/// [`CsvyError::UnsupportedPayload`] for JSON without a tabular shape,
/// [`CsvyError::InvalidComment`] for a comment string that could not be detected on read, and
/// any engine or I/O error. The first two are raised before the file is created.
pub fn write<'a>(
    path: impl AsRef<Path>,
    payload: impl Into<Payload<'a>>,
    metadata: &Metadata,
    options: &WriteOptions,
) -> CsvyResult<()> {
    let path = path.as_ref();
    let payload = payload.into();
    run(Some(path), payload.container(), options, || {
        let plan = Plan::new(payload, metadata, options)?;
        let mut sink = FileSink::create(path, options.line_buffering)?;
        plan.emit(&mut sink, metadata, options)
    })
}

/// [`write`] to any writer. The writer is flushed but not closed.
pub fn write_to_writer<'a, W: Write>(
    mut writer: W,
    payload: impl Into<Payload<'a>>,
    metadata: &Metadata,
    options: &WriteOptions,
) -> CsvyResult<()> {
    let payload = payload.into();
    run(None, payload.container(), options, || {
        Plan::new(payload, metadata, options)?.emit(&mut writer, metadata, options)
    })
}

/// Payload data in a shape an engine can write directly.
enum Prepared<'a> {
    Rows(Cow<'a, [Vec<String>]>),
    Array(&'a Array2<f64>),
    DataSet(&'a DataSet),
    Frame(Cow<'a, DataFrame>),
}

impl<'a> Prepared<'a> {
    fn new(payload: Payload<'a>) -> CsvyResult<Self> {
        Ok(match payload {
            Payload::Rows(data) => Self::Rows(Cow::Borrowed(data)),
            Payload::Columns(columns) => Self::Rows(Cow::Owned(rows::columns_to_rows(columns)?)),
            Payload::Json(value) => Self::Rows(Cow::Owned(rows::rows_from_json(value)?)),
            Payload::Array(data) => Self::Array(data),
            Payload::DataSet(ds) => Self::DataSet(ds),
            Payload::Polars(df) => Self::Frame(Cow::Borrowed(df)),
            Payload::Lazy(lf) => Self::Frame(Cow::Owned(lf.clone().collect()?)),
        })
    }

    fn write_to<W: Write>(&self, writer: W, format: &CsvFormat) -> CsvyResult<usize> {
        match self {
            Self::Rows(data) => rows::write_rows(writer, data.iter(), format),
            Self::Array(data) => array::write_array(writer, data, format),
            Self::DataSet(ds) => dataset::write_dataset(writer, ds, format),
            Self::Frame(df) => frame::write_frame(writer, df, format),
        }
    }
}

/// Everything checked up front, ready to be written.
struct Plan<'a> {
    data: Prepared<'a>,
    format: CsvFormat,
    encoding: &'static Encoding,
}

impl<'a> Plan<'a> {
    fn new(payload: Payload<'a>, metadata: &Metadata, options: &WriteOptions) -> CsvyResult<Self> {
        if !is_valid_comment(&options.comment) {
            return Err(CsvyError::InvalidComment {
                comment: options.comment.clone(),
            });
        }
        let encoding = output_encoding(&options.encoding)?;
        let format = options.csv.resolve(header_dialect(metadata).as_ref())?;
        let data = Prepared::new(payload)?;
        Ok(Self {
            data,
            format,
            encoding,
        })
    }

    /// Write header and payload; returns the row count and the header line count.
    fn emit<W: Write>(
        &self,
        writer: &mut W,
        metadata: &Metadata,
        options: &WriteOptions,
    ) -> CsvyResult<(Written, usize)> {
        if self.encoding == UTF_8 {
            let header_lines = write_header(writer, metadata, options)?;
            let rows = self.data.write_to(&mut *writer, &self.format)?;
            writer.flush()?;
            return Ok((Written { rows }, header_lines));
        }

        let mut buf = Vec::new();
        let header_lines = write_header(&mut buf, metadata, options)?;
        let rows = self.data.write_to(&mut buf, &self.format)?;
        let text = String::from_utf8(buf).map_err(|_| CsvyError::Encode {
            encoding: self.encoding.name().to_string(),
        })?;
        let (bytes, _, unmappable) = self.encoding.encode(&text);
        if unmappable {
            return Err(CsvyError::Encode {
                encoding: self.encoding.name().to_string(),
            });
        }
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok((Written { rows }, header_lines))
    }
}

struct Written {
    rows: usize,
}

impl Tabular for Written {
    fn row_count(&self) -> Option<usize> {
        Some(self.rows)
    }
}

fn run(
    path: Option<&Path>,
    container: Container,
    options: &WriteOptions,
    write: impl FnOnce() -> CsvyResult<(Written, usize)>,
) -> CsvyResult<()> {
    let ctx = || CsvyContext {
        path: path.map(Path::to_path_buf),
        operation: Operation::Write,
        container,
    };
    observe(options.observer.as_ref(), options.alert_at_or_above, ctx, write()).map(|_| ())
}

// Encodings that encode to something else (UTF-16, replacement) cannot be written.
fn output_encoding(label: &str) -> CsvyResult<&'static Encoding> {
    let encoding = resolve_encoding(label)?;
    if encoding.output_encoding() != encoding {
        return Err(CsvyError::UnsupportedEncoding {
            label: label.to_string(),
        });
    }
    Ok(encoding)
}

/// A file opened for writing, line- or block-buffered.
pub enum FileSink {
    Line(LineWriter<File>),
    Block(BufWriter<File>),
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>, line_buffering: bool) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(if line_buffering {
            Self::Line(LineWriter::new(file))
        } else {
            Self::Block(BufWriter::new(file))
        })
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(_) => f.write_str("FileSink::Line"),
            Self::Block(_) => f.write_str("FileSink::Block"),
        }
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Line(w) => w.write(buf),
            Self::Block(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Line(w) => w.flush(),
            Self::Block(w) => w.flush(),
        }
    }
}

/// Incremental writer: the header is written on construction, rows follow one at a time.
///
/// Rows may differ in length. With `line_buffering` every row is flushed as soon as it is
/// written. Only UTF-8 output is supported. Call [`Writer::finish`] to flush and get the
/// inner writer back; the outcome is reported to the options' observer at that point.
///
/// ```rust
/// use csvy::metadata::Metadata;
/// use csvy::options::WriteOptions;
/// use csvy::write::Writer;
///
/// let mut metadata = Metadata::new();
/// metadata.insert("source".into(), "sensor-1".into());
///
/// let mut writer = Writer::from_writer(Vec::new(), &metadata, &WriteOptions::default()).unwrap();
/// writer.write_row(["t", "value"]).unwrap();
/// writer.write_row(["0", "1.5"]).unwrap();
/// let out = writer.finish().unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "---\nsource: sensor-1\n---\nt,value\n0,1.5\n"
/// );
/// ```
pub struct Writer<W: Write> {
    csv: csv::Writer<W>,
    line_buffering: bool,
    rows: usize,
    header_lines: usize,
    path: Option<PathBuf>,
    observer: Option<Arc<dyn CsvyObserver>>,
    alert_at_or_above: CsvySeverity,
}

impl Writer<FileSink> {
    /// Create (or truncate) the file at `path` and write the header to it.
    pub fn create(path: impl AsRef<Path>, metadata: &Metadata, options: &WriteOptions) -> CsvyResult<Self> {
        let path = path.as_ref();
        check_writer_options(options)?;
        let sink = FileSink::create(path, options.line_buffering)?;
        let mut writer = Self::from_writer(sink, metadata, options)?;
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> Writer<W> {
    /// Write the header to `writer` and return a writer for the payload rows.
    pub fn from_writer(mut writer: W, metadata: &Metadata, options: &WriteOptions) -> CsvyResult<Self> {
        check_writer_options(options)?;
        let format = options.csv.resolve(header_dialect(metadata).as_ref())?;
        let header_lines = write_header(&mut writer, metadata, options)?;

        let mut builder = format.writer_builder();
        builder.flexible(true);
        Ok(Self {
            csv: builder.from_writer(writer),
            line_buffering: options.line_buffering,
            rows: 0,
            header_lines,
            path: None,
            observer: options.observer.clone(),
            alert_at_or_above: options.alert_at_or_above,
        })
    }

    /// Write one row.
    pub fn write_row<I, S>(&mut self, row: I) -> CsvyResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.csv.write_record(row)?;
        self.rows += 1;
        if self.line_buffering {
            self.csv.flush()?;
        }
        Ok(())
    }

    /// Write several rows; returns how many were written.
    pub fn write_rows<I, R, S>(&mut self, rows: I) -> CsvyResult<usize>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut n = 0;
        for row in rows {
            self.write_row(row)?;
            n += 1;
        }
        Ok(n)
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flush everything and return the inner writer.
    pub fn finish(self) -> CsvyResult<W> {
        let ctx = || CsvyContext {
            path: self.path.clone(),
            operation: Operation::Write,
            container: Container::Rows,
        };
        let rows = self.rows;
        let header_lines = self.header_lines;
        let result = self
            .csv
            .into_inner()
            .map_err(|e| CsvyError::Io(e.into_error()))
            .and_then(|mut inner| {
                inner.flush()?;
                Ok(inner)
            });
        let observed = observe(
            self.observer.as_ref(),
            self.alert_at_or_above,
            ctx,
            result.map(|inner| (Finished { inner, rows }, header_lines)),
        )?;
        Ok(observed.0.inner)
    }
}

impl<W: Write> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("rows", &self.rows)
            .field("header_lines", &self.header_lines)
            .field("line_buffering", &self.line_buffering)
            .field("path", &self.path)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

struct Finished<W> {
    inner: W,
    rows: usize,
}

impl<W> Tabular for Finished<W> {
    fn row_count(&self) -> Option<usize> {
        Some(self.rows)
    }
}

fn check_writer_options(options: &WriteOptions) -> CsvyResult<()> {
    if !is_valid_comment(&options.comment) {
        return Err(CsvyError::InvalidComment {
            comment: options.comment.clone(),
        });
    }
    if resolve_encoding(&options.encoding)? != UTF_8 {
        return Err(CsvyError::InvalidOption {
            option: "encoding".to_string(),
            message: "the incremental writer only writes utf-8".to_string(),
        });
    }
    Ok(())
}
