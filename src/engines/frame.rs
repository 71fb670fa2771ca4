//! Polars data frames.
//!
//! Files are scanned lazily by [`LazyCsvReader`], which skips the header lines itself. Readers
//! and sources that need decoding first are buffered and parsed by the eager Polars CSV reader.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use polars::prelude::*;

use crate::error::{CsvyError, CsvyResult};
use crate::options::{CsvFormat, LineTerminator};

/// A Polars frame, eager or lazy.
#[derive(Clone)]
pub enum PolarsFrame {
    Eager(DataFrame),
    Lazy(LazyFrame),
}

impl PolarsFrame {
    /// `true` for [`PolarsFrame::Lazy`].
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }

    /// Materialize the frame.
    pub fn collect(self) -> CsvyResult<DataFrame> {
        match self {
            Self::Eager(df) => Ok(df),
            Self::Lazy(lf) => Ok(lf.collect()?),
        }
    }
}

impl std::fmt::Debug for PolarsFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eager(df) => f.debug_tuple("Eager").field(&df.shape()).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Read the payload with the Polars CSV reader. The first payload row (after `skip_rows`)
/// holds the column names; column types are inferred.
pub fn read_frame<R: Read>(mut reader: R, eager: bool, format: &CsvFormat) -> CsvyResult<PolarsFrame> {
    check_polars_read_format(format)?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let separator = format.delimiter;
    let quote = format.quote;
    let eol = eol_char(format);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(format.skip_rows)
        .map_parse_options(|opts| {
            opts.with_separator(separator)
                .with_quote_char(Some(quote))
                .with_eol_char(eol)
        })
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    tracing::debug!(rows = df.height(), cols = df.width(), eager, "read polars frame");
    Ok(if eager {
        PolarsFrame::Eager(df)
    } else {
        PolarsFrame::Lazy(df.lazy())
    })
}

/// Scan the UTF-8 file at `path` lazily, skipping the `header_lines` taken by its header block.
///
/// Nothing is parsed until the frame is collected. `skip_rows` must be 0 here: Polars can skip
/// raw lines or CSV rows but not both.
pub fn scan_frame(path: &Path, header_lines: usize, format: &CsvFormat) -> CsvyResult<PolarsFrame> {
    check_polars_read_format(format)?;
    if format.skip_rows != 0 {
        return Err(CsvyError::InvalidOption {
            option: "skip_rows".to_string(),
            message: "not supported by the lazy polars scan".to_string(),
        });
    }

    let lf = LazyCsvReader::new(PlRefPath::try_from_path(path)?)
        .with_glob(false)
        .with_has_header(true)
        .with_skip_lines(header_lines)
        .with_separator(format.delimiter)
        .with_quote_char(Some(format.quote))
        .with_eol_char(eol_char(format))
        .finish()?;

    tracing::debug!(path = %path.display(), header_lines, "scanning polars frame");
    Ok(PolarsFrame::Lazy(lf))
}

/// Write the frame with the Polars CSV writer, names row first. Returns the number of rows.
pub fn write_frame<W: Write>(mut writer: W, df: &DataFrame, format: &CsvFormat) -> CsvyResult<usize> {
    check_polars_format(format)?;

    let mut df = df.clone();
    CsvWriter::new(&mut writer)
        .include_header(true)
        .with_separator(format.delimiter)
        .with_quote_char(format.quote)
        .with_line_terminator(format.line_terminator_string().into())
        .finish(&mut df)?;
    writer.flush()?;
    Ok(df.height())
}

// The Polars CSV engine has no escape character and always doubles quotes.
fn check_polars_format(format: &CsvFormat) -> CsvyResult<()> {
    if format.escape.is_some() {
        return Err(CsvyError::InvalidOption {
            option: "escape".to_string(),
            message: "not supported by the polars engine".to_string(),
        });
    }
    if !format.double_quote {
        return Err(CsvyError::InvalidOption {
            option: "double_quote".to_string(),
            message: "the polars engine always doubles quotes".to_string(),
        });
    }
    Ok(())
}

fn check_polars_read_format(format: &CsvFormat) -> CsvyResult<()> {
    check_polars_format(format)?;
    if format.skip_initial_space {
        return Err(CsvyError::InvalidOption {
            option: "skip_initial_space".to_string(),
            message: "not supported by the polars engine".to_string(),
        });
    }
    Ok(())
}

// `\r\n` records end in `\n`; Polars drops the trailing `\r` itself.
fn eol_char(format: &CsvFormat) -> u8 {
    match format.line_terminator {
        LineTerminator::Crlf => b'\n',
        LineTerminator::Byte(b) => b,
    }
}
