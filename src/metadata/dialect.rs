//! CSV dialect (`csv_dialect` header key).

use serde::{Deserialize, Serialize};

use crate::error::CsvyResult;
use crate::options::LineTerminator;

use super::{DIALECT_KEY, shape_error};

/// CSV dialect settings stored in the header.
///
/// Every setting is optional; unset ones fall back to the caller's
/// [`crate::options::CsvOptions`] and then to the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDialect {
    /// One-character field separator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// Whether a quote inside a quoted field is written as two quotes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doublequote: Option<bool>,
    /// One-character escape used when `doublequote` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escapechar: Option<String>,
    /// Record terminator: `"\r\n"` or a single character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineterminator: Option<String>,
    /// One-character quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotechar: Option<String>,
    /// Whether whitespace following a delimiter is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipinitialspace: Option<bool>,
}

impl CsvDialect {
    /// The dialect spreadsheet applications use for `.csv` exports.
    pub fn excel() -> Self {
        Self {
            delimiter: Some(",".to_string()),
            doublequote: Some(true),
            escapechar: None,
            lineterminator: Some("\r\n".to_string()),
            quotechar: Some("\"".to_string()),
            skipinitialspace: Some(false),
        }
    }

    /// Like [`CsvDialect::excel`] with tab separators.
    pub fn excel_tab() -> Self {
        Self {
            delimiter: Some("\t".to_string()),
            ..Self::excel()
        }
    }

    /// Comma separated, `\n` terminated.
    pub fn unix() -> Self {
        Self {
            lineterminator: Some("\n".to_string()),
            ..Self::excel()
        }
    }

    /// Check that every set value can be used by the CSV engines.
    pub fn validate(&self) -> CsvyResult<()> {
        self.delimiter_byte()?;
        self.quote_byte()?;
        self.escape_byte()?;
        self.line_terminator()?;
        Ok(())
    }

    pub(crate) fn delimiter_byte(&self) -> CsvyResult<Option<u8>> {
        single_byte("delimiter", self.delimiter.as_deref())
    }

    pub(crate) fn quote_byte(&self) -> CsvyResult<Option<u8>> {
        single_byte("quotechar", self.quotechar.as_deref())
    }

    pub(crate) fn escape_byte(&self) -> CsvyResult<Option<u8>> {
        single_byte("escapechar", self.escapechar.as_deref())
    }

    pub(crate) fn line_terminator(&self) -> CsvyResult<Option<LineTerminator>> {
        self.lineterminator
            .as_deref()
            .map(|s| {
                LineTerminator::parse(s).ok_or_else(|| {
                    shape_error(
                        DIALECT_KEY,
                        format!("lineterminator must be \"\\r\\n\" or one ASCII character, got {s:?}"),
                    )
                })
            })
            .transpose()
    }
}

fn single_byte(name: &str, value: Option<&str>) -> CsvyResult<Option<u8>> {
    match value {
        None => Ok(None),
        Some(s) if s.len() == 1 && s.is_ascii() => Ok(Some(s.as_bytes()[0])),
        Some(s) => Err(shape_error(
            DIALECT_KEY,
            format!("{name} must be one ASCII character, got {s:?}"),
        )),
    }
}
