//! Options for the tabular engines, the YAML header and the read/write entry points.
//!
//! Use [`Default`] for common cases and struct-update syntax for the rest:
//!
//! ```rust
//! use csvy::options::{CsvOptions, WriteOptions};
//!
//! let opts = WriteOptions {
//!     comment: "#".to_string(),
//!     csv: CsvOptions {
//!         delimiter: Some(b';'),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(!opts.line_buffering);
//! ```

use std::fmt;
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::error::{CsvyError, CsvyResult};
use crate::metadata::CsvDialect;
use crate::observability::{CsvyObserver, CsvySeverity};

/// Record terminator of the CSV payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// `\r\n` on write. On read, any of `\r`, `\n` or `\r\n`.
    Crlf,
    /// A single byte.
    Byte(u8),
}

impl LineTerminator {
    /// Parse `"\r\n"` or a single ASCII character.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "\r\n" => Some(Self::Crlf),
            _ if s.len() == 1 && s.is_ascii() => Some(Self::Byte(s.as_bytes()[0])),
            _ => None,
        }
    }

    fn as_string(self) -> String {
        match self {
            Self::Crlf => "\r\n".to_string(),
            Self::Byte(b) => char::from(b).to_string(),
        }
    }
}

/// Caller settings for the CSV engines.
///
/// Dialect settings are `Option`s: `None` means "not set here", in which case the header's
/// `csv_dialect` entry is consulted before falling back to the defaults of [`CsvFormat`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field separator (default `,`).
    pub delimiter: Option<u8>,
    /// Quote character (default `"`).
    pub quote: Option<u8>,
    /// Escape character used when `double_quote` is off (default none).
    pub escape: Option<u8>,
    /// Write quotes inside quoted fields as `""` (default `true`).
    pub double_quote: Option<bool>,
    /// Record terminator (default `\n`).
    pub line_terminator: Option<LineTerminator>,
    /// Ignore whitespace around fields on read (default `false`).
    pub skip_initial_space: Option<bool>,
    /// Payload rows to skip before decoding, counted after the header block.
    pub skip_rows: usize,
}

impl CsvOptions {
    /// Resolve the effective format, layering `self` over `dialect` over defaults.
    ///
    /// A value set by the caller always wins over the header dialect. When both set a value and
    /// they differ, the conflict is logged as a warning.
    pub fn resolve(&self, dialect: Option<&CsvDialect>) -> CsvyResult<CsvFormat> {
        let defaults = CsvFormat::default();
        let Some(dialect) = dialect else {
            return Ok(CsvFormat {
                delimiter: self.delimiter.unwrap_or(defaults.delimiter),
                quote: self.quote.unwrap_or(defaults.quote),
                escape: self.escape,
                double_quote: self.double_quote.unwrap_or(defaults.double_quote),
                line_terminator: self.line_terminator.unwrap_or(defaults.line_terminator),
                skip_initial_space: self.skip_initial_space.unwrap_or(defaults.skip_initial_space),
                skip_rows: self.skip_rows,
            });
        };

        Ok(CsvFormat {
            delimiter: layer("delimiter", self.delimiter, dialect.delimiter_byte()?)
                .unwrap_or(defaults.delimiter),
            quote: layer("quotechar", self.quote, dialect.quote_byte()?).unwrap_or(defaults.quote),
            escape: layer("escapechar", self.escape, dialect.escape_byte()?),
            double_quote: layer("doublequote", self.double_quote, dialect.doublequote)
                .unwrap_or(defaults.double_quote),
            line_terminator: layer("lineterminator", self.line_terminator, dialect.line_terminator()?)
                .unwrap_or(defaults.line_terminator),
            skip_initial_space: layer("skipinitialspace", self.skip_initial_space, dialect.skipinitialspace)
                .unwrap_or(defaults.skip_initial_space),
            skip_rows: self.skip_rows,
        })
    }
}

fn layer<T: PartialEq + fmt::Debug>(name: &str, user: Option<T>, dialect: Option<T>) -> Option<T> {
    match (user, dialect) {
        (Some(user), Some(dialect)) => {
            if user != dialect {
                tracing::warn!(
                    option = name,
                    user = ?user,
                    dialect = ?dialect,
                    "csv option conflicts with header dialect; using caller option"
                );
            }
            Some(user)
        }
        (user, dialect) => user.or(dialect),
    }
}

/// Fully resolved CSV settings handed to the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Option<u8>,
    pub double_quote: bool,
    pub line_terminator: LineTerminator,
    pub skip_initial_space: bool,
    pub skip_rows: usize,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: None,
            double_quote: true,
            line_terminator: LineTerminator::Byte(b'\n'),
            skip_initial_space: false,
            skip_rows: 0,
        }
    }
}

impl CsvFormat {
    /// A `csv` reader builder configured with this format.
    pub fn reader_builder(&self, has_headers: bool) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(has_headers)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .double_quote(self.double_quote);
        if self.skip_initial_space {
            builder.trim(csv::Trim::Fields);
        }
        // `\r` and `\n` are both covered by the default CRLF handling on read.
        if let LineTerminator::Byte(b) = self.line_terminator {
            if b != b'\n' && b != b'\r' {
                builder.terminator(csv::Terminator::Any(b));
            }
        }
        builder
    }

    /// A `csv` writer builder configured with this format.
    pub fn writer_builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder
            .has_headers(false)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .double_quote(self.double_quote)
            .terminator(match self.line_terminator {
                LineTerminator::Crlf => csv::Terminator::CRLF,
                LineTerminator::Byte(b) => csv::Terminator::Any(b),
            });
        if let Some(escape) = self.escape {
            builder.escape(escape);
        }
        builder
    }

    pub(crate) fn line_terminator_string(&self) -> String {
        self.line_terminator.as_string()
    }
}

/// Options for the YAML header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YamlOptions {
    /// Sort mapping keys (recursively). Applied to the mapping before it is written and to the
    /// mapping returned by a read. Off by default, which keeps the document order.
    pub sort_keys: bool,
}

/// Options shared by every read entry point.
#[derive(Clone)]
pub struct ReadOptions {
    /// CSV engine settings.
    pub csv: CsvOptions,
    /// YAML header settings.
    pub yaml: YamlOptions,
    /// Encoding label of the source (default `utf-8`).
    ///
    /// The header's own `encoding` entry is informational and is never used to decode.
    pub encoding: String,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn CsvyObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: CsvySeverity,
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("csv", &self.csv)
            .field("yaml", &self.yaml)
            .field("encoding", &self.encoding)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            yaml: YamlOptions::default(),
            encoding: "utf-8".to_string(),
            observer: None,
            alert_at_or_above: CsvySeverity::Critical,
        }
    }
}

/// Options shared by every write entry point.
#[derive(Clone)]
pub struct WriteOptions {
    /// Prefix written before every header line, marker lines included. Empty by default.
    pub comment: String,
    /// CSV engine settings.
    pub csv: CsvOptions,
    /// YAML header settings.
    pub yaml: YamlOptions,
    /// Flush after every line instead of once per block.
    pub line_buffering: bool,
    /// Encoding label of the output (default `utf-8`).
    pub encoding: String,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn CsvyObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: CsvySeverity,
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("comment", &self.comment)
            .field("csv", &self.csv)
            .field("yaml", &self.yaml)
            .field("line_buffering", &self.line_buffering)
            .field("encoding", &self.encoding)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            comment: String::new(),
            csv: CsvOptions::default(),
            yaml: YamlOptions::default(),
            line_buffering: false,
            encoding: "utf-8".to_string(),
            observer: None,
            alert_at_or_above: CsvySeverity::Critical,
        }
    }
}

/// Look up an encoding by its WHATWG label (`utf-8`, `latin1`, `windows-1252`, ...).
pub fn resolve_encoding(label: &str) -> CsvyResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| CsvyError::UnsupportedEncoding {
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_dialect_uses_defaults() {
        let format = CsvOptions::default().resolve(None).unwrap();
        assert_eq!(format, CsvFormat::default());
    }

    #[test]
    fn dialect_fills_unset_options() {
        let dialect = CsvDialect {
            delimiter: Some(";".to_string()),
            lineterminator: Some("\r\n".to_string()),
            ..Default::default()
        };
        let format = CsvOptions::default().resolve(Some(&dialect)).unwrap();
        assert_eq!(format.delimiter, b';');
        assert_eq!(format.line_terminator, LineTerminator::Crlf);
        assert_eq!(format.quote, b'"');
    }

    #[test]
    fn caller_options_win_over_dialect() {
        let dialect = CsvDialect {
            delimiter: Some(";".to_string()),
            ..Default::default()
        };
        let opts = CsvOptions {
            delimiter: Some(b'\t'),
            skip_rows: 2,
            ..Default::default()
        };
        let format = opts.resolve(Some(&dialect)).unwrap();
        assert_eq!(format.delimiter, b'\t');
        assert_eq!(format.skip_rows, 2);
    }

    #[test]
    fn line_terminator_parse() {
        assert_eq!(LineTerminator::parse("\r\n"), Some(LineTerminator::Crlf));
        assert_eq!(LineTerminator::parse("\n"), Some(LineTerminator::Byte(b'\n')));
        assert_eq!(LineTerminator::parse("ab"), None);
    }

    #[test]
    fn encoding_labels() {
        assert_eq!(resolve_encoding("utf-8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("latin1").unwrap(), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            resolve_encoding("utf-9"),
            Err(CsvyError::UnsupportedEncoding { .. })
        ));
    }
}
