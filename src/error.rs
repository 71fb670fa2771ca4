use thiserror::Error;

/// Convenience result type for CSVY operations.
pub type CsvyResult<T> = Result<T, CsvyError>;

/// The header block is present but its framing is broken.
///
/// When one of these is returned the stream position is unspecified; callers should not keep
/// reading from it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The first line opened a header block but no closing marker followed it.
    ///
    /// Also reported when a prefixed block runs into unprefixed lines and no marker line
    /// appears anywhere after them.
    #[error("no closing marker found for header opened with comment '{comment}' ({lines_read} lines read)")]
    MissingClosingMarker { comment: String, lines_read: usize },

    /// A line inside the header block does not carry the block's comment prefix while a marker
    /// line still follows, or the closing marker itself carries another prefix.
    #[error("inconsistent comment prefix on header line {line}: expected '{expected}', found '{found}'")]
    InconsistentPrefix {
        line: usize,
        expected: String,
        found: String,
    },

    /// A header line is not valid UTF-8.
    #[error("header line {line} is not valid utf-8")]
    InvalidUtf8 { line: usize },
}

/// Error type returned by every read and write operation.
#[derive(Debug, Error)]
pub enum CsvyError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Header framing error (missing closing marker, mismatched comment prefix).
    #[error("malformed header: {0}")]
    Framing(#[from] FramingError),

    /// The header block is framed correctly but its body is not valid YAML, or not a mapping.
    #[error("invalid YAML in header: {0}")]
    HeaderYaml(#[source] serde_yaml::Error),

    /// The metadata mapping could not be serialized to YAML.
    #[error("failed to serialize header to YAML: {0}")]
    YamlEmit(#[source] serde_yaml::Error),

    /// A well-known metadata key has the wrong structure. Only raised by the typed view.
    #[error("invalid '{key}' in header: {message}")]
    SchemaShape { key: String, message: String },

    /// The payload handed to `write` is not a tabular shape any engine can encode.
    #[error("unsupported payload: {found}")]
    UnsupportedPayload { found: String },

    /// The comment string cannot be auto-detected on read, so it is refused on write.
    #[error("invalid comment string '{comment}': only '#', ';', '%', '/', '!' and blanks are allowed")]
    InvalidComment { comment: String },

    /// The encoding label is not known.
    #[error("unsupported encoding '{label}'")]
    UnsupportedEncoding { label: String },

    /// The input contains bytes that are invalid for the requested encoding.
    #[error("input is not valid {encoding}")]
    Decode { encoding: String },

    /// The output contains characters the requested encoding cannot represent.
    #[error("output cannot be encoded as {encoding}")]
    Encode { encoding: String },

    /// An option value cannot be used by the tabular engine.
    #[error("invalid option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// CSV engine error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Polars engine error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// The payload does not conform to the requested table shape.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required type.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Explicit column names do not match the payload width.
    #[error("expected {expected} column names (longest row), got {found}")]
    ColumnCount { expected: usize, found: usize },
}

impl CsvyError {
    /// `true` for header framing errors.
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Framing(_))
    }

    /// `true` when the header body failed to parse as YAML.
    pub fn is_yaml(&self) -> bool {
        matches!(self, Self::HeaderYaml(_))
    }
}
