//! Read direction: split a stream into its header block and its payload.

use std::io::{BufRead, Chain, Cursor, Read};

use crate::error::{CsvyError, CsvyResult, FramingError};
use crate::metadata::Metadata;
use crate::options::YamlOptions;

use super::comment::{MARKER, detect_comment, strip_comment, trim_line_ending};
use super::sort_mapping;

/// A parsed header block.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBlock {
    /// The parsed YAML document.
    pub metadata: Metadata,
    /// The comment string found on the opening marker line.
    pub comment: String,
    /// Number of lines the block spans, both marker lines included.
    pub line_count: usize,
}

/// Reader over the payload: the pending first line (when it was not a marker) followed by the
/// rest of the source.
pub type PayloadReader<R> = Chain<Cursor<Vec<u8>>, R>;

/// A stream split into its optional header block and its payload.
#[derive(Debug)]
pub struct Framed<R> {
    header: Option<HeaderBlock>,
    payload: PayloadReader<R>,
}

impl<R: BufRead> Framed<R> {
    /// The header block, if the stream had one.
    pub fn header(&self) -> Option<&HeaderBlock> {
        self.header.as_ref()
    }

    /// The comment string of the header block (empty without a header).
    pub fn comment(&self) -> &str {
        self.header.as_ref().map_or("", |h| h.comment.as_str())
    }

    /// Lines consumed by the header block (0 without a header).
    pub fn line_count(&self) -> usize {
        self.header.as_ref().map_or(0, |h| h.line_count)
    }

    /// The header metadata, empty without a header.
    pub fn metadata(&self) -> Metadata {
        self.header
            .as_ref()
            .map(|h| h.metadata.clone())
            .unwrap_or_default()
    }

    /// Reader positioned at the first payload line.
    pub fn payload(&mut self) -> &mut PayloadReader<R> {
        &mut self.payload
    }

    /// Split into the header block and the payload reader.
    pub fn into_parts(self) -> (Option<HeaderBlock>, PayloadReader<R>) {
        (self.header, self.payload)
    }
}

/// Detect and parse the header block at the start of `reader`.
///
/// Only the first line is needed to decide whether a header is present. Without one, that line
/// is handed back at the front of the payload reader, so the payload is the whole stream.
/// With one, lines are consumed up to and including the closing marker and the payload reader
/// starts right after it.
///
/// # Errors
///
/// - [`FramingError::MissingClosingMarker`] when the stream ends inside the block, or when a
///   line lacks the comment string and no marker line follows anywhere
/// - [`FramingError::InconsistentPrefix`] when a block line lacks the comment string and a
///   marker line is still to come
/// - [`CsvyError::HeaderYaml`] when the block body is not a YAML mapping
///
/// ```rust
/// use std::io::Read;
///
/// use csvy::header::split_header;
/// use csvy::options::YamlOptions;
///
/// let input = "#---\n#name: demo\n#---\na,b\n1,2\n";
/// let framed = split_header(input.as_bytes(), &YamlOptions::default()).unwrap();
/// assert_eq!(framed.comment(), "#");
/// assert_eq!(framed.line_count(), 3);
///
/// let (_, mut payload) = framed.into_parts();
/// let mut rest = String::new();
/// payload.read_to_string(&mut rest).unwrap();
/// assert_eq!(rest, "a,b\n1,2\n");
/// ```
pub fn split_header<R: BufRead>(mut reader: R, options: &YamlOptions) -> CsvyResult<Framed<R>> {
    let mut first = Vec::new();
    reader.read_until(b'\n', &mut first)?;

    let comment = match std::str::from_utf8(&first).ok().and_then(detect_comment) {
        Some(comment) => comment.to_string(),
        None => {
            return Ok(Framed {
                header: None,
                payload: Cursor::new(first).chain(reader),
            });
        }
    };

    let mut body = String::new();
    let mut line_count = 1;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Err(FramingError::MissingClosingMarker {
                comment,
                lines_read: line_count,
            }
            .into());
        }
        line_count += 1;

        let line = std::str::from_utf8(&buf)
            .map_err(|_| FramingError::InvalidUtf8 { line: line_count })?;
        let line = trim_line_ending(line);
        let Some(content) = strip_comment(line, &comment) else {
            let found = line.to_string();
            return Err(unprefixed_line(&mut reader, comment, line_count, found)?.into());
        };
        if content.trim() == MARKER {
            break;
        }
        body.push_str(content);
        body.push('\n');
    }

    let mut metadata = parse_body(&body)?;
    if options.sort_keys {
        metadata = sort_mapping(&metadata);
    }
    tracing::debug!(comment = %comment, lines = line_count, keys = metadata.len(), "parsed csvy header");

    Ok(Framed {
        header: Some(HeaderBlock {
            metadata,
            comment,
            line_count,
        }),
        payload: Cursor::new(Vec::new()).chain(reader),
    })
}

// A line without the block's prefix is a stray line when a marker line still follows (or it is
// one itself); otherwise the block simply never closed. Scanning ahead only happens on this
// error path.
fn unprefixed_line<R: BufRead>(
    reader: &mut R,
    comment: String,
    line: usize,
    found: String,
) -> CsvyResult<FramingError> {
    let mut lines_read = line;
    let mut closed = detect_comment(&found).is_some();
    let mut buf = Vec::new();
    while !closed {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines_read += 1;
        closed = std::str::from_utf8(&buf).ok().and_then(detect_comment).is_some();
    }
    Ok(if closed {
        FramingError::InconsistentPrefix {
            line,
            expected: comment,
            found,
        }
    } else {
        FramingError::MissingClosingMarker { comment, lines_read }
    })
}

fn parse_body(body: &str) -> CsvyResult<Metadata> {
    if body.trim().is_empty() {
        return Ok(Metadata::new());
    }
    serde_yaml::from_str(body).map_err(CsvyError::HeaderYaml)
}
