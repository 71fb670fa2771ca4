//! Write direction: render a metadata mapping as a marker-delimited header block.

use std::io::Write;

use serde_yaml::Value;

use crate::error::{CsvyError, CsvyResult};
use crate::metadata::Metadata;
use crate::options::{WriteOptions, YamlOptions};

use super::comment::{MARKER, is_valid_comment};
use super::sort_mapping;

/// Write `metadata` as a header block and return the number of lines written.
///
/// Every line, both marker lines included, starts with `options.comment` and ends with `\n`.
/// An empty mapping still produces a block made of the two marker lines. With
/// `options.line_buffering` every line is flushed as soon as it is written, otherwise the
/// writer is flushed once at the end.
///
/// ```rust
/// use csvy::header::write_header;
/// use csvy::metadata::Metadata;
/// use csvy::options::WriteOptions;
///
/// let mut metadata = Metadata::new();
/// metadata.insert("name".into(), "demo".into());
/// let opts = WriteOptions {
///     comment: "#".to_string(),
///     ..Default::default()
/// };
///
/// let mut out = Vec::new();
/// assert_eq!(write_header(&mut out, &metadata, &opts).unwrap(), 3);
/// assert_eq!(String::from_utf8(out).unwrap(), "#---\n#name: demo\n#---\n");
/// ```
pub fn write_header<W: Write + ?Sized>(
    writer: &mut W,
    metadata: &Metadata,
    options: &WriteOptions,
) -> CsvyResult<usize> {
    let comment = options.comment.as_str();
    if !is_valid_comment(comment) {
        return Err(CsvyError::InvalidComment {
            comment: comment.to_string(),
        });
    }

    let body = render_yaml(metadata, &options.yaml)?;
    let mut lines = 0;
    let mut emit = |text: &str| -> CsvyResult<()> {
        writer.write_all(comment.as_bytes())?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        if options.line_buffering {
            writer.flush()?;
        }
        lines += 1;
        Ok(())
    };

    emit(MARKER)?;
    for line in body.lines() {
        emit(line)?;
    }
    emit(MARKER)?;

    if !options.line_buffering {
        writer.flush()?;
    }
    Ok(lines)
}

/// Serialize the mapping to a YAML document; empty for an empty mapping.
pub(crate) fn render_yaml(metadata: &Metadata, options: &YamlOptions) -> CsvyResult<String> {
    if metadata.is_empty() {
        return Ok(String::new());
    }
    let text = if options.sort_keys {
        serde_yaml::to_string(&Value::Mapping(sort_mapping(metadata)))
    } else {
        serde_yaml::to_string(metadata)
    };
    text.map_err(CsvyError::YamlEmit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(text: &str) -> Metadata {
        serde_yaml::from_str(text).unwrap()
    }

    fn render(md: &Metadata, opts: &WriteOptions) -> String {
        let mut out = Vec::new();
        write_header(&mut out, md, opts).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_mapping_writes_two_markers() {
        let out = render(&Metadata::new(), &WriteOptions::default());
        assert_eq!(out, "---\n---\n");
    }

    #[test]
    fn every_line_gets_the_comment() {
        let md = metadata("name: demo\nnested:\n  field: value\n");
        let opts = WriteOptions {
            comment: "# ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            render(&md, &opts),
            "# ---\n# name: demo\n# nested:\n#   field: value\n# ---\n"
        );
    }

    #[test]
    fn keeps_insertion_order_unless_sorted() {
        let md = metadata("b: 1\na: 2\n");
        assert_eq!(render(&md, &WriteOptions::default()), "---\nb: 1\na: 2\n---\n");

        let opts = WriteOptions {
            yaml: YamlOptions { sort_keys: true },
            ..Default::default()
        };
        assert_eq!(render(&md, &opts), "---\na: 2\nb: 1\n---\n");
    }

    #[test]
    fn rejects_undetectable_comment() {
        let opts = WriteOptions {
            comment: "rem ".to_string(),
            ..Default::default()
        };
        let err = write_header(&mut Vec::new(), &Metadata::new(), &opts).unwrap_err();
        assert!(matches!(err, CsvyError::InvalidComment { .. }));
    }

    #[derive(Default)]
    struct CountingWriter {
        data: Vec<u8>,
        flushes: usize,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn line_buffering_flushes_each_line() {
        let md = metadata("a: 1\nb: 2\n");

        let mut block = CountingWriter::default();
        write_header(&mut block, &md, &WriteOptions::default()).unwrap();
        assert_eq!(block.flushes, 1);

        let mut line = CountingWriter::default();
        let opts = WriteOptions {
            line_buffering: true,
            ..Default::default()
        };
        assert_eq!(write_header(&mut line, &md, &opts).unwrap(), 4);
        assert_eq!(line.flushes, 4);
        assert_eq!(line.data, block.data);
    }
}
