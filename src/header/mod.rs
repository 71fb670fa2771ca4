//! Header framing: locating, parsing and re-emitting the YAML block at the start of a file.
//!
//! On disk a header block looks like this, where `<comment>` is the same (possibly empty)
//! string on every line:
//!
//! ```text
//! <comment>---
//! <comment>key: value
//! <comment>nested:
//! <comment>  field: value
//! <comment>---
//! <payload, starting immediately>
//! ```
//!
//! - [`split_header`]: read direction, auto-detects the comment string from the first line
//! - [`write_header`]: write direction
//! - [`detect_comment`]: the single-line decision used by [`split_header`]

mod comment;
mod reader;
mod writer;

use serde_yaml::{Mapping, Value};

pub use comment::{COMMENT_CHARS, MARKER, detect_comment, is_valid_comment};
pub use reader::{Framed, HeaderBlock, PayloadReader, split_header};
pub use writer::write_header;

/// Copy of `mapping` with keys sorted at every nesting level.
pub(crate) fn sort_mapping(mapping: &Mapping) -> Mapping {
    let mut entries: Vec<(&Value, &Value)> = mapping.iter().collect();
    entries.sort_by_cached_key(|(key, _)| sort_key(key));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), sort_value(value)))
        .collect()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Mapping(m) => Value::Mapping(sort_mapping(m)),
        Value::Sequence(items) => Value::Sequence(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

fn sort_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
