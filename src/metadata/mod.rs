//! Header metadata: the untyped mapping and the opt-in typed view over it.
//!
//! Every read returns the header as a [`Metadata`] mapping, exactly as the YAML parser produced
//! it. Nothing about its contents is checked on that path. Callers who want structure-checked
//! access to the well-known keys build a [`TypedHeader`] from it:
//!
//! - `encoding`: the character encoding the file claims to use
//! - `schema`: a Table Schema ([`TableSchema`])
//! - `csv_dialect`: CSV dialect settings ([`CsvDialect`])
//!
//! ```rust
//! use csvy::metadata::{Metadata, TypedHeader};
//!
//! let metadata: Metadata = serde_yaml::from_str(
//!     "schema:\n  fields:\n  - name: id\n    type: integer\n",
//! )
//! .unwrap();
//! let typed = TypedHeader::from_metadata(&metadata).unwrap();
//! assert_eq!(typed.schema.unwrap().fields[0].name, "id");
//! ```

pub mod dialect;
pub mod table_schema;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::error::{CsvyError, CsvyResult};

pub use dialect::CsvDialect;
pub use table_schema::{Constraints, FieldDescriptor, FieldType, TableSchema};

/// Ordered mapping holding the header document.
pub type Metadata = serde_yaml::Mapping;

/// Key of the informational character encoding entry.
pub const ENCODING_KEY: &str = "encoding";
/// Key of the Table Schema entry.
pub const SCHEMA_KEY: &str = "schema";
/// Key of the CSV dialect entry.
pub const DIALECT_KEY: &str = "csv_dialect";

/// Structure-checked view over a [`Metadata`] mapping.
///
/// Keys other than the well-known ones are left untouched and survive
/// [`TypedHeader::into_metadata`] in their original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedHeader {
    /// Declared character encoding. Informational only: readers never decode with it.
    pub encoding: Option<String>,
    /// Table Schema describing the payload columns.
    pub schema: Option<TableSchema>,
    /// CSV dialect of the payload.
    pub csv_dialect: Option<CsvDialect>,
    source: Metadata,
}

impl TypedHeader {
    /// Validate the well-known keys of `metadata`.
    ///
    /// Returns [`CsvyError::SchemaShape`] naming the offending key when one of them has the wrong
    /// structure. Missing keys are fine.
    pub fn from_metadata(metadata: &Metadata) -> CsvyResult<Self> {
        let encoding = match metadata.get(ENCODING_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(shape_error(
                    ENCODING_KEY,
                    format!("expected a string, found {}", value_kind(other)),
                ));
            }
        };

        let schema = typed_entry::<TableSchema>(metadata, SCHEMA_KEY)?;
        if let Some(schema) = &schema {
            schema.validate()?;
        }

        let csv_dialect = typed_entry::<CsvDialect>(metadata, DIALECT_KEY)?;
        if let Some(dialect) = &csv_dialect {
            dialect.validate()?;
        }

        Ok(Self {
            encoding,
            schema,
            csv_dialect,
            source: metadata.clone(),
        })
    }

    /// Convert back into a plain mapping, re-validating the typed entries first.
    ///
    /// Entries set to `None` are dropped; entries that did not exist in the source mapping are
    /// appended at the end.
    pub fn into_metadata(self) -> CsvyResult<Metadata> {
        if let Some(schema) = &self.schema {
            schema.validate()?;
        }
        if let Some(dialect) = &self.csv_dialect {
            dialect.validate()?;
        }

        let typed = [
            (ENCODING_KEY, self.encoding.map(Value::String)),
            (SCHEMA_KEY, self.schema.as_ref().map(to_value).transpose()?),
            (DIALECT_KEY, self.csv_dialect.as_ref().map(to_value).transpose()?),
        ];

        let mut out = Metadata::with_capacity(self.source.len() + typed.len());
        for (key, value) in &self.source {
            match typed.iter().find(|(name, _)| key.as_str() == Some(*name)) {
                Some((_, Some(replacement))) => {
                    out.insert(key.clone(), replacement.clone());
                }
                Some((_, None)) => {}
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        for (name, value) in typed {
            if let Some(value) = value {
                if !out.contains_key(name) {
                    out.insert(Value::String(name.to_string()), value);
                }
            }
        }
        Ok(out)
    }
}

/// Best-effort dialect lookup used by the untyped read/write paths.
///
/// A malformed `csv_dialect` entry is ignored with a warning instead of failing the call.
pub(crate) fn header_dialect(metadata: &Metadata) -> Option<CsvDialect> {
    lenient_entry(metadata, DIALECT_KEY, CsvDialect::validate)
}

fn lenient_entry<T: DeserializeOwned>(
    metadata: &Metadata,
    key: &str,
    validate: impl Fn(&T) -> CsvyResult<()>,
) -> Option<T> {
    let checked = typed_entry::<T>(metadata, key)
        .and_then(|entry| entry.map(|value| validate(&value).map(|()| value)).transpose());
    match checked {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring malformed header entry");
            None
        }
    }
}

fn typed_entry<T: DeserializeOwned>(metadata: &Metadata, key: &str) -> CsvyResult<Option<T>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Mapping(_)) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|e| shape_error(key, e.to_string())),
        Some(other) => Err(shape_error(
            key,
            format!("expected a mapping, found {}", value_kind(other)),
        )),
    }
}

fn to_value<T: Serialize>(value: &T) -> CsvyResult<Value> {
    serde_yaml::to_value(value).map_err(CsvyError::YamlEmit)
}

pub(crate) fn shape_error(key: &str, message: impl Into<String>) -> CsvyError {
    CsvyError::SchemaShape {
        key: key.to_string(),
        message: message.into(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Metadata {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn typed_view_reads_known_keys() {
        let md = parse(
            "name: demo\nencoding: utf-8\nschema:\n  fields:\n  - name: id\n    type: integer\ncsv_dialect:\n  delimiter: ';'\n",
        );
        let typed = TypedHeader::from_metadata(&md).unwrap();
        assert_eq!(typed.encoding.as_deref(), Some("utf-8"));
        assert_eq!(typed.schema.unwrap().fields[0].field_type, FieldType::Integer);
        assert_eq!(typed.csv_dialect.unwrap().delimiter.as_deref(), Some(";"));
    }

    #[test]
    fn missing_keys_are_not_required() {
        let typed = TypedHeader::from_metadata(&parse("name: demo\n")).unwrap();
        assert!(typed.encoding.is_none());
        assert!(typed.schema.is_none());
        assert!(typed.csv_dialect.is_none());
    }

    #[test]
    fn non_string_encoding_is_a_shape_error() {
        let err = TypedHeader::from_metadata(&parse("encoding: 8\n")).unwrap_err();
        match err {
            CsvyError::SchemaShape { key, .. } => assert_eq!(key, "encoding"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_must_be_a_mapping() {
        let err = TypedHeader::from_metadata(&parse("schema: [1, 2]\n")).unwrap_err();
        assert!(err.to_string().contains("invalid 'schema' in header"));
    }

    #[test]
    fn into_metadata_keeps_key_order() {
        let md = parse("title: t\nencoding: latin1\nauthor: me\n");
        let mut typed = TypedHeader::from_metadata(&md).unwrap();
        typed.encoding = Some("utf-8".to_string());
        typed.csv_dialect = Some(CsvDialect::unix());

        let out = typed.into_metadata().unwrap();
        let keys: Vec<&str> = out.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["title", "encoding", "author", "csv_dialect"]);
        assert_eq!(out.get("encoding").and_then(Value::as_str), Some("utf-8"));
    }

    #[test]
    fn malformed_dialect_is_ignored_on_untyped_path() {
        let md = parse("csv_dialect:\n  delimiter: ';;'\n");
        assert!(header_dialect(&md).is_none());
        let md = parse("csv_dialect:\n  delimiter: ';'\n");
        assert_eq!(header_dialect(&md).unwrap().delimiter.as_deref(), Some(";"));
    }
}
