//! `csvy` reads and writes CSVY files: CSV data preceded by a YAML metadata header.
//!
//! The header is a YAML document between two `---` marker lines. Every header line may carry
//! the same comment prefix (for example `#`), so that plain CSV tools skip it:
//!
//! ```text
//! #---
//! #name: demo
//! #---
//! a,b
//! 1,2
//! ```
//!
//! This crate owns the header: detecting it, parsing it into an ordered mapping, and writing it
//! back with a chosen comment prefix. The tabular payload is handed to an existing engine:
//!
//! - rows of strings and named columns via the `csv` crate
//! - 2D `f64` arrays via `ndarray`
//! - typed [`types::DataSet`] tables
//! - Polars eager and lazy frames
//!
//! A file without a header line is plain CSV: reads return empty metadata and the whole file
//! as payload.
//!
//! ## Quick examples
//!
//! ```rust
//! use csvy::metadata::Metadata;
//! use csvy::options::{ReadOptions, WriteOptions};
//! use csvy::read::read_to_list_from_reader;
//! use csvy::write::write_to_writer;
//!
//! # fn main() -> Result<(), csvy::CsvyError> {
//! let input = "#---\n#name: demo\n#---\na,b\n1,2\n";
//! let (rows, metadata) = read_to_list_from_reader(input.as_bytes(), &ReadOptions::default())?;
//! assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
//! assert_eq!(metadata.get("name").and_then(|v| v.as_str()), Some("demo"));
//!
//! let opts = WriteOptions {
//!     comment: "#".to_string(),
//!     ..Default::default()
//! };
//! let mut out = Vec::new();
//! write_to_writer(&mut out, &rows, &metadata, &opts)?;
//! assert_eq!(String::from_utf8(out).unwrap(), input);
//!
//! // An empty mapping still produces the two marker lines.
//! let mut out = Vec::new();
//! write_to_writer(&mut out, &rows, &Metadata::new(), &WriteOptions::default())?;
//! assert_eq!(String::from_utf8(out).unwrap(), "---\n---\na,b\n1,2\n");
//! # Ok(())
//! # }
//! ```
//!
//! Typed access to the well-known header keys (`encoding`, `schema`, `csv_dialect`) is opt-in:
//!
//! ```rust
//! use csvy::metadata::TypedHeader;
//! use csvy::options::ReadOptions;
//! use csvy::read::read_metadata_from_reader;
//!
//! # fn main() -> Result<(), csvy::CsvyError> {
//! let input = "---\nschema:\n  fields:\n  - name: id\n    type: integer\n---\nid\n1\n";
//! let metadata = read_metadata_from_reader(input.as_bytes(), &ReadOptions::default())?;
//! let typed = TypedHeader::from_metadata(&metadata)?;
//! assert_eq!(typed.schema.map(|s| s.fields.len()), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`read`] / [`write`]: entry points, path-based with reader/writer twins
//! - [`header`]: the framing layer on its own, for driving any CSV engine by hand
//! - [`metadata`]: the header mapping and its typed view
//! - [`options`]: CSV, YAML and encoding options
//! - [`engines`]: the tabular engines
//! - [`observability`]: opt-in observer hooks
//! - [`error`]: the error type shared by every operation

pub mod engines;
pub mod error;
pub mod header;
pub mod metadata;
pub mod observability;
pub mod options;
pub mod read;
pub mod types;
pub mod write;

pub use engines::{Container, PolarsFrame};
pub use error::{CsvyError, CsvyResult, FramingError};
pub use metadata::{Metadata, TypedHeader};
pub use read::{
    HeaderInfo, read_header, read_metadata, read_to_array, read_to_columns, read_to_dataframe,
    read_to_list, read_to_polars_frame,
};
pub use write::{Payload, Writer, write, write_to_writer};
