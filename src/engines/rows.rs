//! Row-oriented engine: nested string rows and named columns, via the `csv` crate.
//!
//! Rows may have different lengths on both read and write.

use std::io::{Read, Write};

use crate::error::{CsvyError, CsvyResult};
use crate::options::CsvFormat;
use crate::types::{ColumnNaming, Columns};

/// Read every payload record as a row of strings. No row is treated as a header.
pub fn read_rows<R: Read>(reader: R, format: &CsvFormat) -> CsvyResult<Vec<Vec<String>>> {
    let mut builder = format.reader_builder(false);
    builder.flexible(true);
    let mut rdr = builder.from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records().skip(format.skip_rows) {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Write rows and return how many were written.
pub fn write_rows<W, I, R, S>(writer: W, rows: I, format: &CsvFormat) -> CsvyResult<usize>
where
    W: Write,
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut builder = format.writer_builder();
    builder.flexible(true);
    let mut wtr = builder.from_writer(writer);

    let mut n = 0;
    for row in rows {
        wtr.write_record(row)?;
        n += 1;
    }
    wtr.flush()?;
    Ok(n)
}

/// Turn rows into named columns. Short rows are padded with `None`.
pub fn rows_to_columns(mut rows: Vec<Vec<String>>, naming: ColumnNaming) -> CsvyResult<Columns> {
    let longest = rows.iter().map(Vec::len).max().unwrap_or(0);

    let names = match naming {
        ColumnNaming::Generated => (0..longest).map(|i| format!("col_{i}")).collect(),
        ColumnNaming::FromRow(idx) => {
            if idx >= rows.len() {
                return Err(CsvyError::SchemaMismatch {
                    message: format!(
                        "column names row {idx} is out of range ({} rows)",
                        rows.len()
                    ),
                });
            }
            rows.remove(idx)
        }
        ColumnNaming::Explicit(names) => names,
    };

    if names.len() != longest {
        return Err(CsvyError::ColumnCount {
            expected: longest,
            found: names.len(),
        });
    }

    let columns = (0..longest)
        .map(|c| rows.iter().map(|row| row.get(c).cloned()).collect::<Vec<_>>())
        .collect();
    Ok(Columns::new(names, columns))
}

/// Turn named columns into rows: the names row first, then one row per index of the longest
/// column. Missing cells become empty fields.
pub fn columns_to_rows(columns: &Columns) -> CsvyResult<Vec<Vec<String>>> {
    if columns.names.len() != columns.columns.len() {
        return Err(CsvyError::SchemaMismatch {
            message: format!(
                "{} column names for {} columns",
                columns.names.len(),
                columns.columns.len()
            ),
        });
    }

    let mut rows = Vec::with_capacity(columns.height() + 1);
    rows.push(columns.names.clone());
    for r in 0..columns.height() {
        rows.push(
            columns
                .columns
                .iter()
                .map(|col| col.get(r).cloned().flatten().unwrap_or_default())
                .collect(),
        );
    }
    Ok(rows)
}

/// Interpret a JSON value as rows.
///
/// Accepted shapes:
/// - an array of arrays: one row per inner array
/// - an array of objects: a header row from the first object's keys, then one row per object
///   (missing keys become empty fields)
/// - an object of arrays: columns keyed by name
///
/// Cells must be scalars; `null` becomes an empty field. Anything else is
/// [`CsvyError::UnsupportedPayload`].
pub fn rows_from_json(value: &serde_json::Value) -> CsvyResult<Vec<Vec<String>>> {
    use serde_json::Value as J;

    match value {
        J::Array(items) if items.iter().all(J::is_array) => items
            .iter()
            .map(|item| item.as_array().map_or(Ok(Vec::new()), |cells| json_row(cells)))
            .collect(),
        J::Array(items) if items.iter().all(J::is_object) => {
            let Some(J::Object(first)) = items.first() else {
                return Ok(Vec::new());
            };
            let names: Vec<String> = first.keys().cloned().collect();
            let mut rows = Vec::with_capacity(items.len() + 1);
            rows.push(names.clone());
            for (idx0, item) in items.iter().enumerate() {
                let obj = item
                    .as_object()
                    .ok_or_else(|| unsupported(format!("row {} is not an object", idx0 + 1)))?;
                let row = names
                    .iter()
                    .map(|name| obj.get(name).map_or(Ok(String::new()), json_cell))
                    .collect::<CsvyResult<Vec<_>>>()?;
                rows.push(row);
            }
            Ok(rows)
        }
        J::Object(map) if map.values().all(J::is_array) => {
            let names: Vec<String> = map.keys().cloned().collect();
            let columns = map
                .values()
                .map(|col| {
                    col.as_array()
                        .map_or(Ok(Vec::new()), |cells| json_row(cells))
                        .map(|cells| cells.into_iter().map(Some).collect::<Vec<_>>())
                })
                .collect::<CsvyResult<Vec<_>>>()?;
            columns_to_rows(&Columns::new(names, columns))
        }
        J::Array(_) => Err(unsupported("array mixing rows and records".to_string())),
        J::Object(_) => Err(unsupported("object whose values are not all arrays".to_string())),
        other => Err(unsupported(format!("json {}", json_kind(other)))),
    }
}

fn json_row(cells: &[serde_json::Value]) -> CsvyResult<Vec<String>> {
    cells.iter().map(json_cell).collect()
}

fn json_cell(value: &serde_json::Value) -> CsvyResult<String> {
    use serde_json::Value as J;

    match value {
        J::Null => Ok(String::new()),
        J::Bool(b) => Ok(b.to_string()),
        J::Number(n) => Ok(n.to_string()),
        J::String(s) => Ok(s.clone()),
        other => Err(unsupported(format!("nested json {} in a cell", json_kind(other)))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value as J;

    match value {
        J::Null => "null",
        J::Bool(_) => "boolean",
        J::Number(_) => "number",
        J::String(_) => "string",
        J::Array(_) => "array",
        J::Object(_) => "object",
    }
}

fn unsupported(found: String) -> CsvyError {
    CsvyError::UnsupportedPayload { found }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn read_rows_keeps_ragged_rows() {
        let rows = read_rows("a,b,c\n1,2\n".as_bytes(), &CsvFormat::default()).unwrap();
        assert_eq!(rows, strings(&[&["a", "b", "c"], &["1", "2"]]));
    }

    #[test]
    fn read_rows_skips_rows() {
        let format = CsvFormat {
            skip_rows: 1,
            ..Default::default()
        };
        let rows = read_rows("skip me\n1,2\n".as_bytes(), &format).unwrap();
        assert_eq!(rows, strings(&[&["1", "2"]]));
    }

    #[test]
    fn write_rows_quotes_when_needed() {
        let mut out = Vec::new();
        let rows = strings(&[&["a", "b,c"], &["1", "say \"hi\""]]);
        let n = write_rows(&mut out, rows, &CsvFormat::default()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "a,\"b,c\"\n1,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn generated_column_names() {
        let cols = rows_to_columns(strings(&[&["1", "2", "3"], &["4"]]), ColumnNaming::Generated).unwrap();
        assert_eq!(cols.names, vec!["col_0", "col_1", "col_2"]);
        assert_eq!(cols.get("col_0").unwrap(), &[Some("1".to_string()), Some("4".to_string())]);
        assert_eq!(cols.get("col_2").unwrap(), &[Some("3".to_string()), None]);
    }

    #[test]
    fn column_names_from_row() {
        let cols = rows_to_columns(strings(&[&["x", "y"], &["1", "2"]]), ColumnNaming::FromRow(0)).unwrap();
        assert_eq!(cols.names, vec!["x", "y"]);
        assert_eq!(cols.height(), 1);

        let err = rows_to_columns(strings(&[&["x"]]), ColumnNaming::FromRow(3)).unwrap_err();
        assert!(matches!(err, CsvyError::SchemaMismatch { .. }));
    }

    #[test]
    fn explicit_names_must_match_longest_row() {
        let err = rows_to_columns(
            strings(&[&["1", "2"]]),
            ColumnNaming::Explicit(vec!["only".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, CsvyError::ColumnCount { expected: 2, found: 1 }));
    }

    #[test]
    fn columns_to_rows_pads_short_columns() {
        let cols = Columns::new(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![Some("1".to_string()), Some("2".to_string())],
                vec![Some("3".to_string())],
            ],
        );
        assert_eq!(
            columns_to_rows(&cols).unwrap(),
            strings(&[&["a", "b"], &["1", "3"], &["2", ""]])
        );
    }

    #[test]
    fn json_array_of_arrays() {
        let rows = rows_from_json(&json!([["a", "b"], [1, true], [null, 2.5]])).unwrap();
        assert_eq!(rows, strings(&[&["a", "b"], &["1", "true"], &["", "2.5"]]));
    }

    #[test]
    fn json_array_of_objects() {
        let rows = rows_from_json(&json!([{"id": 1, "name": "Ada"}, {"id": 2}])).unwrap();
        assert_eq!(rows, strings(&[&["id", "name"], &["1", "Ada"], &["2", ""]]));
    }

    #[test]
    fn json_object_of_columns() {
        let rows = rows_from_json(&json!({"a": [1, 2], "b": ["x"]})).unwrap();
        assert_eq!(rows, strings(&[&["a", "b"], &["1", "x"], &["2", ""]]));
    }

    #[test]
    fn json_non_tabular_is_unsupported() {
        for value in [json!("text"), json!(3), json!({"a": 1}), json!([1, 2]), json!([[{"a": 1}]])] {
            let err = rows_from_json(&value).unwrap_err();
            assert!(matches!(err, CsvyError::UnsupportedPayload { .. }), "{value}");
        }
    }
}
