//! Typed [`DataSet`] tables.

use std::io::{Read, Write};

use crate::error::{CsvyError, CsvyResult};
use crate::options::CsvFormat;
use crate::types::{DataSet, DataType, Schema, Value};

/// Read the payload into a [`DataSet`].
///
/// Rules:
///
/// - The first payload row (after `skip_rows`) holds the column names.
/// - With a `schema`, the names must contain all schema fields (order can differ) and each
///   value is parsed according to the field type.
/// - Without one, every column is read as [`DataType::Utf8`].
/// - Empty cells are [`Value::Null`].
pub fn read_dataset<R: Read>(
    reader: R,
    schema: Option<&Schema>,
    format: &CsvFormat,
) -> CsvyResult<DataSet> {
    let mut builder = format.reader_builder(false);
    builder.flexible(true);
    let mut rdr = builder.from_reader(reader);
    let mut records = rdr.records().skip(format.skip_rows);

    let headers = match records.next() {
        Some(result) => result?,
        None => csv::StringRecord::new(),
    };
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => Schema::utf8(headers.iter()),
    };

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(CsvyError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in records.enumerate() {
        // 1-based payload row for users; +1 again because of the names row.
        let user_row = format.skip_rows + row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = record.get(csv_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, &field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

/// Write the names row then one record per row. Returns the number of data rows.
pub fn write_dataset<W: Write>(writer: W, dataset: &DataSet, format: &CsvFormat) -> CsvyResult<usize> {
    let mut wtr = format.writer_builder().from_writer(writer);
    wtr.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(format_value))?;
    }
    wtr.flush()?;
    Ok(dataset.row_count())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Utf8(v) => v.clone(),
    }
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> CsvyResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| CsvyError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
