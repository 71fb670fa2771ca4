//! 2D numeric arrays, via `ndarray`.

use std::io::{Read, Write};

use ndarray::Array2;

use crate::error::{CsvyError, CsvyResult};
use crate::options::CsvFormat;

/// Read the payload as a rectangular `f64` array.
///
/// Every record must have the same number of fields and every field must parse as a float
/// (surrounding whitespace is ignored). An empty payload gives a `0 x 0` array.
pub fn read_array<R: Read>(reader: R, format: &CsvFormat) -> CsvyResult<Array2<f64>> {
    let mut builder = format.reader_builder(false);
    builder.flexible(false);
    let mut rdr = builder.from_reader(reader);

    let mut values = Vec::new();
    let mut nrows = 0;
    let mut ncols = 0;
    for (idx0, result) in rdr.records().skip(format.skip_rows).enumerate() {
        let record = result?;
        // 1-based payload row, counting skipped rows.
        let row = format.skip_rows + idx0 + 1;
        for (col, raw) in record.iter().enumerate() {
            let value = raw.trim().parse::<f64>().map_err(|e| CsvyError::ParseError {
                row,
                column: col.to_string(),
                raw: raw.to_string(),
                message: e.to_string(),
            })?;
            values.push(value);
        }
        ncols = record.len();
        nrows += 1;
    }

    Array2::from_shape_vec((nrows, ncols), values).map_err(|e| CsvyError::SchemaMismatch {
        message: format!("array payload is not rectangular: {e}"),
    })
}

/// Write one record per array row and return the number of rows written.
///
/// Values use the shortest representation that parses back to the same `f64`.
pub fn write_array<W: Write>(writer: W, array: &Array2<f64>, format: &CsvFormat) -> CsvyResult<usize> {
    let mut wtr = format.writer_builder().from_writer(writer);
    for row in array.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(array.nrows())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn reads_rectangular_payload() {
        let arr = read_array("1,2.5,3\n4, 5 ,-6e2\n".as_bytes(), &CsvFormat::default()).unwrap();
        assert_eq!(arr, array![[1.0, 2.5, 3.0], [4.0, 5.0, -600.0]]);
    }

    #[test]
    fn empty_payload_is_empty_array() {
        let arr = read_array("".as_bytes(), &CsvFormat::default()).unwrap();
        assert_eq!(arr.dim(), (0, 0));
    }

    #[test]
    fn non_numeric_cell_reports_position() {
        let err = read_array("1,2\n3,x\n".as_bytes(), &CsvFormat::default()).unwrap_err();
        match err {
            CsvyError::ParseError { row, column, raw, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "1");
                assert_eq!(raw, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = read_array("1,2\n3\n".as_bytes(), &CsvFormat::default()).unwrap_err();
        assert!(matches!(err, CsvyError::Csv(_)));
    }

    #[test]
    fn write_then_read_is_exact() {
        let arr = array![[0.1, 1.0 / 3.0], [f64::MAX, -0.0]];
        let mut out = Vec::new();
        assert_eq!(write_array(&mut out, &arr, &CsvFormat::default()).unwrap(), 2);
        let back = read_array(out.as_slice(), &CsvFormat::default()).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn uses_configured_delimiter() {
        let format = CsvFormat {
            delimiter: b' ',
            ..Default::default()
        };
        let mut out = Vec::new();
        write_array(&mut out, &array![[1.0, 2.0]], &format).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 2\n");
    }
}
