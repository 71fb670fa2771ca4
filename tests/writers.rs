use std::fs;

use csvy::metadata::Metadata;
use csvy::options::{CsvOptions, LineTerminator, ReadOptions, WriteOptions};
use csvy::read::{read_header, read_to_columns, read_to_list, read_to_polars_frame};
use csvy::types::{ColumnNaming, Columns};
use csvy::write::{Payload, Writer, write};
use csvy::{Container, CsvyError};
use serde_json::json;
use tempfile::tempdir;

fn demo_metadata() -> Metadata {
    serde_yaml::from_str("name: demo\nowner: ada\n").unwrap()
}

#[test]
fn columns_payload_writes_names_then_cells() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("columns.csvy");
    let columns = Columns::new(
        vec!["x".to_string(), "y".to_string()],
        vec![
            vec![Some("1".to_string()), Some("2".to_string())],
            vec![Some("a".to_string()), None],
        ],
    );

    write(&path, &columns, &demo_metadata(), &WriteOptions::default()).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\nname: demo\nowner: ada\n---\nx,y\n1,a\n2,\n"
    );

    let (read_back, _) = read_to_columns(&path, ColumnNaming::FromRow(0), &ReadOptions::default()).unwrap();
    assert_eq!(read_back.get("y").unwrap(), &[Some("a".to_string()), Some(String::new())]);
}

#[test]
fn json_payload_shapes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("json.csvy");

    let records = json!([{"id": 1, "ok": true}, {"id": 2, "ok": false}]);
    write(&path, &records, &Metadata::new(), &WriteOptions::default()).unwrap();
    let (rows, _) = read_to_list(&path, &ReadOptions::default()).unwrap();
    assert_eq!(rows, vec![vec!["id", "ok"], vec!["1", "true"], vec!["2", "false"]]);

    let scalar = json!(42);
    let err = write(&path, &scalar, &Metadata::new(), &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, CsvyError::UnsupportedPayload { .. }));
}

#[test]
fn unsupported_payload_leaves_existing_file_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keep.csvy");
    fs::write(&path, "keep me\n").unwrap();

    let nested = json!([[{"deep": 1}]]);
    let err = write(&path, &nested, &Metadata::new(), &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, CsvyError::UnsupportedPayload { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");
}

#[test]
fn polars_frames_round_trip_through_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.csvy");
    let df = polars::df!("id" => [1i64, 2, 3], "name" => ["a", "b", "c"]).unwrap();

    let opts = WriteOptions {
        comment: "# ".to_string(),
        ..Default::default()
    };
    write(&path, &df, &demo_metadata(), &opts).unwrap();

    let (frame, metadata) = read_to_polars_frame(&path, true, &ReadOptions::default()).unwrap();
    assert_eq!(metadata, demo_metadata());
    assert!(frame.collect().unwrap().equals(&df));
}

#[test]
fn csv_options_shape_the_payload() {
    let rows = vec![vec!["a b".to_string(), "c".to_string()]];
    let opts = WriteOptions {
        csv: CsvOptions {
            delimiter: Some(b'\t'),
            line_terminator: Some(LineTerminator::Crlf),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut out = Vec::new();
    csvy::write_to_writer(&mut out, &rows, &Metadata::new(), &opts).unwrap();
    // The header keeps `\n`; only the payload uses the CSV terminator.
    assert_eq!(String::from_utf8(out).unwrap(), "---\n---\na b\tc\r\n");
}

#[test]
fn payload_container_tags() {
    let rows: Vec<Vec<String>> = Vec::new();
    let value = json!([]);
    assert_eq!(Payload::from(&rows).container(), Container::Rows);
    assert_eq!(Payload::from(&value).container(), Container::Rows);
}

#[test]
fn incremental_writer_line_buffered_file_is_readable_mid_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stream.csvy");
    let opts = WriteOptions {
        comment: "#".to_string(),
        line_buffering: true,
        ..Default::default()
    };

    let mut writer = Writer::create(&path, &demo_metadata(), &opts).unwrap();
    let info = read_header(&path, &ReadOptions::default()).unwrap();
    assert_eq!(info.metadata, demo_metadata());
    assert_eq!(info.comment, "#");

    writer.write_row(["t", "v"]).unwrap();
    writer.write_row(["0", "1.5"]).unwrap();
    let (rows, _) = read_to_list(&path, &ReadOptions::default()).unwrap();
    assert_eq!(rows, vec![vec!["t", "v"], vec!["0", "1.5"]]);

    writer.write_rows([["1", "2.5"], ["2", "3.5"]]).unwrap();
    writer.finish().unwrap();
    let (rows, _) = read_to_list(&path, &ReadOptions::default()).unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn incremental_writer_refuses_bad_comment_before_creating_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never.csvy");
    let opts = WriteOptions {
        comment: "--".to_string(),
        ..Default::default()
    };
    let err = Writer::create(&path, &Metadata::new(), &opts).unwrap_err();
    assert!(matches!(err, CsvyError::InvalidComment { .. }));
    assert!(!path.exists());
}

#[test]
fn incremental_writer_is_utf8_only() {
    let opts = WriteOptions {
        encoding: "latin1".to_string(),
        ..Default::default()
    };
    let err = Writer::from_writer(Vec::new(), &Metadata::new(), &opts).unwrap_err();
    assert!(matches!(err, CsvyError::InvalidOption { .. }));
}
