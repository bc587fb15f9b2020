//! Load, filter and save tables through the supported file formats.

use std::fs;

use rusty_fence::data::{loader, writer};
use rusty_fence::{Column, ColumnType, DatasetFilter, Table, Value};
use tempfile::TempDir;

fn mixed_table() -> Table {
    Table::new(vec![
        Column::text("sample", [Some("A"), Some("B"), Some("C"), Some("D")]),
        Column::float("reading", [Some(2.0), None, Some(0.25), Some(-7.5)]),
        Column::integer("batch", [Some(1), Some(1), None, Some(2)]),
        Column::new(
            "ok",
            ColumnType::Bool,
            vec![Value::Bool(true), Value::Bool(false), Value::Null, Value::Bool(true)],
        )
        .unwrap(),
    ])
    .unwrap()
}

#[test]
fn every_format_round_trips() {
    let dir = TempDir::new().unwrap();
    let table = mixed_table();

    for name in ["table.csv", "table.json", "table.parquet"] {
        let path = dir.path().join(name);
        writer::save_file(&table, &path).unwrap();
        let loaded = loader::load_file(&path).unwrap();
        assert_eq!(loaded, table, "round trip through {name}");
    }
}

#[test]
fn csv_file_is_filtered_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.csv");
    fs::write(
        &input,
        "label,v\na,1\nb,2\nc,2\nd,3\ne,3\nf,3\ng,4\nh,4\ni,5\nj,100\n",
    )
    .unwrap();

    let table = loader::load_file(&input).unwrap();
    assert_eq!(table.column("v").unwrap().dtype(), ColumnType::Integer);

    let filtered = DatasetFilter::quartile(1.5).filter_table(&table).unwrap();
    assert_eq!(filtered.num_rows(), 9);

    let output = dir.path().join("output.csv");
    writer::save_file(filtered.table(), &output).unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("label,v\na,1\n"));
    assert!(!text.contains("100"));
}

#[test]
fn unsupported_output_extension_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = writer::save_file(&mixed_table(), &dir.path().join("table.xlsx")).unwrap_err();
    assert!(err.to_string().contains("Unsupported file extension"));
}
