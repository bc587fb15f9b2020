use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Number, Value as JsonValue};

use super::model::{Column, ColumnType, Table, Value};

/// Save a table to a file.  Dispatch by extension, mirroring [`load_file`].
///
/// The row index is not written; a reloaded table gets the default `0..n`.
///
/// [`load_file`]: super::loader::load_file
pub fn save_file(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path),
        "json" => write_json(table, path),
        "csv" => write_csv(table, path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("saving {}", path.display()))?;

    info!("wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let writer = csv::Writer::from_path(path).context("creating CSV file")?;
    write_csv_to(table, writer)
}

pub(crate) fn write_csv_to<W: std::io::Write>(
    table: &Table,
    mut writer: csv::Writer<W>,
) -> Result<()> {
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;
    for row in 0..table.num_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| csv_field(&c.values()[row]))
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Cell text for CSV. Whole floats keep a decimal point so the column is
/// read back as float, and missing values become empty fields.
fn csv_field(value: &Value) -> String {
    match value {
        v if v.is_null() => String::new(),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn write_json(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &json_records(table))
        .context("writing JSON")?;
    Ok(())
}

/// Records-oriented JSON (`[{col: value, ...}, ...]`). Non-finite floats are
/// written as `null`.
pub(crate) fn json_records(table: &Table) -> JsonValue {
    let records = (0..table.num_rows())
        .map(|row| {
            let obj: Map<String, JsonValue> = table
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), json_cell(&c.values()[row])))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();
    JsonValue::Array(records)
}

fn json_cell(value: &Value) -> JsonValue {
    match value {
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Text(s) | Value::Date(s) => JsonValue::String(s.clone()),
        Value::Null => JsonValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Write a single record batch. Dates are stored as UTF-8 strings.
fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    if table.num_columns() == 0 {
        bail!("cannot write a table without columns to parquet");
    }

    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name(), arrow_data_type(c.dtype()), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays: Vec<ArrayRef> = table.columns().iter().map(arrow_array).collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn arrow_data_type(dtype: ColumnType) -> DataType {
    match dtype {
        ColumnType::Float => DataType::Float64,
        ColumnType::Integer => DataType::Int64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Text | ColumnType::Date => DataType::Utf8,
    }
}

fn arrow_array(column: &Column) -> ArrayRef {
    let values = column.values();
    match column.dtype() {
        ColumnType::Float => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Integer => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Bool => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Text | ColumnType::Date => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Text(s) | Value::Date(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
    }
}
