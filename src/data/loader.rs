use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::array_value_to_string;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnType, Table, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – any flat Parquet file (recommended, keeps column types)
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.csv`     – header row, one record per line, types inferred per column
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        "loaded {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "sample": "A", "temperature": 20.1, "batch": 3 },
///   { "sample": "B", "temperature": null, "batch": 4 }
/// ]
/// ```
///
/// Columns appear in order of first appearance. A key missing from a record
/// is a null cell.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

pub(crate) fn parse_json_records(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), names.len());
                names.push(key.clone());
            }
        }
    }

    let null = JsonValue::Null;
    let columns = names
        .iter()
        .map(|name| {
            let cells: Vec<&JsonValue> = records
                .iter()
                .map(|rec| rec.get(name).unwrap_or(&null))
                .collect();
            json_column(name, &cells)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Table::new(columns)?)
}

fn json_column(name: &str, cells: &[&JsonValue]) -> Result<Column> {
    let non_null = || cells.iter().filter(|v| !v.is_null());
    let dtype = if non_null().all(|v| v.is_i64()) {
        // Includes the all-null column, which stays numeric as in a data frame.
        if non_null().next().is_none() {
            ColumnType::Float
        } else {
            ColumnType::Integer
        }
    } else if non_null().all(|v| v.is_number()) {
        ColumnType::Float
    } else if non_null().all(|v| v.is_boolean()) {
        ColumnType::Bool
    } else {
        ColumnType::Text
    };
    debug!("JSON column '{name}' inferred as {dtype}");

    let values = cells
        .iter()
        .map(|v| match (dtype, v) {
            (_, JsonValue::Null) => Value::Null,
            (ColumnType::Integer, v) => v.as_i64().map_or(Value::Null, Value::Integer),
            (ColumnType::Float, v) => v.as_f64().map_or(Value::Null, Value::Float),
            (ColumnType::Bool, v) => v.as_bool().map_or(Value::Null, Value::Bool),
            (_, JsonValue::String(s)) => Value::Text(s.clone()),
            (_, other) => Value::Text(other.to_string()),
        })
        .collect();

    Ok(Column::new(name, dtype, values)?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one record per line.
///
/// Each column's type is the narrowest one every non-empty cell parses as:
/// integer, then float, then `true`/`false`, otherwise text. Empty cells are
/// null, and so is `NaN` in a float column.
fn load_csv(path: &Path) -> Result<Table> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                headers.len(),
                record.len()
            );
        }
        for (cells, field) in raw.iter_mut().zip(record.iter()) {
            cells.push(field.trim().to_string());
        }
    }

    let columns = headers
        .iter()
        .zip(raw)
        .map(|(name, cells)| csv_column(name, &cells))
        .collect::<Result<Vec<_>>>()?;

    Ok(Table::new(columns)?)
}

fn csv_column(name: &str, cells: &[String]) -> Result<Column> {
    let non_empty = || cells.iter().filter(|s| !s.is_empty());
    let dtype = if non_empty().next().is_none() {
        ColumnType::Float
    } else if non_empty().all(|s| s.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if non_empty().all(|s| s.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if non_empty().all(|s| parse_bool(s).is_some()) {
        ColumnType::Bool
    } else {
        ColumnType::Text
    };
    debug!("CSV column '{name}' inferred as {dtype}");

    let values = cells
        .iter()
        .map(|s| {
            if s.is_empty() {
                return Value::Null;
            }
            match dtype {
                ColumnType::Integer => s.parse().map_or(Value::Null, Value::Integer),
                ColumnType::Float => s.parse().map_or(Value::Null, Value::Float),
                ColumnType::Bool => parse_bool(s).map_or(Value::Null, Value::Bool),
                ColumnType::Text | ColumnType::Date => Value::Text(s.clone()),
            }
        })
        .collect();

    Ok(Column::new(name, dtype, values)?)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file.
///
/// Column types follow the Arrow schema:
/// - float and decimal types → float
/// - signed and unsigned integer types → integer
/// - `Boolean` → bool, `Date32`/`Date64` → date
/// - anything else is rendered as text
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let dtypes: Vec<ColumnType> = schema
        .fields()
        .iter()
        .map(|f| arrow_column_type(f.data_type()))
        .collect();
    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); dtypes.len()];

    let reader = builder.build().context("building parquet reader")?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, dtype) in dtypes.iter().enumerate() {
            let values = arrow_values(batch.column(col_idx), *dtype)
                .with_context(|| format!("column '{}'", schema.field(col_idx).name()))?;
            cells[col_idx].extend(values);
        }
    }

    let columns = schema
        .fields()
        .iter()
        .zip(dtypes)
        .zip(cells)
        .map(|((field, dtype), values)| Column::new(field.name().clone(), dtype, values))
        .collect::<crate::error::Result<Vec<_>>>()?;

    Ok(Table::new(columns)?)
}

// -- Parquet / Arrow helpers --

fn arrow_column_type(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => ColumnType::Float,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Integer,
        DataType::Boolean => ColumnType::Bool,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        _ => ColumnType::Text,
    }
}

/// Convert one Arrow column into cells of the given type.
fn arrow_values(col: &ArrayRef, dtype: ColumnType) -> Result<Vec<Value>> {
    let values = match dtype {
        ColumnType::Float => {
            let floats = cast(col, &DataType::Float64).context("casting to Float64")?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.map_or(Value::Null, Value::Float))
                .collect()
        }
        ColumnType::Integer => {
            let ints = cast(col, &DataType::Int64).context("casting to Int64")?;
            ints.as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map_or(Value::Null, Value::Integer))
                .collect()
        }
        ColumnType::Bool => col
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        ColumnType::Date | ColumnType::Text => (0..col.len())
            .map(|row| {
                if col.is_null(row) {
                    return Ok(Value::Null);
                }
                let s = array_value_to_string(col, row)?;
                Ok(if dtype == ColumnType::Date {
                    Value::Date(s)
                } else {
                    Value::Text(s)
                })
            })
            .collect::<std::result::Result<Vec<_>, arrow::error::ArrowError>>()
            .context("formatting values")?,
    };
    Ok(values)
}
