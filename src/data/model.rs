use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FenceError, Result};

// ---------------------------------------------------------------------------
// ColumnType – the declared element type of a column
// ---------------------------------------------------------------------------

/// Declared element type of a column, mirroring the common data-frame dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float,
    Integer,
    Text,
    Bool,
    /// ISO-8601 date kept as text.
    Date,
}

impl ColumnType {
    /// Only numeric columns take part in bounding.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Integer)
    }

    /// Whether a cell value may be stored in a column of this type.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Float, Value::Float(_))
                | (ColumnType::Integer, Value::Integer(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Bool, Value::Bool(_))
                | (ColumnType::Date, Value::Date(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Float => "float",
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(i64),
    Text(String),
    Bool(bool),
    Date(String),
    Null,
}

impl Value {
    /// Numeric view of the cell. `Null` and `Float(NaN)` are absent.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if !v.is_nan() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// `Null`, or a float NaN (the usual data-frame spelling of a missing number).
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Name and type tag of a column, without its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    pub name: String,
    pub dtype: ColumnType,
}

/// A named, typed column of nullable cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, checking every non-null cell against `dtype`.
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if let Some(row) = values.iter().position(|v| !dtype.accepts(v)) {
            return Err(FenceError::TypeMismatch {
                column: name,
                dtype,
                row,
            });
        }
        Ok(Column {
            name,
            dtype,
            values,
        })
    }

    pub fn float(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Column {
            name: name.into(),
            dtype: ColumnType::Float,
            values: values
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Float))
                .collect(),
        }
    }

    pub fn integer(name: impl Into<String>, values: impl IntoIterator<Item = Option<i64>>) -> Self {
        Column {
            name: name.into(),
            dtype: ColumnType::Integer,
            values: values
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Integer))
                .collect(),
        }
    }

    pub fn text<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Column {
            name: name.into(),
            dtype: ColumnType::Text,
            values: values
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.into())))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            name: self.name.clone(),
            dtype: self.dtype,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The non-null values of a numeric column, in row order.
    ///
    /// Fails with [`FenceError::UnsupportedColumnType`] for non-numeric columns.
    pub fn numeric_values(&self) -> Result<Vec<f64>> {
        if !self.dtype.is_numeric() {
            return Err(FenceError::UnsupportedColumnType {
                column: self.name.clone(),
                dtype: self.dtype,
            });
        }
        Ok(self.values.iter().filter_map(Value::as_f64).collect())
    }

    fn take(&self, positions: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: positions.iter().map(|&p| self.values[p].clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – ordered named columns sharing a row index
// ---------------------------------------------------------------------------

/// An ordered collection of equally long columns with a stable row index.
///
/// The row index carries row identity: values are unique, and survive
/// filtering as the `source_index` of a [`FilteredTable`](crate::data::filter::FilteredTable).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    index: Vec<u64>,
}

impl Table {
    /// Build a table with the default index `0..n`.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, Column::len);
        Self::with_index(columns, (0..rows as u64).collect())
    }

    /// Build a table with an explicit row index.
    pub fn with_index(columns: Vec<Column>, index: Vec<u64>) -> Result<Self> {
        let mut names = HashSet::new();
        for col in &columns {
            if !names.insert(col.name()) {
                return Err(FenceError::DuplicateColumn(col.name().to_string()));
            }
            if col.len() != index.len() {
                return Err(FenceError::LengthMismatch {
                    column: col.name().to_string(),
                    expected: index.len(),
                    found: col.len(),
                });
            }
        }
        let mut seen = HashSet::with_capacity(index.len());
        if let Some(dup) = index.iter().find(|id| !seen.insert(**id)) {
            return Err(FenceError::DuplicateIndex(*dup));
        }
        Ok(Table { columns, index })
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| FenceError::ColumnNotFound(name.to_string()))
    }

    /// Descriptors of the numeric columns, in declared order.
    pub fn numeric_descriptors(&self) -> Vec<ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.dtype().is_numeric())
            .map(Column::descriptor)
            .collect()
    }

    /// Keep the rows at `positions` (ascending), reindexed to `0..m`.
    ///
    /// Returns the new table and the original index values of the kept rows.
    pub(crate) fn select_rows(&self, positions: &[usize]) -> (Table, Vec<u64>) {
        let source_index = positions.iter().map(|&p| self.index[p]).collect();
        let table = Table {
            columns: self.columns.iter().map(|c| c.take(positions)).collect(),
            index: (0..positions.len() as u64).collect(),
        };
        (table, source_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::float("a", [Some(1.0), None, Some(f64::NAN)]),
            Column::text("label", [Some("x"), Some("y"), None]),
            Column::integer("n", [Some(1), Some(2), Some(3)]),
        ])
        .unwrap()
    }

    #[test]
    fn default_index_is_contiguous() {
        let t = sample();
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.index(), &[0, 1, 2]);
    }

    #[test]
    fn nan_and_null_are_both_absent() {
        let t = sample();
        let a = t.column("a").unwrap();
        assert!(a.values()[1].is_null());
        assert!(a.values()[2].is_null());
        assert_eq!(a.numeric_values().unwrap(), vec![1.0]);
    }

    #[test]
    fn numeric_descriptors_keep_declared_order() {
        let names: Vec<String> = sample()
            .numeric_descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["a", "n"]);
    }

    #[test]
    fn text_column_cannot_be_bounded() {
        let t = sample();
        let err = t.column("label").unwrap().numeric_values().unwrap_err();
        assert!(matches!(
            err,
            FenceError::UnsupportedColumnType { dtype: ColumnType::Text, .. }
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let err = sample().column("nope").unwrap_err();
        assert!(matches!(err, FenceError::ColumnNotFound(ref c) if c == "nope"));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::float("a", [Some(1.0), Some(2.0)]),
            Column::float("b", [Some(1.0)]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            FenceError::LengthMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn rejects_duplicate_index_and_names() {
        let err = Table::with_index(vec![Column::float("a", [Some(1.0), Some(2.0)])], vec![7, 7])
            .unwrap_err();
        assert!(matches!(err, FenceError::DuplicateIndex(7)));

        let err = Table::new(vec![
            Column::float("a", [Some(1.0)]),
            Column::float("a", [Some(2.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, FenceError::DuplicateColumn(_)));
    }

    #[test]
    fn column_new_checks_cell_types() {
        let err = Column::new(
            "a",
            ColumnType::Float,
            vec![Value::Float(1.0), Value::Text("x".into())],
        )
        .unwrap_err();
        assert!(matches!(err, FenceError::TypeMismatch { row: 1, .. }));
    }

    #[test]
    fn select_rows_reindexes_and_remembers_identity() {
        let t = Table::with_index(
            vec![Column::integer("n", [Some(10), Some(20), Some(30)])],
            vec![5, 9, 11],
        )
        .unwrap();
        let (kept, source) = t.select_rows(&[0, 2]);
        assert_eq!(kept.index(), &[0, 1]);
        assert_eq!(source, vec![5, 11]);
        assert_eq!(
            kept.column("n").unwrap().values(),
            &[Value::Integer(10), Value::Integer(30)]
        );
    }
}
