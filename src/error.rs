use crate::data::model::ColumnType;

/// Errors raised while building tables, estimating bounds, or filtering.
#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    /// Sigma clipping was asked to work on zero non-null values.
    #[error("no non-null values to clip{}", column_suffix(.column))]
    EmptyInput { column: Option<String> },

    /// Bounding was requested on a column that is not numeric.
    #[error("column '{column}' has type {dtype}, which cannot be bounded")]
    UnsupportedColumnType { column: String, dtype: ColumnType },

    /// The named column does not exist in the table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A multiplier or threshold was negative or not finite.
    #[error("invalid value for {name}: {value} (expected a finite, non-negative number)")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("column '{column}' has {found} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' is declared {dtype} but row {row} holds another type")]
    TypeMismatch {
        column: String,
        dtype: ColumnType,
        row: usize,
    },

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("duplicate row index: {0}")]
    DuplicateIndex(u64),
}

impl FenceError {
    /// Attach a column name to an error raised on a bare slice of values.
    pub fn in_column(self, name: &str) -> Self {
        match self {
            FenceError::EmptyInput { column: None } => FenceError::EmptyInput {
                column: Some(name.to_string()),
            },
            other => other,
        }
    }
}

fn column_suffix(column: &Option<String>) -> String {
    column
        .as_deref()
        .map(|c| format!(" in column '{c}'"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, FenceError>;
