use log::{debug, info, warn};
use rayon::prelude::*;

use super::model::{Column, ColumnDescriptor, Table, Value};
use crate::error::{FenceError, Result};
use crate::stats::{Bounds, Method};

// ---------------------------------------------------------------------------
// Filter output
// ---------------------------------------------------------------------------

/// Bounds applied to one column during a filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBounds {
    pub column: String,
    pub bounds: Bounds,
}

/// A table obtained from another by removing rows.
///
/// The rows keep their relative order and their values. The row index is
/// always reset to `0..m`; the identities the rows had in the input table are
/// available from [`FilteredTable::source_index`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTable {
    table: Table,
    source_index: Vec<u64>,
    input_rows: usize,
    applied: Vec<ColumnBounds>,
}

impl FilteredTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Input row index values of the retained rows, in output order.
    pub fn source_index(&self) -> &[u64] {
        &self.source_index
    }

    /// Per-column bounds that decided which rows were kept.
    pub fn applied(&self) -> &[ColumnBounds] {
        &self.applied
    }

    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }

    /// Number of input rows that were dropped.
    pub fn removed(&self) -> usize {
        self.input_rows - self.table.num_rows()
    }
}

// ---------------------------------------------------------------------------
// DatasetFilter
// ---------------------------------------------------------------------------

/// Removes outlier rows from a table using one bound estimation method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetFilter {
    method: Method,
    parallel: bool,
}

impl Default for DatasetFilter {
    fn default() -> Self {
        DatasetFilter::new(Method::default())
    }
}

impl DatasetFilter {
    pub fn new(method: Method) -> Self {
        DatasetFilter {
            method,
            parallel: true,
        }
    }

    /// Sigma clipping at the default thresholds, the convention for whole tables.
    pub fn sigma() -> Self {
        DatasetFilter::default()
    }

    pub fn quartile(k: f64) -> Self {
        DatasetFilter::new(Method::iqr(k))
    }

    /// Compute per-column bounds on the rayon pool (the default) or inline.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Bounds of every numeric column, in declared column order.
    ///
    /// Each column is estimated on the full input independently of the
    /// others. The first failing column in declared order is reported.
    pub fn table_bounds(&self, table: &Table) -> Result<Vec<ColumnBounds>> {
        self.method.validate()?;
        let descriptors = table.numeric_descriptors();
        let estimate = |d: &ColumnDescriptor| -> Result<ColumnBounds> {
            let bounds = self.method.column_bounds(table.column(&d.name)?)?;
            debug!("column '{}': bounds {bounds}", d.name);
            if bounds.is_empty() {
                warn!("column '{}' has no values, bounds are empty", d.name);
            } else if bounds.is_degenerate() {
                warn!(
                    "column '{}' has no spread, bounds collapse to {}",
                    d.name, bounds.lower
                );
            }
            Ok(ColumnBounds {
                column: d.name.clone(),
                bounds,
            })
        };

        let results: Vec<Result<ColumnBounds>> = if self.parallel {
            descriptors.par_iter().map(estimate).collect()
        } else {
            descriptors.iter().map(estimate).collect()
        };
        results.into_iter().collect()
    }

    /// Whole-table mode: keep a row only if every numeric column holds either
    /// a null or a value inside that column's bounds.
    ///
    /// Non-numeric columns are carried through and never used as criteria.
    pub fn filter_table(&self, table: &Table) -> Result<FilteredTable> {
        let applied = self.table_bounds(table)?;
        let checks = applied
            .iter()
            .map(|cb| Ok((table.column(&cb.column)?, cb.bounds)))
            .collect::<Result<Vec<_>>>()?;
        let filtered = build(table, &checks, applied.clone());
        info!(
            "{}: kept {} of {} rows across {} numeric columns",
            self.method,
            filtered.num_rows(),
            table.num_rows(),
            applied.len()
        );
        Ok(filtered)
    }

    /// Single-column mode with bounds estimated on that column.
    pub fn filter_column(&self, table: &Table, column: &str) -> Result<FilteredTable> {
        self.method.validate()?;
        let bounds = self.method.column_bounds(table.column(column)?)?;
        debug!("column '{column}': bounds {bounds}");
        filter_by_bounds(table, column, bounds)
    }
}

/// Single-column mode: keep a row if its value in `column` is null or lies
/// within `bounds`. Other columns are untouched.
pub fn filter_by_bounds(table: &Table, column: &str, bounds: Bounds) -> Result<FilteredTable> {
    let col = table.column(column)?;
    if !col.dtype().is_numeric() {
        return Err(FenceError::UnsupportedColumnType {
            column: column.to_string(),
            dtype: col.dtype(),
        });
    }
    let filtered = build(
        table,
        &[(col, bounds)],
        vec![ColumnBounds {
            column: column.to_string(),
            bounds,
        }],
    );
    info!(
        "column '{column}' within {bounds}: kept {} of {} rows",
        filtered.num_rows(),
        table.num_rows()
    );
    Ok(filtered)
}

fn admits(bounds: &Bounds, cell: &Value) -> bool {
    cell.is_null() || cell.as_f64().is_some_and(|v| bounds.contains(v))
}

fn build(table: &Table, checks: &[(&Column, Bounds)], applied: Vec<ColumnBounds>) -> FilteredTable {
    let keep: Vec<usize> = (0..table.num_rows())
        .filter(|&row| {
            checks
                .iter()
                .all(|(col, bounds)| admits(bounds, &col.values()[row]))
        })
        .collect();
    let (kept, source_index) = table.select_rows(&keep);
    FilteredTable {
        table: kept,
        source_index,
        input_rows: table.num_rows(),
        applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;
    use crate::stats::SigmaClip;

    const WORKED: [f64; 10] = [1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0, 100.0];

    fn worked_table() -> Table {
        Table::new(vec![
            Column::text("id", (0..10).map(|i| Some(format!("r{i}")))),
            Column::float("v", WORKED.map(Some)),
        ])
        .unwrap()
    }

    #[test]
    fn quartile_drops_the_spike() {
        let out = DatasetFilter::quartile(1.5)
            .filter_table(&worked_table())
            .unwrap();
        assert_eq!(out.num_rows(), 9);
        assert_eq!(out.removed(), 1);
        assert_eq!(out.source_index(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(out.table().index(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn sigma_keeps_the_spike_in_a_short_column() {
        let out = DatasetFilter::sigma().filter_table(&worked_table()).unwrap();
        assert_eq!(out.num_rows(), 10);
        assert_eq!(out.applied().len(), 1);
        assert_eq!(out.applied()[0].column, "v");
    }

    #[test]
    fn row_is_dropped_when_any_column_rejects_it() {
        let t = Table::new(vec![
            Column::float("a", [Some(2.0), Some(2.0), Some(3.0), Some(2.0), Some(2.5)]),
            Column::float("b", [Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(9.0)]),
        ])
        .unwrap();
        let out = DatasetFilter::quartile(1.5).filter_table(&t).unwrap();
        // "b" has no spread, so its fence is [1, 1] and the last row fails it.
        assert_eq!(out.source_index(), &[0, 1, 2, 3]);
    }

    #[test]
    fn nulls_and_text_columns_pass_through() {
        let t = Table::with_index(
            vec![
                Column::float(
                    "v",
                    [Some(1.0), None, Some(2.0), Some(1.5), Some(500.0), Some(f64::NAN)],
                ),
                Column::text(
                    "tag",
                    [Some("a"), None, Some("c"), Some("d"), Some("e"), Some("f")],
                ),
            ],
            vec![10, 11, 12, 13, 14, 15],
        )
        .unwrap();
        let out = DatasetFilter::quartile(1.5).filter_table(&t).unwrap();
        assert_eq!(out.source_index(), &[10, 11, 12, 13, 15]);
        assert_eq!(out.table().num_columns(), 2);
        assert_eq!(out.table().column("tag").unwrap().values()[1], Value::Null);
    }

    #[test]
    fn input_is_not_modified() {
        let t = worked_table();
        let before = t.clone();
        DatasetFilter::quartile(1.5).filter_table(&t).unwrap();
        DatasetFilter::sigma().filter_column(&t, "v").unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn parallel_and_inline_agree() {
        let t = Table::new(vec![
            Column::float("a", (0..200).map(|i| Some((i % 17) as f64))),
            Column::integer("b", (0..200).map(|i| Some(if i == 33 { 10_000 } else { i % 5 }))),
            Column::float("c", (0..200).map(|i| if i % 9 == 0 { None } else { Some(i as f64) })),
        ])
        .unwrap();
        let par = DatasetFilter::sigma().filter_table(&t).unwrap();
        let seq = DatasetFilter::sigma().with_parallel(false).filter_table(&t).unwrap();
        assert_eq!(par, seq);
        assert!(!par.source_index().contains(&33));
    }

    #[test]
    fn all_null_column_fails_sigma_but_not_quartile() {
        let t = Table::new(vec![
            Column::float("ok", [Some(1.0), Some(2.0)]),
            Column::float("blank", [None, None]),
        ])
        .unwrap();
        let err = DatasetFilter::sigma().filter_table(&t).unwrap_err();
        assert!(matches!(err, FenceError::EmptyInput { column: Some(ref c) } if c == "blank"));

        let out = DatasetFilter::quartile(1.5).filter_table(&t).unwrap();
        assert_eq!(out.num_rows(), 2);
        assert!(out.applied()[1].bounds.is_empty());
    }

    #[test]
    fn first_failing_column_is_reported() {
        let t = Table::new(vec![
            Column::float("first", [None]),
            Column::float("second", [None]),
        ])
        .unwrap();
        for parallel in [true, false] {
            let err = DatasetFilter::sigma()
                .with_parallel(parallel)
                .filter_table(&t)
                .unwrap_err();
            assert!(matches!(err, FenceError::EmptyInput { column: Some(ref c) } if c == "first"));
        }
    }

    #[test]
    fn single_column_mode_ignores_other_columns() {
        let t = Table::new(vec![
            Column::float("a", [Some(1.0), Some(2.0), Some(3.0), None]),
            Column::float("b", [Some(-1e9), Some(0.0), Some(1e9), Some(0.0)]),
        ])
        .unwrap();
        let out = filter_by_bounds(&t, "a", Bounds::new(1.5, 3.0)).unwrap();
        assert_eq!(out.source_index(), &[1, 2, 3]);
        assert_eq!(out.table().column("b").unwrap().len(), 3);
    }

    #[test]
    fn quartile_fences_ignore_infinities_but_drop_them() {
        let t = Table::new(vec![
            Column::float("v", [Some(1.0), Some(2.0), Some(3.0), Some(f64::INFINITY)]),
            Column::float("spikes", [Some(f64::INFINITY), Some(f64::INFINITY), None, None]),
        ])
        .unwrap();

        let out = DatasetFilter::quartile(1.5).filter_table(&t).unwrap();
        assert_eq!(out.source_index(), &[0, 1, 2]);
        assert_eq!(out.applied()[0].bounds, Bounds::new(0.0, 4.0));
        assert_eq!(
            out.applied()[1].bounds,
            Bounds::new(f64::INFINITY, f64::INFINITY)
        );

        let tight = DatasetFilter::quartile(0.0).filter_column(&t, "v").unwrap();
        assert_eq!(tight.source_index(), &[1]);
    }

    #[test]
    fn given_bounds_on_a_text_column_are_rejected() {
        let err = filter_by_bounds(&worked_table(), "id", Bounds::UNBOUNDED).unwrap_err();
        assert!(matches!(
            err,
            FenceError::UnsupportedColumnType { ref column, dtype: ColumnType::Text }
                if column == "id"
        ));
    }

    #[test]
    fn single_column_errors() {
        let t = worked_table();
        let err = filter_by_bounds(&t, "missing", Bounds::UNBOUNDED).unwrap_err();
        assert!(matches!(err, FenceError::ColumnNotFound(_)));

        let err = DatasetFilter::sigma().filter_column(&t, "id").unwrap_err();
        assert!(matches!(
            err,
            FenceError::UnsupportedColumnType { dtype: ColumnType::Text, .. }
        ));
    }

    #[test]
    fn invalid_parameters_fail_even_without_numeric_columns() {
        let t = Table::new(vec![Column::text("s", [Some("x")])]).unwrap();
        let filter = DatasetFilter::new(Method::SigmaClip(SigmaClip::new(-1.0, 3.0)));
        assert!(matches!(
            filter.filter_table(&t).unwrap_err(),
            FenceError::InvalidParameter { .. }
        ));
    }
}
