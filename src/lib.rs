//! Outlier filtering for tabular data.
//!
//! A [`Table`] of typed columns is reduced to a [`FilteredTable`] by
//! estimating per-column [`Bounds`], either with quartile (IQR) fences or with
//! iterative sigma clipping, and dropping the rows that fall outside them.
//!
//! ```no_run
//! use rusty_fence::{Column, DatasetFilter, Table};
//!
//! let table = Table::new(vec![
//!     Column::float("v", [1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0, 100.0].map(Some)),
//! ])?;
//! let filtered = DatasetFilter::quartile(1.5).filter_table(&table)?;
//! assert_eq!(filtered.num_rows(), 9);
//! # Ok::<(), rusty_fence::FenceError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod stats;

pub use config::FilterConfig;
pub use data::filter::{filter_by_bounds, ColumnBounds, DatasetFilter, FilteredTable};
pub use data::model::{Column, ColumnDescriptor, ColumnType, Table, Value};
pub use error::{FenceError, Result};
pub use stats::{Bounds, Deviation, IqrFences, Method, SigmaClip};
