//! Tabular engines the payload is delegated to.
//!
//! None of these know about the header: they receive a reader already positioned after it (or
//! a writer the header has already been written to) and a resolved
//! [`crate::options::CsvFormat`].
//!
//! - [`rows`]: nested string rows and [`crate::types::Columns`], via the `csv` crate
//! - [`array`]: 2D `f64` arrays, via `ndarray`
//! - [`dataset`]: typed [`crate::types::DataSet`] tables
//! - [`frame`]: Polars eager and lazy frames

pub mod array;
pub mod dataset;
pub mod frame;
pub mod rows;

use ndarray::Array2;

use crate::read::HeaderInfo;
use crate::types::{Columns, DataSet};

pub use frame::PolarsFrame;

/// The in-memory container a payload is read into or written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Header only, payload untouched.
    Header,
    /// Nested string rows.
    Rows,
    /// Named string columns.
    Columns,
    /// 2D `f64` array.
    Array,
    /// Typed [`DataSet`].
    DataSet,
    /// Polars `DataFrame` or `LazyFrame`.
    Polars,
}

/// Row count reported to observers.
pub(crate) trait Tabular {
    /// `None` when the count is not known without materializing (lazy frames).
    fn row_count(&self) -> Option<usize>;
}

impl Tabular for Vec<Vec<String>> {
    fn row_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Tabular for Columns {
    fn row_count(&self) -> Option<usize> {
        Some(self.height())
    }
}

impl Tabular for Array2<f64> {
    fn row_count(&self) -> Option<usize> {
        Some(self.nrows())
    }
}

impl Tabular for DataSet {
    fn row_count(&self) -> Option<usize> {
        Some(DataSet::row_count(self))
    }
}

impl Tabular for PolarsFrame {
    fn row_count(&self) -> Option<usize> {
        match self {
            PolarsFrame::Eager(df) => Some(df.height()),
            PolarsFrame::Lazy(_) => None,
        }
    }
}

impl Tabular for HeaderInfo {
    fn row_count(&self) -> Option<usize> {
        None
    }
}
