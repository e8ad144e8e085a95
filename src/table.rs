//! In-memory data table: search, sort, pagination, selection and row actions.
//!
//! The [`TableEngine`] owns the rows and the per-table state. Every change of an
//! input (rows, query, sort) recomputes the filtered and sorted order once; the
//! page slice is derived from it on demand.

pub mod column;
pub mod engine;
pub mod selection;
pub mod texts;
pub mod value;

pub use column::{Alignment, Column};
pub use engine::{
    PageRow, RowAction, SortDirection, SortState, TableBody, TableEngine, TableOptions,
};
pub use selection::SelectionTracker;
pub use texts::TableTexts;
pub use value::{PLACEHOLDER, Row, RowId, Value};
