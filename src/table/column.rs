use std::fmt;
use std::sync::Arc;

use derive_setters::Setters;

use super::value::{Row, Value};

/// Turns (value, row, global index) into the text shown in a cell.
pub type CellRenderer = Arc<dyn Fn(&Value, &Row, usize) -> String + Send + Sync>;
/// Extracts the value of a column from a row.
pub type ValueAccessor = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Describes how one field is labeled, sorted, aligned and rendered.
#[derive(Clone, Setters)]
pub struct Column {
    #[setters(skip)]
    pub key: String,
    #[setters(skip)]
    pub header: String,
    pub sortable: bool,
    pub alignment: Alignment,
    #[setters(strip_option)]
    pub width: Option<u16>,
    #[setters(skip)]
    render: Option<CellRenderer>,
    #[setters(skip)]
    accessor: Option<ValueAccessor>,
}

impl Column {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            sortable: false,
            alignment: Alignment::Left,
            width: None,
            render: None,
            accessor: None,
        }
    }

    pub fn renderer<F>(mut self, render: F) -> Self
    where
        F: Fn(&Value, &Row, usize) -> String + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Row) -> Value + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    /// Value of this column for `row`: the accessor if set, the field named by `key` otherwise.
    pub fn value(&self, row: &Row) -> Value {
        match &self.accessor {
            Some(accessor) => accessor(row),
            None => row.value(&self.key),
        }
    }

    /// Cell text for `row` at position `index` of the filtered and sorted sequence.
    pub fn cell_text(&self, row: &Row, index: usize) -> String {
        let value = self.value(row);
        match &self.render {
            Some(render) => render(&value, row, index),
            None => value.display(),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("sortable", &self.sortable)
            .field("alignment", &self.alignment)
            .field("width", &self.width)
            .field("render", &self.render.is_some())
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}
