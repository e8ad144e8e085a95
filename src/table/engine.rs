use std::sync::Arc;
use std::time::Instant;

use derive_setters::Setters;
use tracing::{debug, trace};

use super::column::{Alignment, Column};
use super::selection::SelectionTracker;
use super::texts::TableTexts;
use super::value::{Row, RowId, Value};

pub type RowHandler<M> = Arc<dyn Fn(&Row) -> M + Send + Sync>;
/// Receives the row and its index in the supplied row collection.
pub type RowIdAccessor = Arc<dyn Fn(&Row, usize) -> RowId + Send + Sync>;
/// Receives the row and the lowercased query.
pub type SearchPredicate = Arc<dyn Fn(&Row, &str) -> bool + Send + Sync>;

/// Key of the synthetic trailing column holding the row actions.
pub const ACTIONS_KEY: &str = "actions";
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 3] = [10, 25, 50];
pub const FALLBACK_PAGE_SIZE: usize = 10;
pub const MAX_SKELETON_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn indicator(self) -> char {
        match self {
            SortDirection::Ascending => '▲',
            SortDirection::Descending => '▼',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Setters)]
pub struct TableOptions {
    pub searchable: bool,
    pub selectable: bool,
    #[setters(strip_option)]
    pub initial_sort: Option<SortState>,
    pub page_size_options: Vec<usize>,
    #[setters(strip_option)]
    pub initial_page_size: Option<usize>,
    pub texts: TableTexts,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            searchable: true,
            selectable: false,
            initial_sort: None,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            initial_page_size: None,
            texts: TableTexts::default(),
        }
    }
}

/// Search text, sort and page of one mounted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub query: String,
    pub sort: Option<SortState>,
    /// 1-based, always within `[1, total_pages]`.
    pub page_index: usize,
    pub page_size: usize,
}

pub struct RowAction<M> {
    pub label: String,
    pub icon: Option<String>,
    handler: RowHandler<M>,
}

impl<M> RowAction<M> {
    pub fn new<F>(label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Row) -> M + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            icon: None,
            handler: Arc::new(handler),
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn caption(&self) -> String {
        match &self.icon {
            Some(icon) => format!("{icon} {}", self.label),
            None => self.label.clone(),
        }
    }
}

/// One row of the current page.
#[derive(Debug, Clone)]
pub struct PageRow<'a> {
    /// Position in the filtered and sorted sequence.
    pub index: usize,
    /// Position in the supplied row collection.
    pub data_index: usize,
    pub id: RowId,
    pub row: &'a Row,
}

#[derive(Debug)]
pub enum TableBody<'a> {
    Loading(usize),
    Empty,
    Rows(Vec<PageRow<'a>>),
}

/// In-memory table: filters, sorts and paginates a row collection.
pub struct TableEngine<M> {
    columns: Vec<Column>,
    rows: Vec<Row>,
    options: TableOptions,
    page_size_options: Vec<usize>,
    state: TableState,
    // Data indices of the filtered and sorted rows
    order: Vec<usize>,
    actions: Vec<RowAction<M>>,
    on_row_click: Option<RowHandler<M>>,
    row_id: Option<RowIdAccessor>,
    search_predicate: Option<SearchPredicate>,
    selection: SelectionTracker,
    loading: bool,
}

impl<M> TableEngine<M> {
    pub fn new(columns: Vec<Column>, options: TableOptions) -> Self {
        let page_size_options: Vec<usize> = options
            .page_size_options
            .iter()
            .copied()
            .filter(|&n| n > 0)
            .collect();
        let page_size_options = if page_size_options.is_empty() {
            debug!("No usable page size options, falling back to {FALLBACK_PAGE_SIZE}");
            vec![FALLBACK_PAGE_SIZE]
        } else {
            page_size_options
        };
        let page_size = options
            .initial_page_size
            .filter(|&n| n > 0)
            .unwrap_or(page_size_options[0]);

        let state = TableState {
            query: String::new(),
            sort: options.initial_sort.clone(),
            page_index: 1,
            page_size,
        };

        Self {
            columns,
            rows: Vec::new(),
            options,
            page_size_options,
            state,
            order: Vec::new(),
            actions: Vec::new(),
            on_row_click: None,
            row_id: None,
            search_predicate: None,
            selection: SelectionTracker::new(),
            loading: false,
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.set_rows(rows);
        self
    }

    /// Adds the row actions and, unless a column with key `actions` exists,
    /// a trailing column listing them.
    pub fn with_actions(mut self, actions: Vec<RowAction<M>>) -> Self {
        self.actions = actions;
        let present = self.columns.iter().any(|c| c.key == ACTIONS_KEY);
        if !self.actions.is_empty() && !present {
            let captions = self
                .actions
                .iter()
                .enumerate()
                .map(|(idx, a)| format!("[{}] {}", idx + 1, a.caption()))
                .collect::<Vec<String>>()
                .join(" ");
            self.columns.push(
                Column::new(ACTIONS_KEY, self.options.texts.actions.clone())
                    .alignment(Alignment::Right)
                    .renderer(move |_, _, _| captions.clone()),
            );
        }
        self
    }

    pub fn on_row_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Row) -> M + Send + Sync + 'static,
    {
        self.on_row_click = Some(Arc::new(handler));
        self
    }

    pub fn row_id<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Row, usize) -> RowId + Send + Sync + 'static,
    {
        self.row_id = Some(Arc::new(accessor));
        self
    }

    /// Replaces the default any-field search.
    pub fn search_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Row, &str) -> bool + Send + Sync + 'static,
    {
        self.search_predicate = Some(Arc::new(predicate));
        self.refresh();
        self
    }

    // -------------------- Inputs ---------------------- //

    /// Replaces the data. Ids of the old rows mean nothing for the new ones,
    /// so the selection is cleared.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.selection.clear();
        self.refresh();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Returns false when the query did not change.
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.state.query == query {
            return false;
        }
        self.state.query = query.to_string();
        self.state.page_index = 1;
        self.refresh();
        true
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        if self.state.sort == sort {
            return;
        }
        self.state.sort = sort;
        self.state.page_index = 1;
        self.refresh();
    }

    /// Header click: sorts ascending by a new key, otherwise flips the direction.
    /// Returns false for columns that are not sortable.
    pub fn click_header(&mut self, key: &str) -> bool {
        let sortable = self.columns.iter().any(|c| c.key == key && c.sortable);
        if !sortable {
            trace!("Column {key} is not sortable");
            return false;
        }
        let sort = match &self.state.sort {
            Some(prev) if prev.key == key => SortState {
                key: key.to_string(),
                direction: prev.direction.flip(),
            },
            _ => SortState::ascending(key),
        };
        self.state.sort = Some(sort);
        self.state.page_index = 1;
        self.refresh();
        true
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            debug!("Ignoring page size of 0");
            return;
        }
        self.state.page_size = page_size;
        self.state.page_index = 1;
    }

    /// Switches to the option following the current page size.
    pub fn cycle_page_size(&mut self) {
        let next = match self
            .page_size_options
            .iter()
            .position(|&n| n == self.state.page_size)
        {
            Some(pos) => self.page_size_options[(pos + 1) % self.page_size_options.len()],
            None => self.page_size_options[0],
        };
        self.set_page_size(next);
    }

    pub fn goto_page(&mut self, page: usize) {
        self.state.page_index = page.clamp(1, self.total_pages());
    }

    pub fn first_page(&mut self) {
        self.goto_page(1);
    }

    pub fn last_page(&mut self) {
        self.goto_page(self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.goto_page(self.state.page_index + 1);
    }

    pub fn prev_page(&mut self) {
        self.goto_page(self.state.page_index.saturating_sub(1));
    }

    pub fn can_go_prev(&self) -> bool {
        self.page_index() > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.page_index() < self.total_pages()
    }

    // -------------------- Pipeline ---------------------- //

    fn refresh(&mut self) {
        let start_time = Instant::now();
        let query = self.state.query.to_lowercase();

        let filtered: Vec<usize> = (0..self.rows.len())
            .filter(|&idx| self.matches(&self.rows[idx], &query))
            .collect();

        self.order = match &self.state.sort {
            None => filtered,
            Some(sort) => {
                let column = self.columns.iter().find(|c| c.key == sort.key);
                let mut keyed: Vec<(usize, Value)> = filtered
                    .into_iter()
                    .map(|idx| {
                        let row = &self.rows[idx];
                        let value = match column {
                            Some(c) => c.value(row),
                            None => row.value(&sort.key),
                        };
                        (idx, value)
                    })
                    .collect();
                // Stable sort keeps the original order of equal keys
                keyed.sort_by(|(_, a), (_, b)| match sort.direction {
                    SortDirection::Ascending => a.compare(b),
                    SortDirection::Descending => a.compare(b).reverse(),
                });
                keyed.into_iter().map(|(idx, _)| idx).collect()
            }
        };

        self.state.page_index = self.state.page_index.clamp(1, self.total_pages());
        trace!(
            "Refreshed table: {} of {} rows in {}ms, sort {:?}, page {}",
            self.order.len(),
            self.rows.len(),
            start_time.elapsed().as_millis(),
            self.state.sort,
            self.state.page_index
        );
    }

    fn matches(&self, row: &Row, query: &str) -> bool {
        if !self.options.searchable || query.is_empty() {
            return true;
        }
        match &self.search_predicate {
            Some(predicate) => predicate(row, query),
            None => row.fields().any(|(_, value)| {
                value
                    .searchable_text()
                    .is_some_and(|s| s.to_lowercase().contains(query))
            }),
        }
    }

    fn id_of(&self, data_index: usize) -> RowId {
        match &self.row_id {
            Some(accessor) => accessor(&self.rows[data_index], data_index),
            None => RowId::from(data_index),
        }
    }

    // -------------------- Outputs ---------------------- //

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn actions(&self) -> &[RowAction<M>] {
        &self.actions
    }

    pub fn texts(&self) -> &TableTexts {
        &self.options.texts
    }

    pub fn query(&self) -> &str {
        &self.state.query
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.state.sort.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_searchable(&self) -> bool {
        self.options.searchable
    }

    pub fn is_selectable(&self) -> bool {
        self.options.selectable
    }

    /// Number of rows after filtering.
    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn total_pages(&self) -> usize {
        std::cmp::max(1, self.order.len().div_ceil(self.state.page_size))
    }

    /// Bounds of the current page in the filtered and sorted sequence.
    pub fn page_bounds(&self) -> (usize, usize) {
        let start = std::cmp::min(
            (self.state.page_index - 1) * self.state.page_size,
            self.order.len(),
        );
        let end = std::cmp::min(start + self.state.page_size, self.order.len());
        (start, end)
    }

    pub fn page_rows(&self) -> Vec<PageRow<'_>> {
        let (start, end) = self.page_bounds();
        self.order[start..end]
            .iter()
            .enumerate()
            .map(|(offset, &data_index)| PageRow {
                index: start + offset,
                data_index,
                id: self.id_of(data_index),
                row: &self.rows[data_index],
            })
            .collect()
    }

    /// Rows of the filtered and sorted sequence, across all pages.
    pub fn sorted_rows(&self) -> impl Iterator<Item = &Row> {
        self.order.iter().map(|&idx| &self.rows[idx])
    }

    pub fn body(&self) -> TableBody<'_> {
        if self.loading {
            return TableBody::Loading(self.skeleton_rows());
        }
        let rows = self.page_rows();
        if rows.is_empty() {
            TableBody::Empty
        } else {
            TableBody::Rows(rows)
        }
    }

    pub fn skeleton_rows(&self) -> usize {
        std::cmp::min(self.state.page_size, MAX_SKELETON_ROWS)
    }

    /// "11-20 of 25", or "0" for an empty table.
    pub fn range_label(&self) -> String {
        let total = self.total();
        if total == 0 {
            return "0".to_string();
        }
        let (start, end) = self.page_bounds();
        format!("{}-{} {} {}", start + 1, end, self.options.texts.of, total)
    }

    pub fn page_label(&self) -> String {
        format!("{} / {}", self.page_index(), self.total_pages())
    }

    /// Sort arrow of a column header, if it is the active sort key.
    pub fn sort_indicator(&self, column: &Column) -> Option<char> {
        match &self.state.sort {
            Some(sort) if column.sortable && sort.key == column.key => {
                Some(sort.direction.indicator())
            }
            _ => None,
        }
    }

    // -------------------- Selection ---------------------- //

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn visible_ids(&self) -> Vec<RowId> {
        self.page_rows().into_iter().map(|r| r.id).collect()
    }

    pub fn toggle_row(&mut self, id: RowId) {
        if self.options.selectable {
            self.selection.toggle_row(id);
        }
    }

    pub fn toggle_page(&mut self) {
        if self.options.selectable {
            let visible = self.visible_ids();
            self.selection.toggle_page_all(&visible);
        }
    }

    pub fn is_page_selected(&self) -> bool {
        self.options.selectable && self.selection.is_page_selected(&self.visible_ids())
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selection.selected_count()
    }

    // -------------------- Handlers ---------------------- //

    pub fn click_row(&self, data_index: usize) -> Option<M> {
        let handler = self.on_row_click.as_ref()?;
        let row = self.rows.get(data_index)?;
        Some(handler(row))
    }

    /// Runs a row action. The row click handler is never invoked.
    pub fn invoke_action(&self, action_index: usize, data_index: usize) -> Option<M> {
        let action = self.actions.get(action_index)?;
        let row = self.rows.get(data_index)?;
        trace!("Invoking action {} on row {}", action.label, data_index);
        Some((action.handler)(row))
    }
}
