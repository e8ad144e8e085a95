use std::sync::Arc;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::domain::{HELP_TEXT, Message, PTConfig, PTError};
use crate::fetch::{CharacterSource, Fetcher};
use crate::inputter::{InputResult, Inputter};
use crate::loader::LoadedTable;
use crate::pages::{PageKind, characters_table, file_table, mock_table};
use crate::table::{Alignment, Row, RowId, TableBody, TableEngine, TableOptions};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    Help(String),
    Record {
        title: String,
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone)]
pub struct HeaderCell {
    pub text: String,
    pub alignment: Alignment,
    pub width: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct UIRow {
    /// None when the table is not selectable.
    pub checked: Option<bool>,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum UIBody {
    Loading(usize),
    Empty(String),
    Rows(Vec<UIRow>),
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub tabs: Vec<&'static str>,
    pub current_tab: usize,
    pub header: Vec<HeaderCell>,
    pub page_checked: Option<bool>,
    pub body: UIBody,
    pub selected_row: usize,
    pub selected_column: usize,
    pub search: Option<String>,
    pub search_placeholder: String,
    pub active_cmdinput: bool,
    pub cmdinput: InputResult,
    pub selected_label: Option<String>,
    pub rows_per_page: String,
    pub page_size: usize,
    pub range_label: String,
    pub page_label: String,
    pub can_prev: bool,
    pub can_next: bool,
    pub error: Option<String>,
    pub popup: Option<Popup>,
    pub status_message: String,
}

pub struct Model {
    config: PTConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    pages: Vec<PageKind>,
    current_page: usize,
    table: TableEngine<Message>,
    file: Option<LoadedTable>,
    fetcher: Fetcher,
    load_error: Option<String>,
    cursor_row: usize,
    cursor_column: usize,
    input: Inputter,
    last_input: InputResult,
    active_cmdinput: bool,
    popup: Option<Popup>,
    clipboard: Option<Clipboard>,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &PTConfig,
        source: Arc<dyn CharacterSource>,
        file: Option<LoadedTable>,
    ) -> Result<Self, PTError> {
        let mut pages = vec![PageKind::Characters, PageKind::Mock];
        if file.is_some() {
            pages.push(PageKind::File);
        }
        let current_page = pages
            .iter()
            .position(|&p| p == config.start_page)
            .ok_or_else(|| PTError::LoadingFailed("The file page needs a --file".into()))?;

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            pages,
            current_page,
            table: TableEngine::new(Vec::new(), TableOptions::default()),
            file,
            fetcher: Fetcher::new(source),
            load_error: None,
            cursor_row: 0,
            cursor_column: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            active_cmdinput: false,
            popup: None,
            clipboard: None,
            status_message: "Started!".to_string(),
        };
        model.mount_page();
        Ok(model)
    }

    pub fn current_page(&self) -> PageKind {
        self.pages[self.current_page]
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.fetcher.cancel();
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("Status: {}", self.status_message);
    }

    // -------------------- Pages ---------------------- //

    /// Builds a fresh table for the current page. Nothing survives a remount.
    fn mount_page(&mut self) {
        self.fetcher.cancel();
        self.load_error = None;
        self.cursor_row = 0;
        self.cursor_column = 0;

        let kind = self.current_page();
        self.table = match kind {
            PageKind::Characters => characters_table(&self.config),
            PageKind::Mock => mock_table(&self.config),
            PageKind::File => match &self.file {
                Some(loaded) => file_table(&self.config, loaded),
                None => {
                    error!("File page mounted without a loaded file");
                    TableEngine::new(Vec::new(), TableOptions::default())
                }
            },
        };
        info!("Mounted page {:?}", kind);

        if kind == PageKind::Characters {
            self.start_fetch();
        } else {
            self.set_status_message(format!("{} rows", self.table.total_rows()));
        }
    }

    fn next_tab(&mut self) {
        self.current_page = (self.current_page + 1) % self.pages.len();
        self.mount_page();
    }

    fn start_fetch(&mut self) {
        self.load_error = None;
        self.table.set_loading(true);
        let generation = self.fetcher.request();
        debug!("Requested characters (#{generation})");
        self.set_status_message("Loading characters ...");
    }

    fn reload(&mut self) {
        if self.current_page() == PageKind::Characters {
            self.start_fetch();
        } else {
            self.set_status_message("Nothing to reload on this page");
        }
    }

    fn poll_fetch(&mut self) {
        let Some(result) = self.fetcher.poll() else {
            return;
        };
        self.table.set_loading(false);
        match result {
            Ok(characters) => {
                let rows: Vec<Row> = characters.iter().map(|c| c.to_row()).collect();
                self.set_status_message(format!("Loaded {} characters", rows.len()));
                self.table.set_rows(rows);
            }
            Err(e) => {
                error!("Loading characters failed: {e}");
                self.table.set_rows(Vec::new());
                self.load_error = Some(e.to_string());
                self.set_status_message("Loading failed, press r to retry");
            }
        }
        self.clamp_cursor();
    }

    // -------------------- Messages ---------------------- //

    pub fn update(&mut self, message: Option<Message>) {
        self.poll_fetch();

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => self.handle_table_message(msg),
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
    }

    fn handle_table_message(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::Help => self.show_popup(Popup::Help(HELP_TEXT.to_string())),
            Message::Exit => self.exit(),
            Message::Enter => self.click_row(),
            Message::MoveUp => self.move_up(),
            Message::MoveDown => self.move_down(),
            Message::MoveLeft => self.cursor_column = self.cursor_column.saturating_sub(1),
            Message::MoveRight => {
                if self.cursor_column + 1 < self.table.columns().len() {
                    self.cursor_column += 1;
                }
            }
            Message::Sort => self.sort_current_column(),
            Message::NextPage => self.change_page(TableEngine::next_page),
            Message::PrevPage => self.change_page(TableEngine::prev_page),
            Message::FirstPage => self.change_page(TableEngine::first_page),
            Message::LastPage => self.change_page(TableEngine::last_page),
            Message::CyclePageSize => {
                self.table.cycle_page_size();
                self.clamp_cursor();
                self.set_status_message(format!(
                    "{}: {}",
                    self.table.texts().rows_per_page,
                    self.table.page_size()
                ));
            }
            Message::ToggleSelect => self.toggle_select(),
            Message::ToggleSelectPage => {
                if self.table.is_selectable() {
                    self.table.toggle_page();
                    self.report_selection();
                }
            }
            Message::Search => self.enter_cmd_mode(),
            Message::Action(idx) => self.invoke_action(idx),
            Message::NextTab => self.next_tab(),
            Message::Reload => self.reload(),
            Message::ShowRecord(row) => self.show_record(&row),
            Message::CopyText(text) => self.copy_to_clipboard(text),
            Message::RawKey(_) => (),
        }
    }

    fn exit(&mut self) {
        if !self.table.query().is_empty() {
            self.table.set_query("");
            self.cursor_row = 0;
            self.set_status_message("Search cleared");
        }
    }

    fn current_row(&self) -> Option<(usize, RowId)> {
        self.table
            .page_rows()
            .get(self.cursor_row)
            .map(|r| (r.data_index, r.id.clone()))
    }

    fn click_row(&mut self) {
        let Some((data_index, _)) = self.current_row() else {
            return;
        };
        if let Some(msg) = self.table.click_row(data_index) {
            self.handle_table_message(msg);
        }
    }

    fn invoke_action(&mut self, idx: usize) {
        let Some((data_index, _)) = self.current_row() else {
            return;
        };
        match self.table.invoke_action(idx, data_index) {
            Some(msg) => self.handle_table_message(msg),
            None => trace!("No action #{}", idx + 1),
        }
    }

    fn toggle_select(&mut self) {
        if !self.table.is_selectable() {
            return;
        }
        if let Some((_, id)) = self.current_row() {
            self.table.toggle_row(id);
            self.report_selection();
        }
    }

    fn report_selection(&mut self) {
        let message = format!(
            "{} {}",
            self.table.selected_count(),
            self.table.texts().selected
        );
        self.set_status_message(message);
    }

    fn sort_current_column(&mut self) {
        let Some(column) = self.table.columns().get(self.cursor_column) else {
            return;
        };
        let key = column.key.clone();
        let header = column.header.clone();
        if self.table.click_header(&key) {
            self.cursor_row = 0;
            let arrow = self
                .table
                .sort()
                .map(|s| s.direction.indicator())
                .unwrap_or(' ');
            self.set_status_message(format!("Sorted by {header} {arrow}"));
        } else {
            self.set_status_message(format!("{header} is not sortable"));
        }
    }

    fn change_page(&mut self, change: fn(&mut TableEngine<Message>)) {
        change(&mut self.table);
        self.cursor_row = 0;
    }

    fn move_up(&mut self) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
        } else if self.table.can_go_prev() {
            self.table.prev_page();
            self.cursor_row = self.page_len().saturating_sub(1);
        }
    }

    fn move_down(&mut self) {
        if self.cursor_row + 1 < self.page_len() {
            self.cursor_row += 1;
        } else if self.table.can_go_next() {
            self.table.next_page();
            self.cursor_row = 0;
        }
    }

    fn page_len(&self) -> usize {
        let (start, end) = self.table.page_bounds();
        end - start
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = std::cmp::min(self.cursor_row, self.page_len().saturating_sub(1));
        self.cursor_column = std::cmp::min(
            self.cursor_column,
            self.table.columns().len().saturating_sub(1),
        );
    }

    // -------------------- Popups ---------------------- //

    fn show_popup(&mut self, popup: Popup) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup = Some(popup);
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.popup = None;
    }

    fn show_record(&mut self, row: &Row) {
        let title = match row.get("name") {
            Some(value) if !value.is_null() => value.display(),
            _ => "Record".to_string(),
        };
        let fields = row
            .fields()
            .map(|(k, v)| (k.to_string(), v.display()))
            .collect();
        self.show_popup(Popup::Record { title, fields });
    }

    fn copy_to_clipboard(&mut self, text: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    debug!("Clipboard unavailable: {:?}", e);
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => return,
        };
        match result {
            Ok(_) => self.set_status_message("Copied row to clipboard"),
            Err(e) => {
                debug!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Could not copy to clipboard");
            }
        }
    }

    // -------------------- Search input ---------------------- //

    fn enter_cmd_mode(&mut self) {
        if !self.table.is_searchable() {
            return;
        }
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.active_cmdinput = true;
        self.input.start(self.table.query());
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.table.set_query(&self.last_input.input) {
            self.cursor_row = 0;
            self.set_status_message(format!("Found {} rows", self.table.total()));
        }
        if self.last_input.finished {
            trace!("Search finished with \"{}\"", self.last_input.input);
            self.active_cmdinput = false;
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
        }
    }

    // -------------------- UI data ---------------------- //

    pub fn get_uidata(&self) -> UIData {
        let table = &self.table;
        let selectable = table.is_selectable();

        let header = table
            .columns()
            .iter()
            .map(|c| HeaderCell {
                text: match table.sort_indicator(c) {
                    Some(arrow) => format!("{} {arrow}", c.header),
                    None => c.header.clone(),
                },
                alignment: c.alignment,
                width: c.width,
            })
            .collect();

        let body = match table.body() {
            TableBody::Loading(n) => UIBody::Loading(n),
            TableBody::Empty => UIBody::Empty(table.texts().no_results.clone()),
            TableBody::Rows(rows) => UIBody::Rows(
                rows.iter()
                    .map(|r| UIRow {
                        checked: selectable.then(|| table.is_selected(&r.id)),
                        cells: table
                            .columns()
                            .iter()
                            .map(|c| c.cell_text(r.row, r.index))
                            .collect(),
                    })
                    .collect(),
            ),
        };

        let selected = table.selected_count();
        UIData {
            tabs: self.pages.iter().map(|p| p.title()).collect(),
            current_tab: self.current_page,
            header,
            page_checked: selectable.then(|| table.is_page_selected()),
            body,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            search: table.is_searchable().then(|| table.query().to_string()),
            search_placeholder: table.texts().search_placeholder.clone(),
            active_cmdinput: self.active_cmdinput,
            cmdinput: self.last_input.clone(),
            selected_label: (selectable && selected > 0)
                .then(|| format!("{selected} {}", table.texts().selected)),
            rows_per_page: table.texts().rows_per_page.clone(),
            page_size: table.page_size(),
            range_label: table.range_label(),
            page_label: table.page_label(),
            can_prev: table.can_go_prev(),
            can_next: table.can_go_next(),
            error: self.load_error.clone(),
            popup: self.popup.clone(),
            status_message: self.status_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::{MockSource, sample_characters};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::thread;
    use std::time::{Duration, Instant};

    fn model_on(page: PageKind, source: MockSource) -> Model {
        let config = PTConfig {
            start_page: page,
            ..PTConfig::default()
        };
        Model::init(&config, Arc::new(source), None).expect("model")
    }

    fn settle(model: &mut Model) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while model.table.is_loading() && Instant::now() < deadline {
            model.update(None);
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn type_text(model: &mut Model, text: &str) {
        for c in text.chars() {
            model.update(Some(Message::RawKey(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            ))));
        }
    }

    fn first_cell(model: &Model, column: usize) -> Option<String> {
        match model.get_uidata().body {
            UIBody::Rows(rows) => rows.first().map(|r| r.cells[column].clone()),
            _ => None,
        }
    }

    #[test]
    fn characters_page_shows_fetched_rows() {
        let mut model = model_on(PageKind::Characters, MockSource::with(sample_characters()));
        assert!(matches!(model.get_uidata().body, UIBody::Loading(5)));
        settle(&mut model);
        let ui = model.get_uidata();
        assert!(matches!(ui.body, UIBody::Rows(ref rows) if rows.len() == 2));
        assert_eq!(ui.range_label, "1-2 of 2");
        assert_eq!(ui.page_label, "1 / 1");
        assert!(ui.error.is_none());
    }

    #[test]
    fn failed_fetch_shows_banner_and_retries() {
        let mut model = model_on(PageKind::Characters, MockSource::failing());
        settle(&mut model);
        let ui = model.get_uidata();
        assert!(ui.error.is_some());
        assert!(matches!(ui.body, UIBody::Empty(ref text) if text == "No results"));

        model.update(Some(Message::Reload));
        assert!(model.get_uidata().error.is_none());
        assert!(model.table.is_loading());
    }

    #[test]
    fn leaving_page_discards_late_response() {
        let source = MockSource {
            delay: Duration::from_millis(100),
            ..MockSource::with(sample_characters())
        };
        let mut model = model_on(PageKind::Characters, source);
        model.update(Some(Message::NextTab));
        assert_eq!(model.current_page(), PageKind::Mock);

        thread::sleep(Duration::from_millis(250));
        model.update(None);
        assert_eq!(model.table.total(), 12);
        assert!(!model.table.is_loading());
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::Search));
        assert!(model.raw_keyevents());
        type_text(&mut model, "ada");
        assert_eq!(model.table.total(), 1);
        assert_eq!(first_cell(&model, 1).as_deref(), Some("Ada Lovelace"));

        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Esc,
            KeyModifiers::NONE,
        ))));
        assert!(!model.raw_keyevents());
        assert_eq!(model.table.total(), 12);
    }

    #[test]
    fn search_without_match_shows_no_results() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::Search));
        type_text(&mut model, "xyz");
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Enter,
            KeyModifiers::NONE,
        ))));
        let ui = model.get_uidata();
        assert!(matches!(ui.body, UIBody::Empty(_)));
        assert_eq!(ui.page_label, "1 / 1");
        assert_eq!(ui.search.as_deref(), Some("xyz"));

        model.update(Some(Message::Exit));
        assert_eq!(model.table.total(), 12);
    }

    #[test]
    fn sort_key_toggles_direction_and_shows_arrow() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::Sort));
        assert_eq!(model.get_uidata().header[0].text, "# ▲");
        assert_eq!(first_cell(&model, 0).as_deref(), Some("1"));
        model.update(Some(Message::Sort));
        assert_eq!(model.get_uidata().header[0].text, "# ▼");
        assert_eq!(first_cell(&model, 0).as_deref(), Some("12"));
    }

    #[test]
    fn unsortable_column_reports() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::MoveRight));
        model.update(Some(Message::MoveRight));
        model.update(Some(Message::Sort));
        assert_eq!(model.status_message, "Email is not sortable");
    }

    #[test]
    fn moving_past_last_row_turns_page() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        for _ in 0..10 {
            model.update(Some(Message::MoveDown));
        }
        assert_eq!(model.table.page_index(), 2);
        assert_eq!(model.cursor_row, 0);
        model.update(Some(Message::MoveUp));
        assert_eq!(model.table.page_index(), 1);
        assert_eq!(model.cursor_row, 9);
    }

    #[test]
    fn selection_marks_rows_and_page() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::ToggleSelect));
        let ui = model.get_uidata();
        assert_eq!(ui.selected_label.as_deref(), Some("1 selected"));
        assert_eq!(ui.page_checked, Some(false));

        model.update(Some(Message::ToggleSelectPage));
        let ui = model.get_uidata();
        assert_eq!(ui.page_checked, Some(true));
        assert_eq!(ui.selected_label.as_deref(), Some("10 selected"));
        assert!(matches!(
            ui.body,
            UIBody::Rows(ref rows) if rows.iter().all(|r| r.checked == Some(true))
        ));
    }

    #[test]
    fn enter_and_action_open_record_popup() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::Enter));
        assert!(matches!(
            model.get_uidata().popup,
            Some(Popup::Record { ref title, .. }) if title == "Ada Lovelace"
        ));
        // Keys other than close are ignored by the popup
        model.update(Some(Message::NextPage));
        assert_eq!(model.table.page_index(), 1);
        model.update(Some(Message::Exit));
        assert!(model.get_uidata().popup.is_none());

        model.update(Some(Message::Action(0)));
        assert!(matches!(model.get_uidata().popup, Some(Popup::Record { .. })));
    }

    #[test]
    fn page_size_cycles_through_options() {
        let mut model = model_on(PageKind::Mock, MockSource::with(Vec::new()));
        model.update(Some(Message::CyclePageSize));
        let ui = model.get_uidata();
        assert_eq!(ui.page_size, 25);
        assert_eq!(ui.range_label, "1-12 of 12");
        assert!(!ui.can_next);
    }

    #[test]
    fn file_page_requires_file() {
        let config = PTConfig {
            start_page: PageKind::File,
            ..PTConfig::default()
        };
        let result = Model::init(&config, Arc::new(MockSource::with(Vec::new())), None);
        assert!(matches!(result, Err(PTError::LoadingFailed(_))));
    }
}
