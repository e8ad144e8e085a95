use std::fmt;
use std::io::Error;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::fetch::DEFAULT_API_URL;
use crate::pages::PageKind;
use crate::table::engine::DEFAULT_PAGE_SIZE_OPTIONS;
use crate::table::{Row, TableTexts};

#[derive(Debug)]
pub enum PTError {
    IoError(Error),
    PolarsError(PolarsError),
    HttpError(reqwest::Error),
    DecodeError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for PTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PTError::IoError(e) => write!(f, "I/O error: {e}"),
            PTError::PolarsError(e) => write!(f, "Could not read data: {e}"),
            PTError::HttpError(e) => write!(f, "Request failed: {e}"),
            PTError::DecodeError(e) => write!(f, "Unexpected response: {e}"),
            PTError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            PTError::FileNotFound => f.write_str("File not found"),
            PTError::PermissionDenied => f.write_str("Permission denied"),
            PTError::UnknownFileType => f.write_str("Unknown file type"),
        }
    }
}

impl std::error::Error for PTError {}

impl From<Error> for PTError {
    fn from(err: Error) -> Self {
        PTError::IoError(err)
    }
}

impl From<PolarsError> for PTError {
    fn from(err: PolarsError) -> Self {
        PTError::PolarsError(err)
    }
}

impl From<reqwest::Error> for PTError {
    fn from(err: reqwest::Error) -> Self {
        PTError::HttpError(err)
    }
}

impl From<serde_json::Error> for PTError {
    fn from(err: serde_json::Error) -> Self {
        PTError::DecodeError(err)
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Sort,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    ToggleSelect,
    ToggleSelectPage,
    Search,
    Action(usize),
    NextTab,
    Reload,
    RawKey(KeyEvent),
    ShowRecord(Row),
    CopyText(String),
}

#[derive(Debug, Clone)]
pub struct PTConfig {
    pub event_poll_time: u64,
    pub start_page: PageKind,
    pub api_url: String,
    pub fetch_timeout: u64,
    pub page_size_options: Vec<usize>,
    pub initial_page_size: Option<usize>,
    pub texts: TableTexts,
    pub searchable: bool,
    pub selectable: bool,
}

impl Default for PTConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            start_page: PageKind::Characters,
            api_url: DEFAULT_API_URL.to_string(),
            fetch_timeout: 10,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            initial_page_size: None,
            texts: TableTexts::default(),
            searchable: true,
            selectable: true,
        }
    }
}

pub const HELP_TEXT: &str = "\
Navigation
  ↑ ↓        move between rows
  ← →        move between columns
  n / p      next / previous page
  g / G      first / last page
  +          cycle rows per page
  Tab        next page of the app

Table
  /          search (Enter keeps, Esc clears)
  s          sort by the current column
  space      select row
  a          select all rows of the page
  Enter      show row details
  1-9        run a row action
  r          reload data

Other
  ?          this help
  Esc        close popup / clear search
  q          quit";
