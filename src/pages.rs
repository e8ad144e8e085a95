//! Demo pages of the app and the tables they mount.

use clap::ValueEnum;

use crate::domain::{Message, PTConfig};
use crate::loader::LoadedTable;
use crate::table::{
    Alignment, Column, Row, RowAction, RowId, SortState, TableEngine, TableOptions, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageKind {
    /// Characters fetched from the public API
    Characters,
    /// Static mock rows
    Mock,
    /// Rows of the file given with --file
    File,
}

impl PageKind {
    pub fn title(self) -> &'static str {
        match self {
            PageKind::Characters => "Characters",
            PageKind::Mock => "Mock data",
            PageKind::File => "File",
        }
    }
}

fn table_options(config: &PTConfig) -> TableOptions {
    let mut options = TableOptions::default()
        .searchable(config.searchable)
        .selectable(config.selectable)
        .page_size_options(config.page_size_options.clone())
        .texts(config.texts.clone());
    options.initial_page_size = config.initial_page_size;
    options
}

/// Row actions shared by every page.
fn row_actions() -> Vec<RowAction<Message>> {
    vec![
        RowAction::new("Details", |row: &Row| Message::ShowRecord(row.clone())).icon("🔍"),
        RowAction::new("Copy", |row: &Row| Message::CopyText(row_to_csv(row))).icon("📋"),
    ]
}

fn id_or_index(row: &Row, index: usize) -> RowId {
    match row.get("id") {
        Some(Value::Number(n)) => RowId::Number(*n as i64),
        Some(Value::Text(s)) => RowId::Text(s.clone()),
        _ => RowId::from(index),
    }
}

pub fn characters_table(config: &PTConfig) -> TableEngine<Message> {
    let columns = vec![
        Column::new("id", "ID")
            .sortable(true)
            .alignment(Alignment::Right)
            .width(5),
        Column::new("name", "Name").sortable(true).width(24),
        Column::new("status", "Status")
            .sortable(true)
            .width(9)
            .renderer(|value, _, _| match value {
                Value::Text(s) if s == "Alive" => format!("● {s}"),
                Value::Text(s) if s == "Dead" => format!("✝ {s}"),
                other => other.display(),
            }),
        Column::new("species", "Species").sortable(true).width(12),
        Column::new("gender", "Gender").sortable(true).width(10),
        Column::new("origin", "Origin").sortable(true).width(20),
        Column::new("episodes", "Episodes")
            .sortable(true)
            .alignment(Alignment::Right)
            .width(8),
    ];

    TableEngine::new(columns, table_options(config))
        .row_id(id_or_index)
        .on_row_click(|row| Message::ShowRecord(row.clone()))
        .with_actions(row_actions())
}

pub fn mock_rows() -> Vec<Row> {
    let people: [(&str, &str, Option<&str>, Option<f64>, bool); 12] = [
        ("Ada Lovelace", "ada@example.org", Some("Admin"), Some(98.0), true),
        ("Alan Turing", "alan@example.org", Some("Editor"), Some(91.5), true),
        ("Grace Hopper", "grace@example.org", Some("Admin"), Some(95.0), true),
        ("Linus Torvalds", "linus@example.org", None, Some(77.0), false),
        ("Margaret Hamilton", "margaret@example.org", Some("Viewer"), None, true),
        ("Dennis Ritchie", "dennis@example.org", Some("Editor"), Some(88.25), false),
        ("Barbara Liskov", "barbara@example.org", Some("Viewer"), Some(84.0), true),
        ("Ken Thompson", "ken@example.org", None, Some(80.0), true),
        ("Frances Allen", "frances@example.org", Some("Editor"), Some(90.0), true),
        ("John McCarthy", "john@example.org", Some("Viewer"), None, false),
        ("Edsger Dijkstra", "edsger@example.org", Some("Admin"), Some(99.0), true),
        ("Radia Perlman", "radia@example.org", Some("Editor"), Some(86.5), true),
    ];
    people
        .iter()
        .enumerate()
        .map(|(idx, (name, email, role, score, active))| {
            Row::new()
                .with("id", (idx + 1) as i64)
                .with("name", *name)
                .with("email", *email)
                .with("role", *role)
                .with("score", *score)
                .with("active", *active)
        })
        .collect()
}

pub fn mock_table(config: &PTConfig) -> TableEngine<Message> {
    let columns = vec![
        Column::new("id", "#")
            .sortable(true)
            .alignment(Alignment::Right)
            .width(4),
        Column::new("name", "Name").sortable(true).width(20),
        Column::new("email", "Email").width(24),
        Column::new("role", "Role").sortable(true).width(8),
        Column::new("score", "Score")
            .sortable(true)
            .alignment(Alignment::Right)
            .width(7)
            .renderer(|value, _, _| match value {
                Value::Number(n) => format!("{n:.1}"),
                other => other.display(),
            }),
        Column::new("active", "Active")
            .alignment(Alignment::Center)
            .width(6)
            .renderer(|value, _, _| match value {
                Value::Bool(true) => "yes".to_string(),
                Value::Bool(false) => "no".to_string(),
                other => other.display(),
            }),
    ];

    TableEngine::new(
        columns,
        table_options(config).initial_sort(SortState::ascending("name")),
    )
    .row_id(id_or_index)
    .on_row_click(|row| Message::ShowRecord(row.clone()))
    .with_actions(row_actions())
    .with_rows(mock_rows())
}

pub fn file_table(config: &PTConfig, loaded: &LoadedTable) -> TableEngine<Message> {
    let columns = loaded
        .columns
        .iter()
        .map(|name| {
            let column = Column::new(name.clone(), name.clone()).sortable(true);
            if loaded.is_numeric(name) {
                column.alignment(Alignment::Right)
            } else {
                column
            }
        })
        .collect();

    TableEngine::new(columns, table_options(config))
        .on_row_click(|row| Message::ShowRecord(row.clone()))
        .with_actions(row_actions())
        .with_rows(loaded.rows.clone())
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

/// Field values of a row as one CSV line. Nulls become empty cells.
pub fn row_to_csv(row: &Row) -> String {
    row.fields()
        .map(|(_, value)| match value {
            Value::Null => String::new(),
            other => wrap_cell_content(&other.display()),
        })
        .collect::<Vec<String>>()
        .join(",")
}
