use ratatui::{
    Frame,
    layout::{Alignment as TextAlign, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::model::{HeaderCell, Popup, UIBody, UIData};
use crate::table::Alignment;

pub const SELECT_COLUMN_WIDTH: u16 = 3;
pub const DEFAULT_COLUMN_WIDTH: u16 = 12;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const SKELETON_CELL: &str = "░░░░░░░░";
const POPUP_WIDTH_PERCENT: u16 = 60;
const POPUP_HEIGHT_PERCENT: u16 = 70;

pub fn draw(data: &UIData, frame: &mut Frame) {
    let error_height = if data.error.is_some() { 1 } else { 0 };
    let [tabs_area, toolbar_area, error_area, table_area, footer_area, status_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(error_height),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    draw_tabs(data, frame, tabs_area);
    draw_toolbar(data, frame, toolbar_area);
    if let Some(error) = &data.error {
        let banner = Line::from(vec![
            " ⚠ ".bold(),
            Span::raw(error.clone()),
            " (press r to retry)".italic(),
        ])
        .style(Style::default().fg(Color::White).bg(Color::Red));
        frame.render_widget(Paragraph::new(banner), error_area);
    }
    draw_table(data, frame, table_area);
    draw_footer(data, frame, footer_area);
    frame.render_widget(
        Paragraph::new(Line::from(data.status_message.clone().dim())),
        status_area,
    );

    if let Some(popup) = &data.popup {
        draw_popup(popup, frame);
    }
}

fn draw_tabs(data: &UIData, frame: &mut Frame, area: Rect) {
    let tabs = Tabs::new(data.tabs.iter().copied())
        .select(data.current_tab)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .divider("|");
    frame.render_widget(tabs, area);
}

fn draw_toolbar(data: &UIData, frame: &mut Frame, area: Rect) {
    let page_size = format!("{}: {} [+]", data.rows_per_page, data.page_size);
    let selected = data.selected_label.clone().unwrap_or_default();
    let right_width = (page_size.chars().count() + selected.chars().count() + 3) as u16;
    let [search_area, right_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(right_width)]).areas(area);

    if let Some(query) = &data.search {
        let prefix = " / ";
        let line = if data.active_cmdinput {
            let cursor_x =
                search_area.x + prefix.chars().count() as u16 + data.cmdinput.cursor_pos as u16;
            let last_x = search_area.right().saturating_sub(1);
            frame.set_cursor_position((cursor_x.min(last_x), search_area.y));
            Line::from(vec![prefix.bold(), Span::raw(data.cmdinput.input.clone())])
        } else if query.is_empty() {
            Line::from(vec![prefix.bold(), data.search_placeholder.clone().dim()])
        } else {
            Line::from(vec![prefix.bold(), query.clone().yellow()])
        };
        frame.render_widget(Paragraph::new(line), search_area);
    }

    let mut spans = Vec::new();
    if !selected.is_empty() {
        spans.push(selected.cyan());
        spans.push(Span::raw("  "));
    }
    spans.push(Span::raw(page_size));
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(TextAlign::Right),
        right_area,
    );
}

fn text_align(alignment: Alignment) -> TextAlign {
    match alignment {
        Alignment::Left => TextAlign::Left,
        Alignment::Center => TextAlign::Center,
        Alignment::Right => TextAlign::Right,
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn column_widths(data: &UIData) -> Vec<Constraint> {
    let mut widths = Vec::with_capacity(data.header.len() + 1);
    if data.page_checked.is_some() {
        widths.push(Constraint::Length(SELECT_COLUMN_WIDTH));
    }
    widths.extend(data.header.iter().map(|h: &HeaderCell| match h.width {
        Some(w) => Constraint::Length(w),
        None => Constraint::Min(DEFAULT_COLUMN_WIDTH),
    }));
    widths
}

fn aligned_cell(text: String, alignment: Alignment) -> Cell<'static> {
    Cell::from(Line::from(text).alignment(text_align(alignment)))
}

fn draw_table(data: &UIData, frame: &mut Frame, area: Rect) {
    let mut header_cells: Vec<Cell> = Vec::new();
    if let Some(checked) = data.page_checked {
        header_cells.push(Cell::from(checkbox(checked)));
    }
    header_cells.extend(
        data.header
            .iter()
            .map(|h| aligned_cell(h.text.clone(), h.alignment)),
    );
    let header = Row::new(header_cells)
        .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Gray))
        .height(TABLE_HEADER_HEIGHT);

    let offset = usize::from(data.page_checked.is_some());
    let rows: Vec<Row> = match &data.body {
        UIBody::Rows(rows) => rows
            .iter()
            .map(|r| {
                let mut cells: Vec<Cell> = Vec::with_capacity(r.cells.len() + offset);
                if let Some(checked) = r.checked {
                    cells.push(Cell::from(checkbox(checked)));
                }
                cells.extend(
                    r.cells
                        .iter()
                        .zip(data.header.iter())
                        .map(|(text, h)| aligned_cell(text.clone(), h.alignment)),
                );
                Row::new(cells)
            })
            .collect(),
        UIBody::Loading(n) => (0..*n)
            .map(|_| {
                Row::new((0..data.header.len() + offset).map(|_| Cell::from(SKELETON_CELL)))
                    .style(Style::default().add_modifier(Modifier::DIM))
            })
            .collect(),
        UIBody::Empty(_) => Vec::new(),
    };

    let block = Block::bordered().border_set(border::ROUNDED);
    let inner = block.inner(area);

    let mut state = TableState::default();
    if let UIBody::Rows(_) = data.body {
        state = state
            .with_selected(Some(data.selected_row))
            .with_selected_column(Some(data.selected_column + offset));
    }

    let table = Table::new(rows, column_widths(data))
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_highlight_style(Style::default().fg(Color::Yellow))
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(table, area, &mut state);

    if let UIBody::Empty(text) = &data.body {
        let body = Rect {
            y: inner.y + TABLE_HEADER_HEIGHT + 1,
            height: inner.height.saturating_sub(TABLE_HEADER_HEIGHT + 1),
            ..inner
        };
        frame.render_widget(
            Paragraph::new(text.clone().dim()).alignment(TextAlign::Center),
            body,
        );
    }
}

fn draw_footer(data: &UIData, frame: &mut Frame, area: Rect) {
    let nav = |label: &'static str, enabled: bool| {
        if enabled {
            Span::raw(label).bold()
        } else {
            Span::raw(label).dim()
        }
    };
    let [range_area, nav_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(32)]).areas(area);

    frame.render_widget(Paragraph::new(format!(" {}", data.range_label)), range_area);
    let line = Line::from(vec![
        nav("« ", data.can_prev),
        nav("‹ prev ", data.can_prev),
        Span::raw(format!(" {} ", data.page_label)),
        nav(" next ›", data.can_next),
        nav(" »", data.can_next),
    ]);
    frame.render_widget(Paragraph::new(line).alignment(TextAlign::Right), nav_area);
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

fn draw_popup(popup: &Popup, frame: &mut Frame) {
    let area = popup_area(frame.area(), POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT);
    let (title, text) = match popup {
        Popup::Help(help) => (" Help ".to_string(), Text::from(help.clone())),
        Popup::Record { title, fields } => {
            let key_width = fields.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
            let lines: Vec<Line> = fields
                .iter()
                .map(|(k, v)| {
                    Line::from(vec![
                        format!("{k:>key_width$}: ").bold(),
                        Span::raw(v.clone()),
                    ])
                })
                .collect();
            (format!(" {title} "), Text::from(lines))
        }
    };
    let block = Block::bordered()
        .title(Line::from(title).bold().centered())
        .title_bottom(Line::from(" <Esc> close ").centered())
        .border_set(border::THICK);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputter::InputResult;
    use crate::model::UIRow;
    use ratatui::{Terminal, backend::TestBackend};

    fn uidata(body: UIBody) -> UIData {
        UIData {
            tabs: vec!["Characters", "Mock data"],
            current_tab: 1,
            header: vec![
                HeaderCell {
                    text: "# ▲".into(),
                    alignment: Alignment::Right,
                    width: Some(4),
                },
                HeaderCell {
                    text: "Name".into(),
                    alignment: Alignment::Left,
                    width: None,
                },
            ],
            page_checked: Some(false),
            body,
            selected_row: 0,
            selected_column: 0,
            search: Some(String::new()),
            search_placeholder: "Search...".into(),
            active_cmdinput: false,
            cmdinput: InputResult::default(),
            selected_label: None,
            rows_per_page: "Rows per page".into(),
            page_size: 10,
            range_label: "1-1 of 1".into(),
            page_label: "1 / 1".into(),
            can_prev: false,
            can_next: false,
            error: None,
            popup: None,
            status_message: "ready".into(),
        }
    }

    fn render(data: &UIData) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).expect("terminal");
        terminal.draw(|f| draw(data, f)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<String>>()
            .join("\n")
    }

    #[test]
    fn renders_rows_with_checkbox_and_sort_arrow() {
        let data = uidata(UIBody::Rows(vec![UIRow {
            checked: Some(true),
            cells: vec!["1".into(), "Ada Lovelace".into()],
        }]));
        let screen = render(&data);
        assert!(screen.contains("# ▲"));
        assert!(screen.contains("[x]"));
        assert!(screen.contains("Ada Lovelace"));
        assert!(screen.contains("1-1 of 1"));
        assert!(screen.contains("Search..."));
    }

    #[test]
    fn renders_no_results_and_error_banner() {
        let mut data = uidata(UIBody::Empty("No results".into()));
        data.error = Some("Request failed".into());
        let screen = render(&data);
        assert!(screen.contains("No results"));
        assert!(screen.contains("Request failed"));
    }

    #[test]
    fn renders_skeleton_while_loading() {
        let screen = render(&uidata(UIBody::Loading(2)));
        assert!(screen.contains(SKELETON_CELL));
        assert!(!screen.contains("No results"));
    }

    #[test]
    fn renders_record_popup() {
        let mut data = uidata(UIBody::Empty("No results".into()));
        data.popup = Some(Popup::Record {
            title: "Rick".into(),
            fields: vec![("species".into(), "Human".into())],
        });
        let screen = render(&data);
        assert!(screen.contains("species: Human"));
        assert!(screen.contains(" Rick "));
    }
}
