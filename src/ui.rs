use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Widget, Wrap},
};

use dashtable::domain::TVConfig;

use crate::model::{Model, UIData};

const HEADER_STYLE: Style = Style::new().add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new().add_modifier(Modifier::REVERSED);

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

/// Table with its border, one data page at a time.
struct TableView<'a> {
    uidata: &'a UIData,
    max_column_width: usize,
}

/// Page window and "Showing X to Y of Z" line below the table.
struct PagerLine<'a> {
    uidata: &'a UIData,
}

impl TableUI {
    pub fn new(config: &TVConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, pager_area, status_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(
            TableView {
                uidata,
                max_column_width: self.max_column_width,
            },
            table_area,
        );
        frame.render_widget(PagerLine { uidata }, pager_area);
        self.draw_statusline(uidata, status_area, frame);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or(": ");
            let input = uidata.cmdinput.input.as_str();
            let line = Line::from(vec![prompt.bold(), Span::raw(input)]);
            frame.render_widget(Paragraph::new(line), area);

            let prompt_width = prompt.chars().count() as u16;
            let cursor_x = area.x + prompt_width + uidata.cmdinput.curser_pos as u16;
            let cursor_x = cursor_x.min(area.right().saturating_sub(1));
            frame.set_cursor_position((cursor_x, area.y));
            return;
        }

        let filters = if uidata.active_filters.is_empty() {
            String::new()
        } else {
            format!(" [{}] ", uidata.active_filters.join(", "))
        };
        let [message_area, filter_area] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(filters.chars().count() as u16),
        ])
        .areas(area);
        let message = Paragraph::new(uidata.status_message.as_str());
        frame.render_widget(message, message_area);
        frame.render_widget(Paragraph::new(filters.yellow()), filter_area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let text = Text::from(uidata.popup_message.as_str());
        let height = (text.height() as u16).saturating_add(2);
        let width = (text.width() as u16).saturating_add(4);

        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(area);

        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::THICK);
        let wrap = Wrap { trim: false };
        let popup = Paragraph::new(text).wrap(wrap).block(block);
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

impl Widget for TableView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let uidata = self.uidata;
        let title = Line::from(format!(" {} ", uidata.name).bold());
        let records = Line::from(format!(" {} records ", uidata.total_records));
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(records.right_aligned())
            .border_set(border::THICK);

        let header = Row::new(uidata.header.iter().enumerate().map(|(idx, h)| {
            let indicator = h.direction.map(|d| d.indicator()).unwrap_or(" ");
            let cell = Cell::from(format!("{} {}", h.title, indicator));
            if idx == uidata.selected_column {
                cell.style(HEADER_STYLE.patch(SELECTED_STYLE))
            } else {
                cell.style(HEADER_STYLE)
            }
        }))
        .bottom_margin(1);

        let rows = uidata.rows.iter().map(|row| {
            Row::new(row.iter().enumerate().map(|(idx, value)| {
                let cell = Cell::from(value.as_str());
                if idx == uidata.selected_column {
                    cell.style(Style::new().add_modifier(Modifier::BOLD))
                } else {
                    cell
                }
            }))
        });

        let widths = uidata
            .widths
            .iter()
            .map(|w| Constraint::Length((*w).min(self.max_column_width) as u16));

        let inner = block.inner(area);
        Table::new(rows, widths)
            .header(header)
            .column_spacing(2)
            .block(block)
            .render(area, buf);

        if let Some(message) = &uidata.placeholder {
            // Below the header row and its margin
            let rows = [Constraint::Length(2), Constraint::Length(1)];
            let [_, message_area] = Layout::vertical(rows).areas(inner);
            Paragraph::new(message.as_str().italic())
                .centered()
                .render(message_area, buf);
        }
    }
}

impl Widget for PagerLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let uidata = self.uidata;
        let mut spans: Vec<Span> = Vec::new();

        if uidata.show_controls {
            let previous = if uidata.current_page > 1 { "‹ " } else { "  " };
            spans.push(previous.into());
            for page in uidata.window.iter() {
                if *page == uidata.current_page {
                    spans.push(format!("[{page}]").blue().bold());
                } else {
                    spans.push(format!(" {page} ").into());
                }
            }
            let has_next = uidata.current_page < uidata.total_pages;
            let next = if has_next { " ›" } else { "  " };
            spans.push(next.into());
            let position = format!("   page {}/{}", uidata.current_page, uidata.total_pages);
            spans.push(position.dark_gray());
            spans.push("   ".into());
        }

        if let Some(summary) = uidata.summary {
            spans.push(Span::raw(format!(
                "Showing {} to {} of {} entries",
                summary.first, summary.last, summary.total
            )));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
