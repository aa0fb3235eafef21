use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use dashtable::column::{Column, FieldKind};
use dashtable::domain::{CMDMode, DashError, HELP_TEXT, Message, TVConfig, expand_path};
use dashtable::export;
use dashtable::filter::Filter;
use dashtable::loader::Dataset;
use dashtable::record::Record;
use dashtable::view::{Body, DataView, Header, Summary};

use crate::inputter::{InputResult, Inputter};

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

/// A filter set from the command line on one column.
struct ColumnFilter {
    field: String,
    mode: CMDMode,
    label: String,
    filter: Filter,
}

/// Everything the ui needs to draw one frame.
pub struct UIData {
    pub name: String,
    pub header: Vec<Header>,
    pub rows: Vec<Vec<String>>,
    pub placeholder: Option<String>,
    pub widths: Vec<usize>,
    pub selected_column: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub window: Vec<usize>,
    pub summary: Option<Summary>,
    pub show_controls: bool,
    pub total_records: usize,
    pub active_filters: Vec<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            header: Vec::new(),
            rows: Vec::new(),
            placeholder: None,
            widths: Vec::new(),
            selected_column: 0,
            current_page: 1,
            total_pages: 0,
            window: Vec::new(),
            summary: None,
            show_controls: false,
            total_records: 0,
            active_filters: Vec::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    records: Vec<Record>,
    view: DataView,
    column_widths: Vec<usize>,
    search: Option<(String, Filter)>,
    column_filters: Vec<ColumnFilter>,
    selected_column: usize,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: &TVConfig, dataset: Dataset) -> Self {
        let columns: Vec<Column> = dataset
            .columns
            .iter()
            .map(|(name, kind)| Column::new(name.clone(), name.clone()).kind(*kind))
            .collect();
        let max_width = config.max_column_width;
        let column_widths = Self::calculate_column_widths(&columns, &dataset.records, max_width);
        let view = config.view.clone().build(columns);

        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Clipboard not available: {e}");
                None
            }
        };

        let mut model = Self {
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: dataset.name,
            records: dataset.records,
            view,
            column_widths,
            search: None,
            column_filters: Vec::new(),
            selected_column: 0,
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        let count = model.records.len();
        model.set_status_message(format!("Loaded {count} records, press ? for help"));
        model.update_table_data();
        model
    }

    fn calculate_column_widths(
        columns: &[Column],
        records: &[Record],
        max_column_width: usize,
    ) -> Vec<usize> {
        columns
            .iter()
            .map(|column| {
                let data_width = records
                    .iter()
                    .map(|r| column.cell(r).to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                // Room for the sort indicator next to the title
                let title_width = column.title.chars().count() + 2;
                std::cmp::max(title_width, data_width).min(max_column_width)
            })
            .collect()
    }

    fn single_line(s: String) -> String {
        s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    fn filter_labels(&self) -> Vec<String> {
        self.search
            .iter()
            .map(|(label, _)| label.clone())
            .chain(self.column_filters.iter().map(|f| f.label.clone()))
            .collect()
    }

    /// Re-run the view over the records and rebuild what the ui shows.
    fn update_table_data(&mut self) {
        let output = self.view.render(&self.records);

        let (rows, placeholder) = match &output.body {
            Body::Rows(rows) => (
                rows.iter()
                    .map(|row| {
                        row.cells
                            .iter()
                            .map(|c| Self::single_line(c.to_string()))
                            .collect()
                    })
                    .collect(),
                None,
            ),
            Body::Placeholder { message, .. } => (Vec::new(), Some(message.clone())),
        };

        trace!(
            "Table: page {}/{}, {} rows, window {:?}",
            output.current_page,
            output.total_pages,
            rows.len(),
            output.window
        );

        self.uidata = UIData {
            name: self.name.clone(),
            header: output.header.clone(),
            rows,
            placeholder,
            widths: self.column_widths.clone(),
            selected_column: self.selected_column,
            current_page: output.current_page,
            total_pages: output.total_pages,
            window: output.window.clone(),
            summary: output.summary,
            show_controls: output.show_controls,
            total_records: output.total_records,
            active_filters: self.filter_labels(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DashError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveLeft => self.move_column_selection(-1),
                    Message::MoveRight => self.move_column_selection(1),
                    Message::Sort | Message::Enter => self.sort_selected_column(),
                    Message::NextPage => self.change_page(|view| view.next_page()),
                    Message::PreviousPage => self.change_page(|view| view.previous_page()),
                    Message::FirstPage => self.change_page(|view| view.first_page()),
                    Message::LastPage => self.change_page(|view| view.last_page()),
                    Message::GoToPage => self.enter_cmd_mode(CMDMode::GoToPage),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::Filter => self.enter_cmd_mode(CMDMode::FilterColumn),
                    Message::DateRange => self.enter_cmd_mode(CMDMode::DateRange),
                    Message::Export => self.enter_cmd_mode(CMDMode::Export),
                    Message::ResetFilters => self.reset_filters(),
                    Message::CopyPage => self.copy_page(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized to w:{width}, h:{height}");
        self.update_table_data();
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
                self.uidata.last_update = Instant::now();
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn move_column_selection(&mut self, step: isize) {
        let ncolumns = self.view.columns().len();
        if ncolumns == 0 {
            return;
        }
        self.selected_column = self
            .selected_column
            .saturating_add_signed(step)
            .min(ncolumns - 1);
        self.uidata.selected_column = self.selected_column;
        self.uidata.last_update = Instant::now();
    }

    fn sort_selected_column(&mut self) {
        if self.view.click_header(self.selected_column) {
            let sort = self.view.sort_state();
            let field = sort.field.clone().unwrap_or_default();
            self.set_status_message(format!("Sorted by {field} {}", sort.direction));
            self.update_table_data();
        } else {
            self.set_status_message("Column is not sortable");
        }
    }

    fn change_page(&mut self, step: impl FnOnce(&mut DataView) -> bool) {
        if step(&mut self.view) {
            self.update_table_data();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        if mode == CMDMode::Export {
            self.input.set(&format!("./{}.export.csv", self.name));
        }
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
            self.uidata.cmd_mode = self.cmd_mode;
            self.uidata.active_cmdinput = self.active_cmdinput;
            self.uidata.last_update = Instant::now();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            self.update_table_data();
            return;
        }

        let cmd_input = self.last_input.input.trim().to_string();
        match mode {
            Some(CMDMode::Search) => self.search(&cmd_input),
            Some(CMDMode::FilterColumn) => self.filter_selected_column(&cmd_input),
            Some(CMDMode::DateRange) => self.date_range_selected_column(&cmd_input),
            Some(CMDMode::GoToPage) => self.go_to_page(&cmd_input),
            Some(CMDMode::Export) => self.export(&cmd_input),
            None => info!("Cmd mode is none!"),
        }
        self.update_table_data();
    }

    fn selected_field(&self) -> Option<(String, FieldKind)> {
        self.view
            .columns()
            .get(self.selected_column)
            .map(|c| (c.field.clone(), c.kind))
    }

    fn apply_filters(&mut self) {
        let start_time = Instant::now();
        let filters = self
            .search
            .iter()
            .map(|(_, f)| f.clone())
            .chain(self.column_filters.iter().map(|f| f.filter.clone()))
            .collect();
        self.view.set_filters(filters);
        self.update_table_data();
        let matches = self.uidata.summary.map(|s| s.total).unwrap_or(0);
        debug!(
            "Applied {} filters, {} matches in {}ms",
            self.view.filters().len(),
            matches,
            start_time.elapsed().as_millis()
        );
        self.set_status_message(format!("{matches} of {} records match", self.records.len()));
    }

    fn search(&mut self, term: &str) {
        trace!("Starting search for {} ...", term);
        self.search = if term.is_empty() {
            None
        } else {
            let fields: Vec<String> = self.view.columns().iter().map(|c| c.field.clone()).collect();
            Some((format!("/{term}"), Filter::contains_any(fields, term)))
        };
        self.apply_filters();
    }

    fn set_column_filter(&mut self, field: String, mode: CMDMode, label: String, filter: Filter) {
        self.column_filters
            .retain(|f| !(f.field == field && f.mode == mode));
        if filter.is_active() {
            self.column_filters.push(ColumnFilter {
                field,
                mode,
                label,
                filter,
            });
        }
        self.apply_filters();
    }

    fn filter_selected_column(&mut self, value: &str) {
        if let Some((field, kind)) = self.selected_field() {
            let label = format!("{field} = {value}");
            let filter = Filter::exact_as(field.clone(), value, kind);
            self.set_column_filter(field, CMDMode::FilterColumn, label, filter);
        }
    }

    fn date_range_selected_column(&mut self, range: &str) {
        let Some((field, _)) = self.selected_field() else {
            return;
        };
        let (start, end) = match range.split_once("..") {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (range, range),
        };
        let bound = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let label = format!("{field} in {start}..{end}");
        let filter = Filter::date_range(field.clone(), bound(start), bound(end));
        self.set_column_filter(field, CMDMode::DateRange, label, filter);
    }

    fn reset_filters(&mut self) {
        self.search = None;
        self.column_filters.clear();
        self.view.clear_filters();
        self.update_table_data();
        self.set_status_message("Filters cleared");
    }

    fn go_to_page(&mut self, input: &str) {
        match input.parse::<usize>() {
            Ok(page) if self.view.go_to_page(page) || self.view.current_page() == page => {}
            _ => {
                let pages = self.view.total_pages();
                self.set_status_message(format!("No page \"{input}\", there are {pages} pages"));
            }
        }
    }

    fn export(&mut self, path: &str) {
        let result = expand_path(path).and_then(|target| {
            let written = export::export_file(&self.view, &self.records, &target)?;
            Ok((written, target))
        });
        match result {
            Ok((written, target)) => {
                let target = target.display();
                self.set_status_message(format!("Exported {written} records to {target}"));
            }
            Err(e) => {
                error!("Export to {path} failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn copy_page(&mut self) {
        let columns = self.view.columns();
        let exportable: Vec<bool> = columns.iter().map(|c| c.exportable).collect();
        let titles = columns.iter().filter(|c| c.exportable);
        let mut lines = vec![export::csv_line(titles.map(|c| c.title.as_str()))];
        for row in self.uidata.rows.iter() {
            let kept = row.iter().zip(&exportable).filter(|(_, keep)| **keep);
            lines.push(export::csv_line(kept.map(|(cell, _)| cell.as_str())));
        }
        let content = lines.join("\n");
        let rows = self.uidata.rows.len();

        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("No clipboard available");
            return;
        };
        match clipboard.set_text(content).map_err(DashError::from) {
            Ok(_) => self.set_status_message(format!("Copied {rows} rows")),
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message(format!("Copy failed: {e}"));
            }
        }
    }
}
