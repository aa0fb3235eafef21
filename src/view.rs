//! The data view: one parameterized table engine per screen.
//!
//! A [`DataView`] owns the sort and pagination state of a table and turns a
//! borrowed record store into the rows of the current page:
//!
//! records -> filter -> sort -> paginate -> cells
//!
//! Everything is recomputed on every [`DataView::render`] call.
use std::time::Instant;

use derive_setters::Setters;
use tracing::{debug, trace};

use crate::column::{Cell, Column, FieldKind};
use crate::filter::{Filter, filter};
use crate::pagination::Pagination;
use crate::record::{Record, Value};
use crate::sort::{SortDirection, SortState, sort};

/// Construction parameters of a [`DataView`].
#[derive(Debug, Clone, Setters)]
pub struct ViewConfig {
    pub page_size: usize,
    #[setters(strip_option)]
    pub default_sort_field: Option<String>,
    pub default_direction: SortDirection,
    #[setters(into)]
    pub key_field: String,
    /// Placeholder when the record store itself is empty.
    #[setters(into)]
    pub empty_message: String,
    /// Placeholder when the filters removed every record.
    #[setters(into)]
    pub no_results_message: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            default_sort_field: None,
            default_direction: SortDirection::Ascending,
            key_field: "id".to_string(),
            empty_message: "No data available".to_string(),
            no_results_message: "No results found".to_string(),
        }
    }
}

impl ViewConfig {
    pub fn build(self, columns: Vec<Column>) -> DataView {
        DataView::new(self, columns)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub title: String,
    pub field: String,
    pub sortable: bool,
    /// Set on sortable headers bound to the active sort field.
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub key: &'a Value,
    pub cells: Vec<Cell<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body<'a> {
    Rows(Vec<Row<'a>>),
    /// A single cell spanning `span` columns.
    Placeholder { message: String, span: usize },
}

/// "Showing `first` to `last` of `total` entries", 1 based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutput<'a> {
    pub header: Vec<Header>,
    pub body: Body<'a>,
    pub current_page: usize,
    pub total_pages: usize,
    pub window: Vec<usize>,
    pub summary: Option<Summary>,
    /// Pagination controls are only useful when there is more than one page of matches.
    pub show_controls: bool,
    pub sort: SortState,
    pub total_records: usize,
}

impl ViewOutput<'_> {
    pub fn rows(&self) -> &[Row<'_>] {
        match &self.body {
            Body::Rows(rows) => rows,
            Body::Placeholder { .. } => &[],
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Filter, sort and page state of one table.
///
/// Page navigation is bounded by the page count of the last [`DataView::render`]
/// or [`DataView::update_page_count`]. A view that has seen neither has no pages.
pub struct DataView {
    config: ViewConfig,
    columns: Vec<Column>,
    filters: Vec<Filter>,
    sort: SortState,
    pagination: Pagination,
    // Page count of the last render, bounds navigation
    total_pages: usize,
}

impl DataView {
    pub fn new(config: ViewConfig, columns: Vec<Column>) -> Self {
        let sort = SortState::new(config.default_sort_field.clone(), config.default_direction);
        let pagination = Pagination::new(config.page_size);
        debug!(
            "New data view with {} columns, page size {}, sort {:?}",
            columns.len(),
            pagination.page_size(),
            sort
        );
        Self {
            config,
            columns,
            filters: Vec::new(),
            sort,
            pagination,
            total_pages: 0,
        }
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.set_filters(filters);
        self
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.filters = filters.into_iter().map(|f| self.bind_filter(f)).collect();
    }

    pub fn push_filter(&mut self, filter: Filter) {
        let filter = self.bind_filter(filter);
        self.filters.push(filter);
    }

    // Exact filters without a kind compare as the column bound to their field
    fn bind_filter(&self, filter: Filter) -> Filter {
        filter.resolve_kind(|field| {
            self.columns
                .iter()
                .find(|c| c.field == field)
                .map(|c| c.kind)
        })
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn current_page(&self) -> usize {
        self.pagination.current_page()
    }

    pub fn page_size(&self) -> usize {
        self.pagination.page_size()
    }

    /// Page count as of the last render.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Recount the pages of `records` under the current filters without
    /// rendering, clamping the current page. Returns the new page count.
    pub fn update_page_count(&mut self, records: &[Record]) -> usize {
        let matches = filter(records, &self.filters);
        self.total_pages = self.pagination.total_pages(matches.len());
        self.pagination.clamp(self.total_pages);
        self.total_pages
    }

    /// Header click on column `idx`. Non sortable or unknown columns leave the
    /// sort state untouched. Returns whether the click was accepted.
    pub fn click_header(&mut self, idx: usize) -> bool {
        match self.columns.get(idx) {
            Some(column) if column.sortable => {
                self.sort.click(&column.field);
                true
            }
            Some(column) => {
                trace!("Column \"{}\" is not sortable", column.title);
                false
            }
            None => false,
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.pagination.go_to_page(page, self.total_pages)
    }

    pub fn previous_page(&mut self) -> bool {
        self.pagination.previous(self.total_pages)
    }

    pub fn next_page(&mut self) -> bool {
        self.pagination.next(self.total_pages)
    }

    pub fn first_page(&mut self) -> bool {
        self.pagination.go_to_page(1, self.total_pages)
    }

    pub fn last_page(&mut self) -> bool {
        self.pagination.go_to_page(self.total_pages, self.total_pages)
    }

    /// Kind used to sort `field`: that of the first column bound to it.
    fn sort_kind(&self, field: &str) -> FieldKind {
        self.columns
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.kind)
            .unwrap_or_else(|| FieldKind::infer(field))
    }

    /// All records passing the filters, in sort order.
    pub fn matching<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        let matches = filter(records, &self.filters);
        let field = self.sort.field.as_deref();
        let kind = field.map(|f| self.sort_kind(f)).unwrap_or_default();
        sort(matches, field, kind, self.sort.direction)
    }

    pub fn render<'a>(&mut self, records: &'a [Record]) -> ViewOutput<'a> {
        let start_time = Instant::now();
        let matches = self.matching(records);

        self.total_pages = self.pagination.total_pages(matches.len());
        self.pagination.clamp(self.total_pages);
        let page = self.pagination.page(&matches);

        let header = self
            .columns
            .iter()
            .map(|c| Header {
                title: c.title.clone(),
                field: c.field.clone(),
                sortable: c.sortable,
                direction: if c.sortable {
                    self.sort.direction_for(&c.field)
                } else {
                    None
                },
            })
            .collect();

        let body = if page.items.is_empty() {
            let message = if records.is_empty() {
                &self.config.empty_message
            } else {
                &self.config.no_results_message
            };
            Body::Placeholder {
                message: message.clone(),
                span: self.columns.len(),
            }
        } else {
            Body::Rows(
                page.items
                    .iter()
                    .map(|&record| Row {
                        key: record.get(&self.config.key_field),
                        cells: self.columns.iter().map(|c| c.cell(record)).collect(),
                    })
                    .collect(),
            )
        };

        let offset = (self.pagination.current_page() - 1) * self.pagination.page_size();
        let summary = (!page.items.is_empty()).then(|| Summary {
            first: offset + 1,
            last: offset + page.items.len(),
            total: matches.len(),
        });

        debug!(
            "Rendered page {}/{} with {} of {} matching records in {}us",
            self.pagination.current_page(),
            self.total_pages,
            page.items.len(),
            matches.len(),
            start_time.elapsed().as_micros()
        );

        ViewOutput {
            header,
            body,
            current_page: self.pagination.current_page(),
            total_pages: self.total_pages,
            window: page.window,
            summary,
            show_controls: matches.len() > self.pagination.page_size(),
            sort: self.sort.clone(),
            total_records: records.len(),
        }
    }
}
