//! Table view engine for admin dashboards.
//!
//! A [`DataView`] presents an arbitrary record store as a sortable, filterable,
//! paginated table driven by declarative [`Column`] and [`Filter`] definitions.
//!
//! ```
//! use dashtable::{Column, Filter, Record, SortDirection, ViewConfig};
//!
//! let records: Vec<Record> = (1..=12)
//!     .map(|i| {
//!         Record::new()
//!             .with("id", i)
//!             .with("status", if i % 3 == 0 { "cancelled" } else { "scheduled" })
//!     })
//!     .collect();
//!
//! let mut view = ViewConfig::default()
//!     .page_size(10)
//!     .default_direction(SortDirection::Descending)
//!     .build(vec![Column::new("id", "ID"), Column::new("status", "Status")])
//!     .with_filters(vec![Filter::exact("status", "cancelled")]);
//!
//! let output = view.render(&records);
//! assert_eq!(output.rows().len(), 4);
//! assert_eq!(output.window, vec![1]);
//! ```
pub mod column;
pub mod domain;
pub mod export;
pub mod filter;
pub mod loader;
pub mod pagination;
pub mod record;
pub mod sort;
pub mod view;

pub use column::{Cell, Column, FieldKind, Renderer};
pub use domain::{DashError, TVConfig};
pub use filter::{ALL, Filter, filter};
pub use pagination::{Page, Pagination, page_window, paginate};
pub use record::{Record, Value};
pub use sort::{SortDirection, SortState, sort};
pub use view::{Body, DataView, Header, Row, Summary, ViewConfig, ViewOutput};
