use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use derive_setters::Setters;

use crate::record::{Record, Value};

/// Semantic type of a field, fixed when a column is defined.
///
/// The kind decides how values compare when sorting and how exact filters
/// normalize their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Generic comparison of the raw values.
    #[default]
    Text,
    Number,
    Date,
    Bool,
}

impl FieldKind {
    /// Kind derived from the field name convention: `date`, `dateTime`,
    /// `startDate`, `createdAt`, `created_at` are dates, everything else is text.
    pub fn infer(field: &str) -> Self {
        let lower = field.to_ascii_lowercase();
        let date_like = lower == "date"
            || lower == "datetime"
            || field.ends_with("Date")
            || field.ends_with("DateTime")
            || lower.ends_with("_date")
            || lower.ends_with("_at")
            || (field.len() > 2 && field.ends_with("At"));
        if date_like {
            FieldKind::Date
        } else {
            FieldKind::Text
        }
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Milliseconds since the epoch for an ISO-8601 date or datetime.
///
/// Offsets are honoured, naive values are taken as UTC. Numbers are assumed
/// to already be epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    let s = match value {
        Value::Number(n) => return Some(*n as i64),
        Value::Text(s) => s.trim(),
        _ => return None,
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// The `YYYY-MM-DD` portion of a date value, or the whole text when it is shorter.
pub fn day_of(value: &Value) -> String {
    let text = value.to_string();
    match text.get(..10) {
        Some(day) if text.as_bytes().get(4) == Some(&b'-') => day.to_string(),
        _ => text,
    }
}

pub type Formatter = Arc<dyn Fn(&Value, &Record) -> String + Send + Sync>;

/// How a column turns a value into a cell.
#[derive(Clone, Default)]
pub enum Renderer {
    /// The raw field value, untouched.
    #[default]
    Raw,
    Format(Formatter),
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderer::Raw => f.write_str("Raw"),
            Renderer::Format(_) => f.write_str("Format(..)"),
        }
    }
}

/// A displayable cell produced for one record and one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Raw(&'a Value),
    Formatted(String),
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Raw(value) => value.fmt(f),
            Cell::Formatted(s) => f.write_str(s),
        }
    }
}

/// Declarative description of one table column.
///
/// Several columns may share a field, e.g. a data column and an actions column
/// both bound to `id`.
#[derive(Debug, Clone, Setters)]
pub struct Column {
    #[setters(skip)]
    pub field: String,
    #[setters(skip)]
    pub title: String,
    pub sortable: bool,
    pub kind: FieldKind,
    /// Whether the column is written by CSV export. Action columns usually are not.
    pub exportable: bool,
    #[setters(skip)]
    pub renderer: Renderer,
}

impl Column {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            kind: FieldKind::infer(&field),
            field,
            title: title.into(),
            sortable: true,
            exportable: true,
            renderer: Renderer::Raw,
        }
    }

    /// Attach a formatter. The formatter receives the field value and the whole record.
    pub fn render<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value, &Record) -> String + Send + Sync + 'static,
    {
        self.renderer = Renderer::Format(Arc::new(formatter));
        self
    }

    pub fn cell<'a>(&self, record: &'a Record) -> Cell<'a> {
        let value = record.get(&self.field);
        match &self.renderer {
            Renderer::Raw => Cell::Raw(value),
            Renderer::Format(formatter) => Cell::Formatted(formatter(value, record)),
        }
    }
}
