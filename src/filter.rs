use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::column::{FieldKind, day_of};
use crate::record::{Record, Value};

/// Filter value meaning "do not filter", as offered by select boxes.
pub const ALL: &str = "all";

pub type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// A single predicate over records. Filters are combined with logical AND.
#[derive(Clone)]
pub enum Filter {
    /// `field == value`, compared according to `kind`. Without a kind the
    /// view's column for `field` decides, then the field name.
    Exact {
        field: String,
        value: String,
        kind: Option<FieldKind>,
    },
    /// Case insensitive containment in any of `fields`.
    Contains {
        fields: Vec<String>,
        /// Trimmed before matching.
        text: String,
    },
    /// Inclusive `YYYY-MM-DD` bounds, each optional.
    DateRange {
        field: String,
        start: Option<String>,
        end: Option<String>,
    },
    Custom(Predicate),
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Exact { field, value, kind } => {
                write!(f, "Exact({field} == {value:?} as {kind:?})")
            }
            Filter::Contains { fields, text } => write!(f, "Contains({fields:?} ~ {text:?})"),
            Filter::DateRange { field, start, end } => {
                write!(f, "DateRange({field} in {start:?}..={end:?})")
            }
            Filter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(ALL)
}

fn bound(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Booleans as select boxes spell them.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "active" | "1" => Some(true),
        "false" | "no" | "inactive" | "0" => Some(false),
        _ => None,
    }
}

impl Filter {
    /// Exact match compared as the kind of the column bound to `field`.
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Exact {
            field: field.into(),
            value: value.into(),
            kind: None,
        }
    }

    pub fn exact_as(
        field: impl Into<String>,
        value: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        Filter::Exact {
            field: field.into(),
            value: value.into(),
            kind: Some(kind),
        }
    }

    /// Give an exact filter without a kind the kind `kind_of` reports for its field.
    pub fn resolve_kind(self, kind_of: impl Fn(&str) -> Option<FieldKind>) -> Self {
        match self {
            Filter::Exact {
                field,
                value,
                kind: None,
            } => Filter::Exact {
                kind: kind_of(&field),
                field,
                value,
            },
            other => other,
        }
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Filter::Contains {
            fields: vec![field.into()],
            text: text.into(),
        }
    }

    pub fn contains_any<I, S>(fields: I, text: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Contains {
            fields: fields.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }

    pub fn date_range(
        field: impl Into<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> Self {
        Filter::DateRange {
            field: field.into(),
            start,
            end,
        }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Filter::Custom(Arc::new(predicate))
    }

    /// Inactive filters accept every record.
    pub fn is_active(&self) -> bool {
        match self {
            Filter::Exact { value, .. } => !is_blank(value),
            Filter::Contains { text, .. } => !text.trim().is_empty(),
            Filter::DateRange { start, end, .. } => bound(start).is_some() || bound(end).is_some(),
            Filter::Custom(_) => true,
        }
    }

    pub fn accepts(&self, record: &Record) -> bool {
        if !self.is_active() {
            return true;
        }
        match self {
            Filter::Exact { field, value, kind } => {
                let kind = kind.unwrap_or_else(|| FieldKind::infer(field));
                exact_match(record.get(field), value, kind)
            }
            Filter::Contains { fields, text } => {
                let needle = text.trim().to_lowercase();
                fields
                    .iter()
                    .any(|field| record.get(field).search_text().contains(&needle))
            }
            Filter::DateRange { field, start, end } => {
                let value = record.get(field);
                if value.is_null() {
                    return false;
                }
                let day = day_of(value);
                bound(start).is_none_or(|s| day.as_str() >= s)
                    && bound(end).is_none_or(|e| day.as_str() <= e)
            }
            Filter::Custom(predicate) => predicate(record),
        }
    }
}

fn exact_match(actual: &Value, wanted: &str, kind: FieldKind) -> bool {
    let wanted = wanted.trim();
    match kind {
        FieldKind::Number => match (wanted.parse::<f64>(), actual.as_f64()) {
            (Ok(w), Some(a)) => w == a,
            _ => false,
        },
        FieldKind::Bool => match (parse_flag(wanted), actual) {
            (Some(w), Value::Bool(a)) => w == *a,
            (Some(w), other) => parse_flag(&other.to_string()) == Some(w),
            _ => false,
        },
        FieldKind::Date => !actual.is_null() && day_of(actual) == wanted,
        FieldKind::Text => !actual.is_null() && actual.to_string() == wanted,
    }
}

/// Keep the records every filter accepts, in input order.
pub fn filter<'a, I>(records: I, filters: &[Filter]) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let start_time = Instant::now();
    let active: Vec<&Filter> = filters.iter().filter(|f| f.is_active()).collect();
    let matches: Vec<&Record> = records
        .into_iter()
        .filter(|record| active.iter().all(|f| f.accepts(record)))
        .collect();
    trace!(
        "Filtered with {} active filters to {} records in {}us",
        active.len(),
        matches.len(),
        start_time.elapsed().as_micros()
    );
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<Record> {
        vec![
            Record::new()
                .with("id", 1)
                .with("name", "Alice Martin")
                .with("email", "alice@example.com")
                .with("role", "patient")
                .with("active", true)
                .with("createdAt", "2024-01-10"),
            Record::new()
                .with("id", 2)
                .with("name", "Bob Stone")
                .with("email", "bob@clinic.org")
                .with("role", "doctor")
                .with("active", false)
                .with("createdAt", "2024-02-03"),
            Record::new()
                .with("id", 3)
                .with("name", "")
                .with("email", "carol@example.com")
                .with("role", "admin")
                .with("active", true),
            Record::new()
                .with("id", 4)
                .with("name", "Dan Alison")
                .with("role", "patient")
                .with("active", true)
                .with("createdAt", "2024-03-15T09:30:00Z"),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.get("id").to_string()).collect()
    }

    fn flag(value: &str) -> Filter {
        Filter::exact_as("active", value, FieldKind::Bool)
    }

    #[test]
    fn blank_and_all_filters_are_inactive() {
        let records = users();
        for f in [
            Filter::exact("role", ""),
            Filter::exact("role", "all"),
            Filter::exact("role", "All"),
            Filter::contains("name", "  "),
            Filter::date_range("createdAt", None, Some(String::new())),
        ] {
            assert!(!f.is_active());
            assert_eq!(filter(&records, &[f]).len(), 4);
        }
    }

    #[test]
    fn inactive_filter_keeps_records_with_empty_fields() {
        let records = users();
        let out = filter(&records, &[Filter::exact("name", "")]);
        assert!(out.iter().any(|r| r.get("id") == &Value::from(3)));
    }

    #[test]
    fn substring_is_case_insensitive_and_spans_fields() {
        let records = users();
        let out = filter(&records, &[Filter::contains_any(["name", "email"], "ALI")]);
        assert_eq!(ids(&out), ["1", "4"]);

        let search = Filter::contains_any(["name", "email"], "example");
        let out = filter(&records, &[search]);
        assert_eq!(ids(&out), ["1", "3"]);
    }

    #[test]
    fn substring_on_missing_field_never_matches() {
        let records = users();
        let out = filter(&records, &[Filter::contains("email", "dan")]);
        assert!(out.is_empty());
    }

    #[test]
    fn numeric_ids_from_select_boxes() {
        let records = users();
        let by_id = |v: &str| Filter::exact_as("id", v, FieldKind::Number);
        let out = filter(&records, &[by_id("2")]);
        assert_eq!(ids(&out), ["2"]);
        let out = filter(&records, &[by_id("two")]);
        assert!(out.is_empty());
    }

    #[test]
    fn boolean_status_vocabulary() {
        let records = users();
        let active = filter(&records, &[flag("active")]);
        assert_eq!(ids(&active), ["1", "3", "4"]);
        let inactive = filter(&records, &[flag("false")]);
        assert_eq!(ids(&inactive), ["2"]);
    }

    #[test]
    fn date_range_bounds_are_inclusive_and_independent() {
        let records = users();
        let from = |s: &str| Some(s.to_string());
        let range = |s, e| Filter::date_range("createdAt", s, e);

        let out = filter(&records, &[range(from("2024-02-03"), None)]);
        assert_eq!(ids(&out), ["2", "4"]);

        let out = filter(&records, &[range(None, from("2024-02-03"))]);
        assert_eq!(ids(&out), ["1", "2"]);

        let day = from("2024-03-15");
        let out = filter(&records, &[range(day.clone(), day)]);
        assert_eq!(ids(&out), ["4"]);
    }

    #[test]
    fn exact_day_on_datetime_field() {
        let records = users();
        let out = filter(&records, &[Filter::exact("createdAt", "2024-03-15")]);
        assert_eq!(ids(&out), ["4"]);
    }

    #[test]
    fn exact_kind_resolved_from_column() {
        let records = users();
        let by_name = Filter::exact("id", "02");
        assert!(filter(&records, &[by_name.clone()]).is_empty());

        let kind_of = |f: &str| (f == "id").then_some(FieldKind::Number);
        let resolved = by_name.resolve_kind(kind_of);
        assert_eq!(ids(&filter(&records, &[resolved])), ["2"]);

        let explicit = Filter::exact_as("id", "02", FieldKind::Text)
            .resolve_kind(|_| Some(FieldKind::Number));
        assert!(filter(&records, &[explicit]).is_empty());
    }

    #[test]
    fn composition_is_order_independent() {
        let records = users();
        let p1 = Filter::exact("role", "patient");
        let p2 = flag("true");
        let p3 = Filter::custom(|r| r.get("id").as_f64().is_some_and(|id| id > 1.0));

        let chained = filter(filter(&records, &[p1.clone()]), &[p2.clone(), p3.clone()]);
        let together = filter(&records, &[p1.clone(), p2.clone(), p3.clone()]);
        let reversed = filter(&records, &[p3, p2, p1]);
        assert_eq!(ids(&chained), ["4"]);
        assert_eq!(ids(&chained), ids(&together));
        assert_eq!(ids(&together), ids(&reversed));
    }

    #[test]
    fn filter_is_stable() {
        let records = users();
        let out = filter(&records, &[flag("true")]);
        assert_eq!(ids(&out), ["1", "3", "4"]);
    }
}
