use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use tracing::trace;

use crate::column::{FieldKind, parse_timestamp};
use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("asc"),
            SortDirection::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("Unknown sort direction \"{other}\"")),
        }
    }
}

/// Active sort field and direction of one view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: Option<String>, direction: SortDirection) -> Self {
        Self {
            field: field.filter(|f| !f.is_empty()),
            direction,
        }
    }

    /// Header click: the same field toggles the direction, another field
    /// becomes the sort field in ascending order.
    pub fn click(&mut self, field: &str) {
        if self.field.as_deref() == Some(field) {
            self.direction = self.direction.toggle();
        } else {
            self.field = Some(field.to_string());
            self.direction = SortDirection::Ascending;
        }
        trace!("Sort state is now {:?} {}", self.field, self.direction);
    }

    /// Direction to show for a header bound to `field`, if it is the sort field.
    pub fn direction_for(&self, field: &str) -> Option<SortDirection> {
        let sorted_here = self.field.as_deref() == Some(field);
        sorted_here.then_some(self.direction)
    }
}

// Missing and unparsable values are None and order before every defined value.
enum SortKey<'a> {
    Number(Option<f64>),
    Time(Option<i64>),
    Raw(&'a Value),
}

impl<'a> SortKey<'a> {
    fn of(value: &'a Value, kind: FieldKind) -> Self {
        match kind {
            FieldKind::Number => SortKey::Number(value.as_f64()),
            FieldKind::Date => SortKey::Time(parse_timestamp(value)),
            FieldKind::Text | FieldKind::Bool => SortKey::Raw(value),
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                _ => a.is_some().cmp(&b.is_some()),
            },
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (SortKey::Raw(a), SortKey::Raw(b)) => compare_values(a, b),
            _ => Ordering::Equal,
        }
    }
}

/// Generic relational comparison of two raw values.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

/// Stable sort of `records` by `field`. Without a field the input order is kept.
pub fn sort<'a>(
    records: Vec<&'a Record>,
    field: Option<&str>,
    kind: FieldKind,
    direction: SortDirection,
) -> Vec<&'a Record> {
    let Some(field) = field.filter(|f| !f.is_empty()) else {
        return records;
    };
    let start_time = Instant::now();

    let mut keyed: Vec<(SortKey<'a>, &'a Record)> = records
        .into_iter()
        .map(|record| (SortKey::of(record.get(field), kind), record))
        .collect();
    // slice::sort_by is stable, equal keys keep their filtered order in both directions
    keyed.sort_by(|(a, _), (b, _)| direction.apply(a.cmp(b)));

    trace!(
        "Sorted {} records by {field} ({kind:?}, {direction}) in {}us",
        keyed.len(),
        start_time.elapsed().as_micros()
    );
    keyed.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::SortDirection::{Ascending, Descending};
    use super::*;

    fn rec(id: i64, field: &str, value: impl Into<Value>) -> Record {
        Record::new().with("id", id).with(field, value)
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.get("id").to_string()).collect()
    }

    fn sorted(
        records: &[Record],
        field: &str,
        kind: FieldKind,
        direction: SortDirection,
    ) -> Vec<String> {
        let refs: Vec<&Record> = records.iter().collect();
        ids(&sort(refs, Some(field), kind, direction))
    }

    #[test]
    fn click_transitions() {
        let state_of = |f: &str, d| SortState::new(Some(f.into()), d);
        let mut state = SortState::default();
        state.click("name");
        assert_eq!(state, state_of("name", Ascending));
        state.click("name");
        assert_eq!(state, state_of("name", Descending));
        state.click("email");
        assert_eq!(state, state_of("email", Ascending));
        assert_eq!(state.direction_for("email"), Some(Ascending));
        assert_eq!(state.direction_for("name"), None);
    }

    #[test]
    fn no_field_is_identity() {
        let records = vec![rec(2, "n", 1), rec(1, "n", 0)];
        let refs: Vec<&Record> = records.iter().collect();
        let out = sort(refs, None, FieldKind::Text, Descending);
        assert_eq!(ids(&out), ["2", "1"]);
        let refs: Vec<&Record> = records.iter().collect();
        let out = sort(refs, Some(""), FieldKind::Text, Descending);
        assert_eq!(ids(&out), ["2", "1"]);
    }

    #[test]
    fn stable_in_both_directions() {
        let records = vec![
            rec(1, "status", "scheduled"),
            rec(2, "status", "cancelled"),
            rec(3, "status", "scheduled"),
            rec(4, "status", "cancelled"),
            rec(5, "status", "scheduled"),
        ];
        let asc = sorted(&records, "status", FieldKind::Text, Ascending);
        assert_eq!(asc, ["2", "4", "1", "3", "5"]);
        let desc = sorted(&records, "status", FieldKind::Text, Descending);
        assert_eq!(desc, ["1", "3", "5", "2", "4"]);
    }

    #[test]
    fn idempotent() {
        let records = vec![
            rec(1, "n", 3),
            rec(2, "n", 1),
            rec(3, "n", 2),
            rec(4, "n", 1),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let once = sort(refs, Some("n"), FieldKind::Number, Ascending);
        let twice = sort(once.clone(), Some("n"), FieldKind::Number, Ascending);
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), ["2", "4", "3", "1"]);
    }

    #[test]
    fn numbers_sort_numerically_not_lexically() {
        let records = vec![rec(1, "n", "10"), rec(2, "n", "9"), rec(3, "n", "100")];
        let numeric = sorted(&records, "n", FieldKind::Number, Ascending);
        assert_eq!(numeric, ["2", "1", "3"]);
        let lexical = sorted(&records, "n", FieldKind::Text, Ascending);
        assert_eq!(lexical, ["1", "3", "2"]);
    }

    #[test]
    fn datetimes_compare_as_timestamps() {
        let records = vec![
            rec(1, "dateTime", "2024-03-01T10:00:00Z"),
            rec(2, "dateTime", "2024-03-01T11:00:00+02:00"),
            rec(3, "dateTime", "2024-02-28"),
        ];
        let out = sorted(&records, "dateTime", FieldKind::Date, Descending);
        assert_eq!(out, ["1", "2", "3"]);
    }

    #[test]
    fn missing_values_order_first_ascending_last_descending() {
        let records = vec![rec(1, "n", 2), Record::new().with("id", 2), rec(3, "n", 1)];
        let asc = sorted(&records, "n", FieldKind::Number, Ascending);
        assert_eq!(asc, ["2", "3", "1"]);
        let desc = sorted(&records, "n", FieldKind::Number, Descending);
        assert_eq!(desc, ["1", "3", "2"]);
    }

    #[test]
    fn nan_cells_sort_with_missing_values() {
        let records: Vec<Record> = (0..60)
            .map(|i| {
                if i % 7 == 0 {
                    rec(i, "fee", "NaN")
                } else if i % 11 == 0 {
                    rec(i, "fee", "inf")
                } else {
                    rec(i, "fee", (i * 37) % 50)
                }
            })
            .collect();
        let refs: Vec<&Record> = records.iter().collect();
        let out = sort(refs, Some("fee"), FieldKind::Number, Ascending);

        let undefined = out
            .iter()
            .take_while(|r| r.get("fee").as_f64().is_none())
            .count();
        assert_eq!(undefined, 9 + 5);
        let fees: Vec<f64> = out[undefined..]
            .iter()
            .map(|r| r.get("fee").as_f64().unwrap())
            .collect();
        assert_eq!(fees.len(), 60 - undefined);
        assert!(fees.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn nan_numbers_compare_consistently() {
        let nan = Value::Number(f64::NAN);
        let one = Value::from(1);
        let two = Value::from(2);
        assert_eq!(compare_values(&one, &two), Ordering::Less);
        assert_ne!(compare_values(&nan, &one), Ordering::Equal);
        assert_eq!(compare_values(&nan, &one), compare_values(&nan, &two));
        assert_eq!(Value::from("NaN").as_f64(), None);
        assert_eq!(Value::from(" -inf ").as_f64(), None);
    }

    #[test]
    fn mixed_values_fall_back_to_text() {
        let cmp = |a: Value, b: Value| compare_values(&a, &b);
        assert_eq!(cmp(Value::from(5), Value::from("a")), Ordering::Less);
        assert_eq!(cmp(Value::Null, Value::from(false)), Ordering::Less);
        assert_eq!(cmp(Value::from(2), Value::from(10)), Ordering::Less);
    }

    #[test]
    fn parses_directions() {
        assert_eq!("desc".parse::<SortDirection>(), Ok(Descending));
        assert_eq!("ASC".parse::<SortDirection>(), Ok(Ascending));
        assert!("up".parse::<SortDirection>().is_err());
    }
}
