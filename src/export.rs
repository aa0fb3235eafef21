//! CSV export of a data view.
//!
//! Exports cover every record that passes the view's filters, in the view's
//! sort order, not only the current page. Columns flagged as not exportable
//! (action columns) are skipped.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::column::Column;
use crate::domain::DashError;
use crate::record::Record;
use crate::view::DataView;

/// Quote a cell when it contains quotes, separators, whitespace or line breaks.
pub fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = needs_escaping || c.contains([' ', '\t', ',', '\n', '\r']);
    let mut out = c.to_string();

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

pub fn csv_line<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|c| wrap_cell_content(c.as_ref()))
        .collect::<Vec<String>>()
        .join(",")
}

/// Write a header line of column titles and one line per record. Returns the
/// number of records written.
pub fn write_csv<W: Write>(
    writer: &mut W,
    columns: &[Column],
    records: &[&Record],
) -> Result<usize, DashError> {
    let columns: Vec<&Column> = columns.iter().filter(|c| c.exportable).collect();
    let header = csv_line(columns.iter().map(|c| c.title.as_str()));
    writeln!(writer, "{header}")?;
    for record in records {
        let line = csv_line(columns.iter().map(|c| c.cell(record).to_string()));
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(records.len())
}

pub fn view_to_csv(view: &DataView, records: &[Record]) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_csv(&mut out, view.columns(), &view.matching(records));
    String::from_utf8_lossy(&out).into_owned()
}

pub fn export_file(view: &DataView, records: &[Record], path: &Path) -> Result<usize, DashError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let written = write_csv(&mut writer, view.columns(), &view.matching(records))?;
    info!("Exported {written} records to {}", path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::sort::SortDirection;
    use crate::view::ViewConfig;

    fn history() -> Vec<Record> {
        vec![
            Record::new()
                .with("id", 1)
                .with("patientName", "Ann Lee")
                .with("status", "completed")
                .with("notes", "Follow up \"soon\"")
                .with("date", "2024-01-02"),
            Record::new()
                .with("id", 2)
                .with("patientName", "Tom")
                .with("status", "cancelled")
                .with("notes", "")
                .with("date", "2024-01-05"),
            Record::new()
                .with("id", 3)
                .with("patientName", "Kim")
                .with("status", "completed")
                .with("notes", "ok, fine")
                .with("date", "2024-01-09"),
        ]
    }

    fn view() -> DataView {
        ViewConfig::default()
            .page_size(1)
            .default_sort_field("date".to_string())
            .default_direction(SortDirection::Descending)
            .build(vec![
                Column::new("id", "ID"),
                Column::new("patientName", "Patient"),
                Column::new("notes", "Notes"),
                Column::new("id", "Actions").exportable(false),
            ])
    }

    #[test]
    fn wraps_only_when_needed() {
        assert_eq!(wrap_cell_content("plain"), "plain");
        assert_eq!(wrap_cell_content("a b"), "\"a b\"");
        assert_eq!(wrap_cell_content("a,b"), "\"a,b\"");
        assert_eq!(wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(wrap_cell_content("x\"y"), "\"x\"\"y\"");
        assert_eq!(wrap_cell_content("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn exports_all_pages_in_view_order() {
        let records = history();
        let mut view = view();
        view.set_filters(vec![Filter::exact("status", "completed")]);
        let csv = view_to_csv(&view, &records);
        assert_eq!(
            csv,
            "ID,Patient,Notes\n3,Kim,\"ok, fine\"\n1,\"Ann Lee\",\"Follow up \"\"soon\"\"\"\n"
        );
    }

    #[test]
    fn export_file_writes_header_for_empty_result() {
        let records = history();
        let mut view = view();
        view.push_filter(Filter::contains("patientName", "zzz"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let written = export_file(&view, &records, &path).unwrap();
        assert_eq!(written, 0);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "ID,Patient,Notes\n");
    }
}
