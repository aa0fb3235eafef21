//! Loading a record store from data files.
//!
//! Files are read with polars and converted column by column (in parallel)
//! into [`Record`]s. Numeric columns become numbers, boolean columns booleans,
//! everything else text. Nulls are left out of the record.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::column::FieldKind;
use crate::domain::DashError;
use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// A loaded record store with its columns in file order.
#[derive(Debug, Default)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<(String, FieldKind)>,
    pub records: Vec<Record>,
}

struct LoadedColumn {
    name: String,
    kind: FieldKind,
    values: Vec<Value>,
}

pub fn detect_file_type(path: &Path) -> Result<FileType, DashError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(DashError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, DashError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DashError::FileNotFound,
        ErrorKind::PermissionDenied => DashError::PermissionDenied,
        _ => DashError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(DashError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn field_kind(dtype: &DataType, name: &str) -> FieldKind {
    if is_numeric_type(dtype) {
        FieldKind::Number
    } else if matches!(dtype, DataType::Boolean) {
        FieldKind::Bool
    } else if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
        FieldKind::Date
    } else {
        FieldKind::infer(name)
    }
}

fn to_value(s: &str, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Number => s
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::Text(s.to_string())),
        FieldKind::Bool => match s {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::Text(other.to_string()),
        },
        FieldKind::Date | FieldKind::Text => Value::Text(s.to_string()),
    }
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();
    let kind = field_kind(&original_dtype, col_name);

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let values = series
        .into_iter()
        .map(|value| match value {
            Some(s) => to_value(s, kind),
            None => Value::Null,
        })
        .collect();

    Ok(LoadedColumn {
        name: col_name.to_string(),
        kind,
        values,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

/// Load every row of a csv, parquet or arrow file.
pub fn load(path: &Path) -> Result<Dataset, DashError> {
    let file_info = get_file_info(path.to_path_buf())?;
    debug!("Loading {file_info:?}");
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();

    // Each column is converted in its own thread
    let columns = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<Vec<LoadedColumn>, _>>()?;

    let mut records = vec![Record::new(); df.height()];
    for column in columns.iter() {
        trace!("Column \"{}\" as {:?}", column.name, column.kind);
        for (record, value) in records.iter_mut().zip(column.values.iter()) {
            if !value.is_null() {
                record.set(column.name.clone(), value.clone());
            }
        }
    }

    info!(
        "Loaded {} records with {} columns ({} bytes) in {}ms",
        records.len(),
        columns.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );

    Ok(Dataset {
        name: file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string(),
        columns: columns.into_iter().map(|c| (c.name, c.kind)).collect(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_file_types_case_insensitive() {
        let detect = |name: &str| detect_file_type(Path::new(name));
        assert_eq!(detect("a.csv").unwrap(), FileType::CSV);
        assert_eq!(detect("a.PQ").unwrap(), FileType::PARQUET);
        assert_eq!(detect("a.feather").unwrap(), FileType::ARROW);
        assert!(matches!(detect("a.xlsx"), Err(DashError::UnknownFileType)));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            load(Path::new("/definitely/not/here.csv")),
            Err(DashError::FileNotFound)
        ));
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            get_file_info(dir.path().to_path_buf()),
            Err(DashError::LoadingFailed(_))
        ));
    }

    #[test]
    fn loads_csv_with_typed_columns() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,name,fee,createdAt").unwrap();
        writeln!(file, "1,Alice,12.5,2024-01-10").unwrap();
        writeln!(file, "2,,30,2024-02-01").unwrap();
        file.flush().unwrap();

        let dataset = load(file.path()).unwrap();
        assert_eq!(dataset.records.len(), 2);
        let names: Vec<&str> = dataset.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["id", "name", "fee", "createdAt"]);
        assert_eq!(dataset.columns[0].1, FieldKind::Number);
        assert_eq!(dataset.columns[3].1, FieldKind::Date);

        let first = &dataset.records[0];
        assert_eq!(first.get("id"), &Value::Number(1.0));
        assert_eq!(first.get("fee"), &Value::Number(12.5));
        assert_eq!(first.get("name"), &Value::from("Alice"));
        assert_eq!(first.get("createdAt").to_string(), "2024-01-10");
        // Empty cells are nulls and stay out of the record
        assert!(!dataset.records[1].contains("name"));
    }
}
