use std::env::VarError;
use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::view::ViewConfig;

pub const HELP_TEXT: &str = "\
dashtable - sortable, filterable, paginated table view

  <Left> / <Right>   select column
  s / <Enter>        sort by selected column (again to flip direction)
  n / <PgDn>         next page
  p / <PgUp>         previous page
  <Home> / <End>     first / last page
  g                  go to page
  /                  search all columns
  f                  filter selected column by value ('all' clears)
  d                  date range on selected column (start..end)
  r                  reset all filters
  y                  copy current page as CSV
  e                  export all matches to a CSV file
  ?                  this help
  <Esc>              close popup / cancel input
  q                  quit
";

#[derive(Debug)]
pub enum DashError {
    IoError(Error),
    PolarsError(PolarsError),
    ClipboardError(arboard::Error),
    LoadingFailed(String),
    InvalidConfig(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for DashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashError::IoError(e) => write!(f, "I/O error: {e}"),
            DashError::PolarsError(e) => write!(f, "Failed to read data: {e}"),
            DashError::ClipboardError(e) => write!(f, "Clipboard error: {e}"),
            DashError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            DashError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            DashError::FileNotFound => f.write_str("File not found"),
            DashError::PermissionDenied => f.write_str("Permission denied"),
            DashError::UnknownFileType => {
                f.write_str("Unknown file type, expected csv, parquet or arrow")
            }
        }
    }
}

impl std::error::Error for DashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashError::IoError(e) => Some(e),
            DashError::PolarsError(e) => Some(e),
            DashError::ClipboardError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for DashError {
    fn from(err: Error) -> Self {
        DashError::IoError(err)
    }
}

impl From<PolarsError> for DashError {
    fn from(err: PolarsError) -> Self {
        DashError::PolarsError(err)
    }
}

impl From<arboard::Error> for DashError {
    fn from(err: arboard::Error) -> Self {
        DashError::ClipboardError(err)
    }
}

impl From<shellexpand::LookupError<VarError>> for DashError {
    fn from(err: shellexpand::LookupError<VarError>) -> Self {
        DashError::InvalidConfig(err.to_string())
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, DashError> {
    Ok(PathBuf::from(shellexpand::full(path)?.into_owned()))
}

#[derive(Debug, Clone, Setters)]
pub struct TVConfig {
    /// Milliseconds to wait for a terminal event per frame.
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub view: ViewConfig,
    #[setters(strip_option)]
    pub log_file: Option<PathBuf>,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            view: ViewConfig::default(),
            log_file: None,
        }
    }
}

impl TVConfig {
    pub fn validate(self) -> Result<Self, DashError> {
        if self.view.page_size == 0 {
            return Err(DashError::InvalidConfig("page size must be at least 1".into()));
        }
        if self.max_column_width < 3 {
            return Err(DashError::InvalidConfig("column width must be at least 3".into()));
        }
        if self.view.key_field.trim().is_empty() {
            return Err(DashError::InvalidConfig("key field must not be empty".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    FilterColumn,
    DateRange,
    GoToPage,
    Export,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Search => "/",
            CMDMode::FilterColumn => "filter: ",
            CMDMode::DateRange => "range (start..end): ",
            CMDMode::GoToPage => "page: ",
            CMDMode::Export => "export to: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    MoveLeft,
    MoveRight,
    Sort,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    GoToPage,
    Search,
    Filter,
    DateRange,
    ResetFilters,
    CopyPage,
    Export,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_page_size() {
        let mut config = TVConfig::default();
        config.view.page_size = 0;
        assert!(matches!(config.validate(), Err(DashError::InvalidConfig(_))));
    }

    #[test]
    fn default_config_is_valid() {
        let config = TVConfig::default().max_column_width(20).validate().unwrap();
        assert_eq!(config.max_column_width, 20);
        assert_eq!(config.view.key_field, "id");
    }

    #[test]
    fn expands_environment_variables() {
        // SAFETY: single test touching this variable
        unsafe { std::env::set_var("DASHTABLE_TEST_DIR", "/tmp/dash") };
        let path = expand_path("$DASHTABLE_TEST_DIR/out.csv").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/dash/out.csv"));
        assert!(expand_path("$DASHTABLE_SURELY_UNSET_VAR/x").is_err());
    }
}
