use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, info_span};
use tracing_error::{ErrorLayer, SpanTrace};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dashtable::domain::{DashError, TVConfig, expand_path};
use dashtable::loader;
use dashtable::sort::SortDirection;
use dashtable::view::ViewConfig;

mod controller;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use model::{Model, Status};
use ui::TableUI;

const DEFAULT_LOG_FILE: &str = "~/.dashtable.log";

#[derive(Parser, Debug)]
#[command(version, about = "Sortable, filterable, paginated table viewer")]
struct Args {
    /// File to show
    path: PathBuf,

    /// Records per page
    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Field to sort by on startup
    #[arg(long)]
    sort: Option<String>,

    /// Sort the startup field descending
    #[arg(long)]
    desc: bool,

    /// Field identifying a record
    #[arg(long, default_value = "id")]
    key: String,

    /// Where to write the log
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: String,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,
}

impl Args {
    fn to_config(&self) -> Result<TVConfig, DashError> {
        let direction = if self.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let mut view = ViewConfig::default()
            .page_size(self.page_size)
            .default_direction(direction)
            .key_field(self.key.as_str());
        if let Some(field) = &self.sort {
            view = view.default_sort_field(field.clone());
        }

        TVConfig::default()
            .view(view)
            .max_column_width(self.max_column_width)
            .log_file(expand_path(&self.log_file)?)
            .validate()
    }
}

fn init_tracing(config: &TVConfig) -> Result<(), DashError> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config) {
        eprintln!("Could not open log file: {e}");
    }

    match run(&args.path, &config) {
        Err(e) => {
            error!("{e}\n{}", SpanTrace::capture());
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(path: &Path, config: &TVConfig) -> Result<(), DashError> {
    info!("Starting dashtable with {config:?}");

    let dataset = {
        let _span = info_span!("load", path = %path.display()).entered();
        loader::load(path)?
    };
    let mut model = Model::init(config, dataset);
    let ui = TableUI::new(config);
    let controller = Controller::new(config);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), DashError> {
        while model.status != Status::QUITTING {
            // Render the current view
            terminal.draw(|f| ui.draw(&model, f))?;

            // Handle events and map to a Message
            let message = controller.handle_event(&model)?;
            model.update(message)?;
        }
        Ok(())
    })();
    ratatui::restore();

    info!("Quitting dashtable");
    result
}
