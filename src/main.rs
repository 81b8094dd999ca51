use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tad::controller::Controller;
use tad::domain::{Status, TadConfig, TadError};
use tad::model::Model;
use tad::table::Table;
use tad::ui::TableUI;

#[derive(Parser, Debug)]
#[command(
    name = "tad",
    version,
    about = "A tui based csv viewer, editor and analyzer."
)]
struct Cli {
    /// Delimited data file to open (csv, tsv or psv)
    path: Option<String>,

    /// Write a trace log to this file (level via RUST_LOG)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Widest rendered column
    #[arg(long, default_value_t = 80)]
    max_column_width: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: Cli) -> Result<(), TadError> {
    if let Some(log) = &cli.log {
        init_tracing(log)?;
    }

    let cfg = TadConfig::default().max_column_width(cli.max_column_width);

    // Load before the terminal takes over, so a bad path prints cleanly.
    let loaded = match &cli.path {
        Some(raw) => {
            let expanded = shellexpand::full(raw).map_err(|e| TadError::Parse(e.to_string()))?;
            let path = PathBuf::from(expanded.into_owned());
            Some((Table::load(&path)?, path))
        }
        None => None,
    };

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);
    if let Some((table, path)) = loaded {
        model.attach(table, Some(path));
    }

    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}

fn init_tracing(path: &Path) -> Result<(), TadError> {
    let file = std::fs::File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
