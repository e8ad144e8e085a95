use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pagetable::controller::Controller;
use pagetable::domain::{PTConfig, PTError};
use pagetable::fetch::{DEFAULT_API_URL, HttpCharacterSource};
use pagetable::loader::load_data_file;
use pagetable::model::{Model, Status};
use pagetable::pages::PageKind;
use pagetable::table::TableTexts;
use pagetable::ui;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lang {
    En,
    Es,
}

/// A paginated, searchable and sortable table in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Page shown at start
    #[arg(long, value_enum, default_value_t = PageKind::Characters)]
    page: PageKind,

    /// CSV, Parquet or Arrow file shown on the file page
    #[arg(short, long)]
    file: Option<String>,

    /// Endpoint returning a page of characters
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Rows per page at start
    #[arg(long)]
    page_size: Option<usize>,

    /// Choices offered for rows per page
    #[arg(long, value_delimiter = ',', default_value = "10,25,50")]
    page_size_options: Vec<usize>,

    /// Language of the table texts
    #[arg(long, value_enum, default_value_t = Lang::En)]
    lang: Lang,

    /// Write logs to this file (RUST_LOG sets the level)
    #[arg(long, default_value = "pagetable.log")]
    log_file: String,

    /// Hide the search box
    #[arg(long)]
    no_search: bool,

    /// Disable row selection
    #[arg(long)]
    no_select: bool,
}

impl Cli {
    fn config(&self) -> PTConfig {
        PTConfig {
            start_page: self.page,
            api_url: self.api_url.clone(),
            fetch_timeout: self.timeout,
            page_size_options: self.page_size_options.clone(),
            initial_page_size: self.page_size,
            texts: match self.lang {
                Lang::En => TableTexts::default(),
                Lang::Es => TableTexts::spanish(),
            },
            searchable: !self.no_search,
            selectable: !self.no_select,
            ..PTConfig::default()
        }
    }
}

fn expand_path(path: &str) -> Result<PathBuf, PTError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| PTError::LoadingFailed(format!("Could not expand {path}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn init_logging(path: &str) -> Result<(), PTError> {
    let file = File::create(expand_path(path)?)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(cli: Cli) -> Result<(), PTError> {
    init_logging(&cli.log_file)?;
    let config = cli.config();
    info!("Starting with {:?}", config);

    let file = match &cli.file {
        Some(path) => Some(load_data_file(expand_path(path)?)?),
        None => None,
    };
    let source = HttpCharacterSource::new(
        config.api_url.clone(),
        Duration::from_secs(config.fetch_timeout),
    )?;
    let mut model = Model::init(&config, Arc::new(source), file)?;
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    model: &mut Model,
    controller: &Controller,
) -> Result<(), PTError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui::draw(&model.get_uidata(), f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message);
    }
    info!("Quit");
    Ok(())
}
