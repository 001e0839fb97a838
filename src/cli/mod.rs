use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::calendar::today_local;
use crate::config::ConfigLoader;
use crate::prefs::Preferences;
use crate::recent::RecentSearchStore;
use crate::storage;

pub mod commands;

use self::commands::{
    CalendarArgs, CollectionArgs, NewArgs, PlanArgs, RecentArgs, SaveArgs, SearchArgs,
};

const LOG_FILE_NAME: &str = "recipetui.log";

#[derive(Parser, Debug)]
#[command(
    name = "recipetui",
    version,
    about = "Keyboard-first terminal recipe manager"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RECIPETUI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RECIPETUI_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Publish a new recipe
    New(NewArgs),
    /// Search recipes and cooks, remembering the query
    Search(SearchArgs),
    /// Inspect or edit recent searches
    Recent(RecentArgs),
    /// Save or unsave a recipe
    Save(SaveArgs),
    /// Meal planner
    Plan(PlanArgs),
    /// Manage recipe collections
    Collection(CollectionArgs),
    /// Print a month calendar
    Calendar(CalendarArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("RECIPETUI_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("RECIPETUI_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    // The TUI owns the terminal, so its logs go to a file.
    let log_file = matches!(command, Commands::Tui).then(|| paths.log_dir.join(LOG_FILE_NAME));
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;
    storage
        .ensure_user(&config.profile.username, &config.profile.display_name)
        .context("registering local profile")?;
    let recent = RecentSearchStore::new(
        Preferences::open(&paths.prefs_dir, &config.recent.area),
        config.recent.capacity,
    );

    let config = Arc::new(config);
    match command {
        Commands::Tui => {
            let mut app = App::new(config.clone(), storage.clone(), recent)?;
            commands::run_tui(&mut app)
        }
        Commands::New(args) => commands::new_recipe(&config, &storage, args),
        Commands::Search(args) => commands::search(&storage, &recent, &config, args),
        Commands::Recent(args) => commands::recent_searches(&recent, args),
        Commands::Save(args) => commands::save(&storage, args),
        Commands::Plan(args) => commands::plan(&storage, &config.calendar, today_local(), args),
        Commands::Collection(args) => commands::collection(&storage, args),
        Commands::Calendar(args) => commands::calendar(&config.calendar, today_local(), args),
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
