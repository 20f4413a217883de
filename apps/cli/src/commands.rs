//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use corpusync_core::pipeline::{SourceFamily, build_fetchers, run_sync};
use corpusync_core::render_summary;
use corpusync_shared::{
    AppConfig, FetchWindow, config_file_path, init_config, load_config, load_config_from,
    validate_store,
};
use corpusync_store::{HttpStoreClient, ReconcileOptions, Reconciler};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Corpusync — keep a file search store in sync with your document sources.
#[derive(Parser)]
#[command(
    name = "corpusync",
    version,
    about = "Sync configured document sources into a file search store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.corpusync/corpusync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Fetch window for sync commands.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum WindowArg {
    /// Recent pages and months only — the scheduled-run default.
    Recent,
    /// Everything the sources offer.
    Full,
}

impl From<WindowArg> for FetchWindow {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Recent => FetchWindow::Recent,
            WindowArg::Full => FetchWindow::FullArchive,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sync every configured source.
    Run {
        /// Fetch window.
        #[arg(long, value_enum, default_value_t = WindowArg::Recent)]
        window: WindowArg,
    },

    /// Sync only the API sources.
    Api {
        #[arg(long, value_enum, default_value_t = WindowArg::Recent)]
        window: WindowArg,
    },

    /// Sync only the web sources.
    Web {
        #[arg(long, value_enum, default_value_t = WindowArg::Recent)]
        window: WindowArg,
    },

    /// Sync only the calendar sources.
    Calendar {
        #[arg(long, value_enum, default_value_t = WindowArg::Recent)]
        window: WindowArg,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "corpusync=info",
        1 => "corpusync=debug",
        _ => "corpusync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { window } => {
            cmd_sync(&SourceFamily::ALL, window.into(), config_path).await
        }
        Command::Api { window } => {
            cmd_sync(&[SourceFamily::Api], window.into(), config_path).await
        }
        Command::Web { window } => {
            cmd_sync(&[SourceFamily::Web], window.into(), config_path).await
        }
        Command::Calendar { window } => {
            cmd_sync(&[SourceFamily::Calendar], window.into(), config_path).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(
    families: &[SourceFamily],
    window: FetchWindow,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load(config_path)?;
    validate_store(&config)?;

    // validate_store already checked the env var is set and non-empty.
    let api_key = std::env::var(&config.store.api_key_env)
        .map_err(|_| eyre!("{} is not set", config.store.api_key_env))?;

    let client = HttpStoreClient::new(&config.store.base_url, &config.store.name, api_key)?;
    let reconciler = Reconciler::new(Arc::new(client), ReconcileOptions::from(&config.store));

    let fetchers = build_fetchers(&config, families)?;
    if fetchers.is_empty() {
        println!("No sources configured for this command. Edit your config and retry.");
        return Ok(());
    }

    info!(window = %window, sources = fetchers.len(), "starting sync");
    let spinner = spinner();
    spinner.set_message(format!("Syncing {} source(s)…", fetchers.len()));

    let summary = run_sync(&fetchers, window, &reconciler).await;

    spinner.finish_and_clear();
    println!();
    println!("{}", render_summary(&summary));
    println!();

    let failed = summary.failed().len();
    if failed > 0 {
        return Err(eyre!("{failed} source(s) failed"));
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created {}", path.display());
    println!("Set store.name and your source entries, then run `corpusync run`.");
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let rendered = toml::to_string_pretty(&config)?;
    match config_path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# {}", config_file_path()?.display()),
    }
    println!("{rendered}");
    Ok(())
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
