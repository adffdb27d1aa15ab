//! CLI entry and dispatch.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use anytop_core::config::{self, Config};
use anytop_core::{Mode, interrupt, logging};
use clap::Parser;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "anytop")]
#[command(version = "0.3")]
#[command(about = "Live frequency distribution of lines read from stdin")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Count only the most recent N lines (frequency view only)
    #[arg(short = 'l', long, value_name = "N")]
    window: Option<NonZeroUsize>,

    /// Write a debug trace to ./debug.log
    #[arg(long, global = true)]
    debug: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show a histogram of numeric input instead of the top lines
    Hist,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::paths::config_path);

    let mode = match cli.command {
        None => Mode::Frequency,
        Some(Commands::Hist) => Mode::Histogram,
        Some(Commands::Config { command }) => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path(&config_path);
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(&config_path),
            };
        }
    };
    if mode == Mode::Histogram && cli.window.is_some() {
        bail!("--window is only supported by the frequency view");
    }

    let config = Config::load_from(&config_path).context("load config")?;
    let window = match mode {
        Mode::Frequency => cli.window.or(config.window),
        Mode::Histogram => None,
    };

    let trace_path = if cli.debug {
        Some(PathBuf::from(Config::DEFAULT_DEBUG_LOG))
    } else {
        config.debug_log.clone()
    };
    let _trace = logging::init_trace(trace_path.as_deref())?;
    debug!(?mode, ?window, config = %config_path.display(), "starting");

    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(commands::monitor::run(mode, window, &config))
}
