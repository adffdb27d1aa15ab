//! Configuration for anytop.
//!
//! Loads `${ANYTOP_HOME}/config.toml` on top of built-in defaults. Flags on
//! the command line override both.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Redraw period in milliseconds.
    pub refresh_interval_ms: u64,
    /// Default rolling window for the frequency view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<NonZeroUsize>,
    /// Fraction of the observed range added on each side of the histogram.
    pub histogram_padding: f64,
    /// Histogram bar character.
    pub bar_marker: char,
    /// Debug trace file; unset means no trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: Self::DEFAULT_REFRESH_INTERVAL_MS,
            window: None,
            histogram_padding: Self::DEFAULT_HISTOGRAM_PADDING,
            bar_marker: Self::DEFAULT_BAR_MARKER,
            debug_log: None,
        }
    }
}

impl Config {
    pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;
    pub const DEFAULT_HISTOGRAM_PADDING: f64 = 0.03;
    pub const DEFAULT_BAR_MARKER: char = '#';
    /// Debug trace file used by `--debug`.
    pub const DEFAULT_DEBUG_LOG: &'static str = "debug.log";

    /// Loads from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads from `path`, returning defaults if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Writes the commented default template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        ensure!(
            !path.exists(),
            "Config file already exists at {}",
            path.display()
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.refresh_interval_ms > 0,
            "refresh_interval_ms must be positive"
        );
        ensure!(
            self.histogram_padding.is_finite() && self.histogram_padding >= 0.0,
            "histogram_padding must be a non-negative number"
        );
        ensure!(
            !self.bar_marker.is_control(),
            "bar_marker must be a printable character"
        );
        Ok(())
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! ANYTOP_HOME resolution:
    //! 1. `ANYTOP_HOME` environment variable (if set)
    //! 2. `~/.config/anytop`

    use std::path::PathBuf;

    pub fn anytop_home() -> PathBuf {
        if let Ok(home) = std::env::var("ANYTOP_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("anytop"))
            .unwrap_or_else(|| PathBuf::from(".anytop"))
    }

    pub fn config_path() -> PathBuf {
        anytop_home().join("config.toml")
    }
}
