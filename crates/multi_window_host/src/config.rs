use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use multi_window::RegistryOptions;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Multi-window host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Timeout for cross-window calls in milliseconds; unset waits forever
    pub invoke_timeout_ms: Option<u64>,

    /// Title given to the main window
    pub main_window_title: String,

    /// Maximum number of live secondary windows
    pub max_windows: usize,

    /// Close every window before exiting
    pub close_all_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            invoke_timeout_ms: None,
            main_window_title: "main".to_string(),
            max_windows: 64,
            close_all_on_exit: true,
        }
    }
}

/// CLI arguments
#[derive(Parser, Debug, Default)]
#[command(name = "multi-window-host")]
#[command(about = "Headless multi-window host speaking JSON lines on stdin/stdout")]
pub struct Cli {
    /// Configuration file path (TOML or JSON)
    #[arg(short, long, env = "MULTI_WINDOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "MULTI_WINDOW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "MULTI_WINDOW_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Cross-window call timeout in milliseconds
    #[arg(long, env = "MULTI_WINDOW_INVOKE_TIMEOUT_MS")]
    pub invoke_timeout_ms: Option<u64>,

    /// Main window title
    #[arg(long, env = "MULTI_WINDOW_MAIN_TITLE")]
    pub main_window_title: Option<String>,

    /// Maximum number of secondary windows
    #[arg(long, env = "MULTI_WINDOW_MAX_WINDOWS")]
    pub max_windows: Option<usize>,

    /// Close every window on exit
    #[arg(long, env = "MULTI_WINDOW_CLOSE_ALL_ON_EXIT")]
    pub close_all_on_exit: Option<bool>,
}

impl Config {
    /// Load configuration from environment, CLI args, and optional config file
    pub fn from_env() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };

        // Override with CLI args
        if let Some(log_level) = cli.log_level {
            config.log_level = log_level;
        }
        if let Some(log_format) = cli.log_format {
            config.log_format = log_format;
        }
        if let Some(timeout) = cli.invoke_timeout_ms {
            config.invoke_timeout_ms = Some(timeout);
        }
        if let Some(title) = cli.main_window_title {
            config.main_window_title = title;
        }
        if let Some(max_windows) = cli.max_windows {
            config.max_windows = max_windows;
        }
        if let Some(close_all) = cli.close_all_on_exit {
            config.close_all_on_exit = close_all;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&config_str)
            .or_else(|_| toml::from_str(&config_str))
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("log_level must not be empty");
        }

        if self.invoke_timeout_ms == Some(0) {
            anyhow::bail!("invoke_timeout_ms must be greater than 0 (omit it to wait forever)");
        }

        if self.max_windows == 0 {
            anyhow::bail!("max_windows must be greater than 0");
        }

        Ok(())
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_ms.map(Duration::from_millis)
    }

    /// Registry options derived from this configuration
    pub fn registry_options(&self) -> RegistryOptions {
        let mut options = RegistryOptions::default().with_max_windows(self.max_windows);
        if let Some(timeout) = self.invoke_timeout() {
            options = options.with_invoke_timeout(timeout);
        }
        options
    }
}
