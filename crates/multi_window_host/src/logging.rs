use anyhow::Result;
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{Config, LogFormat};

/// Initialize logging. Everything goes to stderr; stdout carries the transport.
pub fn init(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let format_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    Registry::default()
        .with(env_filter)
        .with(format_layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Multi-window host starting"
    );

    Ok(())
}

/// Startup banner, written to stderr
pub fn print_banner(config: &Config) {
    eprintln!("\n{}", "━".repeat(60).bright_black());
    eprintln!(
        "{} {}",
        "🪟 Multi-Window Host".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    eprintln!(
        "   {} {}",
        "main window:".bright_black(),
        config.main_window_title.bright_white()
    );
    eprintln!(
        "   {} {}",
        "protocol:".bright_black(),
        "JSON lines on stdin/stdout".bright_white()
    );
    eprintln!("{}\n", "━".repeat(60).bright_black());
}

/// Log configuration
pub fn log_config(config: &Config) {
    tracing::info!(
        log_level = %config.log_level,
        log_format = ?config.log_format,
        invoke_timeout_ms = ?config.invoke_timeout_ms,
        main_window_title = %config.main_window_title,
        max_windows = config.max_windows,
        close_all_on_exit = config.close_all_on_exit,
        "Host configuration loaded"
    );
}
