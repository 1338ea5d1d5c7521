//! Multi-Window Host - Main Entry Point

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::io::BufReader;
use tracing::info;

use multi_window_host::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // 2. Initialize logging
    logging::init(&config).context("Failed to initialize logging")?;
    logging::print_banner(&config);
    logging::log_config(&config);

    // 3. Attach the main window
    let host = Host::start(&config).context("Failed to start host")?;
    let mut main_closed = host.registry().subscribe_main_closed();

    info!("🚀 Serving requests on stdin");

    // 4. Serve until input ends, a signal arrives, or the main window closes
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = transport::serve(&host, stdin, tokio::io::stdout()) => {
            result.context("Transport failed")?;
        }
        _ = shutdown::wait_for_signal() => {
            eprintln!("\n{}", "⚠️  Received shutdown signal...".bright_yellow());
        }
        _ = main_closed.wait_for(|closed| *closed) => {
            info!("Main window closed");
        }
    }

    // 5. Shut down
    if config.close_all_on_exit {
        let closed = host.registry().close_all();
        info!(closed, "🛑 Closed remaining windows");
    }

    eprintln!("{}", "👋 Multi-window host stopped".bright_green().bold());
    Ok(())
}
