//! Multi-Window Host
//!
//! Headless host process for the window registry. The main window is attached
//! at startup; every later window is created, styled, closed and talked to
//! through JSON lines on stdin, with replies on stdout.

pub mod config;
pub mod dispatch;
pub mod handler;
pub mod logging;
pub mod shutdown;
pub mod transport;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use multi_window::{
    HeadlessSurface, HeadlessSurfaceFactory, MethodHandler, WindowRegistry, MAIN_WINDOW_ID,
};

pub use config::{Cli, Config, LogFormat};
pub use dispatch::CommandHandler;
pub use handler::HostMethodHandler;

/// A running host: the registry with its main window attached
pub struct Host {
    registry: Arc<WindowRegistry>,
    factory: Arc<HeadlessSurfaceFactory>,
    commands: CommandHandler,
}

impl Host {
    pub fn start(config: &Config) -> Result<Self> {
        let factory = Arc::new(HeadlessSurfaceFactory::new());
        let options = config
            .registry_options()
            .with_handler_factory(|window_id| -> Arc<dyn MethodHandler> {
                Arc::new(HostMethodHandler::new(window_id))
            });
        let registry = WindowRegistry::new(factory.clone(), options);

        let main = HeadlessSurface::main(
            config.main_window_title.clone(),
            registry.close_notifier(MAIN_WINDOW_ID),
        );
        registry
            .attach_main(Box::new(main))
            .context("Failed to attach main window")?;

        info!(title = %config.main_window_title, "🪟 Host ready");

        Ok(Self {
            commands: CommandHandler::new(registry.clone()),
            registry,
            factory,
        })
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &Arc<HeadlessSurfaceFactory> {
        &self.factory
    }

    pub fn commands(&self) -> &CommandHandler {
        &self.commands
    }
}
