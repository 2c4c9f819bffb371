//! Server assembly: engine, dispatcher and compaction trigger.

use crate::config::ServerConfig;
use crate::dispatcher::{ConnectionSummary, Dispatcher};
use crate::error::ServerResult;
use crate::trigger::CompactionTrigger;
use caskdb_core::{Config, Engine};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

/// A running caskdb server without a transport.
///
/// The transport accepts connections and hands each one's byte streams to
/// [`Server::serve_connection`].
///
/// # Example
///
/// ```no_run
/// use caskdb_core::Config;
/// use caskdb_server::{Server, ServerConfig};
///
/// # async fn run() -> caskdb_server::ServerResult<()> {
/// let server = Server::start(ServerConfig::from_env()?, Config::default()).await?;
/// let mut reply = Vec::new();
/// server.serve_connection(&b"w 1 sunny\nr 1\n"[..], &mut reply).await?;
/// server.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
    trigger: CompactionTrigger,
}

impl Server {
    /// Opens the engine and starts the compaction trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the engine
    /// cannot be opened.
    pub async fn start(config: ServerConfig, engine_config: Config) -> ServerResult<Self> {
        config.validate()?;

        let log_dir = config.log_dir.clone();
        let hint_dir = config.hint_dir.clone();
        let engine = tokio::task::spawn_blocking(move || {
            Engine::open(&log_dir, &hint_dir, engine_config)
        })
        .await??;

        let dispatcher = Dispatcher::new(Arc::new(engine), config.workers);
        let trigger = CompactionTrigger::spawn(
            dispatcher.clone(),
            config.compaction_threshold,
            config.compaction_interval,
        );

        info!(
            port = config.port,
            log_dir = %config.log_dir.display(),
            hint_dir = %config.hint_dir.display(),
            workers = config.workers,
            "server started"
        );

        Ok(Self {
            config,
            dispatcher,
            trigger,
        })
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the request dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serves one connection. See [`Dispatcher::serve_connection`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the streams fail.
    pub async fn serve_connection<R, W>(&self, reader: R, writer: W) -> ServerResult<ConnectionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.dispatcher.serve_connection(reader, writer).await
    }

    /// Stops the trigger, then flushes and closes the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if a background task panicked or the final flush
    /// fails.
    pub async fn shutdown(self) -> ServerResult<()> {
        self.trigger.shutdown().await?;
        let engine = Arc::clone(self.dispatcher.engine());
        tokio::task::spawn_blocking(move || engine.close()).await??;
        info!("server stopped");
        Ok(())
    }
}
