//! `FdTableServer` builder and server loop.
//!
//! This is the entry point for running a table server. It ties together
//! all the layers: configuration → matches → dispatcher → reporting.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fdtable_match::{
    DEFAULT_ENGINE_TIMEOUT, GameEngine, MatchConfig, MatchManager,
    OccupancyReporter, Services,
};
use fdtable_session::{BindingStore, SessionGateway};

use crate::{Dispatcher, FdTableError, ServerContext};

/// Default interval between occupancy reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(40);

/// Builder for configuring and starting a table server.
///
/// # Example
///
/// ```rust,ignore
/// use fdtable::prelude::*;
///
/// let server = FdTableServer::builder()
///     .server_id("fdtable-1")
///     .config_dir("config/matches")
///     .build(engine, gateway, bindings, reporter)?;
/// server.run().await
/// ```
pub struct FdTableServerBuilder {
    server_id: String,
    config_dir: Option<PathBuf>,
    configs: Vec<MatchConfig>,
    engine_timeout: Duration,
    report_interval: Duration,
}

impl FdTableServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            server_id: "fdtable-1".to_string(),
            config_dir: None,
            configs: Vec::new(),
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Sets the node ID stamped on every ack and push.
    pub fn server_id(mut self, id: &str) -> Self {
        self.server_id = id.to_string();
        self
    }

    /// Loads one match per `*.json` file in `dir`.
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Adds a match directly, on top of any config directory.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Sets the deadline for each engine call.
    pub fn engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    /// Sets how often occupancy is reported.
    pub fn report_interval(mut self, every: Duration) -> Self {
        self.report_interval = every;
        self
    }

    /// Builds the server around the given collaborators.
    ///
    /// A bad file in the config directory is skipped; a directly added
    /// config that is invalid or duplicated fails the build.
    pub fn build(
        self,
        engine: Arc<dyn GameEngine>,
        gateway: Arc<dyn SessionGateway>,
        bindings: Arc<dyn BindingStore>,
        reporter: Arc<dyn OccupancyReporter>,
    ) -> Result<FdTableServer, FdTableError> {
        let services = Services::new(self.server_id, engine, gateway, bindings)
            .with_engine_timeout(self.engine_timeout);

        let manager = match &self.config_dir {
            Some(dir) => MatchManager::load_dir(dir, services)?,
            None => MatchManager::new(services),
        };
        for config in self.configs {
            manager.insert(config)?;
        }

        let ctx = Arc::new(ServerContext::new(Arc::new(manager)));
        Ok(FdTableServer {
            dispatcher: Dispatcher::new(Arc::clone(&ctx)),
            ctx,
            reporter,
            report_interval: self.report_interval,
        })
    }
}

impl Default for FdTableServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured table server.
///
/// Hand [`dispatcher()`](Self::dispatcher) to the transport layer, then
/// call [`run()`](Self::run) to start background reporting and wait for
/// shutdown.
pub struct FdTableServer {
    ctx: Arc<ServerContext>,
    dispatcher: Dispatcher,
    reporter: Arc<dyn OccupancyReporter>,
    report_interval: Duration,
}

impl FdTableServer {
    /// Creates a new builder.
    pub fn builder() -> FdTableServerBuilder {
        FdTableServerBuilder::new()
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// A dispatcher bound to this server's context.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Runs until Ctrl-C.
    pub async fn run(self) -> Result<(), FdTableError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Runs until `shutdown` completes, then stops reporting and every
    /// table actor.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), FdTableError> {
        let matches = Arc::clone(self.ctx.matches());
        tracing::info!(
            server_id = %self.ctx.server_id(),
            matches = matches.len(),
            "fdtable server running"
        );

        let reporter =
            matches.spawn_reporter(self.report_interval, self.reporter);
        shutdown.await;

        reporter.abort();
        matches.shutdown().await;
        tracing::info!(server_id = %self.ctx.server_id(), "fdtable server stopped");
        Ok(())
    }
}
