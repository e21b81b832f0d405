//! Generation lifecycle and the reload protocol.
//!
//! A generation is one configuration snapshot, one instrument registry and
//! one set of running sequence workers, created together and torn down
//! together. The supervisor owns the live generation behind a single
//! `RwLock`: request handlers read through it, and reload holds the write
//! side across the whole drain-and-rebuild so the exposition path can never
//! observe two generations mixed.
//!
//! Reload ordering is the correctness core: cancel, join every worker,
//! only then re-read the config and start the replacement fleet with a
//! brand-new registry and a brand-new cancellation token. A token is never
//! reused across generations.

use crate::config::{self, ConfigError, MetricSpec};
use crate::registry::{InstrumentRegistry, RegistryError};
use crate::runner;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors raised by fleet lifecycle operations.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// One configuration generation.
struct Generation {
    specs: Vec<MetricSpec>,
    registry: Arc<InstrumentRegistry>,
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Generation {
    fn start(specs: Vec<MetricSpec>) -> Result<Self, FleetError> {
        let registry = Arc::new(InstrumentRegistry::build(&specs)?);
        let token = CancellationToken::new();

        let mut handles = Vec::with_capacity(specs.len());
        for spec in &specs {
            match registry.instrument(&spec.name) {
                Some(instrument) => {
                    handles.push(runner::spawn(spec.clone(), instrument, token.clone()));
                }
                // build() creates instruments 1:1 with specs.
                None => warn!(metric = %spec.name, "No instrument for spec, runner not started"),
            }
        }

        info!(metrics = specs.len(), "Generation started");
        Ok(Self {
            specs,
            registry,
            token,
            handles,
        })
    }

    /// Cancels every worker and waits for all of them to exit. After this
    /// returns, nothing mutates the generation's instruments anymore.
    async fn drain(&mut self) {
        self.token.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sequence runner failed during drain");
            }
        }
    }
}

/// Owns the live generation and implements start, stop and reload.
///
/// Composed once at process entry and passed explicitly to the HTTP layer;
/// there is no ambient global fleet.
pub struct FleetSupervisor {
    config_path: PathBuf,
    live: RwLock<Option<Generation>>,
}

impl FleetSupervisor {
    /// Creates a supervisor bound to a config file path. No generation is
    /// running until [`start`](Self::start) is called.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            live: RwLock::new(None),
        }
    }

    /// Parses the config file and starts the first generation. If one is
    /// already running it is drained first.
    pub async fn start(&self) -> Result<(), FleetError> {
        let specs = config::load(&self.config_path)?;
        let mut live = self.live.write().await;
        if let Some(generation) = live.as_mut() {
            generation.drain().await;
        }
        *live = Some(Generation::start(specs)?);
        Ok(())
    }

    /// Stops all workers. Returns only after every worker has exited; the
    /// instruments stay registered and frozen, so exposition keeps serving
    /// the last rendered values.
    pub async fn stop(&self) {
        let mut live = self.live.write().await;
        if let Some(generation) = live.as_mut() {
            generation.drain().await;
            info!("Generation stopped");
        }
    }

    /// Drains the live generation, re-reads the config file and starts a
    /// replacement. Synchronous from the caller's point of view: when this
    /// returns `Ok`, the new generation's workers are running.
    ///
    /// If re-reading the config fails after the drain, the old generation
    /// is kept frozen (still rendered, no workers) and the error is
    /// returned; the operator can fix the file and reload again.
    pub async fn reload(&self) -> Result<(), FleetError> {
        let mut live = self.live.write().await;
        if let Some(generation) = live.as_mut() {
            generation.drain().await;
        }

        match config::load(&self.config_path) {
            Ok(specs) => {
                *live = Some(Generation::start(specs)?);
                info!("Reload complete");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Reload failed, keeping previous generation frozen");
                Err(e.into())
            }
        }
    }

    /// Renders the live generation's instruments in text exposition
    /// format. An empty string before the first [`start`](Self::start).
    pub async fn render(&self) -> Result<String, FleetError> {
        let live = self.live.read().await;
        match live.as_ref() {
            Some(generation) => Ok(generation.registry.render()?),
            None => Ok(String::new()),
        }
    }

    /// Returns the live generation's parsed metric specs, for operator
    /// inspection.
    pub async fn configs(&self) -> Vec<MetricSpec> {
        let live = self.live.read().await;
        live.as_ref()
            .map(|generation| generation.specs.clone())
            .unwrap_or_default()
    }
}
