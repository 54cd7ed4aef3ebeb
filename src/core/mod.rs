// Core types
pub mod types;
pub use types::*;

// Error taxonomy
pub mod error;

// Process and resource registries
pub mod registry;

// Graph views
pub mod graph;

// Deadlock detector
pub mod detector;

// Simulation controller
pub mod controller;
pub use controller::{DeadlockCallback, Simulation, SimulationConfig, global};

// Event log
#[cfg(feature = "logging")]
pub mod logger;

use anyhow::Result;
#[cfg(feature = "logging")]
use anyhow::Context;
use std::path::PathBuf;

/// Simulation configuration builder
pub struct SimulationBuilder {
    log_path: Option<PathBuf>,
    config: SimulationConfig,
    callback: Option<DeadlockCallback>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Create a builder with default settings
    ///
    /// By default:
    /// - Logging is disabled
    /// - Eager detection is enabled
    /// - No deadlock callback is installed
    pub fn new() -> Self {
        SimulationBuilder {
            log_path: None,
            config: SimulationConfig::default(),
            callback: None,
        }
    }

    /// Activate the event log and set the path for the log file
    ///
    /// # Arguments
    /// * `path` - Path to the log file. If the path contains "{timestamp}",
    ///   it will be replaced with the current timestamp.
    pub fn with_log<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable detection after every request, release and termination
    ///
    /// Without it, processes never become BLOCKED and the callback never
    /// fires; `detect()` still works on demand.
    pub fn eager_detection(mut self, enabled: bool) -> Self {
        self.config.eager_detection = enabled;
        self
    }

    /// Set a callback to be invoked when eager detection finds new deadlocked processes
    ///
    /// The callback runs on the calling thread after the simulation lock has
    /// been released, so it may call back into the simulation.
    pub fn on_deadlock<F>(mut self, callback: F) -> Self
    where
        F: Fn(DeadlockInfo) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Build the simulation with the configured settings
    ///
    /// # Errors
    /// Returns an error if the log file cannot be created.
    #[cfg(feature = "logging")]
    pub fn build(self) -> Result<Simulation> {
        let logger = match self.log_path {
            Some(path) => Some(
                logger::EventLogger::with_file(path).context("Failed to initialize event logger")?,
            ),
            None => None,
        };
        Ok(Simulation::from_parts(self.config, self.callback, logger))
    }

    /// Build the simulation with the configured settings
    ///
    /// # Errors
    /// Returns an error if a log was requested, since the event log requires
    /// the `logging` feature.
    #[cfg(not(feature = "logging"))]
    pub fn build(self) -> Result<Simulation> {
        if self.log_path.is_some() {
            anyhow::bail!("the event log requires the `logging` feature");
        }
        Ok(Simulation::from_parts(self.config, self.callback))
    }
}
