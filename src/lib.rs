//! # Deadsim
//!
//! A teaching simulator for operating-system resource contention.
//!
//! Processes request and release units of typed, multi-instance resources.
//! The engine tracks who holds and who waits for what, detects deadlocks with
//! the work/finish algorithm, and exposes every state transition for
//! inspection.
//!
//! ## Features
//!
//! - Atomic, globally ordered operations behind a single controller
//! - Multi-instance deadlock detection with wait-for cycle reporting
//! - Explicit process state machine (READY, RUNNING, WAITING, BLOCKED, TERMINATED)
//! - JSON-lines event log of every transition
//! - Scenario replay for deterministic classroom examples
//!
//! ## Example
//!
//! ```
//! use deadsim::{RequestOutcome, Simulation};
//!
//! let sim = Simulation::new();
//! let r1 = sim.create_resource("R1", 1).unwrap().id;
//! let r2 = sim.create_resource("R2", 1).unwrap().id;
//! let p1 = sim.create_process("P1").unwrap().id;
//! let p2 = sim.create_process("P2").unwrap().id;
//!
//! sim.request(p1, r1, 1).unwrap();
//! sim.request(p2, r2, 1).unwrap();
//! assert_eq!(sim.request(p1, r2, 1).unwrap(), RequestOutcome::Waiting);
//! assert_eq!(sim.request(p2, r1, 1).unwrap(), RequestOutcome::Deadlocked);
//!
//! assert_eq!(sim.detect().into_iter().collect::<Vec<_>>(), vec![p1, p2]);
//! ```

mod core;
pub use crate::core::{
    DeadlockCallback, Simulation, SimulationBuilder, SimulationConfig, global,
    controller::snapshot::Snapshot,
    detector::report::{DeadlockReport, DeadlockedProcess},
    error::{EntityKind, ErrorKind, SimError, SimResult},
    graph::AllocationEdge,
    types::{
        DeadlockInfo, Events, Process, ProcessId, ProcessState, ReleaseOutcome, RequestOutcome,
        Resource, ResourceId, TerminateOutcome, Transition,
    },
};

#[cfg(feature = "logging")]
pub use crate::core::logger::{EventLogger, LogEntry};

pub mod scenario;
