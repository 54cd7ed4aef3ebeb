//! Scenario replay
//!
//! A scenario is a JSON document listing simulation operations that refer to
//! processes and resources by name:
//!
//! ```json
//! {
//!   "name": "classic two-process deadlock",
//!   "steps": [
//!     { "op": "create_resource", "name": "R1" },
//!     { "op": "create_resource", "name": "R2" },
//!     { "op": "create_process", "name": "P1" },
//!     { "op": "create_process", "name": "P2" },
//!     { "op": "request", "process": "P1", "resource": "R1" },
//!     { "op": "request", "process": "P2", "resource": "R2" },
//!     { "op": "request", "process": "P1", "resource": "R2" },
//!     { "op": "request", "process": "P2", "resource": "R1" },
//!     { "op": "detect" }
//!   ],
//!   "expect_deadlocked": ["P1", "P2"]
//! }
//! ```
//!
//! Replaying the same scenario against a fresh simulation always yields the
//! same report, which makes scenarios usable as classroom examples and as
//! regression tests.

use crate::core::detector::report::DeadlockReport;
use crate::core::error::{ErrorKind, SimError};
use crate::core::controller::snapshot::Snapshot;
use crate::core::types::{ProcessId, ResourceId};
use crate::core::Simulation;
use anyhow::{Context, Result};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

fn one() -> u32 {
    1
}

/// A named list of operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
    /// Names of the processes expected to be deadlocked at the end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_deadlocked: Option<Vec<String>>,
}

/// One simulation operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreateResource {
        name: String,
        #[serde(default = "one")]
        instances: u32,
    },
    CreateProcess {
        name: String,
    },
    Request {
        process: String,
        resource: String,
        #[serde(default = "one")]
        units: u32,
    },
    /// Without `units`, every held unit of the resource is released
    Release {
        process: String,
        resource: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        units: Option<u32>,
    },
    Terminate {
        process: String,
    },
    DeleteResource {
        resource: String,
    },
    Detect,
    Reset,
}

/// Why a step failed
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<SimError> for StepError {
    fn from(err: SimError) -> Self {
        StepError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of replaying one step
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepOutcome {
    pub index: usize,
    pub step: Step,
    /// Serialized success value of the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of replaying a whole scenario
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScenarioReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<StepOutcome>,
    /// Detection over the final state
    pub deadlock: DeadlockReport,
    pub final_state: Snapshot,
    /// `None` when the scenario states no expectation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_met: Option<bool>,
}

impl ScenarioReport {
    /// Number of steps that failed
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_ok()).count()
    }
}

/// Parse a scenario from JSON text
///
/// # Errors
/// Returns an error if the text is not a valid scenario document.
pub fn parse(json: &str) -> Result<Scenario> {
    serde_json::from_str(json).context("Failed to parse scenario")
}

/// Load a scenario from a JSON file
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid scenario.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    parse(&json).with_context(|| format!("Invalid scenario file {}", path.display()))
}

/// Name-to-id bindings built while replaying
///
/// A later creation with the same name rebinds the name.
#[derive(Default)]
struct Names {
    processes: FxHashMap<String, ProcessId>,
    resources: FxHashMap<String, ResourceId>,
}

impl Names {
    fn process(&self, name: &str) -> Result<ProcessId, StepError> {
        self.processes.get(name).copied().ok_or_else(|| StepError {
            kind: ErrorKind::NotFound,
            message: format!("unknown process name `{name}`"),
        })
    }

    fn resource(&self, name: &str) -> Result<ResourceId, StepError> {
        self.resources.get(name).copied().ok_or_else(|| StepError {
            kind: ErrorKind::NotFound,
            message: format!("unknown resource name `{name}`"),
        })
    }
}

fn to_detail<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Replay `scenario` against `sim`
///
/// A failing step is recorded in the report and replay continues with the
/// next one; the simulation is left in whatever state the steps produced.
pub fn run(sim: &Simulation, scenario: &Scenario) -> ScenarioReport {
    let mut names = Names::default();
    let mut steps = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let result = apply(sim, &mut names, step);
        let (detail, error) = match result {
            Ok(detail) => (Some(detail), None),
            Err(error) => (None, Some(error)),
        };
        steps.push(StepOutcome {
            index,
            step: step.clone(),
            detail,
            error,
        });
    }

    let deadlock = sim.deadlock_report();
    let expectation_met = scenario.expect_deadlocked.as_ref().map(|expected| {
        let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
        let actual: BTreeSet<&str> = deadlock
            .deadlocked_processes
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        expected == actual
    });

    ScenarioReport {
        name: scenario.name.clone(),
        steps,
        deadlock,
        final_state: sim.status(),
        expectation_met,
    }
}

fn apply(sim: &Simulation, names: &mut Names, step: &Step) -> Result<serde_json::Value, StepError> {
    match step {
        Step::CreateResource { name, instances } => {
            let resource = sim.create_resource(name, *instances)?;
            names.resources.insert(name.clone(), resource.id);
            Ok(to_detail(&resource))
        }
        Step::CreateProcess { name } => {
            let process = sim.create_process(name)?;
            names.processes.insert(name.clone(), process.id);
            Ok(to_detail(&process))
        }
        Step::Request {
            process,
            resource,
            units,
        } => {
            let outcome = sim.request(names.process(process)?, names.resource(resource)?, *units)?;
            Ok(to_detail(&outcome))
        }
        Step::Release {
            process,
            resource,
            units,
        } => {
            let (pid, rid) = (names.process(process)?, names.resource(resource)?);
            let outcome = match units {
                Some(units) => sim.release(pid, rid, *units)?,
                None => sim.release_all(pid, rid)?,
            };
            Ok(to_detail(&outcome))
        }
        Step::Terminate { process } => {
            let outcome = sim.terminate_process(names.process(process)?)?;
            Ok(to_detail(&outcome))
        }
        Step::DeleteResource { resource } => {
            let deleted = sim.delete_resource(names.resource(resource)?)?;
            names.resources.retain(|_, id| *id != deleted.id);
            Ok(to_detail(&deleted))
        }
        Step::Detect => Ok(to_detail(&sim.detect())),
        Step::Reset => {
            sim.reset();
            *names = Names::default();
            Ok(serde_json::Value::Null)
        }
    }
}
