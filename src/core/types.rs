use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Process identifier type
///
/// Assigned sequentially from 1 in creation order by each simulation instance.
pub type ProcessId = usize;

/// Resource identifier type
///
/// Assigned sequentially from 1 in creation order by each simulation instance.
pub type ResourceId = usize;

/// Lifecycle state of a simulated process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    /// Created, has not been granted anything yet
    Ready,
    /// Its last request was granted
    Running,
    /// Has a pending request that cannot be satisfied from current availability
    Waiting,
    /// Waiting, and the detector proved it can never finish
    Blocked,
    /// Terminated; absorbing
    Terminated,
}

impl ProcessState {
    /// Transition table for the process state machine
    ///
    /// Staying in the same state is always allowed except that nothing leaves
    /// `Terminated`, which makes that state absorbing.
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;

        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Ready, Running)
                | (Ready, Waiting)
                | (Ready, Terminated)
                | (Running, Waiting)
                | (Running, Terminated)
                | (Waiting, Running)
                | (Waiting, Blocked)
                | (Waiting, Terminated)
                | (Blocked, Running)
                | (Blocked, Waiting)
                | (Blocked, Terminated)
        )
    }

    /// Whether a process in this state has a pending request
    pub fn is_waiting(self) -> bool {
        matches!(self, ProcessState::Waiting | ProcessState::Blocked)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// A typed pool of interchangeable instances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    /// Fixed at creation
    pub total_instances: u32,
    /// Units not held by any process
    pub available_instances: u32,
}

impl Resource {
    /// Units currently held by processes
    pub fn allocated_instances(&self) -> u32 {
        self.total_instances - self.available_instances
    }
}

/// A simulated actor holding and requesting resource units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub state: ProcessState,
    /// Units held per resource; never contains zero entries
    pub held: BTreeMap<ResourceId, u32>,
    /// Pending request; empty unless the process is WAITING or BLOCKED
    pub requested: BTreeMap<ResourceId, u32>,
    /// Wait sequence number of the request that made this process wait
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_since: Option<u64>,
}

impl Process {
    /// Units of `resource_id` held by this process
    pub fn held_units(&self, resource_id: ResourceId) -> u32 {
        self.held.get(&resource_id).copied().unwrap_or(0)
    }
}

/// Kinds of state transitions recorded by the event log
///
/// These events describe the lifecycle of processes and resources and their
/// interactions, in the order the controller applied them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Events {
    /// A process was created
    ProcessCreated,
    /// A resource was created
    ResourceCreated,
    /// A resource was deleted
    ResourceDeleted,
    /// A request was granted, immediately or during re-evaluation
    Granted,
    /// A request could not be satisfied and the process now waits
    Waiting,
    /// Units were returned to a resource
    Released,
    /// A waiting process was proven deadlocked
    Blocked,
    /// A blocked process left the deadlocked set
    Unblocked,
    /// A process was terminated
    Terminated,
    /// A detection pass found newly deadlocked processes
    DeadlockDetected,
    /// Every process and resource was cleared
    Reset,
}

/// A single recorded state transition
///
/// Produced by the controller while it holds the write lock and forwarded to
/// the event log once the operation is complete.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Transition {
    /// Version the simulation reached with the operation that caused this transition
    pub version: u64,
    pub event: Events,
    pub process_id: Option<ProcessId>,
    pub resource_id: Option<ResourceId>,
    pub units: Option<u32>,
}

/// Result of a `request` call
///
/// None of these are errors: waiting and deadlock are the behaviour the
/// simulator exists to show.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The units were allocated in this call
    Granted,
    /// The process is now waiting for the units
    Waiting,
    /// The process is waiting and the detector proved it deadlocked
    Deadlocked,
}

/// Result of a `release` or `release_all` call
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// The releasing process after the operation
    pub process: Process,
    /// The released resource after the operation
    pub resource: Resource,
    /// Units returned by this call
    pub released: u32,
    /// Processes whose pending request was granted as a consequence
    pub granted: Vec<ProcessId>,
}

/// Result of a `terminate_process` call
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TerminateOutcome {
    /// The process after termination
    pub process: Process,
    /// Units returned to each resource
    pub released: Vec<(ResourceId, u32)>,
    /// Processes whose pending request was granted as a consequence
    pub granted: Vec<ProcessId>,
}

/// Information about a deadlock found by eager detection
///
/// Handed to the deadlock callback configured with
/// [`SimulationBuilder::on_deadlock`](crate::SimulationBuilder::on_deadlock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockInfo {
    /// Every deadlocked process after the operation
    pub deadlocked: Vec<ProcessId>,

    /// Processes that joined the deadlocked set with this operation
    pub newly_deadlocked: Vec<ProcessId>,

    /// A wait-for cycle among the deadlocked processes, if one exists
    ///
    /// For example, if process 1 waits for process 2 and process 2 waits for
    /// process 1, the cycle would be [1, 2].
    pub process_cycle: Vec<ProcessId>,

    /// Pending request of every deadlocked process as (process, resource)
    pub process_waiting_for_resources: Vec<(ProcessId, ResourceId)>,

    /// Simulation version at which the deadlock was detected
    pub version: u64,

    /// ISO-8601 formatted timestamp indicating when the deadlock was detected.
    pub timestamp: String,
}
