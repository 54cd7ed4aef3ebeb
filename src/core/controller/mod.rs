pub mod allocation;
pub mod lifecycle;
pub mod snapshot;

#[cfg(feature = "logging")]
use crate::core::logger::EventLogger;
use crate::core::detector::report::DeadlockReport;
use crate::core::detector::work_finish;
use crate::core::registry::{ProcessRegistry, ResourceRegistry};
use crate::core::types::{
    DeadlockInfo, Events, ProcessId, ProcessState, ResourceId, Transition,
};
use parking_lot::RwLock;

/// Callback invoked with every newly detected deadlock
pub type DeadlockCallback = Box<dyn Fn(DeadlockInfo) + Send + Sync>;

/// Runtime configuration of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Run detection after every request, release and termination, moving
    /// deadlocked WAITING processes to BLOCKED and back
    pub eager_detection: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            eager_detection: true,
        }
    }
}

/// Everything guarded by the simulation lock
pub(crate) struct SimState {
    pub(crate) resources: ResourceRegistry,
    pub(crate) processes: ProcessRegistry,
    /// Bumped by every successful mutation, never reset
    version: u64,
    /// Source of `waiting_since` values; restarts on reset
    wait_seq: u64,
    /// Transitions of the operation in flight
    pending: Vec<Transition>,
}

impl SimState {
    fn new() -> Self {
        SimState {
            resources: ResourceRegistry::new(),
            processes: ProcessRegistry::new(),
            version: 0,
            wait_seq: 0,
            pending: Vec::new(),
        }
    }

    /// Start applying a validated mutation
    ///
    /// Must only be called once every check of the operation has passed.
    fn bump(&mut self) {
        self.version += 1;
        self.pending.clear();
    }

    fn record(
        &mut self,
        event: Events,
        process_id: Option<ProcessId>,
        resource_id: Option<ResourceId>,
        units: Option<u32>,
    ) {
        self.pending.push(Transition {
            version: self.version,
            event,
            process_id,
            resource_id,
            units,
        });
    }

    /// Move a process along the state machine
    fn transition(&mut self, process_id: ProcessId, next: ProcessState) {
        let moved = self.processes.set_state(process_id, next);
        debug_assert!(moved, "process {process_id} cannot move to {next}");
    }

    // Everything below runs after validation and cannot fail, so an operation
    // that passed its checks is always applied completely.

    /// Allocate `units` of `resource_id` to a process and mark it RUNNING
    fn grant(&mut self, process_id: ProcessId, resource_id: ResourceId, units: u32) {
        self.resources.take(resource_id, units);
        self.processes.add_held(process_id, resource_id, units);
        self.processes.clear_request(process_id);
        self.transition(process_id, ProcessState::Running);
        self.record(Events::Granted, Some(process_id), Some(resource_id), Some(units));
    }

    /// Record a request that cannot be satisfied yet and mark the process WAITING
    fn enqueue(&mut self, process_id: ProcessId, resource_id: ResourceId, units: u32) {
        self.wait_seq += 1;
        self.processes
            .set_request(process_id, resource_id, units, self.wait_seq);
        self.transition(process_id, ProcessState::Waiting);
        self.record(Events::Waiting, Some(process_id), Some(resource_id), Some(units));
    }

    /// Move units from a process back to the available pool
    fn return_units(&mut self, process_id: ProcessId, resource_id: ResourceId, units: u32) {
        self.processes.remove_held(process_id, resource_id, units);
        self.resources.give_back(resource_id, units);
        self.record(Events::Released, Some(process_id), Some(resource_id), Some(units));
    }

    /// Grant pending requests that fit the current availability
    ///
    /// Each resource's queue is served strictly in arrival order: the first
    /// head that does not fit stops that queue, so a small late request never
    /// overtakes a large early one. Must run for every resource whose units
    /// were returned or whose queue lost a waiter.
    fn reevaluate(&mut self, resource_ids: &[ResourceId]) -> Vec<ProcessId> {
        let mut granted = Vec::new();
        for &resource_id in resource_ids {
            for (process_id, units) in self.processes.wait_queue(resource_id) {
                if !self.resources.can_satisfy(resource_id, units) {
                    break;
                }
                self.grant(process_id, resource_id, units);
                granted.push(process_id);
            }
        }
        granted
    }

    /// Align WAITING/BLOCKED states with the detector
    ///
    /// # Returns
    /// Information about the deadlock if processes were newly blocked
    fn settle_deadlocks(&mut self) -> Option<DeadlockInfo> {
        let deadlocked = work_finish(&self.resources, &self.processes).deadlocked;

        let changes: Vec<(ProcessId, ProcessState)> = self
            .processes
            .iter()
            .filter_map(|p| match p.state {
                ProcessState::Waiting if deadlocked.contains(&p.id) => {
                    Some((p.id, ProcessState::Blocked))
                }
                ProcessState::Blocked if !deadlocked.contains(&p.id) => {
                    Some((p.id, ProcessState::Waiting))
                }
                _ => None,
            })
            .collect();

        let mut newly_deadlocked = Vec::new();
        for (process_id, next) in changes {
            self.transition(process_id, next);
            if next == ProcessState::Blocked {
                newly_deadlocked.push(process_id);
                self.record(Events::Blocked, Some(process_id), None, None);
            } else {
                self.record(Events::Unblocked, Some(process_id), None, None);
            }
        }

        if newly_deadlocked.is_empty() {
            return None;
        }
        self.record(Events::DeadlockDetected, None, None, None);
        let report = DeadlockReport::build(&self.resources, &self.processes);
        Some(report.into_info(newly_deadlocked, self.version))
    }
}

/// The simulation controller
///
/// Owns the registries behind a single `RwLock` and is the only way to
/// change them. Every mutation holds the write lock from validation to the
/// last state change, so each client-visible transition is atomic and all of
/// them are globally ordered by `version`. Reads take the shared lock and
/// always see a consistent state.
///
/// # How it works
///
/// 1. A mutation validates its arguments; a failure leaves everything untouched
/// 2. The version is bumped and the registries are updated
/// 3. Releases and terminations re-evaluate the wait queues of freed resources
/// 4. With eager detection, deadlocked waiters become BLOCKED and recovered ones WAITING
/// 5. The recorded transitions go to the event log, the lock is released and
///    the deadlock callback runs if new processes were blocked
pub struct Simulation {
    state: RwLock<SimState>,
    config: SimulationConfig,
    callback: Option<DeadlockCallback>,
    #[cfg(feature = "logging")]
    logger: Option<EventLogger>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Create a simulation with eager detection, no log and no callback
    pub fn new() -> Self {
        Simulation {
            state: RwLock::new(SimState::new()),
            config: SimulationConfig::default(),
            callback: None,
            #[cfg(feature = "logging")]
            logger: None,
        }
    }

    /// Start configuring a simulation
    pub fn builder() -> crate::core::SimulationBuilder {
        crate::core::SimulationBuilder::new()
    }

    pub(crate) fn from_parts(
        config: SimulationConfig,
        callback: Option<DeadlockCallback>,
        #[cfg(feature = "logging")] logger: Option<EventLogger>,
    ) -> Self {
        Simulation {
            state: RwLock::new(SimState::new()),
            config,
            callback,
            #[cfg(feature = "logging")]
            logger,
        }
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    /// Number of successful mutations applied so far
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Flush the event log, if one is configured
    ///
    /// # Errors
    /// Returns an error if the logger's writer thread does not confirm the flush.
    #[cfg(feature = "logging")]
    pub fn flush_log(&self) -> anyhow::Result<()> {
        match &self.logger {
            Some(logger) => logger.flush(),
            None => Ok(()),
        }
    }

    /// Path of the event log, if one is configured
    #[cfg(feature = "logging")]
    pub fn log_path(&self) -> Option<std::path::PathBuf> {
        self.logger.as_ref().map(|l| l.path().to_path_buf())
    }

    /// Run eager detection if configured; called at the end of mutations
    fn settle(&self, state: &mut SimState) -> Option<DeadlockInfo> {
        if !self.config.eager_detection {
            return None;
        }
        state.settle_deadlocks()
    }

    /// Forward the operation's transitions to the event log
    ///
    /// Runs under the write lock so the log follows version order.
    fn commit(&self, state: &mut SimState) {
        let transitions = std::mem::take(&mut state.pending);
        #[cfg(feature = "logging")]
        if let Some(logger) = &self.logger {
            for transition in &transitions {
                logger.log_transition(transition);
            }
        }
        #[cfg(not(feature = "logging"))]
        drop(transitions);
    }

    /// Hand a newly detected deadlock to the callback
    ///
    /// Must be called after the lock is released: the callback may inspect
    /// or even mutate the simulation.
    fn dispatch(&self, info: Option<DeadlockInfo>) {
        if let (Some(info), Some(callback)) = (info, &self.callback) {
            callback(info);
        }
    }

    /// Clear every process and resource
    ///
    /// Never fails, even while units are allocated. Ids restart at 1; the
    /// version keeps counting.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.resources.clear();
        state.processes.clear();
        state.wait_seq = 0;
        state.bump();
        state.record(Events::Reset, None, None, None);
        self.commit(&mut state);
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_SIMULATION: Simulation = Simulation::new();
}

/// Process-wide simulation shared by every caller
///
/// Meant for transports that serve a single simulation to all clients.
/// Always uses the default configuration.
pub fn global() -> &'static Simulation {
    &GLOBAL_SIMULATION
}
