use crate::core::error::{SimError, SimResult};
use crate::core::registry::{ResourceRegistry, validate_name};
use crate::core::types::{Process, ProcessId, ProcessState, ResourceId};
use std::collections::BTreeMap;

/// Owns every process of a simulation
///
/// The setters are crate-private: the controller is the only caller, and it
/// validates an operation completely before invoking any of them.
pub struct ProcessRegistry {
    processes: BTreeMap<ProcessId, Process>,
    next_id: ProcessId,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        ProcessRegistry {
            processes: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a process in the READY state
    pub fn create(&mut self, name: &str) -> SimResult<Process> {
        let name = validate_name(name, "process")?;
        let id = self.next_id;
        self.next_id += 1;
        let process = Process {
            id,
            name,
            state: ProcessState::Ready,
            held: BTreeMap::new(),
            requested: BTreeMap::new(),
            waiting_since: None,
        };
        self.processes.insert(id, process.clone());
        Ok(process)
    }

    pub fn get(&self, id: ProcessId) -> SimResult<&Process> {
        self.processes
            .get(&id)
            .ok_or_else(|| SimError::process_not_found(id))
    }

    /// All processes in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn list(&self) -> Vec<Process> {
        self.processes.values().cloned().collect()
    }

    /// Check that `process_id` may request `units` of `resource_id`
    ///
    /// Covers every failure a request can have, so the controller can reject
    /// the call before touching any state.
    pub fn check_request(
        &self,
        resources: &ResourceRegistry,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> SimResult<()> {
        let process = self.get(process_id)?;
        let resource = resources.get(resource_id)?;

        if units == 0 {
            return Err(SimError::invalid("units must be a positive integer"));
        }
        if units > resource.total_instances {
            return Err(SimError::invalid(format!(
                "request for {units} unit(s) of resource {resource_id} can never be satisfied: \
                 only {} exist",
                resource.total_instances
            )));
        }
        if process.state == ProcessState::Terminated {
            return Err(SimError::invalid(format!(
                "process {process_id} is terminated"
            )));
        }
        if process.state.is_waiting() {
            return Err(SimError::invalid(format!(
                "process {process_id} is {} and cannot issue another request",
                process.state
            )));
        }
        Ok(())
    }

    /// Check that `process_id` holds at least `units` of `resource_id`
    pub fn check_release(
        &self,
        resources: &ResourceRegistry,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> SimResult<()> {
        let process = self.get(process_id)?;
        resources.get(resource_id)?;

        if units == 0 {
            return Err(SimError::invalid("units must be a positive integer"));
        }
        let held = process.held_units(resource_id);
        if held < units {
            return Err(SimError::invalid(format!(
                "process {process_id} holds {held} unit(s) of resource {resource_id}, \
                 cannot release {units}"
            )));
        }
        Ok(())
    }

    /// Overwrite `record` with the stored version of the same process
    pub(crate) fn refresh(&self, record: &mut Process) {
        if let Some(current) = self.processes.get(&record.id) {
            record.clone_from(current);
        }
    }

    // The mutators below run after the controller has validated the whole
    // operation and never fail; an unknown id is a no-op.

    /// Move a process to `next` if the transition table allows it
    ///
    /// # Returns
    /// `true` if the process now is in `next`
    pub(crate) fn set_state(&mut self, id: ProcessId, next: ProcessState) -> bool {
        match self.processes.get_mut(&id) {
            Some(process) if process.state.can_transition_to(next) => {
                process.state = next;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn add_held(&mut self, id: ProcessId, resource_id: ResourceId, units: u32) {
        if let Some(process) = self.processes.get_mut(&id) {
            *process.held.entry(resource_id).or_insert(0) += units;
        }
    }

    /// Drop `units` of a holding; an emptied entry is removed
    pub(crate) fn remove_held(&mut self, id: ProcessId, resource_id: ResourceId, units: u32) {
        if let Some(process) = self.processes.get_mut(&id) {
            let held = process.held_units(resource_id);
            debug_assert!(held >= units);
            match held.saturating_sub(units) {
                0 => process.held.remove(&resource_id),
                left => process.held.insert(resource_id, left),
            };
        }
    }

    /// Drain every held entry, returning it in resource id order
    pub(crate) fn take_all_held(&mut self, id: ProcessId) -> Vec<(ResourceId, u32)> {
        self.processes
            .get_mut(&id)
            .map(|process| std::mem::take(&mut process.held).into_iter().collect())
            .unwrap_or_default()
    }

    /// Record a pending request along with its wait sequence number
    pub(crate) fn set_request(
        &mut self,
        id: ProcessId,
        resource_id: ResourceId,
        units: u32,
        wait_seq: u64,
    ) {
        if let Some(process) = self.processes.get_mut(&id) {
            process.requested.insert(resource_id, units);
            process.waiting_since = Some(wait_seq);
        }
    }

    /// Forget any pending request
    ///
    /// # Returns
    /// The resources the process was waiting for
    pub(crate) fn clear_request(&mut self, id: ProcessId) -> Vec<ResourceId> {
        match self.processes.get_mut(&id) {
            Some(process) => {
                process.waiting_since = None;
                std::mem::take(&mut process.requested).into_keys().collect()
            }
            None => Vec::new(),
        }
    }

    /// Processes with a pending request on `resource_id`, oldest wait first
    ///
    /// Ties on the wait sequence fall back to creation order.
    pub fn wait_queue(&self, resource_id: ResourceId) -> Vec<(ProcessId, u32)> {
        let mut queue: Vec<(u64, ProcessId, u32)> = self
            .processes
            .values()
            .filter_map(|p| {
                p.requested
                    .get(&resource_id)
                    .map(|&units| (p.waiting_since.unwrap_or(u64::MAX), p.id, units))
            })
            .collect();
        queue.sort_unstable();
        queue.into_iter().map(|(_, id, units)| (id, units)).collect()
    }

    /// Drop every process and restart the id sequence
    pub(crate) fn clear(&mut self) {
        self.processes.clear();
        self.next_id = 1;
    }
}
