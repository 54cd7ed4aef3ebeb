use crate::core::controller::{SimState, Simulation};
use crate::core::error::{SimError, SimResult};
use crate::core::types::{
    DeadlockInfo, Process, ProcessId, ReleaseOutcome, RequestOutcome, Resource, ResourceId,
};

impl Simulation {
    /// Request `units` of a resource for a process
    ///
    /// The request is all-or-nothing. If enough units are available they are
    /// allocated in this call and the process is RUNNING. Otherwise the
    /// request is recorded, the process becomes WAITING, and the call still
    /// succeeds: waiting is an outcome, not an error.
    ///
    /// # Errors
    /// * `NotFound` - unknown process or resource
    /// * `InvalidArgument` - `units` is zero or exceeds the resource's total
    ///   (the request could never be satisfied), or the process is terminated
    ///   or already waiting
    pub fn request(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> SimResult<RequestOutcome> {
        let (outcome, info) = {
            let mut state = self.state.write();
            state
                .processes
                .check_request(&state.resources, process_id, resource_id, units)?;

            state.bump();
            let granted = state.resources.can_satisfy(resource_id, units);
            if granted {
                state.grant(process_id, resource_id, units);
            } else {
                state.enqueue(process_id, resource_id, units);
            }
            let info = self.settle(&mut state);

            // A fresh waiter that is deadlocked was blocked by this very call
            let outcome = if granted {
                RequestOutcome::Granted
            } else if info
                .as_ref()
                .is_some_and(|i| i.newly_deadlocked.contains(&process_id))
            {
                RequestOutcome::Deadlocked
            } else {
                RequestOutcome::Waiting
            };
            self.commit(&mut state);
            (outcome, info)
        };

        self.dispatch(info);
        Ok(outcome)
    }

    /// Return `units` of a resource held by a process
    ///
    /// The freed units are offered to the resource's waiters in arrival
    /// order before the call returns.
    ///
    /// # Errors
    /// * `NotFound` - unknown process or resource
    /// * `InvalidArgument` - `units` is zero or more than the process holds
    pub fn release(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> SimResult<ReleaseOutcome> {
        let (outcome, info) = {
            let mut state = self.state.write();
            state
                .processes
                .check_release(&state.resources, process_id, resource_id, units)?;
            let process = state.processes.get(process_id)?.clone();
            let resource = state.resources.get(resource_id)?.clone();
            self.apply_release(&mut state, process, resource, units)
        };

        self.dispatch(info);
        Ok(outcome)
    }

    /// Return every unit of a resource held by a process
    ///
    /// # Errors
    /// * `NotFound` - unknown process or resource
    /// * `InvalidArgument` - the process holds no units of the resource
    pub fn release_all(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
    ) -> SimResult<ReleaseOutcome> {
        let (outcome, info) = {
            let mut state = self.state.write();
            let process = state.processes.get(process_id)?.clone();
            let resource = state.resources.get(resource_id)?.clone();
            let held = process.held_units(resource_id);
            if held == 0 {
                return Err(SimError::invalid(format!(
                    "process {process_id} holds no units of resource {resource_id}"
                )));
            }
            self.apply_release(&mut state, process, resource, held)
        };

        self.dispatch(info);
        Ok(outcome)
    }

    /// Shared tail of `release` and `release_all`, after validation
    ///
    /// `process` and `resource` are the validated records; they are brought
    /// up to date for the outcome.
    fn apply_release(
        &self,
        state: &mut SimState,
        mut process: Process,
        mut resource: Resource,
        units: u32,
    ) -> (ReleaseOutcome, Option<DeadlockInfo>) {
        state.bump();
        state.return_units(process.id, resource.id, units);
        let granted = state.reevaluate(&[resource.id]);
        let info = self.settle(state);

        state.processes.refresh(&mut process);
        state.resources.refresh(&mut resource);
        let outcome = ReleaseOutcome {
            process,
            resource,
            released: units,
            granted,
        };
        self.commit(state);
        (outcome, info)
    }
}
