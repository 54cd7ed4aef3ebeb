use crate::core::controller::Simulation;
use crate::core::error::{SimError, SimResult};
use crate::core::types::{
    Events, Process, ProcessId, ProcessState, Resource, ResourceId, TerminateOutcome,
};
use std::collections::BTreeSet;

impl Simulation {
    /// Register a new resource with `total_instances` units, all available
    ///
    /// # Errors
    /// `InvalidArgument` if `total_instances` is zero or the name is blank.
    pub fn create_resource(&self, name: &str, total_instances: u32) -> SimResult<Resource> {
        let mut state = self.state.write();
        let resource = state.resources.create(name, total_instances)?;
        state.bump();
        state.record(
            Events::ResourceCreated,
            None,
            Some(resource.id),
            Some(total_instances),
        );
        self.commit(&mut state);
        Ok(resource)
    }

    /// Register a new process in the READY state
    ///
    /// # Errors
    /// `InvalidArgument` if the name is blank.
    pub fn create_process(&self, name: &str) -> SimResult<Process> {
        let mut state = self.state.write();
        let process = state.processes.create(name)?;
        state.bump();
        state.record(Events::ProcessCreated, Some(process.id), None, None);
        self.commit(&mut state);
        Ok(process)
    }

    /// Remove a resource nobody uses
    ///
    /// # Errors
    /// * `NotFound` - unknown resource
    /// * `ResourceBusy` - units are allocated or a process waits for it
    pub fn delete_resource(&self, resource_id: ResourceId) -> SimResult<Resource> {
        let mut state = self.state.write();
        let allocated = state.resources.get(resource_id)?.allocated_instances();
        let pending = state.processes.wait_queue(resource_id).len();
        if allocated > 0 || pending > 0 {
            return Err(SimError::ResourceBusy {
                id: resource_id,
                allocated,
                pending,
            });
        }

        let resource = state.resources.remove(resource_id)?;
        state.bump();
        state.record(Events::ResourceDeleted, None, Some(resource_id), None);
        self.commit(&mut state);
        Ok(resource)
    }

    /// Terminate a process
    ///
    /// Atomically returns everything it holds, drops its pending request,
    /// marks it TERMINATED and re-evaluates every queue it touched: the
    /// resources it held and the one it was waiting for, where it may have
    /// been the head holding others back. Terminating an already terminated
    /// process changes nothing.
    ///
    /// # Errors
    /// `NotFound` if the process does not exist.
    pub fn terminate_process(&self, process_id: ProcessId) -> SimResult<TerminateOutcome> {
        let (outcome, info) = {
            let mut state = self.state.write();
            let mut process = state.processes.get(process_id)?.clone();
            if process.state == ProcessState::Terminated {
                return Ok(TerminateOutcome {
                    process,
                    released: Vec::new(),
                    granted: Vec::new(),
                });
            }

            state.bump();
            let released = state.processes.take_all_held(process_id);
            for &(resource_id, units) in &released {
                state.resources.give_back(resource_id, units);
                state.record(
                    Events::Released,
                    Some(process_id),
                    Some(resource_id),
                    Some(units),
                );
            }
            let abandoned = state.processes.clear_request(process_id);
            state.transition(process_id, ProcessState::Terminated);
            state.record(Events::Terminated, Some(process_id), None, None);

            let touched: BTreeSet<ResourceId> = released
                .iter()
                .map(|&(resource_id, _)| resource_id)
                .chain(abandoned)
                .collect();
            let touched: Vec<ResourceId> = touched.into_iter().collect();
            let granted = state.reevaluate(&touched);
            let info = self.settle(&mut state);

            state.processes.refresh(&mut process);
            let outcome = TerminateOutcome {
                process,
                released,
                granted,
            };
            self.commit(&mut state);
            (outcome, info)
        };

        self.dispatch(info);
        Ok(outcome)
    }

    /// Look up a process
    ///
    /// # Errors
    /// `NotFound` if the process does not exist.
    pub fn get_process(&self, process_id: ProcessId) -> SimResult<Process> {
        self.state.read().processes.get(process_id).cloned()
    }

    /// Look up a resource
    ///
    /// # Errors
    /// `NotFound` if the resource does not exist.
    pub fn get_resource(&self, resource_id: ResourceId) -> SimResult<Resource> {
        self.state.read().resources.get(resource_id).cloned()
    }

    /// All processes in creation order
    pub fn list_processes(&self) -> Vec<Process> {
        self.state.read().processes.list()
    }

    /// All resources in creation order
    pub fn list_resources(&self) -> Vec<Resource> {
        self.state.read().resources.list()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::controller::Simulation;
    use crate::core::error::ErrorKind;
    use crate::core::types::ProcessState;

    #[test]
    fn test_create_bumps_version() {
        let sim = Simulation::new();
        sim.create_resource("R1", 1).unwrap();
        sim.create_process("P1").unwrap();
        assert_eq!(sim.version(), 2);
        assert!(sim.create_resource("R2", 0).is_err());
        assert!(sim.create_process("").is_err());
        assert_eq!(sim.version(), 2);
    }

    #[test]
    fn test_delete_busy_resource() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 1).unwrap().id;
        let p = sim.create_process("P1").unwrap().id;
        sim.request(p, r, 1).unwrap();

        let err = sim.delete_resource(r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceBusy);

        sim.release(p, r, 1).unwrap();
        assert_eq!(sim.delete_resource(r).unwrap().id, r);
        assert_eq!(sim.get_resource(r).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_failed_delete_keeps_version() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 1).unwrap().id;
        assert_eq!(sim.delete_resource(r + 1).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(sim.version(), 1);
        sim.delete_resource(r).unwrap();
        assert_eq!(sim.version(), 2);
    }

    #[test]
    fn test_delete_resource_with_waiter_is_busy() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 1).unwrap().id;
        let p1 = sim.create_process("P1").unwrap().id;
        let p2 = sim.create_process("P2").unwrap().id;
        sim.request(p1, r, 1).unwrap();
        sim.request(p2, r, 1).unwrap();
        sim.terminate_process(p1).unwrap();
        // P2 got the unit on termination, so the resource is still in use
        assert_eq!(
            sim.delete_resource(r).unwrap_err(),
            crate::core::error::SimError::ResourceBusy {
                id: r,
                allocated: 1,
                pending: 0
            }
        );
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let sim = Simulation::new();
        let p = sim.create_process("P1").unwrap().id;
        sim.terminate_process(p).unwrap();
        let version = sim.version();
        let outcome = sim.terminate_process(p).unwrap();
        assert_eq!(outcome.process.state, ProcessState::Terminated);
        assert_eq!(sim.version(), version);
        assert_eq!(
            sim.terminate_process(42).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_terminated_process_cannot_request() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 1).unwrap().id;
        let p = sim.create_process("P1").unwrap().id;
        sim.terminate_process(p).unwrap();
        assert_eq!(
            sim.request(p, r, 1).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_terminate_waiting_process_drops_request() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 1).unwrap().id;
        let p1 = sim.create_process("P1").unwrap().id;
        let p2 = sim.create_process("P2").unwrap().id;
        sim.request(p1, r, 1).unwrap();
        sim.request(p2, r, 1).unwrap();

        let outcome = sim.terminate_process(p2).unwrap();
        assert!(outcome.released.is_empty());
        assert!(outcome.process.requested.is_empty());
        assert!(sim.status().waits.is_empty());
    }

    #[test]
    fn test_terminating_queue_head_serves_next_waiter() {
        let sim = Simulation::new();
        let r = sim.create_resource("R1", 3).unwrap().id;
        let holder = sim.create_process("holder").unwrap().id;
        let big = sim.create_process("big").unwrap().id;
        let small = sim.create_process("small").unwrap().id;
        sim.request(holder, r, 3).unwrap();
        sim.request(big, r, 2).unwrap();
        sim.request(small, r, 1).unwrap();
        sim.release(holder, r, 1).unwrap();
        assert_eq!(sim.get_process(small).unwrap().state, ProcessState::Waiting);

        // `big` held nothing, its queue still has to move
        let outcome = sim.terminate_process(big).unwrap();
        assert!(outcome.released.is_empty());
        assert_eq!(outcome.granted, vec![small]);
        assert_eq!(sim.get_process(small).unwrap().state, ProcessState::Running);
        assert_eq!(sim.get_resource(r).unwrap().available_instances, 0);
    }
}
