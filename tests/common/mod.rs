use deadsim::{DeadlockInfo, ProcessState, Simulation};
use std::sync::{Arc, Mutex as StdMutex, mpsc};

#[allow(dead_code)]
pub struct SimHarness {
    pub sim: Simulation,
    pub rx: mpsc::Receiver<DeadlockInfo>,
    pub detected: Arc<StdMutex<usize>>,
}

/// Eager simulation whose deadlock callback forwards into a channel
#[allow(dead_code)]
pub fn start_simulation() -> SimHarness {
    let (tx, rx) = mpsc::channel::<DeadlockInfo>();
    let detected = Arc::new(StdMutex::new(0));
    let counter = Arc::clone(&detected);

    let sim = Simulation::builder()
        .on_deadlock(move |info| {
            *counter.lock().unwrap() += 1;
            let _ = tx.send(info);
        })
        .build()
        .expect("Failed to build simulation");

    SimHarness { sim, rx, detected }
}

#[allow(dead_code)]
pub fn expect_deadlock(h: &SimHarness) -> DeadlockInfo {
    // The callback runs on the mutating thread before the call returns.
    match h.rx.try_recv() {
        Ok(info) => info,
        Err(_) => panic!("No deadlock reported"),
    }
}

#[allow(dead_code)]
pub fn assert_no_deadlock(h: &SimHarness) {
    assert!(h.rx.try_recv().is_err(), "Unexpected deadlock reported");
}

/// Check the bookkeeping invariants that must hold after every operation
#[allow(dead_code)]
pub fn assert_consistent(sim: &Simulation) {
    let status = sim.status();

    for resource in &status.resources {
        let held: u32 = status
            .processes
            .iter()
            .map(|p| p.held_units(resource.id))
            .sum();
        assert_eq!(
            resource.available_instances + held,
            resource.total_instances,
            "units of {} are not conserved",
            resource.name
        );
        assert!(resource.available_instances <= resource.total_instances);

        // Queues are re-evaluated whenever they can move, so the oldest
        // waiter never fits what is free
        let head = status
            .processes
            .iter()
            .filter_map(|p| {
                p.requested
                    .get(&resource.id)
                    .map(|&units| (p.waiting_since, p.id, units, &p.name))
            })
            .min();
        if let Some((_, _, units, name)) = head {
            assert!(
                units > resource.available_instances,
                "{name} still waits for {units} unit(s) of {} with {} free",
                resource.name,
                resource.available_instances
            );
        }
    }

    for process in &status.processes {
        assert!(process.held.values().all(|&units| units > 0));
        match process.state {
            ProcessState::Waiting | ProcessState::Blocked => {
                assert_eq!(process.requested.len(), 1, "{} must have one request", process.name);
                assert!(process.waiting_since.is_some());
            }
            ProcessState::Terminated => {
                assert!(process.held.is_empty() && process.requested.is_empty());
            }
            ProcessState::Ready | ProcessState::Running => {
                assert!(process.requested.is_empty());
            }
        }
        if sim.config().eager_detection && process.state == ProcessState::Blocked {
            assert!(status.deadlocked.contains(&process.id));
        }
        if sim.config().eager_detection && process.state == ProcessState::Waiting {
            assert!(!status.deadlocked.contains(&process.id));
        }
    }
}
