use deadsim::{ProcessState, RequestOutcome};
use std::collections::BTreeSet;
mod common;
use common::{assert_consistent, assert_no_deadlock, expect_deadlock, start_simulation};

#[test]
fn test_two_process_deadlock_and_recovery_by_termination() {
    let harness = start_simulation();
    let sim = &harness.sim;

    let r1 = sim.create_resource("R1", 1).unwrap().id;
    let r2 = sim.create_resource("R2", 1).unwrap().id;
    let p1 = sim.create_process("P1").unwrap().id;
    let p2 = sim.create_process("P2").unwrap().id;

    sim.request(p1, r1, 1).unwrap();
    sim.request(p2, r2, 1).unwrap();

    // P1 waits on P2, still recoverable
    assert_eq!(sim.request(p1, r2, 1).unwrap(), RequestOutcome::Waiting);
    assert_no_deadlock(&harness);

    // P2 closes the cycle
    assert_eq!(sim.request(p2, r1, 1).unwrap(), RequestOutcome::Deadlocked);
    let info = expect_deadlock(&harness);
    assert_eq!(info.deadlocked, vec![p1, p2]);
    assert_eq!(info.newly_deadlocked, vec![p1, p2]);
    assert_eq!(info.process_cycle, vec![p1, p2]);
    assert_eq!(info.process_waiting_for_resources, vec![(p1, r2), (p2, r1)]);
    assert_eq!(info.version, sim.version());

    assert_eq!(sim.detect(), BTreeSet::from([p1, p2]));
    assert_eq!(sim.get_process(p1).unwrap().state, ProcessState::Blocked);
    assert_eq!(sim.get_process(p2).unwrap().state, ProcessState::Blocked);
    assert_consistent(sim);

    // Terminating P1 frees R1 for P2
    let outcome = sim.terminate_process(p1).unwrap();
    assert_eq!(outcome.released, vec![(r1, 1)]);
    assert_eq!(outcome.granted, vec![p2]);
    assert_eq!(outcome.process.state, ProcessState::Terminated);

    let p2_after = sim.get_process(p2).unwrap();
    assert_eq!(p2_after.state, ProcessState::Running);
    assert_eq!(p2_after.held_units(r1), 1);
    assert!(sim.detect().is_empty());
    assert_consistent(sim);
    assert_no_deadlock(&harness);
    assert_eq!(*harness.detected.lock().unwrap(), 1);
}

#[test]
fn test_blocked_process_returns_to_waiting_when_cycle_breaks() {
    let harness = start_simulation();
    let sim = &harness.sim;

    let r1 = sim.create_resource("R1", 1).unwrap().id;
    let r2 = sim.create_resource("R2", 1).unwrap().id;
    let r3 = sim.create_resource("R3", 1).unwrap().id;
    let p1 = sim.create_process("P1").unwrap().id;
    let p2 = sim.create_process("P2").unwrap().id;
    let p3 = sim.create_process("P3").unwrap().id;

    sim.request(p1, r1, 1).unwrap();
    sim.request(p2, r2, 1).unwrap();
    sim.request(p2, r3, 1).unwrap();
    sim.request(p3, r1, 1).unwrap();
    // P3 waits behind P1 on R1 but is not part of the cycle yet
    sim.request(p1, r2, 1).unwrap();
    sim.request(p2, r1, 1).unwrap();
    let info = expect_deadlock(&harness);
    assert_eq!(info.deadlocked, vec![p1, p2, p3]);

    // P2 gives up R3, which nobody waits for: the cycle stays
    sim.release(p2, r3, 1).unwrap();
    assert_eq!(sim.detect(), BTreeSet::from([p1, p2, p3]));
    assert_no_deadlock(&harness);

    // P2 dies, P1 gets R2 and the others wait normally again
    sim.terminate_process(p2).unwrap();
    assert_eq!(sim.get_process(p1).unwrap().state, ProcessState::Running);
    assert_eq!(sim.get_process(p3).unwrap().state, ProcessState::Waiting);
    assert!(sim.detect().is_empty());
    assert_consistent(sim);
    assert_no_deadlock(&harness);
}

#[test]
fn test_three_process_ring() {
    let harness = start_simulation();
    let sim = &harness.sim;

    let resources: Vec<_> = (0..3)
        .map(|i| sim.create_resource(&format!("R{i}"), 1).unwrap().id)
        .collect();
    let processes: Vec<_> = (0..3)
        .map(|i| sim.create_process(&format!("P{i}")).unwrap().id)
        .collect();

    for i in 0..3 {
        sim.request(processes[i], resources[i], 1).unwrap();
    }
    for i in 0..3 {
        sim.request(processes[i], resources[(i + 1) % 3], 1).unwrap();
    }

    let info = expect_deadlock(&harness);
    assert_eq!(info.process_cycle, processes);

    let report = sim.deadlock_report();
    assert!(report.deadlock_detected);
    assert_eq!(report.deadlocked_processes.len(), 3);
    assert_eq!(report.deadlocked_processes[2].name, "P2");
    assert!(report.finish_order.is_empty());
}
