use deadsim::{ProcessId, ResourceId, Simulation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
mod common;
use common::assert_consistent;

const PROCESSES: usize = 5;
const RESOURCES: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Op {
    Request(ProcessId, ResourceId, u32),
    Release(ProcessId, ResourceId, u32),
    Terminate(ProcessId),
}

fn random_ops(seed: u64, len: usize) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let process = rng.random_range(1..=PROCESSES);
            let resource = rng.random_range(1..=RESOURCES);
            let units = rng.random_range(1..=3);
            match rng.random_range(0..10) {
                0..=5 => Op::Request(process, resource, units),
                6..=8 => Op::Release(process, resource, units),
                _ => Op::Terminate(process),
            }
        })
        .collect()
}

/// Build the fixed population, apply `ops` and return a trace of every result
fn replay(sim: &Simulation, ops: &[Op]) -> Vec<String> {
    for i in 0..RESOURCES {
        sim.create_resource(&format!("R{i}"), i as u32 + 1).unwrap();
    }
    for i in 0..PROCESSES {
        sim.create_process(&format!("P{i}")).unwrap();
    }

    ops.iter()
        .map(|op| {
            let result = match *op {
                Op::Request(p, r, units) => format!("{:?}", sim.request(p, r, units)),
                Op::Release(p, r, units) => format!("{:?}", sim.release(p, r, units)),
                Op::Terminate(p) => format!("{:?}", sim.terminate_process(p)),
            };
            assert_consistent(sim);
            result
        })
        .collect()
}

#[test]
fn test_replay_is_deterministic_on_fresh_and_reset_engines() {
    for seed in [1, 7, 42, 2024] {
        let ops = random_ops(seed, 200);

        let first = Simulation::new();
        let first_trace = replay(&first, &ops);

        let second = Simulation::new();
        let second_trace = replay(&second, &ops);

        // Same engine again, after a reset
        first.reset();
        let third_trace = replay(&first, &ops);

        assert_eq!(first_trace, second_trace, "seed {seed}");
        assert_eq!(first_trace, third_trace, "seed {seed}");

        let (a, b) = (second.status(), first.status());
        assert_eq!(a.processes, b.processes);
        assert_eq!(a.resources, b.resources);
        assert_eq!(a.holds, b.holds);
        assert_eq!(a.waits, b.waits);
        assert_eq!(a.wait_for, b.wait_for);
        assert_eq!(a.deadlocked, b.deadlocked);
        assert_eq!(second.deadlock_report(), first.deadlock_report());

        // The version keeps counting across the reset
        assert!(b.version > a.version);
    }
}

#[test]
fn test_rejected_operations_leave_state_untouched() {
    let sim = Simulation::new();
    let r = sim.create_resource("R", 2).unwrap().id;
    let p = sim.create_process("P").unwrap().id;
    sim.request(p, r, 1).unwrap();
    let before = sim.status();

    assert!(sim.request(p, r, 3).is_err());
    assert!(sim.request(p, r, 0).is_err());
    assert!(sim.request(p, 99, 1).is_err());
    assert!(sim.release(p, r, 2).is_err());
    assert!(sim.release_all(p, 99).is_err());
    assert!(sim.terminate_process(99).is_err());
    assert!(sim.create_resource("", 1).is_err());
    assert!(sim.create_resource("Z", 0).is_err());
    assert!(sim.create_process("   ").is_err());

    assert_eq!(sim.status(), before);
}
