use deadsim::{ProcessState, Simulation, scenario};
use std::collections::BTreeSet;

const TWO_PROCESS: &str = include_str!("../scenarios/two_process_deadlock.json");
const MULTI_INSTANCE: &str = include_str!("../scenarios/multi_instance.json");

#[test]
fn test_two_process_scenario_file() {
    let scenario = scenario::parse(TWO_PROCESS).unwrap();
    let sim = Simulation::new();
    let report = scenario::run(&sim, &scenario);

    assert_eq!(report.failed_steps(), 0);
    assert_eq!(report.expectation_met, Some(true));
    assert_eq!(report.steps[9].detail, Some(serde_json::json!([1, 2])));
    // P3 queues behind a deadlocked holder and is dragged in
    assert_eq!(report.steps[10].detail, Some(serde_json::json!("deadlocked")));
    assert_eq!(report.deadlock.process_cycle, vec![1, 2]);
    assert!(
        report
            .final_state
            .processes
            .iter()
            .all(|p| p.state == ProcessState::Blocked)
    );
}

#[test]
fn test_multi_instance_scenario_file() {
    let scenario = scenario::parse(MULTI_INSTANCE).unwrap();
    let sim = Simulation::new();
    let report = scenario::run(&sim, &scenario);

    assert_eq!(report.failed_steps(), 0);
    assert_eq!(report.expectation_met, Some(true));
    assert_eq!(report.steps[8].detail, Some(serde_json::json!([])));
    assert!(!report.deadlock.deadlock_detected);
    assert_eq!(report.final_state.resources.len(), 1);
    assert_eq!(report.final_state.processes[0].held_units(1), 2);
}

#[test]
fn test_replaying_twice_gives_identical_reports() {
    let scenario = scenario::parse(TWO_PROCESS).unwrap();
    let first = scenario::run(&Simulation::new(), &scenario);
    let second = scenario::run(&Simulation::new(), &scenario);
    assert_eq!(first, second);
}

#[test]
fn test_failed_expectation_and_failed_steps_are_reported() {
    let scenario = scenario::parse(
        r#"{
            "steps": [
                { "op": "create_resource", "name": "R", "instances": 1 },
                { "op": "create_process", "name": "P" },
                { "op": "request", "process": "P", "resource": "R", "units": 2 },
                { "op": "request", "process": "P", "resource": "R" },
                { "op": "delete_resource", "resource": "R" },
                { "op": "release", "process": "P", "resource": "R", "units": 1 }
            ],
            "expect_deadlocked": ["P"]
        }"#,
    )
    .unwrap();
    let sim = Simulation::new();
    let report = scenario::run(&sim, &scenario);

    let failed: BTreeSet<usize> = report
        .steps
        .iter()
        .filter(|s| !s.is_ok())
        .map(|s| s.index)
        .collect();
    assert_eq!(failed, BTreeSet::from([2, 4]));
    assert_eq!(report.expectation_met, Some(false));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["steps"][2]["error"]["kind"], "invalid_argument");
    assert_eq!(json["steps"][4]["error"]["kind"], "resource_busy");
    assert_eq!(json["steps"][2]["step"]["op"], "request");
}

#[test]
fn test_load_reports_missing_file() {
    let err = scenario::load("scenarios/does_not_exist.json").unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.json"));
}
