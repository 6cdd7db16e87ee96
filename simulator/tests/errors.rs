mod common;

use clustersim::{
    algorithms::FirstFit, cluster::Cluster, job::TaskKey, Placement, Resources, SimulationError,
};

use common::{job, machines, simulation, task};

fn one_machine() -> Vec<clustersim::config::job_config::MachineConfig> {
    machines(&[Resources::new(2., 1., 1.)])
}

#[test]
fn test_placement_of_unready_task_is_rejected() {
    let mut sim = simulation(
        one_machine(),
        vec![job(
            0,
            0.,
            vec![task(1, 1, 1., 5.), task(2, 1, 1., 5.).with_parents(vec![1])],
        )],
    );
    let err = sim
        .run_with_algorithm(|_: &Cluster, _: f64| {
            Some(Placement {
                machine: 0,
                task: TaskKey { job: 0, task: 1 },
            })
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InvalidPlacement { task, reason, .. }
            if task == "0-2" && reason == "task is not ready"
    ));
}

#[test]
fn test_infeasible_placement_is_rejected() {
    let mut sim = simulation(one_machine(), vec![job(0, 0., vec![task(1, 3, 1., 5.)])]);
    // Always proposes the first task on the first machine, even when full.
    let err = sim
        .run_with_algorithm(|cluster: &Cluster, _: f64| {
            cluster
                .ready_tasks_with_waiting_instances()
                .next()
                .map(|task| Placement {
                    machine: 0,
                    task: task.key(),
                })
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InvalidPlacement { reason, .. } if reason == "machine cannot host the instance"
    ));
    // The two accepted placements are still accounted for.
    let cluster = sim.cluster();
    assert_eq!(cluster.borrow().machines()[0].available().cpu, 0.);
}

#[test]
fn test_placement_on_unknown_machine_is_rejected() {
    let mut sim = simulation(one_machine(), vec![job(0, 0., vec![task(1, 1, 1., 5.)])]);
    let err = sim
        .run_with_algorithm(|_: &Cluster, _: f64| {
            Some(Placement {
                machine: 7,
                task: TaskKey { job: 0, task: 0 },
            })
        })
        .unwrap_err();
    assert!(matches!(err, SimulationError::InvalidPlacement { machine, .. } if machine == "#7"));
}

#[test]
fn test_missing_parent_is_fatal() {
    let mut sim = simulation(
        one_machine(),
        vec![job(3, 0., vec![task(1, 1, 1., 5.).with_parents(vec![9])])],
    );
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::MissingParent { job_id: 3, parent_index: 9, .. }
    ));
}

#[test]
fn test_unsorted_submit_times_are_fatal() {
    let mut sim = simulation(
        one_machine(),
        vec![
            job(0, 5., vec![task(1, 1, 1., 1.)]),
            job(1, 2., vec![task(1, 1, 1., 1.)]),
        ],
    );
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::SubmitTimeInPast { job_id: 1, now, .. } if now == 5.
    ));
}

#[test]
fn test_duplicate_job_is_fatal() {
    let mut sim = simulation(
        one_machine(),
        vec![
            job(0, 0., vec![task(1, 1, 1., 1.)]),
            job(0, 1., vec![task(1, 1, 1., 1.)]),
        ],
    );
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(err, SimulationError::DuplicateJob { job_id: 0 }));
}

#[test]
fn test_invalid_machine_is_rejected() {
    let mut configs = one_machine();
    configs[0].available = Resources::new(3., 1., 1.);
    let result = clustersim::ClusterSchedulingSimulation::from_configs(
        clustersim::Simulation::new(),
        configs,
        Vec::new(),
    );
    assert!(matches!(
        result,
        Err(SimulationError::InvalidMachine { machine_id: 0, .. })
    ));
}

#[test]
fn test_simulation_runs_once() {
    let mut sim = simulation(one_machine(), vec![job(0, 0., vec![task(1, 1, 1., 1.)])]);
    sim.run_with_algorithm(FirstFit).unwrap();
    assert!(matches!(
        sim.run_with_algorithm(FirstFit),
        Err(SimulationError::AlreadyStarted)
    ));
}

#[test]
fn test_negative_requirement_is_rejected() {
    let mut sim = simulation(
        machines(&[Resources::new(4., 1., 1.)]),
        vec![job(0, 0., vec![task(1, 1, -3., 5.)])],
    );
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InvalidTask { task_id, .. } if task_id == "0-1"
    ));
    let cluster = sim.cluster();
    let cluster = cluster.borrow();
    assert_eq!(cluster.machines()[0].available().cpu, 4.);
    assert!(cluster.jobs().is_empty());
}

#[test]
fn test_negative_duration_is_rejected() {
    let mut sim = simulation(one_machine(), vec![job(2, 0., vec![task(1, 1, 1., -1.)])]);
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidTask { task_id, .. } if task_id == "2-1"));
}
