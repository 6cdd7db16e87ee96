mod common;

use clustersim::{
    algorithms::FirstFit, job::TaskKey, metrics, Algorithm, Cluster, Resources, SimulationError,
};

use common::{job, machines, simulation, task};

fn start_times(sim: &clustersim::ClusterSchedulingSimulation, key: TaskKey) -> Vec<Option<f64>> {
    let cluster = sim.cluster();
    let cluster = cluster.borrow();
    cluster
        .task(key)
        .unwrap()
        .instances()
        .iter()
        .map(|i| i.started_timestamp())
        .collect()
}

#[test]
fn test_parallel_instances_on_one_machine() {
    let mut sim = simulation(
        machines(&[Resources::new(64., 1., 1.)]),
        vec![job(0, 0., vec![task(1, 2, 1., 5.)])],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    let first_task = TaskKey { job: 0, task: 0 };
    assert_eq!(start_times(&sim, first_task), vec![Some(0.), Some(0.)]);
    {
        let cluster = sim.cluster();
        let cluster = cluster.borrow();
        let task = cluster.task(first_task).unwrap();
        assert!(task
            .instances()
            .iter()
            .all(|i| i.finished_timestamp() == Some(5.)));
        assert_eq!(cluster.jobs()[0].finished_timestamp(), Some(5.));
        assert_eq!(metrics::makespan(&cluster), Some(5.));
    }
    assert!(sim.is_finished());
    assert_eq!(sim.time(), 5.);

    let log = sim.event_log();
    assert_eq!(
        log.iter().map(|p| p.timestamp).collect::<Vec<_>>(),
        vec![0., 1., 2., 3., 4., 5.]
    );
    // The monitor samples before the broker and the scheduler act.
    assert_eq!(log[0].cluster_state.arrived_jobs, 0);
    assert_eq!(log[1].cluster_state.running_task_instances, 2);
    assert_eq!(log[1].cluster_state.cpu, Some(2. / 64.));
    let last = &log[5].cluster_state;
    assert_eq!(last.finished_jobs, 1);
    assert_eq!(last.unfinished_jobs, 0);
    assert_eq!(last.running_task_instances, 0);
    assert_eq!(last.machine_states[0].finished_task_instances, 2);
}

#[test]
fn test_instances_serialized_by_capacity() {
    let mut sim = simulation(
        machines(&[Resources::new(1., 1., 1.)]),
        vec![job(0, 0., vec![task(1, 2, 1., 5.)])],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    assert_eq!(
        start_times(&sim, TaskKey { job: 0, task: 0 }),
        vec![Some(0.), Some(5.)]
    );
    assert_eq!(sim.time(), 10.);
}

#[test]
fn test_child_waits_for_parent() {
    let mut sim = simulation(
        machines(&[Resources::new(64., 1., 1.)]),
        vec![job(
            0,
            0.,
            vec![task(1, 1, 1., 5.), task(2, 3, 1., 2.).with_parents(vec![1])],
        )],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    let cluster = sim.cluster();
    let cluster = cluster.borrow();
    let parent = cluster.task(TaskKey { job: 0, task: 0 }).unwrap();
    let child = cluster.task(TaskKey { job: 0, task: 1 }).unwrap();
    let parent_finish = parent.finished_timestamp().unwrap();
    assert_eq!(parent_finish, 5.);
    for instance in child.instances() {
        assert!(instance.started_timestamp().unwrap() >= parent_finish);
    }
    assert_eq!(child.finished_timestamp(), Some(7.));
}

#[test]
fn test_jobs_arrive_at_submit_time() {
    let mut sim = simulation(
        machines(&[Resources::new(4., 1., 1.)]),
        vec![
            job(0, 0., vec![task(1, 1, 1., 3.)]),
            job(1, 2.5, vec![task(1, 1, 1., 3.)]),
            job(2, 2.5, vec![task(1, 1, 1., 3.)]),
        ],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    // Arrivals between ticks wait for the next scheduler tick.
    assert_eq!(
        start_times(&sim, TaskKey { job: 1, task: 0 }),
        vec![Some(3.)]
    );
    assert_eq!(
        start_times(&sim, TaskKey { job: 2, task: 0 }),
        vec![Some(3.)]
    );
    let cluster = sim.cluster();
    assert_eq!(cluster.borrow().jobs()[1].submit_time(), 2.5);
}

#[test]
fn test_no_jobs_terminates() {
    let mut sim = simulation(Vec::new(), Vec::new());
    sim.run_with_algorithm(FirstFit).unwrap();

    assert!(sim.is_finished());
    let log = sim.event_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].timestamp, 1.);
    assert_eq!(log[1].cluster_state.cpu, None);
    assert_eq!(log[1].cluster_state.memory, None);
    assert_eq!(log[1].cluster_state.disk, None);
    let cluster = sim.cluster();
    assert_eq!(metrics::average_completion(&cluster.borrow()), None);
    assert_eq!(metrics::average_slowdown(&cluster.borrow()), None);
}

#[test]
fn test_zero_capacity_cluster_runs_zero_requirement_tasks() {
    let mut sim = simulation(
        machines(&[Resources::default(), Resources::default()]),
        vec![job(0, 0., vec![task(1, 3, 0., 2.)])],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    assert!(sim.is_finished());
    assert_eq!(sim.time(), 2.);
    for point in sim.event_log() {
        assert_eq!(point.cluster_state.cpu, None);
        for machine in &point.cluster_state.machine_states {
            assert_eq!(machine.cpu, None);
        }
    }
    let cluster = sim.cluster();
    assert_eq!(metrics::average_slowdown(&cluster.borrow()), Some(1.));
}

#[test]
fn test_zero_capacity_cluster_is_unschedulable() {
    let mut sim = simulation(
        machines(&[Resources::default()]),
        vec![job(4, 0., vec![task(1, 1, 1., 2.)])],
    )
    .with_deadlock_detection(true);
    let err = sim.run_with_algorithm(FirstFit).unwrap_err();
    assert!(matches!(err, SimulationError::Unschedulable { task_id } if task_id == "4-1"));
}

#[test]
fn test_zero_duration_instances() {
    let mut sim = simulation(
        machines(&[Resources::new(1., 1., 1.)]),
        vec![job(0, 0., vec![task(1, 3, 1., 0.)])],
    );
    sim.run_with_algorithm(FirstFit).unwrap();

    // Each instance finishes within its start instant, the next one starts on
    // the following tick.
    assert_eq!(
        start_times(&sim, TaskKey { job: 0, task: 0 }),
        vec![Some(0.), Some(1.), Some(2.)]
    );
}

#[test]
fn test_algorithm_may_defer_placements() {
    let mut sim = simulation(
        machines(&[Resources::new(4., 1., 1.)]),
        vec![job(0, 0., vec![task(1, 1, 1., 5.)])],
    );
    let mut first_fit = FirstFit;
    // Holds everything back until t=3 while the cluster sits idle.
    sim.run_with_algorithm(move |cluster: &Cluster, now: f64| {
        if now < 3. {
            None
        } else {
            first_fit.decide(cluster, now)
        }
    })
    .unwrap();

    assert!(sim.is_finished());
    assert_eq!(
        start_times(&sim, TaskKey { job: 0, task: 0 }),
        vec![Some(3.)]
    );
    let cluster = sim.cluster();
    assert_eq!(cluster.borrow().jobs()[0].finished_timestamp(), Some(8.));
}
