use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    config::job_config::{JobConfig, MachineConfig},
    error::{SimulationError, SimulationResult},
    job::{InstanceKey, Job, Task, TaskInstance, TaskKey},
    kernel::SimulationContext,
    log_debug,
    machine::{Machine, MachineState},
    resources::{Resources, Utilization},
    scheduler::Placement,
};

/// Point-in-time aggregate of the cluster, as recorded by the monitor.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ClusterState {
    pub arrived_jobs: usize,
    pub unfinished_jobs: usize,
    pub finished_jobs: usize,
    pub unfinished_tasks: usize,
    pub finished_tasks: usize,
    pub running_task_instances: usize,
    pub machine_states: Vec<MachineState>,
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
}

/// Owns machines and jobs. Jobs are kept in arrival order; every aggregate is
/// recomputed from the owned entities on each call.
#[derive(Default)]
pub struct Cluster {
    machines: Vec<Machine>,
    jobs: Vec<Job>,
    job_positions: FxHashMap<u64, usize>,

    started_instances: u64,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_machines(configs: Vec<MachineConfig>) -> SimulationResult<Self> {
        let mut cluster = Self::new();
        cluster.add_machines(configs)?;
        Ok(cluster)
    }

    pub fn add_machines(&mut self, configs: Vec<MachineConfig>) -> SimulationResult<()> {
        for config in configs {
            self.machines.push(Machine::new(config)?);
        }
        Ok(())
    }

    /// Builds the job graph from `config` and appends it to the arrival list.
    pub fn add_job(&mut self, config: JobConfig) -> SimulationResult<&Job> {
        if self.job_positions.contains_key(&config.id) {
            return Err(SimulationError::DuplicateJob { job_id: config.id });
        }
        let position = self.jobs.len();
        let job = Job::new(position, config)?;
        self.job_positions.insert(job.id(), position);
        self.jobs.push(job);
        Ok(&self.jobs[position])
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn machine(&self, position: usize) -> Option<&Machine> {
        self.machines.get(position)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, position: usize) -> Option<&Job> {
        self.jobs.get(position)
    }

    pub fn job_by_id(&self, id: u64) -> Option<&Job> {
        self.job_positions
            .get(&id)
            .and_then(|&position| self.jobs.get(position))
    }

    pub fn task(&self, key: TaskKey) -> Option<&Task> {
        self.jobs.get(key.job).and_then(|job| job.task(key.task))
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&TaskInstance> {
        self.task(key.task_key())
            .and_then(|task| task.instance(key.instance))
    }

    pub fn is_task_ready(&self, key: TaskKey) -> bool {
        self.jobs
            .get(key.job)
            .map(|job| key.task < job.tasks().len() && job.is_task_ready(key.task))
            .unwrap_or(false)
    }

    /// Number of instances started since the beginning of the run.
    pub fn started_instances(&self) -> u64 {
        self.started_instances
    }

    pub fn unfinished_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| !job.is_finished())
    }

    pub fn finished_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.is_finished())
    }

    pub fn has_unfinished_jobs(&self) -> bool {
        self.unfinished_jobs().next().is_some()
    }

    pub fn unfinished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.jobs.iter().flat_map(|job| job.unfinished_tasks())
    }

    pub fn finished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.jobs.iter().flat_map(|job| job.finished_tasks())
    }

    pub fn ready_unfinished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.jobs.iter().flat_map(|job| job.ready_unfinished_tasks())
    }

    pub fn tasks_with_waiting_instances(&self) -> impl Iterator<Item = &Task> {
        self.jobs
            .iter()
            .flat_map(|job| job.tasks_with_waiting_instances())
    }

    /// Tasks an algorithm may place right now, in arrival then configuration
    /// order.
    pub fn ready_tasks_with_waiting_instances(&self) -> impl Iterator<Item = &Task> {
        self.jobs
            .iter()
            .flat_map(|job| job.ready_tasks_with_waiting_instances())
    }

    pub fn running_task_instances(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.machines
            .iter()
            .flat_map(|machine| machine.running_instances())
    }

    pub fn capacity(&self) -> Resources {
        self.sum_over_machines(Machine::capacity)
    }

    pub fn available(&self) -> Resources {
        self.sum_over_machines(Machine::available)
    }

    pub fn used(&self) -> Resources {
        self.sum_over_machines(Machine::used)
    }

    fn sum_over_machines(&self, f: fn(&Machine) -> Resources) -> Resources {
        let mut total = Resources::default();
        for machine in &self.machines {
            total.add(&f(machine));
        }
        total
    }

    /// Cluster-wide `used / capacity`, undefined on axes with zero capacity.
    pub fn utilization(&self) -> Utilization {
        self.used().ratio(&self.capacity())
    }

    pub fn state(&self) -> ClusterState {
        let utilization = self.utilization();
        ClusterState {
            arrived_jobs: self.jobs.len(),
            unfinished_jobs: self.unfinished_jobs().count(),
            finished_jobs: self.finished_jobs().count(),
            unfinished_tasks: self.unfinished_tasks().count(),
            finished_tasks: self.finished_tasks().count(),
            running_task_instances: self.running_task_instances().count(),
            machine_states: self.machines.iter().map(|m| m.state()).collect(),
            cpu: utilization.cpu,
            memory: utilization.memory,
            disk: utilization.disk,
        }
    }

    /// Checks that `placement` targets a ready task with a waiting instance and
    /// a machine able to host that instance.
    pub fn validate_placement(&self, placement: &Placement) -> SimulationResult<()> {
        let invalid = |task: String, machine: String, reason: &str| {
            Err(SimulationError::InvalidPlacement {
                task,
                machine,
                reason: reason.to_string(),
            })
        };

        let task_name = |key: TaskKey| {
            self.task(key)
                .map(|t| t.id().to_string())
                .unwrap_or_else(|| format!("#{}/{}", key.job, key.task))
        };
        let machine_name = self
            .machine(placement.machine)
            .map(|m| m.id().to_string())
            .unwrap_or_else(|| format!("#{}", placement.machine));

        let Some(machine) = self.machine(placement.machine) else {
            return invalid(task_name(placement.task), machine_name, "no such machine");
        };
        let Some(task) = self.task(placement.task) else {
            return invalid(task_name(placement.task), machine_name, "no such task");
        };
        if !self.is_task_ready(placement.task) {
            return invalid(task.id().to_string(), machine_name, "task is not ready");
        }
        if !task.has_waiting_instances() {
            return invalid(
                task.id().to_string(),
                machine_name,
                "task has no waiting instances",
            );
        }
        if !machine.can_host(&task.requirement()) {
            return invalid(
                task.id().to_string(),
                machine_name,
                "machine cannot host the instance",
            );
        }
        Ok(())
    }

    /// Starts the next waiting instance of the placed task and reserves its
    /// resources on the placed machine.
    pub(crate) fn start_instance(
        &mut self,
        placement: Placement,
        now: f64,
    ) -> SimulationResult<&TaskInstance> {
        self.validate_placement(&placement)?;

        let Cluster {
            machines,
            jobs,
            started_instances,
            ..
        } = self;
        let task = jobs
            .get_mut(placement.task.job)
            .and_then(|job| job.task_mut(placement.task.task))
            .ok_or_else(|| unknown_task(placement.task))?;
        let machine = machines
            .get_mut(placement.machine)
            .ok_or_else(|| SimulationError::UnknownEntity {
                kind: "machine",
                key: format!("#{}", placement.machine),
            })?;

        // The instance must still be Pending if the reservation is refused.
        if let Some(next) = task.instances().get(task.next_instance()) {
            if !machine.can_host(&next.requirement()) {
                return Err(SimulationError::InsufficientResources {
                    machine_id: machine.id(),
                    instance_id: next.id().to_string(),
                });
            }
        }
        let instance = task.start_next_instance(placement.machine, now)?;
        machine.reserve(instance)?;
        *started_instances += 1;
        Ok(instance)
    }

    /// Marks a running instance finished and releases its reservation.
    pub(crate) fn finish_instance(&mut self, key: InstanceKey, now: f64) -> SimulationResult<()> {
        let Cluster { machines, jobs, .. } = self;
        let instance = jobs
            .get_mut(key.job)
            .and_then(|job| job.task_mut(key.task))
            .and_then(|task| task.instance_mut(key.instance))
            .ok_or_else(|| SimulationError::UnknownEntity {
                kind: "instance",
                key: format!("#{}/{}/{}", key.job, key.task, key.instance),
            })?;

        let machine_position = instance.finish(now)?;
        let machine = machines
            .get_mut(machine_position)
            .ok_or_else(|| SimulationError::UnknownEntity {
                kind: "machine",
                key: format!("#{}", machine_position),
            })?;
        machine.release(instance)
    }
}

fn unknown_task(key: TaskKey) -> SimulationError {
    SimulationError::UnknownEntity {
        kind: "task",
        key: format!("#{}/{}", key.job, key.task),
    }
}

/// Applies `placement` and spawns the process that completes the instance
/// after its duration.
pub(crate) fn schedule_instance(
    ctx: &SimulationContext,
    cluster: &Rc<RefCell<Cluster>>,
    placement: Placement,
) -> SimulationResult<InstanceKey> {
    let (key, duration) = {
        let mut cluster = cluster.borrow_mut();
        let machine_id = cluster
            .machine(placement.machine)
            .map(|m| m.id())
            .unwrap_or_default();
        let instance = cluster.start_instance(placement, ctx.time())?;
        log_debug!(
            ctx,
            "start instance: {} on machine: {}",
            instance.id(),
            machine_id
        );
        (instance.key(), instance.duration())
    };

    ctx.spawn(track_instance_process(
        ctx.clone(),
        cluster.clone(),
        key,
        duration,
    ));
    Ok(key)
}

async fn track_instance_process(
    ctx: SimulationContext,
    cluster: Rc<RefCell<Cluster>>,
    key: InstanceKey,
    duration: f64,
) -> SimulationResult<()> {
    ctx.sleep(duration).await?;

    let mut cluster = cluster.borrow_mut();
    cluster.finish_instance(key, ctx.time())?;
    if let Some(instance) = cluster.instance(key) {
        log_debug!(ctx, "finish instance: {}", instance.id());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::job_config::{IdSequence, TaskConfig};
    use crate::job::InstanceStatus;

    fn cluster(machines: &[f64]) -> Cluster {
        let mut ids = IdSequence::default();
        Cluster::with_machines(
            machines
                .iter()
                .map(|&cpu| MachineConfig::new(&mut ids, Resources::new(cpu, 1., 1.)))
                .collect(),
        )
        .unwrap()
    }

    fn job(id: u64) -> JobConfig {
        JobConfig::new(
            id,
            0.,
            vec![
                TaskConfig::new(1, 2, Resources::new(1., 0.1, 0.), 5.),
                TaskConfig::new(2, 1, Resources::new(1., 0.1, 0.), 5.).with_parents(vec![1]),
            ],
        )
    }

    fn placement(job: usize, task: usize, machine: usize) -> Placement {
        Placement {
            machine,
            task: TaskKey { job, task },
        }
    }

    #[test]
    fn test_empty_cluster_state() {
        let state = Cluster::new().state();
        assert_eq!(state.arrived_jobs, 0);
        assert_eq!(state.cpu, None);
        assert_eq!(state.memory, None);
        assert_eq!(state.disk, None);
        assert!(state.machine_states.is_empty());
    }

    #[test]
    fn test_duplicate_job() {
        let mut cluster = cluster(&[4.]);
        cluster.add_job(job(1)).unwrap();
        assert!(matches!(
            cluster.add_job(job(1)),
            Err(SimulationError::DuplicateJob { job_id: 1 })
        ));
        assert_eq!(cluster.jobs().len(), 1);
    }

    #[test]
    fn test_start_and_finish_instance() {
        let mut cluster = cluster(&[4.]);
        cluster.add_job(job(1)).unwrap();

        let key = cluster.start_instance(placement(0, 0, 0), 0.).unwrap().key();
        assert_eq!(cluster.running_task_instances().collect::<Vec<_>>(), vec![key]);
        assert_eq!(cluster.available().cpu, 3.);
        assert_eq!(cluster.state().cpu, Some(0.25));
        assert_eq!(cluster.started_instances(), 1);

        cluster.finish_instance(key, 5.).unwrap();
        assert_eq!(cluster.available(), cluster.capacity());
        assert_eq!(cluster.instance(key).unwrap().finished_timestamp(), Some(5.));
    }

    #[test]
    fn test_invalid_placements() {
        let mut cluster = cluster(&[1.]);
        cluster.add_job(job(1)).unwrap();

        let reason = |placement: Placement, cluster: &Cluster| match cluster
            .validate_placement(&placement)
        {
            Err(SimulationError::InvalidPlacement { reason, .. }) => reason,
            other => panic!("unexpected result: {:?}", other),
        };

        assert_eq!(reason(placement(0, 0, 3), &cluster), "no such machine");
        assert_eq!(reason(placement(0, 5, 0), &cluster), "no such task");
        assert_eq!(reason(placement(0, 1, 0), &cluster), "task is not ready");

        cluster.start_instance(placement(0, 0, 0), 0.).unwrap();
        assert_eq!(
            reason(placement(0, 0, 0), &cluster),
            "machine cannot host the instance"
        );
    }

    #[test]
    fn test_rejected_start_leaves_task_pending() {
        let mut cluster = cluster(&[1.]);
        cluster.add_job(job(1)).unwrap();
        cluster.start_instance(placement(0, 0, 0), 0.).unwrap();

        assert!(cluster.start_instance(placement(0, 0, 0), 1.).is_err());
        let task = cluster.task(TaskKey { job: 0, task: 0 }).unwrap();
        assert_eq!(task.next_instance(), 1);
        assert_eq!(task.instances()[1].status(), InstanceStatus::Pending);
        assert_eq!(cluster.machines()[0].running_instances_count(), 1);
        assert_eq!(cluster.machines()[0].available().cpu, 0.);
    }

    #[test]
    fn test_aggregates() {
        let mut cluster = cluster(&[4., 4.]);
        cluster.add_job(job(1)).unwrap();
        cluster.add_job(job(2)).unwrap();

        assert_eq!(cluster.ready_tasks_with_waiting_instances().count(), 2);
        assert_eq!(cluster.tasks_with_waiting_instances().count(), 4);
        assert_eq!(cluster.unfinished_tasks().count(), 4);

        let first = cluster.start_instance(placement(0, 0, 0), 0.).unwrap().key();
        let second = cluster.start_instance(placement(0, 0, 1), 0.).unwrap().key();
        assert_eq!(cluster.running_task_instances().count(), 2);
        cluster.finish_instance(first, 5.).unwrap();
        cluster.finish_instance(second, 5.).unwrap();

        assert_eq!(cluster.finished_tasks().count(), 1);
        assert!(cluster.is_task_ready(TaskKey { job: 0, task: 1 }));
        assert_eq!(cluster.ready_unfinished_tasks().count(), 2);
        assert_eq!(cluster.unfinished_jobs().count(), 2);
        assert_eq!(cluster.job_by_id(2).unwrap().id(), 2);
    }
}
