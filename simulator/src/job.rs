//! Workload model: a job is a DAG of tasks, a task is a fixed set of
//! interchangeable instances that are started strictly in index order.

use std::cell::Cell;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    config::job_config::{JobConfig, TaskConfig, TaskInstanceConfig},
    error::{SimulationError, SimulationResult},
    resources::Resources,
};

/// Position of a task inside the cluster: job position, then task position
/// within that job (configuration order).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub job: usize,
    pub task: usize,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub job: usize,
    pub task: usize,
    pub instance: usize,
}

impl InstanceKey {
    pub fn task_key(&self) -> TaskKey {
        TaskKey {
            job: self.job,
            task: self.task,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceStatus {
    Pending,
    Running,
    Finished,
}

impl InstanceStatus {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Running => "running",
            InstanceStatus::Finished => "finished",
        }
    }
}

fn earliest(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, t| match acc {
        Some(current) if current <= t => Some(current),
        _ => Some(t),
    })
}

fn latest(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, t| match acc {
        Some(current) if current >= t => Some(current),
        _ => Some(t),
    })
}

#[derive(Clone, Debug)]
pub struct TaskInstance {
    id: String,
    key: InstanceKey,
    config: TaskInstanceConfig,

    status: InstanceStatus,
    machine: Option<usize>,
    started_timestamp: Option<f64>,
    finished_timestamp: Option<f64>,
}

impl TaskInstance {
    pub fn new(task_id: &str, key: InstanceKey, config: TaskInstanceConfig) -> Self {
        Self {
            id: format!("{}-{}", task_id, key.instance),
            key,
            config,
            status: InstanceStatus::Pending,
            machine: None,
            started_timestamp: None,
            finished_timestamp: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> InstanceKey {
        self.key
    }

    pub fn index(&self) -> usize {
        self.key.instance
    }

    pub fn requirement(&self) -> Resources {
        self.config.requirement
    }

    pub fn duration(&self) -> f64 {
        self.config.duration
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn is_started(&self) -> bool {
        self.status != InstanceStatus::Pending
    }

    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.status == InstanceStatus::Finished
    }

    /// Cluster position of the machine the instance was placed on.
    pub fn machine(&self) -> Option<usize> {
        self.machine
    }

    pub fn started_timestamp(&self) -> Option<f64> {
        self.started_timestamp
    }

    pub fn finished_timestamp(&self) -> Option<f64> {
        self.finished_timestamp
    }

    fn transition(&mut self, from: InstanceStatus, to: InstanceStatus) -> SimulationResult<()> {
        if self.status != from {
            return Err(SimulationError::InvalidTransition {
                instance_id: self.id.clone(),
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }

    pub(crate) fn start(&mut self, machine: usize, now: f64) -> SimulationResult<()> {
        self.transition(InstanceStatus::Pending, InstanceStatus::Running)?;
        self.machine = Some(machine);
        self.started_timestamp = Some(now);
        Ok(())
    }

    pub(crate) fn finish(&mut self, now: f64) -> SimulationResult<usize> {
        self.transition(InstanceStatus::Running, InstanceStatus::Finished)?;
        self.finished_timestamp = Some(now);
        self.machine.ok_or_else(|| SimulationError::InvalidTransition {
            instance_id: self.id.clone(),
            from: "unplaced",
            to: InstanceStatus::Finished.as_str(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Task {
    id: String,
    key: TaskKey,
    config: TaskConfig,
    instances: Vec<TaskInstance>,
    next_instance: usize,
    // Positions of parent tasks within the owning job.
    parents: Vec<usize>,
    ready: Cell<bool>,
}

impl Task {
    fn new(job_id: u64, key: TaskKey, config: TaskConfig) -> Self {
        let id = format!("{}-{}", job_id, config.task_index);
        let instance_config = TaskInstanceConfig::from(&config);
        let instances = (0..config.instances_number as usize)
            .map(|instance| {
                TaskInstance::new(
                    &id,
                    InstanceKey {
                        job: key.job,
                        task: key.task,
                        instance,
                    },
                    instance_config,
                )
            })
            .collect();

        Self {
            id,
            key,
            config,
            instances,
            next_instance: 0,
            parents: Vec::new(),
            ready: Cell::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> TaskKey {
        self.key
    }

    /// Index of the task in the source trace numbering.
    pub fn index(&self) -> u64 {
        self.config.task_index
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn requirement(&self) -> Resources {
        self.config.requirement()
    }

    pub fn duration(&self) -> f64 {
        self.config.duration
    }

    pub fn instances(&self) -> &[TaskInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&TaskInstance> {
        self.instances.get(index)
    }

    pub(crate) fn instance_mut(&mut self, index: usize) -> Option<&mut TaskInstance> {
        self.instances.get_mut(index)
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    /// Index of the next instance to be started.
    pub fn next_instance(&self) -> usize {
        self.next_instance
    }

    pub fn waiting_instances_number(&self) -> usize {
        self.instances.len() - self.next_instance
    }

    pub fn has_waiting_instances(&self) -> bool {
        self.next_instance < self.instances.len()
    }

    pub fn running_instances(&self) -> impl Iterator<Item = &TaskInstance> {
        self.instances.iter().filter(|i| i.is_running())
    }

    pub fn finished_instances(&self) -> impl Iterator<Item = &TaskInstance> {
        self.instances.iter().filter(|i| i.is_finished())
    }

    pub fn is_started(&self) -> bool {
        self.instances.iter().any(|i| i.is_started())
    }

    pub fn is_finished(&self) -> bool {
        !self.has_waiting_instances() && self.running_instances().next().is_none()
    }

    pub fn started_timestamp(&self) -> Option<f64> {
        earliest(self.instances.iter().map(|i| i.started_timestamp()))
    }

    pub fn finished_timestamp(&self) -> Option<f64> {
        if !self.is_finished() {
            return None;
        }
        latest(self.instances.iter().map(|i| i.finished_timestamp()))
    }

    /// Starts the instance under the cursor on `machine` and advances the
    /// cursor. Calling it with no waiting instance means the caller
    /// double-scheduled.
    pub(crate) fn start_next_instance(
        &mut self,
        machine: usize,
        now: f64,
    ) -> SimulationResult<&TaskInstance> {
        let index = self.next_instance;
        let Some(instance) = self.instances.get_mut(index) else {
            return Err(SimulationError::NoWaitingInstance {
                task_id: self.id.clone(),
            });
        };
        instance.start(machine, now)?;
        self.next_instance += 1;
        Ok(&self.instances[index])
    }
}

fn validate_task(job_id: u64, config: &TaskConfig) -> SimulationResult<()> {
    let invalid = |reason: &str| SimulationError::InvalidTask {
        task_id: format!("{}-{}", job_id, config.task_index),
        reason: reason.to_string(),
    };
    if !config.requirement().is_valid() {
        return Err(invalid("requirement must be finite and non-negative"));
    }
    if !(config.duration.is_finite() && config.duration >= 0.) {
        return Err(invalid("duration must be finite and non-negative"));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct Job {
    id: u64,
    submit_time: f64,
    tasks: Vec<Task>,
    positions: FxHashMap<u64, usize>,
}

impl Job {
    /// Builds the task graph of `config`. `position` is the job's slot in the
    /// owning cluster.
    pub fn new(position: usize, config: JobConfig) -> SimulationResult<Self> {
        let JobConfig {
            id,
            submit_time,
            task_configs,
        } = config;

        let mut positions = FxHashMap::default();
        let mut tasks = Vec::with_capacity(task_configs.len());
        for (task_position, task_config) in task_configs.into_iter().enumerate() {
            if positions
                .insert(task_config.task_index, task_position)
                .is_some()
            {
                return Err(SimulationError::DuplicateTask {
                    job_id: id,
                    task_index: task_config.task_index,
                });
            }
            validate_task(id, &task_config)?;
            let key = TaskKey {
                job: position,
                task: task_position,
            };
            tasks.push(Task::new(id, key, task_config));
        }

        for task in tasks.iter_mut() {
            let parent_indices = task.config.parent_indices.clone().unwrap_or_default();
            let mut parents = Vec::with_capacity(parent_indices.len());
            for parent_index in parent_indices {
                let parent = positions.get(&parent_index).copied().ok_or_else(|| {
                    SimulationError::MissingParent {
                        job_id: id,
                        task_id: task.id.clone(),
                        parent_index,
                    }
                })?;
                parents.push(parent);
            }
            task.parents = parents;
        }

        let job = Self {
            id,
            submit_time,
            tasks,
            positions,
        };
        job.check_acyclic()?;
        Ok(job)
    }

    fn check_acyclic(&self) -> SimulationResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.tasks.len()];
        for root in 0..self.tasks.len() {
            if marks[root] != Mark::New {
                continue;
            }
            // (task, next parent to visit)
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::Active;
            while let Some((task, next)) = stack.pop() {
                let parents = &self.tasks[task].parents;
                if next == parents.len() {
                    marks[task] = Mark::Done;
                    continue;
                }
                stack.push((task, next + 1));
                let parent = parents[next];
                match marks[parent] {
                    Mark::Active => {
                        return Err(SimulationError::CyclicDependency {
                            job_id: self.id,
                            task_id: self.tasks[parent].id.clone(),
                        })
                    }
                    Mark::New => {
                        marks[parent] = Mark::Active;
                        stack.push((parent, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn submit_time(&self) -> f64 {
        self.submit_time
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, position: usize) -> Option<&Task> {
        self.tasks.get(position)
    }

    pub(crate) fn task_mut(&mut self, position: usize) -> Option<&mut Task> {
        self.tasks.get_mut(position)
    }

    pub fn task_by_index(&self, task_index: u64) -> Option<&Task> {
        self.positions
            .get(&task_index)
            .and_then(|&position| self.tasks.get(position))
    }

    /// A task is ready once all of its parents are finished. The answer is
    /// memoized as soon as it becomes true.
    pub fn is_task_ready(&self, position: usize) -> bool {
        let Some(task) = self.tasks.get(position) else {
            return false;
        };
        if task.ready.get() {
            return true;
        }
        if task.parents.iter().all(|&p| self.tasks[p].is_finished()) {
            task.ready.set(true);
            return true;
        }
        false
    }

    pub fn unfinished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_finished())
    }

    pub fn finished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_finished())
    }

    pub fn running_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_started() && !t.is_finished())
    }

    pub fn ready_unfinished_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .enumerate()
            .filter(move |(p, t)| !t.is_finished() && self.is_task_ready(*p))
            .map(|(_, t)| t)
    }

    pub fn tasks_with_waiting_instances(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.has_waiting_instances())
    }

    pub fn ready_tasks_with_waiting_instances(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .enumerate()
            .filter(move |(p, t)| t.has_waiting_instances() && self.is_task_ready(*p))
            .map(|(_, t)| t)
    }

    pub fn is_started(&self) -> bool {
        self.tasks.iter().any(|t| t.is_started())
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.is_finished())
    }

    pub fn started_timestamp(&self) -> Option<f64> {
        earliest(self.tasks.iter().map(|t| t.started_timestamp()))
    }

    pub fn finished_timestamp(&self) -> Option<f64> {
        if !self.is_finished() {
            return None;
        }
        latest(self.tasks.iter().map(|t| t.finished_timestamp()))
    }
}
