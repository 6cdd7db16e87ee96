//! Error taxonomy of the simulator.
//!
//! Every variant is fatal to the run that produced it. Configuration errors are
//! raised while building the cluster or a job, logic errors point at a defect in
//! the scheduler loop or in an [`Algorithm`](crate::scheduler::Algorithm).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("task {task_id} references parent task index {parent_index} missing from job {job_id}")]
    MissingParent {
        job_id: u64,
        task_id: String,
        parent_index: u64,
    },

    #[error("job {job_id} defines task index {task_index} more than once")]
    DuplicateTask { job_id: u64, task_index: u64 },

    #[error("job {job_id} has a dependency cycle through task {task_id}")]
    CyclicDependency { job_id: u64, task_id: String },

    #[error("task {task_id} is invalid: {reason}")]
    InvalidTask { task_id: String, reason: String },

    #[error("job {job_id} is submitted more than once")]
    DuplicateJob { job_id: u64 },

    #[error("machine {machine_id} has invalid resources: {reason}")]
    InvalidMachine { machine_id: u64, reason: String },

    #[error("job {job_id} submit time {submit_time} is earlier than current time {now}")]
    SubmitTimeInPast {
        job_id: u64,
        submit_time: f64,
        now: f64,
    },

    #[error("task {task_id} has no waiting instances left")]
    NoWaitingInstance { task_id: String },

    #[error("invalid placement of task {task} on machine {machine}: {reason}")]
    InvalidPlacement {
        task: String,
        machine: String,
        reason: String,
    },

    #[error("machine {machine_id} cannot host instance {instance_id}")]
    InsufficientResources {
        machine_id: u64,
        instance_id: String,
    },

    #[error("machine {machine_id} does not run instance {instance_id}")]
    InvalidRelease {
        machine_id: u64,
        instance_id: String,
    },

    #[error("instance {instance_id} cannot move from {from} to {to}")]
    InvalidTransition {
        instance_id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("process {process} requested a negative delay {delay}")]
    NegativeDelay { process: String, delay: f64 },

    #[error("sleep was polled outside of a simulation process")]
    NoActiveProcess,

    #[error("task {task_id} can never be scheduled: nothing is running and no jobs are pending")]
    Unschedulable { task_id: String },

    #[error("simulation has already been started")]
    AlreadyStarted,

    #[error("unknown {kind} {key}")]
    UnknownEntity { kind: &'static str, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown workload type `{0}`")]
    UnknownWorkload(String),

    #[error("invalid trace record for job {job_id}: {reason}")]
    InvalidTrace { job_id: u64, reason: String },

    #[error("invalid workload options: {0}")]
    InvalidWorkloadOptions(String),
}

pub type SimulationResult<T> = Result<T, SimulationError>;
