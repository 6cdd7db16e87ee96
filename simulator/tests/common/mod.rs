#![allow(dead_code)]

use clustersim::{
    config::{
        job_config::{IdSequence, JobConfig, MachineConfig, TaskConfig},
        sim_config::MonitoringConfig,
    },
    ClusterSchedulingSimulation, Resources, Simulation,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn machines(capacities: &[Resources]) -> Vec<MachineConfig> {
    let mut ids = IdSequence::default();
    capacities
        .iter()
        .map(|&capacity| MachineConfig::new(&mut ids, capacity))
        .collect()
}

pub fn task(index: u64, instances: u32, cpu: f64, duration: f64) -> TaskConfig {
    TaskConfig::new(index, instances, Resources::new(cpu, 0., 0.), duration)
}

pub fn job(id: u64, submit_time: f64, tasks: Vec<TaskConfig>) -> JobConfig {
    JobConfig::new(id, submit_time, tasks)
}

/// Simulation with an in-memory monitor and no event file.
pub fn simulation(
    machines: Vec<MachineConfig>,
    jobs: Vec<JobConfig>,
) -> ClusterSchedulingSimulation {
    init_logger();
    ClusterSchedulingSimulation::from_configs(Simulation::new(), machines, jobs)
        .unwrap()
        .with_monitoring(MonitoringConfig::default())
}
