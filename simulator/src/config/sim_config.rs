use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    config::job_config::{IdSequence, JobConfig, MachineConfig},
    error::SimulationResult,
    resources::Resources,
};

/// One or more identical machines.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MachineGroupConfig {
    pub count: Option<u32>,
    pub group: Option<u64>,
    pub cpu: f64,
    pub memory: f64,
    #[serde(default)]
    pub disk: f64,
    /// Initial availability, defaults to the full capacity.
    pub available: Option<Resources>,
}

impl MachineGroupConfig {
    pub fn build(&self, ids: &mut IdSequence) -> Vec<MachineConfig> {
        let capacity = Resources::new(self.cpu, self.memory, self.disk);
        (0..self.count.unwrap_or(1))
            .map(|_| {
                MachineConfig::new(ids, capacity)
                    .with_group(self.group.unwrap_or(0))
                    .with_available(self.available.unwrap_or(capacity))
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClusterWorkloadConfig {
    pub r#type: String,
    pub options: Option<serde_yaml::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MonitoringConfig {
    /// Where the event log is written at the end of the run. Without it the
    /// log is only kept in memory.
    pub event_file: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SchedulerConfig {
    /// Fail with `Unschedulable` once the remaining work can never start.
    /// Off by default: an algorithm may defer placements to a later tick.
    #[serde(default)]
    pub detect_deadlock: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub machines: Vec<MachineGroupConfig>,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    pub workload: Option<Vec<ClusterWorkloadConfig>>,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> SimulationResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn machine_configs(&self) -> Vec<MachineConfig> {
        let mut ids = IdSequence::default();
        self.machines
            .iter()
            .flat_map(|group| group.build(&mut ids))
            .collect()
    }
}
