//! Immutable records describing machines and workload, produced once at input
//! time and owned by the entities built from them.

use serde::{Deserialize, Serialize};

use crate::resources::Resources;

/// Explicit id generator owned by whoever constructs machine configs.
#[derive(Default, Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MachineConfig {
    pub id: u64,
    pub group: u64,
    pub capacity: Resources,
    pub available: Resources,
}

impl MachineConfig {
    pub fn new(ids: &mut IdSequence, capacity: Resources) -> Self {
        Self {
            id: ids.next_id(),
            group: 0,
            capacity,
            available: capacity,
        }
    }

    pub fn with_group(mut self, group: u64) -> Self {
        self.group = group;
        self
    }

    pub fn with_available(mut self, available: Resources) -> Self {
        self.available = available;
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskConfig {
    pub task_index: u64,
    pub instances_number: u32,
    pub cpu: f64,
    pub memory: f64,
    #[serde(default)]
    pub disk: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_indices: Option<Vec<u64>>,
}

impl TaskConfig {
    pub fn new(
        task_index: u64,
        instances_number: u32,
        requirement: Resources,
        duration: f64,
    ) -> Self {
        Self {
            task_index,
            instances_number,
            cpu: requirement.cpu,
            memory: requirement.memory,
            disk: requirement.disk,
            duration,
            parent_indices: None,
        }
    }

    pub fn with_parents(mut self, parent_indices: Vec<u64>) -> Self {
        self.parent_indices = Some(parent_indices);
        self
    }

    pub fn requirement(&self) -> Resources {
        Resources::new(self.cpu, self.memory, self.disk)
    }
}

/// Per-instance copy of a task's template.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct TaskInstanceConfig {
    pub requirement: Resources,
    pub duration: f64,
}

impl From<&TaskConfig> for TaskInstanceConfig {
    fn from(task_config: &TaskConfig) -> Self {
        Self {
            requirement: task_config.requirement(),
            duration: task_config.duration,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JobConfig {
    pub id: u64,
    pub submit_time: f64,
    #[serde(alias = "tasks")]
    pub task_configs: Vec<TaskConfig>,
}

impl JobConfig {
    pub fn new(id: u64, submit_time: f64, task_configs: Vec<TaskConfig>) -> Self {
        Self {
            id,
            submit_time,
            task_configs,
        }
    }
}
