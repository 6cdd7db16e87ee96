use serde::Serialize;

use crate::{
    config::job_config::MachineConfig,
    error::{SimulationError, SimulationResult},
    job::{InstanceKey, TaskInstance},
    resources::Resources,
};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MachineState {
    pub id: u64,
    pub group: u64,
    pub cpu_capacity: f64,
    pub memory_capacity: f64,
    pub disk_capacity: f64,
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
    pub running_task_instances: usize,
    pub finished_task_instances: usize,
}

#[derive(Clone, Debug)]
struct Reservation {
    instance: InstanceKey,
    requirement: Resources,
}

/// Capacity ledger of one machine. `reserve` and `release` are the only
/// operations that change `available`.
#[derive(Clone, Debug)]
pub struct Machine {
    config: MachineConfig,
    available: Resources,
    reservations: Vec<Reservation>,
    finished_instances: usize,
}

impl Machine {
    pub fn new(config: MachineConfig) -> SimulationResult<Self> {
        let invalid = |reason: &str| SimulationError::InvalidMachine {
            machine_id: config.id,
            reason: reason.to_string(),
        };
        if !config.capacity.is_valid() {
            return Err(invalid("capacity must be finite and non-negative"));
        }
        if !config.available.is_valid() {
            return Err(invalid("availability must be finite and non-negative"));
        }
        if !config.available.fit_into(&config.capacity) {
            return Err(invalid("availability exceeds capacity"));
        }

        Ok(Self {
            available: config.available,
            config,
            reservations: Vec::new(),
            finished_instances: 0,
        })
    }

    pub fn id(&self) -> u64 {
        self.config.id
    }

    pub fn group(&self) -> u64 {
        self.config.group
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn capacity(&self) -> Resources {
        self.config.capacity
    }

    pub fn available(&self) -> Resources {
        self.available
    }

    /// Capacity already taken when the machine joined the cluster.
    pub fn background_load(&self) -> Resources {
        let mut load = self.config.capacity;
        load.subtract(&self.config.available);
        load
    }

    pub fn used(&self) -> Resources {
        let mut used = self.config.capacity;
        used.subtract(&self.available);
        used
    }

    /// Sum of requirements of instances currently running here.
    pub fn reserved(&self) -> Resources {
        let mut reserved = Resources::default();
        for reservation in &self.reservations {
            reserved.add(&reservation.requirement);
        }
        reserved
    }

    pub fn can_host(&self, requirement: &Resources) -> bool {
        requirement.fit_into(&self.available)
    }

    pub fn running_instances(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.reservations.iter().map(|r| r.instance)
    }

    pub fn running_instances_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn finished_instances_count(&self) -> usize {
        self.finished_instances
    }

    pub fn reserve(&mut self, instance: &TaskInstance) -> SimulationResult<()> {
        let requirement = instance.requirement();
        if !self.can_host(&requirement) {
            return Err(SimulationError::InsufficientResources {
                machine_id: self.id(),
                instance_id: instance.id().to_string(),
            });
        }
        self.available.subtract(&requirement);
        self.reservations.push(Reservation {
            instance: instance.key(),
            requirement,
        });
        Ok(())
    }

    pub fn release(&mut self, instance: &TaskInstance) -> SimulationResult<()> {
        let position = self
            .reservations
            .iter()
            .position(|r| r.instance == instance.key())
            .ok_or_else(|| SimulationError::InvalidRelease {
                machine_id: self.id(),
                instance_id: instance.id().to_string(),
            })?;
        let reservation = self.reservations.remove(position);
        self.available.add(&reservation.requirement);
        self.available = self.available.min(&self.config.capacity);
        self.finished_instances += 1;
        Ok(())
    }

    pub fn state(&self) -> MachineState {
        let capacity = self.capacity();
        let utilization = self.used().ratio(&capacity);
        MachineState {
            id: self.id(),
            group: self.group(),
            cpu_capacity: capacity.cpu,
            memory_capacity: capacity.memory,
            disk_capacity: capacity.disk,
            cpu: utilization.cpu,
            memory: utilization.memory,
            disk: utilization.disk,
            running_task_instances: self.running_instances_count(),
            finished_task_instances: self.finished_instances,
        }
    }
}
