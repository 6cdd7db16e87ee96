use serde::{Deserialize, Serialize};

/// Resource triple shared by machine capacities and instance requirements.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Resources {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Resources {
    pub fn new(cpu: f64, memory: f64, disk: f64) -> Self {
        Self { cpu, memory, disk }
    }

    pub fn fit_into(&self, other: &Resources) -> bool {
        self.cpu <= other.cpu && self.memory <= other.memory && self.disk <= other.disk
    }

    pub fn subtract(&mut self, other: &Resources) {
        self.cpu -= other.cpu;
        self.memory -= other.memory;
        self.disk -= other.disk;
    }

    pub fn add(&mut self, other: &Resources) {
        self.cpu += other.cpu;
        self.memory += other.memory;
        self.disk += other.disk;
    }

    /// Component-wise minimum, used to keep rounding from pushing a ledger
    /// above its capacity.
    pub fn min(&self, other: &Resources) -> Resources {
        Resources {
            cpu: self.cpu.min(other.cpu),
            memory: self.memory.min(other.memory),
            disk: self.disk.min(other.disk),
        }
    }

    pub fn dot(&self, other: &Resources) -> f64 {
        self.cpu * other.cpu + self.memory * other.memory + self.disk * other.disk
    }

    pub fn is_valid(&self) -> bool {
        [self.cpu, self.memory, self.disk]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.)
    }

    /// `self / total` per axis, `None` where the total is zero.
    pub fn ratio(&self, total: &Resources) -> Utilization {
        let ratio = |value: f64, total: f64| (total > 0.).then(|| value / total);
        Utilization {
            cpu: ratio(self.cpu, total.cpu),
            memory: ratio(self.memory, total.memory),
            disk: ratio(self.disk, total.disk),
        }
    }
}

/// Per-resource ratio. An axis with zero capacity has no defined ratio and is
/// serialized as `null`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Utilization {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
}
