use clustersim::{Algorithm, Cluster, Placement};

/// Places ready instances on machines in turn, starting after the machine
/// used by the previous placement.
#[derive(Default)]
pub struct RoundRobin {
    next_machine: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Algorithm for RoundRobin {
    fn decide(&mut self, cluster: &Cluster, _now: f64) -> Option<Placement> {
        let machines = cluster.machines();
        if machines.is_empty() {
            return None;
        }

        for task in cluster.ready_tasks_with_waiting_instances() {
            let requirement = task.requirement();
            for offset in 0..machines.len() {
                let machine = (self.next_machine + offset) % machines.len();
                if machines[machine].can_host(&requirement) {
                    self.next_machine = (machine + 1) % machines.len();
                    return Some(Placement {
                        machine,
                        task: task.key(),
                    });
                }
            }
        }
        None
    }

    fn name(&self) -> &str {
        "round-robin"
    }
}
