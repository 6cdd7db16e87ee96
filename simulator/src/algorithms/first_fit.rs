use crate::{cluster::Cluster, scheduler::{Algorithm, Placement}};

/// First ready task with a waiting instance, on the first machine that can
/// host it.
#[derive(Default)]
pub struct FirstFit;

impl Algorithm for FirstFit {
    fn decide(&mut self, cluster: &Cluster, _now: f64) -> Option<Placement> {
        cluster
            .ready_tasks_with_waiting_instances()
            .find_map(|task| {
                let requirement = task.requirement();
                cluster
                    .machines()
                    .iter()
                    .position(|machine| machine.can_host(&requirement))
                    .map(|machine| Placement {
                        machine,
                        task: task.key(),
                    })
            })
    }

    fn name(&self) -> &str {
        "first-fit"
    }
}
