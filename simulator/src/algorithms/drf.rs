use crate::{
    cluster::Cluster,
    job::Job,
    resources::Resources,
    scheduler::{Algorithm, Placement},
};

/// Dominant resource fairness across jobs: serves the job whose largest share
/// of cluster capacity currently held by its running instances is the
/// smallest, then places its first ready task on the first machine that can
/// host it.
#[derive(Default)]
pub struct Drf;

fn dominant_share(job: &Job, capacity: &Resources) -> f64 {
    let mut held = Resources::default();
    for task in job.tasks() {
        let requirement = task.requirement();
        for _ in task.running_instances() {
            held.add(&requirement);
        }
    }
    let share = held.ratio(capacity);
    [share.cpu, share.memory, share.disk]
        .into_iter()
        .flatten()
        .fold(0., f64::max)
}

impl Algorithm for Drf {
    fn decide(&mut self, cluster: &Cluster, _now: f64) -> Option<Placement> {
        let capacity = cluster.capacity();
        let mut candidates = cluster
            .jobs()
            .iter()
            .filter(|job| !job.is_finished())
            .map(|job| (dominant_share(job, &capacity), job))
            .collect::<Vec<_>>();
        // Stable: equal shares keep arrival order.
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        candidates.into_iter().find_map(|(_, job)| {
            job.ready_tasks_with_waiting_instances().find_map(|task| {
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
        })
    }

    fn name(&self) -> &str {
        "drf"
    }
}
