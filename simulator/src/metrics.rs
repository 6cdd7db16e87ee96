//! Post-run metrics computed from task timestamps.

use crate::{cluster::Cluster, job::Task};

fn completion(task: &Task) -> Option<f64> {
    Some(task.finished_timestamp()? - task.started_timestamp()?)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0., 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of `finished - started` over all tasks that ran to completion.
pub fn average_completion(cluster: &Cluster) -> Option<f64> {
    mean(
        cluster
            .jobs()
            .iter()
            .flat_map(|job| job.tasks())
            .filter_map(completion),
    )
}

/// Mean of completion time divided by the configured duration. Tasks with a
/// zero duration are skipped.
pub fn average_slowdown(cluster: &Cluster) -> Option<f64> {
    mean(
        cluster
            .jobs()
            .iter()
            .flat_map(|job| job.tasks())
            .filter(|task| task.duration() > 0.)
            .filter_map(|task| Some(completion(task)? / task.duration())),
    )
}

/// Time at which the last job finished.
pub fn makespan(cluster: &Cluster) -> Option<f64> {
    cluster
        .jobs()
        .iter()
        .filter_map(|job| job.finished_timestamp())
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::job_config::{IdSequence, JobConfig, MachineConfig, TaskConfig},
        job::TaskKey,
        resources::Resources,
        scheduler::Placement,
    };

    #[test]
    fn test_metrics() {
        let mut ids = IdSequence::default();
        let mut cluster = Cluster::with_machines(vec![MachineConfig::new(
            &mut ids,
            Resources::new(1., 1., 1.),
        )])
        .unwrap();
        assert_eq!(average_completion(&cluster), None);
        assert_eq!(average_slowdown(&cluster), None);

        cluster
            .add_job(JobConfig::new(
                0,
                0.,
                vec![TaskConfig::new(1, 2, Resources::new(1., 0., 0.), 5.)],
            ))
            .unwrap();
        let placement = Placement {
            machine: 0,
            task: TaskKey { job: 0, task: 0 },
        };
        let first = cluster.start_instance(placement, 0.).unwrap().key();
        cluster.finish_instance(first, 5.).unwrap();
        let second = cluster.start_instance(placement, 5.).unwrap().key();
        assert_eq!(average_completion(&cluster), None);
        cluster.finish_instance(second, 10.).unwrap();

        assert_eq!(average_completion(&cluster), Some(10.));
        assert_eq!(average_slowdown(&cluster), Some(2.));
        assert_eq!(makespan(&cluster), Some(10.));
    }
}
