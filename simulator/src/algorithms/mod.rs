//! Reference placement heuristics.
//!
//! Every algorithm here only proposes ready tasks with a waiting instance and
//! machines able to host that instance, so its decisions are always accepted.

pub mod drf;
pub mod first_fit;
pub mod random;
pub mod tetris;

pub use drf::Drf;
pub use first_fit::FirstFit;
pub use random::RandomAlgorithm;
pub use tetris::Tetris;

use crate::{cluster::Cluster, job::Task, machine::Machine, scheduler::Placement};

/// Every feasible (machine, task) pair, in machine then cluster task order.
pub(crate) fn feasible_placements(
    cluster: &Cluster,
) -> impl Iterator<Item = (&Machine, &Task, Placement)> {
    let tasks = cluster.ready_tasks_with_waiting_instances().collect::<Vec<_>>();
    cluster
        .machines()
        .iter()
        .enumerate()
        .flat_map(move |(position, machine)| {
            tasks
                .clone()
                .into_iter()
                .filter(move |task| machine.can_host(&task.requirement()))
                .map(move |task| {
                    (
                        machine,
                        task,
                        Placement {
                            machine: position,
                            task: task.key(),
                        },
                    )
                })
        })
}
