use crate::{cluster::Cluster, scheduler::{Algorithm, Placement}};

use super::feasible_placements;

/// Packing heuristic: the feasible pair whose task requirement is best aligned
/// with the machine's free resources.
#[derive(Default)]
pub struct Tetris;

impl Algorithm for Tetris {
    fn decide(&mut self, cluster: &Cluster, _now: f64) -> Option<Placement> {
        let mut best: Option<(f64, Placement)> = None;
        for (machine, task, placement) in feasible_placements(cluster) {
            let score = machine.available().dot(&task.requirement());
            // Ties keep the earliest pair.
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, placement));
            }
        }
        best.map(|(_, placement)| placement)
    }

    fn name(&self) -> &str {
        "tetris"
    }
}
