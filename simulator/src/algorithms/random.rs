use rand::{seq::IteratorRandom, SeedableRng};
use rand_pcg::Pcg64;

use crate::{cluster::Cluster, scheduler::{Algorithm, Placement}};

use super::feasible_placements;

/// Uniform choice among all feasible pairs. Runs with equal seeds make equal
/// decisions.
pub struct RandomAlgorithm {
    rand: Pcg64,
}

impl RandomAlgorithm {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl Algorithm for RandomAlgorithm {
    fn decide(&mut self, cluster: &Cluster, _now: f64) -> Option<Placement> {
        feasible_placements(cluster)
            .map(|(_, _, placement)| placement)
            .choose(&mut self.rand)
    }

    fn name(&self) -> &str {
        "random"
    }
}
