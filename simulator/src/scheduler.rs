use std::{cell::RefCell, rc::Rc};

use crate::{
    cluster::{schedule_instance, Cluster},
    error::{SimulationError, SimulationResult},
    job::TaskKey,
    kernel::SimulationContext,
    log_debug,
    simulation::Termination,
};

/// Virtual time between two scheduler (and monitor) wake-ups.
pub const TICK: f64 = 1.;

/// "Start the next waiting instance of `task` on the machine at position
/// `machine`."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Placement {
    pub machine: usize,
    pub task: TaskKey,
}

/// Placement policy queried by the scheduler.
///
/// `decide` sees a read-only cluster and returns at most one placement. The
/// scheduler applies it and asks again, until `None` is returned, so every
/// decision is made against the state left by the previous one. A returned
/// placement must name a ready task with a waiting instance and a machine
/// that can host it, otherwise the run is aborted with
/// [`SimulationError::InvalidPlacement`].
pub trait Algorithm {
    fn decide(&mut self, cluster: &Cluster, now: f64) -> Option<Placement>;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Algorithm for F
where
    F: FnMut(&Cluster, f64) -> Option<Placement>,
{
    fn decide(&mut self, cluster: &Cluster, now: f64) -> Option<Placement> {
        self(cluster, now)
    }
}

pub struct Scheduler {
    ctx: SimulationContext,
    cluster: Rc<RefCell<Cluster>>,
    algorithm: Box<dyn Algorithm>,
    termination: Termination,
    detect_deadlock: bool,

    decisions: u64,
}

impl Scheduler {
    pub fn new(
        ctx: SimulationContext,
        cluster: Rc<RefCell<Cluster>>,
        algorithm: Box<dyn Algorithm>,
        termination: Termination,
        detect_deadlock: bool,
    ) -> Self {
        Self {
            ctx,
            cluster,
            algorithm,
            termination,
            detect_deadlock,
            decisions: 0,
        }
    }

    /// Applies placements until the algorithm has nothing more to place at the
    /// current instant. Returns the number of started instances.
    pub fn make_decisions(&mut self) -> SimulationResult<usize> {
        let mut placed = 0;
        loop {
            let decision = {
                let cluster = self.cluster.borrow();
                self.algorithm.decide(&cluster, self.ctx.time())
            };
            let Some(placement) = decision else {
                break;
            };
            schedule_instance(&self.ctx, &self.cluster, placement)?;
            placed += 1;
        }

        self.decisions += placed as u64;
        if placed > 0 {
            log_debug!(
                self.ctx,
                "{} placed {} instances ({} total)",
                self.algorithm.name(),
                placed,
                self.decisions
            );
        }
        Ok(placed)
    }

    /// Nothing was placed, nothing runs and nothing will arrive: the remaining
    /// work can never make progress.
    fn check_deadlock(&self, placed: usize) -> SimulationResult<()> {
        if !self.detect_deadlock || placed > 0 || !self.termination.broker_destroyed() {
            return Ok(());
        }
        let cluster = self.cluster.borrow();
        if cluster.running_task_instances().next().is_some() {
            return Ok(());
        }
        let stuck = cluster
            .ready_tasks_with_waiting_instances()
            .next()
            .or_else(|| cluster.unfinished_tasks().next());
        match stuck {
            Some(task) => Err(SimulationError::Unschedulable {
                task_id: task.id().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub async fn run(mut self) -> SimulationResult<()> {
        while !self.termination.is_finished() {
            let placed = self.make_decisions()?;
            self.check_deadlock(placed)?;
            self.ctx.sleep(TICK).await?;
        }
        log_debug!(self.ctx, "scheduler stopped after {} placements", self.decisions);
        Ok(())
    }
}
