use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    cluster::Cluster,
    config::job_config::JobConfig,
    error::{SimulationError, SimulationResult},
    kernel::SimulationContext,
    log_info,
};

/// Replays job configurations into the cluster at their submit times.
pub struct Broker {
    ctx: SimulationContext,
    cluster: Rc<RefCell<Cluster>>,
    job_configs: Vec<JobConfig>,
    destroyed: Rc<Cell<bool>>,
}

impl Broker {
    /// `job_configs` must be ordered by non-decreasing submit time.
    pub fn new(
        ctx: SimulationContext,
        cluster: Rc<RefCell<Cluster>>,
        job_configs: Vec<JobConfig>,
        destroyed: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            ctx,
            cluster,
            job_configs,
            destroyed,
        }
    }

    pub async fn run(self) -> SimulationResult<()> {
        let total = self.job_configs.len();
        for config in self.job_configs {
            let now = self.ctx.time();
            if config.submit_time < now || config.submit_time.is_nan() {
                return Err(SimulationError::SubmitTimeInPast {
                    job_id: config.id,
                    submit_time: config.submit_time,
                    now,
                });
            }
            if config.submit_time > now {
                self.ctx.sleep_until(config.submit_time).await?;
            }

            let mut cluster = self.cluster.borrow_mut();
            let job = cluster.add_job(config)?;
            log_info!(
                self.ctx,
                "job {} arrived with {} tasks",
                job.id(),
                job.tasks().len()
            );
        }

        self.destroyed.set(true);
        log_info!(self.ctx, "all {} jobs submitted", total);
        Ok(())
    }
}
