use crate::{config::job_config::JobConfig, error::SimulationResult};

pub trait WorkloadGenerator {
    /// Jobs produced by this source, ordered by submit time.
    fn get_jobs(&self) -> SimulationResult<Vec<JobConfig>>;
}
