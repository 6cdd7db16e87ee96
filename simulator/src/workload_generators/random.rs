use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    config::job_config::{JobConfig, TaskConfig},
    error::{SimulationError, SimulationResult},
    resources::Resources,
};

use super::generator::WorkloadGenerator;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Options {
    pub job_count: u32,
    pub tasks_min: u32,
    pub tasks_max: u32,
    pub instances_min: u32,
    pub instances_max: u32,
    pub cpu_min: f64,
    pub cpu_max: f64,
    pub memory_min: f64,
    pub memory_max: f64,
    #[serde(default)]
    pub disk: f64,
    pub delay_min: f64,
    pub delay_max: f64,
    pub duration_mean: f64,
    pub duration_dev: f64,
    pub start_time: Option<f64>,
    /// Makes every task of a job depend on the previous one.
    #[serde(default)]
    pub chain: bool,
    pub seed: Option<u64>,
}

/// Synthetic workload: job inter-arrival delays and requirements are drawn
/// uniformly from the configured ranges, durations from a normal
/// distribution clamped to at least one tick.
pub struct RandomWorkloadGenerator {
    options: Options,
}

impl RandomWorkloadGenerator {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn from_options(options: &serde_yaml::Value) -> SimulationResult<Self> {
        Ok(Self::new(serde_yaml::from_value(options.clone())?))
    }
}

impl WorkloadGenerator for RandomWorkloadGenerator {
    fn get_jobs(&self) -> SimulationResult<Vec<JobConfig>> {
        let options = &self.options;
        let invalid = SimulationError::InvalidWorkloadOptions;
        if options.tasks_min > options.tasks_max
            || options.instances_min > options.instances_max
            || options.cpu_min > options.cpu_max
            || options.memory_min > options.memory_max
            || options.delay_min > options.delay_max
        {
            return Err(invalid("random workload range has min above max".to_string()));
        }
        let durations = Normal::new(options.duration_mean, options.duration_dev)
            .map_err(|e| invalid(format!("bad duration distribution: {}", e)))?;

        let mut rand = Pcg64::seed_from_u64(options.seed.unwrap_or(123));
        let mut time = options.start_time.unwrap_or(0.);
        let mut jobs = Vec::with_capacity(options.job_count as usize);
        for id in 0..options.job_count as u64 {
            let tasks_count = rand.gen_range(options.tasks_min..=options.tasks_max);
            let tasks = (1..=tasks_count as u64)
                .map(|task_index| {
                    let requirement = Resources::new(
                        rand.gen_range(options.cpu_min..=options.cpu_max),
                        rand.gen_range(options.memory_min..=options.memory_max),
                        options.disk,
                    );
                    let duration: f64 = durations.sample(&mut rand);
                    let task = TaskConfig::new(
                        task_index,
                        rand.gen_range(options.instances_min..=options.instances_max),
                        requirement,
                        duration.max(1.),
                    );
                    if options.chain && task_index > 1 {
                        task.with_parents(vec![task_index - 1])
                    } else {
                        task
                    }
                })
                .collect();

            jobs.push(JobConfig::new(id, time, tasks));
            time += rand.gen_range(options.delay_min..=options.delay_max);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(seed: u64) -> Options {
        Options {
            job_count: 20,
            tasks_min: 1,
            tasks_max: 4,
            instances_min: 1,
            instances_max: 8,
            cpu_min: 0.5,
            cpu_max: 2.,
            memory_min: 0.01,
            memory_max: 0.1,
            disk: 0.,
            delay_min: 0.,
            delay_max: 10.,
            duration_mean: 20.,
            duration_dev: 5.,
            start_time: None,
            chain: true,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_random_workload_is_reproducible() {
        let first = RandomWorkloadGenerator::new(options(7)).get_jobs().unwrap();
        let second = RandomWorkloadGenerator::new(options(7)).get_jobs().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
    }

    #[test]
    fn test_random_workload_respects_ranges() {
        let jobs = RandomWorkloadGenerator::new(options(1)).get_jobs().unwrap();
        for window in jobs.windows(2) {
            assert!(window[0].submit_time <= window[1].submit_time);
        }
        for job in &jobs {
            for task in &job.task_configs {
                assert!((0.5..=2.).contains(&task.cpu));
                assert!((1..=8).contains(&task.instances_number));
                assert!(task.duration >= 1.);
                match task.task_index {
                    1 => assert_eq!(task.parent_indices, None),
                    index => assert_eq!(task.parent_indices, Some(vec![index - 1])),
                }
            }
        }
    }

    #[test]
    fn test_invalid_ranges() {
        let mut options = options(1);
        options.cpu_min = 3.;
        assert!(RandomWorkloadGenerator::new(options).get_jobs().is_err());
    }
}
