use serde::Deserialize;

use crate::{config::job_config::JobConfig, error::SimulationResult};

use super::generator::WorkloadGenerator;

#[derive(Deserialize)]
pub struct Options {
    path: String,
}

/// Jobs listed verbatim in a YAML file, in the same shape as the `jobs` section
/// of the simulation config.
pub struct NativeWorkloadGenerator {
    jobs: Vec<JobConfig>,
}

impl NativeWorkloadGenerator {
    pub fn from_options(options: &serde_yaml::Value) -> SimulationResult<Self> {
        let options: Options = serde_yaml::from_value(options.clone())?;
        Self::from_yaml(&std::fs::read_to_string(&options.path)?)
    }

    pub fn from_yaml(content: &str) -> SimulationResult<Self> {
        let mut jobs: Vec<JobConfig> = serde_yaml::from_str(content)?;
        jobs.sort_by(|a, b| a.submit_time.total_cmp(&b.submit_time));
        Ok(Self { jobs })
    }
}

impl WorkloadGenerator for NativeWorkloadGenerator {
    fn get_jobs(&self) -> SimulationResult<Vec<JobConfig>> {
        Ok(self.jobs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_jobs_are_sorted() {
        let generator = NativeWorkloadGenerator::from_yaml(
            r#"
- id: 2
  submit_time: 10
  tasks:
    - { task_index: 1, instances_number: 1, cpu: 1, memory: 0.1, duration: 3 }
- id: 1
  submit_time: 0
  task_configs:
    - { task_index: 1, instances_number: 2, cpu: 1, memory: 0.1, duration: 5 }
"#,
        )
        .unwrap();

        let jobs = generator.get_jobs().unwrap();
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(jobs[0].task_configs[0].instances_number, 2);
    }
}
