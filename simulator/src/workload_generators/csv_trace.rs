use std::io::Read;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    config::job_config::{JobConfig, TaskConfig},
    error::{SimulationError, SimulationResult},
};

use super::generator::WorkloadGenerator;

#[derive(Deserialize)]
pub struct Options {
    path: String,
    offset: Option<usize>,
    limit: Option<usize>,
}

/// One row of a batch trace: a task of a job.
#[derive(Deserialize, Debug)]
struct TraceRecord {
    job_id: u64,
    task_id: u64,
    instances_num: u32,
    cpu: f64,
    memory: f64,
    disk: f64,
    duration: f64,
    submit_time: f64,
    // Parent task ids joined with '-', e.g. "1-4".
    #[serde(default)]
    parent_indices: Option<String>,
}

/// Reads a task-per-row CSV trace and groups the rows into jobs.
///
/// Jobs are ordered by submit time. With `offset`/`limit` only a window of the
/// ordered jobs is kept, and submit times are shifted so that the first job of
/// the window arrives at zero.
pub struct CsvTraceReader {
    jobs: Vec<JobConfig>,
}

impl CsvTraceReader {
    pub fn from_options(options: &serde_yaml::Value) -> SimulationResult<Self> {
        let options: Options = serde_yaml::from_value(options.clone())?;
        let file = std::fs::File::open(&options.path)?;
        Self::from_reader(file, options.offset.unwrap_or(0), options.limit)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        offset: usize,
        limit: Option<usize>,
    ) -> SimulationResult<Self> {
        let mut jobs = read_jobs(reader)?;
        jobs.sort_by(|a, b| a.submit_time.total_cmp(&b.submit_time));

        let mut jobs = jobs
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect::<Vec<_>>();
        if let Some(base) = jobs.first().map(|job| job.submit_time) {
            for job in jobs.iter_mut() {
                job.submit_time -= base;
            }
        }
        Ok(Self { jobs })
    }
}

fn read_jobs<R: Read>(reader: R) -> SimulationResult<Vec<JobConfig>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut jobs: Vec<JobConfig> = Vec::new();
    let mut positions: FxHashMap<u64, usize> = FxHashMap::default();
    for record in reader.deserialize() {
        let record: TraceRecord = record?;
        let mut task = TaskConfig {
            task_index: record.task_id,
            instances_number: record.instances_num,
            cpu: record.cpu,
            memory: record.memory,
            disk: record.disk,
            duration: record.duration,
            parent_indices: None,
        };
        if let Some(parents) = record.parent_indices.as_deref() {
            let parents = parse_parents(record.job_id, parents)?;
            if !parents.is_empty() {
                task.parent_indices = Some(parents);
            }
        }

        let position = *positions.entry(record.job_id).or_insert_with(|| {
            jobs.push(JobConfig::new(record.job_id, record.submit_time, Vec::new()));
            jobs.len() - 1
        });
        let job = &mut jobs[position];
        // The last row of a job defines its submit time.
        job.submit_time = record.submit_time;
        job.task_configs.push(task);
    }
    Ok(jobs)
}

fn parse_parents(job_id: u64, value: &str) -> SimulationResult<Vec<u64>> {
    value
        .split('-')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| SimulationError::InvalidTrace {
                    job_id,
                    reason: format!("bad parent index `{}`", part),
                })
        })
        .collect()
}

impl WorkloadGenerator for CsvTraceReader {
    fn get_jobs(&self) -> SimulationResult<Vec<JobConfig>> {
        Ok(self.jobs.clone())
    }
}
