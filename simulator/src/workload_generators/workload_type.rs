//! Workload source types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    config::sim_config::ClusterWorkloadConfig,
    error::{SimulationError, SimulationResult},
};

use super::{
    csv_trace::CsvTraceReader, generator::WorkloadGenerator, native::NativeWorkloadGenerator,
    random::RandomWorkloadGenerator,
};

/// Holds supported workload source types.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub enum WorkloadType {
    Native,
    Csv,
    Random,
}

impl FromStr for WorkloadType {
    type Err = SimulationError;

    fn from_str(input: &str) -> Result<WorkloadType, Self::Err> {
        match input.to_lowercase().as_str() {
            "native" => Ok(WorkloadType::Native),
            "csv" => Ok(WorkloadType::Csv),
            "random" => Ok(WorkloadType::Random),
            _ => Err(SimulationError::UnknownWorkload(input.to_string())),
        }
    }
}

pub fn workload_resolver(
    config: &ClusterWorkloadConfig,
) -> SimulationResult<Box<dyn WorkloadGenerator>> {
    let workload_type = WorkloadType::from_str(&config.r#type)?;
    let options = config.options.as_ref().ok_or_else(|| {
        SimulationError::InvalidWorkloadOptions(format!(
            "{} workload options are required",
            config.r#type
        ))
    })?;

    Ok(match workload_type {
        WorkloadType::Native => Box::new(NativeWorkloadGenerator::from_options(options)?),
        WorkloadType::Csv => Box::new(CsvTraceReader::from_options(options)?),
        WorkloadType::Random => Box::new(RandomWorkloadGenerator::from_options(options)?),
    })
}
