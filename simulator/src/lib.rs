#![doc = include_str!("../readme.md")]

pub mod algorithms;
pub mod broker;
pub mod cluster;
pub mod config;
pub mod error;
pub mod job;
pub mod kernel;
pub mod log;
pub mod machine;
pub mod metrics;
pub mod monitoring;
pub mod resources;
pub mod scheduler;
pub mod simulation;
pub mod workload_generators;

pub use cluster::{Cluster, ClusterState};
pub use error::{SimulationError, SimulationResult};
pub use kernel::{Simulation, SimulationContext};
pub use resources::Resources;
pub use scheduler::{Algorithm, Placement};
pub use simulation::ClusterSchedulingSimulation;
pub use workload_generators::generator::WorkloadGenerator;
