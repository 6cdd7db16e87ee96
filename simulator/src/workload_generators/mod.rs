pub mod csv_trace;
pub mod generator;
pub mod native;
pub mod random;
pub mod workload_type;
