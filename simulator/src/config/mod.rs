pub mod job_config;
pub mod sim_config;
