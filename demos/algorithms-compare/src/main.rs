use std::{io::Write, time::Instant};

use env_logger::Builder;
use log::info;

use clustersim::{
    algorithms::{Drf, FirstFit, RandomAlgorithm, Tetris},
    config::sim_config::SimulationConfig,
    metrics, Algorithm, ClusterSchedulingSimulation, Simulation, SimulationResult,
};

fn run<A: Algorithm + 'static>(config: &SimulationConfig, algorithm: A) -> SimulationResult<()> {
    let name = algorithm.name().to_string();
    let mut config = config.clone();
    // Every run would overwrite the same file.
    config.monitoring = None;

    let t = Instant::now();
    let mut cluster_sim = ClusterSchedulingSimulation::new(Simulation::new(), config)?;
    cluster_sim.run_with_algorithm(algorithm)?;

    let cluster = cluster_sim.cluster();
    let cluster = cluster.borrow();
    println!(
        "{:<12} makespan: {:>10.1} completion: {:>10.2} slowdown: {:>8.3} wall: {:.3}s",
        name,
        metrics::makespan(&cluster).unwrap_or(0.),
        metrics::average_completion(&cluster).unwrap_or(f64::NAN),
        metrics::average_slowdown(&cluster).unwrap_or(f64::NAN),
        t.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> SimulationResult<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "configs/config.yaml".to_string());
    info!("loading {}", path);
    let config = SimulationConfig::from_file(&path)?;

    run(&config, FirstFit)?;
    run(&config, RandomAlgorithm::new(42))?;
    run(&config, Tetris)?;
    run(&config, Drf)?;
    Ok(())
}
