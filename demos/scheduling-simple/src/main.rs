mod round_robin;

use std::io::Write;

use env_logger::Builder;

use clustersim::{
    config::sim_config::SimulationConfig, metrics, simulation::ClusterSchedulingSimulation,
    Simulation, SimulationResult,
};

use round_robin::RoundRobin;

fn main() -> SimulationResult<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let sim = Simulation::new();

    let config = SimulationConfig::from_file("configs/config.yaml")?;
    // let config = SimulationConfig::from_file("configs/config_with_trace.yaml")?;

    let mut cluster_sim = ClusterSchedulingSimulation::new(sim, config)?;

    cluster_sim.run_with_algorithm(RoundRobin::new())?;

    let cluster = cluster_sim.cluster();
    let cluster = cluster.borrow();
    println!("Finished at: {}", cluster_sim.time());
    println!("Average completion: {:?}", metrics::average_completion(&cluster));
    println!("Average slowdown: {:?}", metrics::average_slowdown(&cluster));
    Ok(())
}
