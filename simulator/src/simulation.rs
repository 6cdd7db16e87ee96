use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Instant,
};

use sugars::{boxed, rc, refcell};

use crate::{
    broker::Broker,
    cluster::Cluster,
    config::{
        job_config::{JobConfig, MachineConfig},
        sim_config::{MonitoringConfig, SimulationConfig},
    },
    error::{SimulationError, SimulationResult},
    kernel::Simulation,
    log_info,
    monitoring::{EventLog, MonitoringPoint, Monitoring},
    scheduler::{Algorithm, Scheduler},
    workload_generators::workload_type::workload_resolver,
};

/// Global termination probe: the broker has replayed every job and the
/// cluster has no unfinished job left.
#[derive(Clone)]
pub struct Termination {
    broker_destroyed: Rc<Cell<bool>>,
    cluster: Rc<RefCell<Cluster>>,
}

impl Termination {
    pub fn new(broker_destroyed: Rc<Cell<bool>>, cluster: Rc<RefCell<Cluster>>) -> Self {
        Self {
            broker_destroyed,
            cluster,
        }
    }

    pub fn broker_destroyed(&self) -> bool {
        self.broker_destroyed.get()
    }

    pub fn is_finished(&self) -> bool {
        self.broker_destroyed() && !self.cluster.borrow().has_unfinished_jobs()
    }
}

pub struct ClusterSchedulingSimulation {
    sim: Simulation,

    cluster: Rc<RefCell<Cluster>>,
    job_configs: Vec<JobConfig>,
    termination: Termination,

    monitoring: Option<MonitoringConfig>,
    events: EventLog,
    detect_deadlock: bool,

    algorithm: Option<Box<dyn Algorithm>>,
    started: bool,
}

impl ClusterSchedulingSimulation {
    /// Builds the cluster from `config` and gathers the jobs of every
    /// configured workload, ordered by submit time.
    pub fn new(sim: Simulation, config: SimulationConfig) -> SimulationResult<Self> {
        let machines = config.machine_configs();

        let mut jobs = config.jobs;
        for workload in config.workload.iter().flatten() {
            let generator = workload_resolver(workload)?;
            jobs.extend(generator.get_jobs()?);
        }
        jobs.sort_by(|a, b| a.submit_time.total_cmp(&b.submit_time));

        let mut simulation = Self::from_configs(sim, machines, jobs)?;
        simulation.monitoring = config.monitoring;
        simulation.detect_deadlock = config.scheduler.detect_deadlock;
        Ok(simulation)
    }

    /// Builds a simulation from already prepared records. Jobs are replayed in
    /// the given order.
    pub fn from_configs(
        sim: Simulation,
        machines: Vec<MachineConfig>,
        jobs: Vec<JobConfig>,
    ) -> SimulationResult<Self> {
        let cluster = rc!(refcell!(Cluster::with_machines(machines)?));
        let termination = Termination::new(rc!(Cell::new(false)), cluster.clone());

        Ok(Self {
            sim,
            cluster,
            job_configs: jobs,
            termination,
            monitoring: None,
            events: rc!(refcell!(Vec::new())),
            detect_deadlock: false,
            algorithm: None,
            started: false,
        })
    }

    /// Enables the monitor process.
    pub fn with_monitoring(mut self, config: MonitoringConfig) -> Self {
        self.monitoring = Some(config);
        self
    }

    /// Makes the scheduler fail with `Unschedulable` when nothing runs,
    /// nothing is left to arrive and the algorithm places nothing.
    pub fn with_deadlock_detection(mut self, enabled: bool) -> Self {
        self.detect_deadlock = enabled;
        self
    }

    pub fn set_algorithm<A: Algorithm + 'static>(&mut self, algorithm: A) {
        self.algorithm = Some(boxed!(algorithm));
    }

    pub fn cluster(&self) -> Rc<RefCell<Cluster>> {
        self.cluster.clone()
    }

    /// Samples recorded by the monitor so far.
    pub fn event_log(&self) -> Vec<MonitoringPoint> {
        self.events.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_finished()
    }

    pub fn time(&self) -> f64 {
        self.sim.time()
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    /// Starts the monitor, the broker and the scheduler, in that order, and
    /// runs until every process has terminated.
    pub fn run(&mut self) -> SimulationResult<()> {
        if self.started {
            return Err(SimulationError::AlreadyStarted);
        }
        let algorithm = self
            .algorithm
            .take()
            .ok_or_else(|| SimulationError::UnknownEntity {
                kind: "algorithm",
                key: "none configured".to_string(),
            })?;
        self.started = true;

        if let Some(config) = self.monitoring.clone() {
            let monitoring = Monitoring::new(
                self.sim.create_context("monitor"),
                self.cluster.clone(),
                self.termination.clone(),
                self.events.clone(),
                config,
            );
            self.sim.spawn("monitor", monitoring.run());
        }

        let broker = Broker::new(
            self.sim.create_context("broker"),
            self.cluster.clone(),
            std::mem::take(&mut self.job_configs),
            self.termination.broker_destroyed.clone(),
        );
        self.sim.spawn("broker", broker.run());

        let algorithm_name = algorithm.name().to_string();
        let scheduler = Scheduler::new(
            self.sim.create_context("scheduler"),
            self.cluster.clone(),
            algorithm,
            self.termination.clone(),
            self.detect_deadlock,
        );
        self.sim.spawn("scheduler", scheduler.run());

        let ctx = self.sim.create_context("simulation");
        log_info!(ctx, "simulation started with {} algorithm", algorithm_name);
        let t = Instant::now();

        self.sim.step_until_no_events()?;

        let elapsed = t.elapsed().as_secs_f64();
        let cluster = self.cluster.borrow();
        log_info!(
            ctx,
            "simulation finished in {:.3}s of wall time, {} jobs, {} instances, {} events",
            elapsed,
            cluster.jobs().len(),
            cluster.started_instances(),
            self.sim.event_count()
        );
        Ok(())
    }

    pub fn run_with_algorithm<A: Algorithm + 'static>(
        &mut self,
        algorithm: A,
    ) -> SimulationResult<()> {
        self.set_algorithm(algorithm);
        self.run()
    }
}
