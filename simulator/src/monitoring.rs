use std::{
    cell::RefCell,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    rc::Rc,
};

use serde::Serialize;

use crate::{
    cluster::{Cluster, ClusterState},
    config::sim_config::MonitoringConfig,
    error::SimulationResult,
    kernel::SimulationContext,
    log_info,
    scheduler::TICK,
    simulation::Termination,
};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MonitoringPoint {
    pub timestamp: f64,
    pub cluster_state: ClusterState,
}

/// Ordered samples shared between the monitor process and its owner.
pub type EventLog = Rc<RefCell<Vec<MonitoringPoint>>>;

pub struct Monitoring {
    ctx: SimulationContext,
    cluster: Rc<RefCell<Cluster>>,
    termination: Termination,
    events: EventLog,
    event_file: Option<String>,
}

impl Monitoring {
    pub fn new(
        ctx: SimulationContext,
        cluster: Rc<RefCell<Cluster>>,
        termination: Termination,
        events: EventLog,
        config: MonitoringConfig,
    ) -> Self {
        Self {
            ctx,
            cluster,
            termination,
            events,
            event_file: config.event_file,
        }
    }

    fn sample(&self) {
        let point = MonitoringPoint {
            timestamp: self.ctx.time(),
            cluster_state: self.cluster.borrow().state(),
        };
        self.events.borrow_mut().push(point);
    }

    /// Samples once per tick until the run is finished, then once more at the
    /// finish instant, and persists the log if an event file is configured.
    pub async fn run(self) -> SimulationResult<()> {
        while !self.termination.is_finished() {
            self.sample();
            self.ctx.sleep(TICK).await?;
        }
        self.sample();

        if let Some(path) = &self.event_file {
            let events = self.events.borrow();
            write_event_file(&events, path)?;
            log_info!(self.ctx, "{} samples written to {}", events.len(), path);
        }
        Ok(())
    }
}

/// Serializes `events` as a pretty-printed JSON array with 4-space indents.
pub fn dump_events<W: Write>(events: &[MonitoringPoint], writer: W) -> SimulationResult<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    events.serialize(&mut serializer)?;
    Ok(())
}

pub fn write_event_file<P: AsRef<Path>>(
    events: &[MonitoringPoint],
    path: P,
) -> SimulationResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    dump_events(events, &mut writer)?;
    writer.flush()?;
    Ok(())
}
