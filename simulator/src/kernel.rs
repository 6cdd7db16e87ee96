//! Discrete-event kernel: a virtual clock plus a single-threaded executor for
//! cooperative simulation processes.
//!
//! A process is any `'static` future resolving to [`SimulationResult<()>`]. The
//! only way for a process to suspend is [`SimulationContext::sleep`], and the
//! only way for it to be resumed is the kernel's timer queue. Timers due at the
//! same instant fire in registration order, which makes every run reproducible.

use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BinaryHeap,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::task::noop_waker_ref;
use rustc_hash::FxHashMap;
use sugars::{rc, refcell};

use crate::error::{SimulationError, SimulationResult};
use crate::log_error;

pub type ProcessId = u64;

type Process = Pin<Box<dyn Future<Output = SimulationResult<()>>>>;

struct Timer {
    time: f64,
    seq: u64,
    process_id: ProcessId,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // BinaryHeap is a max-heap, the earliest (time, seq) must compare greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct ProcessEntry {
    name: Rc<str>,
    future: Process,
}

#[derive(Default)]
struct KernelState {
    time: f64,
    next_seq: u64,
    next_process_id: ProcessId,
    timers: BinaryHeap<Timer>,

    current_process: Option<(ProcessId, Rc<str>)>,
    fired_timer: Option<u64>,
    spawned: Vec<(ProcessId, ProcessEntry)>,

    event_count: u64,
}

impl KernelState {
    fn register_timer(&mut self, process_id: ProcessId, time: f64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            time,
            seq,
            process_id,
        });
        seq
    }

    fn spawn(&mut self, name: Rc<str>, future: Process) -> ProcessId {
        let process_id = self.next_process_id;
        self.next_process_id += 1;
        self.register_timer(process_id, self.time);
        self.spawned.push((process_id, ProcessEntry { name, future }));
        process_id
    }
}

/// Owner of the virtual clock and of all registered processes.
pub struct Simulation {
    state: Rc<RefCell<KernelState>>,
    processes: FxHashMap<ProcessId, ProcessEntry>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            state: rc!(refcell!(KernelState::default())),
            processes: FxHashMap::default(),
        }
    }

    pub fn create_context<S: AsRef<str>>(&self, name: S) -> SimulationContext {
        SimulationContext {
            name: Rc::from(name.as_ref()),
            state: self.state.clone(),
        }
    }

    pub fn time(&self) -> f64 {
        self.state.borrow().time
    }

    /// Number of process resumptions performed so far.
    pub fn event_count(&self) -> u64 {
        self.state.borrow().event_count
    }

    /// Number of processes that have not terminated yet.
    pub fn active_processes(&self) -> usize {
        self.processes.len() + self.state.borrow().spawned.len()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.state.borrow().timers.is_empty()
    }

    /// Time of the next scheduled resumption, if any.
    pub fn next_event_time(&self) -> Option<f64> {
        self.state.borrow().timers.peek().map(|t| t.time)
    }

    /// Resumes the next due process. Returns `Ok(false)` once no timers remain.
    pub fn step(&mut self) -> SimulationResult<bool> {
        self.adopt_spawned();

        let timer = match self.state.borrow_mut().timers.pop() {
            Some(timer) => timer,
            None => return Ok(false),
        };

        let Some(mut entry) = self.processes.remove(&timer.process_id) else {
            return Ok(true);
        };

        {
            let mut state = self.state.borrow_mut();
            debug_assert!(timer.time >= state.time);
            state.time = timer.time;
            state.current_process = Some((timer.process_id, entry.name.clone()));
            state.fired_timer = Some(timer.seq);
            state.event_count += 1;
        }

        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = entry.future.as_mut().poll(&mut cx);

        {
            let mut state = self.state.borrow_mut();
            state.current_process = None;
            state.fired_timer = None;
        }

        match poll {
            Poll::Pending => {
                self.processes.insert(timer.process_id, entry);
            }
            Poll::Ready(Ok(())) => {}
            Poll::Ready(Err(err)) => {
                let ctx = self.create_context(&entry.name);
                log_error!(ctx, "process failed: {}", err);
                self.adopt_spawned();
                return Err(err);
            }
        }

        self.adopt_spawned();
        Ok(true)
    }

    /// Resumes every process due at the next scheduled instant, including the
    /// ones that register zero-delay waits while that instant is processed.
    pub fn step_instant(&mut self) -> SimulationResult<bool> {
        let Some(instant) = self.next_event_time() else {
            return Ok(false);
        };
        while self.next_event_time() == Some(instant) {
            self.step()?;
        }
        Ok(true)
    }

    pub fn step_until_no_events(&mut self) -> SimulationResult<()> {
        while self.step()? {}
        Ok(())
    }

    /// Advances the clock instant by instant until `predicate` holds or no
    /// process remains runnable.
    pub fn run_until<F: FnMut() -> bool>(&mut self, mut predicate: F) -> SimulationResult<()> {
        while !predicate() {
            if !self.step_instant()? {
                break;
            }
        }
        Ok(())
    }

    pub fn spawn<F>(&mut self, name: &str, future: F) -> ProcessId
    where
        F: Future<Output = SimulationResult<()>> + 'static,
    {
        let id = self
            .state
            .borrow_mut()
            .spawn(Rc::from(name), Box::pin(future));
        self.adopt_spawned();
        id
    }

    fn adopt_spawned(&mut self) {
        let spawned = std::mem::take(&mut self.state.borrow_mut().spawned);
        self.processes.extend(spawned);
    }
}

/// Handle through which components read the clock, sleep and spawn processes.
#[derive(Clone)]
pub struct SimulationContext {
    name: Rc<str>,
    state: Rc<RefCell<KernelState>>,
}

impl SimulationContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f64 {
        self.state.borrow().time
    }

    /// Suspends the calling process until the clock advances by `delay`.
    pub fn sleep(&self, delay: f64) -> SleepFuture {
        SleepFuture {
            state: self.state.clone(),
            wake_at: WakeAt::After(delay),
            timer: None,
        }
    }

    /// Suspends the calling process until the clock reaches `time`. Unlike
    /// `sleep(time - now)` the wake-up instant is exactly `time`.
    pub fn sleep_until(&self, time: f64) -> SleepFuture {
        SleepFuture {
            state: self.state.clone(),
            wake_at: WakeAt::Instant(time),
            timer: None,
        }
    }

    /// Registers a new process named after this context. It starts at the
    /// current instant, after every wait already registered for it.
    pub fn spawn<F>(&self, future: F) -> ProcessId
    where
        F: Future<Output = SimulationResult<()>> + 'static,
    {
        self.state
            .borrow_mut()
            .spawn(self.name.clone(), Box::pin(future))
    }
}

#[derive(Clone, Copy)]
enum WakeAt {
    After(f64),
    Instant(f64),
}

pub struct SleepFuture {
    state: Rc<RefCell<KernelState>>,
    wake_at: WakeAt,
    timer: Option<u64>,
}

impl Future for SleepFuture {
    type Output = SimulationResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.timer {
            Some(seq) => {
                if self.state.borrow().fired_timer == Some(seq) {
                    Poll::Ready(Ok(()))
                } else {
                    Poll::Pending
                }
            }
            None => {
                let wake_at = self.wake_at;
                let mut state = self.state.borrow_mut();
                let Some((process_id, name)) = state.current_process.clone() else {
                    return Poll::Ready(Err(SimulationError::NoActiveProcess));
                };
                let (delay, time) = match wake_at {
                    WakeAt::After(delay) => (delay, state.time + delay),
                    WakeAt::Instant(time) => (time - state.time, time),
                };
                if delay.is_nan() || delay < 0. {
                    return Poll::Ready(Err(SimulationError::NegativeDelay {
                        process: name.to_string(),
                        delay,
                    }));
                }
                let seq = state.register_timer(process_id, time);
                drop(state);
                self.timer = Some(seq);
                Poll::Pending
            }
        }
    }
}
