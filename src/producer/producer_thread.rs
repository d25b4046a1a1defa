use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use super::gate::PauseGate;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProducerState {
    Loading = 0,
    Paused = 1,
    Running = 2,
    Stopped = 3,
}

impl ProducerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ProducerState::Loading,
            1 => ProducerState::Paused,
            2 => ProducerState::Running,
            _ => ProducerState::Stopped,
        }
    }
}

/// Outcome of one producer iteration.
#[derive(Debug)]
pub enum Step<T> {
    Deliver(T),
    /// Nothing to produce this time round.
    Skip,
    /// Pause the producer, then deliver the optional output without dropping it.
    Pause(Option<T>),
}

/// The producer-specific half of a [`ProducerThread`].
pub trait Workload: Send + 'static {
    type Output: Send + 'static;

    /// Runs once on the producer thread before the first iteration.
    fn load(&mut self) -> Result<(), AppError>;

    /// Fetches the next input and runs inference on it. Errors for which
    /// [`AppError::is_fatal`] is false only skip the iteration.
    fn step(&mut self, started_at: DateTime<Utc>) -> Result<Step<Self::Output>, AppError>;

    fn clean_up(&mut self) {}
}

/// Everything a producer hands to its consumer.
#[derive(Debug)]
pub enum ProducerEvent<T> {
    /// Loading finished; the producer is parked on its pause gate.
    Ready,
    Output(T),
    /// The producer hit a fatal error and exited.
    Failed(String),
}

/// A rate-limited, pausable loop on its own OS thread.
///
/// Outputs are pushed over a bounded channel and dropped when the consumer
/// falls behind; `Ready`, `Failed` and outputs that pause the producer always
/// get through.
pub struct ProducerThread<W: Workload> {
    name: String,
    target_fps: u32,
    gate: Arc<PauseGate>,
    state: Arc<AtomicU8>,
    workload: Arc<Mutex<W>>,
    failure: Arc<Mutex<Option<String>>>,
    event_tx: Option<Sender<ProducerEvent<W::Output>>>,
    handle: Option<JoinHandle<()>>,
}

impl<W: Workload> ProducerThread<W> {
    pub fn new(
        name: impl Into<String>,
        target_fps: u32,
        workload: W,
        event_tx: Sender<ProducerEvent<W::Output>>,
    ) -> Self {
        Self {
            name: name.into(),
            target_fps: target_fps.max(1),
            gate: Arc::new(PauseGate::new()),
            state: Arc::new(AtomicU8::new(ProducerState::Loading as u8)),
            workload: Arc::new(Mutex::new(workload)),
            failure: Arc::new(Mutex::new(None)),
            event_tx: Some(event_tx),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns the thread, which loads the model and then parks paused.
    pub fn start(&mut self) -> Result<(), AppError> {
        let Some(event_tx) = self.event_tx.take() else {
            return Err(AppError::InvalidState(format!(
                "producer {} cannot be restarted",
                self.name
            )));
        };

        let runner = ProducerLoop {
            name: self.name.clone(),
            frame_budget: Duration::from_secs_f64(1.0 / self.target_fps as f64),
            gate: self.gate.clone(),
            state: self.state.clone(),
            workload: self.workload.clone(),
            failure: self.failure.clone(),
            event_tx,
        };
        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || runner.run())?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn pause(&self) {
        self.gate.pause();
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Runs a single iteration without resuming continuous production.
    pub fn step_once(&self) {
        self.gate.step_once();
    }

    /// Safe to call from any state, including while paused.
    pub fn stop(&self) {
        self.gate.stop();
    }

    pub fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_paused(&self) -> bool {
        !self.gate.is_resumed()
    }

    /// Reason for the fatal error that ended this producer, if any.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Runs `f` against the workload between iterations.
    pub fn with_workload<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let mut workload = self.workload.lock();
        f(&mut workload)
    }

    /// Like [`Self::with_workload`], but only while the producer is paused.
    pub fn with_paused_workload<R>(&self, f: impl FnOnce(&mut W) -> R) -> Result<R, AppError> {
        if !self.is_paused() {
            return Err(AppError::InvalidState(format!(
                "producer {} must be paused",
                self.name
            )));
        }
        Ok(self.with_workload(f))
    }

    /// Waits for the thread to exit. Call [`Self::stop`] first.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Producer {} panicked", self.name);
            }
        }
    }
}

impl<W: Workload> Drop for ProducerThread<W> {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

struct ProducerLoop<W: Workload> {
    name: String,
    frame_budget: Duration,
    gate: Arc<PauseGate>,
    state: Arc<AtomicU8>,
    workload: Arc<Mutex<W>>,
    failure: Arc<Mutex<Option<String>>>,
    event_tx: Sender<ProducerEvent<W::Output>>,
}

impl<W: Workload> ProducerLoop<W> {
    fn set_state(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Waits for room instead of dropping; fails only once the consumer is gone.
    fn send_lifecycle(&self, event: ProducerEvent<W::Output>) {
        if self.event_tx.blocking_send(event).is_err() {
            debug!("Producer {} has no consumer left", self.name);
        }
    }

    fn fail(&self, reason: String) {
        error!("Producer {} failed: {}", self.name, reason);
        *self.failure.lock() = Some(reason.clone());
        self.send_lifecycle(ProducerEvent::Failed(reason));
    }

    fn deliver(&self, output: W::Output) {
        match self.event_tx.try_send(ProducerEvent::Output(output)) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Producer {} dropping output: channel full", self.name);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Producer {} output channel closed", self.name);
            }
        }
    }

    fn run(self) {
        info!("Loading {}...", self.name);
        let loaded = self.workload.lock().load();
        if let Err(e) = loaded {
            self.fail(e.to_string());
            self.set_state(ProducerState::Stopped);
            return;
        }
        info!("{} loaded", self.name);
        self.set_state(ProducerState::Paused);
        self.send_lifecycle(ProducerEvent::Ready);

        loop {
            if !self.gate.is_resumed() {
                self.set_state(ProducerState::Paused);
            }
            if !self.gate.wait() {
                break;
            }
            self.set_state(ProducerState::Running);

            let started = Instant::now();
            let step = self.workload.lock().step(Utc::now());
            match step {
                Ok(Step::Deliver(output)) => self.deliver(output),
                Ok(Step::Skip) => {}
                Ok(Step::Pause(output)) => {
                    self.gate.pause();
                    if let Some(output) = output {
                        self.send_lifecycle(ProducerEvent::Output(output));
                    }
                }
                Err(e) if e.is_fatal() => {
                    self.fail(e.to_string());
                    break;
                }
                Err(e) => {
                    warn!("Producer {} skipped an iteration: {}", self.name, e);
                }
            }

            let remaining = self.frame_budget.saturating_sub(started.elapsed());
            if !remaining.is_zero() && !self.gate.throttle(remaining) {
                break;
            }
        }

        self.workload.lock().clean_up();
        self.set_state(ProducerState::Stopped);
        info!("{} finished execution", self.name);
    }
}
