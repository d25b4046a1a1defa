use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct GateState {
    running: bool,
    resumed: bool,
    pending_steps: usize,
}

/// Cooperative pause point shared between a producer loop and its owner.
///
/// Stopping always wins over pausing: `stop` wakes every waiter, whether it
/// is parked on the pause or sleeping out the frame budget.
#[derive(Debug)]
pub struct PauseGate {
    state: Mutex<GateState>,
    signal: Condvar,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    /// A new gate is running but paused.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                running: true,
                resumed: false,
                pending_steps: 0,
            }),
            signal: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        self.state.lock().resumed = false;
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.resumed = true;
        self.signal.notify_all();
    }

    /// Lets exactly one iteration through while paused.
    pub fn step_once(&self) {
        let mut state = self.state.lock();
        state.pending_steps += 1;
        self.signal.notify_all();
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.running = false;
        self.signal.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_resumed(&self) -> bool {
        self.state.lock().resumed
    }

    /// Blocks while paused. Returns `false` once the gate has been stopped.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if !state.running {
                return false;
            }
            if state.resumed {
                return true;
            }
            if state.pending_steps > 0 {
                state.pending_steps -= 1;
                return true;
            }
            self.signal.wait(&mut state);
        }
    }

    /// Sleeps for `budget` unless stopped first. Returns `false` if stopped.
    pub fn throttle(&self, budget: Duration) -> bool {
        let deadline = Instant::now() + budget;
        let mut state = self.state.lock();
        while state.running {
            if self.signal.wait_until(&mut state, deadline).timed_out() {
                return state.running;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pause_and_resume_are_idempotent() {
        let gate = PauseGate::new();
        gate.resume();
        gate.resume();
        assert!(gate.is_resumed());
        assert!(gate.wait());

        gate.pause();
        gate.pause();
        assert!(!gate.is_resumed());
        assert!(gate.is_running());
    }

    #[test]
    fn step_once_releases_a_single_iteration() {
        let gate = PauseGate::new();
        gate.step_once();
        assert!(gate.wait());
        assert!(!gate.is_resumed());
    }

    #[test]
    fn stop_wakes_a_paused_waiter() {
        let gate = Arc::new(PauseGate::new());
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait())
        };
        thread::sleep(Duration::from_millis(20));
        gate.stop();
        assert!(!waiter.join().expect("waiter thread"));
    }

    #[test]
    fn stop_interrupts_throttle() {
        let gate = Arc::new(PauseGate::new());
        let sleeper = {
            let gate = gate.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let running = gate.throttle(Duration::from_secs(10));
                (running, started.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        gate.stop();
        let (running, elapsed) = sleeper.join().expect("sleeper thread");
        assert!(!running);
        assert!(elapsed < Duration::from_secs(5));
    }
}
