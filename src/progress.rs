use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProgressConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Count repetitions up to a target.
    Repetition,
    /// Count seconds down to zero.
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    Continue,
    /// The bound was reached. Reported once.
    Finished,
}

/// Repetition counter or countdown that decides when a session is over.
#[derive(Debug, Clone)]
pub struct ProgressState {
    mode: ProgressMode,
    repetitions: u32,
    duration_secs: u32,
    counter: u32,
    min_count: u32,
    max_count: u32,
    finished: bool,
}

impl ProgressState {
    pub fn new(mode: ProgressMode, repetitions: u32, duration_secs: u32) -> Self {
        let mut state = Self {
            mode,
            repetitions,
            duration_secs,
            counter: 0,
            min_count: 0,
            max_count: 0,
            finished: false,
        };
        state.reset();
        state
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(config.mode, config.repetitions, config.duration_secs)
    }

    /// Restores the starting count for the current mode.
    ///
    /// In repetition mode the counter sits at 0 until the first repetition
    /// starts, so it reads 1 during repetition 1 and finishes on reaching
    /// `repetitions + 1`.
    pub fn reset(&mut self) {
        self.finished = false;
        match self.mode {
            ProgressMode::Repetition => {
                self.counter = 0;
                self.min_count = 0;
                self.max_count = self.repetitions + 1;
            }
            ProgressMode::Timer => {
                self.counter = self.duration_secs;
                self.min_count = 0;
                self.max_count = self.duration_secs;
            }
        }
    }

    pub fn set_mode(&mut self, mode: ProgressMode) {
        debug!("Progress mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.reset();
    }

    pub fn mode(&self) -> ProgressMode {
        self.mode
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Called when a repetition starts. No-op in timer mode.
    pub fn advance(&mut self) -> ProgressSignal {
        if self.mode != ProgressMode::Repetition || self.finished {
            return ProgressSignal::Continue;
        }
        self.counter += 1;
        self.check(self.counter >= self.max_count)
    }

    /// Called once per second. No-op in repetition mode.
    pub fn tick(&mut self) -> ProgressSignal {
        if self.mode != ProgressMode::Timer || self.finished {
            return ProgressSignal::Continue;
        }
        self.counter = self.counter.saturating_sub(1);
        self.check(self.counter <= self.min_count)
    }

    fn check(&mut self, reached: bool) -> ProgressSignal {
        if reached {
            self.finished = true;
            ProgressSignal::Finished
        } else {
            ProgressSignal::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetition_mode_finishes_after_target() {
        let mut progress = ProgressState::new(ProgressMode::Repetition, 2, 60);
        assert_eq!(progress.advance(), ProgressSignal::Continue);
        assert_eq!(progress.counter(), 1);
        assert_eq!(progress.advance(), ProgressSignal::Continue);
        assert_eq!(progress.advance(), ProgressSignal::Finished);
        assert_eq!(progress.counter(), 3);
        // fires once
        assert_eq!(progress.advance(), ProgressSignal::Continue);
        assert_eq!(progress.tick(), ProgressSignal::Continue);
    }

    #[test]
    fn timer_mode_counts_down() {
        let mut progress = ProgressState::new(ProgressMode::Timer, 10, 3);
        assert_eq!(progress.counter(), 3);
        assert_eq!(progress.advance(), ProgressSignal::Continue);
        assert_eq!(progress.tick(), ProgressSignal::Continue);
        assert_eq!(progress.tick(), ProgressSignal::Continue);
        assert_eq!(progress.tick(), ProgressSignal::Finished);
        assert_eq!(progress.counter(), 0);
        assert!(progress.is_finished());
    }

    #[test]
    fn switching_mode_resets_bounds() {
        let mut progress = ProgressState::new(ProgressMode::Timer, 4, 3);
        progress.tick();
        progress.set_mode(ProgressMode::Repetition);
        assert_eq!(progress.counter(), 0);
        assert!(!progress.is_finished());

        progress.set_mode(ProgressMode::Timer);
        assert_eq!(progress.counter(), 3);
    }
}
