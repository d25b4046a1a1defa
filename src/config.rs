use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::progress::ProgressMode;

const ENV_PREFIX: &str = "MIRROR_COACH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub producer: ProducerConfig,
    pub comparison: ComparisonConfig,
    pub progress: ProgressConfig,
    pub capture: CaptureConfig,
    pub exercise: ExerciseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Replay frames per second, also used to convert seek offsets to frames.
    pub replay_fps: u32,
    pub live_fps: u32,
    /// Capacity of each producer's delivery channel.
    pub channel_capacity: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            replay_fps: 25,
            live_fps: 25,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub smoothing_window: usize,
    pub error_window: usize,
    /// Per-keypoint norm above which an error vector is drawn.
    pub error_threshold: f32,
    /// Repetition MSE below which the repetition counts as correct (repetition mode).
    pub correctness_threshold: f32,
    /// Same as `correctness_threshold`, used while the progress counter runs as a timer.
    pub timer_correctness_threshold: f32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            error_window: 5,
            error_threshold: 0.3,
            correctness_threshold: 0.02,
            timer_correctness_threshold: 0.03,
        }
    }
}

impl ComparisonConfig {
    /// Repetition MSE threshold for the given progress mode.
    pub fn correctness_threshold(&self, mode: ProgressMode) -> f32 {
        match mode {
            ProgressMode::Repetition => self.correctness_threshold,
            ProgressMode::Timer => self.timer_correctness_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub mode: ProgressMode,
    pub repetitions: u32,
    pub duration_secs: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Repetition,
            repetitions: 10,
            duration_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Moving-average window applied to recorded exercises when they enter the library.
    pub smoothing_window: usize,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Layers the defaults, an optional TOML file and `MIRROR_COACH__*`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let configuration: Configuration = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AppError> {
        if self.producer.replay_fps == 0 || self.producer.live_fps == 0 {
            return Err(AppError::InvalidConfig(
                "Producer frame rates must be greater than 0".to_string(),
            ));
        }

        if self.producer.channel_capacity == 0 {
            return Err(AppError::InvalidConfig(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.comparison.smoothing_window == 0 || self.comparison.error_window == 0 {
            return Err(AppError::InvalidConfig(
                "Smoothing and error windows must be greater than 0".to_string(),
            ));
        }

        let thresholds = [
            self.comparison.error_threshold,
            self.comparison.correctness_threshold,
            self.comparison.timer_correctness_threshold,
        ];
        if thresholds.iter().any(|threshold| *threshold <= 0.0) {
            return Err(AppError::InvalidConfig(
                "Thresholds must be positive".to_string(),
            ));
        }

        match self.progress.mode {
            ProgressMode::Repetition if self.progress.repetitions == 0 => {
                return Err(AppError::InvalidConfig(
                    "Repetition target must be greater than 0".to_string(),
                ));
            }
            ProgressMode::Timer if self.progress.duration_secs == 0 => {
                return Err(AppError::InvalidConfig(
                    "Timer duration must be greater than 0".to_string(),
                ));
            }
            _ => {}
        }

        if self.exercise.smoothing_window == 0 {
            return Err(AppError::InvalidConfig(
                "Exercise smoothing window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let configuration = Configuration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.comparison.smoothing_window, 3);
        assert_eq!(configuration.comparison.error_window, 5);
        assert_eq!(configuration.producer.replay_fps, 25);
    }

    #[test]
    fn rejects_zero_windows() {
        let mut configuration = Configuration::default();
        configuration.comparison.error_window = 0;
        assert!(matches!(
            configuration.validate(),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn threshold_follows_mode() {
        let comparison = ComparisonConfig::default();
        assert_eq!(comparison.correctness_threshold(ProgressMode::Repetition), 0.02);
        assert_eq!(comparison.correctness_threshold(ProgressMode::Timer), 0.03);
    }

    #[test]
    fn loads_partial_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[progress]\nmode = \"timer\"\nduration_secs = 30\n\n[comparison]\nerror_threshold = 0.25"
        )
        .expect("write config");

        let configuration = Configuration::load(Some(file.path())).expect("config loads");
        assert_eq!(configuration.progress.mode, ProgressMode::Timer);
        assert_eq!(configuration.progress.duration_secs, 30);
        assert_eq!(configuration.comparison.error_threshold, 0.25);
        assert_eq!(configuration.comparison.smoothing_window, 3);
    }
}
