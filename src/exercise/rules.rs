use serde::{Deserialize, Serialize};

use crate::common::PoseParameters;
use crate::error::AppError;

/// Constraint applied to one pose parameter across every frame of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PoseRule {
    /// Pin the parameter to a single angle.
    Fixed { degrees: f32 },
    /// Clamp the parameter into a range of angles.
    Range { min_degrees: f32, max_degrees: f32 },
}

impl PoseRule {
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            PoseRule::Range {
                min_degrees,
                max_degrees,
            } if min_degrees > max_degrees => Err(AppError::InvalidExercise(format!(
                "range rule minimum {} exceeds maximum {}",
                min_degrees, max_degrees
            ))),
            _ => Ok(()),
        }
    }

    fn apply_to(&self, radians: f32) -> f32 {
        match *self {
            PoseRule::Fixed { degrees } => degrees.to_radians(),
            PoseRule::Range {
                min_degrees,
                max_degrees,
            } => radians.clamp(min_degrees.to_radians(), max_degrees.to_radians()),
        }
    }
}

/// Applies `rule` to parameter `index` of every frame and returns the column
/// as it was before, for [`restore_column`].
pub fn apply_rule(
    frames: &mut [PoseParameters],
    index: usize,
    rule: &PoseRule,
) -> Result<Vec<f32>, AppError> {
    rule.validate()?;
    if frames.iter().any(|frame| index >= frame.len()) {
        return Err(AppError::InvalidExercise(format!(
            "pose parameter {} is out of range",
            index
        )));
    }

    let previous = frames.iter().map(|frame| frame[index]).collect();
    for frame in frames.iter_mut() {
        frame[index] = rule.apply_to(frame[index]);
    }
    Ok(previous)
}

pub fn restore_column(frames: &mut [PoseParameters], index: usize, previous: &[f32]) {
    for (frame, value) in frames.iter_mut().zip(previous.iter()) {
        if let Some(slot) = frame.get_mut(index) {
            *slot = *value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn frames() -> Vec<PoseParameters> {
        vec![vec![-1.0, 0.0], vec![0.5, 0.0], vec![2.0, 0.0]]
    }

    #[test]
    fn fixed_rule_pins_every_frame() {
        let mut frames = frames();
        let previous = apply_rule(&mut frames, 0, &PoseRule::Fixed { degrees: 90.0 }).unwrap();
        assert_eq!(previous, vec![-1.0, 0.5, 2.0]);
        assert!(frames.iter().all(|f| (f[0] - FRAC_PI_2).abs() < 1e-6));
    }

    #[test]
    fn range_rule_clamps_and_restores() {
        let mut frames = frames();
        let rule = PoseRule::Range {
            min_degrees: 0.0,
            max_degrees: 90.0,
        };
        let previous = apply_rule(&mut frames, 0, &rule).unwrap();
        assert_eq!(frames[0][0], 0.0);
        assert_eq!(frames[1][0], 0.5);
        assert!((frames[2][0] - FRAC_PI_2).abs() < 1e-6);

        restore_column(&mut frames, 0, &previous);
        assert_eq!(frames, super::tests::frames());
    }

    #[test]
    fn rejects_bad_rules() {
        let mut frames = frames();
        let inverted = PoseRule::Range {
            min_degrees: 10.0,
            max_degrees: -10.0,
        };
        assert!(apply_rule(&mut frames, 0, &inverted).is_err());
        assert!(apply_rule(&mut frames, 5, &PoseRule::Fixed { degrees: 0.0 }).is_err());
    }
}
