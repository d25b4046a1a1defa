use indexmap::IndexMap;
use tracing::{debug, info};

use super::rules::{PoseRule, apply_rule, restore_column};
use super::smoothing::smooth_pose_parameters;
use super::Exercise;
use crate::error::AppError;
use crate::producer::Take;

struct AppliedRule {
    rule: PoseRule,
    previous: Vec<f32>,
}

/// The exercises available for playback, in insertion order, with the
/// editing rules applied to each.
pub struct ExerciseLibrary {
    exercises: IndexMap<String, Exercise>,
    rules: IndexMap<String, IndexMap<usize, AppliedRule>>,
    smoothing_window: usize,
}

impl ExerciseLibrary {
    pub fn new(smoothing_window: usize) -> Self {
        Self {
            exercises: IndexMap::new(),
            rules: IndexMap::new(),
            smoothing_window,
        }
    }

    /// Smooths and stores an exercise, replacing any previous one (and its
    /// rules) with the same name.
    pub fn insert(&mut self, mut exercise: Exercise) {
        smooth_pose_parameters(exercise.frames_mut(), self.smoothing_window);
        let name = exercise.name().to_string();
        debug!("Adding exercise {} with {} frames", name, exercise.len());
        self.rules.insert(name.clone(), IndexMap::new());
        self.exercises.insert(name, exercise);
    }

    /// Turns a recorded take into a library exercise named after its label.
    pub fn insert_take(&mut self, take: Take) -> Result<&Exercise, AppError> {
        let name = take.label.clone();
        let exercise = Exercise::new(name.clone(), take.frames)?;
        self.insert(exercise);
        info!("Exercise {} has been saved to the library", name);
        self.get(&name)
            .ok_or_else(|| AppError::InvalidExercise(format!("exercise {} vanished", name)))
    }

    pub fn get(&self, name: &str) -> Option<&Exercise> {
        self.exercises.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.exercises.keys().map(|name| name.as_str()).collect()
    }

    pub fn remove(&mut self, name: &str) -> Option<Exercise> {
        self.rules.shift_remove(name);
        self.exercises.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Applies a rule to one pose parameter. A rule already on that parameter
    /// is undone first so removal always restores the recorded values.
    pub fn add_rule(&mut self, name: &str, index: usize, rule: PoseRule) -> Result<(), AppError> {
        if self.rule(name, index).is_some() {
            self.remove_rule(name, index)?;
        }
        let exercise = self
            .exercises
            .get_mut(name)
            .ok_or_else(|| AppError::InvalidExercise(format!("unknown exercise {}", name)))?;
        let previous = apply_rule(exercise.frames_mut(), index, &rule)?;
        self.rules
            .entry(name.to_string())
            .or_default()
            .insert(index, AppliedRule { rule, previous });
        debug!("Applied {:?} to parameter {} of {}", rule, index, name);
        Ok(())
    }

    pub fn remove_rule(&mut self, name: &str, index: usize) -> Result<Option<PoseRule>, AppError> {
        let exercise = self
            .exercises
            .get_mut(name)
            .ok_or_else(|| AppError::InvalidExercise(format!("unknown exercise {}", name)))?;
        let removed = self
            .rules
            .get_mut(name)
            .and_then(|rules| rules.shift_remove(&index));
        Ok(removed.map(|applied| {
            restore_column(exercise.frames_mut(), index, &applied.previous);
            applied.rule
        }))
    }

    pub fn rule(&self, name: &str, index: usize) -> Option<PoseRule> {
        self.rules
            .get(name)
            .and_then(|rules| rules.get(&index))
            .map(|applied| applied.rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::POSE_PARAMETER_COUNT;
    use chrono::Utc;
    use uuid::Uuid;

    fn exercise(name: &str, value: f32) -> Exercise {
        Exercise::new(name, vec![vec![value; POSE_PARAMETER_COUNT]; 6]).expect("valid")
    }

    #[test]
    fn keeps_insertion_order() {
        let mut library = ExerciseLibrary::new(10);
        library.insert(exercise("squat", 0.0));
        library.insert(exercise("lunge", 0.0));
        assert_eq!(library.names(), vec!["squat", "lunge"]);
        assert!(library.remove("squat").is_some());
        assert_eq!(library.names(), vec!["lunge"]);
    }

    #[test]
    fn rules_apply_and_undo() {
        let mut library = ExerciseLibrary::new(10);
        library.insert(exercise("squat", 0.25));

        library
            .add_rule("squat", 3, PoseRule::Fixed { degrees: 0.0 })
            .expect("rule applies");
        assert!(library.get("squat").unwrap().frames().iter().all(|f| f[3] == 0.0));

        // replacing a rule still restores the recorded values on removal
        library
            .add_rule("squat", 3, PoseRule::Fixed { degrees: 45.0 })
            .expect("rule applies");
        let removed = library.remove_rule("squat", 3).expect("known exercise");
        assert_eq!(removed, Some(PoseRule::Fixed { degrees: 45.0 }));
        assert!(library.get("squat").unwrap().frames().iter().all(|f| f[3] == 0.25));
        assert!(library.rule("squat", 3).is_none());
    }

    #[test]
    fn rejects_unknown_exercise() {
        let mut library = ExerciseLibrary::new(10);
        assert!(library
            .add_rule("missing", 0, PoseRule::Fixed { degrees: 0.0 })
            .is_err());
    }

    #[test]
    fn takes_become_exercises() {
        let mut library = ExerciseLibrary::new(3);
        let take = Take {
            id: Uuid::new_v4(),
            label: "front_raise".to_string(),
            recorded_at: Utc::now(),
            frames: vec![vec![0.1; POSE_PARAMETER_COUNT]; 8],
        };
        let exercise = library.insert_take(take).expect("valid take");
        assert_eq!(exercise.len(), 8);
        assert_eq!(library.names(), vec!["front_raise"]);
    }
}
