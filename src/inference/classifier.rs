use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::constants::{
    CONDITION_HEAD_DOWN, CONDITION_TURN_LEFT, CONDITION_TURN_RIGHT, HEAD_POSE_DOWN, HEAD_POSE_UP,
    HEAD_TURN_FORWARD, HEAD_TURN_LEFT, HEAD_TURN_RIGHT, STATUS_CALIBRATING,
};
use crate::inference::config::{ConditionSpec, Direction, InferenceConfig, Predicate, Threshold};
use crate::inference::debounce::ConditionState;
use crate::inference::error::InferenceError;
use crate::inference::signal::SignalBank;
use crate::inference::types::FrameMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub main_status: String,
    pub head_pose: String,
    pub head_turn: String,
}

impl Classification {
    pub fn calibrating() -> Self {
        Self {
            main_status: STATUS_CALIBRATING.to_string(),
            head_pose: STATUS_CALIBRATING.to_string(),
            head_turn: HEAD_TURN_FORWARD.to_string(),
        }
    }
}

/// Relative thresholds need a baseline; without one the predicate is false.
pub fn evaluate_predicate(predicate: &Predicate, value: f64, baseline: Option<f64>) -> bool {
    let threshold = match predicate.threshold {
        Threshold::Absolute { value } => value,
        Threshold::Relative { multiplier } => match baseline {
            Some(b) => b * multiplier,
            None => return false,
        },
    };
    match predicate.direction {
        Direction::Above => value > threshold,
        Direction::Below => value < threshold,
    }
}

/// 每个主体独立的条件去抖状态
#[derive(Debug, Clone, Default)]
pub struct ConditionTracker {
    states: BTreeMap<String, ConditionState>,
}

impl ConditionTracker {
    pub fn is_confirmed(&self, condition: &str) -> bool {
        self.states.get(condition).is_some_and(|s| s.confirmed)
    }

    /// Confirmed-episode count per condition.
    pub fn episodes(&self) -> BTreeMap<String, u32> {
        self.states
            .iter()
            .map(|(name, s)| (name.clone(), s.episodes))
            .collect()
    }
}

/// Table-driven classifier shared by every subject of a session.
#[derive(Debug, Clone)]
pub struct StateClassifier {
    conditions: Vec<ConditionSpec>,
    /// (condition, label) in priority order
    table: Vec<(String, String)>,
    fallback: String,
}

impl StateClassifier {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        config.validate().map_err(InferenceError::InvalidConfig)?;
        Ok(Self {
            conditions: config.conditions.clone(),
            table: config
                .status_table
                .iter()
                .map(|r| (r.condition.clone(), r.label.clone()))
                .collect(),
            fallback: config.fallback_label.clone(),
        })
    }

    fn holds(spec: &ConditionSpec, smoothed: &FrameMetrics, bank: &SignalBank) -> bool {
        spec.predicates
            .iter()
            .all(|p| evaluate_predicate(p, smoothed.get(p.signal), bank.baseline(p.signal)))
    }

    /// Advances every debouncer by one frame and resolves the labels.
    pub fn classify(
        &self,
        tracker: &mut ConditionTracker,
        bank: &SignalBank,
        smoothed: &FrameMetrics,
        timestamp: DateTime<Utc>,
    ) -> Classification {
        for spec in &self.conditions {
            let active = Self::holds(spec, smoothed, bank);
            tracker
                .states
                .entry(spec.name.clone())
                .or_default()
                .update(active, timestamp, &spec.debounce);
        }

        let main_status = self
            .table
            .iter()
            .find(|(condition, _)| tracker.is_confirmed(condition))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| self.fallback.clone());

        let head_pose = if tracker.is_confirmed(CONDITION_HEAD_DOWN) {
            HEAD_POSE_DOWN
        } else {
            HEAD_POSE_UP
        };
        let head_turn = if tracker.is_confirmed(CONDITION_TURN_LEFT) {
            HEAD_TURN_LEFT
        } else if tracker.is_confirmed(CONDITION_TURN_RIGHT) {
            HEAD_TURN_RIGHT
        } else {
            HEAD_TURN_FORWARD
        };

        Classification {
            main_status,
            head_pose: head_pose.to_string(),
            head_turn: head_turn.to_string(),
        }
    }
}
