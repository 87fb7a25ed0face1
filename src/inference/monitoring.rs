use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::inference::error::SkipReason;
use crate::inference::types::{FrameMetrics, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantViolation {
    pub field: String,
    pub value: f64,
    pub expected_range: String,
}

impl InvariantViolation {
    pub fn is_non_finite(&self) -> bool {
        !self.value.is_finite()
    }
}

pub fn check_invariants(metrics: &FrameMetrics) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for signal in Signal::ALL {
        let value = metrics.get(signal);
        if !value.is_finite() {
            violations.push(InvariantViolation {
                field: signal.as_str().to_string(),
                value,
                expected_range: "finite".to_string(),
            });
            continue;
        }
        if signal.is_distance_ratio() {
            check_range(&mut violations, signal.as_str(), value, 0.0, f64::INFINITY);
        }
    }

    check_range(
        &mut violations,
        Signal::HeadTurnRatio.as_str(),
        metrics.head_turn_ratio,
        -1.0,
        1.0,
    );

    violations
}

fn check_range(
    violations: &mut Vec<InvariantViolation>,
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) {
    if value.is_nan() {
        // 已在有限性检查中记录
        return;
    }
    if value < min || value > max {
        violations.push(InvariantViolation {
            field: field.to_string(),
            value,
            expected_range: format!("[{min}, {max}]"),
        });
    }
}

/// Logs violations for one face and hands them back to the caller.
pub fn report_invariants(subject_id: &str, metrics: &FrameMetrics) -> Vec<InvariantViolation> {
    let violations = check_invariants(metrics);
    if !violations.is_empty() {
        tracing::warn!(subject_id, violations = ?violations, "Frame metrics invariant violation");
    }
    violations
}

/// 帧质量统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameQuality {
    pub frames_processed: u64,
    pub empty_frames: u64,
    pub classified_records: u64,
    pub calibrating_records: u64,
    pub skipped_faces: BTreeMap<String, u64>,
    pub invariant_violations: u64,
}

impl FrameQuality {
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self
            .skipped_faces
            .entry(reason.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped_faces.values().sum()
    }

    /// Skipped faces over all faces seen.
    pub fn skip_ratio(&self) -> f64 {
        let skipped = self.total_skipped();
        let total = skipped + self.classified_records + self.calibrating_records;
        if total == 0 {
            return 0.0;
        }
        skipped as f64 / total as f64
    }
}
