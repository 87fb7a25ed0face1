//! 基线校准
//!
//! 每个主体、每个信号独立收集前 N 个平滑后的读数，窗口关闭时按策略（中位数/均值）
//! 一次性确定基线，此后不再变化。

use crate::inference::config::BaselinePolicy;
use crate::inference::error::InferenceError;

#[derive(Debug, Clone, PartialEq)]
enum CalibrationState {
    Calibrating { samples: Vec<f64> },
    Calibrated { baseline: f64 },
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    frames: usize,
    policy: BaselinePolicy,
    state: CalibrationState,
}

impl Calibrator {
    pub fn new(frames: usize, policy: BaselinePolicy) -> Result<Self, InferenceError> {
        if frames == 0 {
            return Err(InferenceError::InvalidConfig(
                "calibration frames must be > 0".to_string(),
            ));
        }
        Ok(Self {
            frames,
            policy,
            state: CalibrationState::Calibrating {
                samples: Vec::with_capacity(frames),
            },
        })
    }

    /// Feeds one smoothed value; ignored once calibrated.
    ///
    /// Returns `true` only for the call that closes the window.
    pub fn observe(&mut self, value: f64) -> bool {
        let CalibrationState::Calibrating { samples } = &mut self.state else {
            return false;
        };
        samples.push(value);
        if samples.len() < self.frames {
            return false;
        }
        let baseline = match self.policy {
            BaselinePolicy::Median => median(samples),
            BaselinePolicy::Mean => mean(samples),
        };
        self.state = CalibrationState::Calibrated { baseline };
        true
    }

    pub fn baseline(&self) -> Option<f64> {
        match self.state {
            CalibrationState::Calibrated { baseline } => Some(baseline),
            CalibrationState::Calibrating { .. } => None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline().is_some()
    }
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let len = sorted.len();
    if len == 0 {
        0.0
    } else if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    } else {
        sorted[len / 2]
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_on_exactly_n_samples() {
        let mut c = Calibrator::new(3, BaselinePolicy::Median).unwrap();
        assert!(!c.observe(1.0));
        assert!(!c.observe(9.0));
        assert_eq!(c.baseline(), None);
        assert!(c.observe(2.0));
        assert_eq!(c.baseline(), Some(2.0));
    }

    #[test]
    fn baseline_is_immutable() {
        let mut c = Calibrator::new(2, BaselinePolicy::Mean).unwrap();
        c.observe(1.0);
        c.observe(3.0);
        assert_eq!(c.baseline(), Some(2.0));
        assert!(!c.observe(100.0));
        assert_eq!(c.baseline(), Some(2.0));
    }

    #[test]
    fn even_median_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn zero_frames_rejected() {
        assert!(Calibrator::new(0, BaselinePolicy::Median).is_err());
    }
}
