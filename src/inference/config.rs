use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONDITION_HEAD_DOWN, CONDITION_TURN_LEFT, CONDITION_TURN_RIGHT, DEFAULT_BLINK_EAR_THRESHOLD,
    DEFAULT_CALIBRATION_FRAMES, DEFAULT_SIMILARITY_THRESHOLD, HEAD_POSE_DOWN, HEAD_TURN_LEFT, HEAD_TURN_RIGHT, STATUS_FOCUSED,
};
use crate::inference::error::InferenceError;
use crate::inference::types::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SmootherKind {
    Window { capacity: usize },
    Exponential { alpha: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothingConfig {
    /// 默认滑动窗口长度
    pub window: usize,
    /// 按信号覆盖默认平滑方式
    #[serde(default)]
    pub overrides: BTreeMap<Signal, SmootherKind>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        // 转头比例沿用 EMA（alpha=0.2），其余信号 5 帧均值
        overrides.insert(Signal::HeadTurnRatio, SmootherKind::Exponential { alpha: 0.2 });
        Self {
            window: 5,
            overrides,
        }
    }
}

impl SmoothingConfig {
    pub fn smoother_for(&self, signal: Signal) -> SmootherKind {
        self.overrides
            .get(&signal)
            .copied()
            .unwrap_or(SmootherKind::Window {
                capacity: self.window,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaselinePolicy {
    #[default]
    Median,
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationConfig {
    pub frames: usize,
    #[serde(default)]
    pub policy: BaselinePolicy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_CALIBRATION_FRAMES,
            policy: BaselinePolicy::Median,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Threshold {
    /// baseline × multiplier
    Relative { multiplier: f64 },
    Absolute { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub signal: Signal,
    pub direction: Direction,
    pub threshold: Threshold,
}

impl Predicate {
    pub fn relative(signal: Signal, direction: Direction, multiplier: f64) -> Self {
        Self {
            signal,
            direction,
            threshold: Threshold::Relative { multiplier },
        }
    }

    pub fn absolute(signal: Signal, direction: Direction, value: f64) -> Self {
        Self {
            signal,
            direction,
            threshold: Threshold::Absolute { value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceSpec {
    #[serde(default)]
    pub min_duration_ms: i64,
    #[serde(default)]
    pub min_frames: u32,
}

impl DebounceSpec {
    pub fn millis(min_duration_ms: i64) -> Self {
        Self {
            min_duration_ms,
            min_frames: 0,
        }
    }

    pub fn frames(min_frames: u32) -> Self {
        Self {
            min_duration_ms: 0,
            min_frames,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    pub name: String,
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub debounce: DebounceSpec,
}

impl ConditionSpec {
    fn new(name: &str, predicates: Vec<Predicate>, debounce: DebounceSpec) -> Self {
        Self {
            name: name.to_string(),
            predicates,
            debounce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRule {
    pub condition: String,
    pub label: String,
}

impl StatusRule {
    fn new(condition: &str, label: &str) -> Self {
        Self {
            condition: condition.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    pub similarity_threshold: f32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// 眨眼计数阈值，作用于未平滑的 EAR
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkConfig {
    pub close_threshold: f64,
    pub open_threshold: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            close_threshold: DEFAULT_BLINK_EAR_THRESHOLD,
            open_threshold: DEFAULT_BLINK_EAR_THRESHOLD,
        }
    }
}

pub fn default_conditions() -> Vec<ConditionSpec> {
    use Direction::{Above, Below};
    vec![
        ConditionSpec::new(
            CONDITION_HEAD_DOWN,
            vec![Predicate::relative(Signal::VerticalHeadRatio, Above, 1.3)],
            DebounceSpec::default(),
        ),
        ConditionSpec::new(
            CONDITION_TURN_LEFT,
            vec![Predicate::absolute(Signal::HeadTurnRatio, Above, 0.30)],
            DebounceSpec::default(),
        ),
        ConditionSpec::new(
            CONDITION_TURN_RIGHT,
            vec![Predicate::absolute(Signal::HeadTurnRatio, Below, -0.30)],
            DebounceSpec::default(),
        ),
        ConditionSpec::new(
            "distracted",
            vec![Predicate::relative(Signal::EyeAspectRatio, Below, 0.75)],
            DebounceSpec::millis(1000),
        ),
        ConditionSpec::new(
            "confused",
            vec![
                Predicate::relative(Signal::EyebrowRatio, Below, 0.97),
                Predicate::relative(Signal::GlabellaRatio, Below, 0.95),
            ],
            DebounceSpec::millis(300),
        ),
        ConditionSpec::new(
            "yawning",
            vec![
                Predicate::absolute(Signal::MouthApertureRatio, Above, 0.2),
                Predicate::absolute(Signal::MouthAngleDegrees, Above, -10.0),
                Predicate::absolute(Signal::MouthAngleDegrees, Below, 10.0),
            ],
            DebounceSpec::frames(5),
        ),
        ConditionSpec::new(
            "asymmetric",
            vec![
                Predicate::relative(Signal::AsymmetryRatio, Above, 1.5),
                // 基线接近 0 时相对阈值失效，叠加绝对下限
                Predicate::absolute(Signal::AsymmetryRatio, Above, 0.02),
            ],
            DebounceSpec::millis(300),
        ),
    ]
}

pub fn default_status_table() -> Vec<StatusRule> {
    vec![
        StatusRule::new(CONDITION_HEAD_DOWN, HEAD_POSE_DOWN),
        StatusRule::new(CONDITION_TURN_LEFT, HEAD_TURN_LEFT),
        StatusRule::new(CONDITION_TURN_RIGHT, HEAD_TURN_RIGHT),
        StatusRule::new("distracted", "Distracted"),
        StatusRule::new("confused", "Confused"),
        StatusRule::new("yawning", "Yawning"),
        StatusRule::new("asymmetric", "Asymmetric"),
    ]
}

fn default_fallback_label() -> String {
    STATUS_FOCUSED.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default = "default_conditions")]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default = "default_status_table")]
    pub status_table: Vec<StatusRule>,
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub blink: BlinkConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            calibration: CalibrationConfig::default(),
            conditions: default_conditions(),
            status_table: default_status_table(),
            fallback_label: default_fallback_label(),
            identity: IdentityConfig::default(),
            blink: BlinkConfig::default(),
        }
    }
}

impl InferenceConfig {
    pub fn from_env(env_config: &crate::config::InferenceEnvConfig) -> Self {
        let mut config = Self::default();
        config.calibration.frames = env_config.calibration_frames;
        config.identity.similarity_threshold = env_config.similarity_threshold;
        config
    }

    /// Reads a JSON config file; omitted sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate().map_err(InferenceError::InvalidConfig)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        // 平滑参数
        if self.smoothing.window == 0 {
            return Err("smoothing.window must be > 0".to_string());
        }
        for (signal, kind) in &self.smoothing.overrides {
            match *kind {
                SmootherKind::Window { capacity } if capacity == 0 => {
                    return Err(format!(
                        "smoothing.overrides.{} capacity must be > 0",
                        signal.as_str()
                    ));
                }
                SmootherKind::Exponential { alpha } if !(alpha > 0.0 && alpha <= 1.0) => {
                    return Err(format!(
                        "smoothing.overrides.{} alpha must be in (0,1]",
                        signal.as_str()
                    ));
                }
                _ => {}
            }
        }

        if self.calibration.frames == 0 {
            return Err("calibration.frames must be > 0".to_string());
        }

        // 条件定义
        let mut names = HashSet::new();
        for cond in &self.conditions {
            if cond.name.trim().is_empty() {
                return Err("conditions[].name must not be empty".to_string());
            }
            if !names.insert(cond.name.as_str()) {
                return Err(format!("duplicate condition '{}'", cond.name));
            }
            if cond.predicates.is_empty() {
                return Err(format!("condition '{}' has no predicates", cond.name));
            }
            for p in &cond.predicates {
                let v = match p.threshold {
                    Threshold::Relative { multiplier } => multiplier,
                    Threshold::Absolute { value } => value,
                };
                if !v.is_finite() {
                    return Err(format!(
                        "condition '{}' has a non-finite threshold",
                        cond.name
                    ));
                }
            }
            if cond.debounce.min_duration_ms < 0 {
                return Err(format!(
                    "condition '{}' debounce.minDurationMs must be >= 0",
                    cond.name
                ));
            }
        }

        // 状态优先级表
        if self.status_table.is_empty() {
            return Err("statusTable must not be empty".to_string());
        }
        for rule in &self.status_table {
            if !names.contains(rule.condition.as_str()) {
                return Err(format!(
                    "statusTable references unknown condition '{}'",
                    rule.condition
                ));
            }
            if rule.label.trim().is_empty() {
                return Err(format!("statusTable label for '{}' is empty", rule.condition));
            }
        }
        if self.fallback_label.trim().is_empty() {
            return Err("fallbackLabel must not be empty".to_string());
        }

        let t = self.identity.similarity_threshold;
        if !t.is_finite() || !(-1.0..=1.0).contains(&t) {
            return Err("identity.similarityThreshold must be in [-1,1]".to_string());
        }

        let b = &self.blink;
        if !b.close_threshold.is_finite() || !b.open_threshold.is_finite() {
            return Err("blink thresholds must be finite".to_string());
        }
        if b.open_threshold < b.close_threshold {
            return Err("blink.openThreshold must be >= blink.closeThreshold".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = InferenceConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = InferenceConfig::default();
        cfg.smoothing.window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = InferenceConfig::default();
        cfg.calibration.frames = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = InferenceConfig::default();
        cfg.status_table.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = InferenceConfig::default();
        cfg.status_table.push(StatusRule::new("sleepy", "Sleepy"));
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("sleepy"));

        let mut cfg = InferenceConfig::default();
        cfg.smoothing
            .overrides
            .insert(Signal::EyebrowRatio, SmootherKind::Exponential { alpha: 1.5 });
        assert!(cfg.validate().is_err());

        let mut cfg = InferenceConfig::default();
        cfg.blink.open_threshold = 0.1;
        assert!(cfg.validate().unwrap_err().contains("blink"));
    }

    #[test]
    fn default_priority_order() {
        let labels: Vec<_> = InferenceConfig::default()
            .status_table
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Head Down",
                "Turning LEFT",
                "Turning RIGHT",
                "Distracted",
                "Confused",
                "Yawning",
                "Asymmetric"
            ]
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: InferenceConfig =
            serde_json::from_str(r#"{"calibration":{"frames":10,"policy":"mean"}}"#).unwrap();
        assert_eq!(cfg.calibration.frames, 10);
        assert_eq!(cfg.calibration.policy, BaselinePolicy::Mean);
        assert_eq!(cfg.smoothing.window, 5);
        assert_eq!(cfg.status_table.len(), 7);
        assert_eq!(cfg.fallback_label, "Focused");
        assert_eq!(cfg.blink.close_threshold, 0.21);
    }

    #[test]
    fn head_turn_uses_ema_by_default() {
        let cfg = SmoothingConfig::default();
        assert_eq!(
            cfg.smoother_for(Signal::HeadTurnRatio),
            SmootherKind::Exponential { alpha: 0.2 }
        );
        assert_eq!(
            cfg.smoother_for(Signal::EyebrowRatio),
            SmootherKind::Window { capacity: 5 }
        );
    }

    #[test]
    fn predicate_json_shape() {
        let p: Predicate = serde_json::from_str(
            r#"{"signal":"eyebrowRatio","direction":"below","threshold":{"kind":"relative","multiplier":0.97}}"#,
        )
        .unwrap();
        assert_eq!(p, Predicate::relative(Signal::EyebrowRatio, Direction::Below, 0.97));
    }
}
