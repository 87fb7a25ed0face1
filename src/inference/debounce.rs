use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::config::DebounceSpec;

/// 单个条件的去抖状态
///
/// 条件需连续成立满足时长与帧数两个下限才确认；任意一帧不成立立即清空。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionState {
    pub onset: Option<DateTime<Utc>>,
    pub consecutive_frames: u32,
    pub confirmed: bool,
    /// 确认的上升沿次数
    pub episodes: u32,
}

impl ConditionState {
    pub fn update(&mut self, active: bool, timestamp: DateTime<Utc>, spec: &DebounceSpec) -> bool {
        if !active {
            self.onset = None;
            self.consecutive_frames = 0;
            self.confirmed = false;
            return false;
        }

        let onset = *self.onset.get_or_insert(timestamp);
        self.consecutive_frames = self.consecutive_frames.saturating_add(1);

        if !self.confirmed {
            let held_ms = (timestamp - onset).num_milliseconds();
            if held_ms >= spec.min_duration_ms && self.consecutive_frames >= spec.min_frames {
                self.confirmed = true;
                self.episodes += 1;
            }
        }
        self.confirmed
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn duration_gate_never_confirms_early() {
        let spec = DebounceSpec::millis(300);
        let mut st = ConditionState::default();
        assert!(!st.update(true, at(0), &spec));
        assert!(!st.update(true, at(100), &spec));
        assert!(!st.update(true, at(299), &spec));
        assert!(st.update(true, at(300), &spec));
        assert_eq!(st.episodes, 1);
    }

    #[test]
    fn single_false_frame_resets() {
        let spec = DebounceSpec::millis(300);
        let mut st = ConditionState::default();
        st.update(true, at(0), &spec);
        assert!(st.update(true, at(400), &spec));
        assert!(!st.update(false, at(440), &spec));
        assert_eq!(st.onset, None);
        // 重新计时
        assert!(!st.update(true, at(480), &spec));
        assert!(st.update(true, at(780), &spec));
        assert_eq!(st.episodes, 2);
    }

    #[test]
    fn frame_gate_counts_consecutive_frames() {
        let spec = DebounceSpec::frames(5);
        let mut st = ConditionState::default();
        for i in 0..4 {
            assert!(!st.update(true, at(i), &spec));
        }
        assert!(st.update(true, at(4), &spec));
    }

    #[test]
    fn both_gates_must_pass() {
        let spec = DebounceSpec {
            min_duration_ms: 100,
            min_frames: 3,
        };
        let mut st = ConditionState::default();
        st.update(true, at(0), &spec);
        // 时长够但帧数不够
        assert!(!st.update(true, at(200), &spec));
        assert!(st.update(true, at(210), &spec));
    }

    #[test]
    fn zero_debounce_confirms_immediately() {
        let mut st = ConditionState::default();
        assert!(st.update(true, at(0), &DebounceSpec::default()));
    }
}
