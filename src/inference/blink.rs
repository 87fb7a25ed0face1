//! 眨眼计数
//!
//! 对每个主体的原始 EAR 做两态判定：EAR 低于闭眼阈值时记一次眨眼，
//! 回到睁眼阈值以上才允许下一次计数。频率按该主体首帧以来的时长折算为次/分钟。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::config::BlinkConfig;

const MIN_RATE_WINDOW_MS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EyeState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkSummary {
    pub blink_count: u64,
    pub blinks_per_minute: f64,
}

#[derive(Debug, Clone)]
pub struct BlinkCounter {
    close_threshold: f64,
    open_threshold: f64,
    state: EyeState,
    count: u64,
    first_ts: Option<DateTime<Utc>>,
    last_ts: Option<DateTime<Utc>>,
}

impl BlinkCounter {
    pub fn new(config: &BlinkConfig) -> Self {
        Self {
            close_threshold: config.close_threshold,
            open_threshold: config.open_threshold,
            state: EyeState::Open,
            count: 0,
            first_ts: None,
            last_ts: None,
        }
    }

    /// Returns `true` on the frame where the eyes close.
    pub fn update(&mut self, ear: f64, timestamp: DateTime<Utc>) -> bool {
        self.first_ts.get_or_insert(timestamp);
        self.last_ts = Some(timestamp);

        match self.state {
            EyeState::Open if ear < self.close_threshold => {
                self.state = EyeState::Closed;
                self.count += 1;
                true
            }
            EyeState::Closed if ear >= self.open_threshold => {
                self.state = EyeState::Open;
                false
            }
            _ => false,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 0 until the subject has been observed for at least ten seconds.
    pub fn per_minute(&self) -> f64 {
        let (Some(first), Some(last)) = (self.first_ts, self.last_ts) else {
            return 0.0;
        };
        let elapsed_ms = (last - first).num_milliseconds();
        if elapsed_ms < MIN_RATE_WINDOW_MS {
            return 0.0;
        }
        self.count as f64 / (elapsed_ms as f64 / 60_000.0)
    }

    pub fn summary(&self) -> BlinkSummary {
        BlinkSummary {
            blink_count: self.count,
            blinks_per_minute: self.per_minute(),
        }
    }
}
