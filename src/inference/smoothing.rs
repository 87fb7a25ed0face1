use std::collections::VecDeque;

use crate::inference::config::SmootherKind;
use crate::inference::error::InferenceError;

/// Bounded FIFO of the most recent readings for one signal.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Result<Self, InferenceError> {
        if capacity == 0 {
            return Err(InferenceError::InvalidConfig(
                "sliding window capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        })
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Cold start: the mean covers whatever has been seen so far, including `value`.
    pub fn push_and_mean(&mut self, value: f64) -> f64 {
        self.push(value);
        self.mean().unwrap_or(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// EMA seeded with the first reading.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f64,
    state: Option<f64>,
}

impl ExponentialSmoother {
    pub fn new(alpha: f64) -> Result<Self, InferenceError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(InferenceError::InvalidConfig(format!(
                "smoothing alpha must be in (0,1], got {alpha}"
            )));
        }
        Ok(Self { alpha, state: None })
    }

    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.state {
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
            None => value,
        };
        self.state = Some(next);
        next
    }
}

#[derive(Debug, Clone)]
pub enum Smoother {
    Window(SlidingWindow),
    Exponential(ExponentialSmoother),
}

impl Smoother {
    pub fn from_kind(kind: SmootherKind) -> Result<Self, InferenceError> {
        Ok(match kind {
            SmootherKind::Window { capacity } => Self::Window(SlidingWindow::new(capacity)?),
            SmootherKind::Exponential { alpha } => {
                Self::Exponential(ExponentialSmoother::new(alpha)?)
            }
        })
    }

    pub fn smooth(&mut self, value: f64) -> f64 {
        match self {
            Self::Window(w) => w.push_and_mean(value),
            Self::Exponential(e) => e.update(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evicts_oldest() {
        let mut w = SlidingWindow::new(3).unwrap();
        assert_eq!(w.mean(), None);
        assert_eq!(w.push_and_mean(10.0), 10.0);
        assert_eq!(w.push_and_mean(20.0), 15.0);
        assert_eq!(w.push_and_mean(30.0), 20.0);
        // 窗口已满，最旧的值被移出
        assert_eq!(w.push_and_mean(40.0), 30.0);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn zero_capacity_is_config_error() {
        assert!(matches!(
            SlidingWindow::new(0),
            Err(InferenceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let mut e = ExponentialSmoother::new(0.2).unwrap();
        assert_eq!(e.update(1.0), 1.0);
        let v = e.update(0.0);
        assert!((v - 0.8).abs() < 1e-12);
    }

    #[test]
    fn ema_alpha_bounds() {
        assert!(ExponentialSmoother::new(0.0).is_err());
        assert!(ExponentialSmoother::new(1.0).is_ok());
        assert!(ExponentialSmoother::new(f64::NAN).is_err());
    }

    #[test]
    fn smoother_dispatch() {
        let mut s = Smoother::from_kind(SmootherKind::Window { capacity: 2 }).unwrap();
        s.smooth(2.0);
        assert_eq!(s.smooth(4.0), 3.0);
        assert_eq!(s.smooth(6.0), 5.0);
    }
}
