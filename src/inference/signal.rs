use std::collections::BTreeMap;

use crate::inference::calibration::Calibrator;
use crate::inference::config::InferenceConfig;
use crate::inference::error::InferenceError;
use crate::inference::smoothing::Smoother;
use crate::inference::types::{FrameMetrics, Signal};

/// Smoother + calibrator for a single signal of a single subject.
#[derive(Debug, Clone)]
pub struct SignalChannel {
    smoother: Smoother,
    calibrator: Calibrator,
}

impl SignalChannel {
    pub fn new(smoother: Smoother, calibrator: Calibrator) -> Self {
        Self {
            smoother,
            calibrator,
        }
    }

    pub fn observe(&mut self, raw: f64) -> f64 {
        let smoothed = self.smoother.smooth(raw);
        self.calibrator.observe(smoothed);
        smoothed
    }

    pub fn baseline(&self) -> Option<f64> {
        self.calibrator.baseline()
    }
}

/// Output of one [`SignalBank::observe`] call.
#[derive(Debug, Clone, Copy)]
pub struct SignalFrame {
    pub smoothed: FrameMetrics,
    /// `false` up to and including the frame that closes calibration.
    pub calibrated: bool,
}

#[derive(Debug, Clone)]
pub struct SignalBank {
    channels: BTreeMap<Signal, SignalChannel>,
}

impl SignalBank {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let mut channels = BTreeMap::new();
        for signal in Signal::ALL {
            let smoother = Smoother::from_kind(config.smoothing.smoother_for(signal))?;
            let calibrator = Calibrator::new(config.calibration.frames, config.calibration.policy)?;
            channels.insert(signal, SignalChannel::new(smoother, calibrator));
        }
        Ok(Self { channels })
    }

    pub fn observe(&mut self, metrics: &FrameMetrics) -> SignalFrame {
        let calibrated = self.is_calibrated();
        let mut smoothed = FrameMetrics::default();
        for (signal, channel) in self.channels.iter_mut() {
            smoothed.set(*signal, channel.observe(metrics.get(*signal)));
        }
        SignalFrame {
            smoothed,
            calibrated,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.channels.values().all(|c| c.baseline().is_some())
    }

    pub fn baseline(&self, signal: Signal) -> Option<f64> {
        self.channels.get(&signal).and_then(SignalChannel::baseline)
    }

    pub fn baselines(&self) -> BTreeMap<Signal, f64> {
        self.channels
            .iter()
            .filter_map(|(s, c)| c.baseline().map(|b| (*s, b)))
            .collect()
    }
}
