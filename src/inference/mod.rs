pub mod aggregator;
pub mod blink;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod monitoring;
pub mod signal;
pub mod smoothing;
pub mod types;

pub use config::InferenceConfig;
pub use engine::{SessionEngine, SessionReport};
pub use error::InferenceError;
pub use identity::{Gallery, GalleryStore, IdentityMatcher};
pub use types::{FaceObservation, FrameMetrics, FrameObservation, FrameSize, Point, Signal, StatusRecord};
