use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized 2-D landmark produced by the external face-mesh detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    EyebrowRatio,
    GlabellaRatio,
    AsymmetryRatio,
    EyeAspectRatio,
    VerticalHeadRatio,
    MouthApertureRatio,
    HeadTurnRatio,
    MouthAngleDegrees,
    HeadTiltDegrees,
}

impl Signal {
    pub const ALL: [Signal; 9] = [
        Signal::EyebrowRatio,
        Signal::GlabellaRatio,
        Signal::AsymmetryRatio,
        Signal::EyeAspectRatio,
        Signal::VerticalHeadRatio,
        Signal::MouthApertureRatio,
        Signal::HeadTurnRatio,
        Signal::MouthAngleDegrees,
        Signal::HeadTiltDegrees,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EyebrowRatio => "eyebrowRatio",
            Self::GlabellaRatio => "glabellaRatio",
            Self::AsymmetryRatio => "asymmetryRatio",
            Self::EyeAspectRatio => "eyeAspectRatio",
            Self::VerticalHeadRatio => "verticalHeadRatio",
            Self::MouthApertureRatio => "mouthApertureRatio",
            Self::HeadTurnRatio => "headTurnRatio",
            Self::MouthAngleDegrees => "mouthAngleDegrees",
            Self::HeadTiltDegrees => "headTiltDegrees",
        }
    }

    /// Distance ratios are non-negative; turn ratio and angles are signed.
    pub fn is_distance_ratio(self) -> bool {
        !matches!(
            self,
            Self::HeadTurnRatio | Self::MouthAngleDegrees | Self::HeadTiltDegrees
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetrics {
    pub eyebrow_ratio: f64,
    pub glabella_ratio: f64,
    pub asymmetry_ratio: f64,
    pub eye_aspect_ratio: f64,
    pub vertical_head_ratio: f64,
    pub mouth_aperture_ratio: f64,
    pub head_turn_ratio: f64,
    pub mouth_angle_degrees: f64,
    #[serde(default)]
    pub head_tilt_degrees: f64,
}

impl FrameMetrics {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::EyebrowRatio => self.eyebrow_ratio,
            Signal::GlabellaRatio => self.glabella_ratio,
            Signal::AsymmetryRatio => self.asymmetry_ratio,
            Signal::EyeAspectRatio => self.eye_aspect_ratio,
            Signal::VerticalHeadRatio => self.vertical_head_ratio,
            Signal::MouthApertureRatio => self.mouth_aperture_ratio,
            Signal::HeadTurnRatio => self.head_turn_ratio,
            Signal::MouthAngleDegrees => self.mouth_angle_degrees,
            Signal::HeadTiltDegrees => self.head_tilt_degrees,
        }
    }

    pub fn set(&mut self, signal: Signal, value: f64) {
        match signal {
            Signal::EyebrowRatio => self.eyebrow_ratio = value,
            Signal::GlabellaRatio => self.glabella_ratio = value,
            Signal::AsymmetryRatio => self.asymmetry_ratio = value,
            Signal::EyeAspectRatio => self.eye_aspect_ratio = value,
            Signal::VerticalHeadRatio => self.vertical_head_ratio = value,
            Signal::MouthApertureRatio => self.mouth_aperture_ratio = value,
            Signal::HeadTurnRatio => self.head_turn_ratio = value,
            Signal::MouthAngleDegrees => self.mouth_angle_degrees = value,
            Signal::HeadTiltDegrees => self.head_tilt_degrees = value,
        }
    }
}

/// One detected face as handed over by the external detector/embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    pub subject_id: String,
    /// `None` when the landmark detector found nothing for this face region.
    #[serde(default)]
    pub landmarks: Option<Vec<Point>>,
    /// L2-normalized identity embedding.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameObservation {
    pub timestamp: DateTime<Utc>,
    pub frame_size: FrameSize,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub subject_id: String,
    pub subject_name: String,
    pub timestamp: DateTime<Utc>,
    pub main_status: String,
    pub head_pose: String,
    pub head_turn: String,
    pub metrics_snapshot: Option<FrameMetrics>,
    #[serde(default)]
    pub similarity: Option<f32>,
}
