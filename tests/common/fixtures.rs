use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use classroom_vision::inference::identity::GalleryEntry;
use classroom_vision::inference::{
    FaceObservation, FrameMetrics, FrameObservation, FrameSize, Gallery, GalleryStore,
    InferenceConfig, Point, SessionEngine,
};

pub const FRAME_STEP_MS: i64 = 40;

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
}

/// Frontal, symmetric 478-point face roughly centered in the frame.
pub fn sample_face() -> Vec<Point> {
    let mut points = vec![Point::new(0.5, 0.5); 478];
    let coords: &[(usize, f64, f64)] = &[
        (10, 0.50, 0.20),
        (9, 0.50, 0.30),
        (8, 0.50, 0.33),
        (55, 0.47, 0.32),
        (285, 0.53, 0.32),
        (168, 0.50, 0.35),
        (107, 0.47, 0.31),
        (336, 0.53, 0.31),
        (105, 0.42, 0.30),
        (334, 0.58, 0.30),
        (468, 0.42, 0.38),
        (473, 0.58, 0.38),
        (33, 0.37, 0.38),
        (160, 0.40, 0.36),
        (158, 0.43, 0.36),
        (133, 0.46, 0.38),
        (153, 0.43, 0.40),
        (144, 0.40, 0.40),
        (362, 0.54, 0.38),
        (385, 0.57, 0.36),
        (387, 0.60, 0.36),
        (263, 0.63, 0.38),
        (373, 0.60, 0.40),
        (380, 0.57, 0.40),
        (4, 0.50, 0.50),
        (152, 0.50, 0.75),
        (13, 0.50, 0.60),
        (14, 0.50, 0.61),
        (61, 0.45, 0.62),
        (291, 0.55, 0.62),
        (234, 0.30, 0.45),
        (454, 0.70, 0.45),
    ];
    for &(idx, x, y) in coords {
        points[idx] = Point::new(x, y);
    }
    points
}

pub fn neutral_metrics() -> FrameMetrics {
    FrameMetrics {
        eyebrow_ratio: 0.40,
        glabella_ratio: 0.30,
        asymmetry_ratio: 0.01,
        eye_aspect_ratio: 0.30,
        vertical_head_ratio: 1.20,
        mouth_aperture_ratio: 0.05,
        head_turn_ratio: 0.0,
        mouth_angle_degrees: 0.0,
        head_tilt_degrees: 0.0,
    }
}

pub fn entry(name: &str, embedding: &[f32]) -> GalleryEntry {
    GalleryEntry {
        name: name.to_string(),
        embedding: embedding.to_vec(),
    }
}

pub fn store(entries: Vec<GalleryEntry>) -> Arc<GalleryStore> {
    Arc::new(GalleryStore::new(Gallery::new(entries).expect("valid gallery")))
}

pub fn engine(config: InferenceConfig, entries: Vec<GalleryEntry>) -> SessionEngine {
    SessionEngine::new(config, store(entries)).expect("valid engine")
}

pub fn face(subject_id: &str, landmarks: Option<Vec<Point>>, embedding: Option<&[f32]>) -> FaceObservation {
    FaceObservation {
        subject_id: subject_id.to_string(),
        landmarks,
        embedding: embedding.map(<[f32]>::to_vec),
    }
}

pub fn frame(index: i64, faces: Vec<FaceObservation>) -> FrameObservation {
    FrameObservation {
        timestamp: at(index * FRAME_STEP_MS),
        frame_size: FrameSize::new(640.0, 480.0),
        faces,
    }
}
