//! 几何指标提取
//!
//! 将单张人脸的归一化关键点（478 点 face mesh 布局）投影到像素坐标，
//! 计算与人脸尺度、拍摄距离无关的比例指标。每个距离比例都除以同一张脸上的
//! 参考距离（两眼虹膜间距、两耳间距等），角度指标以度为单位。

use crate::constants::MIN_REFERENCE_DISTANCE;
use crate::inference::error::InferenceError;
use crate::inference::types::{FrameMetrics, FrameSize, Point};

const NOSE_TIP: usize = 4;
const FOREHEAD: usize = 10;
const CHIN: usize = 152;
const NOSE_ROOT: usize = 168;
const UPPER_LIP: usize = 13;
const LOWER_LIP: usize = 14;
const MOUTH_LEFT: usize = 61;
const MOUTH_RIGHT: usize = 291;
const LEFT_EAR: usize = 234;
const RIGHT_EAR: usize = 454;
const LEFT_IRIS: usize = 468;
const RIGHT_IRIS: usize = 473;
const LEFT_BROW_INNER: usize = 107;
const RIGHT_BROW_INNER: usize = 336;
const LEFT_BROW_MIDDLE: usize = 105;
const RIGHT_BROW_MIDDLE: usize = 334;
const GLABELLA: [usize; 5] = [9, 55, 285, 168, 8];
const LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
const RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Highest index used above, plus one.
pub const REQUIRED_LANDMARKS: usize = RIGHT_IRIS + 1;

/// Below this vertical tilt the eye-line angle is used instead.
const VERTICAL_TILT_SWITCH_DEGREES: f64 = 10.0;
const EYE_LINE_TILT_WEIGHT: f64 = 0.7;
const MIN_BROW_HEIGHT: f64 = 0.001;

struct Projected<'a> {
    landmarks: &'a [Point],
    size: FrameSize,
}

impl Projected<'_> {
    fn px(&self, idx: usize) -> Point {
        let p = self.landmarks[idx];
        Point::new(p.x * self.size.width, p.y * self.size.height)
    }

    fn dist(&self, a: usize, b: usize) -> f64 {
        self.px(a).distance(&self.px(b))
    }
}

fn reference(value: f64, name: &'static str) -> Result<f64, InferenceError> {
    if !value.is_finite() || value < MIN_REFERENCE_DISTANCE {
        return Err(InferenceError::DegenerateReference { reference: name });
    }
    Ok(value)
}

/// Computes every [`FrameMetrics`] field for one face.
///
/// Fails with `MissingLandmarks` when the point set is too short or contains
/// non-finite coordinates, and with `DegenerateReference` when any reference
/// distance collapses; callers skip the face for this frame.
pub fn extract_metrics(
    landmarks: &[Point],
    frame_size: FrameSize,
) -> Result<FrameMetrics, InferenceError> {
    if landmarks.len() < REQUIRED_LANDMARKS {
        return Err(InferenceError::MissingLandmarks {
            required: REQUIRED_LANDMARKS,
            available: landmarks.len(),
        });
    }
    if landmarks.iter().any(|p| !p.is_finite()) {
        return Err(InferenceError::MissingLandmarks {
            required: REQUIRED_LANDMARKS,
            available: landmarks.iter().filter(|p| p.is_finite()).count(),
        });
    }
    reference(frame_size.width, "frame_width")?;
    reference(frame_size.height, "frame_height")?;

    let face = Projected {
        landmarks,
        size: frame_size,
    };

    let eye_distance = reference(face.dist(LEFT_IRIS, RIGHT_IRIS), "inter_iris")?;
    let ear_distance = reference(face.dist(LEFT_EAR, RIGHT_EAR), "inter_ear")?;
    let chin_to_nose = reference(face.dist(CHIN, NOSE_TIP), "chin_to_nose")?;

    let eyebrow_ratio = face.dist(LEFT_BROW_INNER, RIGHT_BROW_INNER) / eye_distance;

    let glabella_ratio = GLABELLA
        .iter()
        .map(|&idx| face.dist(idx, NOSE_ROOT) / eye_distance)
        .sum::<f64>()
        / GLABELLA.len() as f64;

    let left_brow = face.dist(LEFT_BROW_MIDDLE, NOSE_ROOT) / eye_distance;
    let right_brow = face.dist(RIGHT_BROW_MIDDLE, NOSE_ROOT) / eye_distance;
    let asymmetry_ratio =
        (left_brow - right_brow).abs() / left_brow.max(right_brow).max(MIN_BROW_HEIGHT);

    let left_ear = eye_aspect_ratio(&face, &LEFT_EYE)?;
    let right_ear = eye_aspect_ratio(&face, &RIGHT_EYE)?;
    let eye_aspect_ratio = (left_ear + right_ear) / 2.0;

    let vertical_head_ratio = face.dist(NOSE_TIP, FOREHEAD) / chin_to_nose;
    let mouth_aperture_ratio = face.dist(UPPER_LIP, LOWER_LIP) / ear_distance;

    let head_turn_ratio = head_turn_ratio(&face)?;
    let mouth_angle_degrees = mouth_angle(&face)?;
    let head_tilt_degrees = head_tilt(&face);

    Ok(FrameMetrics {
        eyebrow_ratio,
        glabella_ratio,
        asymmetry_ratio,
        eye_aspect_ratio,
        vertical_head_ratio,
        mouth_aperture_ratio,
        head_turn_ratio,
        mouth_angle_degrees,
        head_tilt_degrees,
    })
}

/// EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)
fn eye_aspect_ratio(face: &Projected<'_>, eye: &[usize; 6]) -> Result<f64, InferenceError> {
    let horizontal = reference(face.dist(eye[0], eye[3]), "eye_width")?;
    let vertical = face.dist(eye[1], eye[5]) + face.dist(eye[2], eye[4]);
    Ok(vertical / (2.0 * horizontal))
}

fn head_turn_ratio(face: &Projected<'_>) -> Result<f64, InferenceError> {
    let nose = face.px(NOSE_TIP);
    let to_left = (nose.x - face.px(LEFT_EAR).x).abs();
    let to_right = (nose.x - face.px(RIGHT_EAR).x).abs();
    let span = reference(to_left + to_right, "nose_to_ears")?;
    Ok((to_right - to_left) / span)
}

/// Mouth-corner angle in a face-local frame, so head roll does not leak in.
fn mouth_angle(face: &Projected<'_>) -> Result<f64, InferenceError> {
    let origin = face.px(NOSE_TIP);
    let left_eye = face.px(LEFT_IRIS);
    let right_eye = face.px(RIGHT_IRIS);
    let forehead = face.px(FOREHEAD);

    let x_axis = (right_eye.x - left_eye.x, right_eye.y - left_eye.y);
    let x_norm_sq = x_axis.0 * x_axis.0 + x_axis.1 * x_axis.1;
    reference(x_norm_sq.sqrt(), "eye_axis")?;

    let raw_y = (forehead.x - origin.x, forehead.y - origin.y);
    let proj = (raw_y.0 * x_axis.0 + raw_y.1 * x_axis.1) / x_norm_sq;
    let y_axis = (raw_y.0 - proj * x_axis.0, raw_y.1 - proj * x_axis.1);
    let y_norm = reference((y_axis.0 * y_axis.0 + y_axis.1 * y_axis.1).sqrt(), "face_axis")?;
    let x_norm = x_norm_sq.sqrt();

    let to_local = |p: Point| {
        let v = (p.x - origin.x, p.y - origin.y);
        (
            (v.0 * x_axis.0 + v.1 * x_axis.1) / x_norm,
            (v.0 * y_axis.0 + v.1 * y_axis.1) / y_norm,
        )
    };

    let left = to_local(face.px(MOUTH_LEFT));
    let right = to_local(face.px(MOUTH_RIGHT));
    Ok((right.1 - left.1).atan2(right.0 - left.0).to_degrees())
}

/// Positive = rightward tilt.
fn head_tilt(face: &Projected<'_>) -> f64 {
    let nose = face.px(NOSE_TIP);
    let forehead = face.px(FOREHEAD);
    let vertical = wrap_degrees((nose.y - forehead.y).atan2(nose.x - forehead.x).to_degrees() - 90.0);
    if vertical.abs() > VERTICAL_TILT_SWITCH_DEGREES {
        return vertical;
    }

    let left_eye = face.px(LEFT_IRIS);
    let right_eye = face.px(RIGHT_IRIS);
    let eye_line = (right_eye.y - left_eye.y)
        .atan2(right_eye.x - left_eye.x)
        .to_degrees();
    eye_line * EYE_LINE_TILT_WEIGHT
}

fn wrap_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}
