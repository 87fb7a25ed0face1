use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{HEAD_TURN_FORWARD, STATUS_NO_STATUS, UNKNOWN_SUBJECT};
use crate::inference::aggregator::{SessionAggregator, SessionSummary};
use crate::inference::blink::{BlinkCounter, BlinkSummary};
use crate::inference::classifier::{Classification, ConditionTracker, StateClassifier};
use crate::inference::config::InferenceConfig;
use crate::inference::error::{InferenceError, SkipReason};
use crate::inference::geometry::{extract_metrics, REQUIRED_LANDMARKS};
use crate::inference::identity::{AttendanceReport, AttendanceRoster, GalleryStore, IdentityMatcher};
use crate::inference::monitoring::{self, FrameQuality};
use crate::inference::signal::SignalBank;
use crate::inference::types::{FaceObservation, FrameMetrics, FrameObservation, Signal, StatusRecord};

/// Per-subject pipeline state; owned by one session, never shared.
#[derive(Debug, Clone)]
pub struct SubjectState {
    bank: SignalBank,
    tracker: ConditionTracker,
    blinks: BlinkCounter,
    last_status: Option<String>,
}

impl SubjectState {
    fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        Ok(Self {
            bank: SignalBank::new(config)?,
            tracker: ConditionTracker::default(),
            blinks: BlinkCounter::new(&config.blink),
            last_status: None,
        })
    }

    pub fn is_calibrated(&self) -> bool {
        self.bank.is_calibrated()
    }

    pub fn baseline(&self, signal: Signal) -> Option<f64> {
        self.bank.baseline(signal)
    }

    pub fn episodes(&self) -> BTreeMap<String, u32> {
        self.tracker.episodes()
    }

    pub fn blinks(&self) -> BlinkSummary {
        self.blinks.summary()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: SessionSummary,
    pub quality: FrameQuality,
    /// subject id → condition → confirmed episodes
    pub episodes: BTreeMap<String, BTreeMap<String, u32>>,
    /// subject id → blink count and rate
    pub blinks: BTreeMap<String, BlinkSummary>,
    pub attendance: AttendanceReport,
}

pub struct SessionEngine {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    config: InferenceConfig,
    classifier: StateClassifier,
    gallery: Arc<GalleryStore>,
    subject_template: SubjectState,
    subjects: HashMap<String, SubjectState>,
    aggregator: SessionAggregator,
    quality: FrameQuality,
    roster: AttendanceRoster,
    empty_gallery_logged: bool,
}

impl SessionEngine {
    pub fn new(config: InferenceConfig, gallery: Arc<GalleryStore>) -> Result<Self, InferenceError> {
        let classifier = StateClassifier::new(&config)?;
        let subject_template = SubjectState::new(&config)?;
        let session_id = Uuid::new_v4();
        tracing::info!(
            session_id = %session_id,
            calibration_frames = config.calibration.frames,
            conditions = config.conditions.len(),
            "Inference session started"
        );
        Ok(Self {
            session_id,
            started_at: Utc::now(),
            config,
            classifier,
            gallery,
            subject_template,
            subjects: HashMap::new(),
            aggregator: SessionAggregator::new(),
            quality: FrameQuality::default(),
            roster: AttendanceRoster::default(),
            empty_gallery_logged: false,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectState> {
        self.subjects.get(subject_id)
    }

    pub fn quality(&self) -> &FrameQuality {
        &self.quality
    }

    pub fn summary(&self) -> SessionSummary {
        self.aggregator.finalize()
    }

    /// One record per face, in input order.
    pub fn process_frame(&mut self, frame: &FrameObservation) -> Vec<StatusRecord> {
        self.quality.frames_processed += 1;
        if frame.faces.is_empty() {
            self.quality.empty_frames += 1;
            return Vec::new();
        }

        let matcher = self
            .gallery
            .matcher(self.config.identity.similarity_threshold);

        frame
            .faces
            .iter()
            .map(|face| self.process_face(&matcher, frame, face))
            .collect()
    }

    fn process_face(
        &mut self,
        matcher: &IdentityMatcher,
        frame: &FrameObservation,
        face: &FaceObservation,
    ) -> StatusRecord {
        let (name, similarity) = self.identify(matcher, face);

        let extracted = match &face.landmarks {
            Some(points) => extract_metrics(points, frame.frame_size),
            None => Err(InferenceError::MissingLandmarks {
                required: REQUIRED_LANDMARKS,
                available: 0,
            }),
        };

        match extracted {
            Ok(metrics) => {
                let mut record =
                    self.observe_metrics(&face.subject_id, &name, frame.timestamp, metrics);
                record.similarity = similarity;
                record
            }
            Err(e) => {
                let reason = e.skip_reason().unwrap_or(SkipReason::MissingLandmarks);
                self.quality.record_skip(reason);
                tracing::debug!(
                    subject_id = %face.subject_id,
                    reason = reason.as_str(),
                    error = %e,
                    "Face skipped"
                );
                let mut record = no_status_record(&face.subject_id, &name, frame.timestamp);
                record.similarity = similarity;
                record
            }
        }
    }

    fn identify(
        &mut self,
        matcher: &IdentityMatcher,
        face: &FaceObservation,
    ) -> (String, Option<f32>) {
        let Some(embedding) = &face.embedding else {
            return (UNKNOWN_SUBJECT.to_string(), None);
        };
        match matcher.best_match(embedding) {
            Ok(m) => {
                self.roster.record(&m);
                (m.name, Some(m.similarity))
            }
            Err(InferenceError::EmptyGallery) => {
                // 空图库每帧每张脸都会命中，只告警一次
                if !self.empty_gallery_logged {
                    self.empty_gallery_logged = true;
                    tracing::warn!(
                        session_id = %self.session_id,
                        "Gallery is empty, every face resolves to unknown"
                    );
                } else {
                    tracing::debug!(subject_id = %face.subject_id, "Gallery is empty");
                }
                (UNKNOWN_SUBJECT.to_string(), None)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    subject_id = %face.subject_id,
                    error = %e,
                    "Identity match failed, using unknown"
                );
                (UNKNOWN_SUBJECT.to_string(), None)
            }
        }
    }

    /// Metric-level entry point: smooth, calibrate, classify, aggregate.
    pub fn observe_metrics(
        &mut self,
        subject_id: &str,
        subject_name: &str,
        timestamp: DateTime<Utc>,
        metrics: FrameMetrics,
    ) -> StatusRecord {
        let violations = monitoring::report_invariants(subject_id, &metrics);
        if !violations.is_empty() {
            self.quality.invariant_violations += 1;
        }
        if violations.iter().any(|v| v.is_non_finite()) {
            // NaN 会污染平滑窗口和基线，整帧丢弃
            self.quality.record_skip(SkipReason::NonFiniteMetrics);
            tracing::debug!(subject_id, "Face skipped, non-finite metrics");
            return no_status_record(subject_id, subject_name, timestamp);
        }

        let state = self
            .subjects
            .entry(subject_id.to_string())
            .or_insert_with(|| self.subject_template.clone());

        state.blinks.update(metrics.eye_aspect_ratio, timestamp);

        let frame = state.bank.observe(&metrics);
        let classification = if frame.calibrated {
            self.classifier
                .classify(&mut state.tracker, &state.bank, &frame.smoothed, timestamp)
        } else {
            Classification::calibrating()
        };

        if state.last_status.as_deref() != Some(classification.main_status.as_str()) {
            tracing::debug!(
                subject_id,
                from = state.last_status.as_deref().unwrap_or("-"),
                to = %classification.main_status,
                "Status changed"
            );
            state.last_status = Some(classification.main_status.clone());
        }

        if frame.calibrated {
            self.quality.classified_records += 1;
            self.aggregator
                .record_status(subject_name, &classification.main_status);
        } else {
            self.quality.calibrating_records += 1;
        }

        StatusRecord {
            subject_id: subject_id.to_string(),
            subject_name: subject_name.to_string(),
            timestamp,
            main_status: classification.main_status,
            head_pose: classification.head_pose,
            head_turn: classification.head_turn,
            metrics_snapshot: Some(frame.smoothed),
            similarity: None,
        }
    }

    /// Safe to call repeatedly; each call reflects the counters at that moment.
    pub fn finish(&self) -> SessionReport {
        let episodes = self
            .subjects
            .iter()
            .map(|(id, s)| (id.clone(), s.episodes()))
            .collect();
        let blinks = self
            .subjects
            .iter()
            .map(|(id, s)| (id.clone(), s.blinks()))
            .collect();
        let attendance = self.roster.report(&self.gallery.snapshot());
        let report = SessionReport {
            session_id: self.session_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            summary: self.aggregator.finalize(),
            quality: self.quality.clone(),
            episodes,
            blinks,
            attendance,
        };
        tracing::info!(
            session_id = %self.session_id,
            frames = report.quality.frames_processed,
            subjects = report.summary.len(),
            present = report.attendance.present_count,
            skip_ratio = report.quality.skip_ratio(),
            "Inference session finished"
        );
        report
    }
}

fn no_status_record(subject_id: &str, subject_name: &str, timestamp: DateTime<Utc>) -> StatusRecord {
    StatusRecord {
        subject_id: subject_id.to_string(),
        subject_name: subject_name.to_string(),
        timestamp,
        main_status: STATUS_NO_STATUS.to_string(),
        head_pose: STATUS_NO_STATUS.to_string(),
        head_turn: HEAD_TURN_FORWARD.to_string(),
        metrics_snapshot: None,
        similarity: None,
    }
}
