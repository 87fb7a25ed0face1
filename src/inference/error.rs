use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("missing landmarks: need {required} points, got {available}")]
    MissingLandmarks { required: usize, available: usize },
    #[error("degenerate reference distance: {reference}")]
    DegenerateReference { reference: &'static str },
    #[error("gallery is empty")]
    EmptyGallery,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    InvalidEmbeddingDimension { expected: usize, actual: usize },
    #[error("embedding contains non-finite values")]
    NonFiniteEmbedding,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InferenceError {
    /// 跳帧原因，用于质量统计
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::MissingLandmarks { .. } => Some(SkipReason::MissingLandmarks),
            Self::DegenerateReference { .. } => Some(SkipReason::DegenerateReference),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingLandmarks,
    DegenerateReference,
    NonFiniteMetrics,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingLandmarks => "missing_landmarks",
            Self::DegenerateReference => "degenerate_reference",
            Self::NonFiniteMetrics => "non_finite_metrics",
        }
    }
}
