//! focus.tracker_event.v1 schema definition
//!
//! A recorded tracker session is a stream of events:
//! - Landmark frames (or `null` landmarks when no face was detected)
//! - Question start markers with optional opaque metadata
//! - Question end markers

use crate::types::{LandmarkFrame, TimestampMs};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "focus.tracker_event.v1";

/// Type of record contained in the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Frame,
    QuestionStart,
    QuestionEnd,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Frame => "frame",
            RecordType::QuestionStart => "question_start",
            RecordType::QuestionEnd => "question_end",
        }
    }
}

/// One camera frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FramePayload {
    /// Face mesh landmarks; `None` when no face was detected
    pub landmarks: Option<LandmarkFrame>,
}

/// Marks the start of a question interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStartPayload {
    pub question_id: String,
    /// Opaque caller data carried into the question's entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Marks the end of the open question interval
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionEndPayload {
    /// Informational; the open question is closed regardless
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// Event payload - one of the three record types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Frame { frame: FramePayload },
    QuestionStart { question_start: QuestionStartPayload },
    QuestionEnd { question_end: QuestionEndPayload },
}

/// The main focus.tracker_event.v1 schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// Schema version identifier
    pub schema_version: String,
    /// Unique event identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Caller clock time in milliseconds
    pub timestamp_ms: TimestampMs,
    /// Type of record
    pub record_type: RecordType,
    /// Event payload (depends on record_type)
    pub payload: Payload,
}

impl TrackerEvent {
    fn with_payload(timestamp_ms: TimestampMs, record_type: RecordType, payload: Payload) -> Self {
        TrackerEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            event_id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp_ms,
            record_type,
            payload,
        }
    }

    /// Create a frame event; `None` records a frame without a detected face
    pub fn frame(timestamp_ms: TimestampMs, landmarks: Option<LandmarkFrame>) -> Self {
        Self::with_payload(
            timestamp_ms,
            RecordType::Frame,
            Payload::Frame {
                frame: FramePayload { landmarks },
            },
        )
    }

    /// Create a question start event
    pub fn question_start(
        timestamp_ms: TimestampMs,
        question_id: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self::with_payload(
            timestamp_ms,
            RecordType::QuestionStart,
            Payload::QuestionStart {
                question_start: QuestionStartPayload {
                    question_id: question_id.into(),
                    metadata,
                },
            },
        )
    }

    /// Create a question end event
    pub fn question_end(timestamp_ms: TimestampMs) -> Self {
        Self::with_payload(
            timestamp_ms,
            RecordType::QuestionEnd,
            Payload::QuestionEnd {
                question_end: QuestionEndPayload::default(),
            },
        )
    }

    /// Validate the event schema.
    ///
    /// Landmark coordinates are not inspected here; a frame with bad points is
    /// still a well-formed event and is skipped by the pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.timestamp_ms < 0 {
            return Err(ValidationError::NegativeTimestamp(self.timestamp_ms));
        }

        match (self.record_type, &self.payload) {
            (RecordType::Frame, Payload::Frame { .. }) => Ok(()),
            (RecordType::QuestionStart, Payload::QuestionStart { question_start }) => {
                if question_start.question_id.trim().is_empty() {
                    Err(ValidationError::EmptyQuestionId)
                } else {
                    Ok(())
                }
            }
            (RecordType::QuestionEnd, Payload::QuestionEnd { .. }) => Ok(()),
            _ => Err(ValidationError::PayloadTypeMismatch {
                record_type: self.record_type.as_str().to_string(),
                payload_type: self.payload_type_name().to_string(),
            }),
        }
    }

    /// Check that every landmark of a frame event has finite coordinates
    pub fn validate_landmarks(&self) -> Result<(), ValidationError> {
        match &self.payload {
            Payload::Frame { frame } => validate_frame(frame),
            _ => Ok(()),
        }
    }

    fn payload_type_name(&self) -> &'static str {
        match &self.payload {
            Payload::Frame { .. } => "frame",
            Payload::QuestionStart { .. } => "question_start",
            Payload::QuestionEnd { .. } => "question_end",
        }
    }
}

fn validate_frame(frame: &FramePayload) -> Result<(), ValidationError> {
    let Some(landmarks) = &frame.landmarks else {
        return Ok(());
    };
    match landmarks.points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(ValidationError::NonFiniteLandmark(index)),
        None => Ok(()),
    }
}

/// Validation errors for tracker events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Payload type mismatch: record_type is {record_type} but payload is {payload_type}")]
    PayloadTypeMismatch {
        record_type: String,
        payload_type: String,
    },

    #[error("Negative timestamp: {0}")]
    NegativeTimestamp(TimestampMs),

    #[error("Question start has an empty question_id")]
    EmptyQuestionId,

    #[error("Landmark {0} has non-finite coordinates")]
    NonFiniteLandmark(usize),
}
