//! Error types for Synheart Focus

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur while tracking focus
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Failed to parse tracker input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed landmark frame: {0}")]
    MalformedFrame(String),

    #[error("Frame out of order: timestamp {timestamp_ms} precedes last processed {last_ms}")]
    OutOfOrderFrame { timestamp_ms: i64, last_ms: i64 },

    #[error("Tracking is not active")]
    NotTracking,

    #[error("Question {open} is still open; end it before starting {requested}")]
    QuestionAlreadyOpen { open: String, requested: String },

    #[error("Question {0} already has a recorded focus entry")]
    DuplicateQuestion(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
