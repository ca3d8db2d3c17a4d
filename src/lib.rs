//! Synheart Focus - On-device attention estimation from facial landmarks
//!
//! Focus turns a stream of face-mesh landmark frames into a live focus score
//! and per-question difficulty estimates through a deterministic pipeline:
//! geometry extraction → frame classification → temporal debouncing →
//! session aggregation → difficulty estimation.
//!
//! ## Modules
//!
//! - **Live Pipeline**: Feed frames to a [`FocusProcessor`] and read [`LiveStatus`] snapshots
//! - **Replay**: Run a recorded `focus.tracker_event.v1` stream through [`replay_to_report`]

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod debouncer;
pub mod difficulty;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod testing;

pub use config::{BlinkPolicy, ConfigError, QuestionReentry, TrackerConfig};
pub use encoder::FocusReportEncoder;
pub use error::FocusError;
pub use pipeline::{
    replay_events, replay_to_report, EventOutcome, FocusProcessor, FrameOutcome, SkipReason,
};
pub use types::{
    Difficulty, DifficultyInsights, FocusReport, FocusState, GazeDirection, HeadPose, Landmark,
    LandmarkFrame, LiveStatus, QuestionFocus, SessionSummary, TimestampMs,
};

// Schema exports
pub use schema::{TrackerEvent, TrackerEventAdapter, SCHEMA_VERSION};

/// Focus version embedded in all session reports
pub const FOCUS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session reports
pub const PRODUCER_NAME: &str = "synheart-focus";
