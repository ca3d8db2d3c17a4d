//! Core types for the Synheart Focus pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: landmark frames, geometric signals, per-frame classifications,
//! debounced focus state, and session/question summaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller clock timestamp in milliseconds.
///
/// The epoch is whatever the caller's clock uses; only differences matter.
pub type TimestampMs = i64;

/// A single facial landmark in normalized image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position (0 = left edge, 1 = right edge)
    pub x: f64,
    /// Vertical position (0 = top edge, 1 = bottom edge)
    pub y: f64,
    /// Optional depth proxy (same scale as x)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_depth(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Euclidean distance; a missing depth counts as zero
    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// One camera frame worth of landmarks, index-stable across frames
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    pub points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }
}

/// Eye aspect ratio for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeAspectRatio {
    pub left: f64,
    pub right: f64,
    pub average: f64,
}

/// Signed, scale-invariant iris deviation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeDeviation {
    /// Positive = iris shifted toward image right
    pub horizontal: f64,
    /// Positive = iris shifted down
    pub vertical: f64,
}

/// Nose-tip offset relative to the face outline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadOffset {
    /// Yaw proxy, normalized by face width
    pub horizontal: f64,
    /// Pitch proxy, normalized by face height
    pub vertical: f64,
}

/// Geometric signals extracted from a single landmark frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSignals {
    pub ear: EyeAspectRatio,
    pub gaze: GazeDeviation,
    pub head: HeadOffset,
}

/// Coarse gaze direction label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeDirection {
    #[default]
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl GazeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeDirection::Center => "center",
            GazeDirection::Left => "left",
            GazeDirection::Right => "right",
            GazeDirection::Up => "up",
            GazeDirection::Down => "down",
        }
    }
}

/// Coarse head pose label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadPose {
    #[default]
    Forward,
    TurnedLeft,
    TurnedRight,
    TiltedUp,
    TiltedDown,
}

impl HeadPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadPose::Forward => "forward",
            HeadPose::TurnedLeft => "turned-left",
            HeadPose::TurnedRight => "turned-right",
            HeadPose::TiltedUp => "tilted-up",
            HeadPose::TiltedDown => "tilted-down",
        }
    }
}

/// Gaze vector for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeVector {
    pub horizontal: f64,
    pub vertical: f64,
    pub direction: GazeDirection,
    /// Combined per-frame decision (gaze, head pose and blink)
    pub looking_at_target: bool,
}

/// Full per-frame classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameClassification {
    pub gaze: GazeVector,
    pub head_pose: HeadPose,
    pub blinking: bool,
    pub signals: FrameSignals,
}

impl FrameClassification {
    pub fn looking_at_target(&self) -> bool {
        self.gaze.looking_at_target
    }
}

/// Debounced focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    #[default]
    Focused,
    /// Look-away confirmed by frame count, grace period still running
    PendingAway,
    Unfocused,
}

impl FocusState {
    /// A pending look-away still counts as focused
    pub fn is_focused(&self) -> bool {
        !matches!(self, FocusState::Unfocused)
    }
}

/// Per-question difficulty label, ordered easy < normal < hard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

/// Read-only status published after every frame pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    /// 0-100; 0 until the warm-up frame count is exceeded
    pub average_focus_score: u8,
    /// False while the score is still warming up
    pub score_ready: bool,
    pub is_focused: bool,
    pub focus_state: FocusState,
    /// None when the last frame had no detected face
    pub gaze_direction: Option<GazeDirection>,
    pub head_pose: Option<HeadPose>,
    pub look_away_count: u32,
    pub total_frames: u64,
}

/// Focus statistics recorded for one completed question interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFocus {
    pub question_id: String,
    /// Percentage of focused samples within the interval (0-100)
    pub focus_score: f64,
    /// Elapsed caller-clock time of the interval
    pub duration_ms: i64,
    /// Focused to unfocused transitions inside the interval
    pub look_away_count: u32,
    pub difficulty: Difficulty,
    pub sample_count: u32,
    pub started_at_ms: TimestampMs,
    pub ended_at_ms: TimestampMs,
    /// Opaque metadata supplied when the question started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Questions grouped by estimated difficulty
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DifficultyInsights {
    pub easy_questions: Vec<String>,
    pub normal_questions: Vec<String>,
    pub hard_questions: Vec<String>,
    /// Mean question focus score per difficulty label
    pub average_focus_by_difficulty: BTreeMap<Difficulty, f64>,
}

/// Aggregate totals for a tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at_ms: TimestampMs,
    pub last_frame_at_ms: Option<TimestampMs>,
    pub total_time_ms: i64,
    pub focused_time_ms: i64,
    pub unfocused_time_ms: i64,
    pub total_frames: u64,
    pub focused_frames: u64,
    /// Frames dropped as malformed or out of order
    pub skipped_frames: u64,
    pub focus_score: u8,
    pub look_away_count: u32,
    pub questions: BTreeMap<String, QuestionFocus>,
    pub insights: DifficultyInsights,
}

/// Producer metadata attached to an encoded report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Data quality indicators for a session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Share of received frames that made it through the pipeline (0-1)
    pub coverage: f64,
    pub flags: Vec<String>,
}

/// Encoded session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub quality: ReportQuality,
    pub session: SessionSummary,
}
