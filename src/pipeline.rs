//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Focus.
//! It runs each camera frame through the full pipeline, from raw landmarks to
//! debounced focus state and session aggregates.

use crate::aggregator::SessionAggregator;
use crate::classifier::FrameClassifier;
use crate::config::{BlinkPolicy, TrackerConfig};
use crate::debouncer::{Observation, TemporalDebouncer};
use crate::encoder::FocusReportEncoder;
use crate::error::FocusError;
use crate::geometry::GeometryExtractor;
use crate::schema::{Payload, TrackerEvent, TrackerEventAdapter};
use crate::types::{
    Difficulty, FocusReport, FocusState, FrameClassification, LandmarkFrame, LiveStatus,
    QuestionFocus, SessionSummary, TimestampMs,
};
use tracing::{debug, info, warn};

/// Why a frame was dropped before reaching the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing landmark indices, non-finite coordinates or degenerate geometry
    Malformed,
    /// Timestamp precedes the last processed frame
    OutOfOrder,
}

/// Result of offering one frame to the processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The frame went through every stage; carries the updated status
    Processed(LiveStatus),
    /// The frame was dropped; session aggregates are unchanged
    Skipped(SkipReason),
    /// Tracking is not active
    Inactive,
}

/// Result of applying one recorded tracker event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Frame(FrameOutcome),
    /// A question was opened; carries the entry of a question it auto-closed
    QuestionStarted(Option<QuestionFocus>),
    /// The open question was closed, or `None` when nothing was open
    QuestionEnded(Option<QuestionFocus>),
}

/// Replay a recorded event stream (NDJSON or JSON array) into a session report.
///
/// Tracking starts at the first event's timestamp and stops at the last one;
/// a question still open at the end is closed there.
///
/// # Example
/// ```ignore
/// let report = replay_to_report(&ndjson, TrackerConfig::default())?;
/// println!("focus score: {}", report.session.focus_score);
/// ```
pub fn replay_to_report(input: &str, config: TrackerConfig) -> Result<FocusReport, FocusError> {
    let events = TrackerEventAdapter::parse_auto(input)?;
    replay_events(&events, config)
}

/// Replay already parsed tracker events into a session report
pub fn replay_events(
    events: &[TrackerEvent],
    config: TrackerConfig,
) -> Result<FocusReport, FocusError> {
    let mut processor = FocusProcessor::with_config(config)?;
    let started_at = events.first().map_or(0, |e| e.timestamp_ms);
    let stopped_at = events.last().map_or(started_at, |e| e.timestamp_ms);

    // Stage 1: Open the session
    processor.start(started_at);

    // Stage 2: Drive every event through the pipeline
    for event in events {
        processor.process_event(event)?;
    }

    // Stage 3: Close the session and encode
    let summary = processor
        .stop(stopped_at)
        .ok_or_else(|| FocusError::EncodingError("session ended before stop".to_string()))?;
    Ok(processor.encoder.encode(&summary))
}

/// Stateful focus tracker.
///
/// One instance owns one tracking session at a time. Frames are offered with
/// the caller's timestamp; every pass runs geometry extraction,
/// classification, debouncing and aggregation in order.
pub struct FocusProcessor {
    config: TrackerConfig,
    extractor: GeometryExtractor,
    classifier: FrameClassifier,
    debouncer: TemporalDebouncer,
    encoder: FocusReportEncoder,
    session: Option<SessionAggregator>,
    last_classification: Option<FrameClassification>,
}

impl Default for FocusProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::build(TrackerConfig::default())
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: TrackerConfig) -> Result<Self, FocusError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TrackerConfig) -> Self {
        Self {
            extractor: GeometryExtractor::new(config.geometry.clone()),
            classifier: FrameClassifier::new(config.classifier.clone()),
            debouncer: TemporalDebouncer::new(config.debounce.clone()),
            encoder: FocusReportEncoder::new(),
            session: None,
            last_classification: None,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a tracking session; no-op while one is active
    pub fn start(&mut self, now: TimestampMs) {
        if self.session.is_some() {
            debug!(at_ms = now, "start ignored, already tracking");
            return;
        }

        self.debouncer.reset();
        self.last_classification = None;
        self.session = Some(SessionAggregator::new(
            self.config.aggregator.clone(),
            self.config.difficulty.clone(),
            now,
        ));
        info!(at_ms = now, "focus tracking started");
    }

    /// End the session and return its final summary.
    ///
    /// A question still open is closed at `now`. Returns `None` when no
    /// session was active, so repeated calls are harmless.
    pub fn stop(&mut self, now: TimestampMs) -> Option<SessionSummary> {
        let mut session = self.session.take()?;
        session.end_question(now);

        self.debouncer.reset();
        self.last_classification = None;

        let summary = session.summary();
        info!(
            at_ms = now,
            total_frames = summary.total_frames,
            focus_score = summary.focus_score,
            look_away_count = summary.look_away_count,
            "focus tracking stopped"
        );
        Some(summary)
    }

    /// Run one frame through the pipeline.
    ///
    /// `None` (or an empty frame) means no face was detected.
    pub fn process_frame(
        &mut self,
        frame: Option<&LandmarkFrame>,
        now: TimestampMs,
    ) -> FrameOutcome {
        let Some(session) = self.session.as_mut() else {
            return FrameOutcome::Inactive;
        };

        if let Some(last) = session.last_frame_at() {
            if now < last {
                warn!(timestamp_ms = now, last_ms = last, "dropping out-of-order frame");
                session.record_skip();
                return FrameOutcome::Skipped(SkipReason::OutOfOrder);
            }
        }

        // Stage 1: Geometry and Stage 2: per-frame classification
        let (observation, classification) = match frame.filter(|f| !f.is_empty()) {
            None => (Observation::NoFace, None),
            Some(frame) => match self.extractor.extract(frame) {
                Ok(signals) => {
                    let classification = self.classifier.classify(&signals);
                    let observation =
                        observe(&classification, self.config.classifier.blink_policy);
                    (observation, Some(classification))
                }
                Err(e) => {
                    warn!(timestamp_ms = now, error = %e, "skipping malformed frame");
                    session.record_skip();
                    return FrameOutcome::Skipped(SkipReason::Malformed);
                }
            },
        };

        // Stage 3: Temporal debouncing
        let transition = self.debouncer.observe(observation, now);
        let look_away = transition.is_some_and(|t| t.is_look_away());
        if look_away {
            debug!(at_ms = now, "look-away confirmed");
        }

        // Stage 4: Session aggregation
        session.record_frame(self.debouncer.is_focused(), look_away, now);
        self.last_classification = classification;

        FrameOutcome::Processed(self.status())
    }

    /// Open a question interval
    pub fn start_question(
        &mut self,
        question_id: &str,
        metadata: Option<serde_json::Value>,
        now: TimestampMs,
    ) -> Result<Option<QuestionFocus>, FocusError> {
        let session = self.session.as_mut().ok_or(FocusError::NotTracking)?;
        session.start_question(question_id, metadata, now)
    }

    /// Close the open question; `None` when nothing is open or not tracking
    pub fn end_question(&mut self, now: TimestampMs) -> Option<QuestionFocus> {
        self.session.as_mut()?.end_question(now)
    }

    /// Live difficulty estimate for the open question
    pub fn current_difficulty(&self) -> Option<Difficulty> {
        self.session.as_ref()?.current_difficulty()
    }

    /// Snapshot of the live status; all zero and unfocused when not tracking
    pub fn status(&self) -> LiveStatus {
        let classification = self.last_classification.as_ref();
        let (average_focus_score, score_ready, look_away_count, total_frames) =
            match &self.session {
                Some(s) => (
                    s.average_focus_score(),
                    s.score_ready(),
                    s.look_away_count(),
                    s.total_frames(),
                ),
                None => (0, false, 0, 0),
            };

        let focus_state = if self.session.is_some() {
            self.debouncer.state()
        } else {
            FocusState::Unfocused
        };

        LiveStatus {
            average_focus_score,
            score_ready,
            is_focused: focus_state.is_focused(),
            focus_state,
            gaze_direction: classification.map(|c| c.gaze.direction),
            head_pose: classification.map(|c| c.head_pose),
            look_away_count,
            total_frames,
        }
    }

    /// Summary of the active session
    pub fn session_summary(&self) -> Option<SessionSummary> {
        self.session.as_ref().map(SessionAggregator::summary)
    }

    /// Encoded report of the active session
    pub fn session_report(&self) -> Option<FocusReport> {
        self.session_summary()
            .map(|summary| self.encoder.encode(&summary))
    }

    /// Apply one recorded tracker event
    pub fn process_event(&mut self, event: &TrackerEvent) -> Result<EventOutcome, FocusError> {
        if let Err(e) = event.validate() {
            return Err(FocusError::ParseError(format!("Invalid event: {}", e)));
        }

        let now = event.timestamp_ms;
        match &event.payload {
            Payload::Frame { frame } => Ok(EventOutcome::Frame(
                self.process_frame(frame.landmarks.as_ref(), now),
            )),
            Payload::QuestionStart { question_start } => {
                let closed = self.start_question(
                    &question_start.question_id,
                    question_start.metadata.clone(),
                    now,
                )?;
                Ok(EventOutcome::QuestionStarted(closed))
            }
            Payload::QuestionEnd { .. } => Ok(EventOutcome::QuestionEnded(self.end_question(now))),
        }
    }
}

fn observe(classification: &FrameClassification, blink_policy: BlinkPolicy) -> Observation {
    if classification.looking_at_target() {
        Observation::OnTarget
    } else if classification.blinking && blink_policy == BlinkPolicy::Neutral {
        Observation::Neutral
    } else {
        Observation::Away
    }
}
