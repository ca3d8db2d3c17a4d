//! Session aggregation
//!
//! Accumulates the debounced per-frame state into session totals and
//! per-question intervals. Question entries are write-once: an id that has
//! been recorded can not be opened again within the same session.

use crate::config::{AggregatorConfig, DifficultyConfig, QuestionReentry};
use crate::difficulty::{self, DifficultyEstimator};
use crate::error::FocusError;
use crate::types::{Difficulty, QuestionFocus, SessionSummary, TimestampMs};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A question interval that has been started but not ended
#[derive(Debug, Clone)]
struct OpenQuestion {
    question_id: String,
    metadata: Option<serde_json::Value>,
    started_at: TimestampMs,
    samples: Vec<bool>,
}

/// Session totals and question map for one tracking session
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    config: AggregatorConfig,
    estimator: DifficultyEstimator,
    started_at: TimestampMs,
    last_frame_at: Option<TimestampMs>,
    last_frame_focused: bool,
    total_frames: u64,
    focused_frames: u64,
    skipped_frames: u64,
    focused_time_ms: i64,
    unfocused_time_ms: i64,
    look_away_count: u32,
    open_question: Option<OpenQuestion>,
    questions: BTreeMap<String, QuestionFocus>,
}

impl SessionAggregator {
    pub fn new(
        config: AggregatorConfig,
        difficulty: DifficultyConfig,
        started_at: TimestampMs,
    ) -> Self {
        Self {
            config,
            estimator: DifficultyEstimator::new(difficulty),
            started_at,
            last_frame_at: None,
            last_frame_focused: true,
            total_frames: 0,
            focused_frames: 0,
            skipped_frames: 0,
            focused_time_ms: 0,
            unfocused_time_ms: 0,
            look_away_count: 0,
            open_question: None,
            questions: BTreeMap::new(),
        }
    }

    /// Record one processed frame.
    ///
    /// The interval since the previous frame is attributed to the state that
    /// frame was in.
    pub fn record_frame(&mut self, is_focused: bool, look_away: bool, now: TimestampMs) {
        if let Some(last) = self.last_frame_at {
            let elapsed = now.saturating_sub(last).max(0);
            if self.last_frame_focused {
                self.focused_time_ms = self.focused_time_ms.saturating_add(elapsed);
            } else {
                self.unfocused_time_ms = self.unfocused_time_ms.saturating_add(elapsed);
            }
        }
        self.last_frame_at = Some(now);
        self.last_frame_focused = is_focused;

        self.total_frames += 1;
        if is_focused {
            self.focused_frames += 1;
        }
        if look_away {
            self.look_away_count += 1;
        }

        if let Some(open) = self.open_question.as_mut() {
            open.samples.push(is_focused);
        }
    }

    /// Count a frame that was dropped before reaching the debouncer
    pub fn record_skip(&mut self) {
        self.skipped_frames += 1;
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn focused_frames(&self) -> u64 {
        self.focused_frames
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    pub fn look_away_count(&self) -> u32 {
        self.look_away_count
    }

    pub fn last_frame_at(&self) -> Option<TimestampMs> {
        self.last_frame_at
    }

    /// True once the warm-up frame count has been exceeded
    pub fn score_ready(&self) -> bool {
        self.total_frames > self.config.warmup_frames
    }

    /// Rounded percentage of focused frames; 0 during warm-up
    pub fn average_focus_score(&self) -> u8 {
        if !self.score_ready() || self.total_frames == 0 {
            return 0;
        }
        let pct = self.focused_frames as f64 * 100.0 / self.total_frames as f64;
        pct.round().clamp(0.0, 100.0) as u8
    }

    pub fn open_question_id(&self) -> Option<&str> {
        self.open_question.as_ref().map(|q| q.question_id.as_str())
    }

    /// Difficulty estimate for the question currently open
    pub fn current_difficulty(&self) -> Option<Difficulty> {
        self.open_question
            .as_ref()
            .map(|q| self.estimator.estimate(&q.samples))
    }

    /// Open a question window.
    ///
    /// Returns the entry recorded for a previously open question when the
    /// reentry policy closed it.
    pub fn start_question(
        &mut self,
        question_id: &str,
        metadata: Option<serde_json::Value>,
        now: TimestampMs,
    ) -> Result<Option<QuestionFocus>, FocusError> {
        if self.questions.contains_key(question_id) {
            return Err(FocusError::DuplicateQuestion(question_id.to_string()));
        }

        let mut closed = None;
        if let Some(open) = &self.open_question {
            let same_id = open.question_id == question_id;
            if same_id || self.config.question_reentry == QuestionReentry::Reject {
                return Err(FocusError::QuestionAlreadyOpen {
                    open: open.question_id.clone(),
                    requested: question_id.to_string(),
                });
            }
            closed = self.end_question(now);
        }

        debug!(question_id, at_ms = now, "question started");
        self.open_question = Some(OpenQuestion {
            question_id: question_id.to_string(),
            metadata,
            started_at: now,
            samples: Vec::new(),
        });
        Ok(closed)
    }

    /// Close the open question and record its entry; no-op when none is open
    pub fn end_question(&mut self, now: TimestampMs) -> Option<QuestionFocus> {
        let open = self.open_question.take()?;

        let sample_count = open.samples.len();
        let focused = open.samples.iter().filter(|&&s| s).count();
        let focus_score = if sample_count == 0 {
            0.0
        } else {
            focused as f64 * 100.0 / sample_count as f64
        };
        let look_away_count = open
            .samples
            .windows(2)
            .filter(|pair| pair[0] && !pair[1])
            .count() as u32;

        let entry = QuestionFocus {
            question_id: open.question_id,
            focus_score,
            duration_ms: now.saturating_sub(open.started_at).max(0),
            look_away_count,
            difficulty: self.estimator.estimate(&open.samples),
            sample_count: sample_count as u32,
            started_at_ms: open.started_at,
            ended_at_ms: now,
            metadata: open.metadata,
        };

        info!(
            question_id = %entry.question_id,
            focus_score = entry.focus_score,
            difficulty = entry.difficulty.as_str(),
            "question completed"
        );
        self.questions
            .insert(entry.question_id.clone(), entry.clone());
        Some(entry)
    }

    pub fn questions(&self) -> &BTreeMap<String, QuestionFocus> {
        &self.questions
    }

    /// Snapshot of the session totals
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            started_at_ms: self.started_at,
            last_frame_at_ms: self.last_frame_at,
            total_time_ms: self.focused_time_ms.saturating_add(self.unfocused_time_ms),
            focused_time_ms: self.focused_time_ms,
            unfocused_time_ms: self.unfocused_time_ms,
            total_frames: self.total_frames,
            focused_frames: self.focused_frames,
            skipped_frames: self.skipped_frames,
            focus_score: self.average_focus_score(),
            look_away_count: self.look_away_count,
            questions: self.questions.clone(),
            insights: difficulty::insights(self.questions.values()),
        }
    }
}
