//! Session report encoding
//!
//! Wraps a session summary with producer metadata and quality indicators so
//! reports can be stored or shipped without the tracker that produced them.

use crate::error::FocusError;
use crate::types::{FocusReport, ReportProducer, ReportQuality, SessionSummary};
use crate::{FOCUS_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Current session report version
pub const REPORT_VERSION: &str = "focus.session_report.v1";

/// Encoder for session reports
pub struct FocusReportEncoder {
    instance_id: String,
}

impl Default for FocusReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a session summary into a report stamped with the current time
    pub fn encode(&self, summary: &SessionSummary) -> FocusReport {
        self.encode_at(summary, Utc::now())
    }

    /// Encode with an explicit computation time
    pub fn encode_at(&self, summary: &SessionSummary, computed_at: DateTime<Utc>) -> FocusReport {
        FocusReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: FOCUS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: computed_at.to_rfc3339(),
            quality: build_quality(summary),
            session: summary.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, summary: &SessionSummary) -> Result<String, FocusError> {
        let report = self.encode(summary);
        serde_json::to_string_pretty(&report).map_err(FocusError::JsonError)
    }
}

fn build_quality(summary: &SessionSummary) -> ReportQuality {
    let received = summary.total_frames + summary.skipped_frames;
    let coverage = if received == 0 {
        0.0
    } else {
        summary.total_frames as f64 / received as f64
    };

    let mut flags = Vec::new();
    if summary.total_frames == 0 {
        flags.push("no_frames".to_string());
    } else if summary.focus_score == 0 && summary.focused_frames > 0 {
        flags.push("warmup_incomplete".to_string());
    }
    if summary.skipped_frames > 0 {
        flags.push("frames_skipped".to_string());
    }
    if summary.questions.is_empty() {
        flags.push("no_questions".to_string());
    }

    ReportQuality { coverage, flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, DifficultyInsights, QuestionFocus};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn make_summary() -> SessionSummary {
        let mut questions = BTreeMap::new();
        questions.insert(
            "q1".to_string(),
            QuestionFocus {
                question_id: "q1".to_string(),
                focus_score: 100.0,
                duration_ms: 660,
                look_away_count: 0,
                difficulty: Difficulty::Easy,
                sample_count: 20,
                started_at_ms: 0,
                ended_at_ms: 660,
                metadata: None,
            },
        );

        SessionSummary {
            started_at_ms: 0,
            last_frame_at_ms: Some(3300),
            total_time_ms: 3267,
            focused_time_ms: 3000,
            unfocused_time_ms: 267,
            total_frames: 98,
            focused_frames: 90,
            skipped_frames: 2,
            focus_score: 92,
            look_away_count: 1,
            questions,
            insights: DifficultyInsights {
                easy_questions: vec!["q1".to_string()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_encode_report() {
        let encoder = FocusReportEncoder::with_instance_id("test-instance".to_string());
        let computed_at = "2024-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let report = encoder.encode_at(&make_summary(), computed_at);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, FOCUS_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.computed_at_utc, "2024-01-15T08:00:00+00:00");

        assert!((report.quality.coverage - 0.98).abs() < 1e-9);
        assert_eq!(report.quality.flags, vec!["frames_skipped"]);
        assert_eq!(report.session, make_summary());
    }

    #[test]
    fn test_empty_session_flags() {
        let summary = SessionSummary {
            started_at_ms: 0,
            last_frame_at_ms: None,
            total_time_ms: 0,
            focused_time_ms: 0,
            unfocused_time_ms: 0,
            total_frames: 0,
            focused_frames: 0,
            skipped_frames: 0,
            focus_score: 0,
            look_away_count: 0,
            questions: BTreeMap::new(),
            insights: DifficultyInsights::default(),
        };

        let report = FocusReportEncoder::new().encode(&summary);
        assert_eq!(report.quality.coverage, 0.0);
        assert_eq!(report.quality.flags, vec!["no_frames", "no_questions"]);
    }

    #[test]
    fn test_warmup_flag() {
        let mut summary = make_summary();
        summary.total_frames = 5;
        summary.focused_frames = 5;
        summary.skipped_frames = 0;
        summary.focus_score = 0;

        let report = FocusReportEncoder::new().encode(&summary);
        assert_eq!(report.quality.flags, vec!["warmup_incomplete"]);
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = FocusReportEncoder::new();
        let json = encoder.encode_to_json(&make_summary()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["report_version"], REPORT_VERSION);
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("computed_at_utc").is_some());
        assert_eq!(parsed["session"]["focus_score"], 92);
        assert_eq!(parsed["session"]["questions"]["q1"]["difficulty"], "easy");
        assert_eq!(
            parsed["session"]["insights"]["easy_questions"][0],
            "q1"
        );
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = FocusReportEncoder::new();
        let b = FocusReportEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
