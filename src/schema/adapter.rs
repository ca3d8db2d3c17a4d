//! Parsing and batch validation of focus.tracker_event.v1 streams

use crate::error::FocusError;
use crate::schema::tracker_event::*;

/// Adapter for reading recorded tracker event streams
pub struct TrackerEventAdapter;

impl TrackerEventAdapter {
    /// Parse a JSON string containing an array of TrackerEvents
    pub fn parse_array(json: &str) -> Result<Vec<TrackerEvent>, FocusError> {
        let events: Vec<TrackerEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing TrackerEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TrackerEvent>, FocusError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackerEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(FocusError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either a JSON array or NDJSON, decided by the first non-blank character
    pub fn parse_auto(input: &str) -> Result<Vec<TrackerEvent>, FocusError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of events, returning only the failures.
    ///
    /// Frames with non-finite landmarks are reported here even though the
    /// pipeline only skips them.
    pub fn validate_events(events: &[TrackerEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(idx, event)| {
                let checked = event.validate().and_then(|()| event.validate_landmarks());
                checked.err().map(|error| ValidationResult {
                    index: idx,
                    event_id: event.event_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A validation failure within a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub event_id: Option<String>,
    pub error: ValidationError,
}
