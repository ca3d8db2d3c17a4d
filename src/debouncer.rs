//! Temporal debouncing of the per-frame focus decision
//!
//! State machine:
//!
//! ```text
//! Focused --[N consecutive away frames]--> PendingAway
//! PendingAway --[away longer than grace period]--> Unfocused
//! PendingAway | Unfocused --[M consecutive on-target frames]--> Focused
//! any --[no face]--> Unfocused
//! ```
//!
//! The frame count guards against single-frame detector noise, the grace
//! period against quick legitimate glances.

use crate::config::DebounceConfig;
use crate::types::{FocusState, TimestampMs};
use tracing::debug;

/// What a single frame contributed to the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Classified as looking at the target
    OnTarget,
    /// Classified as looking away (including blinks under `ForceAway`)
    Away,
    /// Leaves the hysteresis counters untouched (blinks under `Neutral`)
    Neutral,
    /// No face detected; overrides any grace period in progress
    NoFace,
}

/// A change of debounced state produced by one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: FocusState,
    pub to: FocusState,
}

impl Transition {
    /// True when focus was lost, i.e. a look-away was confirmed
    pub fn is_look_away(&self) -> bool {
        self.from.is_focused() && !self.to.is_focused()
    }
}

/// Converts noisy per-frame decisions into a stable focus state
#[derive(Debug, Clone)]
pub struct TemporalDebouncer {
    config: DebounceConfig,
    state: FocusState,
    look_away_started_at: Option<TimestampMs>,
    consecutive_away_frames: u32,
    consecutive_focused_frames: u32,
}

impl Default for TemporalDebouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

impl TemporalDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            state: FocusState::Focused,
            look_away_started_at: None,
            consecutive_away_frames: 0,
            consecutive_focused_frames: 0,
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn is_focused(&self) -> bool {
        self.state.is_focused()
    }

    pub fn look_away_started_at(&self) -> Option<TimestampMs> {
        self.look_away_started_at
    }

    pub fn consecutive_away_frames(&self) -> u32 {
        self.consecutive_away_frames
    }

    pub fn consecutive_focused_frames(&self) -> u32 {
        self.consecutive_focused_frames
    }

    /// Feed one frame's observation and return the transition, if any
    pub fn observe(&mut self, observation: Observation, now: TimestampMs) -> Option<Transition> {
        let before = self.state;

        match observation {
            Observation::OnTarget => {
                self.consecutive_focused_frames = self.consecutive_focused_frames.saturating_add(1);
                self.consecutive_away_frames = 0;

                if self.state != FocusState::Focused
                    && self.consecutive_focused_frames >= self.config.focus_confirmation_frames
                {
                    self.state = FocusState::Focused;
                    self.look_away_started_at = None;
                }
            }
            Observation::Away => {
                self.consecutive_away_frames = self.consecutive_away_frames.saturating_add(1);
                self.consecutive_focused_frames = 0;

                if self.state == FocusState::Focused
                    && self.consecutive_away_frames >= self.config.away_confirmation_frames
                {
                    self.state = FocusState::PendingAway;
                    self.look_away_started_at = Some(now);
                }
            }
            Observation::Neutral => {}
            Observation::NoFace => {
                self.consecutive_away_frames = self.consecutive_away_frames.saturating_add(1);
                self.consecutive_focused_frames = 0;

                if self.state != FocusState::Unfocused {
                    self.look_away_started_at.get_or_insert(now);
                    self.state = FocusState::Unfocused;
                }
            }
        }

        // The grace period runs on wall time, so it is checked on every frame
        // while a look-away is pending.
        if self.state == FocusState::PendingAway {
            if let Some(started) = self.look_away_started_at {
                if now.saturating_sub(started) > self.config.grace_period_ms {
                    self.state = FocusState::Unfocused;
                }
            }
        }

        if before == self.state {
            return None;
        }

        debug!(from = ?before, to = ?self.state, at_ms = now, "focus state changed");
        Some(Transition {
            from: before,
            to: self.state,
        })
    }

    /// Return to the initial `Focused` state
    pub fn reset(&mut self) {
        self.state = FocusState::Focused;
        self.look_away_started_at = None;
        self.consecutive_away_frames = 0;
        self.consecutive_focused_frames = 0;
    }
}
