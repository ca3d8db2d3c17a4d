//! Recorded tracker event schema (focus.tracker_event.v1)
//!
//! Lets a session be captured as a stream of frame and question events and
//! replayed through the pipeline offline.

mod adapter;
mod tracker_event;

pub use adapter::*;
pub use tracker_event::*;
