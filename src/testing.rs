//! Synthetic landmark frames for unit tests

use crate::geometry::landmark_indices as idx;
use crate::types::{Landmark, LandmarkFrame, TimestampMs};

/// Frame spacing used by tests (~30 fps)
pub const FRAME_INTERVAL_MS: TimestampMs = 33;

/// Timestamp of the n-th (1-based) synthetic frame
pub fn frame_time(n: u32) -> TimestampMs {
    n as TimestampMs * FRAME_INTERVAL_MS
}

/// A parametric face: eyes 0.1 wide with outer corners 0.30 apart, cheeks
/// 0.4 apart, forehead to chin 0.6.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticFace {
    gaze_dx: f64,
    gaze_dy: f64,
    head_dx: f64,
    head_dy: f64,
    eye_open: f64,
    scale: f64,
}

impl SyntheticFace {
    pub fn centered() -> Self {
        Self {
            gaze_dx: 0.0,
            gaze_dy: 0.0,
            head_dx: 0.0,
            head_dy: 0.0,
            eye_open: 0.03,
            scale: 1.0,
        }
    }

    /// Iris shifted well past the horizontal threshold
    pub fn looking_away() -> Self {
        Self::centered().with_gaze(0.05, 0.0)
    }

    pub fn with_gaze(mut self, dx: f64, dy: f64) -> Self {
        self.gaze_dx = dx;
        self.gaze_dy = dy;
        self
    }

    pub fn with_head(mut self, dx: f64, dy: f64) -> Self {
        self.head_dx = dx;
        self.head_dy = dy;
        self
    }

    pub fn blinking(mut self) -> Self {
        self.eye_open = 0.005;
        self
    }

    /// Shrink or grow the face about the image center
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn frame(&self) -> LandmarkFrame {
        let mut points = vec![Landmark::new(0.5, 0.5); idx::REFINED_MESH_POINTS];
        let mut set = |i: usize, x: f64, y: f64| {
            points[i] = Landmark::new(
                0.5 + (x - 0.5) * self.scale,
                0.5 + (y - 0.5) * self.scale,
            );
        };

        let eye_y = 0.40;
        let half_open = self.eye_open / 2.0;

        set(idx::LEFT_EYE_OUTER, 0.35, eye_y);
        set(idx::LEFT_EYE_INNER, 0.45, eye_y);
        set(idx::LEFT_EYE_TOP, 0.40, eye_y - half_open);
        set(idx::LEFT_EYE_BOTTOM, 0.40, eye_y + half_open);
        set(idx::LEFT_IRIS_CENTER, 0.40 + self.gaze_dx, eye_y + self.gaze_dy);

        set(idx::RIGHT_EYE_INNER, 0.55, eye_y);
        set(idx::RIGHT_EYE_OUTER, 0.65, eye_y);
        set(idx::RIGHT_EYE_TOP, 0.60, eye_y - half_open);
        set(idx::RIGHT_EYE_BOTTOM, 0.60, eye_y + half_open);
        set(idx::RIGHT_IRIS_CENTER, 0.60 + self.gaze_dx, eye_y + self.gaze_dy);

        set(idx::LEFT_CHEEK, 0.30, 0.50);
        set(idx::RIGHT_CHEEK, 0.70, 0.50);
        set(idx::FOREHEAD, 0.50, 0.20);
        set(idx::CHIN, 0.50, 0.80);
        set(idx::NOSE_TIP, 0.50 + self.head_dx, 0.50 + self.head_dy);

        LandmarkFrame::new(points)
    }
}
