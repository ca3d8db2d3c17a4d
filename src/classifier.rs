//! Frame classification
//!
//! Combines the geometric signals of a frame into a single "looking at
//! target" decision using fixed thresholds. The vertical gaze band is
//! asymmetric: a screen below eye level is watched with a slight downward
//! gaze, so moderate downward deviation is tolerated while upward gaze and
//! steep downward gaze are not.

use crate::config::ClassifierConfig;
use crate::types::{
    FrameClassification, FrameSignals, GazeDeviation, GazeDirection, GazeVector, HeadOffset,
    HeadPose,
};

/// Per-frame threshold classifier
#[derive(Debug, Clone, Default)]
pub struct FrameClassifier {
    config: ClassifierConfig,
}

impl FrameClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one frame's signals
    pub fn classify(&self, signals: &FrameSignals) -> FrameClassification {
        let direction = self.gaze_direction(&signals.gaze);
        let head_pose = self.head_pose(&signals.head);
        let blinking = self.is_blinking(signals.ear.average);

        let looking_at_target =
            direction == GazeDirection::Center && head_pose == HeadPose::Forward && !blinking;

        FrameClassification {
            gaze: GazeVector {
                horizontal: signals.gaze.horizontal,
                vertical: signals.gaze.vertical,
                direction,
                looking_at_target,
            },
            head_pose,
            blinking,
            signals: *signals,
        }
    }

    /// Label the gaze; `Center` exactly when both axes are within bounds
    pub fn gaze_direction(&self, gaze: &GazeDeviation) -> GazeDirection {
        if gaze.horizontal.abs() >= self.config.gaze_horizontal_threshold {
            if gaze.horizontal > 0.0 {
                GazeDirection::Right
            } else {
                GazeDirection::Left
            }
        } else if gaze.vertical < self.config.gaze_up_limit {
            GazeDirection::Up
        } else if gaze.vertical > self.config.gaze_down_limit {
            GazeDirection::Down
        } else {
            GazeDirection::Center
        }
    }

    /// Label the head pose; `Forward` exactly when both offsets are within bounds
    pub fn head_pose(&self, head: &HeadOffset) -> HeadPose {
        if head.horizontal.abs() >= self.config.head_turn_threshold {
            if head.horizontal > 0.0 {
                HeadPose::TurnedRight
            } else {
                HeadPose::TurnedLeft
            }
        } else if head.vertical.abs() >= self.config.head_tilt_threshold {
            if head.vertical > 0.0 {
                HeadPose::TiltedDown
            } else {
                HeadPose::TiltedUp
            }
        } else {
            HeadPose::Forward
        }
    }

    pub fn is_blinking(&self, average_ear: f64) -> bool {
        average_ear < self.config.blink_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryExtractor;
    use crate::testing::SyntheticFace;
    use crate::types::EyeAspectRatio;

    fn classify(face: SyntheticFace) -> FrameClassification {
        let signals = GeometryExtractor::default().extract(&face.frame()).unwrap();
        FrameClassifier::default().classify(&signals)
    }

    fn signals(h: f64, v: f64) -> FrameSignals {
        FrameSignals {
            ear: EyeAspectRatio {
                left: 0.3,
                right: 0.3,
                average: 0.3,
            },
            gaze: GazeDeviation {
                horizontal: h,
                vertical: v,
            },
            head: HeadOffset::default(),
        }
    }

    #[test]
    fn test_centered_face_is_looking() {
        let result = classify(SyntheticFace::centered());
        assert!(result.looking_at_target());
        assert_eq!(result.gaze.direction, GazeDirection::Center);
        assert_eq!(result.head_pose, HeadPose::Forward);
        assert!(!result.blinking);
    }

    #[test]
    fn test_horizontal_gaze_away() {
        let result = classify(SyntheticFace::centered().with_gaze(0.05, 0.0));
        assert!(!result.looking_at_target());
        assert_eq!(result.gaze.direction, GazeDirection::Right);

        let result = classify(SyntheticFace::centered().with_gaze(-0.05, 0.0));
        assert_eq!(result.gaze.direction, GazeDirection::Left);
    }

    #[test]
    fn test_vertical_band_is_asymmetric() {
        let classifier = FrameClassifier::default();

        // Same magnitude, opposite directions
        let down = classifier.classify(&signals(0.0, 0.06));
        let up = classifier.classify(&signals(0.0, -0.06));

        assert!(down.looking_at_target());
        assert!(!up.looking_at_target());
        assert_eq!(up.gaze.direction, GazeDirection::Up);
    }

    #[test]
    fn test_steep_downward_gaze_is_away() {
        let result = FrameClassifier::default().classify(&signals(0.0, 0.2));
        assert!(!result.looking_at_target());
        assert_eq!(result.gaze.direction, GazeDirection::Down);
    }

    #[test]
    fn test_head_turn_overrides_centered_gaze() {
        let result = classify(SyntheticFace::centered().with_head(0.08, 0.0));
        assert!(!result.looking_at_target());
        assert_eq!(result.gaze.direction, GazeDirection::Center);
        assert_eq!(result.head_pose, HeadPose::TurnedRight);
    }

    #[test]
    fn test_head_tilt() {
        let result = classify(SyntheticFace::centered().with_head(0.0, -0.12));
        assert_eq!(result.head_pose, HeadPose::TiltedUp);
        assert!(!result.looking_at_target());
    }

    #[test]
    fn test_blink_is_not_looking() {
        let result = classify(SyntheticFace::centered().blinking());
        assert!(result.blinking);
        assert_eq!(result.gaze.direction, GazeDirection::Center);
        assert!(!result.looking_at_target());
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let classifier = FrameClassifier::default();
        let at_limit = classifier.classify(&signals(0.08, 0.0));
        assert!(!at_limit.looking_at_target());

        let inside = classifier.classify(&signals(0.0799, 0.0));
        assert!(inside.looking_at_target());
    }
}
