//! Geometry extraction
//!
//! Reduces a raw landmark frame to three signals: eye aspect ratio (blink),
//! iris gaze deviation, and a nose-based head pose proxy. Landmark indices
//! follow the MediaPipe Face Mesh topology with refined iris points.

use crate::config::GeometryConfig;
use crate::error::FocusError;
use crate::types::{
    EyeAspectRatio, FrameSignals, GazeDeviation, HeadOffset, Landmark, LandmarkFrame,
};

/// MediaPipe Face Mesh landmark indices used by the extractor.
///
/// "Left" and "right" refer to image space, not the subject's anatomy.
pub mod landmark_indices {
    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const LEFT_IRIS_CENTER: usize = 468;

    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const RIGHT_IRIS_CENTER: usize = 473;

    pub const NOSE_TIP: usize = 1;
    pub const LEFT_CHEEK: usize = 234;
    pub const RIGHT_CHEEK: usize = 454;
    pub const FOREHEAD: usize = 10;
    pub const CHIN: usize = 152;

    /// Point count of a refined (iris-enabled) face mesh
    pub const REFINED_MESH_POINTS: usize = 478;
}

use landmark_indices as idx;

/// Reference lengths below this are treated as degenerate geometry
const MIN_REFERENCE_LENGTH: f64 = 1e-6;

struct Eye {
    top: usize,
    bottom: usize,
    inner: usize,
    outer: usize,
    iris: usize,
}

const LEFT_EYE: Eye = Eye {
    top: idx::LEFT_EYE_TOP,
    bottom: idx::LEFT_EYE_BOTTOM,
    inner: idx::LEFT_EYE_INNER,
    outer: idx::LEFT_EYE_OUTER,
    iris: idx::LEFT_IRIS_CENTER,
};

const RIGHT_EYE: Eye = Eye {
    top: idx::RIGHT_EYE_TOP,
    bottom: idx::RIGHT_EYE_BOTTOM,
    inner: idx::RIGHT_EYE_INNER,
    outer: idx::RIGHT_EYE_OUTER,
    iris: idx::RIGHT_IRIS_CENTER,
};

/// Extracts geometric signals from landmark frames
#[derive(Debug, Clone, Default)]
pub struct GeometryExtractor {
    config: GeometryConfig,
}

impl GeometryExtractor {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Extract EAR, gaze deviation and head offset from a frame.
    ///
    /// Fails when an expected index is missing, any coordinate is not finite,
    /// or a reference length collapses to zero.
    pub fn extract(&self, frame: &LandmarkFrame) -> Result<FrameSignals, FocusError> {
        if let Some(index) = frame.points.iter().position(|p| !p.is_finite()) {
            return Err(FocusError::MalformedFrame(format!(
                "landmark {} has non-finite coordinates",
                index
            )));
        }

        Ok(FrameSignals {
            ear: self.eye_aspect_ratio(frame)?,
            gaze: gaze_deviation(frame)?,
            head: head_offset(frame)?,
        })
    }

    /// Eye aspect ratio for both eyes
    pub fn eye_aspect_ratio(&self, frame: &LandmarkFrame) -> Result<EyeAspectRatio, FocusError> {
        let left = self.single_ear(frame, &LEFT_EYE)?;
        let right = self.single_ear(frame, &RIGHT_EYE)?;
        Ok(EyeAspectRatio {
            left,
            right,
            average: (left + right) / 2.0,
        })
    }

    fn single_ear(&self, frame: &LandmarkFrame, eye: &Eye) -> Result<f64, FocusError> {
        let vertical = point(frame, eye.top)?.distance(point(frame, eye.bottom)?);
        let horizontal = point(frame, eye.inner)?.distance(point(frame, eye.outer)?);
        Ok(vertical / (horizontal + self.config.epsilon))
    }
}

/// Iris deviation averaged over both eyes, normalized by inter-eye width.
///
/// Horizontal offsets are measured from each eye's inner corner; the two
/// eyes mirror each other, so a centered gaze averages out to zero.
pub fn gaze_deviation(frame: &LandmarkFrame) -> Result<GazeDeviation, FocusError> {
    let inter_eye = reference_length(
        point(frame, idx::LEFT_EYE_OUTER)?,
        point(frame, idx::RIGHT_EYE_OUTER)?,
        "inter-eye width",
    )?;

    let (left_h, left_v) = eye_offset(frame, &LEFT_EYE)?;
    let (right_h, right_v) = eye_offset(frame, &RIGHT_EYE)?;

    Ok(GazeDeviation {
        horizontal: (left_h + right_h) / 2.0 / inter_eye,
        vertical: (left_v + right_v) / 2.0 / inter_eye,
    })
}

fn eye_offset(frame: &LandmarkFrame, eye: &Eye) -> Result<(f64, f64), FocusError> {
    let iris = point(frame, eye.iris)?;
    let inner = point(frame, eye.inner)?;
    let top = point(frame, eye.top)?;
    let bottom = point(frame, eye.bottom)?;

    let vertical_center = (top.y + bottom.y) / 2.0;
    Ok((iris.x - inner.x, iris.y - vertical_center))
}

/// Nose-tip offset from the cheek midpoint and the forehead-chin midpoint
pub fn head_offset(frame: &LandmarkFrame) -> Result<HeadOffset, FocusError> {
    let nose = point(frame, idx::NOSE_TIP)?;
    let left_cheek = point(frame, idx::LEFT_CHEEK)?;
    let right_cheek = point(frame, idx::RIGHT_CHEEK)?;
    let forehead = point(frame, idx::FOREHEAD)?;
    let chin = point(frame, idx::CHIN)?;

    let face_width = reference_length(left_cheek, right_cheek, "face width")?;
    let face_height = reference_length(forehead, chin, "face height")?;

    Ok(HeadOffset {
        horizontal: (nose.x - (left_cheek.x + right_cheek.x) / 2.0) / face_width,
        vertical: (nose.y - (forehead.y + chin.y) / 2.0) / face_height,
    })
}

fn point(frame: &LandmarkFrame, index: usize) -> Result<&Landmark, FocusError> {
    let landmark = frame.get(index).ok_or_else(|| {
        FocusError::MalformedFrame(format!(
            "missing landmark {} (frame has {} points)",
            index,
            frame.len()
        ))
    })?;
    if !landmark.is_finite() {
        return Err(FocusError::MalformedFrame(format!(
            "landmark {} has non-finite coordinates",
            index
        )));
    }
    Ok(landmark)
}

fn reference_length(a: &Landmark, b: &Landmark, what: &str) -> Result<f64, FocusError> {
    let length = a.distance(b);
    if length < MIN_REFERENCE_LENGTH {
        return Err(FocusError::MalformedFrame(format!("degenerate {}", what)));
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SyntheticFace;

    fn extractor() -> GeometryExtractor {
        GeometryExtractor::default()
    }

    #[test]
    fn test_centered_face_has_zero_deviation() {
        let signals = extractor().extract(&SyntheticFace::centered().frame()).unwrap();

        assert!(signals.gaze.horizontal.abs() < 1e-9);
        assert!(signals.gaze.vertical.abs() < 1e-9);
        assert!(signals.head.horizontal.abs() < 1e-9);
        assert!(signals.head.vertical.abs() < 1e-9);
    }

    #[test]
    fn test_open_eye_ear() {
        // 0.03 opening over a 0.1 wide eye
        let ear = extractor()
            .eye_aspect_ratio(&SyntheticFace::centered().frame())
            .unwrap();
        let expected = 0.03 / (0.1 + 0.001);
        assert!((ear.left - expected).abs() < 1e-9);
        assert!((ear.right - expected).abs() < 1e-9);
        assert!((ear.average - expected).abs() < 1e-9);
    }

    #[test]
    fn test_blink_lowers_ear() {
        let open = extractor()
            .eye_aspect_ratio(&SyntheticFace::centered().frame())
            .unwrap();
        let closed = extractor()
            .eye_aspect_ratio(&SyntheticFace::centered().blinking().frame())
            .unwrap();
        assert!(closed.average < open.average / 4.0);
    }

    #[test]
    fn test_gaze_shift_is_normalized_by_inter_eye_width() {
        let face = SyntheticFace::centered().with_gaze(0.03, -0.015);
        let gaze = gaze_deviation(&face.frame()).unwrap();

        // inter-eye width is 0.30
        assert!((gaze.horizontal - 0.1).abs() < 1e-9);
        assert!((gaze.vertical + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_gaze_is_scale_invariant() {
        let near = gaze_deviation(&SyntheticFace::centered().with_gaze(0.03, 0.0).frame()).unwrap();
        let far = gaze_deviation(
            &SyntheticFace::centered()
                .with_gaze(0.03, 0.0)
                .scaled(0.5)
                .frame(),
        )
        .unwrap();
        assert!((near.horizontal - far.horizontal).abs() < 1e-9);
    }

    #[test]
    fn test_head_offset() {
        let face = SyntheticFace::centered().with_head(-0.08, 0.06);
        let head = head_offset(&face.frame()).unwrap();

        // face width 0.4, face height 0.6
        assert!((head.horizontal + 0.2).abs() < 1e-9);
        assert!((head.vertical - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_depth_is_used_when_present() {
        let a = Landmark::with_depth(0.0, 0.0, 0.0);
        let b = Landmark::with_depth(0.3, 0.0, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);

        let flat = Landmark::new(0.3, 0.0);
        assert!((a.distance(&flat) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_truncated_frame_is_malformed() {
        let mut frame = SyntheticFace::centered().frame();
        frame.points.truncate(400);

        let err = extractor().extract(&frame).unwrap_err();
        assert!(matches!(err, FocusError::MalformedFrame(_)));
    }

    #[test]
    fn test_nan_coordinate_is_malformed() {
        let mut frame = SyntheticFace::centered().frame();
        frame.points[idx::NOSE_TIP].x = f64::NAN;

        assert!(matches!(
            head_offset(&frame),
            Err(FocusError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_non_finite_unused_landmark_is_malformed() {
        let mut frame = SyntheticFace::centered().frame();
        frame.points[300].x = f64::NAN;

        assert!(matches!(
            extractor().extract(&frame),
            Err(FocusError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_collapsed_face_is_malformed() {
        let frame = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5); idx::REFINED_MESH_POINTS]);
        assert!(matches!(
            extractor().extract(&frame),
            Err(FocusError::MalformedFrame(_))
        ));
    }
}
