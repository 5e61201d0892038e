use crate::{
    angle::{AngleMap, JointAngle},
    detection::Detection,
    error::Error,
    landmark::Landmarks,
    limb::LimbGraph,
    overlay::{self, OverlayStyle},
};
use opencv::{core::Mat, prelude::*};
use std::convert::TryFrom;

/// Everything derived from a single detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    landmarks: Landmarks,
    limbs: LimbGraph,
    angles: AngleMap,
}

impl Frame {
    pub fn analyze(detection: &Detection, image_width: u32, image_height: u32) -> Result<Self, Error> {
        let landmarks = Landmarks::build(detection, image_width, image_height)?;
        let limbs = LimbGraph::build(&landmarks);
        let angles = AngleMap::compute(&limbs);
        Ok(Self {
            landmarks,
            limbs,
            angles,
        })
    }

    /// Analyze a detection made on `image`, using its dimensions.
    pub fn analyze_image(detection: &Detection, image: &Mat) -> Result<Self, Error> {
        let dim = |value: i32| u32::try_from(value).map_err(|e| Error::ConvertDimToU32(e, value));
        Self::analyze(detection, dim(image.cols())?, dim(image.rows())?)
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn limbs(&self) -> &LimbGraph {
        &self.limbs
    }

    pub fn angles(&self) -> &AngleMap {
        &self.angles
    }

    /// The angle between two limbs given by name, in either order.
    pub fn angle(&self, a: &str, b: &str) -> Result<JointAngle, Error> {
        self.angles.query_by_name(a, b)
    }

    /// Segments, landmarks, limb names and angles drawn onto a copy of `image`.
    pub fn render(&self, image: &Mat, style: &OverlayStyle) -> Result<Mat, Error> {
        let out = overlay::draw_segments(
            image,
            &self.limbs,
            style.segment_color.into(),
            style.thickness,
        )?;
        let out = overlay::draw_landmarks(
            &out,
            &self.landmarks,
            style.radius,
            style.landmark_color.into(),
        )?;
        let out = overlay::label_segments(&out, &self.limbs)?;
        overlay::label_angles(&out, &self.limbs, &self.angles)
    }
}
