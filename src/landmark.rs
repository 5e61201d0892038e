use crate::{detection::Detection, error::Error};
use num_traits::{FromPrimitive, ToPrimitive};
use opencv::core::{Point2i, Point3f};
use std::{fmt, str::FromStr};
use tracing::debug;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, num_derive::FromPrimitive,
)]
pub enum LandmarkKind {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

pub const NUM_LANDMARKS: usize = 33;

impl LandmarkKind {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToLandmarkKind(index))
    }

    pub fn name(self) -> &'static str {
        constants::LANDMARK_NAMES[self.idx()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        constants::LANDMARK_NAMES
            .iter()
            .position(|&candidate| candidate == name)
            .and_then(Self::from_usize)
    }

    /// All landmark kinds in index order.
    pub fn iter() -> impl Iterator<Item = Self> {
        (0..NUM_LANDMARKS).filter_map(Self::from_usize)
    }
}

impl fmt::Display for LandmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses either a canonical name (`left_shoulder`) or a numeric id (`11`).
impl FromStr for LandmarkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.parse::<usize>() {
            Ok(index) => Self::from_usize(index),
            Err(_) => Self::from_name(s),
        };
        kind.ok_or_else(|| Error::UnknownLandmark(s.to_owned()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Landmark {
    kind: LandmarkKind,
    image: Point2i,
    world: Point3f,
}

impl Landmark {
    pub fn new(kind: LandmarkKind, image: Point2i, world: Point3f) -> Self {
        Self { kind, image, world }
    }

    #[inline]
    pub fn kind(&self) -> LandmarkKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.kind.idx()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Pixel position in the source image.
    #[inline]
    pub fn image_coords(&self) -> Point2i {
        self.image
    }

    /// Detector-relative 3D position, as reported.
    #[inline]
    pub fn world_coords(&self) -> Point3f {
        self.world
    }
}

/// The landmarks of a single detection, indexed by [`LandmarkKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    landmarks: [Option<Landmark>; NUM_LANDMARKS],
}

/// Largest pixel coordinate magnitude kept. Differences and sums of two
/// coordinates in this range fit in an `i32`.
pub const PIXEL_LIMIT: i32 = i32::MAX / 2;

fn to_pixel(normalized: f32, size: f64) -> Option<i32> {
    (f64::from(normalized) * size)
        .round()
        .to_i32()
        .filter(|pixel| pixel.abs() <= PIXEL_LIMIT)
}

impl Landmarks {
    /// Scale a detection's normalized coordinates into pixel space.
    ///
    /// Landmarks the detector did not report, or whose pixel position is
    /// outside `PIXEL_LIMIT`, are left out. Only a detection with no usable
    /// landmarks at all is an error.
    pub fn build(detection: &Detection, image_width: u32, image_height: u32) -> Result<Self, Error> {
        if detection.is_empty() {
            return Err(Error::MissingDetection);
        }

        let width = f64::from(image_width);
        let height = f64::from(image_height);
        let mut landmarks = [None; NUM_LANDMARKS];

        for (kind, detected) in detection.iter() {
            let normalized = detected.normalized();
            match (to_pixel(normalized.x, width), to_pixel(normalized.y, height)) {
                (Some(x), Some(y)) => {
                    landmarks[kind.idx()] =
                        Some(Landmark::new(kind, Point2i::new(x, y), detected.world()));
                }
                _ => debug!(
                    message = "landmark out of pixel range",
                    landmark = kind.name(),
                    x = normalized.x,
                    y = normalized.y
                ),
            }
        }

        let landmarks = Self { landmarks };
        if landmarks.is_empty() {
            return Err(Error::MissingDetection);
        }
        if !landmarks.is_complete() {
            debug!(
                message = "incomplete landmarks",
                present = landmarks.len(),
                expected = NUM_LANDMARKS
            );
        }
        Ok(landmarks)
    }

    #[inline]
    pub fn get(&self, kind: LandmarkKind) -> Option<&Landmark> {
        self.landmarks[kind.idx()].as_ref()
    }

    /// Present landmarks in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Landmark> + '_ {
        self.landmarks.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.iter().all(Option::is_some)
    }
}

pub(crate) mod constants {
    use super::NUM_LANDMARKS;

    pub(crate) const LANDMARK_NAMES: [&str; NUM_LANDMARKS] = [
        "nose",
        "left_eye_inner",
        "left_eye",
        "left_eye_outer",
        "right_eye_inner",
        "right_eye",
        "right_eye_outer",
        "left_ear",
        "right_ear",
        "mouth_left",
        "mouth_right",
        "left_shoulder",
        "right_shoulder",
        "left_elbow",
        "right_elbow",
        "left_wrist",
        "right_wrist",
        "left_pinky",
        "right_pinky",
        "left_index",
        "right_index",
        "left_thumb",
        "right_thumb",
        "left_hip",
        "right_hip",
        "left_knee",
        "right_knee",
        "left_ankle",
        "right_ankle",
        "left_heel",
        "right_heel",
        "left_foot_index",
        "right_foot_index",
    ];
}
