use crate::{
    error::Error,
    landmark::{LandmarkKind, NUM_LANDMARKS},
};
use opencv::core::{Point2f, Point3f};
use ordered_float::NotNan;
use std::str::FromStr;

/// One landmark as reported by the pose detector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DetectedLandmark {
    normalized: Point2f,
    world: Point3f,
}

fn not_nan(value: f32) -> Result<f32, Error> {
    Ok(NotNan::new(value)
        .map_err(|e| Error::ConstructNotNan(e, value))?
        .into_inner())
}

impl DetectedLandmark {
    /// `x` and `y` are normalized to the image size, the world coordinates are
    /// in the detector's own units.
    pub fn new(x: f32, y: f32, world_x: f32, world_y: f32, world_z: f32) -> Result<Self, Error> {
        Ok(Self {
            normalized: Point2f::new(not_nan(x)?, not_nan(y)?),
            world: Point3f::new(not_nan(world_x)?, not_nan(world_y)?, not_nan(world_z)?),
        })
    }

    #[inline]
    pub fn normalized(&self) -> Point2f {
        self.normalized
    }

    #[inline]
    pub fn world(&self) -> Point3f {
        self.world
    }
}

/// The raw output of a pose detector for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    landmarks: [Option<DetectedLandmark>; NUM_LANDMARKS],
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            landmarks: [None; NUM_LANDMARKS],
        }
    }
}

impl Detection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign landmarks to ids `0..` in iteration order.
    pub fn from_landmarks<I>(landmarks: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = DetectedLandmark>,
    {
        let landmarks = landmarks.into_iter().collect::<Vec<_>>();
        if landmarks.len() > NUM_LANDMARKS {
            return Err(Error::TooManyLandmarks(landmarks.len(), NUM_LANDMARKS));
        }
        landmarks
            .into_iter()
            .enumerate()
            .try_fold(Self::default(), |detection, (index, landmark)| {
                Ok(detection.with_landmark(LandmarkKind::from_index(index)?, landmark))
            })
    }

    pub fn with_landmark(mut self, kind: LandmarkKind, landmark: DetectedLandmark) -> Self {
        self.landmarks[kind.idx()] = Some(landmark);
        self
    }

    pub fn without_landmark(mut self, kind: LandmarkKind) -> Self {
        self.landmarks[kind.idx()] = None;
        self
    }

    #[inline]
    pub fn get(&self, kind: LandmarkKind) -> Option<&DetectedLandmark> {
        self.landmarks[kind.idx()].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkKind, &DetectedLandmark)> + '_ {
        LandmarkKind::iter()
            .filter_map(move |kind| self.landmarks[kind.idx()].as_ref().map(|point| (kind, point)))
    }

    pub fn len(&self) -> usize {
        self.landmarks.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(Option::is_none)
    }
}

/// A recorded detection, one landmark per line:
///
/// ```text
/// # landmark  x       y       world_x  world_y  world_z
/// nose        0.512   0.201   -0.012   -0.601   -0.280
/// 11          0.581   0.322    0.151   -0.472   -0.117
/// ```
///
/// The landmark may be given by name or id. Blank lines and lines starting
/// with `#` are skipped.
impl FromStr for Detection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const NUM_FIELDS: usize = 6;

        let mut detection = Self::default();

        for (line_index, line) in s.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() != NUM_FIELDS {
                return Err(Error::ParseLine {
                    line: line_number,
                    reason: format!("expected {} fields, got {}", NUM_FIELDS, fields.len()),
                });
            }

            let kind = fields[0].parse::<LandmarkKind>()?;
            let mut values = [0.0_f32; NUM_FIELDS - 1];
            for (value, field) in values.iter_mut().zip(&fields[1..]) {
                *value = field.parse().map_err(|e| Error::ParseLine {
                    line: line_number,
                    reason: format!("invalid number {:?}: {}", field, e),
                })?;
            }

            let slot = &mut detection.landmarks[kind.idx()];
            if slot.is_some() {
                return Err(Error::ParseLine {
                    line: line_number,
                    reason: format!("duplicate landmark {}", kind),
                });
            }
            let [x, y, world_x, world_y, world_z] = values;
            *slot = Some(DetectedLandmark::new(x, y, world_x, world_y, world_z)?);
        }

        Ok(detection)
    }
}
