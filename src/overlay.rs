use crate::{
    angle::{AngleMap, AnglePair, Joint},
    error::Error,
    landmark::Landmarks,
    limb::LimbGraph,
};
use opencv::{
    core::{Mat, Point2i, Scalar, CV_8UC3},
    imgproc::{FILLED, FONT_HERSHEY_SIMPLEX, LINE_8, LINE_AA},
    prelude::*,
};
use std::{fmt, path::Path, str::FromStr};

const FONT_SCALE: f64 = 0.5;
const SEGMENT_LABEL_OFFSET: i32 = -20;
const ANGLE_LABEL_OFFSET: i32 = 20;

/// A B,G,R color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color(pub f64, pub f64, pub f64);

impl Color {
    pub const BLACK: Self = Self(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self(255.0, 255.0, 255.0);
    pub const GREEN: Self = Self(0.0, 255.0, 0.0);
    pub const YELLOW: Self = Self(0.0, 255.0, 255.0);
}

impl From<Color> for Scalar {
    fn from(Color(b, g, r): Color) -> Self {
        Scalar::from((b, g, r))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

/// Parses `b,g,r`.
impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split(',')
            .map(|channel| channel.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::ParseColor(s.to_owned()))?;
        match channels.as_slice() {
            &[b, g, r] => Ok(Self(b, g, r)),
            _ => Err(Error::ParseColor(s.to_owned())),
        }
    }
}

const DEFAULT_RADIUS: &str = "4";
const DEFAULT_THICKNESS: &str = "2";
const DEFAULT_LANDMARK_COLOR: &str = "0,255,0";
const DEFAULT_SEGMENT_COLOR: &str = "0,255,255";

#[derive(Debug, Clone, Copy, PartialEq, structopt::StructOpt)]
pub struct OverlayStyle {
    /// Radius of the landmark markers, in pixels.
    #[structopt(long, default_value = DEFAULT_RADIUS)]
    pub radius: i32,
    /// Thickness of the limb segment lines, in pixels.
    #[structopt(long, default_value = DEFAULT_THICKNESS)]
    pub thickness: i32,
    /// Landmark marker color as b,g,r.
    #[structopt(long, default_value = DEFAULT_LANDMARK_COLOR)]
    pub landmark_color: Color,
    /// Limb segment color as b,g,r.
    #[structopt(long, default_value = DEFAULT_SEGMENT_COLOR)]
    pub segment_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            radius: 4,
            thickness: 2,
            landmark_color: Color::GREEN,
            segment_color: Color::YELLOW,
        }
    }
}

fn copy(image: &Mat) -> Result<Mat, Error> {
    let mut out = Mat::zeros(image.rows(), image.cols(), CV_8UC3)
        .and_then(|zeros| zeros.to_mat())
        .map_err(Error::CopyImage)?;
    image.copy_to(&mut out).map_err(Error::CopyImage)?;
    Ok(out)
}

fn put_text(image: &mut Mat, text: &str, origin: Point2i, color: Color) -> Result<(), Error> {
    opencv::imgproc::put_text(
        image,
        text,
        origin,
        FONT_HERSHEY_SIMPLEX,
        FONT_SCALE,
        Scalar::from(color),
        1,       // thickness
        LINE_AA, // line_type
        false,   // bottom_left_origin
    )
    .map_err(Error::PutText)
}

/// A copy of `image` with a filled marker at every landmark.
pub fn draw_landmarks(
    image: &Mat,
    landmarks: &Landmarks,
    radius: i32,
    color: Scalar,
) -> Result<Mat, Error> {
    let mut out = copy(image)?;
    landmarks.iter().try_for_each(|landmark| {
        opencv::imgproc::circle(
            &mut out,
            landmark.image_coords(),
            radius,
            color,
            FILLED, // thickness
            LINE_8, // line_type
            0,      // shift
        )
        .map_err(Error::DrawCircle)
    })?;
    Ok(out)
}

/// A copy of `image` with a line along every limb segment.
pub fn draw_segments(
    image: &Mat,
    limbs: &LimbGraph,
    color: Scalar,
    thickness: i32,
) -> Result<Mat, Error> {
    let mut out = copy(image)?;
    for limb in limbs.iter() {
        opencv::imgproc::line(
            &mut out,
            limb.first().image_coords(),
            limb.second().image_coords(),
            color,
            thickness,
            LINE_8, // line_type
            0,      // shift
        )
        .map_err(Error::DrawLine)?;
    }
    Ok(out)
}

/// A copy of `image` with each limb's name written near its midpoint.
pub fn label_segments(image: &Mat, limbs: &LimbGraph) -> Result<Mat, Error> {
    let mut out = copy(image)?;
    for limb in limbs.iter() {
        let midpoint = limb.midpoint();
        let origin = Point2i::new(
            midpoint.x + SEGMENT_LABEL_OFFSET,
            midpoint.y + SEGMENT_LABEL_OFFSET,
        );
        put_text(&mut out, limb.name(), origin, Color::BLACK)?;
    }
    Ok(out)
}

/// A copy of `image` with every measured angle written beside its joint.
/// Undefined angles are left out.
pub fn label_angles(image: &Mat, limbs: &LimbGraph, angles: &AngleMap) -> Result<Mat, Error> {
    let mut out = copy(image)?;
    for (pair, degrees) in angles.defined() {
        if let Some(joint) = joint(limbs, pair) {
            let common = joint.common.image_coords();
            let origin = Point2i::new(common.x + ANGLE_LABEL_OFFSET, common.y + ANGLE_LABEL_OFFSET);
            put_text(&mut out, &format!("{:.1}", degrees), origin, Color::WHITE)?;
        }
    }
    Ok(out)
}

fn joint(limbs: &LimbGraph, pair: AnglePair) -> Option<Joint> {
    let (a, b) = pair.limbs();
    Joint::resolve(limbs.get(a)?, limbs.get(b)?)
}

pub fn read_image<P>(path: P) -> Result<Mat, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let name = path
        .to_str()
        .ok_or_else(|| Error::PathToStr(path.to_path_buf()))?;
    let image = opencv::imgcodecs::imread(name, opencv::imgcodecs::IMREAD_COLOR)
        .map_err(|e| Error::ReadImage(e, path.to_path_buf()))?;
    if image.rows() == 0 || image.cols() == 0 {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }
    Ok(image)
}

pub fn write_image<P>(path: P, image: &Mat) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let name = path
        .to_str()
        .ok_or_else(|| Error::PathToStr(path.to_path_buf()))?;
    let written = opencv::imgcodecs::imwrite(name, image, &opencv::types::VectorOfi32::new())
        .map_err(|e| Error::WriteImage(e, path.to_path_buf()))?;
    if !written {
        return Err(Error::ImageNotWritten(path.to_path_buf()));
    }
    Ok(())
}
