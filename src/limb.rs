use crate::{
    angle::{self, JointAngle, Undefined},
    error::Error,
    landmark::{Landmark, LandmarkKind, Landmarks},
};
use num_traits::FromPrimitive;
use opencv::core::{Point2i, Point3f};
use std::{fmt, str::FromStr};
use tracing::debug;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, num_derive::FromPrimitive,
)]
pub enum LimbKind {
    RightArm,
    RightForearm,
    LeftArm,
    LeftForearm,
    LeftLeg,
    LeftCalf,
    RightLeg,
    RightCalf,
    LeftSole,
    RightSole,
    RightForefoot,
    LeftForefoot,
    LeftTorso,
    RightTorso,
    Shoulders,
    Hips,
}

pub const NUM_LIMBS: usize = 16;

impl LimbKind {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        constants::LIMB_NAMES[self.idx()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        constants::LIMB_NAMES
            .iter()
            .position(|&candidate| candidate == name)
            .and_then(Self::from_usize)
    }

    /// The connectivity table row for this limb.
    pub fn endpoints(self) -> (LandmarkKind, LandmarkKind) {
        let (first, second, _) = constants::CONNECTIONS[self.idx()];
        (first, second)
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        (0..NUM_LIMBS).filter_map(Self::from_usize)
    }
}

impl fmt::Display for LimbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LimbKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownLimb(s.to_owned()))
    }
}

/// Which end of a limb segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum End {
    First,
    Second,
}

impl End {
    pub fn opposite(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LimbSegment {
    kind: LimbKind,
    first: Landmark,
    second: Landmark,
    vector: Point2i,
}

impl LimbSegment {
    pub(crate) fn new(kind: LimbKind, first: Landmark, second: Landmark) -> Self {
        let (a, b) = (first.image_coords(), second.image_coords());
        Self {
            kind,
            first,
            second,
            vector: Point2i::new(b.x - a.x, b.y - a.y),
        }
    }

    #[inline]
    pub fn kind(&self) -> LimbKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[inline]
    pub fn first(&self) -> &Landmark {
        &self.first
    }

    #[inline]
    pub fn second(&self) -> &Landmark {
        &self.second
    }

    pub fn endpoint(&self, end: End) -> &Landmark {
        match end {
            End::First => &self.first,
            End::Second => &self.second,
        }
    }

    /// `second - first` in image coordinates.
    #[inline]
    pub fn vector(&self) -> Point2i {
        self.vector
    }

    pub fn world_vector(&self) -> Point3f {
        let (a, b) = (self.first.world_coords(), self.second.world_coords());
        Point3f::new(b.x - a.x, b.y - a.y, b.z - a.z)
    }

    pub fn midpoint(&self) -> Point2i {
        let (a, b) = (self.first.image_coords(), self.second.image_coords());
        Point2i::new((a.x + b.x) / 2, (a.y + b.y) / 2)
    }
}

/// Limb segments derived from one set of landmarks, indexed by [`LimbKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct LimbGraph {
    limbs: [Option<LimbSegment>; NUM_LIMBS],
}

impl LimbGraph {
    pub fn build(landmarks: &Landmarks) -> Self {
        let mut limbs = [None; NUM_LIMBS];
        for &(first, second, kind) in constants::CONNECTIONS.iter() {
            if let (Some(&a), Some(&b)) = (landmarks.get(first), landmarks.get(second)) {
                limbs[kind.idx()] = Some(LimbSegment::new(kind, a, b));
            }
        }
        let graph = Self { limbs };
        if graph.len() < NUM_LIMBS {
            debug!(
                message = "missing limbs",
                present = graph.len(),
                expected = NUM_LIMBS
            );
        }
        graph
    }

    #[inline]
    pub fn get(&self, kind: LimbKind) -> Option<&LimbSegment> {
        self.limbs[kind.idx()].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LimbSegment> + '_ {
        self.limbs.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Angle at the joint shared by any two limbs, whitelisted or not.
    pub fn angle_between(&self, a: LimbKind, b: LimbKind) -> JointAngle {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => angle::compute_angle(a, b),
            (None, _) => JointAngle::Undefined(Undefined::MissingLimb(a)),
            (_, None) => JointAngle::Undefined(Undefined::MissingLimb(b)),
        }
    }
}

pub(crate) mod constants {
    use super::{
        LimbKind::{self, *},
        NUM_LIMBS,
    };
    use crate::landmark::LandmarkKind::{self, *};

    pub(crate) const LIMB_NAMES: [&str; NUM_LIMBS] = [
        "right_arm",
        "right_forearm",
        "left_arm",
        "left_forearm",
        "left_leg",
        "left_calf",
        "right_leg",
        "right_calf",
        "left_sole",
        "right_sole",
        "right_forefoot",
        "left_forefoot",
        "left_torso",
        "right_torso",
        "shoulders",
        "hips",
    ];

    /// Rows are in `LimbKind` order.
    pub(crate) const CONNECTIONS: [(LandmarkKind, LandmarkKind, LimbKind); NUM_LIMBS] = [
        (RightShoulder, RightElbow, RightArm),
        (RightElbow, RightWrist, RightForearm),
        (LeftShoulder, LeftElbow, LeftArm),
        (LeftElbow, LeftWrist, LeftForearm),
        (LeftHip, LeftKnee, LeftLeg),
        (LeftKnee, LeftAnkle, LeftCalf),
        (RightHip, RightKnee, RightLeg),
        (RightKnee, RightAnkle, RightCalf),
        (LeftHeel, LeftFootIndex, LeftSole),
        (RightHeel, RightFootIndex, RightSole),
        (RightAnkle, RightFootIndex, RightForefoot),
        (LeftAnkle, LeftFootIndex, LeftForefoot),
        (LeftShoulder, LeftHip, LeftTorso),
        (RightShoulder, RightHip, RightTorso),
        (LeftShoulder, RightShoulder, Shoulders),
        (LeftHip, RightHip, Hips),
    ];
}
