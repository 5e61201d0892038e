use crate::{
    error::Error,
    landmark::Landmark,
    limb::{End, LimbGraph, LimbKind, LimbSegment},
};
use num_traits::FromPrimitive;
use opencv::core::Point2i;
use std::fmt;
use tracing::trace;

/// Below this magnitude a slope difference or `1 + m0 * m1` counts as zero.
const EPSILON: f64 = 1e-9;

/// The limb pairs an angle is reported for, named after the joint they meet at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, num_derive::FromPrimitive)]
pub enum AnglePair {
    RightElbow,
    LeftElbow,
    RightKnee,
    LeftKnee,
    RightAnkle,
    LeftAnkle,
    RightShoulder,
    LeftShoulder,
    RightHip,
    LeftHip,
}

pub const NUM_ANGLE_PAIRS: usize = 10;

impl AnglePair {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        (0..NUM_ANGLE_PAIRS).filter_map(Self::from_usize)
    }

    /// The two limbs, in the orientation the angle is measured in.
    pub fn limbs(self) -> (LimbKind, LimbKind) {
        constants::WHITELIST[self.idx()]
    }

    pub fn joint(self) -> &'static str {
        constants::JOINT_NAMES[self.idx()]
    }

    /// Look up a pair in exactly the given orientation.
    pub fn find(a: LimbKind, b: LimbKind) -> Option<Self> {
        Self::iter().find(|pair| pair.limbs() == (a, b))
    }

    /// Look up a pair in either orientation.
    pub fn lookup(a: LimbKind, b: LimbKind) -> Option<Self> {
        Self::find(a, b).or_else(|| Self::find(b, a))
    }
}

impl fmt::Display for AnglePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.limbs();
        write!(f, "{}|{}", a, b)
    }
}

/// Why an angle could not be measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Undefined {
    /// One of the limbs is absent from the frame.
    MissingLimb(LimbKind),
    /// The limbs do not share an endpoint.
    NotAdjacent,
    /// A vertical limb, perpendicular slopes, or colinear limbs.
    DegenerateGeometry,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum JointAngle {
    /// Degrees, strictly between 0 and 180.
    Degrees(f64),
    Undefined(Undefined),
}

impl JointAngle {
    pub fn degrees(self) -> Option<f64> {
        match self {
            Self::Degrees(degrees) => Some(degrees),
            Self::Undefined(_) => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Self::Degrees(_))
    }
}

impl fmt::Display for JointAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degrees(degrees) => write!(f, "{:.1}", degrees),
            Self::Undefined(_) => f.write_str("undefined"),
        }
    }
}

/// Where two limb segments meet.
///
/// The variant names the end of the first segment that is shared and the
/// payload names the matching end of the second segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SharedEndpoint {
    SharedAtFirst(End),
    SharedAtSecond(End),
    NoSharedEndpoint,
}

/// Compare landmark ids across the four endpoint pairings of `a` and `b`.
pub fn shared_endpoint(a: &LimbSegment, b: &LimbSegment) -> SharedEndpoint {
    let (a0, a1) = (a.first().kind(), a.second().kind());
    let (b0, b1) = (b.first().kind(), b.second().kind());

    if a0 == b0 {
        SharedEndpoint::SharedAtFirst(End::First)
    } else if a0 == b1 {
        SharedEndpoint::SharedAtFirst(End::Second)
    } else if a1 == b0 {
        SharedEndpoint::SharedAtSecond(End::First)
    } else if a1 == b1 {
        SharedEndpoint::SharedAtSecond(End::Second)
    } else {
        SharedEndpoint::NoSharedEndpoint
    }
}

/// The shared landmark of two adjacent segments plus their free endpoints.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Joint {
    pub common: Landmark,
    pub a: Landmark,
    pub b: Landmark,
}

impl Joint {
    pub fn resolve(a: &LimbSegment, b: &LimbSegment) -> Option<Self> {
        let (a_end, b_end) = match shared_endpoint(a, b) {
            SharedEndpoint::SharedAtFirst(b_end) => (End::First, b_end),
            SharedEndpoint::SharedAtSecond(b_end) => (End::Second, b_end),
            SharedEndpoint::NoSharedEndpoint => return None,
        };
        Some(Self {
            common: *a.endpoint(a_end),
            a: *a.endpoint(a_end.opposite()),
            b: *b.endpoint(b_end.opposite()),
        })
    }
}

/// Slope of the line from `p` to `common`, `None` when it is vertical.
fn slope(p: Point2i, common: Point2i) -> Option<f64> {
    let dx = common.x - p.x;
    if dx == 0 {
        None
    } else {
        Some(f64::from(common.y - p.y) / f64::from(dx))
    }
}

/// Fold a raw arctangent in degrees into `(0, 180]`.
///
/// Exactly zero maps to 180.
fn fold_degrees(degrees: f64) -> f64 {
    if degrees > 0.0 {
        degrees
    } else {
        180.0 + degrees
    }
}

fn included_angle(a: Point2i, b: Point2i, common: Point2i) -> Option<f64> {
    let m0 = slope(a, common)?;
    let m1 = slope(b, common)?;
    let numerator = m1 - m0;
    let denominator = 1.0 + m0 * m1;
    if numerator.abs() < EPSILON || denominator.abs() < EPSILON {
        return None;
    }
    Some(fold_degrees((numerator / denominator).atan().to_degrees()))
}

/// Order the arguments the way the whitelist does, or by limb id for pairs
/// outside it, so that the result does not depend on argument order.
fn canonical_order<'a>(
    a: &'a LimbSegment,
    b: &'a LimbSegment,
) -> (&'a LimbSegment, &'a LimbSegment) {
    let swap = if AnglePair::find(a.kind(), b.kind()).is_some() {
        false
    } else if AnglePair::find(b.kind(), a.kind()).is_some() {
        true
    } else {
        b.kind() < a.kind()
    };
    if swap {
        (b, a)
    } else {
        (a, b)
    }
}

/// The included angle at the joint shared by two limb segments.
pub fn compute_angle(a: &LimbSegment, b: &LimbSegment) -> JointAngle {
    let (a, b) = canonical_order(a, b);
    let joint = match Joint::resolve(a, b) {
        Some(joint) => joint,
        None => return JointAngle::Undefined(Undefined::NotAdjacent),
    };
    included_angle(
        joint.a.image_coords(),
        joint.b.image_coords(),
        joint.common.image_coords(),
    )
    .map_or(
        JointAngle::Undefined(Undefined::DegenerateGeometry),
        JointAngle::Degrees,
    )
}

/// Angles for every whitelisted pair of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleMap {
    angles: [JointAngle; NUM_ANGLE_PAIRS],
}

impl AngleMap {
    pub fn compute(limbs: &LimbGraph) -> Self {
        let mut angles = [JointAngle::Undefined(Undefined::NotAdjacent); NUM_ANGLE_PAIRS];
        for pair in AnglePair::iter() {
            let (a, b) = pair.limbs();
            let angle = limbs.angle_between(a, b);
            trace!(joint = pair.joint(), angle = ?angle);
            angles[pair.idx()] = angle;
        }
        Self { angles }
    }

    #[inline]
    pub fn get(&self, pair: AnglePair) -> JointAngle {
        self.angles[pair.idx()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnglePair, JointAngle)> + '_ {
        AnglePair::iter().map(move |pair| (pair, self.get(pair)))
    }

    /// Only the pairs with a measured angle.
    pub fn defined(&self) -> impl Iterator<Item = (AnglePair, f64)> + '_ {
        self.iter()
            .filter_map(|(pair, angle)| angle.degrees().map(|degrees| (pair, degrees)))
    }

    pub fn query(&self, a: LimbKind, b: LimbKind) -> Result<JointAngle, Error> {
        AnglePair::lookup(a, b)
            .map(|pair| self.get(pair))
            .ok_or_else(|| Error::NotFound(a.to_string(), b.to_string()))
    }

    /// Like [`AngleMap::query`], but names that are not limbs are also
    /// reported as not found.
    pub fn query_by_name(&self, a: &str, b: &str) -> Result<JointAngle, Error> {
        match (LimbKind::from_name(a), LimbKind::from_name(b)) {
            (Some(a), Some(b)) => self.query(a, b),
            _ => Err(Error::NotFound(a.to_owned(), b.to_owned())),
        }
    }
}

pub(crate) mod constants {
    use super::NUM_ANGLE_PAIRS;
    use crate::limb::LimbKind::{self, *};

    /// Rows are in `AnglePair` order.
    pub(crate) const WHITELIST: [(LimbKind, LimbKind); NUM_ANGLE_PAIRS] = [
        (RightArm, RightForearm),
        (LeftArm, LeftForearm),
        (RightCalf, RightLeg),
        (LeftCalf, LeftLeg),
        (RightCalf, RightForefoot),
        (LeftCalf, LeftForefoot),
        (RightArm, RightTorso),
        (LeftArm, LeftTorso),
        (RightLeg, RightTorso),
        (LeftLeg, LeftTorso),
    ];

    pub(crate) const JOINT_NAMES: [&str; NUM_ANGLE_PAIRS] = [
        "right_elbow",
        "left_elbow",
        "right_knee",
        "left_knee",
        "right_ankle",
        "left_ankle",
        "right_shoulder",
        "left_shoulder",
        "right_hip",
        "left_hip",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        detection::{DetectedLandmark, Detection},
        landmark::{LandmarkKind, Landmarks, NUM_LANDMARKS},
    };
    use assert_approx_eq::assert_approx_eq;

    fn pixel(x: f32, y: f32) -> DetectedLandmark {
        DetectedLandmark::new(x / 1000.0, y / 1000.0, 0.0, 0.0, 0.0).unwrap()
    }

    fn limbs(points: &[(LandmarkKind, f32, f32)]) -> LimbGraph {
        let detection = points
            .iter()
            .fold(Detection::new(), |detection, &(kind, x, y)| {
                detection.with_landmark(kind, pixel(x, y))
            });
        LimbGraph::build(&Landmarks::build(&detection, 1000, 1000).unwrap())
    }

    fn right_arm() -> LimbGraph {
        limbs(&[
            (LandmarkKind::RightShoulder, 100.0, 100.0),
            (LandmarkKind::RightElbow, 150.0, 140.0),
            (LandmarkKind::RightWrist, 200.0, 120.0),
        ])
    }

    /// A full body with no vertical or perpendicular limbs.
    fn body() -> LimbGraph {
        let detection = Detection::from_landmarks((0..NUM_LANDMARKS).map(|i| {
            let i = i as f32;
            pixel(100.0 + 13.0 * i + (i * i) % 7.0, 120.0 + 19.0 * i - (i * i) % 11.0)
        }))
        .unwrap();
        LimbGraph::build(&Landmarks::build(&detection, 1000, 1000).unwrap())
    }

    mod shared_endpoint_tests {
        use super::*;

        #[test]
        fn all_pairings() {
            let graph = body();
            let get = |kind| *graph.get(kind).unwrap();
            let (arm, forearm) = (get(LimbKind::RightArm), get(LimbKind::RightForearm));
            let (calf, leg) = (get(LimbKind::RightCalf), get(LimbKind::RightLeg));
            let torso = get(LimbKind::RightTorso);
            let shoulders = get(LimbKind::Shoulders);

            // shoulder is first on both
            assert_eq!(
                shared_endpoint(&arm, &torso),
                SharedEndpoint::SharedAtFirst(End::First)
            );
            // right shoulder is second on shoulders
            assert_eq!(
                shared_endpoint(&arm, &shoulders),
                SharedEndpoint::SharedAtFirst(End::Second)
            );
            assert_eq!(
                shared_endpoint(&arm, &forearm),
                SharedEndpoint::SharedAtSecond(End::First)
            );
            assert_eq!(
                shared_endpoint(&calf, &leg),
                SharedEndpoint::SharedAtFirst(End::Second)
            );
            assert_eq!(
                shared_endpoint(&leg, &calf),
                SharedEndpoint::SharedAtSecond(End::First)
            );
            let forefoot = get(LimbKind::RightForefoot);
            let sole = get(LimbKind::RightSole);
            assert_eq!(
                shared_endpoint(&forefoot, &sole),
                SharedEndpoint::SharedAtSecond(End::Second)
            );
            assert_eq!(
                shared_endpoint(&forearm, &leg),
                SharedEndpoint::NoSharedEndpoint
            );
        }

        #[test]
        fn joint_free_endpoints() {
            let graph = right_arm();
            let arm = graph.get(LimbKind::RightArm).unwrap();
            let forearm = graph.get(LimbKind::RightForearm).unwrap();
            let joint = Joint::resolve(arm, forearm).unwrap();
            assert_eq!(joint.common.kind(), LandmarkKind::RightElbow);
            assert_eq!(joint.a.kind(), LandmarkKind::RightShoulder);
            assert_eq!(joint.b.kind(), LandmarkKind::RightWrist);
        }
    }

    mod compute_angle_tests {
        use super::*;

        #[test]
        fn worked_example() {
            let graph = right_arm();
            let arm = graph.get(LimbKind::RightArm).unwrap();
            let forearm = graph.get(LimbKind::RightForearm).unwrap();
            assert_approx_eq!(compute_angle(arm, forearm).degrees().unwrap(), 119.54, 1e-2);
            let expected = 180.0 - (1.2_f64 / 0.68).atan().to_degrees();
            assert_approx_eq!(compute_angle(arm, forearm).degrees().unwrap(), expected, 1e-3);
        }

        #[test]
        fn symmetric_for_whitelist() {
            let graph = body();
            for pair in AnglePair::iter() {
                let (a, b) = pair.limbs();
                let (a, b) = (graph.get(a).unwrap(), graph.get(b).unwrap());
                assert_eq!(compute_angle(a, b), compute_angle(b, a), "{}", pair);
                assert!(compute_angle(a, b).is_defined(), "{}", pair);
            }
        }

        #[test]
        fn symmetric_outside_whitelist() {
            let graph = body();
            let shoulders = graph.get(LimbKind::Shoulders).unwrap();
            let torso = graph.get(LimbKind::LeftTorso).unwrap();
            assert_eq!(
                compute_angle(shoulders, torso),
                compute_angle(torso, shoulders)
            );
        }

        #[test]
        fn defined_angles_are_open_interval() {
            let graph = body();
            for a in graph.iter() {
                for b in graph.iter() {
                    if let Some(degrees) = compute_angle(a, b).degrees() {
                        assert!(degrees > 0.0 && degrees < 180.0, "{} {}", a.name(), b.name());
                    }
                }
            }
        }

        #[test]
        fn not_adjacent() {
            let graph = body();
            let arm = graph.get(LimbKind::RightArm).unwrap();
            let calf = graph.get(LimbKind::LeftCalf).unwrap();
            assert_eq!(
                compute_angle(arm, calf),
                JointAngle::Undefined(Undefined::NotAdjacent)
            );
        }

        #[test]
        fn vertical_limb_is_degenerate() {
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 150.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 140.0),
                (LandmarkKind::RightWrist, 200.0, 120.0),
            ]);
            assert_eq!(
                graph.angle_between(LimbKind::RightArm, LimbKind::RightForearm),
                JointAngle::Undefined(Undefined::DegenerateGeometry)
            );
        }

        #[test]
        fn perpendicular_is_degenerate() {
            // slopes 1 and -1
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 100.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 150.0),
                (LandmarkKind::RightWrist, 200.0, 100.0),
            ]);
            assert_eq!(
                graph.angle_between(LimbKind::RightArm, LimbKind::RightForearm),
                JointAngle::Undefined(Undefined::DegenerateGeometry)
            );
        }

        #[test]
        fn colinear_is_degenerate() {
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 100.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 140.0),
                (LandmarkKind::RightWrist, 200.0, 180.0),
            ]);
            assert_eq!(
                graph.angle_between(LimbKind::RightArm, LimbKind::RightForearm),
                JointAngle::Undefined(Undefined::DegenerateGeometry)
            );
        }

        #[test]
        fn negative_raw_angle_is_folded() {
            // m0 = 0.8, m1 = 0.2
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 100.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 140.0),
                (LandmarkKind::RightWrist, 200.0, 150.0),
            ]);
            let raw = (-0.6_f64 / 1.16).atan().to_degrees();
            let angle = graph
                .angle_between(LimbKind::RightArm, LimbKind::RightForearm)
                .degrees()
                .unwrap();
            assert_approx_eq!(angle, 180.0 + raw, 1e-9);
        }

        #[test]
        fn positive_raw_angle_is_kept() {
            // m0 = 0.8, m1 = 1.2
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 100.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 140.0),
                (LandmarkKind::RightWrist, 200.0, 200.0),
            ]);
            let raw = (0.4_f64 / 1.96).atan().to_degrees();
            let angle = graph
                .angle_between(LimbKind::RightArm, LimbKind::RightForearm)
                .degrees()
                .unwrap();
            assert_approx_eq!(angle, raw, 1e-9);
        }

        #[test]
        fn fold_boundary() {
            assert_approx_eq!(fold_degrees(0.0), 180.0);
            assert_approx_eq!(fold_degrees(-30.0), 150.0);
            assert_approx_eq!(fold_degrees(45.0), 45.0);
        }

        #[test]
        fn idempotent() {
            let graph = body();
            let first = AngleMap::compute(&graph);
            let second = AngleMap::compute(&graph);
            assert_eq!(first, second);
        }
    }

    mod angle_map_tests {
        use super::*;

        #[test]
        fn whitelist_joints_share_a_landmark() {
            let graph = body();
            let expected = [
                LandmarkKind::RightElbow,
                LandmarkKind::LeftElbow,
                LandmarkKind::RightKnee,
                LandmarkKind::LeftKnee,
                LandmarkKind::RightAnkle,
                LandmarkKind::LeftAnkle,
                LandmarkKind::RightShoulder,
                LandmarkKind::LeftShoulder,
                LandmarkKind::RightHip,
                LandmarkKind::LeftHip,
            ];
            for (pair, &landmark) in AnglePair::iter().zip(expected.iter()) {
                let (a, b) = pair.limbs();
                let joint = Joint::resolve(graph.get(a).unwrap(), graph.get(b).unwrap()).unwrap();
                assert_eq!(joint.common.kind(), landmark);
                assert_eq!(pair.joint(), landmark.name());
            }
        }

        #[test]
        fn query_both_orders() {
            let angles = AngleMap::compute(&right_arm());
            let forward = angles
                .query(LimbKind::RightArm, LimbKind::RightForearm)
                .unwrap();
            let backward = angles
                .query(LimbKind::RightForearm, LimbKind::RightArm)
                .unwrap();
            assert_eq!(forward, backward);
            assert_approx_eq!(forward.degrees().unwrap(), 119.54, 1e-2);

            let by_name = angles.query_by_name("right_forearm", "right_arm").unwrap();
            assert_eq!(by_name, forward);
        }

        #[test]
        fn query_outside_whitelist() {
            let angles = AngleMap::compute(&right_arm());
            assert!(matches!(
                angles.query_by_name("nose", "left_ear"),
                Err(Error::NotFound(_, _))
            ));
            assert!(matches!(
                angles.query(LimbKind::Shoulders, LimbKind::Hips),
                Err(Error::NotFound(_, _))
            ));
        }

        #[test]
        fn missing_landmark_is_undefined() {
            let graph = limbs(&[
                (LandmarkKind::RightShoulder, 100.0, 100.0),
                (LandmarkKind::RightElbow, 150.0, 140.0),
            ]);
            assert!(graph.get(LimbKind::RightForearm).is_none());
            let angles = AngleMap::compute(&graph);
            assert_eq!(
                angles.query(LimbKind::RightArm, LimbKind::RightForearm).unwrap(),
                JointAngle::Undefined(Undefined::MissingLimb(LimbKind::RightForearm))
            );
        }

        #[test]
        fn pairs_are_independent() {
            let angles = AngleMap::compute(&right_arm());
            let defined = angles.defined().collect::<Vec<_>>();
            assert_eq!(defined.len(), 1);
            assert_eq!(defined[0].0, AnglePair::RightElbow);
            assert_eq!(angles.iter().count(), NUM_ANGLE_PAIRS);
        }

        #[test]
        fn lookup_orientation() {
            assert_eq!(
                AnglePair::find(LimbKind::RightCalf, LimbKind::RightLeg),
                Some(AnglePair::RightKnee)
            );
            assert_eq!(AnglePair::find(LimbKind::RightLeg, LimbKind::RightCalf), None);
            assert_eq!(
                AnglePair::lookup(LimbKind::RightLeg, LimbKind::RightCalf),
                Some(AnglePair::RightKnee)
            );
            assert_eq!(AnglePair::RightKnee.to_string(), "right_calf|right_leg");
        }

        #[test]
        fn display() {
            assert_eq!(JointAngle::Degrees(119.5437).to_string(), "119.5");
            assert_eq!(
                JointAngle::Undefined(Undefined::NotAdjacent).to_string(),
                "undefined"
            );
        }
    }
}
