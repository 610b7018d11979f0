//! Hand landmark input types and palm-center extraction.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Number of keypoints in one detected hand.
pub const KEYPOINT_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_BASE: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_BASE: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_BASE: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_BASE: usize = 17;
pub const PINKY_TIP: usize = 20;

/// Wrist plus the base joint of each non-thumb finger.
pub const PALM_INDICES: [usize; 5] = [WRIST, INDEX_BASE, MIDDLE_BASE, RING_BASE, PINKY_BASE];

/// Bone connections of the 21-point topology, finger by finger (base to tip).
pub const HAND_CONNECTIONS: [(usize, usize); 20] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// One landmark in image pixels. Missing, null or non-numeric coordinates
/// decode as NaN so a noisy detection spoils only its own hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub x: f32,
    #[serde(default = "nan", deserialize_with = "lenient_coord")]
    pub y: f32,
}

fn nan() -> f32 {
    f32::NAN
}

fn lenient_coord<'de, D>(de: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct Coord;

    impl<'de> Visitor<'de> for Coord {
        type Value = f32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a coordinate")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f32, E> {
            Ok(v.trim().parse().unwrap_or(f32::NAN))
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<f32, E> {
            Ok(f32::NAN)
        }

        fn visit_unit<E: de::Error>(self) -> Result<f32, E> {
            Ok(f32::NAN)
        }

        fn visit_none<E: de::Error>(self) -> Result<f32, E> {
            Ok(f32::NAN)
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<f32, A::Error> {
            while seq.next_element::<de::IgnoredAny>()?.is_some() {}
            Ok(f32::NAN)
        }

        fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<f32, A::Error> {
            while map.next_entry::<de::IgnoredAny, de::IgnoredAny>()?.is_some() {}
            Ok(f32::NAN)
        }
    }

    de.deserialize_any(Coord)
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Handedness label as reported by the landmark source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Handedness {
    Left,
    Right,
}

impl<'de> Deserialize<'de> for Handedness {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(de)?;
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Handedness::Left),
            "right" => Ok(Handedness::Right),
            other => Err(serde::de::Error::custom(format!(
                "handedness must be Left or Right, got '{other}'"
            ))),
        }
    }
}

/// One of the two independently tracked hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    pub const BOTH: [HandSide; 2] = [HandSide::Left, HandSide::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandSide::Left => "left",
            HandSide::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(HandSide::Left),
            "right" => Some(HandSide::Right),
            _ => None,
        }
    }
}

impl From<Handedness> for HandSide {
    fn from(h: Handedness) -> Self {
        match h {
            Handedness::Left => HandSide::Left,
            Handedness::Right => HandSide::Right,
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame's detection for one hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandDetection {
    pub handedness: Handedness,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

impl HandDetection {
    pub fn side(&self) -> HandSide {
        self.handedness.into()
    }

    pub fn palm_center(&self) -> Option<PalmCenter> {
        palm_center(&self.keypoints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PalmCenter {
    pub x: f32,
    pub y: f32,
}

/// Mean of the wrist and the four finger-base joints.
///
/// Returns `None` for fewer than 21 keypoints or a non-finite coordinate at
/// one of the palm indices; callers skip the tick in that case.
pub fn palm_center(keypoints: &[Keypoint]) -> Option<PalmCenter> {
    if keypoints.len() < KEYPOINT_COUNT {
        return None;
    }
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for &i in &PALM_INDICES {
        let kp = keypoints[i];
        if !kp.is_finite() {
            return None;
        }
        sx += kp.x;
        sy += kp.y;
    }
    let n = PALM_INDICES.len() as f32;
    Some(PalmCenter {
        x: sx / n,
        y: sy / n,
    })
}
