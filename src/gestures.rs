//! Gesture variants, per-gesture thresholds and best-match selection.

pub mod pose;
pub mod shapes;

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::landmarks::{HandSide, Keypoint};
use crate::trail::TrailPoint;

pub const DEFAULT_MIN_TRAIL_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gesture {
    Circle,
    HorizontalLine,
    VerticalLine,
    Zigzag,
    Triangle,
    Square,
    FistRaised,
}

impl Gesture {
    pub const ALL: [Gesture; 7] = [
        Gesture::Circle,
        Gesture::HorizontalLine,
        Gesture::VerticalLine,
        Gesture::Zigzag,
        Gesture::Triangle,
        Gesture::Square,
        Gesture::FistRaised,
    ];

    /// Trajectory gestures in evaluation order. On equal confidence the
    /// earlier entry wins.
    pub const DYNAMIC: [Gesture; 6] = [
        Gesture::Circle,
        Gesture::HorizontalLine,
        Gesture::VerticalLine,
        Gesture::Zigzag,
        Gesture::Triangle,
        Gesture::Square,
    ];

    pub const STATIC: [Gesture; 1] = [Gesture::FistRaised];

    /// Name reported to consumers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Circle => "circle",
            Gesture::HorizontalLine => "horizontalLine",
            Gesture::VerticalLine => "verticalLine",
            Gesture::Zigzag => "zigzag",
            Gesture::Triangle => "triangle",
            Gesture::Square => "square",
            Gesture::FistRaised => "fistRaised",
        }
    }

    /// Key used in profile tables.
    pub fn config_key(&self) -> &'static str {
        match self {
            Gesture::Circle => "circle",
            Gesture::HorizontalLine => "horizontal_line",
            Gesture::VerticalLine => "vertical_line",
            Gesture::Zigzag => "zigzag",
            Gesture::Triangle => "triangle",
            Gesture::Square => "square",
            Gesture::FistRaised => "fist_raised",
        }
    }

    /// Accepts either the reported name or the profile key.
    pub fn parse(s: &str) -> Option<Gesture> {
        let s = s.trim();
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s) || g.config_key() == s)
    }

    /// Raw trajectory score in [0, 1]. Static gestures always score 0 here.
    pub fn score_trail(&self, trail: &[TrailPoint]) -> f32 {
        match self {
            Gesture::Circle => shapes::circle(trail),
            Gesture::HorizontalLine => shapes::horizontal_line(trail),
            Gesture::VerticalLine => shapes::vertical_line(trail),
            Gesture::Zigzag => shapes::zigzag(trail),
            Gesture::Triangle => shapes::triangle(trail),
            Gesture::Square => shapes::square(trail),
            Gesture::FistRaised => 0.0,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-gesture confidence cutoffs. A score must be strictly above its cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub circle: f32,
    pub horizontal_line: f32,
    pub vertical_line: f32,
    pub zigzag: f32,
    pub triangle: f32,
    pub square: f32,
    pub fist_raised: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            circle: 0.8,
            horizontal_line: 0.7,
            vertical_line: 0.7,
            zigzag: 0.6,
            triangle: 0.65,
            square: 0.65,
            fist_raised: 0.75,
        }
    }
}

impl Thresholds {
    pub fn get(&self, g: Gesture) -> f32 {
        match g {
            Gesture::Circle => self.circle,
            Gesture::HorizontalLine => self.horizontal_line,
            Gesture::VerticalLine => self.vertical_line,
            Gesture::Zigzag => self.zigzag,
            Gesture::Triangle => self.triangle,
            Gesture::Square => self.square,
            Gesture::FistRaised => self.fist_raised,
        }
    }

    pub fn set(&mut self, g: Gesture, value: f32) {
        let slot = match g {
            Gesture::Circle => &mut self.circle,
            Gesture::HorizontalLine => &mut self.horizontal_line,
            Gesture::VerticalLine => &mut self.vertical_line,
            Gesture::Zigzag => &mut self.zigzag,
            Gesture::Triangle => &mut self.triangle,
            Gesture::Square => &mut self.square,
            Gesture::FistRaised => &mut self.fist_raised,
        };
        *slot = value;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for g in Gesture::ALL {
            let value = self.get(g);
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    gesture: g.config_key(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureResult {
    pub gesture: Gesture,
    pub confidence: f32,
}

/// One scorer's verdict, kept for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeScore {
    pub gesture: Gesture,
    pub score: f32,
    pub threshold: f32,
}

impl ShapeScore {
    pub fn passes(&self) -> bool {
        self.score > self.threshold
    }
}

/// Stateless classification over a trail and optional raw keypoints.
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: Thresholds,
    min_trail_points: usize,
    frame_height: f32,
    static_hand: Option<HandSide>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            min_trail_points: DEFAULT_MIN_TRAIL_POINTS,
            frame_height: pose::DEFAULT_FRAME_HEIGHT,
            static_hand: Some(HandSide::Right),
        }
    }
}

impl Classifier {
    pub fn new(
        thresholds: Thresholds,
        min_trail_points: usize,
        frame_height: f32,
        static_hand: Option<HandSide>,
    ) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        if min_trail_points == 0 {
            return Err(ConfigError::NonPositive {
                field: "min_trail_points",
            });
        }
        if !frame_height.is_finite() || frame_height <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "frame_height",
            });
        }
        Ok(Self {
            thresholds,
            min_trail_points,
            frame_height,
            static_hand,
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn min_trail_points(&self) -> usize {
        self.min_trail_points
    }

    /// Static poses first (they short-circuit), then trajectory shapes.
    pub fn classify(
        &self,
        side: HandSide,
        trail: &[TrailPoint],
        keypoints: Option<&[Keypoint]>,
    ) -> Option<GestureResult> {
        if let Some(kps) = keypoints {
            if self.static_hand == Some(side) {
                if let Some(hit) = self.classify_static(kps) {
                    return Some(hit);
                }
            }
        }
        self.classify_dynamic(trail)
    }

    pub fn classify_static(&self, keypoints: &[Keypoint]) -> Option<GestureResult> {
        let scores = Gesture::STATIC.into_iter().map(|g| {
            let score = match g {
                Gesture::FistRaised => pose::fist_raised(keypoints, self.frame_height),
                _ => 0.0,
            };
            ShapeScore {
                gesture: g,
                score,
                threshold: self.thresholds.get(g),
            }
        });
        select_best(scores)
    }

    pub fn classify_dynamic(&self, trail: &[TrailPoint]) -> Option<GestureResult> {
        if trail.len() < self.min_trail_points {
            return None;
        }
        select_best(self.scores(trail))
    }

    /// Every trajectory scorer's raw score, in evaluation order.
    pub fn scores(&self, trail: &[TrailPoint]) -> Vec<ShapeScore> {
        Gesture::DYNAMIC
            .into_iter()
            .map(|g| ShapeScore {
                gesture: g,
                score: g.score_trail(trail),
                threshold: self.thresholds.get(g),
            })
            .collect()
    }
}

/// Highest score above its own threshold; the first one wins a tie.
pub fn select_best(scores: impl IntoIterator<Item = ShapeScore>) -> Option<GestureResult> {
    let mut best: Option<GestureResult> = None;
    for s in scores {
        debug!("score {} = {:.3} (threshold {:.2})", s.gesture, s.score, s.threshold);
        if !s.passes() {
            continue;
        }
        if best.is_none_or(|b| s.score > b.confidence) {
            best = Some(GestureResult {
                gesture: s.gesture,
                confidence: s.score,
            });
        }
    }
    best
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::f32::consts::TAU;

    pub fn points(xy: &[(f32, f32)]) -> Vec<TrailPoint> {
        xy.iter()
            .enumerate()
            .map(|(i, &(x, y))| TrailPoint {
                x,
                y,
                sample_index: i as u64 + 1,
            })
            .collect()
    }

    /// `n` points evenly sampling a full turn, first and last coinciding.
    pub fn circle(n: usize, cx: f32, cy: f32, r: f32) -> Vec<TrailPoint> {
        let xy: Vec<(f32, f32)> = (0..n)
            .map(|i| {
                let a = TAU * i as f32 / (n - 1) as f32;
                (cx + r * a.cos(), cy + r * a.sin())
            })
            .collect();
        points(&xy)
    }

    pub fn line(n: usize, from: (f32, f32), to: (f32, f32)) -> Vec<TrailPoint> {
        let xy: Vec<(f32, f32)> = (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
            })
            .collect();
        points(&xy)
    }

    /// Walks the given corners in order, `per_edge` points per edge.
    pub fn polyline(corners: &[(f32, f32)], per_edge: usize) -> Vec<TrailPoint> {
        let mut xy = Vec::new();
        for w in corners.windows(2) {
            for i in 0..per_edge {
                let t = i as f32 / per_edge as f32;
                xy.push((w[0].0 + (w[1].0 - w[0].0) * t, w[0].1 + (w[1].1 - w[0].1) * t));
            }
        }
        if let Some(&last) = corners.last() {
            xy.push(last);
        }
        points(&xy)
    }
}
