//! Trajectory scorers. Each returns a confidence in [0, 1], 0 meaning "not
//! this shape", and never looks at any other scorer.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use crate::trail::TrailPoint;

// circle
const CIRCLE_MIN_POINTS: usize = 30;
const CIRCLE_MIN_RADIUS: f32 = 40.0;
const CIRCLE_MIN_COVERAGE: f32 = 0.65;
const CIRCLE_CLOSURE_DIST: f32 = 80.0;
const CIRCLE_CLOSURE_BONUS: f32 = 1.1;

// lines
const LINE_MIN_POINTS: usize = 20;
const LINE_MIN_SPAN: f32 = 100.0;
const LINE_MIN_AXIS_RATIO: f32 = 0.7;

// zigzag
const ZIGZAG_MIN_POINTS: usize = 25;
const ZIGZAG_NOISE: f32 = 3.0;
const ZIGZAG_MIN_CHANGES: usize = 3;
const ZIGZAG_SATURATION: f32 = 6.0;

// polygons
const CORNER_WINDOW: usize = 8;
const CORNER_ANGLE: f32 = FRAC_PI_4;
const SEGMENT_MIN_POINTS: usize = 5;

const TRIANGLE_MIN_POINTS: usize = 35;
const TRIANGLE_MIN_STRAIGHTNESS: f32 = 0.6;
const TRIANGLE_CORNERS: (usize, usize) = (2, 4);
const TRIANGLE_PENALTY: f32 = 0.8;

const SQUARE_MIN_POINTS: usize = 45;
const SQUARE_MIN_STRAIGHTNESS: f32 = 0.65;
const SQUARE_CORNERS: (usize, usize) = (3, 5);
const SQUARE_CLOSURE_DIST: f32 = 100.0;
const SQUARE_PENALTY: f32 = 0.85;

/// Low relative spread of distances to the centroid, over most of a turn.
pub fn circle(trail: &[TrailPoint]) -> f32 {
    if trail.len() < CIRCLE_MIN_POINTS {
        return 0.0;
    }
    let (cx, cy) = centroid(trail);
    let dists: Vec<f32> = trail.iter().map(|p| (p.x - cx).hypot(p.y - cy)).collect();
    let (mean, std) = mean_std(&dists);
    if mean < CIRCLE_MIN_RADIUS {
        return 0.0;
    }
    let circularity = 1.0 - (std / mean).min(1.0);

    let coverage = angular_coverage(trail, (cx, cy));
    if coverage < CIRCLE_MIN_COVERAGE {
        return 0.0;
    }

    let bonus = if closure_distance(trail) < CIRCLE_CLOSURE_DIST {
        CIRCLE_CLOSURE_BONUS
    } else {
        1.0
    };
    (circularity * coverage * bonus).min(1.0)
}

pub fn horizontal_line(trail: &[TrailPoint]) -> f32 {
    if trail.len() < LINE_MIN_POINTS {
        return 0.0;
    }
    let (x_range, y_range) = extents(trail);
    axis_line(x_range, y_range, trail)
}

pub fn vertical_line(trail: &[TrailPoint]) -> f32 {
    if trail.len() < LINE_MIN_POINTS {
        return 0.0;
    }
    let (x_range, y_range) = extents(trail);
    axis_line(y_range, x_range, trail)
}

fn axis_line(along: f32, across: f32, trail: &[TrailPoint]) -> f32 {
    if along < LINE_MIN_SPAN {
        return 0.0;
    }
    let alignment = 1.0 - (across / along).min(1.0);
    if alignment <= LINE_MIN_AXIS_RATIO {
        return 0.0;
    }
    alignment * straightness(trail)
}

/// Counts reversals of horizontal direction, ignoring sub-noise steps.
pub fn zigzag(trail: &[TrailPoint]) -> f32 {
    if trail.len() < ZIGZAG_MIN_POINTS {
        return 0.0;
    }
    let changes = direction_reversals(trail);
    if changes < ZIGZAG_MIN_CHANGES {
        return 0.0;
    }
    (changes as f32 / ZIGZAG_SATURATION).min(1.0)
}

pub fn triangle(trail: &[TrailPoint]) -> f32 {
    if trail.len() < TRIANGLE_MIN_POINTS {
        return 0.0;
    }
    let avg = mean_segment_straightness(trail, 3);
    let corners = count_corners(trail, CORNER_WINDOW);
    let corners_ok = (TRIANGLE_CORNERS.0..=TRIANGLE_CORNERS.1).contains(&corners);
    if avg > TRIANGLE_MIN_STRAIGHTNESS && corners_ok {
        avg * TRIANGLE_PENALTY
    } else {
        0.0
    }
}

pub fn square(trail: &[TrailPoint]) -> f32 {
    if trail.len() < SQUARE_MIN_POINTS {
        return 0.0;
    }
    let avg = mean_segment_straightness(trail, 4);
    let corners = count_corners(trail, CORNER_WINDOW);
    let corners_ok = (SQUARE_CORNERS.0..=SQUARE_CORNERS.1).contains(&corners);
    let closed = closure_distance(trail) < SQUARE_CLOSURE_DIST;
    if avg > SQUARE_MIN_STRAIGHTNESS && corners_ok && closed {
        avg * SQUARE_PENALTY
    } else {
        0.0
    }
}

// --- geometry helpers ---

pub fn centroid(trail: &[TrailPoint]) -> (f32, f32) {
    if trail.is_empty() {
        return (0.0, 0.0);
    }
    let n = trail.len() as f32;
    let sx: f32 = trail.iter().map(|p| p.x).sum();
    let sy: f32 = trail.iter().map(|p| p.y).sum();
    (sx / n, sy / n)
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var.sqrt())
}

/// Bounding-box width and height.
pub fn extents(trail: &[TrailPoint]) -> (f32, f32) {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for p in trail {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    if trail.is_empty() {
        return (0.0, 0.0);
    }
    (max_x - min_x, max_y - min_y)
}

fn closure_distance(trail: &[TrailPoint]) -> f32 {
    match (trail.first(), trail.last()) {
        (Some(a), Some(b)) => (b.x - a.x).hypot(b.y - a.y),
        _ => 0.0,
    }
}

/// Fraction of the four quadrants around `center` visited by the trail.
pub fn angular_coverage(trail: &[TrailPoint], center: (f32, f32)) -> f32 {
    let mut seen = [false; 4];
    for p in trail {
        let mut a = (p.y - center.1).atan2(p.x - center.0);
        if a < 0.0 {
            a += TAU;
        }
        let q = ((a / FRAC_PI_2) as usize).min(3);
        seen[q] = true;
    }
    seen.iter().filter(|s| **s).count() as f32 / 4.0
}

/// Explained-variance ratio of the principal axis, rescaled to [0, 1].
/// 1 for collinear points, 0 for an isotropic cloud.
pub fn straightness(trail: &[TrailPoint]) -> f32 {
    if trail.len() < 2 {
        return 0.0;
    }
    let n = trail.len() as f32;
    let (mx, my) = centroid(trail);
    let mut sxx = 0.0f32;
    let mut syy = 0.0f32;
    let mut sxy = 0.0f32;
    for p in trail {
        let dx = p.x - mx;
        let dy = p.y - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    sxx /= n;
    syy /= n;
    sxy /= n;
    let tr = sxx + syy;
    if tr <= f32::EPSILON {
        return 0.0;
    }
    let half = tr / 2.0;
    let det = sxx * syy - sxy * sxy;
    let disc = (half * half - det).max(0.0).sqrt();
    (2.0 * disc / tr).clamp(0.0, 1.0)
}

fn direction_reversals(trail: &[TrailPoint]) -> usize {
    let mut changes = 0;
    let mut last = 0i8;
    for w in trail.windows(2) {
        let dx = w[1].x - w[0].x;
        if dx.abs() <= ZIGZAG_NOISE {
            continue;
        }
        let dir = if dx > 0.0 { 1 } else { -1 };
        if last != 0 && dir != last {
            changes += 1;
        }
        last = dir;
    }
    changes
}

/// Direct distance over path length; 1 for a straight segment.
pub fn segment_straightness(segment: &[TrailPoint]) -> f32 {
    if segment.len() < 3 {
        return 0.0;
    }
    let direct = closure_distance(segment);
    let path: f32 = segment
        .windows(2)
        .map(|w| (w[1].x - w[0].x).hypot(w[1].y - w[0].y))
        .sum();
    if path <= 0.0 {
        return 0.0;
    }
    (direct / path).min(1.0)
}

/// Splits into `parts` equal runs (the last takes the remainder) and averages
/// their straightness. Runs too short to judge count as 0.
fn mean_segment_straightness(trail: &[TrailPoint], parts: usize) -> f32 {
    let size = trail.len() / parts;
    let mut total = 0.0;
    for i in 0..parts {
        let start = i * size;
        let end = if i + 1 == parts { trail.len() } else { start + size };
        let seg = &trail[start..end];
        if seg.len() >= SEGMENT_MIN_POINTS {
            total += segment_straightness(seg);
        }
    }
    total / parts as f32
}

/// Sharp heading changes between the `window` points before and after each
/// sample. A detected corner skips ahead so it is counted once.
pub fn count_corners(trail: &[TrailPoint], window: usize) -> usize {
    if window == 0 || trail.len() < window * 2 {
        return 0;
    }
    let mut corners = 0;
    let mut i = window;
    while i < trail.len() - window {
        let before = trail[i - window];
        let cur = trail[i];
        let after = trail[i + window];
        let a1 = (cur.y - before.y).atan2(cur.x - before.x);
        let a2 = (after.y - cur.y).atan2(after.x - cur.x);
        let mut diff = (a2 - a1).abs();
        if diff > PI {
            diff = TAU - diff;
        }
        if diff > CORNER_ANGLE {
            corners += 1;
            i += window;
        }
        i += 1;
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::super::Thresholds;
    use super::super::testutil::*;
    use super::super::testutil::circle;
    use super::*;

    #[test]
    fn circle_scores_high_and_quarter_arc_stays_below_threshold() {
        let full = circle(60, 300.0, 300.0, 100.0);
        assert!(super::circle(&full) > 0.95);

        let arc: Vec<(f32, f32)> = (0..40)
            .map(|i| {
                let a = FRAC_PI_2 * i as f32 / 39.0;
                (300.0 + 100.0 * a.cos(), 300.0 + 100.0 * a.sin())
            })
            .collect();
        assert!(super::circle(&points(&arc)) < Thresholds::default().circle);
    }

    #[test]
    fn line_through_centroid_lacks_coverage() {
        let trail = line(40, (100.0, 300.0), (500.0, 300.0));
        assert_eq!(angular_coverage(&trail, centroid(&trail)), 0.5);
        assert_eq!(super::circle(&trail), 0.0);
    }

    #[test]
    fn tiny_circle_is_jitter() {
        let small = circle(60, 300.0, 300.0, 20.0);
        assert_eq!(super::circle(&small), 0.0);
    }

    #[test]
    fn full_coverage_for_a_circle() {
        let c = circle(60, 0.0, 0.0, 50.0);
        assert_eq!(angular_coverage(&c, centroid(&c)), 1.0);
    }

    #[test]
    fn noisy_horizontal_line_still_scores() {
        let xy: Vec<(f32, f32)> = (0..40)
            .map(|i| {
                let jitter = if i % 2 == 0 { 4.0 } else { -4.0 };
                (100.0 + 10.0 * i as f32, 300.0 + jitter)
            })
            .collect();
        let s = horizontal_line(&points(&xy));
        assert!(s > 0.9, "got {s}");
        assert_eq!(vertical_line(&points(&xy)), 0.0);
    }

    #[test]
    fn short_line_is_rejected() {
        let trail = line(30, (100.0, 300.0), (180.0, 300.0));
        assert_eq!(horizontal_line(&trail), 0.0);
    }

    #[test]
    fn diagonal_is_neither_line() {
        let trail = line(30, (100.0, 100.0), (400.0, 400.0));
        assert_eq!(horizontal_line(&trail), 0.0);
        assert_eq!(vertical_line(&trail), 0.0);
    }

    #[test]
    fn zigzag_counts_reversals() {
        // six sweeps of 5 steps, 20 px per step
        let mut xy = Vec::new();
        let mut x = 100.0;
        for sweep in 0..6 {
            let dir = if sweep % 2 == 0 { 20.0 } else { -20.0 };
            for _ in 0..5 {
                x += dir;
                xy.push((x, 300.0 + xy.len() as f32));
            }
        }
        let trail = points(&xy);
        assert_eq!(direction_reversals(&trail), 5);
        let s = zigzag(&trail);
        assert!((s - 5.0 / 6.0).abs() < 1e-5);
    }

    #[test]
    fn jitter_below_noise_is_not_a_zigzag() {
        let xy: Vec<(f32, f32)> = (0..40)
            .map(|i| (300.0 + if i % 2 == 0 { 1.0 } else { -1.0 }, 300.0))
            .collect();
        assert_eq!(zigzag(&points(&xy)), 0.0);
    }

    #[test]
    fn straight_run_has_no_corners() {
        let trail = line(50, (0.0, 0.0), (500.0, 0.0));
        assert_eq!(count_corners(&trail, CORNER_WINDOW), 0);
        assert!((segment_straightness(&trail) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn square_path_scores_as_square() {
        let corners = [
            (100.0, 100.0),
            (300.0, 100.0),
            (300.0, 300.0),
            (100.0, 300.0),
            (100.0, 100.0),
        ];
        let trail = polyline(&corners, 15);
        assert_eq!(trail.len(), 61);
        let s = square(&trail);
        assert!(s > 0.65, "got {s}");
        assert!(s <= SQUARE_PENALTY);
    }

    #[test]
    fn open_square_path_is_rejected() {
        let corners = [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)];
        let trail = polyline(&corners, 18);
        assert_eq!(square(&trail), 0.0);
    }

    #[test]
    fn triangle_path_scores_as_triangle() {
        let corners = [(200.0, 100.0), (320.0, 300.0), (80.0, 300.0), (200.0, 100.0)];
        let trail = polyline(&corners, 16);
        let s = triangle(&trail);
        assert!(s > 0.6, "got {s}");
    }

    #[test]
    fn all_scorers_stay_in_unit_range() {
        let shapes = [
            circle(60, 300.0, 300.0, 100.0),
            line(40, (0.0, 0.0), (400.0, 10.0)),
            polyline(&[(0.0, 0.0), (200.0, 0.0), (200.0, 200.0), (0.0, 0.0)], 20),
        ];
        for trail in &shapes {
            for s in [
                super::circle(trail),
                horizontal_line(trail),
                vertical_line(trail),
                zigzag(trail),
                triangle(trail),
                square(trail),
            ] {
                assert!((0.0..=1.0).contains(&s));
            }
        }
    }
}
