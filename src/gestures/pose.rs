//! Single-frame hand poses.

use crate::landmarks::{
    INDEX_TIP, KEYPOINT_COUNT, Keypoint, MIDDLE_TIP, PINKY_TIP, RING_TIP, WRIST,
};

/// Vertical extent of the keypoint coordinate space (y grows downwards).
pub const DEFAULT_FRAME_HEIGHT: f32 = 480.0;

const HIGH_FRACTION: f32 = 0.85;
const VERY_HIGH_FRACTION: f32 = 0.25;
const MAX_TIP_TO_WRIST: f32 = 130.0;
const MAX_TIP_SPACING: f32 = 40.0;
const BASE_SCORE: f32 = 0.7;
const BONUS: f32 = 0.15;

/// Closed hand held in the upper part of the frame.
///
/// The hand counts as closed when fingertips sit near the wrist or bunch
/// together; satisfying both, or holding the fist very high, adds a bonus.
pub fn fist_raised(keypoints: &[Keypoint], frame_height: f32) -> f32 {
    if keypoints.len() < KEYPOINT_COUNT {
        return 0.0;
    }
    let wrist = keypoints[WRIST];
    let tips = [
        keypoints[INDEX_TIP],
        keypoints[MIDDLE_TIP],
        keypoints[RING_TIP],
        keypoints[PINKY_TIP],
    ];
    if !finite(&wrist) || !tips.iter().all(finite) {
        return 0.0;
    }

    let hand_y = wrist.y.min(tips[0].y);
    if hand_y >= frame_height * HIGH_FRACTION {
        return 0.0;
    }

    let avg_tip_dist = tips.iter().map(|t| wrist.dist(t)).sum::<f32>() / tips.len() as f32;
    let closed_by_distance = avg_tip_dist < MAX_TIP_TO_WRIST;

    let avg_spacing = tips.windows(2).map(|w| w[0].dist(&w[1])).sum::<f32>() / 3.0;
    let compact = avg_spacing < MAX_TIP_SPACING;

    if !(closed_by_distance || compact) {
        return 0.0;
    }
    let mut score = BASE_SCORE;
    if hand_y < frame_height * VERY_HIGH_FRACTION {
        score += BONUS;
    }
    if closed_by_distance && compact {
        score += BONUS;
    }
    score.min(1.0)
}

fn finite(k: &Keypoint) -> bool {
    k.x.is_finite() && k.y.is_finite()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A closed fist with its wrist at (x, y); fingertips curl to within
    /// 60 px of the wrist and 20 px of each other.
    pub fn fist_at(x: f32, y: f32) -> Vec<Keypoint> {
        let mut kps = vec![Keypoint::new(x, y - 40.0); KEYPOINT_COUNT];
        kps[WRIST] = Keypoint::new(x, y);
        kps[INDEX_TIP] = Keypoint::new(x - 30.0, y - 50.0);
        kps[MIDDLE_TIP] = Keypoint::new(x - 10.0, y - 55.0);
        kps[RING_TIP] = Keypoint::new(x + 10.0, y - 55.0);
        kps[PINKY_TIP] = Keypoint::new(x + 30.0, y - 50.0);
        kps
    }

    pub fn open_hand_at(x: f32, y: f32) -> Vec<Keypoint> {
        let mut kps = fist_at(x, y);
        kps[INDEX_TIP] = Keypoint::new(x - 90.0, y - 160.0);
        kps[MIDDLE_TIP] = Keypoint::new(x - 20.0, y - 190.0);
        kps[RING_TIP] = Keypoint::new(x + 50.0, y - 180.0);
        kps[PINKY_TIP] = Keypoint::new(x + 110.0, y - 140.0);
        kps
    }

    #[test]
    fn high_tight_fist_gets_both_bonuses() {
        let s = fist_raised(&fist_at(320.0, 100.0), DEFAULT_FRAME_HEIGHT);
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mid_frame_fist_gets_closure_bonus_only() {
        let s = fist_raised(&fist_at(320.0, 300.0), DEFAULT_FRAME_HEIGHT);
        assert!((s - 0.85).abs() < 1e-6);
    }

    #[test]
    fn low_hand_is_rejected() {
        // wrist and index tip both below 85% of the frame
        let s = fist_raised(&fist_at(320.0, 470.0), 400.0);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn open_hand_is_rejected() {
        let s = fist_raised(&open_hand_at(320.0, 300.0), DEFAULT_FRAME_HEIGHT);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn missing_keypoints_score_zero() {
        let kps = fist_at(320.0, 100.0);
        assert_eq!(fist_raised(&kps[..15], DEFAULT_FRAME_HEIGHT), 0.0);
    }
}
