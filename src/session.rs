//! Per-hand recognition state: trails, cooldown clocks and the per-sample
//! update loop.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gestures::{self, Classifier, GestureResult, ShapeScore, Thresholds};
use crate::landmarks::{HandDetection, HandSide, Keypoint, PalmCenter};
use crate::trail::{DEFAULT_MAX_TRAIL_LENGTH, Trail, TrailStore};

pub const DEFAULT_COOLDOWN_TICKS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerSettings {
    pub max_trail_length: usize,
    pub cooldown_ticks: u64,
    pub min_trail_points: usize,
    pub frame_height: f32,
    pub static_poses: bool,
    /// Hand allowed to trigger static poses.
    pub static_hand: HandSide,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            max_trail_length: DEFAULT_MAX_TRAIL_LENGTH,
            cooldown_ticks: DEFAULT_COOLDOWN_TICKS,
            min_trail_points: gestures::DEFAULT_MIN_TRAIL_POINTS,
            frame_height: gestures::pose::DEFAULT_FRAME_HEIGHT,
            static_poses: true,
            static_hand: HandSide::Right,
        }
    }
}

impl RecognizerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_trail_length == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_trail_length",
            });
        }
        if self.cooldown_ticks == 0 {
            return Err(ConfigError::NonPositive {
                field: "cooldown_ticks",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownPhase {
    Armed,
    Cooling,
}

/// Re-arm throttle for one hand. The clock advances every sample, whether
/// or not the hand is visible.
#[derive(Debug, Clone)]
pub struct Cooldown {
    cooldown_ticks: u64,
    current_tick: u64,
    last_detection_tick: Option<u64>,
}

impl Cooldown {
    pub fn new(cooldown_ticks: u64) -> Self {
        Self {
            cooldown_ticks,
            current_tick: 0,
            last_detection_tick: None,
        }
    }

    pub fn advance(&mut self) {
        self.current_tick += 1;
    }

    pub fn phase(&self) -> CooldownPhase {
        match self.last_detection_tick {
            Some(t) if self.current_tick - t < self.cooldown_ticks => CooldownPhase::Cooling,
            _ => CooldownPhase::Armed,
        }
    }

    pub fn is_cooling(&self) -> bool {
        self.phase() == CooldownPhase::Cooling
    }

    pub fn record_detection(&mut self) {
        self.last_detection_tick = Some(self.current_tick);
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn last_detection_tick(&self) -> Option<u64> {
        self.last_detection_tick
    }

    pub fn reset(&mut self) {
        self.last_detection_tick = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureEvent {
    pub tick: u64,
    pub hand: HandSide,
    #[serde(flatten)]
    pub result: GestureResult,
}

/// Read-only snapshot of one hand for tuning and visualisation.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub hand: HandSide,
    pub tick: u64,
    pub trail_len: usize,
    pub cooldown: CooldownPhase,
    pub last_detection_tick: Option<u64>,
    pub last_gesture: Option<GestureResult>,
    pub scores: Vec<ShapeScore>,
}

#[derive(Debug)]
pub struct Recognizer {
    classifier: Classifier,
    settings: RecognizerSettings,
    trails: TrailStore,
    left: Cooldown,
    right: Cooldown,
    last: Option<GestureResult>,
}

impl Recognizer {
    pub fn new(settings: RecognizerSettings, thresholds: Thresholds) -> Result<Self, ConfigError> {
        settings.validate()?;
        let classifier = Classifier::new(
            thresholds,
            settings.min_trail_points,
            settings.frame_height,
            settings.static_poses.then_some(settings.static_hand),
        )?;
        Ok(Self::with_classifier(settings, classifier))
    }

    fn with_classifier(settings: RecognizerSettings, classifier: Classifier) -> Self {
        Self {
            classifier,
            trails: TrailStore::new(settings.max_trail_length),
            left: Cooldown::new(settings.cooldown_ticks),
            right: Cooldown::new(settings.cooldown_ticks),
            settings,
            last: None,
        }
    }

    pub fn settings(&self) -> &RecognizerSettings {
        &self.settings
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }

    pub fn cooldown(&self, side: HandSide) -> &Cooldown {
        match side {
            HandSide::Left => &self.left,
            HandSide::Right => &self.right,
        }
    }

    /// Advances both hands' cooldown clocks by one sample.
    pub fn tick(&mut self) {
        self.left.advance();
        self.right.advance();
    }

    pub fn update_trail(&mut self, side: HandSide, point: Option<PalmCenter>) {
        self.trails.update(side, point);
    }

    pub fn decay_trail(&mut self, side: HandSide) {
        self.trails.decay(side);
    }

    pub fn clear_trail(&mut self, side: HandSide) {
        self.trails.clear(side);
    }

    pub fn trail(&self, side: HandSide) -> &Trail {
        self.trails.trail(side)
    }

    pub fn last_gesture(&self) -> Option<GestureResult> {
        self.last
    }

    /// Classifies the hand's current trail (and pose, if keypoints are given)
    /// unless the hand is cooling down. A hit starts the cooldown.
    pub fn recognize(
        &mut self,
        side: HandSide,
        keypoints: Option<&[Keypoint]>,
    ) -> Option<GestureResult> {
        let cooldown = match side {
            HandSide::Left => &mut self.left,
            HandSide::Right => &mut self.right,
        };
        if cooldown.is_cooling() {
            return None;
        }
        let hit = self
            .classifier
            .classify(side, self.trails.get(side), keypoints)?;
        cooldown.record_detection();
        debug!(
            "{side}: {} ({:.2}) at tick {}",
            hit.gesture,
            hit.confidence,
            cooldown.current_tick()
        );
        self.last = Some(hit);
        Some(hit)
    }

    /// Processes one sample tick from the landmark source.
    ///
    /// Visible hands extend their trail and are classified; hands missing
    /// from the sample lose their oldest trail point.
    pub fn on_sample(&mut self, detections: &[HandDetection]) -> Vec<GestureEvent> {
        self.tick();
        let mut events = Vec::new();
        for side in HandSide::BOTH {
            match detections.iter().find(|d| d.side() == side) {
                Some(det) => {
                    let center = det.palm_center();
                    self.update_trail(side, center);
                    if center.is_none() {
                        continue;
                    }
                    if let Some(result) = self.recognize(side, Some(det.keypoints.as_slice())) {
                        events.push(GestureEvent {
                            tick: self.cooldown(side).current_tick(),
                            hand: side,
                            result,
                        });
                    }
                }
                None => self.decay_trail(side),
            }
        }
        events
    }

    /// Clears both trails and re-arms both hands.
    pub fn reset(&mut self) {
        for side in HandSide::BOTH {
            self.trails.clear(side);
        }
        self.left.reset();
        self.right.reset();
        self.last = None;
        info!("recognizer reset");
    }

    pub fn inspect(&self, side: HandSide) -> Inspection {
        let cooldown = self.cooldown(side);
        let trail = self.trails.trail(side).to_vec();
        Inspection {
            hand: side,
            tick: cooldown.current_tick(),
            trail_len: trail.len(),
            cooldown: cooldown.phase(),
            last_detection_tick: cooldown.last_detection_tick(),
            last_gesture: self.last,
            scores: self.classifier.scores(&trail),
        }
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::with_classifier(RecognizerSettings::default(), Classifier::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::Gesture;
    use crate::gestures::pose::tests::{fist_at, open_hand_at};
    use crate::landmarks::{Handedness, PALM_INDICES};
    use std::f32::consts::TAU;

    fn circle_point(i: usize, n: usize) -> PalmCenter {
        let a = TAU * i as f32 / (n - 1) as f32;
        PalmCenter {
            x: 300.0 + 100.0 * a.cos(),
            y: 300.0 + 100.0 * a.sin(),
        }
    }

    /// Feeds one lap of a circle into `side`, ticking once per point.
    fn draw_circle(r: &mut Recognizer, side: HandSide) {
        for i in 0..60 {
            r.tick();
            r.update_trail(side, Some(circle_point(i, 60)));
        }
    }

    /// An open hand whose palm joints all sit on (x, y).
    fn open_hand(handedness: Handedness, x: f32, y: f32) -> HandDetection {
        let mut keypoints = open_hand_at(x, y);
        for i in PALM_INDICES {
            keypoints[i] = Keypoint::new(x, y);
        }
        HandDetection {
            handedness,
            keypoints,
        }
    }

    #[test]
    fn circle_is_recognized_then_cooldown_suppresses() {
        let mut r = Recognizer::default();
        draw_circle(&mut r, HandSide::Left);
        let hit = r.recognize(HandSide::Left, None).unwrap();
        assert_eq!(hit.gesture, Gesture::Circle);
        assert_eq!(r.last_gesture(), Some(hit));
        let t = r.cooldown(HandSide::Left).current_tick();

        // the same circle keeps matching, but not until T + C
        for _ in 1..DEFAULT_COOLDOWN_TICKS {
            r.tick();
            assert!(r.recognize(HandSide::Left, None).is_none());
        }
        r.tick();
        assert_eq!(
            r.cooldown(HandSide::Left).current_tick(),
            t + DEFAULT_COOLDOWN_TICKS
        );
        assert!(r.recognize(HandSide::Left, None).is_some());
    }

    #[test]
    fn miss_leaves_cooldown_untouched() {
        let mut r = Recognizer::default();
        for i in 0..5 {
            r.tick();
            r.update_trail(HandSide::Right, Some(circle_point(i, 60)));
        }
        assert!(r.recognize(HandSide::Right, None).is_none());
        assert_eq!(r.cooldown(HandSide::Right).last_detection_tick(), None);
        assert_eq!(r.cooldown(HandSide::Right).phase(), CooldownPhase::Armed);
    }

    #[test]
    fn hands_cool_down_independently() {
        let mut r = Recognizer::default();
        draw_circle(&mut r, HandSide::Left);
        draw_circle(&mut r, HandSide::Right);
        let right_trail = r.trail(HandSide::Right).to_vec();

        assert!(r.recognize(HandSide::Left, None).is_some());
        assert!(r.cooldown(HandSide::Left).is_cooling());
        assert!(!r.cooldown(HandSide::Right).is_cooling());

        r.clear_trail(HandSide::Left);
        assert_eq!(r.trail(HandSide::Right).to_vec(), right_trail);
        assert!(r.recognize(HandSide::Right, None).is_some());
    }

    #[test]
    fn fist_short_circuits_on_the_static_hand_only() {
        let mut r = Recognizer::default();
        let fist = fist_at(320.0, 100.0);
        let hit = r.recognize(HandSide::Right, Some(&fist)).unwrap();
        assert_eq!(hit.gesture, Gesture::FistRaised);

        assert!(r.recognize(HandSide::Left, Some(&fist)).is_none());
    }

    #[test]
    fn static_poses_can_be_disabled() {
        let settings = RecognizerSettings {
            static_poses: false,
            ..RecognizerSettings::default()
        };
        let mut r = Recognizer::new(settings, Thresholds::default()).unwrap();
        assert!(r.recognize(HandSide::Right, Some(&fist_at(320.0, 100.0))).is_none());
    }

    #[test]
    fn on_sample_tracks_and_decays() {
        let mut r = Recognizer::default();
        for i in 0..10 {
            let c = circle_point(i, 60);
            r.on_sample(&[open_hand(Handedness::Left, c.x, c.y)]);
        }
        assert_eq!(r.trail(HandSide::Left).len(), 10);
        assert!(r.trail(HandSide::Right).is_empty());
        assert_eq!(r.cooldown(HandSide::Right).current_tick(), 10);

        for _ in 0..3 {
            r.on_sample(&[]);
        }
        assert_eq!(r.trail(HandSide::Left).len(), 7);
        assert_eq!(r.cooldown(HandSide::Left).current_tick(), 13);
    }

    #[test]
    fn on_sample_emits_circle_event() {
        let mut r = Recognizer::default();
        let mut events = Vec::new();
        // 4 degrees per sample, one full lap
        for i in 0..90 {
            let c = circle_point(i, 91);
            events.extend(r.on_sample(&[open_hand(Handedness::Left, c.x, c.y)]));
        }
        assert!(!events.is_empty());
        for e in &events {
            assert_eq!(e.hand, HandSide::Left);
            assert_eq!(e.result.gesture, Gesture::Circle, "{events:?}");
        }
    }

    #[test]
    fn short_detection_still_advances_trail_counter() {
        let mut r = Recognizer::default();
        let det = HandDetection {
            handedness: Handedness::Right,
            keypoints: vec![Keypoint::new(1.0, 1.0); 20],
        };
        assert!(r.on_sample(&[det]).is_empty());
        assert!(r.trail(HandSide::Right).is_empty());
        assert_eq!(r.trail(HandSide::Right).ticks(), 1);
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let zero_trail = RecognizerSettings {
            max_trail_length: 0,
            ..RecognizerSettings::default()
        };
        assert_eq!(
            Recognizer::new(zero_trail, Thresholds::default()).unwrap_err(),
            ConfigError::NonPositive {
                field: "max_trail_length"
            }
        );
        let zero_cooldown = RecognizerSettings {
            cooldown_ticks: 0,
            ..RecognizerSettings::default()
        };
        assert!(Recognizer::new(zero_cooldown, Thresholds::default()).is_err());
    }

    #[test]
    fn inspection_reports_scores_in_order() {
        let mut r = Recognizer::default();
        draw_circle(&mut r, HandSide::Right);
        let snap = r.inspect(HandSide::Right);
        assert_eq!(snap.trail_len, 60);
        assert_eq!(snap.cooldown, CooldownPhase::Armed);
        let order: Vec<Gesture> = snap.scores.iter().map(|s| s.gesture).collect();
        assert_eq!(order, Gesture::DYNAMIC.to_vec());
        assert!(snap.scores[0].passes());
    }

    #[test]
    fn reset_rearms_and_clears() {
        let mut r = Recognizer::default();
        draw_circle(&mut r, HandSide::Left);
        r.recognize(HandSide::Left, None).unwrap();
        r.reset();
        assert!(r.trail(HandSide::Left).is_empty());
        assert!(!r.cooldown(HandSide::Left).is_cooling());
        assert!(r.last_gesture().is_none());
    }

    #[test]
    fn trails_live_in_the_shared_store() {
        let mut r = Recognizer::default();
        draw_circle(&mut r, HandSide::Left);
        r.update_trail(HandSide::Right, Some(circle_point(0, 60)));
        assert_eq!(r.trails().trail(HandSide::Left).len(), 60);
        assert_eq!(r.trails().trail(HandSide::Right).len(), 1);

        r.clear_trail(HandSide::Left);
        assert!(r.trails().trail(HandSide::Left).is_empty());
        assert_eq!(r.trails().trail(HandSide::Right).len(), 1);
    }
}
