//! Debug overlay toggles, their persistence, and renderer-agnostic overlay
//! primitives. Nothing here feeds back into classification.

use anyhow::{Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::gestures::GestureResult;
use crate::landmarks::{HAND_CONNECTIONS, HandDetection, HandSide, Keypoint};
use crate::trail::TrailPoint;

const TRAIL_ALPHA_OLDEST: f32 = 50.0;
const TRAIL_ALPHA_NEWEST: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugToggles {
    pub show_skeleton: bool,
    pub show_palm_center: bool,
    pub show_trail: bool,
    pub show_keypoints: bool,
    pub show_labels: bool,
    pub show_panel: bool,
}

impl Default for DebugToggles {
    fn default() -> Self {
        Self {
            show_skeleton: true,
            show_palm_center: true,
            show_trail: true,
            show_keypoints: false,
            show_labels: false,
            show_panel: true,
        }
    }
}

/// Saved toggles; absent fields keep the caller's defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartialToggles {
    pub show_skeleton: Option<bool>,
    pub show_palm_center: Option<bool>,
    pub show_trail: Option<bool>,
    pub show_keypoints: Option<bool>,
    pub show_labels: Option<bool>,
    pub show_panel: Option<bool>,
}

impl PartialToggles {
    pub fn apply(&self, base: DebugToggles) -> DebugToggles {
        DebugToggles {
            show_skeleton: self.show_skeleton.unwrap_or(base.show_skeleton),
            show_palm_center: self.show_palm_center.unwrap_or(base.show_palm_center),
            show_trail: self.show_trail.unwrap_or(base.show_trail),
            show_keypoints: self.show_keypoints.unwrap_or(base.show_keypoints),
            show_labels: self.show_labels.unwrap_or(base.show_labels),
            show_panel: self.show_panel.unwrap_or(base.show_panel),
        }
    }
}

/// Key-value persistence for toggles, supplied by the caller.
pub trait ToggleStore {
    fn load(&self) -> Result<Option<PartialToggles>>;
    fn save(&self, toggles: &DebugToggles) -> Result<()>;
}

/// Stores toggles as a small JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl ToggleStore for JsonFileStore {
    fn load(&self) -> Result<Option<PartialToggles>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)
            .map_err(|e| anyhow!("failed to read {}: {e}", self.path.display()))?;
        let saved = serde_json::from_str(&txt)
            .map_err(|e| anyhow!("failed to parse {}: {e}", self.path.display()))?;
        Ok(Some(saved))
    }

    fn save(&self, toggles: &DebugToggles) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(toggles)?)?;
        Ok(())
    }
}

/// Visual layers in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Trail,
    Skeleton,
    Keypoints,
    PalmCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub from: Keypoint,
    pub to: Keypoint,
    pub alpha: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub at: Keypoint,
    pub label: Option<String>,
}

/// What a renderer should draw for one hand this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    pub trail: Vec<Segment>,
    pub skeleton: Vec<Segment>,
    pub keypoints: Vec<Marker>,
    pub palm_center: Option<Marker>,
}

pub struct DebugSurface<S: ToggleStore> {
    defaults: DebugToggles,
    toggles: DebugToggles,
    store: S,
}

impl<S: ToggleStore> DebugSurface<S> {
    /// Starts from `defaults` overlaid with whatever the store has saved.
    pub fn new(defaults: DebugToggles, store: S) -> Self {
        let toggles = match store.load() {
            Ok(Some(saved)) => saved.apply(defaults),
            Ok(None) => defaults,
            Err(e) => {
                warn!("ignoring saved debug toggles: {e}");
                defaults
            }
        };
        Self {
            defaults,
            toggles,
            store,
        }
    }

    pub fn toggles(&self) -> DebugToggles {
        self.toggles
    }

    /// S, P, T, K, L and H flip skeleton, palm, trail, keypoints, labels and
    /// panel. Returns whether the key was recognised.
    pub fn handle_key(&mut self, key: char) -> Result<bool> {
        let t = &mut self.toggles;
        let flag = match key.to_ascii_uppercase() {
            'S' => Some(&mut t.show_skeleton),
            'P' => Some(&mut t.show_palm_center),
            'T' => Some(&mut t.show_trail),
            'K' => Some(&mut t.show_keypoints),
            'L' => Some(&mut t.show_labels),
            'H' => Some(&mut t.show_panel),
            _ => None,
        };
        let known = match flag {
            Some(f) => {
                *f = !*f;
                true
            }
            None => false,
        };
        self.store.save(&self.toggles)?;
        Ok(known)
    }

    /// Back to the toggles this surface was constructed with.
    pub fn reset(&mut self) -> Result<()> {
        self.toggles = self.defaults;
        self.store.save(&self.toggles)
    }

    /// Switches every visual layer at once; the panel is left alone.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        let t = &mut self.toggles;
        t.show_skeleton = enabled;
        t.show_palm_center = enabled;
        t.show_trail = enabled;
        t.show_keypoints = enabled;
        t.show_labels = enabled;
        self.store.save(&self.toggles)
    }

    pub fn visible_layers(&self) -> Vec<Layer> {
        let t = self.toggles;
        [
            (Layer::Trail, t.show_trail),
            (Layer::Skeleton, t.show_skeleton),
            (Layer::Keypoints, t.show_keypoints),
            (Layer::PalmCenter, t.show_palm_center),
        ]
        .into_iter()
        .filter_map(|(layer, on)| on.then_some(layer))
        .collect()
    }

    pub fn overlay(&self, detection: &HandDetection, trail: &[TrailPoint]) -> Overlay {
        let t = self.toggles;
        let kps = &detection.keypoints;
        let mut out = Overlay::default();

        if t.show_trail && trail.len() >= 2 {
            let last = (trail.len() - 1) as f32;
            out.trail = trail
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    let frac = (i + 1) as f32 / last;
                    let alpha =
                        TRAIL_ALPHA_OLDEST + (TRAIL_ALPHA_NEWEST - TRAIL_ALPHA_OLDEST) * frac;
                    Segment {
                        from: Keypoint::new(w[0].x, w[0].y),
                        to: Keypoint::new(w[1].x, w[1].y),
                        alpha: alpha.round() as u8,
                    }
                })
                .collect();
        }

        if t.show_skeleton {
            out.skeleton = HAND_CONNECTIONS
                .iter()
                .filter_map(|&(a, b)| {
                    Some(Segment {
                        from: *kps.get(a)?,
                        to: *kps.get(b)?,
                        alpha: 255,
                    })
                })
                .collect();
        }

        if t.show_keypoints {
            out.keypoints = kps
                .iter()
                .enumerate()
                .map(|(i, k)| Marker {
                    at: *k,
                    label: t.show_labels.then(|| i.to_string()),
                })
                .collect();
        }

        if t.show_palm_center {
            out.palm_center = detection.palm_center().map(|c| Marker {
                at: Keypoint::new(c.x, c.y),
                label: t.show_labels.then(|| match detection.side() {
                    HandSide::Left => "L".to_string(),
                    HandSide::Right => "R".to_string(),
                }),
            });
        }

        out
    }

    /// Text lines for the status panel, or `None` when it is hidden.
    pub fn panel(&self, last: Option<GestureResult>) -> Option<Vec<String>> {
        let t = self.toggles;
        if !t.show_panel {
            return None;
        }
        let mut lines = Vec::new();
        match last {
            Some(r) => {
                lines.push(format!("gesture: {}", r.gesture));
                lines.push(format!("confidence: {}%", (r.confidence * 100.0).floor()));
            }
            None => lines.push("no gesture detected".to_string()),
        }
        let onoff = |b: bool| if b { "on" } else { "off" };
        lines.push(format!("[S] skeleton: {}", onoff(t.show_skeleton)));
        lines.push(format!("[P] palm center: {}", onoff(t.show_palm_center)));
        lines.push(format!("[T] trail: {}", onoff(t.show_trail)));
        lines.push(format!("[K] keypoints: {}", onoff(t.show_keypoints)));
        lines.push(format!("[L] labels: {}", onoff(t.show_labels)));
        Some(lines)
    }
}
