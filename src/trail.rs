//! Per-hand bounded trails of palm-center positions.

use log::trace;
use serde::Serialize;
use std::collections::VecDeque;

use crate::landmarks::{HandSide, PalmCenter};

pub const DEFAULT_MAX_TRAIL_LENGTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    pub sample_index: u64,
}

/// Oldest-first history of one hand's palm center.
///
/// Points only ever leave from the front, by overflow or by decay.
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    max_len: usize,
    ticks: u64,
}

impl Trail {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            points: VecDeque::with_capacity(max_len + 1),
            max_len,
            ticks: 0,
        }
    }

    /// Advances the sample counter and appends `point` if present.
    pub fn update(&mut self, point: Option<PalmCenter>) {
        self.ticks += 1;
        let Some(p) = point else {
            return;
        };
        self.points.push_back(TrailPoint {
            x: p.x,
            y: p.y,
            sample_index: self.ticks,
        });
        if self.points.len() > self.max_len {
            self.points.pop_front();
        }
    }

    /// Drops the oldest point, if any.
    pub fn decay(&mut self) {
        if self.points.pop_front().is_some() {
            trace!("trail decayed to {} points", self.points.len());
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Contiguous oldest-first view of the stored points.
    pub fn get(&mut self) -> &[TrailPoint] {
        self.points.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<TrailPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// One trail per hand side; the two never share state.
#[derive(Debug, Clone)]
pub struct TrailStore {
    left: Trail,
    right: Trail,
}

impl Default for TrailStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRAIL_LENGTH)
    }
}

impl TrailStore {
    pub fn new(max_len: usize) -> Self {
        Self {
            left: Trail::new(max_len),
            right: Trail::new(max_len),
        }
    }

    pub fn trail(&self, side: HandSide) -> &Trail {
        match side {
            HandSide::Left => &self.left,
            HandSide::Right => &self.right,
        }
    }

    pub fn trail_mut(&mut self, side: HandSide) -> &mut Trail {
        match side {
            HandSide::Left => &mut self.left,
            HandSide::Right => &mut self.right,
        }
    }

    pub fn update(&mut self, side: HandSide, point: Option<PalmCenter>) {
        self.trail_mut(side).update(point);
    }

    pub fn decay(&mut self, side: HandSide) {
        self.trail_mut(side).decay();
    }

    pub fn clear(&mut self, side: HandSide) {
        self.trail_mut(side).clear();
    }

    pub fn get(&mut self, side: HandSide) -> &[TrailPoint] {
        self.trail_mut(side).get()
    }
}
