//! Seeded population-density field.
//!
//! Three independently offset Perlin octaves, squared to sharpen the
//! peaks. The same seed and point always produce the same value; there is
//! no state beyond the seed, the offsets and a per-segment memo.

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use std::collections::HashMap;

use crate::procgen::segments::Segment;

/// Continuous scalar density over the plane, in `[0, 4]`.
#[derive(Clone)]
pub struct DensityField {
    perlin: Perlin,
    offset: (f64, f64),
    /// Memoized per-segment averages, keyed by creation id. Safe because
    /// segment geometry never changes after creation.
    line_cache: HashMap<u32, f32>,
}

impl DensityField {
    pub fn new(seed: u32, offset: (f64, f64)) -> Self {
        Self {
            perlin: Perlin::new(seed),
            offset,
            line_cache: HashMap::new(),
        }
    }

    /// Density at a point.
    pub fn at_point(&self, pos: Vec2) -> f32 {
        let x = pos.x as f64 + self.offset.0;
        let y = pos.y as f64 + self.offset.1;

        let v1 = (self.perlin.get([x / 10_000.0, y / 10_000.0]) + 1.0) / 2.0;
        let v2 = (self.perlin.get([x / 20_000.0 + 500.0, y / 20_000.0 + 500.0]) + 1.0) / 2.0;
        let v3 = (self.perlin.get([x / 20_000.0 + 1000.0, y / 20_000.0 + 1000.0]) + 1.0) / 2.0;

        ((v1 * v2 + v3) * (v1 * v2 + v3)) as f32
    }

    /// Average density over a segment (endpoint mean), memoized per
    /// segment identity.
    pub fn at_line(&mut self, seg: &Segment) -> f32 {
        if let Some(&cached) = self.line_cache.get(&seg.global_id) {
            return cached;
        }
        let value = (self.at_point(seg.start) + self.at_point(seg.end)) / 2.0;
        self.line_cache.insert(seg.global_id, value);
        value
    }
}
