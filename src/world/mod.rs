//! World state: the generated city and its spatial index.

use bevy::prelude::*;

pub mod sectors;

use crate::procgen::density::DensityField;
use crate::procgen::segments::{Segment, SegmentId};
use sectors::SectorGrid;

/// The generated road network plus everything needed to query it.
///
/// Built once per generation run and replaced wholesale on regeneration.
/// After generation the segment arena and sector grid are read-only shared
/// state; only per-segment occupant lists mutate during simulation.
#[derive(Resource)]
pub struct City {
    pub roads: Vec<Segment>,
    pub sectors: SectorGrid,
    pub density: DensityField,
}

impl City {
    pub fn new(sector_size: f32, density: DensityField) -> Self {
        Self {
            roads: Vec::new(),
            sectors: SectorGrid::new(sector_size),
            density,
        }
    }

    pub fn seg(&self, id: SegmentId) -> &Segment {
        &self.roads[id.index()]
    }

    pub fn seg_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.roads[id.index()]
    }

    /// Place a segment into the arena and register it in the sector grid.
    pub fn add_segment(&mut self, seg: Segment) -> SegmentId {
        let id = SegmentId(self.roads.len() as u32);
        self.sectors.add(id, &seg);
        self.roads.push(seg);
        id
    }
}
