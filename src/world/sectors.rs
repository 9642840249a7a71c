//! Uniform sector grid for proximity queries.
//!
//! Maps integer cell coordinates to the segments whose bounding box
//! overlaps the cell. Segments never move once placed, so the grid only
//! grows during generation and needs no removal path. An elongated segment
//! lands in O(span / cell_size) cells, the accepted trade-off for cheap
//! candidate lookups.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::procgen::segments::{Segment, SegmentId};

/// Spatial index over road segments.
#[derive(Clone)]
pub struct SectorGrid {
    pub cell_size: f32,
    pub cells: HashMap<(i32, i32), Vec<SegmentId>>,
}

impl SectorGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// The single cell containing a point.
    pub fn containing_sector(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Every cell the segment's bounding box touches.
    pub fn cells_for_span(&self, seg: &Segment) -> Vec<(i32, i32)> {
        let min = seg.start.min(seg.end);
        let max = seg.start.max(seg.end);
        self.cells_in_box(min, max)
    }

    /// Every cell within `radius` of a point (bounding-box approximation).
    pub fn cells_near_point(&self, pos: Vec2, radius: f32) -> Vec<(i32, i32)> {
        self.cells_in_box(pos - Vec2::splat(radius), pos + Vec2::splat(radius))
    }

    fn cells_in_box(&self, min: Vec2, max: Vec2) -> Vec<(i32, i32)> {
        let (min_x, min_y) = self.containing_sector(min);
        let (max_x, max_y) = self.containing_sector(max);

        let mut result = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                result.push((x, y));
            }
        }
        result
    }

    /// Register a placed segment in every cell it spans.
    pub fn add(&mut self, id: SegmentId, seg: &Segment) {
        for cell in self.cells_for_span(seg) {
            self.cells.entry(cell).or_default().push(id);
        }
    }

    /// Segments registered in one cell.
    pub fn segments_in(&self, cell: (i32, i32)) -> &[SegmentId] {
        self.cells.get(&cell).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procgen::segments::SegmentSeq;

    fn seg(start: Vec2, end: Vec2) -> Segment {
        Segment::new(start, end, false, &mut SegmentSeq::default())
    }

    #[test]
    fn containing_sector_floors_toward_negative_infinity() {
        let grid = SectorGrid::new(100.0);
        assert_eq!(grid.containing_sector(Vec2::new(50.0, 150.0)), (0, 1));
        assert_eq!(grid.containing_sector(Vec2::new(-1.0, -150.0)), (-1, -2));
    }

    #[test]
    fn spanning_segment_lands_in_every_touched_cell() {
        let mut grid = SectorGrid::new(100.0);
        let s = seg(Vec2::new(10.0, 10.0), Vec2::new(250.0, 10.0));
        grid.add(SegmentId(0), &s);

        assert_eq!(grid.segments_in((0, 0)), &[SegmentId(0)]);
        assert_eq!(grid.segments_in((1, 0)), &[SegmentId(0)]);
        assert_eq!(grid.segments_in((2, 0)), &[SegmentId(0)]);
        assert!(grid.segments_in((3, 0)).is_empty());
        assert!(grid.segments_in((0, 1)).is_empty());
    }

    #[test]
    fn cells_near_point_covers_the_radius_box() {
        let grid = SectorGrid::new(100.0);
        let cells = grid.cells_near_point(Vec2::new(50.0, 50.0), 60.0);
        assert!(cells.contains(&(-1, -1)));
        assert!(cells.contains(&(0, 0)));
        assert!(cells.contains(&(1, 1)));
        assert_eq!(cells.len(), 9);
    }
}
