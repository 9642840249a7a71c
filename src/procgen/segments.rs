//! The road segment entity and its derivation operations.
//!
//! Segments live in a flat arena (`City::roads`) and refer to each other
//! by `SegmentId` index; parent references and endpoint link sets are
//! plain index fields, so the cyclic road graph never forms an ownership
//! cycle. Geometry is immutable once a segment is accepted; only link
//! sets, the snap tag and the occupant list mutate afterwards.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::config::GenerationConfig;
use crate::geometry::{self, Intersection};

/// Index into the city's segment arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a segment was terminated during growth.
///
/// Variant order doubles as the local-constraint priority:
/// `Cross > End > Extend > No`. `CrossTooClose` is a bookkeeping tag for
/// crossings that degraded to vertex welds; it never competes in the scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapType {
    No,
    Extend,
    End,
    Cross,
    CrossTooClose,
}

/// Allocates creation-order identifiers for one generation run.
///
/// Rejected candidates consume ids too; the sequence tracks creation,
/// not placement.
#[derive(Default)]
pub struct SegmentSeq(u32);

impl SegmentSeq {
    pub fn next(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// Per-endpoint link set. Four connections cover almost every junction.
pub type LinkSet = SmallVec<[SegmentId; 4]>;

/// A directed road edge between two points.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Creation-order identifier, unique within a generation run.
    pub global_id: u32,
    /// Generation-order counter; the growth queue pops lowest first.
    pub t: u32,
    pub start: Vec2,
    pub end: Vec2,
    pub is_highway: bool,
    pub is_branch: bool,
    /// Topology bookkeeping only, not an ownership edge.
    pub parent: Option<SegmentId>,
    pub snapped: SnapType,
    /// Roads meeting at this segment's start point.
    pub links_s: LinkSet,
    /// Roads meeting at this segment's end point.
    pub links_e: LinkSet,
    /// Agent arena indices of entities currently traveling this segment.
    pub occupants: Vec<usize>,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2, is_highway: bool, seq: &mut SegmentSeq) -> Self {
        Self {
            global_id: seq.next(),
            t: 0,
            start,
            end,
            is_highway,
            is_branch: false,
            parent: None,
            snapped: SnapType::No,
            links_s: LinkSet::new(),
            links_e: LinkSet::new(),
            occupants: Vec::new(),
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Heading in degrees.
    pub fn heading(&self) -> f32 {
        let d = self.end - self.start;
        d.y.atan2(d.x).to_degrees()
    }

    pub fn point_at(&self, factor: f32) -> Vec2 {
        self.start.lerp(self.end, factor)
    }

    pub fn midpoint(&self) -> Vec2 {
        self.point_at(0.5)
    }

    /// A straight continuation from this segment's end, rotated by
    /// `angle_offset` degrees. Length and class follow this segment's
    /// highway flag.
    pub fn make_extension(
        &self,
        self_id: SegmentId,
        angle_offset: f32,
        cfg: &GenerationConfig,
        seq: &mut SegmentSeq,
    ) -> Segment {
        let length = if self.is_highway {
            cfg.highway_length
        } else {
            cfg.street_length
        };
        self.spawn_from_end(self_id, length, angle_offset, self.is_highway, false, 0, seq)
    }

    /// A branch from this segment's end at a right-angle-biased heading.
    /// `delay` defers the branch in the growth queue via its generation
    /// order.
    pub fn make_continuation(
        &self,
        self_id: SegmentId,
        length: f32,
        angle: f32,
        is_highway: bool,
        is_branch: bool,
        delay: u32,
        seq: &mut SegmentSeq,
    ) -> Segment {
        self.spawn_from_end(self_id, length, angle, is_highway, is_branch, delay, seq)
    }

    fn spawn_from_end(
        &self,
        self_id: SegmentId,
        length: f32,
        angle_offset: f32,
        is_highway: bool,
        is_branch: bool,
        delay: u32,
        seq: &mut SegmentSeq,
    ) -> Segment {
        let heading = (self.heading() + angle_offset).to_radians();
        let end = self.end + Vec2::new(heading.cos(), heading.sin()) * length;

        let mut child = Segment::new(self.end, end, is_highway, seq);
        child.t = delay;
        child.is_branch = is_branch;
        child.parent = Some(self_id);
        child
    }
}

/// Intersect two segments, with factors measured along `main`.
pub fn find_intersect(main: &Segment, other: &Segment) -> Option<Intersection> {
    geometry::find_intersect(main.start, main.end, other.start, other.end)
}

/// Smallest heading difference between two segments, in `[0, 90]` degrees.
pub fn angle_between(a: &Segment, b: &Segment) -> f32 {
    geometry::min_angle_difference(a.heading(), b.heading())
}

/// Insert a link if not already present.
pub fn add_link(links: &mut LinkSet, id: SegmentId) {
    if !links.contains(&id) {
        links.push(id);
    }
}

/// Drop a link if present.
pub fn remove_link(links: &mut LinkSet, id: SegmentId) {
    links.retain(|&mut l| l != id);
}
