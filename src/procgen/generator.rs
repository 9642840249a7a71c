//! Road network growth: a priority queue of candidate segments, local
//! constraint checks against the existing network and global goals that
//! spawn extensions and branches biased by population density.
//!
//! The classic local-constraints / global-goals generator: candidates pop
//! in generation order (breadth-first by creation time, delayed branches
//! later), get snapped or rejected against nearby geometry, and accepted
//! segments propose their successors. Everything is driven by one seeded
//! RNG, so identical seeds reproduce identical networks.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::GenerationConfig;
use crate::geometry::Intersection;
use crate::procgen::density::DensityField;
use crate::procgen::segments::{
    add_link, angle_between, find_intersect, remove_link, Segment, SegmentId, SegmentSeq, SnapType,
};
use crate::world::City;

/// Generate a city. `manual_seed` wins over the configured seed; a zero
/// configured seed falls back to a process-derived one.
pub fn generate(manual_seed: Option<u64>, cfg: &GenerationConfig) -> City {
    let started = Instant::now();

    let seed = manual_seed.unwrap_or_else(|| {
        if cfg.seed != 0 {
            cfg.seed
        } else {
            process_seed()
        }
    });

    let mut rng = StdRng::seed_from_u64(seed);
    let offset = (
        rng.gen_range(-1.0..1.0) * 1_000_000_000.0,
        rng.gen_range(-1.0..1.0) * 1_000_000_000.0,
    );

    info!("Generating up to {} segments with seed: {}", cfg.max_segments, seed);

    let mut seq = SegmentSeq::default();
    let mut city = City::new(cfg.sector_size, DensityField::new(seed as u32, offset));

    let mut queue = GrowthQueue::default();
    queue.push(Segment::new(
        Vec2::ZERO,
        Vec2::new(cfg.highway_length, 0.0),
        true,
        &mut seq,
    ));

    // The cap is a hard bound on the final count. A cross snap places the
    // candidate plus one split half, so splits are only allowed while two
    // slots remain.
    while city.roads.len() < cfg.max_segments as usize {
        let Some(mut seg) = queue.pop() else { break };

        let allow_split = city.roads.len() + 2 <= cfg.max_segments as usize;
        if !local_constraints(&mut seg, &mut city, cfg, &mut seq, allow_split) {
            continue;
        }

        let parent_t = seg.t;
        let id = city.add_segment(seg);
        connect_links(&mut city, id);

        for mut child in global_goals(&mut city, id, cfg, &mut rng, &mut seq) {
            child.t += parent_t + 1;
            queue.push(child);
        }
    }

    info!(
        "Generation complete: {} segments in {} ms",
        city.roads.len(),
        started.elapsed().as_millis()
    );

    city
}

fn process_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Worklist of not-yet-evaluated candidates, popped lowest generation
/// order first; arrival order breaks ties.
#[derive(Default)]
struct GrowthQueue {
    heap: BinaryHeap<QueuedCandidate>,
    arrivals: u64,
}

struct QueuedCandidate {
    order: u32,
    arrival: u64,
    seg: Segment,
}

impl PartialEq for QueuedCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.arrival == other.arrival
    }
}

impl Eq for QueuedCandidate {}

impl PartialOrd for QueuedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the lowest order out
        // first.
        (other.order, other.arrival).cmp(&(self.order, self.arrival))
    }
}

impl GrowthQueue {
    fn push(&mut self, seg: Segment) {
        self.arrivals += 1;
        self.heap.push(QueuedCandidate {
            order: seg.t,
            arrival: self.arrivals,
            seg,
        });
    }

    fn pop(&mut self) -> Option<Segment> {
        self.heap.pop().map(|c| c.seg)
    }
}

/// The snap chosen by the local-constraint scan, executed once the whole
/// neighborhood has been examined.
enum SnapAction {
    /// Split the other segment at a crossing (true cross or extension).
    Cross {
        other: SegmentId,
        crossing: Intersection,
    },
    /// Weld the candidate end onto the other segment's end vertex.
    WeldEnd { other: SegmentId, kind: SnapType },
    /// Weld the candidate end onto the other segment's start vertex.
    WeldStart { other: SegmentId, kind: SnapType },
}

/// Check a candidate against the existing network, modifying it to fit
/// (snapping) where possible. Returns false when the candidate must be
/// discarded.
fn local_constraints(
    seg: &mut Segment,
    city: &mut City,
    cfg: &GenerationConfig,
    seq: &mut SegmentSeq,
    allow_split: bool,
) -> bool {
    // Crowding against the siblings already attached to the parent's end.
    if let Some(pid) = seg.parent {
        let links: Vec<SegmentId> = city.seg(pid).links_e.to_vec();
        if is_road_crowding(seg, &links, city, cfg) {
            return false;
        }
    }

    let mut action: Option<SnapAction> = None;
    let mut last_snap = SnapType::No;
    let mut last_inter_factor = 1.0_f32;
    let mut last_ext_factor = 999.0_f32;

    let mut check_segs: Vec<SegmentId> = Vec::new();
    for cell in city.sectors.cells_for_span(seg) {
        check_segs.extend_from_slice(city.sectors.segments_in(cell));
    }

    for other_id in check_segs {
        let other = city.seg(other_id);
        let inter = find_intersect(seg, other);

        // True crossing within both extents, closest along the candidate.
        if last_snap <= SnapType::Cross {
            if let Some(crossing) = inter {
                if crossing.main_factor > 0.0 && crossing.main_factor < last_inter_factor {
                    last_inter_factor = crossing.main_factor;
                    last_snap = SnapType::Cross;
                    action = Some(SnapAction::Cross {
                        other: other_id,
                        crossing,
                    });
                }
            }
        }
        // Vertex welding: candidate end near another road's end or start.
        if last_snap <= SnapType::End {
            if seg.end.distance(other.end) < cfg.snap_vertex_radius {
                last_snap = SnapType::End;
                action = Some(SnapAction::WeldEnd {
                    other: other_id,
                    kind: SnapType::End,
                });
            } else if seg.end.distance(other.start) < cfg.snap_vertex_radius {
                last_snap = SnapType::End;
                action = Some(SnapAction::WeldStart {
                    other: other_id,
                    kind: SnapType::End,
                });
            }
        }
        // Near-miss crossing just past the candidate's end.
        if last_snap <= SnapType::Extend {
            if let Some(crossing) = inter {
                if crossing.main_factor > 1.0
                    && crossing.main_factor < last_ext_factor
                    && seg.end.distance(crossing.point) < cfg.snap_extend_radius
                {
                    last_ext_factor = crossing.main_factor;
                    last_snap = SnapType::Extend;
                    action = Some(SnapAction::Cross {
                        other: other_id,
                        crossing,
                    });
                }
            }
        }
    }

    match action {
        None => true,
        Some(SnapAction::Cross { other, crossing }) => {
            snap_to_cross(seg, other, crossing, city, cfg, seq, allow_split)
        }
        Some(SnapAction::WeldEnd { other, kind }) => snap_to_point(seg, other, false, kind, city, cfg),
        Some(SnapAction::WeldStart { other, kind }) => snap_to_point(seg, other, true, kind, city, cfg),
    }
}

/// Does the candidate form an angle below the minimum with any of the
/// given roads?
fn is_road_crowding(
    seg: &Segment,
    to_check: &[SegmentId],
    city: &City,
    cfg: &GenerationConfig,
) -> bool {
    to_check
        .iter()
        .any(|&id| angle_between(seg, city.seg(id)) < cfg.min_angle_diff)
}

fn round5(value: f32) -> f32 {
    (value * 1e5).round() / 1e5
}

/// Snap the candidate onto a crossing with `other`, splitting `other` at
/// the crossing point. The split tail keeps `other`'s identity and end; a
/// new head segment inherits the start-side topology and branch flag.
fn snap_to_cross(
    seg: &mut Segment,
    other_id: SegmentId,
    crossing: Intersection,
    city: &mut City,
    cfg: &GenerationConfig,
    seq: &mut SegmentSeq,
    allow_split: bool,
) -> bool {
    // A crossing at the candidate's own start would leave a zero-length
    // candidate.
    if round5(crossing.main_factor) == 0.0 {
        return false;
    }
    // A crossing exactly at the candidate's end that also sits on one of
    // the other road's vertices degrades to a weld.
    if round5(crossing.main_factor) == 1.0 {
        let other_factor = round5(crossing.other_factor);
        if other_factor == 0.0 {
            return snap_to_point(seg, other_id, true, SnapType::CrossTooClose, city, cfg);
        }
        if other_factor == 1.0 {
            return snap_to_point(seg, other_id, false, SnapType::CrossTooClose, city, cfg);
        }
    }
    // Splitting at (or within rounding of) a vertex would create a
    // near-zero-length fragment.
    let other_factor = round5(crossing.other_factor);
    if other_factor == 0.0 || other_factor == 1.0 {
        return false;
    }
    // From here on a real split happens, placing a second segment.
    if !allow_split {
        return false;
    }

    let old_parent = city.seg(other_id).parent;
    let start_loc = city.seg(other_id).start;
    let other_is_highway = city.seg(other_id).is_highway;
    let other_is_branch = city.seg(other_id).is_branch;

    // Detach the other road from everything wired at its old start vertex
    // before the head half takes over that point. The start links
    // enumerate all of them, welded roads included, whether or not a
    // parent exists.
    let wired: Vec<SegmentId> = city.seg(other_id).links_s.to_vec();
    for wid in wired {
        let w = city.seg_mut(wid);
        if w.start == start_loc {
            remove_link(&mut w.links_s, other_id);
        } else if w.end == start_loc {
            remove_link(&mut w.links_e, other_id);
        }
    }

    {
        let other = city.seg_mut(other_id);
        other.links_s.clear();
        other.start = crossing.point;
    }

    let mut split_half = Segment::new(start_loc, crossing.point, other_is_highway, seq);
    split_half.parent = old_parent;
    split_half.is_branch = other_is_branch;
    add_link(&mut split_half.links_e, other_id);

    let split_id = city.add_segment(split_half);
    connect_links(city, split_id);

    {
        let other = city.seg_mut(other_id);
        other.is_branch = false;
        other.parent = Some(split_id);
        add_link(&mut other.links_s, split_id);
    }

    add_link(&mut seg.links_e, other_id);
    add_link(&mut seg.links_e, split_id);
    seg.end = crossing.point;
    seg.snapped = if crossing.main_factor > 1.0 {
        SnapType::Extend
    } else {
        SnapType::Cross
    };

    true
}

/// Weld the candidate's end onto one of `other`'s vertices, adopting the
/// links already meeting there. Rejects the candidate when the weld point
/// is already crowded.
fn snap_to_point(
    seg: &mut Segment,
    other_id: SegmentId,
    at_start: bool,
    kind: SnapType,
    city: &mut City,
    cfg: &GenerationConfig,
) -> bool {
    let (link_point, links): (Vec2, Vec<SegmentId>) = {
        let other = city.seg(other_id);
        if at_start {
            (other.start, other.links_s.to_vec())
        } else {
            (other.end, other.links_e.to_vec())
        }
    };

    if is_road_crowding(seg, &links, city, cfg) {
        return false;
    }

    seg.end = link_point;
    for lid in links {
        add_link(&mut seg.links_e, lid);
    }
    add_link(&mut seg.links_e, other_id);
    seg.snapped = kind;

    true
}

/// Wire up both endpoints of a freshly placed segment against every
/// segment sharing a coincident endpoint in the same sector, in both
/// directions. This is what establishes the link-symmetry invariant.
pub fn connect_links(city: &mut City, id: SegmentId) {
    for at_start in [true, false] {
        let point = {
            let seg = city.seg(id);
            if at_start {
                seg.start
            } else {
                seg.end
            }
        };

        let cell = city.sectors.containing_sector(point);
        let candidates: Vec<SegmentId> = city.sectors.segments_in(cell).to_vec();

        for cid in candidates {
            if cid == id {
                continue;
            }
            let (c_start, c_end) = {
                let c = city.seg(cid);
                (c.start, c.end)
            };

            if c_start == point {
                add_link(&mut city.seg_mut(cid).links_s, id);
                let own = city.seg_mut(id);
                add_link(if at_start { &mut own.links_s } else { &mut own.links_e }, cid);
            }
            if c_end == point {
                add_link(&mut city.seg_mut(cid).links_e, id);
                let own = city.seg_mut(id);
                add_link(if at_start { &mut own.links_s } else { &mut own.links_e }, cid);
            }
        }
    }
}

fn highway_deviation(rng: &mut StdRng, cfg: &GenerationConfig) -> f32 {
    rng.gen_range(-cfg.highway_max_angle_dev..=cfg.highway_max_angle_dev)
}

fn branch_deviation(rng: &mut StdRng, cfg: &GenerationConfig) -> f32 {
    rng.gen_range(-cfg.branch_max_angle_dev..=cfg.branch_max_angle_dev)
}

fn branch_side(rng: &mut StdRng) -> f32 {
    if rng.gen_bool(0.5) {
        90.0
    } else {
        -90.0
    }
}

/// Propose extensions and branches from a segment that was just placed.
/// Snapped segments terminate their growth line.
fn global_goals(
    city: &mut City,
    prev_id: SegmentId,
    cfg: &GenerationConfig,
    rng: &mut StdRng,
    seq: &mut SegmentSeq,
) -> Vec<Segment> {
    let mut new_segments = Vec::new();

    let prev = city.seg(prev_id).clone();
    if prev.snapped != SnapType::No {
        return new_segments;
    }

    let straight = prev.make_extension(prev_id, 0.0, cfg, seq);
    let straight_pop = city.density.at_line(&straight);

    if prev.is_highway {
        // Extend the highway, tending toward higher density.
        let wiggle = prev.make_extension(prev_id, highway_deviation(rng, cfg), cfg, seq);
        let wiggle_pop = city.density.at_line(&wiggle);

        let next_pop = if wiggle_pop > straight_pop {
            new_segments.push(wiggle);
            wiggle_pop
        } else {
            new_segments.push(straight);
            straight_pop
        };

        // A highway branch once the extension's density clears the bar.
        if next_pop > cfg.highway_branch_pop && rng.gen::<f32>() < cfg.highway_branch_chance {
            let angle = branch_side(rng) + branch_deviation(rng, cfg);
            new_segments.push(prev.make_continuation(
                prev_id,
                cfg.highway_length,
                angle,
                true,
                true,
                0,
                seq,
            ));
        }
    } else if straight_pop > rng.gen_range(0.0..cfg.street_extend_pop) {
        new_segments.push(straight);
    }

    // Perpendicular street branch; branches off highways are deferred so
    // streets appear after the highway skeleton settles.
    if straight_pop > rng.gen_range(0.0..cfg.street_branch_pop)
        && rng.gen::<f32>() < cfg.street_branch_chance
    {
        let angle = branch_side(rng) + branch_deviation(rng, cfg);
        let delay = if prev.is_highway {
            cfg.highway_branch_delay
        } else {
            0
        };
        new_segments.push(prev.make_continuation(
            prev_id,
            cfg.street_length,
            angle,
            false,
            true,
            delay,
            seq,
        ));
    }

    new_segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg(max_segments: u32) -> GenerationConfig {
        GenerationConfig {
            max_segments,
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_network() {
        let cfg = small_cfg(300);
        let a = generate(Some(12345), &cfg);
        let b = generate(Some(12345), &cfg);

        assert_eq!(a.roads.len(), b.roads.len());
        assert_eq!(a.roads, b.roads);
    }

    #[test]
    fn different_seeds_diverge() {
        let cfg = small_cfg(200);
        let a = generate(Some(1), &cfg);
        let b = generate(Some(2), &cfg);
        assert_ne!(a.roads, b.roads);
    }

    #[test]
    fn seeded_city_respects_cap_and_roots_a_highway_at_origin() {
        let cfg = GenerationConfig::default();
        let city = generate(Some(200972), &cfg);

        assert!(city.roads.len() <= cfg.max_segments as usize);
        assert!(city.roads.len() > 10, "seeded growth should take off");

        let root = &city.roads[0];
        assert!(root.is_highway);
        assert_eq!(root.t, 0);
        assert_eq!(root.start, Vec2::ZERO);
    }

    #[test]
    fn small_cap_is_a_hard_bound() {
        let cfg = small_cfg(50);
        let city = generate(Some(200972), &cfg);
        assert!(city.roads.len() <= 50);
    }

    fn assert_links_consistent(city: &City) {
        for (idx, seg) in city.roads.iter().enumerate() {
            let id = SegmentId(idx as u32);

            for &lid in &seg.links_e {
                let linked = city.seg(lid);
                let reciprocal = (linked.start == seg.end && linked.links_s.contains(&id))
                    || (linked.end == seg.end && linked.links_e.contains(&id));
                assert!(
                    reciprocal,
                    "segment {idx} end-links {} without a reciprocal link",
                    lid.0
                );
            }
            for &lid in &seg.links_s {
                let linked = city.seg(lid);
                let reciprocal = (linked.start == seg.start && linked.links_s.contains(&id))
                    || (linked.end == seg.start && linked.links_e.contains(&id));
                assert!(
                    reciprocal,
                    "segment {idx} start-links {} without a reciprocal link",
                    lid.0
                );
            }
        }
    }

    #[test]
    fn links_are_mutually_consistent_after_generation() {
        let city = generate(Some(200972), &small_cfg(400));
        assert_links_consistent(&city);
    }

    #[test]
    fn splitting_a_parentless_road_rewires_welded_start_links() {
        let cfg = GenerationConfig::default();
        let mut seq = SegmentSeq::default();
        let mut city = City::new(cfg.sector_size, DensityField::new(1, (0.0, 0.0)));

        // Root highway with a street welded onto its start vertex.
        let root = city.add_segment(Segment::new(
            Vec2::ZERO,
            Vec2::new(400.0, 0.0),
            true,
            &mut seq,
        ));
        connect_links(&mut city, root);
        let weld = city.add_segment(Segment::new(
            Vec2::new(0.0, -300.0),
            Vec2::ZERO,
            false,
            &mut seq,
        ));
        connect_links(&mut city, weld);
        assert!(city.seg(weld).links_e.contains(&root));

        // A candidate crossing mid-span splits the root even though the
        // root has no parent to enumerate the start-side links from.
        let mut candidate = Segment::new(
            Vec2::new(200.0, -100.0),
            Vec2::new(200.0, 100.0),
            false,
            &mut seq,
        );
        assert!(local_constraints(&mut candidate, &mut city, &cfg, &mut seq, true));
        assert_eq!(candidate.snapped, SnapType::Cross);
        let placed = city.add_segment(candidate);
        connect_links(&mut city, placed);

        // The welded street now links the split head, not the moved root.
        assert_eq!(city.seg(root).start, Vec2::new(200.0, 0.0));
        assert!(!city.seg(weld).links_e.contains(&root));
        assert_links_consistent(&city);
    }

    #[test]
    fn a_cap_of_one_still_places_the_seed_highway() {
        let city = generate(Some(200972), &small_cfg(1));
        assert_eq!(city.roads.len(), 1);
        assert!(city.roads[0].is_highway);
        assert_eq!(city.roads[0].start, Vec2::ZERO);
    }

    #[test]
    fn never_snapped_pairs_do_not_cross_interiors() {
        let city = generate(Some(200972), &small_cfg(400));

        for cell_segs in city.sectors.cells.values() {
            for (i, &a_id) in cell_segs.iter().enumerate() {
                for &b_id in &cell_segs[i + 1..] {
                    let a = city.seg(a_id);
                    let b = city.seg(b_id);
                    if a.snapped != SnapType::No || b.snapped != SnapType::No {
                        continue;
                    }
                    if let Some(inter) = find_intersect(a, b) {
                        let interior = |f: f32| f > 1e-4 && f < 1.0 - 1e-4;
                        assert!(
                            !(interior(inter.main_factor) && interior(inter.other_factor)),
                            "unsnapped segments {} and {} cross mid-span",
                            a_id.0,
                            b_id.0
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn split_halves_share_the_crossing_point() {
        let city = generate(Some(200972), &GenerationConfig::default());

        let mut found_split = false;
        for seg in &city.roads {
            if let Some(pid) = seg.parent {
                let parent = city.seg(pid);
                if parent.end == seg.start {
                    found_split = true;
                }
            }
        }
        assert!(found_split, "expected at least one parent/child junction");
    }
}
