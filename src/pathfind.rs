//! Shortest-path search over the segment graph.
//!
//! Dijkstra and A* run on the same adjacency the generator builds
//! (`links_s`/`links_e`); nodes are whole segments and the cost of
//! entering one is its length, scaled down for highways to bias routes
//! toward them. Results are written back into the request record, and an
//! unreachable goal is an empty path, not an error.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::procgen::segments::{Segment, SegmentId};

/// A path query plus its result, mutated in place by the search.
#[derive(Default, Clone)]
pub struct PathData {
    pub start: Option<SegmentId>,
    pub end: Option<SegmentId>,
    /// Ordered path from start to end; empty when unreachable or unset.
    pub path: Vec<SegmentId>,
    /// Every segment settled during the search, in settle order.
    pub searched: Vec<SegmentId>,
    /// Total weighted length of the found path.
    pub length: f32,
}

/// Uniform-cost search.
pub fn dijkstra(data: &mut PathData, roads: &[Segment], highway_weight: f32) {
    search(data, roads, highway_weight, false);
}

/// A* with a straight-line midpoint heuristic. The heuristic is scaled by
/// the highway weight so it never overestimates the cheapest traversal.
pub fn astar(data: &mut PathData, roads: &[Segment], highway_weight: f32) {
    search(data, roads, highway_weight, true);
}

fn segment_cost(seg: &Segment, highway_weight: f32) -> f32 {
    if seg.is_highway {
        seg.length() * highway_weight
    } else {
        seg.length()
    }
}

struct OpenEntry {
    estimate: f32,
    id: SegmentId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.estimate == other.estimate && self.id == other.id
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ids break ties deterministically.
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn search(data: &mut PathData, roads: &[Segment], highway_weight: f32, use_heuristic: bool) {
    data.path.clear();
    data.searched.clear();
    data.length = 0.0;

    let (Some(start), Some(goal)) = (data.start, data.end) else {
        return;
    };

    let goal_mid = roads[goal.index()].midpoint();
    let heuristic = |id: SegmentId| -> f32 {
        if use_heuristic {
            roads[id.index()].midpoint().distance(goal_mid) * highway_weight
        } else {
            0.0
        }
    };

    let start_cost = segment_cost(&roads[start.index()], highway_weight);

    let mut best: HashMap<SegmentId, f32> = HashMap::new();
    let mut came_from: HashMap<SegmentId, SegmentId> = HashMap::new();
    let mut closed: HashSet<SegmentId> = HashSet::new();
    let mut open = BinaryHeap::new();

    best.insert(start, start_cost);
    open.push(OpenEntry {
        estimate: start_cost + heuristic(start),
        id: start,
    });

    while let Some(OpenEntry { id, .. }) = open.pop() {
        if !closed.insert(id) {
            continue;
        }
        data.searched.push(id);

        if id == goal {
            let mut path = vec![id];
            let mut cursor = id;
            while let Some(&prev) = came_from.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            data.path = path;
            data.length = best[&goal];
            return;
        }

        let here = &roads[id.index()];
        let cost_here = best[&id];

        for &next in here.links_s.iter().chain(here.links_e.iter()) {
            if closed.contains(&next) {
                continue;
            }
            let tentative = cost_here + segment_cost(&roads[next.index()], highway_weight);
            if best.get(&next).map_or(true, |&known| tentative < known) {
                best.insert(next, tentative);
                came_from.insert(next, id);
                open.push(OpenEntry {
                    estimate: tentative + heuristic(next),
                    id: next,
                });
            }
        }
    }
    // Queue exhausted without reaching the goal: leave the path empty.
}
