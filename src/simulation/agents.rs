//! Agent arena and the movement routine shared by survivors and zombies.
//!
//! Agents live in a flat arena and refer to their current road by
//! `SegmentId`; each road's occupant list holds arena indices back. The
//! two stay in lockstep: every transition removes the index from the old
//! road and appends it to the new one in the same call.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::procgen::segments::{Segment, SegmentId};
use crate::world::City;

/// Per-variant survivor state.
#[derive(Clone, Debug, PartialEq)]
pub struct SurvivorState {
    pub speed: f32,
    pub panic_remaining: u32,
    pub panic_initial: u32,
    /// `Some` once infected; death fires when it reaches zero.
    pub incubation_remaining: Option<u32>,
}

/// Per-variant zombie state.
#[derive(Clone, Debug, PartialEq)]
pub struct ZombieState {
    /// Ticks left before the corpse rises and starts acting.
    pub raise_delay: u32,
    /// Terminal. A destroyed zombie never moves or attacks again but keeps
    /// its occupant entry.
    pub is_destroyed: bool,
}

/// Closed behavior variant; shared fields live on `Agent` itself.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentKind {
    Survivor(SurvivorState),
    Zombie(ZombieState),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    /// Stable numeric identity, kept across the survivor-to-zombie raise.
    pub id: u32,
    pub road: SegmentId,
    pub pos: Vec2,
    /// Travel sign along the road's start-to-end vector, +1 or -1.
    pub direction: f32,
    pub is_dead: bool,
    pub is_infected: bool,
    pub is_panicked: bool,
    pub kind: AgentKind,
}

impl Agent {
    pub fn survivor(id: u32, road: SegmentId, pos: Vec2, direction: f32, base_speed: f32) -> Self {
        Self {
            id,
            road,
            pos,
            direction,
            is_dead: false,
            is_infected: false,
            is_panicked: false,
            kind: AgentKind::Survivor(SurvivorState {
                speed: base_speed,
                panic_remaining: 0,
                panic_initial: 0,
                incubation_remaining: None,
            }),
        }
    }

    pub fn zombie(id: u32, road: SegmentId, pos: Vec2, direction: f32, raise_delay: u32) -> Self {
        Self {
            id,
            road,
            pos,
            direction,
            is_dead: true,
            is_infected: true,
            is_panicked: false,
            kind: AgentKind::Zombie(ZombieState {
                raise_delay,
                is_destroyed: false,
            }),
        }
    }

    pub fn is_live_survivor(&self) -> bool {
        matches!(self.kind, AgentKind::Survivor(_)) && !self.is_dead
    }
}

/// The full agent arena. Slots are never removed; a dead survivor's slot
/// is converted in place when it rises.
#[derive(Resource, Default, Clone)]
pub struct Population {
    pub agents: Vec<Agent>,
}

/// How an agent picks the next road at a junction.
#[derive(Clone, Copy)]
pub enum LinkSelection {
    Uniform,
    /// Prefer the linked road carrying the most live survivors; a failed
    /// follow draw falls back to a uniform pick.
    MostSurvivors { follow_probability: f32 },
    /// Skip linked roads carrying anything dead; when every link does, the
    /// full set is used. A failed follow draw ignores the filter.
    AvoidDead { follow_probability: f32 },
}

/// Advance one agent by `direction * speed` along its road and handle
/// endpoint arrival: pick a linked road (dead ends reverse in place), move
/// the occupant entry, snap to the nearer endpoint of the new road and
/// point away from it.
pub fn advance(
    population: &mut Population,
    idx: usize,
    city: &mut City,
    speed: f32,
    flip_probability: f32,
    policy: LinkSelection,
    rng: &mut StdRng,
) {
    let (road, mut pos, mut direction) = {
        let a = &population.agents[idx];
        (a.road, a.pos, a.direction)
    };
    let (start, end) = {
        let s = city.seg(road);
        (s.start, s.end)
    };

    let unit = (end - start) / start.distance(end);
    pos += unit * direction * speed;

    // Fractional position along the dominant axis decides endpoint arrival.
    let mut xd = end.x - start.x;
    if xd == 0.0 {
        xd = 1.0;
    }
    let mut yd = end.y - start.y;
    if yd == 0.0 {
        yd = 1.0;
    }
    let xf = (pos.x - start.x) / xd;
    let yf = (pos.y - start.y) / yd;
    let rt = if xd.abs() > yd.abs() { xf } else { yf };

    let arrived = if rt <= 0.0 {
        Some(city.seg(road).links_s.clone())
    } else if rt >= 1.0 {
        Some(city.seg(road).links_e.clone())
    } else {
        if rng.gen::<f32>() < flip_probability {
            direction = -direction;
        }
        None
    };

    let mut new_road = road;
    if let Some(links) = arrived {
        if !links.is_empty() {
            new_road = select_link(&links, policy, &city.roads, &population.agents, rng);
            let old = &mut city.seg_mut(road).occupants;
            if let Some(slot) = old.iter().position(|&o| o == idx) {
                old.remove(slot);
            }
            city.seg_mut(new_road).occupants.push(idx);
        }
        // Snap to the nearer endpoint and walk away from it. On a dead end
        // this is the in-place reversal.
        let (ns, ne) = {
            let s = city.seg(new_road);
            (s.start, s.end)
        };
        if pos.distance_squared(ns) < pos.distance_squared(ne) {
            pos = ns;
            direction = 1.0;
        } else {
            pos = ne;
            direction = -1.0;
        }
    }

    let a = &mut population.agents[idx];
    a.road = new_road;
    a.pos = pos;
    a.direction = direction;
}

fn select_link(
    links: &[SegmentId],
    policy: LinkSelection,
    roads: &[Segment],
    agents: &[Agent],
    rng: &mut StdRng,
) -> SegmentId {
    let uniform = |rng: &mut StdRng| links[rng.gen_range(0..links.len())];

    match policy {
        LinkSelection::Uniform => uniform(rng),
        LinkSelection::MostSurvivors { follow_probability } => {
            if rng.gen::<f32>() >= follow_probability {
                return uniform(rng);
            }
            let count = |id: SegmentId| {
                roads[id.index()]
                    .occupants
                    .iter()
                    .filter(|&&o| agents[o].is_live_survivor())
                    .count()
            };
            let mut best = links[0];
            let mut best_count = count(best);
            for &id in &links[1..] {
                let c = count(id);
                if c > best_count {
                    best = id;
                    best_count = c;
                }
            }
            best
        }
        LinkSelection::AvoidDead { follow_probability } => {
            if rng.gen::<f32>() >= follow_probability {
                return uniform(rng);
            }
            let safe: Vec<SegmentId> = links
                .iter()
                .copied()
                .filter(|id| {
                    !roads[id.index()]
                        .occupants
                        .iter()
                        .any(|&o| agents[o].is_dead)
                })
                .collect();
            if safe.is_empty() {
                uniform(rng)
            } else {
                safe[rng.gen_range(0..safe.len())]
            }
        }
    }
}

/// Result of a proximity scan around one agent.
#[derive(Default)]
pub struct NearbyScan {
    /// Arena indices within range, excluding the scanning agent.
    pub indices: Vec<usize>,
    pub any_dead: bool,
    pub any_alive: bool,
}

/// Rebuild an agent's nearby list: occupants of its own road, plus
/// occupants of roads linked at whichever of its endpoints lie within
/// `range`, all distance filtered.
pub fn scan_nearby(population: &Population, idx: usize, city: &City, range: f32) -> NearbyScan {
    let me = &population.agents[idx];
    let road = city.seg(me.road);

    let mut candidate_roads: Vec<SegmentId> = vec![me.road];
    if me.pos.distance(road.start) < range {
        for &l in &road.links_s {
            if !candidate_roads.contains(&l) {
                candidate_roads.push(l);
            }
        }
    }
    if me.pos.distance(road.end) < range {
        for &l in &road.links_e {
            if !candidate_roads.contains(&l) {
                candidate_roads.push(l);
            }
        }
    }

    let mut scan = NearbyScan::default();
    for rid in candidate_roads {
        for &other in &city.seg(rid).occupants {
            if other == idx {
                continue;
            }
            let them = &population.agents[other];
            if me.pos.distance(them.pos) < range {
                scan.any_dead |= them.is_dead;
                scan.any_alive |= !them.is_dead;
                scan.indices.push(other);
            }
        }
    }
    scan
}
