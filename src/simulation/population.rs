//! Population lifecycle: seeded spawning, the raise pass and aggregate
//! statistics.
//!
//! The raise pass converts dead survivors into zombies in place, in the
//! same arena slot and with the same id and occupant entry, so occupant
//! lists stay exact across the transition.

use std::collections::HashMap;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::procgen::segments::SegmentId;
use crate::simulation::agents::{Agent, AgentKind, Population, ZombieState};
use crate::simulation::survivors;
use crate::world::City;

/// Spawn the configured initial population at uniform random positions on
/// uniform random roads.
pub fn spawn(
    population: &mut Population,
    city: &mut City,
    cfg: &SimulationConfig,
    rng: &mut StdRng,
) {
    if city.roads.is_empty() {
        warn!("no roads to spawn a population on");
        return;
    }

    let mut next_id = 0u32;
    let mut spawn_one = |population: &mut Population,
                         city: &mut City,
                         rng: &mut StdRng,
                         build: &dyn Fn(u32, SegmentId, Vec2, f32) -> Agent| {
        next_id += 1;
        let road = SegmentId(rng.gen_range(0..city.roads.len()) as u32);
        let seg = city.seg(road);
        let pos = seg.start.lerp(seg.end, rng.gen::<f32>());
        let direction = if rng.gen::<f32>() > 0.5 { 1.0 } else { -1.0 };

        let idx = population.agents.len();
        city.seg_mut(road).occupants.push(idx);
        population.agents.push(build(next_id, road, pos, direction));
        idx
    };

    for _ in 0..cfg.init_survivors {
        spawn_one(population, city, rng, &|id, road, pos, dir| {
            Agent::survivor(id, road, pos, dir, cfg.survivor_speed)
        });
    }
    for _ in 0..cfg.init_infected {
        let idx = spawn_one(population, city, rng, &|id, road, pos, dir| {
            Agent::survivor(id, road, pos, dir, cfg.survivor_speed)
        });
        survivors::infect(&mut population.agents[idx], cfg, rng);
    }
    for _ in 0..cfg.init_zombies {
        spawn_one(population, city, rng, &|id, road, pos, dir| {
            Agent::zombie(id, road, pos, dir, cfg.zombie_raise_delay)
        });
    }

    info!(
        "spawned {} survivors ({} infected), {} zombies",
        cfg.init_survivors + cfg.init_infected,
        cfg.init_infected,
        cfg.init_zombies
    );
}

/// End-of-tick raise pass: every dead survivor becomes a zombie in place.
/// A failed raise draw produces an instantly destroyed corpse.
pub fn raise_pass(population: &mut Population, cfg: &SimulationConfig, rng: &mut StdRng) {
    for agent in &mut population.agents {
        if !agent.is_dead || !matches!(agent.kind, AgentKind::Survivor(_)) {
            continue;
        }
        agent.direction = if rng.gen::<f32>() > 0.5 { 1.0 } else { -1.0 };
        agent.is_infected = true;
        agent.is_panicked = false;
        agent.kind = AgentKind::Zombie(ZombieState {
            raise_delay: cfg.zombie_raise_delay,
            is_destroyed: rng.gen::<f32>() > cfg.zombie_raise_chance,
        });
    }
}

/// Aggregate counts refreshed each tick; the read surface for any external
/// statistics consumer.
#[derive(Resource, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutbreakStats {
    /// Living survivors, the infected included.
    pub survivors: u32,
    /// Living survivors carrying an incubation countdown.
    pub infected: u32,
    pub panicked: u32,
    /// Zombies up and hunting.
    pub zombies: u32,
    /// Raised corpses still counting their delay down.
    pub corpses_pending: u32,
    pub destroyed: u32,
}

pub fn collect_stats(population: &Population) -> OutbreakStats {
    let mut stats = OutbreakStats::default();
    for agent in &population.agents {
        match &agent.kind {
            AgentKind::Survivor(_) => {
                if agent.is_dead {
                    continue;
                }
                stats.survivors += 1;
                if agent.is_infected {
                    stats.infected += 1;
                }
                if agent.is_panicked {
                    stats.panicked += 1;
                }
            }
            AgentKind::Zombie(state) => {
                if state.is_destroyed {
                    stats.destroyed += 1;
                } else if state.raise_delay > 0 {
                    stats.corpses_pending += 1;
                } else {
                    stats.zombies += 1;
                }
            }
        }
    }
    stats
}

/// Per-sector population counts.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorCounts {
    pub survivors: u32,
    pub infected: u32,
    pub zombies: u32,
}

/// Bucket every agent into the sector containing its position.
pub fn spatial_histogram(
    population: &Population,
    cell_size: f32,
) -> HashMap<(i32, i32), SectorCounts> {
    let mut histogram: HashMap<(i32, i32), SectorCounts> = HashMap::new();
    for agent in &population.agents {
        let cell = (
            (agent.pos.x / cell_size).floor() as i32,
            (agent.pos.y / cell_size).floor() as i32,
        );
        let counts = histogram.entry(cell).or_default();
        match &agent.kind {
            AgentKind::Survivor(_) if !agent.is_dead => {
                counts.survivors += 1;
                if agent.is_infected {
                    counts.infected += 1;
                }
            }
            AgentKind::Survivor(_) => {}
            AgentKind::Zombie(_) => counts.zombies += 1,
        }
    }
    histogram
}
