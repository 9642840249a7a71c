//! Zombie behavior: raising, hunting, attacking, destruction.
//!
//! A raised zombie counts a corpse delay down before acting. Active
//! zombies wander with a bias toward crowded roads, switch to hunt speed
//! when anything alive is in hunt range, and attack at most one victim per
//! tick. Destruction is terminal; the corpse stays in its road's occupant
//! list.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::simulation::agents::{self, AgentKind, LinkSelection, Population};
use crate::simulation::survivors;
use crate::world::City;

/// One zombie tick.
pub fn tick(
    population: &mut Population,
    idx: usize,
    city: &mut City,
    cfg: &SimulationConfig,
    rng: &mut StdRng,
) {
    match &mut population.agents[idx].kind {
        AgentKind::Zombie(state) => {
            if state.is_destroyed {
                return;
            }
            if state.raise_delay > 0 {
                state.raise_delay -= 1;
                return;
            }
        }
        AgentKind::Survivor(_) => return,
    }

    // Hunt speed when anything alive is close enough to chase.
    let scan = agents::scan_nearby(population, idx, city, cfg.zombie_hunt_range);
    let speed = if scan.any_alive {
        cfg.zombie_hunt_speed
    } else {
        cfg.zombie_speed
    };

    agents::advance(
        population,
        idx,
        city,
        speed,
        cfg.zombie_wander_direction_change_probability,
        LinkSelection::MostSurvivors {
            follow_probability: cfg.zombie_follow_probability,
        },
        rng,
    );

    attack(population, idx, city, cfg, rng);
}

/// Pick at most one living victim in attack range from the current road,
/// preferring the nearest uninfected over the nearest infected, and roll
/// kill, wound and self-destruction odds scaled by distance and facing.
fn attack(
    population: &mut Population,
    idx: usize,
    city: &City,
    cfg: &SimulationConfig,
    rng: &mut StdRng,
) {
    let (road, pos, direction) = {
        let me = &population.agents[idx];
        (me.road, me.pos, me.direction)
    };

    let mut nearest_uninfected: Option<(usize, f32)> = None;
    let mut nearest_infected: Option<(usize, f32)> = None;
    for &other in &city.seg(road).occupants {
        if other == idx {
            continue;
        }
        let them = &population.agents[other];
        if them.is_dead {
            continue;
        }
        let dist = pos.distance(them.pos);
        if dist >= cfg.zombie_attack_range {
            continue;
        }
        let slot = if them.is_infected {
            &mut nearest_infected
        } else {
            &mut nearest_uninfected
        };
        if slot.map_or(true, |(_, d)| dist < d) {
            *slot = Some((other, dist));
        }
    }

    let Some((victim, dist)) = nearest_uninfected.or(nearest_infected) else {
        return;
    };

    let facing = if population.agents[victim].direction == direction {
        cfg.same_facing_attack_modifier
    } else {
        cfg.different_facing_attack_modifier
    };
    let distance_factor = (1.0 - dist / cfg.zombie_attack_range) * facing;

    let r: f32 = rng.gen();
    if r < cfg.zombie_kill_probability * distance_factor {
        population.agents[victim].is_dead = true;
    } else if r < cfg.zombie_wound_probability * distance_factor {
        survivors::infect(&mut population.agents[victim], cfg, rng);
    }

    if rng.gen::<f32>() < cfg.zombie_destruction_probability * distance_factor {
        if let AgentKind::Zombie(state) = &mut population.agents[idx].kind {
            state.is_destroyed = true;
        }
    }
}
