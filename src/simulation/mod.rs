//! Agent simulation: seeded spawning, the per-tick loop and its systems.
//!
//! Tick order matters and is fixed: zombies act first, then survivors,
//! then the raise pass converts the tick's dead at the boundary. Agents
//! later in arena order see mutations made earlier in the same tick.

use bevy::app::AppExit;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod agents;
pub mod population;
pub mod survivors;
pub mod zombies;

use crate::config::SimulationConfig;
use agents::{AgentKind, Population};
use population::OutbreakStats;

use crate::world::City;

/// Seeded RNG driving spawning and every per-tick draw.
#[derive(Resource)]
pub struct SimRng(pub StdRng);

#[derive(Resource, Default)]
pub struct TickCount(pub u64);

/// One full simulation tick over the whole arena.
pub fn run_tick(
    city: &mut City,
    population: &mut Population,
    cfg: &SimulationConfig,
    rng: &mut StdRng,
) {
    for idx in 0..population.agents.len() {
        if matches!(population.agents[idx].kind, AgentKind::Zombie(_)) {
            zombies::tick(population, idx, city, cfg, rng);
        }
    }
    for idx in 0..population.agents.len() {
        if matches!(population.agents[idx].kind, AgentKind::Survivor(_)) {
            survivors::tick(population, idx, city, cfg, rng);
        }
    }
    population::raise_pass(population, cfg, rng);
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationConfig>()
            .init_resource::<OutbreakStats>()
            .init_resource::<TickCount>()
            .add_systems(PostStartup, spawn_population)
            .add_systems(Update, tick_simulation);
    }
}

/// Validate configuration and place the initial population on the
/// generated network.
fn spawn_population(
    mut commands: Commands,
    city: Option<ResMut<City>>,
    cfg: Res<SimulationConfig>,
    mut exit: EventWriter<AppExit>,
) {
    // Absent when generation already failed and requested exit.
    let Some(mut city) = city else {
        return;
    };
    if let Err(err) = cfg.validate() {
        error!("invalid simulation configuration: {err}");
        exit.send(AppExit::error());
        return;
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut pop = Population::default();
    population::spawn(&mut pop, &mut city, &cfg, &mut rng);

    commands.insert_resource(pop);
    commands.insert_resource(SimRng(rng));
}

fn tick_simulation(
    city: Option<ResMut<City>>,
    pop: Option<ResMut<Population>>,
    rng: Option<ResMut<SimRng>>,
    cfg: Res<SimulationConfig>,
    mut stats: ResMut<OutbreakStats>,
    mut ticks: ResMut<TickCount>,
    mut exit: EventWriter<AppExit>,
) {
    let (Some(mut city), Some(mut pop), Some(mut rng)) = (city, pop, rng) else {
        return;
    };

    run_tick(&mut city, &mut pop, &cfg, &mut rng.0);
    *stats = population::collect_stats(&pop);
    ticks.0 += 1;

    if ticks.0 % 500 == 0 {
        let spread = population::spatial_histogram(&pop, city.sectors.cell_size).len();
        info!(
            "tick {}: {} survivors ({} infected, {} panicked), {} zombies, {} corpses, {} sectors occupied",
            ticks.0,
            stats.survivors,
            stats.infected,
            stats.panicked,
            stats.zombies,
            stats.corpses_pending + stats.destroyed,
            spread
        );
    }

    if cfg.max_ticks != 0 && ticks.0 >= cfg.max_ticks {
        info!(
            "simulation finished after {} ticks: {} survivors left, {} zombies",
            ticks.0, stats.survivors, stats.zombies
        );
        exit.send(AppExit::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procgen::density::DensityField;
    use crate::procgen::segments::{Segment, SegmentId, SegmentSeq};
    use agents::Agent;

    #[test]
    fn dead_survivors_rise_at_the_tick_boundary() {
        let cfg = SimulationConfig::default();
        let mut seq = SegmentSeq::default();
        let seg = Segment::new(Vec2::new(-500.0, 0.0), Vec2::new(500.0, 0.0), false, &mut seq);
        let mut city = City::new(550.0, DensityField::new(7, (0.0, 0.0)));
        city.add_segment(seg);

        let mut pop = Population::default();
        let mut doomed = Agent::survivor(1, SegmentId(0), Vec2::ZERO, 1.0, cfg.survivor_speed);
        doomed.is_infected = true;
        if let AgentKind::Survivor(state) = &mut doomed.kind {
            state.incubation_remaining = Some(1);
        }
        city.seg_mut(SegmentId(0)).occupants.push(0);
        pop.agents.push(doomed);

        let mut rng = StdRng::seed_from_u64(13);
        run_tick(&mut city, &mut pop, &cfg, &mut rng);

        let a = &pop.agents[0];
        assert!(a.is_dead);
        assert!(matches!(a.kind, AgentKind::Zombie(_)));
        assert_eq!(a.id, 1);
    }
}
