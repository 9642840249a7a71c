//! OutbreakSim - procedural road network growth + outbreak simulation
//!
//! A headless Bevy app: a density-driven road network generator feeds a
//! tick-based survivor/zombie simulation. Rendering and statistics
//! storage are external consumers of the exposed resources.

use bevy::prelude::*;

mod config;
mod geometry;
mod pathfind;
mod procgen;
mod simulation;
mod world;

fn main() {
    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(bevy::log::LogPlugin::default())
        // Procedural generation
        .add_plugins(procgen::ProcgenPlugin)
        // Simulation
        .add_plugins(simulation::SimulationPlugin)
        .run();
}
