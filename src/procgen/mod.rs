//! Procedural generation: density field, segment model, growth algorithm.

use bevy::app::AppExit;
use bevy::prelude::*;

pub mod density;
pub mod generator;
pub mod segments;

use crate::config::GenerationConfig;
use crate::pathfind::{self, PathData};
use segments::SegmentId;

pub struct ProcgenPlugin;

impl Plugin for ProcgenPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GenerationConfig>()
            .add_systems(Startup, generate_city);
    }
}

/// Validate configuration and build the city. Malformed configuration is
/// the one fatal startup condition; everything later is reject-and-continue.
fn generate_city(
    mut commands: Commands,
    cfg: Res<GenerationConfig>,
    mut exit: EventWriter<AppExit>,
) {
    if let Err(err) = cfg.validate() {
        error!("invalid generation configuration: {err}");
        exit.send(AppExit::error());
        return;
    }

    let city = generator::generate(None, &cfg);

    // Route from the root to the newest segment as a connectivity check.
    if city.roads.len() > 1 {
        let mut query = PathData {
            start: Some(SegmentId(0)),
            end: Some(SegmentId(city.roads.len() as u32 - 1)),
            ..Default::default()
        };
        pathfind::astar(&mut query, &city.roads, cfg.path_highway_weight);
        if query.path.is_empty() {
            warn!("no route from the root to the newest segment");
        } else {
            info!(
                "sample route: {} segments, weighted length {:.0}, {} searched",
                query.path.len(),
                query.length,
                query.searched.len()
            );
        }
    }

    commands.insert_resource(city);
}
