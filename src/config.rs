//! Flat configuration surface for generation and simulation.
//!
//! Malformed values (non-positive lengths, zero speeds, probabilities
//! outside [0, 1]) are fatal at startup; everything downstream assumes
//! non-degenerate geometry. All other runtime conditions are expected
//! outcomes of the stochastic model, not errors.

use bevy::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must be a probability in [0, 1], got {value}")]
    NotAProbability { name: &'static str, value: f32 },
    #[error("{name} must be nonzero")]
    Zero { name: &'static str },
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotAProbability { name, value })
    }
}

/// Parameters consumed by the road-network generator.
#[derive(Resource, Clone)]
pub struct GenerationConfig {
    /// Seed for the whole generation run. 0 falls back to a process-derived seed.
    pub seed: u64,
    /// Hard upper bound on placed segments.
    pub max_segments: u32,
    pub highway_length: f32,
    pub street_length: f32,
    /// Sector grid cell size for the spatial index.
    pub sector_size: f32,
    /// Minimum angle (degrees) between roads meeting at a point.
    pub min_angle_diff: f32,
    /// Radius for welding a candidate end onto an existing vertex.
    pub snap_vertex_radius: f32,
    /// Radius for extending a candidate onto a crossing just past its end.
    pub snap_extend_radius: f32,
    /// Density a highway extension must reach before it may branch.
    pub highway_branch_pop: f32,
    pub highway_branch_chance: f32,
    /// Density threshold scale for street branching.
    pub street_branch_pop: f32,
    pub street_branch_chance: f32,
    /// Density threshold scale for street extension.
    pub street_extend_pop: f32,
    /// Maximum random deviation (degrees) for highway extensions.
    pub highway_max_angle_dev: f32,
    /// Maximum random deviation (degrees) for branches.
    pub branch_max_angle_dev: f32,
    /// Extra generation-order delay for streets branching off highways.
    pub highway_branch_delay: u32,
    /// Edge-cost multiplier that biases path search toward highways.
    pub path_highway_weight: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 200972,
            max_segments: 1000,
            highway_length: 400.0,
            street_length: 300.0,
            sector_size: 550.0,
            min_angle_diff: 30.0,
            snap_vertex_radius: 50.0,
            snap_extend_radius: 50.0,
            highway_branch_pop: 0.1,
            highway_branch_chance: 0.1,
            street_branch_pop: 0.45,
            street_branch_chance: 0.8,
            street_extend_pop: 0.4,
            highway_max_angle_dev: 15.0,
            branch_max_angle_dev: 1.0,
            highway_branch_delay: 5,
            path_highway_weight: 0.75,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_segments == 0 {
            return Err(ConfigError::Zero { name: "max_segments" });
        }
        positive("highway_length", self.highway_length)?;
        positive("street_length", self.street_length)?;
        positive("sector_size", self.sector_size)?;
        positive("min_angle_diff", self.min_angle_diff)?;
        positive("snap_vertex_radius", self.snap_vertex_radius)?;
        positive("snap_extend_radius", self.snap_extend_radius)?;
        positive("path_highway_weight", self.path_highway_weight)?;
        positive("highway_branch_pop", self.highway_branch_pop)?;
        positive("street_branch_pop", self.street_branch_pop)?;
        positive("street_extend_pop", self.street_extend_pop)?;
        probability("highway_branch_chance", self.highway_branch_chance)?;
        probability("street_branch_chance", self.street_branch_chance)?;
        Ok(())
    }
}

/// Parameters consumed by the agent simulation.
#[derive(Resource, Clone)]
pub struct SimulationConfig {
    /// Seed for agent spawning and all per-tick draws.
    pub seed: u64,
    /// Headless run length in ticks; 0 runs until interrupted.
    pub max_ticks: u64,
    pub init_survivors: u32,
    pub init_infected: u32,
    pub init_zombies: u32,
    pub survivor_speed: f32,
    pub survivor_panic_speed: f32,
    pub survivor_panic_range: f32,
    /// Maximum panic countdown, in ticks.
    pub survivor_panic_duration: u32,
    pub sees_death_panic_probability: f32,
    pub sees_panicked_or_infected_panic_probability: f32,
    /// Chance a survivor honors the avoid-dead-roads filter at a junction.
    pub survivor_follow_probability: f32,
    pub survivor_wander_direction_change_probability: f32,
    pub infected_panic_time_multiplier: u32,
    /// Upper bound for the randomly drawn incubation countdown.
    pub infected_incubation_max_time: u32,
    pub zombie_speed: f32,
    pub zombie_hunt_speed: f32,
    pub zombie_hunt_range: f32,
    pub zombie_attack_range: f32,
    /// Ticks a freshly raised zombie stays inert.
    pub zombie_raise_delay: u32,
    /// Chance a dead survivor rises at all; failures are destroyed corpses.
    pub zombie_raise_chance: f32,
    /// Chance a zombie honors the most-survivors bias at a junction.
    pub zombie_follow_probability: f32,
    pub zombie_wander_direction_change_probability: f32,
    pub zombie_kill_probability: f32,
    pub zombie_wound_probability: f32,
    pub zombie_destruction_probability: f32,
    /// Attack odds multiplier when attacker and victim travel the same way.
    pub same_facing_attack_modifier: f32,
    /// Attack odds multiplier when they face each other.
    pub different_facing_attack_modifier: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 200972,
            max_ticks: 10_000,
            init_survivors: 4000,
            init_infected: 0,
            init_zombies: 1,
            survivor_speed: 5.0,
            survivor_panic_speed: 15.0,
            survivor_panic_range: 25.0,
            survivor_panic_duration: 60,
            sees_death_panic_probability: 0.995,
            sees_panicked_or_infected_panic_probability: 0.2,
            survivor_follow_probability: 0.9,
            survivor_wander_direction_change_probability: 0.00001,
            infected_panic_time_multiplier: 4,
            infected_incubation_max_time: 2000,
            zombie_speed: 2.0,
            zombie_hunt_speed: 4.0,
            zombie_hunt_range: 100.0,
            zombie_attack_range: 30.0,
            zombie_raise_delay: 50,
            zombie_raise_chance: 0.99,
            zombie_follow_probability: 0.5,
            zombie_wander_direction_change_probability: 0.00005,
            zombie_kill_probability: 0.5,
            zombie_wound_probability: 0.99,
            zombie_destruction_probability: 0.0025,
            same_facing_attack_modifier: 1.0,
            different_facing_attack_modifier: 3.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("survivor_speed", self.survivor_speed)?;
        positive("survivor_panic_speed", self.survivor_panic_speed)?;
        positive("survivor_panic_range", self.survivor_panic_range)?;
        positive("zombie_speed", self.zombie_speed)?;
        positive("zombie_hunt_speed", self.zombie_hunt_speed)?;
        positive("zombie_hunt_range", self.zombie_hunt_range)?;
        positive("zombie_attack_range", self.zombie_attack_range)?;
        if self.survivor_panic_duration == 0 {
            return Err(ConfigError::Zero { name: "survivor_panic_duration" });
        }
        if self.infected_incubation_max_time == 0 {
            return Err(ConfigError::Zero { name: "infected_incubation_max_time" });
        }
        probability("sees_death_panic_probability", self.sees_death_panic_probability)?;
        probability(
            "sees_panicked_or_infected_panic_probability",
            self.sees_panicked_or_infected_panic_probability,
        )?;
        probability("survivor_follow_probability", self.survivor_follow_probability)?;
        probability(
            "survivor_wander_direction_change_probability",
            self.survivor_wander_direction_change_probability,
        )?;
        probability("zombie_follow_probability", self.zombie_follow_probability)?;
        probability(
            "zombie_wander_direction_change_probability",
            self.zombie_wander_direction_change_probability,
        )?;
        probability("zombie_raise_chance", self.zombie_raise_chance)?;
        probability("zombie_kill_probability", self.zombie_kill_probability)?;
        probability("zombie_wound_probability", self.zombie_wound_probability)?;
        probability("zombie_destruction_probability", self.zombie_destruction_probability)?;
        Ok(())
    }
}
