#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting bubble spawn commands.
//!
//! The cadence starts at one spawn every `base_interval` and accelerates each
//! time the largest-object tracker announces a new record, never dropping
//! below the configured floor.

use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Aabb, Command, Event, PlayMode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    base_interval: Duration,
    min_interval: Duration,
    divisor_increment: f32,
    scan_radius: f32,
    max_attempts: u32,
    edge_inset: f32,
    starting_count: usize,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided cadence and seed with default sampling.
    #[must_use]
    pub const fn new(base_interval: Duration, rng_seed: u64) -> Self {
        Self {
            base_interval,
            min_interval: Duration::from_millis(500),
            divisor_increment: 0.1,
            scan_radius: 1.0,
            max_attempts: 50,
            edge_inset: 0.5,
            starting_count: 2,
            rng_seed,
        }
    }

    /// Replaces the shortest interval the cadence may accelerate to.
    #[must_use]
    pub const fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Replaces the divisor growth applied on every new largest object.
    #[must_use]
    pub const fn with_divisor_increment(mut self, divisor_increment: f32) -> Self {
        self.divisor_increment = divisor_increment;
        self
    }

    /// Replaces the radius probed for existing objects around a candidate point.
    #[must_use]
    pub const fn with_scan_radius(mut self, scan_radius: f32) -> Self {
        self.scan_radius = scan_radius;
        self
    }

    /// Replaces the number of samples drawn before accepting an occupied point.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replaces the number of objects spawned when the arena is configured.
    #[must_use]
    pub const fn with_starting_count(mut self, starting_count: usize) -> Self {
        self.starting_count = starting_count;
        self
    }

    /// Cadence used before any new largest object was announced.
    #[must_use]
    pub const fn base_interval(&self) -> Duration {
        self.base_interval
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 0x6d65_7267_655f_6275)
    }
}

/// Pure system that deterministically emits spawn commands while playing.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    scale_divisor: f32,
    since_lap: Duration,
    area: Option<Aabb>,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scale_divisor: 1.0,
            since_lap: Duration::ZERO,
            area: None,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Current interval between spawns.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        let scaled = self.config.base_interval.as_secs_f32() / self.scale_divisor.max(f32::EPSILON);
        Duration::from_secs_f32(scaled.max(0.0)).max(self.config.min_interval)
    }

    /// Consumes events and an occupancy probe to emit spawn commands.
    ///
    /// `is_occupied(center, radius)` must report whether any object in play
    /// overlaps the circle.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        play_mode: PlayMode,
        is_occupied: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(Vec2, f32) -> bool,
    {
        let mut pending = 0;
        for event in events {
            match event {
                Event::ArenaConfigured { bounds } => {
                    let first_arena = self.area.is_none();
                    self.area = Some(*bounds);
                    if first_arena {
                        pending += self.config.starting_count;
                    }
                }
                Event::NewLargestObject { .. } => {
                    self.scale_divisor += self.config.divisor_increment;
                    log::debug!(
                        "spawn interval shortened to {:?}",
                        self.spawn_interval()
                    );
                }
                Event::TimeAdvanced { dt } if play_mode == PlayMode::Playing => {
                    self.since_lap = self.since_lap.saturating_add(*dt);
                    if self.since_lap >= self.spawn_interval() {
                        self.since_lap = Duration::ZERO;
                        pending += 1;
                    }
                }
                _ => {}
            }
        }

        if play_mode != PlayMode::Playing || pending == 0 {
            return;
        }
        let Some(area) = self.area else {
            return;
        };

        let mut placed: Vec<Vec2> = Vec::with_capacity(pending);
        for _ in 0..pending {
            let clearance = self.config.scan_radius * 2.0;
            let position = self.sample_spawn_point(area, |point, radius| {
                is_occupied(point, radius)
                    || placed.iter().any(|other| other.distance(point) <= clearance)
            });
            placed.push(position);
            out.push(Command::SpawnObject { position });
        }
    }

    /// Draws a point inside `area` (inset from the edges) that no object overlaps.
    ///
    /// After the configured number of attempts the last sample is returned
    /// even if it is occupied.
    pub fn sample_spawn_point<F>(&mut self, area: Aabb, is_occupied: F) -> Vec2
    where
        F: Fn(Vec2, f32) -> bool,
    {
        let region = area.inset(self.config.edge_inset);
        let mut candidate = region.center();
        for attempt in 0..self.config.max_attempts.max(1) {
            candidate = Vec2::new(
                self.rng.gen_range(region.min().x..=region.max().x),
                self.rng.gen_range(region.min().y..=region.max().y),
            );
            if !is_occupied(candidate, self.config.scan_radius) {
                return candidate;
            }
            if attempt + 1 == self.config.max_attempts {
                log::debug!("no free spawn point after {} attempts", attempt + 1);
            }
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_never_drops_below_floor() {
        let mut spawning = Spawning::new(Config::default());
        spawning.scale_divisor = 100.0;
        assert_eq!(spawning.spawn_interval(), Duration::from_millis(500));
    }

    #[test]
    fn interval_shrinks_with_divisor() {
        let mut spawning = Spawning::new(Config::default());
        assert_eq!(spawning.spawn_interval(), Duration::from_secs(2));
        spawning.scale_divisor = 2.0;
        assert_eq!(spawning.spawn_interval(), Duration::from_secs(1));
    }

    #[test]
    fn degenerate_area_collapses_to_center() {
        let mut spawning = Spawning::new(Config::default());
        let area = Aabb::from_center(Vec2::new(2.0, 3.0), Vec2::splat(0.25));
        let point = spawning.sample_spawn_point(area, |_, _| false);
        assert_eq!(point, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn fully_occupied_area_accepts_last_sample() {
        let mut spawning = Spawning::new(Config::default().with_max_attempts(3));
        let area = Aabb::from_center(Vec2::ZERO, Vec2::splat(4.0));
        let point = spawning.sample_spawn_point(area, |_, _| true);
        assert!(area.inset(0.5).contains(point));
    }
}
