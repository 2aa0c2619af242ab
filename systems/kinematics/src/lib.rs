#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collision and drag approximations for script-driven bubbles.
//!
//! Bubbles are moved kinematically, so nothing stops them at the arena walls
//! and nothing slows them down. After every physics step this system bounces
//! each bubble off any wall its bounds overlap and bleeds off velocity with a
//! quadratic drag, emitting the adjusted state as commands.

use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Aabb, Command, Event, ObjectSnapshot, ObjectView, PlayMode};

const MIN_MASS: f32 = 1e-4;

/// Configuration parameters required to construct the kinematics system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    drag_coefficient: f32,
    velocity_multiplier: f32,
    apply_mass: bool,
    nudge: f32,
    rest_speed: f32,
}

impl Config {
    /// Creates a configuration with the provided drag coefficient and per-step velocity multiplier.
    #[must_use]
    pub const fn new(drag_coefficient: f32, velocity_multiplier: f32) -> Self {
        Self {
            drag_coefficient,
            velocity_multiplier,
            apply_mass: true,
            nudge: 0.02,
            rest_speed: 0.001,
        }
    }

    /// Chooses whether drag is scaled by a mass derived from the bubble's scale.
    #[must_use]
    pub const fn with_apply_mass(mut self, apply_mass: bool) -> Self {
        self.apply_mass = apply_mass;
        self
    }

    /// Replaces the distance a bubble is pushed out of a wall on contact.
    #[must_use]
    pub const fn with_nudge(mut self, nudge: f32) -> Self {
        self.nudge = nudge;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Axis-aligned normal pointing from `obstacle` back toward `body`.
///
/// The overlap centre is the body's centre clamped into the obstacle; the axis
/// with the smaller offset between the two decides the normal.
#[must_use]
pub fn collision_normal(body: &Aabb, obstacle: &Aabb) -> Vec2 {
    let center = body.center();
    let overlap = obstacle.clamp(center);
    if (overlap.x - center.x).abs() < (overlap.y - center.y).abs() {
        if overlap.y > center.y {
            Vec2::NEG_Y
        } else {
            Vec2::Y
        }
    } else if overlap.x > center.x {
        Vec2::NEG_X
    } else {
        Vec2::X
    }
}

/// Reflects `velocity` about a unit `normal`.
#[must_use]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounces a body off every obstacle its bounds intersect.
///
/// Each hit nudges the position along the normal; velocity is only reflected
/// while the body still moves into the obstacle. Returns the adjusted
/// position and velocity.
#[must_use]
pub fn resolve_collisions(
    bounds: Aabb,
    position: Vec2,
    velocity: Vec2,
    obstacles: &[Aabb],
    nudge: f32,
) -> (Vec2, Vec2) {
    let mut offset = Vec2::ZERO;
    let mut velocity = velocity;
    for obstacle in obstacles {
        let moved = Aabb::from_corners(bounds.min() + offset, bounds.max() + offset);
        if !moved.intersects(obstacle) {
            continue;
        }
        let normal = collision_normal(&moved, obstacle);
        offset += normal * nudge;
        if velocity.dot(normal) < 0.0 {
            velocity = reflect(velocity, normal);
        }
    }
    (position + offset, velocity)
}

/// Applies quadratic drag over `dt` seconds and settles tiny velocities to rest.
///
/// Drag never reverses the direction of travel; a step that would overshoot
/// stops the body instead.
#[must_use]
pub fn apply_drag(velocity: Vec2, scale: f32, dt: f32, config: &Config) -> Vec2 {
    let mut velocity = velocity;
    let speed = velocity.length();
    if speed > 0.0 {
        let mass = if config.apply_mass {
            (scale * scale).max(MIN_MASS)
        } else {
            1.0
        };
        let force = -config.drag_coefficient * mass * (velocity / speed) * speed * speed;
        let change = force * dt / mass;
        velocity = if change.length() >= speed {
            Vec2::ZERO
        } else {
            velocity + change
        };
    }

    if velocity.length() < config.rest_speed {
        Vec2::ZERO
    } else {
        velocity * config.velocity_multiplier
    }
}

/// Pure system that emits collision and drag adjustments after each physics step.
#[derive(Debug)]
pub struct Kinematics {
    config: Config,
}

impl Kinematics {
    /// Creates a new kinematics system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Consumes events, objects and wall obstacles to emit kinematic adjustments.
    pub fn handle(
        &mut self,
        events: &[Event],
        play_mode: PlayMode,
        objects: &ObjectView,
        walls: &[Aabb],
        out: &mut Vec<Command>,
    ) {
        if play_mode != PlayMode::Playing {
            return;
        }

        let mut elapsed = Duration::ZERO;
        for event in events {
            if let Event::PhysicsStepped { dt } = event {
                elapsed = elapsed.saturating_add(*dt);
            }
        }
        if elapsed.is_zero() {
            return;
        }

        let dt = elapsed.as_secs_f32();
        for snapshot in objects.iter() {
            if let Some(command) = self.adjust(snapshot, walls, dt) {
                out.push(command);
            }
        }
    }

    fn adjust(&self, snapshot: &ObjectSnapshot, walls: &[Aabb], dt: f32) -> Option<Command> {
        let (position, velocity) = resolve_collisions(
            snapshot.bounds,
            snapshot.position,
            snapshot.velocity,
            walls,
            self.config.nudge,
        );
        let velocity = apply_drag(velocity, snapshot.scale, dt, &self.config);

        if position == snapshot.position && velocity == snapshot.velocity {
            return None;
        }
        Some(Command::ApplyKinematics {
            object: snapshot.id,
            position,
            velocity,
        })
    }
}
