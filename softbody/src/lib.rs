#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deformable bubble body built from a ring of spring-linked point masses.
//!
//! A [`SoftBody`] owns one centre point and a ring of points laid out on the
//! body's radius. Ring neighbours, the centre and (optionally) every
//! non-adjacent ring pair are joined by damped springs whose stiffness derives
//! from a frequency and damping ratio. The body implements
//! [`PhysicsBody`] so the rest of the simulation can treat it exactly like a
//! rigid circle.

mod mesh;
mod spring;

use glam::Vec2;
use merge_bubbles_core::{Aabb, ForceMode, PhysicsBody};
use thiserror::Error;

pub use mesh::SoftBodyMesh;
use spring::{ring_layout, PointMass, Spring};

/// Fewest ring points a soft body may use.
pub const MIN_POINT_COUNT: usize = 3;
/// Most ring points a soft body may use.
pub const MAX_POINT_COUNT: usize = 20;
/// Ring points used when no count is configured.
pub const DEFAULT_POINT_COUNT: usize = 10;

const CENTER: usize = 0;

/// Errors raised while validating soft-body tuning.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Ring point count outside the supported range.
    #[error("soft body needs between {min} and {max} ring points, got {requested}")]
    PointCount {
        /// Requested ring point count.
        requested: usize,
        /// Smallest supported count.
        min: usize,
        /// Largest supported count.
        max: usize,
    },
    /// Point mass that is zero, negative or not finite.
    #[error("soft body point mass must be positive and finite, got {0}")]
    PointMass(f32),
}

/// Frequency and damping ratio describing one family of springs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringTuning {
    frequency: f32,
    damping_ratio: f32,
}

impl SpringTuning {
    /// Creates a tuning oscillating at `frequency` hertz with the given damping ratio.
    #[must_use]
    pub const fn new(frequency: f32, damping_ratio: f32) -> Self {
        Self {
            frequency,
            damping_ratio,
        }
    }

    /// Oscillation frequency in hertz.
    #[must_use]
    pub const fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Ratio of damping to critical damping.
    #[must_use]
    pub const fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }
}

/// Validated construction parameters for soft bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftBodyConfig {
    point_count: usize,
    point_mass: f32,
    center_mass: f32,
    ring_rest_factor: f32,
    center_rest_factor: f32,
    ring: SpringTuning,
    center: SpringTuning,
    diagonal: Option<SpringTuning>,
}

impl SoftBodyConfig {
    /// Creates a configuration with `point_count` ring points and default spring tuning.
    pub fn new(point_count: usize) -> Result<Self, ConfigError> {
        if !(MIN_POINT_COUNT..=MAX_POINT_COUNT).contains(&point_count) {
            return Err(ConfigError::PointCount {
                requested: point_count,
                min: MIN_POINT_COUNT,
                max: MAX_POINT_COUNT,
            });
        }

        Ok(Self {
            point_count,
            point_mass: 1.0,
            center_mass: 1.0,
            ring_rest_factor: 0.8,
            center_rest_factor: 0.9,
            ring: SpringTuning::new(2.0, 0.2),
            center: SpringTuning::new(2.5, 0.6),
            diagonal: Some(SpringTuning::new(2.0, 0.3)),
        })
    }

    /// Overrides the mass of every ring point and of the centre point.
    pub fn with_point_mass(mut self, mass: f32) -> Result<Self, ConfigError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(ConfigError::PointMass(mass));
        }
        self.point_mass = mass;
        self.center_mass = mass;
        Ok(self)
    }

    /// Enables or disables the diagonal cross springs.
    #[must_use]
    pub fn with_diagonals(mut self, enabled: bool) -> Self {
        self.diagonal = enabled.then_some(SpringTuning::new(2.0, 0.3));
        self
    }

    /// Number of points on the ring.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.point_count
    }

    /// Mass of each ring point.
    #[must_use]
    pub const fn point_mass(&self) -> f32 {
        self.point_mass
    }

    /// Reports whether diagonal cross springs are generated.
    #[must_use]
    pub const fn has_diagonals(&self) -> bool {
        self.diagonal.is_some()
    }
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        Self {
            point_count: DEFAULT_POINT_COUNT,
            point_mass: 1.0,
            center_mass: 1.0,
            ring_rest_factor: 0.8,
            center_rest_factor: 0.9,
            ring: SpringTuning::new(2.0, 0.2),
            center: SpringTuning::new(2.5, 0.6),
            diagonal: Some(SpringTuning::new(2.0, 0.3)),
        }
    }
}

/// Number of springs of each family attached to a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpringCounts {
    /// Springs joining ring neighbours.
    pub ring: usize,
    /// Springs joining the centre to each ring point.
    pub center: usize,
    /// Springs joining non-adjacent ring points.
    pub diagonal: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpringFamily {
    Ring,
    Center,
    Diagonal,
}

/// Deformable circular body.
#[derive(Clone, Debug)]
pub struct SoftBody {
    points: Vec<PointMass>,
    springs: Vec<(SpringFamily, Spring)>,
    radius: f32,
    mesh: SoftBodyMesh,
}

impl SoftBody {
    /// Builds a body whose ring of diameter `scale` is centred on `center`.
    #[must_use]
    pub fn new(config: &SoftBodyConfig, center: Vec2, scale: f32) -> Self {
        let count = config.point_count;
        let radius = scale.max(0.0) / 2.0;

        let mut points = Vec::with_capacity(count + 1);
        points.push(PointMass::at(center, config.center_mass));
        points.extend(
            ring_layout(count, radius).map(|offset| PointMass::at(center + offset, config.point_mass)),
        );

        let mut springs = Vec::new();
        for index in 0..count {
            let current = index + 1;
            let next = (index + 1) % count + 1;
            springs.push((
                SpringFamily::Ring,
                Spring {
                    a: current,
                    b: next,
                    rest_ratio: config.ring_rest_factor,
                    tuning: config.ring,
                },
            ));
            springs.push((
                SpringFamily::Center,
                Spring {
                    a: CENTER,
                    b: current,
                    rest_ratio: config.center_rest_factor,
                    tuning: config.center,
                },
            ));
        }

        if let Some(tuning) = config.diagonal {
            let unit: Vec<Vec2> = ring_layout(count, 1.0).collect();
            for first in 0..count {
                for second in (first + 2)..count {
                    if first == 0 && second == count - 1 {
                        continue;
                    }
                    springs.push((
                        SpringFamily::Diagonal,
                        Spring {
                            a: first + 1,
                            b: second + 1,
                            rest_ratio: unit[first].distance(unit[second]),
                            tuning,
                        },
                    ));
                }
            }
        }

        let mut body = Self {
            points,
            springs,
            radius,
            mesh: SoftBodyMesh::new(count, center),
        };
        body.refresh_mesh();
        body
    }

    /// Current render mesh and collider outline.
    #[must_use]
    pub fn mesh(&self) -> &SoftBodyMesh {
        &self.mesh
    }

    /// Shifts every point's velocity by `delta`, keeping relative motion intact.
    pub fn add_velocity(&mut self, delta: Vec2) {
        for point in &mut self.points {
            point.velocity += delta;
        }
    }

    /// Number of ring points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len() - 1
    }

    /// World-space positions of the ring points.
    pub fn ring_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.ring().iter().map(|point| point.position)
    }

    /// Rest length of every spring, in construction order, at the current radius.
    #[must_use]
    pub fn rest_lengths(&self) -> Vec<f32> {
        self.springs
            .iter()
            .map(|(_, spring)| spring.rest_ratio * self.radius)
            .collect()
    }

    /// Number of springs per family.
    #[must_use]
    pub fn spring_counts(&self) -> SpringCounts {
        let mut counts = SpringCounts::default();
        for (family, _) in &self.springs {
            match family {
                SpringFamily::Ring => counts.ring += 1,
                SpringFamily::Center => counts.center += 1,
                SpringFamily::Diagonal => counts.diagonal += 1,
            }
        }
        counts
    }

    fn ring(&self) -> &[PointMass] {
        &self.points[1..]
    }

    fn center_point(&self) -> &PointMass {
        &self.points[CENTER]
    }

    fn refresh_mesh(&mut self) {
        let origin = self.points[CENTER].position;
        self.mesh
            .refresh(origin, self.points[1..].iter().map(|point| point.position));
    }

    fn ring_mass(&self) -> f32 {
        self.ring().iter().map(|point| point.mass).sum()
    }
}

impl PhysicsBody for SoftBody {
    fn position(&self) -> Vec2 {
        self.center_point().position
    }

    fn center_of_mass(&self) -> Vec2 {
        let total = self.ring_mass();
        if total <= 0.0 {
            return self.position();
        }
        self.ring()
            .iter()
            .map(|point| point.position * point.mass)
            .sum::<Vec2>()
            / total
    }

    fn velocity(&self) -> Vec2 {
        let total = self.ring_mass();
        if total <= 0.0 {
            return self.center_point().velocity;
        }
        self.ring()
            .iter()
            .map(|point| point.velocity * point.mass)
            .sum::<Vec2>()
            / total
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        for point in &mut self.points {
            point.velocity = velocity;
        }
    }

    fn add_force(&mut self, force: Vec2, mode: ForceMode) {
        for point in &mut self.points {
            match mode {
                ForceMode::Force => point.force += force,
                ForceMode::Impulse => point.velocity += force / point.mass,
            }
        }
    }

    fn move_position(&mut self, position: Vec2) {
        let offset = position - self.points[CENTER].position;
        for point in &mut self.points {
            point.position += offset;
        }
        self.refresh_mesh();
    }

    fn scale(&self) -> f32 {
        self.radius * 2.0
    }

    fn set_scale(&mut self, scale: f32) {
        let radius = scale.max(0.0) / 2.0;
        let center = self.points[CENTER].position;

        if self.radius <= f32::EPSILON {
            let count = self.point_count();
            for (point, offset) in self.points[1..].iter_mut().zip(ring_layout(count, radius)) {
                point.position = center + offset;
            }
        } else {
            let ratio = radius / self.radius;
            for point in &mut self.points[1..] {
                point.position = center + (point.position - center) * ratio;
            }
        }

        self.radius = radius;
        self.refresh_mesh();
    }

    fn bounds(&self) -> Aabb {
        self.mesh.bounds()
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        for (_, spring) in &self.springs {
            let force = spring.force(&self.points, self.radius);
            self.points[spring.a].force += force;
            self.points[spring.b].force -= force;
        }

        for point in &mut self.points {
            point.integrate(dt);
        }

        self.refresh_mesh();
    }
}
