//! Point masses and the damped springs that bind them.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::SpringTuning;

/// Single integrated point of a soft body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PointMass {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) mass: f32,
    /// Continuous force accumulated until the next step.
    pub(crate) force: Vec2,
}

impl PointMass {
    pub(crate) fn at(position: Vec2, mass: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            mass,
            force: Vec2::ZERO,
        }
    }

    pub(crate) fn integrate(&mut self, dt: f32) {
        self.velocity += self.force / self.mass * dt;
        self.position += self.velocity * dt;
        self.force = Vec2::ZERO;
    }
}

/// Damped spring between two points of the same body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Spring {
    pub(crate) a: usize,
    pub(crate) b: usize,
    /// Rest length expressed as a multiple of the body radius.
    pub(crate) rest_ratio: f32,
    pub(crate) tuning: SpringTuning,
}

impl Spring {
    /// Force the spring exerts on point `a`; point `b` receives the negation.
    pub(crate) fn force(&self, points: &[PointMass], radius: f32) -> Vec2 {
        let (Some(a), Some(b)) = (points.get(self.a), points.get(self.b)) else {
            return Vec2::ZERO;
        };
        let delta = b.position - a.position;
        let length = delta.length();
        if length <= f32::EPSILON {
            return Vec2::ZERO;
        }
        let direction = delta / length;

        let mass = reduced_mass(a.mass, b.mass);
        let omega = TAU * self.tuning.frequency();
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * self.tuning.damping_ratio() * omega;

        let stretch = length - self.rest_ratio * radius;
        let closing = (b.velocity - a.velocity).dot(direction);
        direction * (stiffness * stretch + damping * closing)
    }
}

fn reduced_mass(a: f32, b: f32) -> f32 {
    let total = a + b;
    if total <= 0.0 {
        0.0
    } else {
        a * b / total
    }
}

/// Offsets of `count` points spread evenly on a circle, starting on the +x axis.
pub(crate) fn ring_layout(count: usize, radius: f32) -> impl Iterator<Item = Vec2> {
    (0..count).map(move |index| {
        let angle = TAU * index as f32 / count as f32;
        Vec2::new(angle.cos(), angle.sin()) * radius
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(distance: f32) -> Vec<PointMass> {
        vec![
            PointMass::at(Vec2::ZERO, 1.0),
            PointMass::at(Vec2::new(distance, 0.0), 1.0),
        ]
    }

    fn spring(rest_ratio: f32) -> Spring {
        Spring {
            a: 0,
            b: 1,
            rest_ratio,
            tuning: SpringTuning::new(2.0, 0.0),
        }
    }

    #[test]
    fn stretched_spring_pulls_points_together() {
        let force = spring(1.0).force(&pair(2.0), 1.0);
        assert!(force.x > 0.0);
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn compressed_spring_pushes_points_apart() {
        let force = spring(1.0).force(&pair(0.5), 1.0);
        assert!(force.x < 0.0);
    }

    #[test]
    fn spring_at_rest_is_silent() {
        let force = spring(0.8).force(&pair(0.8), 1.0);
        assert!(force.length() < 1e-6);
    }

    #[test]
    fn coincident_points_produce_no_force() {
        let force = spring(1.0).force(&pair(0.0), 1.0);
        assert_eq!(force, Vec2::ZERO);
    }

    #[test]
    fn stiffness_follows_reduced_mass_and_frequency() {
        let force = spring(1.0).force(&pair(2.0), 1.0);
        let omega = TAU * 2.0;
        let expected = 0.5 * omega * omega;
        assert!((force.x - expected).abs() < 1e-3);
    }

    #[test]
    fn ring_layout_spaces_points_on_circle() {
        let offsets: Vec<Vec2> = ring_layout(4, 2.0).collect();
        assert_eq!(offsets.len(), 4);
        for offset in &offsets {
            assert!((offset.length() - 2.0).abs() < 1e-5);
        }
        assert!((offsets[1] - Vec2::new(0.0, 2.0)).length() < 1e-5);
    }
}
