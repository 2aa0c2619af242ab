//! Concrete bodies backing pooled objects.

use glam::Vec2;
use merge_bubbles_core::{Aabb, BodyKind, ForceMode, PhysicsBody};
use merge_bubbles_softbody::SoftBody;

const MIN_MASS: f32 = 1e-4;

/// Rigid circle integrated as a single point.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RigidBody {
    position: Vec2,
    velocity: Vec2,
    scale: f32,
    force: Vec2,
}

impl RigidBody {
    pub(crate) fn new(position: Vec2, scale: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            scale,
            force: Vec2::ZERO,
        }
    }

    fn mass(&self) -> f32 {
        (self.scale * self.scale).max(MIN_MASS)
    }
}

impl PhysicsBody for RigidBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn center_of_mass(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn add_force(&mut self, force: Vec2, mode: ForceMode) {
        match mode {
            ForceMode::Force => self.force += force,
            ForceMode::Impulse => self.velocity += force / self.mass(),
        }
    }

    fn move_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale.max(0.0);
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, Vec2::splat(self.scale / 2.0))
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.velocity += self.force / self.mass() * dt;
        self.position += self.velocity * dt;
        self.force = Vec2::ZERO;
    }
}

/// Body variants a pooled object may carry.
#[derive(Clone, Debug)]
pub(crate) enum Body {
    Rigid(RigidBody),
    Soft(Box<SoftBody>),
}

impl Body {
    pub(crate) fn kind(&self) -> BodyKind {
        match self {
            Self::Rigid(_) => BodyKind::Rigid,
            Self::Soft(_) => BodyKind::Soft,
        }
    }

    fn inner(&self) -> &dyn PhysicsBody {
        match self {
            Self::Rigid(body) => body,
            Self::Soft(body) => &**body,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PhysicsBody {
        match self {
            Self::Rigid(body) => body,
            Self::Soft(body) => &mut **body,
        }
    }

    /// Drives the body toward `velocity` without flattening soft-body wobble.
    pub(crate) fn steer_velocity(&mut self, velocity: Vec2) {
        match self {
            Self::Rigid(body) => body.set_velocity(velocity),
            Self::Soft(body) => {
                let delta = velocity - body.velocity();
                body.add_velocity(delta);
            }
        }
    }
}

impl PhysicsBody for Body {
    fn position(&self) -> Vec2 {
        self.inner().position()
    }

    fn center_of_mass(&self) -> Vec2 {
        self.inner().center_of_mass()
    }

    fn velocity(&self) -> Vec2 {
        self.inner().velocity()
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.inner_mut().set_velocity(velocity);
    }

    fn add_force(&mut self, force: Vec2, mode: ForceMode) {
        self.inner_mut().add_force(force, mode);
    }

    fn move_position(&mut self, position: Vec2) {
        self.inner_mut().move_position(position);
    }

    fn scale(&self) -> f32 {
        self.inner().scale()
    }

    fn set_scale(&mut self, scale: f32) {
        self.inner_mut().set_scale(scale);
    }

    fn bounds(&self) -> Aabb {
        self.inner().bounds()
    }

    fn step(&mut self, dt: f32) {
        self.inner_mut().step(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_bubbles_softbody::SoftBodyConfig;

    #[test]
    fn impulse_scales_with_inverse_mass() {
        let mut body = RigidBody::new(Vec2::ZERO, 2.0);
        body.add_force(Vec2::new(4.0, 0.0), ForceMode::Impulse);
        assert_eq!(body.velocity(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn rigid_step_integrates_velocity() {
        let mut body = RigidBody::new(Vec2::ZERO, 1.0);
        body.set_velocity(Vec2::new(2.0, -1.0));
        body.step(0.5);
        assert_eq!(body.position(), Vec2::new(1.0, -0.5));
    }

    #[test]
    fn steering_soft_body_shifts_average_velocity() {
        let mut body = Body::Soft(Box::new(SoftBody::new(
            &SoftBodyConfig::default(),
            Vec2::ZERO,
            1.0,
        )));
        body.steer_velocity(Vec2::new(0.0, 3.0));
        assert!((body.velocity() - Vec2::new(0.0, 3.0)).length() < 1e-5);
        assert_eq!(body.kind(), BodyKind::Soft);
    }
}
