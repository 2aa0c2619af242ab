//! Scripted stand-in for the player's pointer.

use glam::Vec2;
use merge_bubbles_core::Camera;

/// Share of the smaller half-extent the magnet orbits at.
const ORBIT_SHARE: f32 = 0.6;

/// Steers the player magnet around a circle centred on the camera.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OrbitPilot {
    center: Vec2,
    radius: f32,
    angular_speed: f32,
}

impl OrbitPilot {
    pub(crate) fn new(camera: &Camera, angular_speed: f32) -> Self {
        Self {
            center: camera.center,
            radius: camera.half_height.min(camera.half_width()) * ORBIT_SHARE,
            angular_speed,
        }
    }

    /// Magnet position `elapsed` seconds into the run.
    pub(crate) fn position(&self, elapsed: f32) -> Vec2 {
        let angle = elapsed * self.angular_speed;
        self.center + Vec2::from_angle(angle) * self.radius
    }
}
