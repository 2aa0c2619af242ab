//! Render mesh and collider outline rebuilt from the point ring.

use glam::Vec2;
use merge_bubbles_core::Aabb;

/// Triangulated outline of a soft body.
///
/// Vertices are stored relative to the body's centre point while the collider
/// path and bounds are expressed in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftBodyMesh {
    vertices: Vec<Vec2>,
    triangles: Vec<[usize; 3]>,
    collider_path: Vec<Vec2>,
    bounds: Aabb,
}

impl SoftBodyMesh {
    pub(crate) fn new(ring_len: usize, origin: Vec2) -> Self {
        Self {
            vertices: Vec::with_capacity(ring_len),
            triangles: fan_triangles(ring_len),
            collider_path: Vec::with_capacity(ring_len),
            bounds: Aabb::from_center(origin, Vec2::ZERO),
        }
    }

    /// Rebuilds vertices, collider path and bounds from the ring's world positions.
    pub(crate) fn refresh<I>(&mut self, origin: Vec2, ring: I)
    where
        I: IntoIterator<Item = Vec2>,
    {
        self.collider_path.clear();
        self.collider_path.extend(ring);
        self.vertices.clear();
        self.vertices
            .extend(self.collider_path.iter().map(|point| *point - origin));
        self.bounds = Aabb::enclosing(&self.collider_path)
            .unwrap_or_else(|| Aabb::from_center(origin, Vec2::ZERO));
    }

    /// Ring vertices relative to the centre point.
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Triangle fan anchored on vertex zero.
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Closed collider outline in world space.
    #[must_use]
    pub fn collider_path(&self) -> &[Vec2] {
        &self.collider_path
    }

    /// World-space bounds of the outline.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

fn fan_triangles(ring_len: usize) -> Vec<[usize; 3]> {
    (0..ring_len.saturating_sub(2))
        .map(|index| [0, index + 1, index + 2])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_covers_ring_with_n_minus_two_triangles() {
        let triangles = fan_triangles(5);
        assert_eq!(triangles, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    }

    #[test]
    fn refresh_keeps_vertices_relative_to_origin() {
        let origin = Vec2::new(3.0, 1.0);
        let ring = [
            Vec2::new(4.0, 1.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(2.0, 1.0),
        ];
        let mut mesh = SoftBodyMesh::new(ring.len(), origin);
        mesh.refresh(origin, ring);

        assert_eq!(mesh.vertices()[0], Vec2::new(1.0, 0.0));
        assert_eq!(mesh.collider_path(), &ring);
        assert_eq!(mesh.bounds().min(), Vec2::new(2.0, 1.0));
        assert_eq!(mesh.bounds().max(), Vec2::new(4.0, 2.0));
    }
}
