//! Recycled storage for every object the world has ever created.

use glam::Vec2;
use merge_bubbles_core::{ObjectId, PhysicsBody, Polarity};
use merge_bubbles_softbody::{SoftBody, SoftBodyConfig};

use crate::body::{Body, RigidBody};

/// Representation new pool members are built with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyTemplate {
    /// Rigid circle.
    Rigid,
    /// Spring-linked point ring.
    Soft(SoftBodyConfig),
}

/// Blueprint every pooled object is instantiated from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prefab {
    scale: f32,
    body: BodyTemplate,
    polarity: Option<Polarity>,
    starting_count: usize,
}

impl Prefab {
    /// Creates a rigid, positively polarised prefab of the provided spawn scale.
    #[must_use]
    pub const fn new(scale: f32) -> Self {
        Self {
            scale,
            body: BodyTemplate::Rigid,
            polarity: Some(Polarity::Positive),
            starting_count: 20,
        }
    }

    /// Replaces the body representation.
    #[must_use]
    pub const fn with_body(mut self, body: BodyTemplate) -> Self {
        self.body = body;
        self
    }

    /// Replaces the magnetic polarity; `None` makes objects ignore magnets.
    #[must_use]
    pub const fn with_polarity(mut self, polarity: Option<Polarity>) -> Self {
        self.polarity = polarity;
        self
    }

    /// Replaces the number of inactive members created up front.
    #[must_use]
    pub const fn with_starting_count(mut self, starting_count: usize) -> Self {
        self.starting_count = starting_count;
        self
    }

    /// Uniform scale objects spawn with.
    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    /// Number of inactive members created up front.
    #[must_use]
    pub const fn starting_count(&self) -> usize {
        self.starting_count
    }

    fn instantiate(&self, position: Vec2) -> Body {
        match self.body {
            BodyTemplate::Rigid => Body::Rigid(RigidBody::new(position, self.scale)),
            BodyTemplate::Soft(config) => {
                Body::Soft(Box::new(SoftBody::new(&config, position, self.scale)))
            }
        }
    }
}

impl Default for Prefab {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Single pool member.
#[derive(Clone, Debug)]
pub(crate) struct PooledObject {
    pub(crate) id: ObjectId,
    pub(crate) active: bool,
    pub(crate) body: Body,
    pub(crate) spawn_scale: f32,
    pub(crate) merging: bool,
    pub(crate) merge_count: u32,
    pub(crate) polarity: Option<Polarity>,
}

impl PooledObject {
    /// Returns transient state to the freshly spawned baseline.
    fn reset(&mut self) {
        self.body.set_scale(self.spawn_scale);
        self.body.set_velocity(Vec2::ZERO);
        self.merging = false;
        self.merge_count = 1;
    }

    /// Hides the object and restores its spawn baseline.
    pub(crate) fn release(&mut self) {
        self.reset();
        self.active = false;
    }
}

#[derive(Debug)]
pub(crate) struct ObjectPool {
    objects: Vec<PooledObject>,
    prefab: Prefab,
}

impl ObjectPool {
    /// Creates a pool pre-warmed with the prefab's starting count of inactive members.
    pub(crate) fn new(prefab: Prefab) -> Self {
        let mut pool = Self {
            objects: Vec::with_capacity(prefab.starting_count),
            prefab,
        };
        for _ in 0..prefab.starting_count {
            let _ = pool.instantiate(false);
        }
        pool
    }

    /// Reuses the first inactive member, or grows the pool when every member is busy.
    pub(crate) fn acquire(&mut self, active: bool) -> ObjectId {
        if let Some(object) = self.objects.iter_mut().find(|object| !object.active) {
            object.reset();
            object.active = active;
            return object.id;
        }
        self.instantiate(active)
    }

    fn instantiate(&mut self, active: bool) -> ObjectId {
        let id = ObjectId::new(self.objects.len() as u32);
        self.objects.push(PooledObject {
            id,
            active,
            body: self.prefab.instantiate(Vec2::ZERO),
            spawn_scale: self.prefab.scale,
            merging: false,
            merge_count: 1,
            polarity: self.prefab.polarity,
        });
        id
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<&PooledObject> {
        self.objects.get(id.get() as usize)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut PooledObject> {
        self.objects.get_mut(id.get() as usize)
    }

    /// Looks up an object only while it is in play.
    pub(crate) fn active_mut(&mut self, id: ObjectId) -> Option<&mut PooledObject> {
        self.get_mut(id).filter(|object| object.active)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PooledObject> {
        self.objects.iter()
    }

    pub(crate) fn iter_active(&self) -> impl Iterator<Item = &PooledObject> {
        self.objects.iter().filter(|object| object.active)
    }

    pub(crate) fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut PooledObject> {
        self.objects.iter_mut().filter(|object| object.active)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_prewarms_inactive_members() {
        let pool = ObjectPool::new(Prefab::default().with_starting_count(3));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.iter_active().count(), 0);
    }

    #[test]
    fn acquire_reuses_first_free_member() {
        let mut pool = ObjectPool::new(Prefab::default().with_starting_count(2));
        let first = pool.acquire(true);
        let second = pool.acquire(true);
        assert_eq!(first, ObjectId::new(0));
        assert_eq!(second, ObjectId::new(1));

        pool.get_mut(first).expect("first").release();
        assert_eq!(pool.acquire(true), first);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn acquire_grows_when_exhausted() {
        let mut pool = ObjectPool::new(Prefab::default().with_starting_count(1));
        let _ = pool.acquire(true);
        let grown = pool.acquire(true);
        assert_eq!(grown, ObjectId::new(1));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn acquire_resets_transient_state() {
        let mut pool = ObjectPool::new(Prefab::new(0.5).with_starting_count(1));
        let id = pool.acquire(true);
        {
            let object = pool.get_mut(id).expect("object");
            object.body.set_scale(3.0);
            object.body.set_velocity(Vec2::new(1.0, 1.0));
            object.merging = true;
            object.merge_count = 4;
            object.active = false;
        }

        let reused = pool.acquire(false);
        let object = pool.get(reused).expect("object");
        assert_eq!(reused, id);
        assert!(!object.active);
        assert!(!object.merging);
        assert_eq!(object.merge_count, 1);
        assert_eq!(object.body.scale(), 0.5);
        assert_eq!(object.body.velocity(), Vec2::ZERO);
    }
}
