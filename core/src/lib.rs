#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Merge Bubbles simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots such as [`ObjectView`], and respond exclusively with new command
//! batches.

use std::{f32::consts::PI, time::Duration};

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Merge Bubbles.";

/// Describes the active gameplay mode for the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// Normal play: bubbles spawn, drift, and merge.
    Playing,
    /// Simulation clock is frozen; ticks are ignored.
    Paused,
    /// The win condition fired; gameplay systems are frozen and bubbles float away.
    Won,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the arena camera. The playable area and boundary walls derive from it.
    ConfigureArena {
        /// Orthographic camera framing the arena.
        camera: Camera,
    },
    /// Advances the frame clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Advances the fixed-rate physics clock by the provided delta time.
    FixedTick {
        /// Duration of the physics step.
        dt: Duration,
    },
    /// Requests that the world transition to the provided play mode.
    SetPlayMode {
        /// Mode the world should activate.
        mode: PlayMode,
    },
    /// Requests that a pooled object be activated at the provided position.
    SpawnObject {
        /// World-space position the object should occupy.
        position: Vec2,
    },
    /// Marks every member of a freshly formed merge group as merging.
    BeginMerge {
        /// Member that will remain active and grow.
        survivor: ObjectId,
        /// Every member of the group, survivor included.
        members: Vec<ObjectId>,
    },
    /// Applies one interpolated frame of a running merge animation to an object.
    AnimateMerge {
        /// Object being animated.
        object: ObjectId,
        /// Interpolated uniform scale.
        scale: f32,
        /// Interpolated position, if the animation moves the object.
        position: Option<Vec2>,
    },
    /// Finalises a merge: the survivor grows and absorbed members return to the pool.
    CompleteMerge {
        /// Member that remains active.
        survivor: ObjectId,
        /// Members folded into the survivor.
        absorbed: Vec<ObjectId>,
        /// Exact scale the survivor should end with.
        scale: f32,
        /// Final survivor position when the group consolidates onto a new point.
        position: Option<Vec2>,
        /// Velocity the survivor carried before the merge started.
        velocity: Vec2,
    },
    /// Returns the last live member of a group that lost its partners to idle.
    AbandonMerge {
        /// Member leaving the group.
        object: ObjectId,
        /// Scale the member is restored to.
        scale: f32,
    },
    /// Overwrites an object's position and velocity with kinematic approximator output.
    ApplyKinematics {
        /// Object being adjusted.
        object: ObjectId,
        /// Adjusted position.
        position: Vec2,
        /// Adjusted velocity.
        velocity: Vec2,
    },
    /// Applies an instantaneous impulse to an object's body.
    ApplyImpulse {
        /// Object receiving the impulse.
        object: ObjectId,
        /// Impulse vector.
        impulse: Vec2,
    },
    /// Places a magnet into the arena.
    PlaceMagnet {
        /// World-space magnet position.
        position: Vec2,
        /// Radius of the magnet's trigger circle.
        radius: f32,
        /// Impulse magnitude applied per physics step to caught objects.
        strength: f32,
        /// Polarity of the magnet.
        polarity: Polarity,
    },
    /// Moves an existing magnet.
    MoveMagnet {
        /// Magnet to reposition.
        magnet: MagnetId,
        /// New world-space position.
        position: Vec2,
    },
    /// Declares that the win condition has been reached.
    DeclareWin,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms the arena camera was configured.
    ArenaConfigured {
        /// Visible world-space rectangle of the camera.
        bounds: Aabb,
    },
    /// Indicates that the frame clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the frame.
        dt: Duration,
    },
    /// Indicates that bodies were integrated over one physics step.
    PhysicsStepped {
        /// Duration of the physics step.
        dt: Duration,
    },
    /// Announces that the simulation entered a new play mode.
    PlayModeChanged {
        /// Mode that became active after processing commands.
        mode: PlayMode,
    },
    /// Confirms that a pooled object was placed into play.
    ObjectSpawned {
        /// Identifier of the activated object.
        object: ObjectId,
        /// Position the object occupies.
        position: Vec2,
    },
    /// Reports that an object left play without merging.
    ObjectDeactivated {
        /// Identifier of the deactivated object.
        object: ObjectId,
    },
    /// Reports that two active objects started touching.
    ContactBegan {
        /// Object that owns the contact (lower identifier of the pair).
        initiator: ObjectId,
        /// Other object in contact.
        other: ObjectId,
        /// World-space contact points.
        contacts: Vec<Vec2>,
    },
    /// Confirms that a merge group formed and its members are merging.
    MergeStarted {
        /// Member that will remain active.
        survivor: ObjectId,
        /// Every member of the group, survivor included.
        members: Vec<ObjectId>,
    },
    /// Confirms that a merge finished.
    MergeCompleted {
        /// Member that remains active and grew.
        survivor: ObjectId,
        /// Members that were returned to the pool.
        absorbed: Vec<ObjectId>,
    },
    /// Reports that an object grew strictly beyond the previous largest scale.
    NewLargestObject {
        /// Holder of the new record.
        object: ObjectId,
        /// Scale of the new record.
        scale: f32,
    },
    /// Confirms that a magnet was placed.
    MagnetPlaced {
        /// Identifier allocated to the magnet.
        magnet: MagnetId,
        /// Position of the magnet.
        position: Vec2,
    },
    /// Reports that a magnetic object entered a magnet's trigger circle.
    MagnetCaught {
        /// Magnet that caught the object.
        magnet: MagnetId,
        /// Object that entered.
        object: ObjectId,
    },
    /// Reports that a magnetic object left a magnet's trigger circle.
    MagnetReleased {
        /// Magnet that released the object.
        magnet: MagnetId,
        /// Object that left.
        object: ObjectId,
    },
}

/// Unique identifier assigned to a pooled object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a magnet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MagnetId(u32);

impl MagnetId {
    /// Creates a new magnet identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Magnetic polarity of magnets and magnetic objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Positive pole.
    Positive,
    /// Negative pole.
    Negative,
    /// Attracted by every pole.
    Any,
}

/// How a magnet acts on an object it caught.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// The object is pulled toward the magnet.
    Attract,
    /// The object is pushed away from the magnet.
    Repel,
}

impl Polarity {
    /// Resolves how a magnet with this polarity treats an object with `other`.
    ///
    /// Opposite poles, or `Any` on either side, attract; equal poles repel.
    #[must_use]
    pub const fn interaction(self, other: Polarity) -> Interaction {
        match (self, other) {
            (Self::Positive, Self::Positive) | (Self::Negative, Self::Negative) => {
                Interaction::Repel
            }
            _ => Interaction::Attract,
        }
    }
}

/// How a force applied to a body is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForceMode {
    /// Continuous force integrated over the next physics step.
    Force,
    /// Instantaneous change of momentum.
    Impulse,
}

/// Axis-aligned bounding box in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Creates a box from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centred on `center` extending `half_extents` on each axis.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing every provided point, or `None` when empty.
    #[must_use]
    pub fn enclosing(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for point in rest {
            bounds.min = bounds.min.min(*point);
            bounds.max = bounds.max.max(*point);
        }
        Some(bounds)
    }

    /// Lower-left corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper-right corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Centre point of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Width and height of the box.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Shrinks the box by `amount` on every side, collapsing to the centre if too small.
    #[must_use]
    pub fn inset(&self, amount: f32) -> Self {
        let center = self.center();
        let half = (self.size() * 0.5 - Vec2::splat(amount)).max(Vec2::ZERO);
        Self::from_center(center, half)
    }

    /// Reports whether the two boxes overlap, touching edges included.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Reports whether the point lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Clamps a point into the box.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// Orthographic camera framing the arena, centred on `center`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World-space centre of the view.
    pub center: Vec2,
    /// Half of the visible height in world units.
    pub half_height: f32,
    /// Width divided by height.
    pub aspect: f32,
}

impl Camera {
    /// Creates a camera centred on the origin.
    #[must_use]
    pub const fn new(half_height: f32, aspect: f32) -> Self {
        Self {
            center: Vec2::ZERO,
            half_height,
            aspect,
        }
    }

    /// Half of the visible width in world units.
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.half_height * self.aspect
    }

    /// Visible world-space rectangle.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, Vec2::new(self.half_width(), self.half_height))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(5.0, 16.0 / 9.0)
    }
}

/// Area of the circle inscribed in an object of the provided uniform scale.
#[must_use]
pub fn circle_area(scale: f32) -> f32 {
    let radius = scale / 2.0;
    PI * radius * radius
}

/// Body contract shared by rigid and soft bodies.
///
/// Anything that moves through the arena implements this so merging,
/// kinematics, and magnets never need to know how a body is represented.
pub trait PhysicsBody {
    /// Position of the body's anchor point.
    fn position(&self) -> Vec2;

    /// Mass-weighted centre of the body.
    fn center_of_mass(&self) -> Vec2;

    /// Current linear velocity.
    fn velocity(&self) -> Vec2;

    /// Overwrites the linear velocity.
    fn set_velocity(&mut self, velocity: Vec2);

    /// Applies a force or impulse.
    fn add_force(&mut self, force: Vec2, mode: ForceMode);

    /// Teleports the body so its anchor lands on `position`.
    fn move_position(&mut self, position: Vec2);

    /// Uniform scale (diameter) of the body.
    fn scale(&self) -> f32;

    /// Rescales the body uniformly about its anchor.
    fn set_scale(&mut self, scale: f32);

    /// World-space bounds of the body's collider.
    fn bounds(&self) -> Aabb;

    /// Integrates the body over `dt` seconds.
    fn step(&mut self, dt: f32);
}

/// Representation backing a pooled object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Single rigid circle.
    Rigid,
    /// Ring of spring-linked point masses.
    Soft,
}

/// Immutable representation of a single pooled object used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSnapshot {
    /// Unique identifier assigned to the object.
    pub id: ObjectId,
    /// Position of the object's anchor.
    pub position: Vec2,
    /// Current linear velocity.
    pub velocity: Vec2,
    /// Uniform scale (diameter).
    pub scale: f32,
    /// World-space collider bounds.
    pub bounds: Aabb,
    /// Indicates whether the object belongs to a running merge.
    pub merging: bool,
    /// Number of spawned objects folded into this one, itself included.
    pub merge_count: u32,
    /// Polarity when the object is magnetic.
    pub polarity: Option<Polarity>,
    /// Representation of the body.
    pub kind: BodyKind,
}

impl ObjectSnapshot {
    /// Radius of the object's circular collider.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.scale / 2.0
    }

    /// Area of the object's circular footprint.
    #[must_use]
    pub fn area(&self) -> f32 {
        circle_area(self.scale)
    }

    /// Reports whether the object's collider overlaps a circle.
    #[must_use]
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        self.position.distance(center) <= self.radius() + radius
    }
}

/// Read-only snapshot describing every active object.
#[derive(Clone, Debug, Default)]
pub struct ObjectView {
    snapshots: Vec<ObjectSnapshot>,
}

impl ObjectView {
    /// Creates a new object view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ObjectSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&ObjectSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ObjectSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single magnet.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnetSnapshot {
    /// Identifier allocated to the magnet.
    pub id: MagnetId,
    /// World-space position.
    pub position: Vec2,
    /// Radius of the trigger circle.
    pub radius: f32,
    /// Impulse magnitude applied per physics step.
    pub strength: f32,
    /// Polarity of the magnet.
    pub polarity: Polarity,
    /// Objects currently inside the trigger circle, in ascending order.
    pub caught: Vec<ObjectId>,
}

/// Read-only snapshot describing every magnet.
#[derive(Clone, Debug, Default)]
pub struct MagnetView {
    snapshots: Vec<MagnetSnapshot>,
}

impl MagnetView {
    /// Creates a new magnet view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MagnetSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured magnets in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &MagnetSnapshot> {
        self.snapshots.iter()
    }

    /// Total number of caught objects across every magnet.
    #[must_use]
    pub fn caught_count(&self) -> usize {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.caught.len())
            .sum()
    }
}
