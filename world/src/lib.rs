#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Merge Bubbles.

mod body;
mod pool;

use std::collections::BTreeSet;

use glam::Vec2;
use merge_bubbles_core::{
    Aabb, Camera, Command, Event, ForceMode, MagnetId, ObjectId, PhysicsBody, PlayMode,
    Polarity, WELCOME_BANNER,
};

pub use pool::{BodyTemplate, Prefab};
use pool::ObjectPool;

/// Vertical speed bubbles drift off screen with once the game is won.
const FLOAT_AWAY_SPEED: f32 = 0.5;

/// Magnet registered with the world.
#[derive(Clone, Debug)]
struct Magnet {
    id: MagnetId,
    position: Vec2,
    radius: f32,
    strength: f32,
    polarity: Polarity,
    caught: BTreeSet<ObjectId>,
}

/// Represents the authoritative Merge Bubbles world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    play_mode: PlayMode,
    camera: Option<Camera>,
    walls: Vec<Aabb>,
    pool: ObjectPool,
    magnets: Vec<Magnet>,
    contacts: BTreeSet<(ObjectId, ObjectId)>,
    tick_index: u64,
}

impl World {
    /// Creates a new world whose pool instantiates default rigid bubbles.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefab(Prefab::default())
    }

    /// Creates a new world whose pool instantiates the provided prefab.
    #[must_use]
    pub fn with_prefab(prefab: Prefab) -> Self {
        Self {
            banner: WELCOME_BANNER,
            play_mode: PlayMode::Playing,
            camera: None,
            walls: Vec::new(),
            pool: ObjectPool::new(prefab),
            magnets: Vec::new(),
            contacts: BTreeSet::new(),
            tick_index: 0,
        }
    }

    fn deactivate(&mut self, id: ObjectId, out_events: &mut Vec<Event>) -> bool {
        let Some(object) = self.pool.active_mut(id) else {
            return false;
        };
        object.release();

        self.contacts
            .retain(|(first, second)| *first != id && *second != id);
        for magnet in &mut self.magnets {
            if magnet.caught.remove(&id) {
                out_events.push(Event::MagnetReleased {
                    magnet: magnet.id,
                    object: id,
                });
            }
        }
        true
    }

    fn float_away(&mut self, out_events: &mut Vec<Event>) {
        let screen = self.camera.map(|camera| camera.bounds());
        let mut departed = Vec::new();
        for object in self.pool.iter_active_mut() {
            let velocity = object.body.velocity();
            object
                .body
                .steer_velocity(Vec2::new(velocity.x / 2.0, FLOAT_AWAY_SPEED));

            match screen {
                Some(screen) if !object.body.bounds().intersects(&screen) => {
                    departed.push(object.id);
                }
                Some(_) => {}
                None => {
                    log::warn!(
                        "no camera configured; treating object {} as on screen",
                        object.id.get()
                    );
                }
            }
        }

        for id in departed {
            if self.deactivate(id, out_events) {
                out_events.push(Event::ObjectDeactivated { object: id });
            }
        }
    }

    fn detect_contacts(&mut self, out_events: &mut Vec<Event>) {
        let circles: Vec<(ObjectId, Vec2, f32)> = self
            .pool
            .iter_active()
            .map(|object| (object.id, object.body.position(), object.body.scale() / 2.0))
            .collect();

        let mut touching = BTreeSet::new();
        for (index, first) in circles.iter().enumerate() {
            for second in &circles[index + 1..] {
                if first.1.distance(second.1) > first.2 + second.2 {
                    continue;
                }
                let pair = (first.0, second.0);
                let _ = touching.insert(pair);
                if self.contacts.contains(&pair) {
                    continue;
                }
                let direction = (second.1 - first.1).normalize_or_zero();
                out_events.push(Event::ContactBegan {
                    initiator: first.0,
                    other: second.0,
                    contacts: vec![first.1 + direction * first.2],
                });
            }
        }
        self.contacts = touching;
    }

    fn update_magnets(&mut self, out_events: &mut Vec<Event>) {
        let magnetic: Vec<(ObjectId, Vec2, f32)> = self
            .pool
            .iter_active()
            .filter(|object| object.polarity.is_some())
            .map(|object| (object.id, object.body.position(), object.body.scale() / 2.0))
            .collect();

        for magnet in &mut self.magnets {
            let inside: BTreeSet<ObjectId> = magnetic
                .iter()
                .filter(|(_, position, radius)| {
                    position.distance(magnet.position) <= magnet.radius + radius
                })
                .map(|(id, _, _)| *id)
                .collect();

            for object in inside.difference(&magnet.caught) {
                out_events.push(Event::MagnetCaught {
                    magnet: magnet.id,
                    object: *object,
                });
            }
            for object in magnet.caught.difference(&inside) {
                out_events.push(Event::MagnetReleased {
                    magnet: magnet.id,
                    object: *object,
                });
            }
            magnet.caught = inside;
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Four walls hugging the outside of the camera's view, each as thick as the view is wide.
fn walls_around(camera: &Camera) -> Vec<Aabb> {
    let view = camera.bounds();
    let center = view.center();
    let width = view.size().x;
    let height = view.size().y;
    let half_width = width / 2.0;
    let half_height = height / 2.0;

    vec![
        Aabb::from_center(
            center + Vec2::new(0.0, half_height + half_width),
            Vec2::new(width * 1.5, half_width),
        ),
        Aabb::from_center(
            center - Vec2::new(0.0, half_height + half_width),
            Vec2::new(width * 1.5, half_width),
        ),
        Aabb::from_center(
            center - Vec2::new(width, 0.0),
            Vec2::new(half_width, half_height),
        ),
        Aabb::from_center(
            center + Vec2::new(width, 0.0),
            Vec2::new(half_width, half_height),
        ),
    ]
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureArena { camera } => {
            world.camera = Some(camera);
            world.walls = walls_around(&camera);
            out_events.push(Event::ArenaConfigured {
                bounds: camera.bounds(),
            });
        }
        Command::Tick { dt } => {
            if world.play_mode == PlayMode::Paused {
                return;
            }
            out_events.push(Event::TimeAdvanced { dt });
            if world.play_mode == PlayMode::Won {
                world.float_away(out_events);
            }
        }
        Command::FixedTick { dt } => {
            if world.play_mode == PlayMode::Paused {
                return;
            }
            world.tick_index = world.tick_index.saturating_add(1);
            let seconds = dt.as_secs_f32();
            for object in world.pool.iter_active_mut() {
                object.body.step(seconds);
            }
            out_events.push(Event::PhysicsStepped { dt });
            world.detect_contacts(out_events);
            world.update_magnets(out_events);
        }
        Command::SetPlayMode { mode } => {
            if world.play_mode != mode {
                world.play_mode = mode;
                out_events.push(Event::PlayModeChanged { mode });
            }
        }
        Command::DeclareWin => {
            if world.play_mode == PlayMode::Won {
                log::debug!("win already declared");
                return;
            }
            world.play_mode = PlayMode::Won;
            out_events.push(Event::PlayModeChanged {
                mode: PlayMode::Won,
            });
        }
        Command::SpawnObject { position } => {
            let id = world.pool.acquire(true);
            if let Some(object) = world.pool.get_mut(id) {
                object.body.move_position(position);
            }
            out_events.push(Event::ObjectSpawned {
                object: id,
                position,
            });
        }
        Command::BeginMerge { survivor, members } => {
            let members: Vec<ObjectId> = members
                .into_iter()
                .filter(|id| world.pool.get(*id).is_some_and(|object| object.active))
                .collect();
            if members.len() < 2 || !members.contains(&survivor) {
                log::debug!(
                    "ignoring merge of {} live members around {}",
                    members.len(),
                    survivor.get()
                );
                return;
            }
            for id in &members {
                if let Some(object) = world.pool.active_mut(*id) {
                    object.merging = true;
                }
            }
            out_events.push(Event::MergeStarted { survivor, members });
        }
        Command::AnimateMerge {
            object,
            scale,
            position,
        } => {
            let Some(pooled) = world.pool.active_mut(object) else {
                log::debug!("skipping merge frame for inactive object {}", object.get());
                return;
            };
            pooled.body.set_scale(scale);
            if let Some(position) = position {
                pooled.body.move_position(position);
            }
        }
        Command::CompleteMerge {
            survivor,
            absorbed,
            scale,
            position,
            velocity,
        } => {
            if world.pool.active_mut(survivor).is_none() {
                log::warn!(
                    "merge survivor {} left play before the merge completed",
                    survivor.get()
                );
                for id in absorbed {
                    if let Some(object) = world.pool.active_mut(id) {
                        object.merging = false;
                    }
                }
                return;
            }

            let mut hidden = Vec::with_capacity(absorbed.len());
            let mut gained = 0;
            for id in absorbed {
                if id == survivor {
                    continue;
                }
                let count = world
                    .pool
                    .active_mut(id)
                    .map_or(0, |object| object.merge_count);
                if world.deactivate(id, out_events) {
                    gained += count;
                    hidden.push(id);
                }
            }

            if let Some(object) = world.pool.active_mut(survivor) {
                object.merge_count = object.merge_count.saturating_add(gained);
                object.merging = false;
                object.body.set_scale(scale);
                if let Some(position) = position {
                    object.body.move_position(position);
                }
                object.body.set_velocity(velocity);
            }

            out_events.push(Event::MergeCompleted {
                survivor,
                absorbed: hidden,
            });
        }
        Command::AbandonMerge { object, scale } => {
            let Some(pooled) = world.pool.active_mut(object) else {
                return;
            };
            pooled.merging = false;
            pooled.body.set_scale(scale);
        }
        Command::ApplyKinematics {
            object,
            position,
            velocity,
        } => {
            let Some(pooled) = world.pool.active_mut(object) else {
                log::debug!("skipping kinematics for inactive object {}", object.get());
                return;
            };
            if pooled.body.position() != position {
                pooled.body.move_position(position);
            }
            pooled.body.steer_velocity(velocity);
        }
        Command::ApplyImpulse { object, impulse } => {
            let Some(pooled) = world.pool.active_mut(object) else {
                log::debug!("skipping impulse for inactive object {}", object.get());
                return;
            };
            pooled.body.add_force(impulse, ForceMode::Impulse);
        }
        Command::PlaceMagnet {
            position,
            radius,
            strength,
            polarity,
        } => {
            let id = MagnetId::new(world.magnets.len() as u32);
            world.magnets.push(Magnet {
                id,
                position,
                radius,
                strength,
                polarity,
                caught: BTreeSet::new(),
            });
            out_events.push(Event::MagnetPlaced {
                magnet: id,
                position,
            });
        }
        Command::MoveMagnet { magnet, position } => {
            match world.magnets.iter_mut().find(|entry| entry.id == magnet) {
                Some(entry) => entry.position = position,
                None => log::debug!("ignoring move of unknown magnet {}", magnet.get()),
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use merge_bubbles_core::{
        Aabb, Camera, MagnetSnapshot, MagnetView, ObjectId, ObjectSnapshot, ObjectView,
        PhysicsBody, PlayMode,
    };
    use merge_bubbles_softbody::SoftBodyMesh;

    use super::{body::Body, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Reports the currently active play mode.
    #[must_use]
    pub fn play_mode(world: &World) -> PlayMode {
        world.play_mode
    }

    /// Camera framing the arena, if one has been configured.
    #[must_use]
    pub fn camera(world: &World) -> Option<Camera> {
        world.camera
    }

    /// Obstacles surrounding the visible arena.
    #[must_use]
    pub fn walls(world: &World) -> &[Aabb] {
        &world.walls
    }

    /// Number of fixed physics steps processed so far.
    #[must_use]
    pub fn physics_steps(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of objects the pool has ever created.
    #[must_use]
    pub fn pool_size(world: &World) -> usize {
        world.pool.len()
    }

    /// Number of objects currently in play.
    #[must_use]
    pub fn active_count(world: &World) -> usize {
        world.pool.iter_active().count()
    }

    /// Captures a read-only view of every object in play.
    #[must_use]
    pub fn object_view(world: &World) -> ObjectView {
        let snapshots = world
            .pool
            .iter_active()
            .map(|object| ObjectSnapshot {
                id: object.id,
                position: object.body.position(),
                velocity: object.body.velocity(),
                scale: object.body.scale(),
                bounds: object.body.bounds(),
                merging: object.merging,
                merge_count: object.merge_count,
                polarity: object.polarity,
                kind: object.body.kind(),
            })
            .collect();
        ObjectView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every magnet.
    #[must_use]
    pub fn magnet_view(world: &World) -> MagnetView {
        let snapshots = world
            .magnets
            .iter()
            .map(|magnet| MagnetSnapshot {
                id: magnet.id,
                position: magnet.position,
                radius: magnet.radius,
                strength: magnet.strength,
                polarity: magnet.polarity,
                caught: magnet.caught.iter().copied().collect(),
            })
            .collect();
        MagnetView::from_snapshots(snapshots)
    }

    /// Reports whether any object in play overlaps the provided circle.
    #[must_use]
    pub fn is_area_occupied(world: &World, center: Vec2, radius: f32) -> bool {
        world.pool.iter_active().any(|object| {
            object.body.position().distance(center) <= object.body.scale() / 2.0 + radius
        })
    }

    /// Render mesh of a soft-bodied object, if it is in play.
    #[must_use]
    pub fn soft_body_mesh(world: &World, id: ObjectId) -> Option<&SoftBodyMesh> {
        let object = world.pool.get(id).filter(|object| object.active)?;
        match &object.body {
            Body::Soft(body) => Some(body.mesh()),
            Body::Rigid(_) => None,
        }
    }

    /// Total merge count across every object in play.
    #[must_use]
    pub fn merged_total(world: &World) -> u32 {
        world
            .pool
            .iter()
            .filter(|object| object.active)
            .map(|object| object.merge_count)
            .sum()
    }
}
