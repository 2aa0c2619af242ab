use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Camera, Command, Event, PlayMode};
use merge_bubbles_system_kinematics::{apply_drag, Config, Kinematics};
use merge_bubbles_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(20);

fn step(world: &mut World, kinematics: &mut Kinematics) {
    let mut events = Vec::new();
    world::apply(world, Command::FixedTick { dt: STEP }, &mut events);
    let mut commands = Vec::new();
    kinematics.handle(
        &events,
        query::play_mode(world),
        &query::object_view(world),
        query::walls(world),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
}

#[test]
fn drag_settles_to_exact_zero_without_oscillating() {
    let config = Config::new(1.0, 0.99);
    let mut velocity = Vec2::new(3.0, -1.5);
    let direction = velocity.normalize();

    for _ in 0..5_000 {
        velocity = apply_drag(velocity, 1.0, 0.02, &config);
        assert!(velocity.dot(direction) >= 0.0, "velocity reversed");
        if velocity == Vec2::ZERO {
            break;
        }
    }

    assert_eq!(velocity, Vec2::ZERO);
}

#[test]
fn quadratic_drag_alone_only_ever_slows_bubbles_down() {
    let config = Config::default();
    let mut velocity = Vec2::new(3.0, -1.5);

    // Speed falls roughly as 1 / (1 + k * v0 * t), so rest takes ~50k steps.
    let mut steps = 0;
    while velocity != Vec2::ZERO && steps < 100_000 {
        let next = apply_drag(velocity, 1.0, 0.02, &config);
        assert!(
            next.length() <= velocity.length(),
            "speed grew from {} to {} at step {steps}",
            velocity.length(),
            next.length()
        );
        velocity = next;
        steps += 1;
    }

    assert_eq!(velocity, Vec2::ZERO);
    assert!(steps > 10_000);
}

#[test]
fn bubbles_bounce_off_the_arena_walls() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureArena {
            camera: Camera::new(5.0, 1.0),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::SpawnObject {
            position: Vec2::new(4.0, 0.0),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::ApplyImpulse {
            object: merge_bubbles_core::ObjectId::new(0),
            impulse: Vec2::new(2.0, 0.0),
        },
        &mut events,
    );

    let mut kinematics = Kinematics::new(Config::default());
    let mut bounced = false;
    for _ in 0..200 {
        step(&mut world, &mut kinematics);
        let bubble = query::object_view(&world).into_vec().remove(0);
        assert!(bubble.position.x < 5.5, "bubble escaped the arena");
        if bubble.velocity.x < 0.0 {
            bounced = true;
            break;
        }
    }

    assert!(bounced);
}

#[test]
fn resting_bubbles_produce_no_commands() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnObject {
            position: Vec2::ZERO,
        },
        &mut events,
    );

    let mut kinematics = Kinematics::new(Config::default());
    let mut commands = Vec::new();
    kinematics.handle(
        &[Event::PhysicsStepped { dt: STEP }],
        PlayMode::Playing,
        &query::object_view(&world),
        query::walls(&world),
        &mut commands,
    );
    assert!(commands.is_empty());
}

#[test]
fn frozen_world_is_left_alone() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnObject {
            position: Vec2::ZERO,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::ApplyImpulse {
            object: merge_bubbles_core::ObjectId::new(0),
            impulse: Vec2::ONE,
        },
        &mut events,
    );

    let mut kinematics = Kinematics::new(Config::default());
    let mut commands = Vec::new();
    kinematics.handle(
        &[Event::PhysicsStepped { dt: STEP }],
        PlayMode::Won,
        &query::object_view(&world),
        query::walls(&world),
        &mut commands,
    );
    assert!(commands.is_empty());
}
