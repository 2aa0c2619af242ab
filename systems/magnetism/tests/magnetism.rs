use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Command, Event, Polarity};
use merge_bubbles_system_magnetism::Magnetism;
use merge_bubbles_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(20);

fn place_magnet(world: &mut World, polarity: Polarity) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::PlaceMagnet {
            position: Vec2::ZERO,
            radius: 1.5,
            strength: 5.0,
            polarity,
        },
        &mut events,
    );
}

fn step(world: &mut World, magnetism: &mut Magnetism) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::FixedTick { dt: STEP }, &mut events);
    let mut commands = Vec::new();
    magnetism.handle(
        &events,
        query::play_mode(world),
        &query::magnet_view(world),
        &query::object_view(world),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

#[test]
fn blower_pushes_caught_bubbles_out_of_range() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnObject {
            position: Vec2::new(1.0, 0.0),
        },
        &mut events,
    );
    place_magnet(&mut world, Polarity::Positive);

    let mut magnetism = Magnetism::new();
    let mut log = Vec::new();
    for _ in 0..20 {
        log.extend(step(&mut world, &mut magnetism));
    }

    let caught = log
        .iter()
        .position(|event| matches!(event, Event::MagnetCaught { .. }))
        .expect("bubble caught");
    let released = log
        .iter()
        .position(|event| matches!(event, Event::MagnetReleased { .. }))
        .expect("bubble released");
    assert!(caught < released);

    let bubble = query::object_view(&world).into_vec().remove(0);
    assert!(bubble.position.x > 2.0);
    assert_eq!(query::magnet_view(&world).caught_count(), 0);
}

#[test]
fn opposite_magnet_pulls_bubbles_in() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnObject {
            position: Vec2::new(0.0, 1.5),
        },
        &mut events,
    );
    place_magnet(&mut world, Polarity::Negative);

    let mut magnetism = Magnetism::new();
    let _ = step(&mut world, &mut magnetism);
    let bubble = query::object_view(&world).into_vec().remove(0);
    assert!(bubble.velocity.y < 0.0);
}
