use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Camera, Command, Event, ObjectId, PlayMode};
use merge_bubbles_system_progress::{Config, Progress};
use merge_bubbles_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(100);

fn spawn(world: &mut World, position: Vec2) -> ObjectId {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnObject { position }, &mut events);
    match events.as_slice() {
        [Event::ObjectSpawned { object, .. }] => *object,
        other => panic!("unexpected events {other:?}"),
    }
}

fn pump(world: &mut World, progress: &mut Progress, command: Command) -> Vec<Event> {
    let mut log = Vec::new();
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    while !events.is_empty() {
        log.extend(events.iter().cloned());
        let mut commands = Vec::new();
        progress.handle(&events, query::play_mode(world), &mut commands);
        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
    log
}

#[test]
fn enough_merges_win_and_bubbles_float_away() {
    let mut world = World::new();
    let mut progress = Progress::new(Config::new(1.0, 1.0));
    let _ = pump(
        &mut world,
        &mut progress,
        Command::ConfigureArena {
            camera: Camera::new(1.0, 1.0),
        },
    );
    let survivor = spawn(&mut world, Vec2::ZERO);
    let absorbed = spawn(&mut world, Vec2::new(0.5, 0.0));

    let _ = pump(
        &mut world,
        &mut progress,
        Command::BeginMerge {
            survivor,
            members: vec![survivor, absorbed],
        },
    );
    let log = pump(
        &mut world,
        &mut progress,
        Command::CompleteMerge {
            survivor,
            absorbed: vec![absorbed],
            scale: 1.0,
            position: None,
            velocity: Vec2::ZERO,
        },
    );
    assert!(log.contains(&Event::PlayModeChanged {
        mode: PlayMode::Won
    }));
    assert_eq!(query::play_mode(&world), PlayMode::Won);

    let mut deactivated = false;
    for _ in 0..100 {
        let _ = pump(&mut world, &mut progress, Command::FixedTick { dt: FRAME });
        let log = pump(&mut world, &mut progress, Command::Tick { dt: FRAME });
        if log.contains(&Event::ObjectDeactivated { object: survivor }) {
            deactivated = true;
            break;
        }
        let bubble = query::object_view(&world).into_vec().remove(0);
        assert_eq!(bubble.velocity.y, 0.5);
    }
    assert!(deactivated);
    assert_eq!(query::active_count(&world), 0);
}
