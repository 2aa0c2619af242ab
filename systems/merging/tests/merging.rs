use std::time::Duration;

use anyhow::anyhow;
use glam::Vec2;
use merge_bubbles_core::{circle_area, Command, Event, ObjectId, ObjectSnapshot, PlayMode};
use merge_bubbles_system_merging::{Config, MergeAcceptance, Merging};
use merge_bubbles_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(20);

fn spawn(world: &mut World, position: Vec2) -> ObjectId {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnObject { position }, &mut events);
    match events.as_slice() {
        [Event::ObjectSpawned { object, .. }] => *object,
        other => panic!("unexpected events {other:?}"),
    }
}

/// Applies a command and lets the merge engine react until it goes quiet.
fn pump(world: &mut World, merging: &mut Merging, command: Command, log: &mut Vec<Event>) {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);

    while !events.is_empty() {
        log.extend(events.iter().cloned());
        let mut commands = Vec::new();
        merging.handle(
            &events,
            query::play_mode(world),
            &query::object_view(world),
            &mut commands,
        );
        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

fn run_frames(world: &mut World, merging: &mut Merging, frames: usize) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..frames {
        pump(world, merging, Command::Tick { dt: FRAME }, &mut log);
        pump(world, merging, Command::FixedTick { dt: FRAME }, &mut log);
    }
    log
}

#[test]
fn touching_pair_merges_with_conserved_area() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let left = spawn(&mut world, Vec2::new(-0.4, 0.0));
    let right = spawn(&mut world, Vec2::new(0.4, 0.0));

    let log = run_frames(&mut world, &mut merging, 30);

    let completed: Vec<&Event> = log
        .iter()
        .filter(|event| matches!(event, Event::MergeCompleted { .. }))
        .collect();
    assert_eq!(
        completed,
        vec![&Event::MergeCompleted {
            survivor: left,
            absorbed: vec![right],
        }]
    );

    let view = query::object_view(&world);
    assert_eq!(view.len(), 1);
    let survivor = view.get(left).expect("survivor");
    assert!((circle_area(survivor.scale) - 2.0 * circle_area(1.0)).abs() < 1e-4);
    assert_eq!(survivor.merge_count, 2);
    assert!(!survivor.merging);
    assert!(merging.animations().is_empty());
}

#[test]
fn animation_grows_survivor_over_several_frames() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let left = spawn(&mut world, Vec2::new(-0.4, 0.0));
    let _ = spawn(&mut world, Vec2::new(0.4, 0.0));

    let _ = run_frames(&mut world, &mut merging, 2);
    let view = query::object_view(&world);
    let survivor = view.get(left).expect("survivor");
    assert!(survivor.merging);
    assert!(survivor.scale > 1.0);
    assert!(survivor.scale < 2.0_f32.sqrt());
    assert_eq!(view.len(), 2);
}

#[test]
fn nearby_bubbles_join_the_group() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let a = spawn(&mut world, Vec2::new(-0.45, 0.0));
    let b = spawn(&mut world, Vec2::new(0.45, 0.0));
    let c = spawn(&mut world, Vec2::new(0.0, 1.2));

    let log = run_frames(&mut world, &mut merging, 30);

    let started = log.iter().find_map(|event| match event {
        Event::MergeStarted { members, .. } => Some(members.clone()),
        _ => None,
    });
    assert_eq!(started, Some(vec![a, b, c]));
    let view = query::object_view(&world);
    assert_eq!(view.len(), 1);
    let survivor = view.iter().next().expect("survivor");
    assert!((circle_area(survivor.scale) - 3.0 * circle_area(1.0)).abs() < 1e-4);
    assert_eq!(survivor.merge_count, 3);
}

/// Starts a merge between `a` and `b`, then reports whether a contact between
/// `b` and `c` is allowed to start a second merge.
fn second_merge_starts(acceptance: MergeAcceptance) -> bool {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default().with_acceptance(acceptance));
    let a = spawn(&mut world, Vec2::new(-0.4, 0.0));
    let b = spawn(&mut world, Vec2::new(0.4, 0.0));
    let c = spawn(&mut world, Vec2::new(5.0, 0.0));

    let mut commands = Vec::new();
    merging.handle(
        &[Event::ContactBegan {
            initiator: a,
            other: b,
            contacts: vec![Vec2::ZERO],
        }],
        PlayMode::Playing,
        &query::object_view(&world),
        &mut commands,
    );
    assert_eq!(commands.len(), 1);
    let mut events = Vec::new();
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }

    merging.handle(
        &[Event::ContactBegan {
            initiator: b,
            other: c,
            contacts: vec![Vec2::new(5.0, 0.0)],
        }],
        PlayMode::Playing,
        &query::object_view(&world),
        &mut commands,
    );
    commands
        .iter()
        .any(|command| matches!(command, Command::BeginMerge { .. }))
}

#[test]
fn strict_acceptance_rejects_merging_bubbles() {
    assert!(!second_merge_starts(MergeAcceptance::Strict));
}

#[test]
fn relaxed_acceptance_admits_one_merging_bubble() {
    assert!(second_merge_starts(MergeAcceptance::Relaxed));
}

#[test]
fn failing_predicate_vetoes_the_merge() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default())
        .with_predicate(Box::new(
            |_: &ObjectSnapshot, _: &ObjectSnapshot| -> anyhow::Result<bool> {
                Err(anyhow!("predicate unavailable"))
            },
        ));
    let _ = spawn(&mut world, Vec2::new(-0.4, 0.0));
    let _ = spawn(&mut world, Vec2::new(0.4, 0.0));

    let log = run_frames(&mut world, &mut merging, 10);
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::MergeStarted { .. })));
    assert_eq!(query::active_count(&world), 2);
}

#[test]
fn won_world_finishes_running_merges_but_starts_none() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let _ = spawn(&mut world, Vec2::new(-0.4, 0.0));
    let _ = spawn(&mut world, Vec2::new(0.4, 0.0));
    let _ = run_frames(&mut world, &mut merging, 1);
    assert_eq!(merging.animations().len(), 1);

    let mut log = Vec::new();
    pump(&mut world, &mut merging, Command::DeclareWin, &mut log);
    let _ = spawn(&mut world, Vec2::new(3.0, 0.0));
    let _ = spawn(&mut world, Vec2::new(3.5, 0.0));

    let log = run_frames(&mut world, &mut merging, 30);
    let started = log
        .iter()
        .filter(|event| matches!(event, Event::MergeStarted { .. }))
        .count();
    let completed = log
        .iter()
        .filter(|event| matches!(event, Event::MergeCompleted { .. }))
        .count();
    assert_eq!(started, 0);
    assert_eq!(completed, 1);
}

/// Feeds a contact straight to the merge engine and applies what it asks for.
fn touch(world: &mut World, merging: &mut Merging, initiator: ObjectId, other: ObjectId) {
    let at = query::object_view(world)
        .get(other)
        .map(|snapshot| snapshot.position)
        .expect("other bubble");
    let mut commands = Vec::new();
    merging.handle(
        &[Event::ContactBegan {
            initiator,
            other,
            contacts: vec![at],
        }],
        PlayMode::Playing,
        &query::object_view(world),
        &mut commands,
    );
    assert!(commands
        .iter()
        .any(|command| matches!(command, Command::BeginMerge { .. })));
    let mut log = Vec::new();
    for command in commands {
        pump(world, merging, command, &mut log);
    }
}

/// Advances merge animations without stepping physics.
fn animate(world: &mut World, merging: &mut Merging, frames: usize) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..frames {
        pump(world, merging, Command::Tick { dt: FRAME }, &mut log);
    }
    log
}

fn resize(world: &mut World, object: ObjectId, scale: f32) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::AnimateMerge {
            object,
            scale,
            position: None,
        },
        &mut events,
    );
}

#[test]
fn recycled_bubble_is_untouched_by_an_emptied_group() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let a = spawn(&mut world, Vec2::new(-4.0, 0.0));
    let b = spawn(&mut world, Vec2::new(-3.2, 0.0));
    let c = spawn(&mut world, Vec2::new(3.0, 0.0));
    resize(&mut world, c, 2.0);

    touch(&mut world, &mut merging, a, b);
    let _ = animate(&mut world, &mut merging, 3);
    touch(&mut world, &mut merging, b, c);
    assert_eq!(merging.animations().len(), 2);

    let log = animate(&mut world, &mut merging, 8);
    assert!(log.contains(&Event::MergeCompleted {
        survivor: a,
        absorbed: vec![b],
    }));
    assert!(merging.animations().is_empty());

    let fresh = spawn(&mut world, Vec2::new(0.0, 3.0));
    assert_eq!(fresh, b);
    let _ = animate(&mut world, &mut merging, 20);

    let view = query::object_view(&world);
    let recycled = view.get(fresh).expect("recycled bubble stays in play");
    assert_eq!(recycled.scale, 1.0);
    assert!(!recycled.merging);
    let released = view.get(c).expect("c stays in play");
    assert_eq!(released.scale, 2.0);
    assert!(!released.merging);
    assert_eq!(query::active_count(&world), 3);
}

#[test]
fn group_that_loses_its_survivor_merges_into_the_next_largest() {
    let mut world = World::new();
    let mut merging = Merging::new(Config::default());
    let a = spawn(&mut world, Vec2::new(-4.0, 0.0));
    let b = spawn(&mut world, Vec2::new(-3.0, 0.0));
    let c = spawn(&mut world, Vec2::new(3.0, 0.0));
    let d = spawn(&mut world, Vec2::new(3.6, 0.0));
    resize(&mut world, a, 2.0);
    resize(&mut world, c, 0.5);
    resize(&mut world, d, 0.5);

    touch(&mut world, &mut merging, a, b);
    let _ = animate(&mut world, &mut merging, 3);
    touch(&mut world, &mut merging, b, c);
    assert_eq!(merging.animations()[1].survivor(), b);

    let log = animate(&mut world, &mut merging, 30);
    assert!(log.contains(&Event::MergeCompleted {
        survivor: c,
        absorbed: vec![d],
    }));
    assert!(merging.animations().is_empty());

    let view = query::object_view(&world);
    assert_eq!(view.len(), 2);
    let heir = view.get(c).expect("heir");
    assert!((circle_area(heir.scale) - 2.0 * circle_area(0.5)).abs() < 1e-4);
    assert_eq!(heir.merge_count, 2);
    let first = view.get(a).expect("first survivor");
    assert!((circle_area(first.scale) - circle_area(2.0) - circle_area(1.0)).abs() < 1e-4);
}
