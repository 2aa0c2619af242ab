#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pushes and pulls bubbles caught inside magnet trigger circles.

use glam::Vec2;
use merge_bubbles_core::{
    Command, Event, Interaction, MagnetSnapshot, MagnetView, ObjectSnapshot, ObjectView, PlayMode,
};

/// Pure system that turns magnet catches into impulses once per physics step.
#[derive(Debug, Default)]
pub struct Magnetism;

impl Magnetism {
    /// Creates a new magnetism system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes events and views to emit one impulse per caught object and physics step.
    pub fn handle(
        &mut self,
        events: &[Event],
        play_mode: PlayMode,
        magnets: &MagnetView,
        objects: &ObjectView,
        out: &mut Vec<Command>,
    ) {
        if play_mode != PlayMode::Playing {
            return;
        }

        let steps = events
            .iter()
            .filter(|event| matches!(event, Event::PhysicsStepped { .. }))
            .count();

        for _ in 0..steps {
            for magnet in magnets.iter() {
                for id in &magnet.caught {
                    let Some(object) = objects.get(*id) else {
                        continue;
                    };
                    if let Some(impulse) = impulse_on(magnet, object) {
                        out.push(Command::ApplyImpulse {
                            object: object.id,
                            impulse,
                        });
                    }
                }
            }
        }
    }
}

/// Impulse `magnet` applies to `object`, or `None` when the object is not
/// magnetic or sits exactly on the magnet.
#[must_use]
pub fn impulse_on(magnet: &MagnetSnapshot, object: &ObjectSnapshot) -> Option<Vec2> {
    let polarity = object.polarity?;
    let away = (object.position - magnet.position).try_normalize()?;
    let direction = match magnet.polarity.interaction(polarity) {
        Interaction::Repel => away,
        Interaction::Attract => -away,
    };
    Some(direction * magnet.strength)
}
