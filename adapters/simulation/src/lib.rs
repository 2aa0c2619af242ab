#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame driver wiring the world, every gameplay system and the outside world.
//!
//! [`Simulation::tick`] advances the clock by one frame: it runs as many fixed
//! physics steps as the frame covers, then a frame tick. Each step is pumped
//! to quiescence: events go to the systems, the systems answer with commands,
//! and the commands are applied to the world until no new events appear.
//! Audio, scoring and observers are fed from the same event stream.

mod config;
mod observers;

use std::time::Duration;

use glam::Vec2;
use merge_bubbles_core::{Command, Event, MagnetId, PlayMode};
use merge_bubbles_system_kinematics::Kinematics;
use merge_bubbles_system_largest_object::LargestObjectTracker;
use merge_bubbles_system_magnetism::Magnetism;
use merge_bubbles_system_merging::{AcceptancePredicate, Merging};
use merge_bubbles_system_progress::Progress;
use merge_bubbles_system_spawning::Spawning;
use merge_bubbles_world::{self as world, query, World};
use serde::Serialize;
use thiserror::Error;

pub use config::{
    AcceptanceSetting, ArenaConfig, BubbleConfig, ConfigError, ConsolidationSetting, GameConfig,
    KinematicsSettings, MagnetSettings, MergeSettings, ProgressSettings, SoftBodySettings,
    SpawnConfig, TimeConfig, TriggerSetting,
};
pub use observers::{Notification, Observer, Observers, SubscriptionId};

/// Sound played when bubbles start merging.
pub const MERGE_SOUND: &str = "Bubble Merge";
/// Sound looped while a magnet holds bubbles.
pub const WIND_SOUND: &str = "Wind Blowing";
/// Sound played on winning.
pub const VICTORY_SOUND: &str = "Victory";

/// Event rounds a single command may trigger before the pump gives up.
const MAX_PUMP_ROUNDS: usize = 32;

/// Fire-and-forget sound effect playback.
pub trait AudioSink {
    /// Starts the named sound effect.
    fn play_sfx(&mut self, name: &str);

    /// Stops the named sound effect if it is playing.
    fn stop_sfx(&mut self, name: &str);
}

/// Receives score increments.
pub trait ScoreSink {
    /// Adds `amount` to the displayed score.
    fn increment_score(&mut self, amount: u32);
}

/// Errors raised while assembling a [`Simulation`].
#[derive(Debug, Error)]
pub enum SimulationError {
    /// No audio sink was provided.
    #[error("simulation requires an audio sink")]
    MissingAudio,
    /// No score sink was provided.
    #[error("simulation requires a score sink")]
    MissingScore,
    /// The configuration was rejected.
    #[error("invalid game configuration")]
    Config(#[from] ConfigError),
}

/// Text shown once the game is won.
#[must_use]
pub fn win_message(score: u32) -> String {
    format!("You merged {score} bubbles!")
}

/// Collects the collaborators a [`Simulation`] needs.
pub struct SimulationBuilder {
    config: GameConfig,
    audio: Option<Box<dyn AudioSink>>,
    score: Option<Box<dyn ScoreSink>>,
    predicate: Option<AcceptancePredicate>,
}

impl SimulationBuilder {
    /// Starts a builder for the provided configuration.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            audio: None,
            score: None,
            predicate: None,
        }
    }

    /// Provides the audio sink.
    #[must_use]
    pub fn audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Provides the score sink.
    #[must_use]
    pub fn score(mut self, score: Box<dyn ScoreSink>) -> Self {
        self.score = Some(score);
        self
    }

    /// Installs an extra veto consulted before merges start.
    #[must_use]
    pub fn merge_predicate(mut self, predicate: AcceptancePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Validates the configuration, frames the arena and places the player magnet.
    pub fn build(self) -> Result<Simulation, SimulationError> {
        let audio = self.audio.ok_or(SimulationError::MissingAudio)?;
        let score = self.score.ok_or(SimulationError::MissingScore)?;
        self.config.validate()?;

        let mut merging = Merging::new(self.config.merging());
        if let Some(predicate) = self.predicate {
            merging = merging.with_predicate(predicate);
        }

        let mut simulation = Simulation {
            world: World::with_prefab(self.config.prefab()?),
            spawning: Spawning::new(self.config.spawning()),
            tracker: LargestObjectTracker::default(),
            merging,
            kinematics: Kinematics::new(self.config.kinematics()),
            magnetism: Magnetism::new(),
            progress: Progress::new(self.config.progress()),
            audio,
            score_sink: score,
            observers: Observers::new(),
            fixed_step: self.config.fixed_step(),
            max_steps_per_frame: self.config.time.max_steps_per_frame,
            accumulator: Duration::ZERO,
            elapsed: Duration::ZERO,
            player_magnet: None,
            held: 0,
            resume_to: None,
            won_announced: false,
            tally: Tally::default(),
        };

        let _ = simulation.execute(Command::ConfigureArena {
            camera: self.config.camera(),
        });
        if self.config.magnet.enabled {
            let placed = simulation.execute(Command::PlaceMagnet {
                position: self.config.magnet.start(),
                radius: self.config.magnet.radius,
                strength: self.config.magnet.strength,
                polarity: self.config.magnet.polarity,
            });
            simulation.player_magnet = placed.iter().find_map(|event| match event {
                Event::MagnetPlaced { magnet, .. } => Some(*magnet),
                _ => None,
            });
        }
        log::info!("{}", query::welcome_banner(&simulation.world));
        Ok(simulation)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    spawned: u32,
    merges: u32,
    score: u32,
}

/// End-of-run statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Simulated seconds.
    pub elapsed_secs: f32,
    /// Fixed physics steps processed.
    pub physics_steps: u64,
    /// Bubbles spawned.
    pub spawned: u32,
    /// Merges completed.
    pub merges: u32,
    /// Bubbles merged away.
    pub score: u32,
    /// Bubbles still in play.
    pub active_bubbles: usize,
    /// Bubbles the pool has created.
    pub pool_size: usize,
    /// Largest scale seen so far.
    pub largest_scale: f32,
    /// Fraction of the way to the win.
    pub progress: f32,
    /// Play mode at the end of the run.
    pub play_mode: PlayMode,
    /// Win text, once the game is won.
    pub message: Option<String>,
}

/// A running game.
pub struct Simulation {
    world: World,
    spawning: Spawning,
    tracker: LargestObjectTracker,
    merging: Merging,
    kinematics: Kinematics,
    magnetism: Magnetism,
    progress: Progress,
    audio: Box<dyn AudioSink>,
    score_sink: Box<dyn ScoreSink>,
    observers: Observers,
    fixed_step: Duration,
    max_steps_per_frame: u32,
    accumulator: Duration,
    elapsed: Duration,
    player_magnet: Option<MagnetId>,
    held: usize,
    resume_to: Option<PlayMode>,
    won_announced: bool,
    tally: Tally,
}

impl Simulation {
    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Bubbles merged away so far.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.tally.score
    }

    /// Adds an observer.
    pub fn subscribe(&mut self, observer: Box<dyn Observer>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Removes an observer; returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Advances the game by one frame lasting `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
        if query::play_mode(&self.world) != PlayMode::Paused {
            self.accumulator = self.accumulator.saturating_add(dt);
        }

        let mut steps = 0;
        while self.accumulator >= self.fixed_step && steps < self.max_steps_per_frame {
            self.accumulator -= self.fixed_step;
            steps += 1;
            let _ = self.execute(Command::FixedTick {
                dt: self.fixed_step,
            });
        }
        if self.accumulator >= self.fixed_step {
            log::debug!(
                "dropping {:?} of physics backlog after {steps} steps",
                self.accumulator
            );
            self.accumulator = Duration::ZERO;
        }

        let _ = self.execute(Command::Tick { dt });
    }

    /// Moves the player magnet; ignored when none was placed.
    pub fn move_player_magnet(&mut self, position: Vec2) {
        if let Some(magnet) = self.player_magnet {
            let _ = self.execute(Command::MoveMagnet { magnet, position });
        }
    }

    /// Freezes the game clock.
    pub fn pause(&mut self) {
        let mode = query::play_mode(&self.world);
        if mode == PlayMode::Paused {
            return;
        }
        self.resume_to = Some(mode);
        let _ = self.execute(Command::SetPlayMode {
            mode: PlayMode::Paused,
        });
    }

    /// Unfreezes the game clock, returning to the mode it was paused from.
    pub fn resume(&mut self) {
        if query::play_mode(&self.world) != PlayMode::Paused {
            return;
        }
        let mode = self.resume_to.take().unwrap_or(PlayMode::Playing);
        let _ = self.execute(Command::SetPlayMode { mode });
    }

    /// Returns to play after a win.
    pub fn restart(&mut self) {
        if query::play_mode(&self.world) != PlayMode::Won {
            return;
        }
        self.won_announced = false;
        let _ = self.execute(Command::SetPlayMode {
            mode: PlayMode::Playing,
        });
    }

    /// Statistics for the run so far.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let play_mode = query::play_mode(&self.world);
        Summary {
            elapsed_secs: self.elapsed.as_secs_f32(),
            physics_steps: query::physics_steps(&self.world),
            spawned: self.tally.spawned,
            merges: self.tally.merges,
            score: self.tally.score,
            active_bubbles: query::active_count(&self.world),
            pool_size: query::pool_size(&self.world),
            largest_scale: self.tracker.record().scale,
            progress: self.progress.fraction(),
            play_mode,
            message: (play_mode == PlayMode::Won).then(|| win_message(self.tally.score)),
        }
    }

    /// Applies `command` and pumps the resulting events to quiescence.
    ///
    /// Returns every event observed along the way.
    fn execute(&mut self, command: Command) -> Vec<Event> {
        let mut log = Vec::new();
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut rounds = 0;
        while !events.is_empty() {
            rounds += 1;
            if rounds > MAX_PUMP_ROUNDS {
                log::warn!(
                    "dropping {} events after {MAX_PUMP_ROUNDS} pump rounds",
                    events.len()
                );
                break;
            }

            let objects = query::object_view(&self.world);
            let mut derived = Vec::new();
            self.tracker.handle(&events, &objects, &mut derived);
            events.extend(derived);
            self.react(&events);

            let play_mode = query::play_mode(&self.world);
            let magnets = query::magnet_view(&self.world);
            let walls = query::walls(&self.world);
            let mut commands = Vec::new();
            self.spawning.handle(
                &events,
                play_mode,
                |center, radius| query::is_area_occupied(&self.world, center, radius),
                &mut commands,
            );
            self.merging
                .handle(&events, play_mode, &objects, &mut commands);
            self.kinematics
                .handle(&events, play_mode, &objects, walls, &mut commands);
            self.magnetism
                .handle(&events, play_mode, &magnets, &objects, &mut commands);
            self.progress.handle(&events, play_mode, &mut commands);

            log.append(&mut events);
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
        log
    }

    fn react(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::ObjectSpawned { .. } => self.tally.spawned += 1,
                Event::MergeStarted { .. } => self.audio.play_sfx(MERGE_SOUND),
                Event::MergeCompleted { survivor, absorbed } => {
                    let gained = u32::try_from(absorbed.len()).unwrap_or(u32::MAX);
                    self.tally.merges += 1;
                    self.tally.score = self.tally.score.saturating_add(gained);
                    if gained > 0 {
                        self.score_sink.increment_score(gained);
                    }
                    self.observers.notify(&Notification::MergeCompleted {
                        survivor: *survivor,
                        absorbed: absorbed.clone(),
                    });
                }
                Event::NewLargestObject { object, scale } => {
                    self.observers.notify(&Notification::NewLargestObject {
                        object: *object,
                        scale: *scale,
                    });
                }
                Event::MagnetCaught { .. } => {
                    self.held += 1;
                    if self.held == 1 {
                        self.audio.play_sfx(WIND_SOUND);
                    }
                }
                Event::MagnetReleased { .. } => {
                    if self.held == 1 {
                        self.audio.stop_sfx(WIND_SOUND);
                    }
                    self.held = self.held.saturating_sub(1);
                }
                Event::PlayModeChanged {
                    mode: PlayMode::Won,
                } if !self.won_announced => {
                    self.won_announced = true;
                    log::info!("{}", win_message(self.tally.score));
                    self.audio.play_sfx(VICTORY_SOUND);
                    self.observers.notify(&Notification::Won {
                        score: self.tally.score,
                    });
                }
                _ => {}
            }
        }
    }
}
