#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless Merge Bubbles session.

mod pilot;
mod sinks;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use merge_bubbles_settings::{Channel, MemoryPreferences, TomlPreferences, VolumeSettings};
use merge_bubbles_simulation::{
    AcceptanceSetting, GameConfig, SimulationBuilder, SoftBodySettings,
};

use crate::{
    pilot::OrbitPilot,
    sinks::{LoggingAudio, LoggingScore},
};

/// Headless Merge Bubbles session runner.
#[derive(Parser, Debug)]
#[command(author, version, about = "Plays a headless Merge Bubbles session", long_about = None)]
struct Args {
    /// TOML game configuration; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Player preference file holding the mixer settings.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Saves a new effect volume into the preference file before playing.
    #[arg(long)]
    sfx_volume: Option<f32>,
    /// Simulated seconds to play.
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,
    /// Frames per simulated second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Overrides the spawn placement seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Uses spring-mesh bubbles instead of rigid ones.
    #[arg(long)]
    soft_body: bool,
    /// Refuses merges involving any bubble that is already merging.
    #[arg(long)]
    strict_merging: bool,
    /// Leaves the player magnet out.
    #[arg(long)]
    no_magnet: bool,
    /// Angular speed of the scripted magnet in radians per second.
    #[arg(long, default_value_t = 0.5)]
    orbit_speed: f32,
    /// Prints the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Merge Bubbles command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading game config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.spawning.seed = seed;
    }
    if args.soft_body && config.bubble.soft_body.is_none() {
        config.bubble.soft_body = Some(SoftBodySettings::default());
    }
    if args.strict_merging {
        config.merging.acceptance = AcceptanceSetting::Strict;
    }
    if args.no_magnet {
        config.magnet.enabled = false;
    }

    let volume = load_volume(&args)?;
    let camera = config.camera();
    let mut simulation = SimulationBuilder::new(config)
        .audio(Box::new(LoggingAudio::new(&volume)))
        .score(Box::new(LoggingScore::default()))
        .build()
        .context("assembling simulation")?;

    let fps = args.fps.max(1);
    let frame = Duration::from_secs_f64(1.0 / f64::from(fps));
    let frames = (args.seconds.max(0.0) * fps as f32).round() as u64;
    let pilot = (!args.no_magnet).then(|| OrbitPilot::new(&camera, args.orbit_speed));
    for index in 0..frames {
        if let Some(pilot) = &pilot {
            simulation.move_player_magnet(pilot.position(index as f32 / fps as f32));
        }
        simulation.tick(frame);
    }

    let summary = simulation.summary();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("encoding summary")?
        );
    } else {
        println!("played {:.1}s over {} physics steps", summary.elapsed_secs, summary.physics_steps);
        println!(
            "spawned {} bubbles, completed {} merges, {} still in play",
            summary.spawned, summary.merges, summary.active_bubbles
        );
        println!(
            "largest bubble {:.2}, progress {:.0}%",
            summary.largest_scale,
            summary.progress * 100.0
        );
        if let Some(message) = &summary.message {
            println!("{message}");
        }
    }
    Ok(())
}

/// Reads the mixer settings, saving a new effect volume first when one was given.
fn load_volume(args: &Args) -> Result<VolumeSettings> {
    let Some(path) = &args.settings else {
        let mut settings = VolumeSettings::load(&MemoryPreferences::new());
        if let Some(volume) = args.sfx_volume {
            settings.set_volume(Channel::Sfx, volume);
        }
        return Ok(settings);
    };

    let mut preferences = TomlPreferences::open(path)
        .with_context(|| format!("opening preferences {}", path.display()))?;
    let mut settings = VolumeSettings::load(&preferences);
    if let Some(volume) = args.sfx_volume {
        settings.set_volume(Channel::Sfx, volume);
        settings.store(&mut preferences);
        preferences
            .save()
            .with_context(|| format!("saving preferences {}", preferences.path().display()))?;
    }
    Ok(settings)
}
