//! Tunable game configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use glam::Vec2;
use merge_bubbles_core::{Camera, Polarity};
use merge_bubbles_softbody::SoftBodyConfig;
use merge_bubbles_system_kinematics::Config as KinematicsConfig;
use merge_bubbles_system_merging::{
    Config as MergingConfig, Consolidation, MergeAcceptance, MergeTrigger,
};
use merge_bubbles_system_progress::Config as ProgressConfig;
use merge_bubbles_system_spawning::Config as SpawningConfig;
use merge_bubbles_world::{BodyTemplate, Prefab};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for this schema.
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    /// Soft-body tuning was rejected.
    #[error(transparent)]
    SoftBody(#[from] merge_bubbles_softbody::ConfigError),
    /// A value is outside its supported range.
    #[error("{field} {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Visible arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Half of the visible height in world units.
    pub half_height: f32,
    /// Width divided by height.
    pub aspect: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            half_height: camera.half_height,
            aspect: camera.aspect,
        }
    }
}

/// Simulation clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Length of one physics step in seconds.
    pub fixed_step_secs: f32,
    /// Physics steps allowed per frame before the backlog is dropped.
    pub max_steps_per_frame: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            fixed_step_secs: 0.02,
            max_steps_per_frame: 8,
        }
    }
}

/// Soft-body representation of bubbles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftBodySettings {
    /// Points around the ring.
    pub point_count: usize,
    /// Mass of every point.
    pub point_mass: f32,
    /// Whether cross-ring springs stiffen the ring.
    pub diagonals: bool,
}

impl Default for SoftBodySettings {
    fn default() -> Self {
        Self {
            point_count: merge_bubbles_softbody::DEFAULT_POINT_COUNT,
            point_mass: 1.0,
            diagonals: true,
        }
    }
}

/// Bubble prefab.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    /// Scale new bubbles spawn at.
    pub scale: f32,
    /// Whether bubbles react to magnets.
    pub magnetic: bool,
    /// Magnetic polarity of magnetic bubbles.
    pub polarity: Polarity,
    /// Pool members created up front.
    pub pool_size: usize,
    /// Soft-body tuning; omit for rigid bubbles.
    pub soft_body: Option<SoftBodySettings>,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        let prefab = Prefab::default();
        Self {
            scale: prefab.scale(),
            magnetic: true,
            polarity: Polarity::Positive,
            pool_size: prefab.starting_count(),
            soft_body: None,
        }
    }
}

/// Spawner timing and placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Interval between spawns before any acceleration.
    pub base_interval_secs: f32,
    /// Shortest interval the spawner accelerates to.
    pub min_interval_secs: f32,
    /// Divisor growth per new largest bubble.
    pub divisor_increment: f32,
    /// Clearance radius probed around candidate points.
    pub scan_radius: f32,
    /// Candidate points drawn before giving up.
    pub max_attempts: u32,
    /// Bubbles spawned as soon as the arena is configured.
    pub starting_count: usize,
    /// Seed for spawn placement.
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 2.0,
            min_interval_secs: 0.5,
            divisor_increment: 0.1,
            scan_radius: 1.0,
            max_attempts: 50,
            starting_count: 2,
            seed: 0x6d65_7267_655f_6275,
        }
    }
}

/// Acceptance rule names accepted in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceSetting {
    /// See [`MergeAcceptance::Strict`].
    Strict,
    /// See [`MergeAcceptance::Relaxed`].
    Relaxed,
}

/// Member search names accepted in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSetting {
    /// See [`MergeTrigger::Collision`].
    Collision,
    /// See [`MergeTrigger::Overlap`].
    Overlap,
}

/// Consolidation names accepted in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationSetting {
    /// See [`Consolidation::IntoSurvivor`].
    Survivor,
    /// See [`Consolidation::Centroid`].
    Centroid,
}

/// Merge engine tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Animation progress per second.
    pub speed: f32,
    /// Multiplier turning the merged radius into a scale.
    pub multiplier: f32,
    /// Radius scanned for extra members.
    pub detection_range: f32,
    /// Whether the scan radius grows with the initiating bubble.
    pub scale_range_with_size: bool,
    /// Which bubbles may start a merge.
    pub acceptance: AcceptanceSetting,
    /// Where extra members are searched for.
    pub trigger: TriggerSetting,
    /// Where the merged bubble ends up.
    pub consolidation: ConsolidationSetting,
    /// Whether absorbed members move in proportion to their size.
    pub stagger: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            speed: 5.0,
            multiplier: 2.0,
            detection_range: 1.0,
            scale_range_with_size: false,
            acceptance: AcceptanceSetting::Relaxed,
            trigger: TriggerSetting::Collision,
            consolidation: ConsolidationSetting::Survivor,
            stagger: true,
        }
    }
}

/// Drag and wall bounce tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsSettings {
    /// Quadratic drag coefficient.
    pub drag: f32,
    /// Multiplier applied to velocity every step.
    pub velocity_multiplier: f32,
    /// Whether drag is scaled by a mass derived from scale.
    pub apply_mass: bool,
}

impl Default for KinematicsSettings {
    fn default() -> Self {
        Self {
            drag: 1.0,
            velocity_multiplier: 1.0,
            apply_mass: true,
        }
    }
}

/// Background progress toward the win.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    /// Scroll per completed merge.
    pub advance_per_merge: f32,
    /// Scroll offset at which the game is won.
    pub end_offset: f32,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        let config = ProgressConfig::default();
        Self {
            advance_per_merge: config.advance_per_merge(),
            end_offset: config.end_offset(),
        }
    }
}

/// Magnet that follows the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetSettings {
    /// Whether the player magnet is placed at all.
    pub enabled: bool,
    /// Starting position.
    pub position: [f32; 2],
    /// Trigger radius.
    pub radius: f32,
    /// Impulse applied per physics step.
    pub strength: f32,
    /// Polarity of the magnet.
    pub polarity: Polarity,
}

impl MagnetSettings {
    /// Starting position as a vector.
    #[must_use]
    pub fn start(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }
}

impl Default for MagnetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            position: [0.0, 0.0],
            radius: 1.5,
            strength: 5.0,
            polarity: Polarity::Positive,
        }
    }
}

/// Complete game configuration; every section and field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Visible arena.
    pub arena: ArenaConfig,
    /// Simulation clock.
    pub time: TimeConfig,
    /// Bubble prefab.
    pub bubble: BubbleConfig,
    /// Spawner.
    pub spawning: SpawnConfig,
    /// Merge engine.
    pub merging: MergeSettings,
    /// Drag and wall bounces.
    pub kinematics: KinematicsSettings,
    /// Win progress.
    pub progress: ProgressSettings,
    /// Player magnet.
    pub magnet: MagnetSettings,
}

impl GameConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects values no simulation can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (self.arena.half_height, "arena.half_height"),
            (self.arena.aspect, "arena.aspect"),
            (self.time.fixed_step_secs, "time.fixed_step_secs"),
            (self.bubble.scale, "bubble.scale"),
            (self.spawning.base_interval_secs, "spawning.base_interval_secs"),
        ];
        for (value, field) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive",
                });
            }
        }
        if !(self.spawning.min_interval_secs.is_finite() && self.spawning.min_interval_secs >= 0.0)
        {
            return Err(ConfigError::Invalid {
                field: "spawning.min_interval_secs",
                reason: "must not be negative",
            });
        }
        if self.time.max_steps_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "time.max_steps_per_frame",
                reason: "must allow at least one step",
            });
        }
        let _ = self.prefab()?;
        Ok(())
    }

    /// Camera framing the arena.
    #[must_use]
    pub fn camera(&self) -> Camera {
        Camera::new(self.arena.half_height, self.arena.aspect)
    }

    /// Length of one physics step.
    #[must_use]
    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs_f32(self.time.fixed_step_secs.max(0.0))
    }

    /// Prefab the object pool instantiates.
    pub fn prefab(&self) -> Result<Prefab, ConfigError> {
        let body = match &self.bubble.soft_body {
            None => BodyTemplate::Rigid,
            Some(settings) => BodyTemplate::Soft(
                SoftBodyConfig::new(settings.point_count)?
                    .with_point_mass(settings.point_mass)?
                    .with_diagonals(settings.diagonals),
            ),
        };
        Ok(Prefab::new(self.bubble.scale)
            .with_body(body)
            .with_polarity(self.bubble.magnetic.then_some(self.bubble.polarity))
            .with_starting_count(self.bubble.pool_size))
    }

    /// Spawner configuration.
    #[must_use]
    pub fn spawning(&self) -> SpawningConfig {
        let spawn = &self.spawning;
        SpawningConfig::new(
            Duration::from_secs_f32(spawn.base_interval_secs.max(0.0)),
            spawn.seed,
        )
        .with_min_interval(Duration::from_secs_f32(spawn.min_interval_secs.max(0.0)))
        .with_divisor_increment(spawn.divisor_increment)
        .with_scan_radius(spawn.scan_radius)
        .with_max_attempts(spawn.max_attempts)
        .with_starting_count(spawn.starting_count)
    }

    /// Merge engine configuration.
    #[must_use]
    pub fn merging(&self) -> MergingConfig {
        let merge = &self.merging;
        MergingConfig::new(merge.speed, merge.multiplier)
            .with_detection_range(merge.detection_range, merge.scale_range_with_size)
            .with_acceptance(match merge.acceptance {
                AcceptanceSetting::Strict => MergeAcceptance::Strict,
                AcceptanceSetting::Relaxed => MergeAcceptance::Relaxed,
            })
            .with_trigger(match merge.trigger {
                TriggerSetting::Collision => MergeTrigger::Collision,
                TriggerSetting::Overlap => MergeTrigger::Overlap,
            })
            .with_consolidation(match merge.consolidation {
                ConsolidationSetting::Survivor => Consolidation::IntoSurvivor,
                ConsolidationSetting::Centroid => Consolidation::Centroid,
            })
            .with_stagger(merge.stagger)
    }

    /// Kinematics configuration.
    #[must_use]
    pub fn kinematics(&self) -> KinematicsConfig {
        KinematicsConfig::new(self.kinematics.drag, self.kinematics.velocity_multiplier)
            .with_apply_mass(self.kinematics.apply_mass)
    }

    /// Progress configuration.
    #[must_use]
    pub fn progress(&self) -> ProgressConfig {
        ProgressConfig::new(self.progress.advance_per_merge, self.progress.end_offset)
    }
}
