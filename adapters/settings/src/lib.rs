#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player preferences for Merge Bubbles.
//!
//! Preferences are a flat key/value table. [`VolumeSettings`] reads and writes
//! the audio mixer keys through any [`PreferenceStore`].

mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use store::{MemoryPreferences, PreferenceStore, PreferenceValue, TomlPreferences};

/// Key holding the master volume.
pub const GLOBAL_VOLUME_KEY: &str = "globalVolume";
/// Key holding the music volume.
pub const MUSIC_VOLUME_KEY: &str = "musicVolume";
/// Key holding the sound effect volume.
pub const SFX_VOLUME_KEY: &str = "sfxVolume";
/// Key holding the master mute flag.
pub const GLOBAL_MUTED_KEY: &str = "globalIsMuted";
/// Key holding the music mute flag.
pub const MUSIC_MUTED_KEY: &str = "musicIsMuted";
/// Key holding the sound effect mute flag.
pub const SFX_MUTED_KEY: &str = "sfxIsMuted";

const DEFAULT_VOLUME: f32 = 1.0;

/// Errors raised while loading or saving preferences.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The preference file could not be read or written.
    #[error("failed to access preferences at {path}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The preference file is not a flat TOML table of numbers and flags.
    #[error("failed to parse preferences at {path}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
    /// Preferences could not be encoded as TOML.
    #[error("failed to encode preferences")]
    Encode(#[from] toml::ser::Error),
}

/// Audio mixer channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Master channel scaling both others.
    Global,
    /// Background music.
    Music,
    /// Sound effects.
    Sfx,
}

impl Channel {
    const fn volume_key(self) -> &'static str {
        match self {
            Self::Global => GLOBAL_VOLUME_KEY,
            Self::Music => MUSIC_VOLUME_KEY,
            Self::Sfx => SFX_VOLUME_KEY,
        }
    }

    const fn muted_key(self) -> &'static str {
        match self {
            Self::Global => GLOBAL_MUTED_KEY,
            Self::Music => MUSIC_MUTED_KEY,
            Self::Sfx => SFX_MUTED_KEY,
        }
    }
}

/// Volume and mute state of a single channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSettings {
    /// Volume in `0..=1`.
    pub volume: f32,
    /// Whether the channel is silenced.
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
        }
    }
}

/// Mixer settings for every channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeSettings {
    global: ChannelSettings,
    music: ChannelSettings,
    sfx: ChannelSettings,
}

impl VolumeSettings {
    /// Reads every channel from `store`, falling back to full volume and unmuted.
    #[must_use]
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let read = |channel: Channel| ChannelSettings {
            volume: store
                .float(channel.volume_key())
                .unwrap_or(DEFAULT_VOLUME)
                .clamp(0.0, 1.0),
            muted: store.bool(channel.muted_key()).unwrap_or(false),
        };
        Self {
            global: read(Channel::Global),
            music: read(Channel::Music),
            sfx: read(Channel::Sfx),
        }
    }

    /// Writes every channel into `store`.
    pub fn store(&self, store: &mut dyn PreferenceStore) {
        for channel in [Channel::Global, Channel::Music, Channel::Sfx] {
            let settings = self.channel(channel);
            store.set_float(channel.volume_key(), settings.volume);
            store.set_bool(channel.muted_key(), settings.muted);
        }
    }

    /// Settings of a single channel.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> ChannelSettings {
        match channel {
            Channel::Global => self.global,
            Channel::Music => self.music,
            Channel::Sfx => self.sfx,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelSettings {
        match channel {
            Channel::Global => &mut self.global,
            Channel::Music => &mut self.music,
            Channel::Sfx => &mut self.sfx,
        }
    }

    /// Sets a channel's volume, clamped to `0..=1`. Moving a slider unmutes the channel.
    pub fn set_volume(&mut self, channel: Channel, volume: f32) {
        let settings = self.channel_mut(channel);
        settings.volume = volume.clamp(0.0, 1.0);
        settings.muted = false;
    }

    /// Mutes or unmutes a channel.
    pub fn set_muted(&mut self, channel: Channel, muted: bool) {
        self.channel_mut(channel).muted = muted;
    }

    /// Volume a channel actually plays at once the master channel is applied.
    #[must_use]
    pub fn effective_volume(&self, channel: Channel) -> f32 {
        let own = self.channel(channel);
        if self.global.muted || own.muted {
            return 0.0;
        }
        match channel {
            Channel::Global => self.global.volume,
            Channel::Music | Channel::Sfx => self.global.volume * own.volume,
        }
    }
}
