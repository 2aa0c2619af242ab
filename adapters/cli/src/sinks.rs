//! Headless audio and score sinks that report through the log.

use merge_bubbles_settings::{Channel, VolumeSettings};
use merge_bubbles_simulation::{AudioSink, ScoreSink};

/// Logs every sound effect at the player's effective effect volume.
#[derive(Debug)]
pub(crate) struct LoggingAudio {
    volume: f32,
}

impl LoggingAudio {
    pub(crate) fn new(settings: &VolumeSettings) -> Self {
        Self {
            volume: settings.effective_volume(Channel::Sfx),
        }
    }
}

impl AudioSink for LoggingAudio {
    fn play_sfx(&mut self, name: &str) {
        if self.volume <= 0.0 {
            log::debug!("sfx {name} muted");
            return;
        }
        log::info!("sfx {name} at volume {:.2}", self.volume);
    }

    fn stop_sfx(&mut self, name: &str) {
        log::debug!("sfx {name} stopped");
    }
}

/// Logs the running score.
#[derive(Debug, Default)]
pub(crate) struct LoggingScore {
    total: u32,
}

impl ScoreSink for LoggingScore {
    fn increment_score(&mut self, amount: u32) {
        self.total = self.total.saturating_add(amount);
        log::debug!("score +{amount} = {}", self.total);
    }
}
