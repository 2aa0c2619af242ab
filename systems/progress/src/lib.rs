#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Background progress toward the win condition.
//!
//! Every completed merge scrolls the background a little further. Once the
//! scroll offset reaches the end of the backdrop the system declares the win.
//! A restart (switching back to [`PlayMode::Playing`] after a win) rewinds
//! the backdrop to the start.

use merge_bubbles_core::{Command, Event, PlayMode};

/// Configuration parameters required to construct the progress system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    advance_per_merge: f32,
    end_offset: f32,
}

impl Config {
    /// Creates a configuration that advances by `advance_per_merge` until `end_offset`.
    #[must_use]
    pub const fn new(advance_per_merge: f32, end_offset: f32) -> Self {
        Self {
            advance_per_merge,
            end_offset,
        }
    }

    /// Distance the backdrop scrolls per completed merge.
    #[must_use]
    pub const fn advance_per_merge(&self) -> f32 {
        self.advance_per_merge
    }

    /// Offset at which the game is won.
    #[must_use]
    pub const fn end_offset(&self) -> f32 {
        self.end_offset
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1.0, 50.0)
    }
}

/// Pure system that scrolls the backdrop and declares the win.
#[derive(Debug)]
pub struct Progress {
    config: Config,
    offset: f32,
    declared: bool,
}

impl Progress {
    /// Creates a new progress system positioned at the start of the backdrop.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            offset: 0.0,
            declared: false,
        }
    }

    /// Current scroll offset.
    #[must_use]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Fraction of the backdrop scrolled so far, clamped to `0..=1`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.config.end_offset <= 0.0 {
            return 1.0;
        }
        (self.offset / self.config.end_offset).clamp(0.0, 1.0)
    }

    /// Consumes events to advance the backdrop and emit the win declaration.
    pub fn handle(&mut self, events: &[Event], play_mode: PlayMode, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::MergeCompleted { .. } if play_mode == PlayMode::Playing => {
                    self.offset += self.config.advance_per_merge;
                }
                Event::PlayModeChanged {
                    mode: PlayMode::Playing,
                } if self.declared => {
                    log::info!("restarting progress after win");
                    self.offset = 0.0;
                    self.declared = false;
                }
                _ => {}
            }
        }

        if !self.declared && play_mode == PlayMode::Playing && self.offset >= self.config.end_offset
        {
            log::info!("backdrop reached offset {}; declaring win", self.offset);
            self.declared = true;
            out.push(Command::DeclareWin);
        }
    }
}
