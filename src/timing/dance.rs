//! Dance clip driver and eye blinks for the avatar

use std::cell::RefCell;
use std::rc::Rc;
use serde::Serialize;
use crate::models::config::BlinkConfig;
use super::action_cycle::{ActionCycleResolver, CycleSpan, ResolvedAction};
use super::beat_index::BeatIndex;

/// What the host animation mixer should do this frame
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DanceFrame {
    pub clip: String,
    /// Switch the mixer to `clip`
    pub clip_changed: bool,
    /// Re-apply `duration_ms` to the clip
    pub duration_changed: bool,
    pub duration_ms: f64,
    pub offset_ms: f64,
    pub cycle: CycleSpan,
}

/// Applies the re-trigger policy on top of `ActionCycleResolver`
///
/// The clip duration is only recomputed when the clip or the repetition
/// changes; in between the host just advances the clip offset.
#[derive(Debug, Default)]
pub struct DanceDriver {
    previous: Option<ResolvedAction>,
    last_frame: Option<DanceFrame>,
}

impl DanceDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the frame at `seek_time`
    ///
    /// When no beat or no rule can be resolved the previous frame is
    /// returned unchanged (with both change flags cleared).
    pub fn update(&mut self, resolver: &ActionCycleResolver, beats: &BeatIndex, seek_time: f64) -> Option<DanceFrame> {
        let Some(position) = beats.position_at(seek_time) else {
            return self.frozen();
        };

        let action = match resolver.resolve(beats, position) {
            Ok(action) => action,
            Err(err) => {
                log::error!("{}; holding the current dance clip", err);
                return self.frozen();
            }
        };

        let clip_changed = self
            .previous
            .as_ref()
            .map_or(true, |previous| previous.clip != action.clip);
        let duration_changed = clip_changed
            || self
                .previous
                .as_ref()
                .map_or(true, |previous| previous.cycle_start_beat != action.cycle_start_beat);

        if clip_changed {
            log::debug!("dance clip -> {} at beat {:.2}", action.clip, position);
        }

        let frame = DanceFrame {
            clip: action.clip.clone(),
            clip_changed,
            duration_changed,
            duration_ms: action.span.duration(),
            offset_ms: action.span.offset(seek_time),
            cycle: action.span,
        };
        self.previous = Some(action);
        self.last_frame = Some(frame.clone());
        Some(frame)
    }

    fn frozen(&self) -> Option<DanceFrame> {
        self.last_frame.clone().map(|frame| DanceFrame {
            clip_changed: false,
            duration_changed: false,
            ..frame
        })
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.last_frame = None;
    }
}

/// Source of uniform random numbers in `[0, 1)`
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// One random source drawn from by several components
#[derive(Clone)]
pub struct SharedRandom(Rc<RefCell<Box<dyn RandomSource>>>);

impl SharedRandom {
    pub fn new(source: Box<dyn RandomSource>) -> Self {
        Self(Rc::new(RefCell::new(source)))
    }
}

impl RandomSource for SharedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.borrow_mut().next_unit()
    }
}

/// Randomness from the platform (`crypto.getRandomValues` on the web)
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn next_unit(&mut self) -> f64 {
        let mut bytes = [0u8; 8];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64,
            Err(err) => {
                log::warn!("random source unavailable: {}", err);
                0.5
            }
        }
    }
}

/// Schedules eye blinks at random intervals
#[derive(Debug)]
pub struct BlinkScheduler<R: RandomSource = OsRandom> {
    config: BlinkConfig,
    schedule_base: f64,
    blink_at: f64,
    random: R,
}

impl BlinkScheduler<OsRandom> {
    pub fn new(config: BlinkConfig) -> Self {
        Self::with_random(config, OsRandom)
    }
}

impl<R: RandomSource> BlinkScheduler<R> {
    pub fn with_random(config: BlinkConfig, random: R) -> Self {
        Self {
            schedule_base: 0.0,
            blink_at: config.first_blink_ms,
            config,
            random,
        }
    }

    /// Blink morph weight at `seek_time`, 0 (open) to 1 (closed)
    pub fn update(&mut self, seek_time: f64) -> f64 {
        let duration = self.config.duration_ms;
        if self.blink_at < seek_time && seek_time < self.blink_at + duration {
            let progress = (seek_time - self.blink_at) / duration;
            return 1.0 - (progress - 0.5).abs() * 2.0;
        }

        // Reschedule once the blink is over or after a backwards seek
        if self.blink_at + duration <= seek_time || seek_time < self.schedule_base {
            self.schedule_base = seek_time;
            self.blink_at = seek_time + self.random.next_unit() * self.config.max_interval_ms;
        }
        0.0
    }

    pub fn next_blink_at(&self) -> f64 {
        self.blink_at
    }

    pub fn reset(&mut self) {
        self.schedule_base = 0.0;
        self.blink_at = self.config.first_blink_ms;
    }
}
