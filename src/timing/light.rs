//! Stage light pulsing on the beat

use serde::Serialize;
use crate::error::StageError;
use crate::models::action::{LightColor, LightRule};
use super::beat_index::{BeatIndex, BEFORE_SONG};

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct LightFrame {
    pub intensity: f64,
    pub color: LightColor,
}

/// Light intensity over each beat
///
/// The first half of a beat falls from the previous beat's peak to the
/// current rule's minimum; the second half rises back to the maximum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightTracker {
    rules: Vec<LightRule>,
}

impl LightTracker {
    pub fn new(rules: Vec<LightRule>) -> Self {
        Self { rules }
    }

    fn rule_for(&self, beat_index: i64) -> Option<&LightRule> {
        self.rules
            .iter()
            .find(|rule| rule.beat.contains_inclusive(beat_index as f64))
    }

    pub fn update(&self, beats: &BeatIndex, seek_time: f64) -> Option<LightFrame> {
        let beat = beats.get_by_seek_time(seek_time)?;
        let Some(now) = self.rule_for(beat.index) else {
            log::warn!("{} (light)", StageError::NoMatchingRule(beat.index as f64));
            return None;
        };

        let progress = beat.progress(seek_time);
        let low = now.intensity.min;
        let intensity = if progress < 0.5 {
            let previous = if beat.index != BEFORE_SONG {
                self.rule_for(beat.index - 1)
            } else {
                self.rules.first()
            };
            let peak = previous.unwrap_or(now).intensity.max;
            low + (peak - low) * (0.5 - progress) * 2.0
        } else {
            low + (now.intensity.max - low) * (progress - 0.5) * 2.0
        };

        Some(LightFrame { intensity, color: now.color })
    }
}
