//! Choreography rules keyed by beat position
//!
//! Rules are authored per song in the choreography table. Beat positions are
//! fractional (`3.5` is the middle of beat 3); `-1` is the pre-song sentinel
//! beat and an `end` of `.inf` leaves a range open to the end of the song.

use serde::{Deserialize, Serialize};

fn open_end() -> f64 {
    f64::INFINITY
}

/// Range of beat positions `[start, end)`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BeatRange {
    pub start: f64,
    #[serde(default = "open_end")]
    pub end: f64,
}

impl BeatRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The catch-all range `[-1, +inf)`
    pub fn whole_song() -> Self {
        Self::new(-1.0, f64::INFINITY)
    }

    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position < self.end
    }

    /// Both ends inclusive; used for integer beat indices by light rules
    pub fn contains_inclusive(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Loop `clip` over cycles of `cycle_beats` beats while the position is in `beat`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRule {
    pub beat: BeatRange,
    pub clip: String,
    pub cycle_beats: f64,
}

impl ActionRule {
    pub fn new(beat: BeatRange, clip: &str, cycle_beats: f64) -> Self {
        Self {
            beat,
            clip: clip.to_string(),
            cycle_beats,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct IntensityRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct LightColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Stage light pulse settings for a range of beat indices
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LightRule {
    pub beat: BeatRange,
    pub intensity: IntensityRange,
    pub color: LightColor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beat_range_half_open() {
        let range = BeatRange::new(-1.0, 0.0);
        assert!(range.contains(-1.0));
        assert!(range.contains(-0.01));
        assert!(!range.contains(0.0));
        assert!(range.contains_inclusive(0.0));
    }

    #[test]
    fn test_open_end_deserializes_as_infinity() {
        let range: BeatRange = serde_yaml::from_str("start: 544").unwrap();
        assert!(range.end.is_infinite());
        let range: BeatRange = serde_yaml::from_str("{start: -1, end: .inf}").unwrap();
        assert!(range.contains(1.0e9));
    }
}
