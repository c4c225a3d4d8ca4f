//! Beat intervals
//!
//! Raw beats arrive from the analysis service with sub-millisecond times.
//! `Beat` is the rounded, integral-millisecond view handed to consumers.

use serde::{Deserialize, Serialize};

/// A beat as delivered by the analysis service
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBeat {
    pub start_time: f64,
    pub end_time: f64,
}

impl RawBeat {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self { start_time, end_time }
    }
}

/// A rounded beat interval `[start, end)` in whole milliseconds
///
/// `index` is `-1` for the pre-song sentinel, `beat_count` for the
/// post-song sentinel and `0..beat_count` for real beats.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Beat {
    pub index: i64,
    pub start: i64,
    pub end: i64,
}

impl Beat {
    pub fn new(index: i64, start: i64, end: i64) -> Self {
        Self { index, start, end }
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Start-inclusive, end-exclusive membership
    pub fn contains(&self, time: f64) -> bool {
        self.start as f64 <= time && time < self.end as f64
    }

    /// Fraction of the beat elapsed at `time`; zero for an empty interval
    pub fn progress(&self, time: f64) -> f64 {
        let duration = self.duration();
        if duration <= 0 {
            return 0.0;
        }
        (time - self.start as f64) / duration as f64
    }

    /// Integer index plus the fractional offset inside the beat
    pub fn position(&self, time: f64) -> f64 {
        self.index as f64 + self.progress(time)
    }
}

/// Round a service timestamp to a whole millisecond
pub fn round_ms(time: f64) -> i64 {
    time.round() as i64
}
