//! Song loudness curve

use serde::{Deserialize, Serialize};

/// Loudness sampled at a fixed interval from the start of the song
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTrack {
    #[serde(default)]
    pub interval_ms: f64,
    #[serde(default)]
    pub samples: Vec<f64>,
}

impl VolumeTrack {
    pub fn new(interval_ms: f64, samples: Vec<f64>) -> Self {
        Self { interval_ms, samples }
    }

    /// Sample `volume_at` every `interval_ms` over `[0, duration]`
    pub fn sample(duration: f64, interval_ms: f64, volume_at: impl Fn(f64) -> f64) -> Self {
        if !(interval_ms > 0.0) || !duration.is_finite() || duration < 0.0 {
            return Self::default();
        }
        let count = (duration / interval_ms).floor() as usize + 1;
        let samples = (0..count).map(|i| volume_at(i as f64 * interval_ms)).collect();
        Self { interval_ms, samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample holding at `time`; 0 outside the track
    pub fn at(&self, time: f64) -> f64 {
        if !(self.interval_ms > 0.0) || !time.is_finite() || time < 0.0 {
            return 0.0;
        }
        let index = (time / self.interval_ms).floor() as usize;
        self.samples.get(index).copied().unwrap_or(0.0)
    }

    /// Loudest sample
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }
}
