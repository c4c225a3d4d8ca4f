//! Stage configuration
//!
//! Every field has a default so hosts only pass what they want to change.

use serde::{Deserialize, Serialize};
use crate::error::LoadError;

fn default_lookahead_ms() -> f64 {
    1500.0
}

fn default_scroll_speed() -> f64 {
    10.0
}

fn default_score_width() -> f64 {
    8.0
}

fn default_marker_pool_size() -> usize {
    100
}

fn default_lyric_window_ms() -> f64 {
    1500.0
}

fn default_lyric_travel() -> f64 {
    12.0
}

fn default_lane_order() -> Vec<u8> {
    vec![0, 3, 1, 4, 2]
}

fn default_punctuation() -> Vec<String> {
    ["!", "！", "?", "？", "(", "（", ")", "）", "「", "」"]
        .iter()
        .map(|mark| mark.to_string())
        .collect()
}

/// Random eye-blink timing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BlinkConfig {
    /// Time of the first blink after a song starts
    pub first_blink_ms: f64,
    pub duration_ms: f64,
    /// Upper bound of the random gap between blinks
    pub max_interval_ms: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            first_blink_ms: 3000.0,
            duration_ms: 200.0,
            max_interval_ms: 6000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    /// How far ahead of the playback position the scrolling score reaches
    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: f64,
    /// Score units travelled per second
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: f64,
    #[serde(default = "default_score_width")]
    pub score_width: f64,
    #[serde(default = "default_marker_pool_size")]
    pub marker_pool_size: usize,
    #[serde(default = "default_lyric_window_ms")]
    pub lyric_lead_ms: f64,
    #[serde(default = "default_lyric_window_ms")]
    pub lyric_lag_ms: f64,
    /// Distance a lyric unit slides while entering and leaving
    #[serde(default = "default_lyric_travel")]
    pub lyric_travel: f64,
    /// Display lane of the n-th phrase is `lane_order[n % len]`
    #[serde(default = "default_lane_order")]
    pub lane_order: Vec<u8>,
    /// Marks always shown as their own lyric unit
    #[serde(default = "default_punctuation")]
    pub punctuation: Vec<String>,
    #[serde(default)]
    pub blink: BlinkConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: default_lookahead_ms(),
            scroll_speed: default_scroll_speed(),
            score_width: default_score_width(),
            marker_pool_size: default_marker_pool_size(),
            lyric_lead_ms: default_lyric_window_ms(),
            lyric_lag_ms: default_lyric_window_ms(),
            lyric_travel: default_lyric_travel(),
            lane_order: default_lane_order(),
            punctuation: default_punctuation(),
            blink: BlinkConfig::default(),
        }
    }
}

impl StageConfig {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let config: StageConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let positive = [
            ("lookaheadMs", self.lookahead_ms),
            ("scrollSpeed", self.scroll_speed),
            ("scoreWidth", self.score_width),
            ("blink.durationMs", self.blink.duration_ms),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(LoadError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        let non_negative = [
            ("lyricLeadMs", self.lyric_lead_ms),
            ("lyricLagMs", self.lyric_lag_ms),
            ("lyricTravel", self.lyric_travel),
            ("blink.firstBlinkMs", self.blink.first_blink_ms),
            ("blink.maxIntervalMs", self.blink.max_interval_ms),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LoadError::Invalid(format!("{} must not be negative, got {}", name, value)));
            }
        }

        if self.lane_order.is_empty() {
            return Err(LoadError::Invalid("laneOrder must not be empty".to_string()));
        }
        Ok(())
    }

    /// Display lane for the phrase at `phrase_index`
    pub fn lane_for(&self, phrase_index: usize) -> u8 {
        self.lane_order
            .get(phrase_index % self.lane_order.len().max(1))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_punctuation(&self, text: &str) -> bool {
        self.punctuation.iter().any(|mark| mark == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = StageConfig::from_json(r#"{"lookaheadMs": 2000}"#).unwrap();
        assert_eq!(config.lookahead_ms, 2000.0);
        assert_eq!(config.scroll_speed, 10.0);
        assert_eq!(config.lane_order, vec![0, 3, 1, 4, 2]);
        assert_eq!(config.blink.duration_ms, 200.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(StageConfig::from_json(r#"{"scrollSpeed": 0}"#).is_err());
        assert!(StageConfig::from_json(r#"{"laneOrder": []}"#).is_err());
        assert!(matches!(StageConfig::from_json("{"), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_lane_cycle() {
        let config = StageConfig::default();
        let lanes: Vec<u8> = (0..7).map(|i| config.lane_for(i)).collect();
        assert_eq!(lanes, vec![0, 3, 1, 4, 2, 0, 3]);
    }

    #[test]
    fn test_punctuation_set() {
        let config = StageConfig::default();
        assert!(config.is_punctuation("「"));
        assert!(config.is_punctuation("？"));
        assert!(!config.is_punctuation("あ"));
    }
}
