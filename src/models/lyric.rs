//! Timed lyrics
//!
//! The analysis service delivers a phrase → word → character tree. At song
//! ready time every phrase is regrouped into display units: one unit per
//! Latin word, one per character for every other script, and one per
//! punctuation mark.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Part-of-speech tag the service uses for nouns
pub const POS_NOUN: &str = "N";

/// Language tag of Latin-script words
pub const LANG_LATIN: &str = "en";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawChar {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawWord {
    #[serde(default)]
    pub language: String,
    /// Part of speech
    #[serde(default)]
    pub pos: String,
    #[serde(alias = "children")]
    pub chars: Vec<RawChar>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawPhrase {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(alias = "children")]
    pub words: Vec<RawWord>,
}

/// Color table entry a unit is drawn with (numeric on the JS side)
#[derive(Serialize_repr, Deserialize_repr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorKey {
    JapaneseNoun = 0,
    JapaneseOther = 1,
    English = 2,
    Symbol = 3,
}

/// Script class of a display unit
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Latin,
    Cjk,
    Punctuation,
}

impl UnitKind {
    /// Box width in stage units for a unit made of `char_count` characters
    pub fn width(&self, char_count: usize) -> f64 {
        match self {
            UnitKind::Latin => char_count as f64 / 2.0,
            UnitKind::Cjk => 1.0,
            UnitKind::Punctuation => 0.5,
        }
    }

    pub fn color_key(&self, pos: &str) -> ColorKey {
        match self {
            UnitKind::Latin => ColorKey::English,
            UnitKind::Punctuation => ColorKey::Symbol,
            UnitKind::Cjk if pos == POS_NOUN => ColorKey::JapaneseNoun,
            UnitKind::Cjk => ColorKey::JapaneseOther,
        }
    }
}

/// Smallest independently animated lyric token
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricUnit {
    pub kind: UnitKind,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub language: String,
    pub color_key: ColorKey,
    pub width: f64,
    /// Horizontal centre inside the phrase container
    pub x: f64,
    pub visibility_lead: f64,
    pub visibility_lag: f64,
}

impl LyricUnit {
    /// Start-inclusive, end-exclusive visibility window
    pub fn is_visible(&self, time: f64) -> bool {
        self.start_time - self.visibility_lead <= time && time < self.end_time + self.visibility_lag
    }

    /// 0 before start, linear while sung, 1 after end
    pub fn reveal_progress(&self, time: f64) -> f64 {
        if time < self.start_time {
            0.0
        } else if time >= self.end_time {
            1.0
        } else {
            (time - self.start_time) / (self.end_time - self.start_time)
        }
    }
}

/// A phrase regrouped into display units
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricPhrase {
    pub start_time: f64,
    pub end_time: f64,
    pub lane: u8,
    pub units: Vec<LyricUnit>,
    pub visibility_lead: f64,
    pub visibility_lag: f64,
}

impl LyricPhrase {
    pub fn is_visible(&self, time: f64) -> bool {
        self.start_time - self.visibility_lead <= time && time < self.end_time + self.visibility_lag
    }

    /// Horizontal offset of the phrase container: `-(unit_count * progress)`
    ///
    /// Progress is not clamped, so the container keeps sliding through the
    /// lead-in and lead-out windows.
    pub fn scroll_offset(&self, time: f64) -> f64 {
        let duration = self.end_time - self.start_time;
        if duration <= 0.0 {
            return 0.0;
        }
        let progress = (time - self.start_time) / duration;
        -(self.units.len() as f64 * progress)
    }
}
