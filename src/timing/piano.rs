//! Piano keys lit for the sounding chord

use serde::Serialize;
use crate::models::chord::PitchClass;
use super::chord_timeline::ChordTimeline;

/// Keys to switch off and on, applied in that order
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct KeyChange {
    pub symbol: Option<String>,
    pub released: Vec<PitchClass>,
    pub pressed: Vec<PitchClass>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyboardHighlighter {
    current_symbol: Option<String>,
    lit: Vec<PitchClass>,
}

impl KeyboardHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently lit
    pub fn lit_keys(&self) -> &[PitchClass] {
        &self.lit
    }

    /// Report a key change when the active chord symbol differs from the
    /// previous frame's
    pub fn update(&mut self, chords: &ChordTimeline, seek_time: f64) -> Option<KeyChange> {
        let active = chords.active_at(seek_time);
        let symbol = active.map(|span| span.symbol.clone());
        if symbol == self.current_symbol {
            return None;
        }

        let released = std::mem::take(&mut self.lit);
        self.lit = active
            .and_then(|span| span.pitch_classes.clone())
            .unwrap_or_default();
        self.current_symbol = symbol.clone();
        Some(KeyChange {
            symbol,
            released,
            pressed: self.lit.clone(),
        })
    }

    /// Switch every key off
    pub fn reset(&mut self) -> KeyChange {
        self.current_symbol = None;
        KeyChange {
            symbol: None,
            released: std::mem::take(&mut self.lit),
            pressed: Vec::new(),
        }
    }
}
