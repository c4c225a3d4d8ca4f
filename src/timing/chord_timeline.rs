//! Chord spans over time

use std::collections::HashSet;
use crate::error::StageError;
use crate::models::chord::{parse_chord_symbol, ChordSpan, RawChord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChordTimeline {
    spans: Vec<ChordSpan>,
}

impl ChordTimeline {
    /// Parse every raw chord once
    ///
    /// Unsupported symbols are logged a single time each and kept as spans
    /// without pitch classes, the same as the no-chord symbol.
    pub fn from_raw(raw: &[RawChord]) -> Self {
        let mut reported: HashSet<&str> = HashSet::new();
        let spans = raw
            .iter()
            .map(|chord| {
                let parsed = match parse_chord_symbol(&chord.name) {
                    Ok(parsed) => parsed,
                    Err(err @ StageError::UnsupportedSymbol(_)) => {
                        if reported.insert(chord.name.as_str()) {
                            log::warn!("{}", err);
                        }
                        None
                    }
                    Err(err) => {
                        log::error!("chord '{}': {}", chord.name, err);
                        None
                    }
                };
                if let Some(chord_parsed) = &parsed {
                    if !chord_parsed.known_quality && reported.insert(chord.name.as_str()) {
                        log::warn!("unsupported chord attribute in '{}', using root only", chord.name);
                    }
                }
                ChordSpan::from_parsed(chord, parsed)
            })
            .collect();
        Self { spans }
    }

    pub fn new(spans: Vec<ChordSpan>) -> Self {
        Self { spans }
    }

    pub fn spans(&self) -> &[ChordSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Position of the span active at `time`
    pub fn active_index_at(&self, time: f64) -> Option<usize> {
        let after = self.spans.partition_point(|span| span.start_time < time);
        let index = after.checked_sub(1)?;
        if self.spans[index].is_active_at(time) {
            Some(index)
        } else {
            None
        }
    }

    /// Span active at `time`; `None` before the first chord and in gaps
    pub fn active_at(&self, time: f64) -> Option<&ChordSpan> {
        self.active_index_at(time).map(|index| &self.spans[index])
    }

    /// Spans intersecting `(window_start, window_end]` in chronological order
    pub fn overlapping(&self, window_start: f64, window_end: f64) -> impl Iterator<Item = &ChordSpan> + '_ {
        self.spans
            .iter()
            .filter(move |span| span.overlaps(window_start, window_end))
    }
}
