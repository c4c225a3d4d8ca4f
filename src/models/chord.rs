//! Chord symbols and pitch classes
//!
//! A chord symbol is `<root>[#|b]<attribute>[/<bass>]`, e.g. `C`, `F#m7`,
//! `C#m7/G#`. The attribute selects an interval pattern from
//! [`CHORD_QUALITIES`]; the slash bass only changes the displayed root.
//! `N` means "no chord".

use serde::{Deserialize, Serialize};
use crate::error::{StageError, StageResult};

/// Pitch class 0..11 (C = 0)
pub type PitchClass = u8;

pub const PITCH_CLASS_COUNT: u8 = 12;

pub const KEY_MAP_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const KEY_MAP_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// The symbol used by the analysis service for "no chord"
pub const NO_CHORD: &str = "N";

/// Interval pattern for one chord attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordQuality {
    pub attr: &'static str,
    pub intervals: &'static [u8],
}

pub const CHORD_QUALITIES: [ChordQuality; 10] = [
    ChordQuality { attr: "", intervals: &[0, 4, 7] },
    ChordQuality { attr: "m", intervals: &[0, 3, 7] },
    ChordQuality { attr: "dim", intervals: &[0, 3, 6] },
    ChordQuality { attr: "aug", intervals: &[0, 4, 8] },
    ChordQuality { attr: "7", intervals: &[0, 4, 7, 10] },
    ChordQuality { attr: "m7", intervals: &[0, 3, 7, 10] },
    ChordQuality { attr: "M7", intervals: &[0, 4, 7, 11] },
    ChordQuality { attr: "maj7", intervals: &[0, 4, 7, 11] },
    ChordQuality { attr: "6", intervals: &[0, 4, 7, 9] },
    ChordQuality { attr: "dim7", intervals: &[0, 3, 6, 9] },
];

/// Look up the interval pattern of an attribute
pub fn quality_for(attr: &str) -> Option<&'static ChordQuality> {
    CHORD_QUALITIES.iter().find(|quality| quality.attr == attr)
}

/// A chord as delivered by the analysis service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawChord {
    #[serde(alias = "symbol")]
    pub name: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl RawChord {
    pub fn new(name: &str, start_time: f64, end_time: f64) -> Self {
        Self {
            name: name.to_string(),
            start_time,
            end_time,
        }
    }
}

/// Result of parsing a chord symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChord {
    /// Root shown to the user (slash bass when present)
    pub display_root: PitchClass,
    /// Root the interval pattern is built on
    pub base_root: PitchClass,
    pub pitch_classes: Vec<PitchClass>,
    /// False when the attribute was unknown and a single-note set was used
    pub known_quality: bool,
}

/// Parse a note name prefix (`C`, `C#`, `Db`, ...) into a pitch class and
/// the number of bytes consumed.
pub fn parse_root(text: &str) -> Option<(PitchClass, usize)> {
    let mut chars = text.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_uppercase() {
        return None;
    }
    let (name, table) = match chars.next() {
        Some('#') => (&text[..2], &KEY_MAP_SHARP),
        Some('b') => (&text[..2], &KEY_MAP_FLAT),
        _ => (&text[..1], &KEY_MAP_SHARP),
    };
    table
        .iter()
        .position(|key| *key == name)
        .map(|index| (index as PitchClass, name.len()))
}

/// Parse a chord symbol into its pitch classes
///
/// Returns `Ok(None)` for the no-chord symbol. An unknown root is an
/// `UnsupportedSymbol` error; an unknown attribute degrades to a
/// single-note set with `known_quality == false`.
pub fn parse_chord_symbol(symbol: &str) -> StageResult<Option<ParsedChord>> {
    if symbol == NO_CHORD {
        return Ok(None);
    }

    let (base_root, root_len) = parse_root(symbol)
        .ok_or_else(|| StageError::UnsupportedSymbol(symbol.to_string()))?;

    let slash = symbol.find('/');
    let attr = match slash {
        Some(slash_index) if slash_index >= root_len => &symbol[root_len..slash_index],
        _ => &symbol[root_len..],
    };

    let (pitch_classes, known_quality) = match quality_for(attr) {
        Some(quality) => (
            quality
                .intervals
                .iter()
                .map(|interval| (base_root + interval) % PITCH_CLASS_COUNT)
                .collect(),
            true,
        ),
        None => (vec![base_root], false),
    };

    let display_root = slash
        .and_then(|slash_index| parse_root(&symbol[slash_index + 1..]))
        .map(|(bass, _)| bass)
        .unwrap_or(base_root);

    Ok(Some(ParsedChord {
        display_root,
        base_root,
        pitch_classes,
        known_quality,
    }))
}

/// A chord asserted over `(start_time, end_time]`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChordSpan {
    pub symbol: String,
    pub start_time: f64,
    pub end_time: f64,
    pub root_pitch_class: Option<PitchClass>,
    pub pitch_classes: Option<Vec<PitchClass>>,
}

impl ChordSpan {
    /// Build a span from a parsed symbol; unsupported roots leave both pitch
    /// fields empty like the no-chord symbol does.
    pub fn from_parsed(raw: &RawChord, parsed: Option<ParsedChord>) -> Self {
        let (root_pitch_class, pitch_classes) = match parsed {
            Some(chord) => (Some(chord.display_root), Some(chord.pitch_classes)),
            None => (None, None),
        };
        Self {
            symbol: raw.name.clone(),
            start_time: raw.start_time,
            end_time: raw.end_time,
            root_pitch_class,
            pitch_classes,
        }
    }

    pub fn is_no_chord(&self) -> bool {
        self.pitch_classes.is_none()
    }

    /// Start-exclusive, end-inclusive: at a chord change the outgoing chord
    /// is still the active one.
    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time < time && time <= self.end_time
    }

    pub fn overlaps(&self, window_start: f64, window_end: f64) -> bool {
        window_start < self.end_time && self.start_time <= window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_triad() {
        let chord = parse_chord_symbol("C").unwrap().unwrap();
        assert_eq!(chord.pitch_classes, vec![0, 4, 7]);
        assert_eq!(chord.display_root, 0);
        assert!(chord.known_quality);
    }

    #[test]
    fn test_parse_slash_chord_keeps_base_pitch_classes() {
        let chord = parse_chord_symbol("C#m7/G#").unwrap().unwrap();
        assert_eq!(chord.base_root, 1);
        assert_eq!(chord.pitch_classes, vec![1, 4, 8, 11]);
        assert_eq!(chord.display_root, 8, "slash bass overrides display root only");
    }

    #[test]
    fn test_parse_flat_root_and_flat_bass() {
        let chord = parse_chord_symbol("Bbm/Db").unwrap().unwrap();
        assert_eq!(chord.pitch_classes, vec![10, 1, 5]);
        assert_eq!(chord.display_root, 1);
    }

    #[test]
    fn test_unknown_attribute_falls_back_to_single_note() {
        let chord = parse_chord_symbol("Dsus4").unwrap().unwrap();
        assert_eq!(chord.pitch_classes, vec![2]);
        assert!(!chord.known_quality);
    }

    #[test]
    fn test_no_chord_and_bad_root() {
        assert_eq!(parse_chord_symbol("N").unwrap(), None);
        assert_eq!(
            parse_chord_symbol("H7"),
            Err(StageError::UnsupportedSymbol("H7".to_string()))
        );
        assert!(parse_chord_symbol("").is_err());
    }

    #[test]
    fn test_only_bare_n_is_no_chord() {
        assert_eq!(
            parse_chord_symbol("NC"),
            Err(StageError::UnsupportedSymbol("NC".to_string()))
        );
        assert_eq!(
            parse_chord_symbol("N/A"),
            Err(StageError::UnsupportedSymbol("N/A".to_string()))
        );
    }

    #[test]
    fn test_every_quality_round_trips() {
        for quality in CHORD_QUALITIES.iter() {
            for (root, name) in KEY_MAP_SHARP.iter().enumerate() {
                let symbol = format!("{}{}", name, quality.attr);
                let chord = parse_chord_symbol(&symbol).unwrap().unwrap();
                let expected: Vec<u8> = quality
                    .intervals
                    .iter()
                    .map(|offset| (root as u8 + offset) % 12)
                    .collect();
                assert_eq!(chord.pitch_classes, expected, "symbol {}", symbol);
            }
        }
    }
}
