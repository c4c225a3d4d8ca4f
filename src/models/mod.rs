//! Models module for the live stage core
//!
//! Plain data types shared by the timing components: beats, chords,
//! choreography rules, lyric units, the loudness curve and the stage
//! configuration.

pub mod beat;
pub mod chord;
pub mod action;
pub mod lyric;
pub mod song;
pub mod volume;
pub mod config;

// Re-export commonly used types
pub use beat::{Beat, RawBeat};
pub use chord::{ChordSpan, ParsedChord, PitchClass, RawChord};
pub use action::{ActionRule, BeatRange, IntensityRange, LightColor, LightRule};
pub use lyric::{ColorKey, LyricPhrase, LyricUnit, RawChar, RawPhrase, RawWord, UnitKind};
pub use song::{ChoreographyTable, SongChoreography, SongRules, SongSnapshot};
pub use volume::VolumeTrack;
pub use config::{BlinkConfig, StageConfig};
