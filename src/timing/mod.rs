//! Time alignment
//!
//! Everything here is a function of the per-song tables, the playback time
//! and a small previous-frame cache. None of it assumes time moves forward.

pub mod beat_index;
pub mod chord_timeline;
pub mod action_cycle;
pub mod dance;
pub mod light;
pub mod piano;
pub mod lyric_window;
pub mod score_window;
pub mod volume;

pub use beat_index::{BeatFinder, BeatIndex, SortedBeats};
pub use chord_timeline::ChordTimeline;
pub use action_cycle::{ActionCycleResolver, CycleSpan, ResolvedAction};
pub use dance::{BlinkScheduler, DanceDriver, DanceFrame, OsRandom, RandomSource, SharedRandom};
pub use light::{LightFrame, LightTracker};
pub use piano::{KeyChange, KeyboardHighlighter};
pub use lyric_window::{LyricFrame, LyricWindowTracker, UnitPhase};
pub use score_window::{ScoreWindow, ScoreWindowManager};
pub use volume::{VolumeFrame, VolumeMeter, METER_COLUMNS, METER_ROWS};
