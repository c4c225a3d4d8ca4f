//! Beat lookup by index and by playback time
//!
//! Real beats are stored rounded to whole milliseconds. Two sentinel beats
//! close the timeline: index `-1` covers `[0, first.start)` and index
//! `beat_count` covers `[last.end, song_duration)`, so every time inside the
//! song resolves to exactly one beat.

use crate::error::{StageError, StageResult};
use crate::models::beat::{round_ms, Beat, RawBeat};

/// Index of the sentinel beat before the first real beat
pub const BEFORE_SONG: i64 = -1;

/// Approximate "which beat is playing" primitive
///
/// Implementations may fail near the song boundaries; `BeatIndex` resolves
/// those cases to the sentinel beats.
pub trait BeatFinder {
    fn find_beat(&self, time: f64) -> Option<i64>;
}

/// Binary search over the rounded beat table
#[derive(Debug, Clone, Default)]
pub struct SortedBeats {
    beats: Vec<Beat>,
}

impl SortedBeats {
    pub fn new(beats: Vec<Beat>) -> Self {
        Self { beats }
    }
}

impl BeatFinder for SortedBeats {
    fn find_beat(&self, time: f64) -> Option<i64> {
        let after = self.beats.partition_point(|beat| beat.start as f64 <= time);
        let beat = self.beats.get(after.checked_sub(1)?)?;
        if beat.contains(time) {
            Some(beat.index)
        } else {
            None
        }
    }
}

pub struct BeatIndex {
    beats: Vec<Beat>,
    song_duration: i64,
    finder: Box<dyn BeatFinder>,
}

impl std::fmt::Debug for BeatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatIndex")
            .field("beats", &self.beats)
            .field("song_duration", &self.song_duration)
            .finish()
    }
}

impl BeatIndex {
    /// Build the table with the built-in binary-search finder
    pub fn new(raw: &[RawBeat], song_duration: f64) -> StageResult<Self> {
        let beats = round_beats(raw)?;
        let finder = SortedBeats::new(beats.clone());
        Ok(Self {
            beats,
            song_duration: round_ms(song_duration),
            finder: Box::new(finder),
        })
    }

    /// Build the table around a host-provided finder
    pub fn with_finder(
        raw: &[RawBeat],
        song_duration: f64,
        finder: Box<dyn BeatFinder>,
    ) -> StageResult<Self> {
        Ok(Self {
            beats: round_beats(raw)?,
            song_duration: round_ms(song_duration),
            finder,
        })
    }

    /// Number of real beats
    pub fn beat_count(&self) -> i64 {
        self.beats.len() as i64
    }

    pub fn song_duration(&self) -> i64 {
        self.song_duration
    }

    /// Real beats in chronological order
    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    /// Beat by index, including both sentinels; `None` outside `-1..=beat_count`
    pub fn get_by_index(&self, index: i64) -> Option<Beat> {
        self.try_get_by_index(index).ok()
    }

    pub fn try_get_by_index(&self, index: i64) -> StageResult<Beat> {
        let count = self.beat_count();
        if index == BEFORE_SONG {
            let end = self.beats.first().map_or(self.song_duration, |beat| beat.start);
            return Ok(Beat::new(BEFORE_SONG, 0, end));
        }
        if index == count {
            let start = self.beats.last().map_or(self.song_duration, |beat| beat.end);
            return Ok(Beat::new(count, start, self.song_duration.max(start)));
        }
        if (0..count).contains(&index) {
            return Ok(self.beats[index as usize]);
        }
        Err(StageError::MissingBeat(index))
    }

    /// Beat playing at `time`
    ///
    /// An inconsistent lookup (inside the song span but no beat found) is
    /// logged together with the whole table and yields `None`.
    pub fn get_by_seek_time(&self, time: f64) -> Option<Beat> {
        match self.try_get_by_seek_time(time) {
            Ok(beat) => Some(beat),
            Err(err) => {
                log::warn!("{}", err);
                log::debug!("beat table: {:?}", self.beats);
                None
            }
        }
    }

    pub fn try_get_by_seek_time(&self, time: f64) -> StageResult<Beat> {
        if let Some(index) = self.finder.find_beat(time) {
            return self.try_get_by_index(index);
        }

        let (first, last) = match (self.beats.first(), self.beats.last()) {
            (Some(first), Some(last)) => (first, last),
            _ if time < self.song_duration as f64 => return self.try_get_by_index(BEFORE_SONG),
            _ => return self.try_get_by_index(self.beat_count()),
        };

        if time < first.start as f64 {
            self.try_get_by_index(BEFORE_SONG)
        } else if time >= last.end as f64 {
            self.try_get_by_index(self.beat_count())
        } else {
            Err(StageError::InconsistentBeatLookup { seek_time: time })
        }
    }

    /// Fractional beat position at `time`: beat index plus progress in the beat
    pub fn position_at(&self, time: f64) -> Option<f64> {
        self.get_by_seek_time(time).map(|beat| beat.position(time))
    }
}

fn round_beats(raw: &[RawBeat]) -> StageResult<Vec<Beat>> {
    let mut beats = Vec::with_capacity(raw.len());
    for (index, beat) in raw.iter().enumerate() {
        if !beat.start_time.is_finite() || !beat.end_time.is_finite() || beat.end_time < beat.start_time {
            return Err(StageError::InvalidSongData(format!(
                "beat {} has interval [{}, {})",
                index, beat.start_time, beat.end_time
            )));
        }
        let rounded = Beat::new(index as i64, round_ms(beat.start_time), round_ms(beat.end_time));
        if beats.last().is_some_and(|previous: &Beat| rounded.start < previous.start) {
            return Err(StageError::InvalidSongData(format!(
                "beat {} starts before beat {}",
                index,
                index - 1
            )));
        }
        beats.push(rounded);
    }
    Ok(beats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> BeatIndex {
        let raw = vec![
            RawBeat::new(499.6, 1000.2),
            RawBeat::new(1000.2, 1500.4),
            RawBeat::new(1500.4, 2000.0),
        ];
        BeatIndex::new(&raw, 2600.0).unwrap()
    }

    struct NeverFinds;

    impl BeatFinder for NeverFinds {
        fn find_beat(&self, _time: f64) -> Option<i64> {
            None
        }
    }

    #[test]
    fn test_sentinels() {
        let beats = index();
        assert_eq!(beats.get_by_index(-1), Some(Beat::new(-1, 0, 500)));
        assert_eq!(beats.get_by_index(0), Some(Beat::new(0, 500, 1000)));
        assert_eq!(beats.get_by_index(3), Some(Beat::new(3, 2000, 2600)));
        assert_eq!(beats.get_by_index(4), None);
        assert_eq!(beats.get_by_index(-2), None);
        assert_eq!(beats.try_get_by_index(7), Err(StageError::MissingBeat(7)));
    }

    #[test]
    fn test_seek_time_boundaries() {
        let beats = index();
        assert_eq!(beats.get_by_seek_time(0.0).unwrap().index, -1);
        assert_eq!(beats.get_by_seek_time(499.9).unwrap().index, -1);
        assert_eq!(beats.get_by_seek_time(500.0).unwrap().index, 0);
        assert_eq!(beats.get_by_seek_time(1999.0).unwrap().index, 2);
        assert_eq!(beats.get_by_seek_time(2000.0).unwrap().index, 3);
        assert_eq!(beats.get_by_seek_time(2599.0).unwrap().index, 3);
    }

    #[test]
    fn test_finder_miss_inside_song_is_inconsistent() {
        let raw = vec![RawBeat::new(500.0, 1000.0), RawBeat::new(1000.0, 1500.0)];
        let beats = BeatIndex::with_finder(&raw, 2000.0, Box::new(NeverFinds)).unwrap();
        assert_eq!(beats.get_by_seek_time(100.0).unwrap().index, -1);
        assert_eq!(beats.get_by_seek_time(1700.0).unwrap().index, 2);
        assert_eq!(
            beats.try_get_by_seek_time(750.0),
            Err(StageError::InconsistentBeatLookup { seek_time: 750.0 })
        );
        assert_eq!(beats.get_by_seek_time(750.0), None);
    }

    #[test]
    fn test_position_at() {
        let beats = index();
        assert_eq!(beats.position_at(750.0), Some(0.5));
        assert_eq!(beats.position_at(250.0), Some(-0.5));
    }

    #[test]
    fn test_empty_table() {
        let beats = BeatIndex::new(&[], 1000.0).unwrap();
        assert_eq!(beats.get_by_index(-1), Some(Beat::new(-1, 0, 1000)));
        assert_eq!(beats.get_by_seek_time(10.0).unwrap().index, -1);
        assert_eq!(beats.get_by_seek_time(1000.0).unwrap().index, 0);
    }

    #[test]
    fn test_rejects_backwards_beats() {
        let raw = vec![RawBeat::new(1000.0, 1500.0), RawBeat::new(500.0, 1000.0)];
        assert!(matches!(BeatIndex::new(&raw, 2000.0), Err(StageError::InvalidSongData(_))));
        assert!(BeatIndex::new(&[RawBeat::new(10.0, 5.0)], 20.0).is_err());
    }
}
