//! Stage orchestration
//!
//! `Stage` owns every timing component and the tables of the current song.
//! The host drives it through three calls: `on_song_data_ready` when the
//! player has analysis data, `on_song_reset` when the song changes and
//! `update` once per frame.

pub mod playback;

use serde::Serialize;
use crate::error::{StageError, StageResult};
use crate::models::beat::{Beat, RawBeat};
use crate::models::chord::{PitchClass, RawChord};
use crate::models::config::StageConfig;
use crate::models::lyric::RawPhrase;
use crate::models::song::{ChoreographyTable, SongSnapshot};
use crate::models::volume::VolumeTrack;
use crate::scene::SceneSink;
use crate::timing::{
    ActionCycleResolver, BeatFinder, BeatIndex, BlinkScheduler, ChordTimeline, DanceDriver, DanceFrame,
    KeyChange, KeyboardHighlighter, LightFrame, LightTracker, LyricFrame, LyricWindowTracker, OsRandom,
    RandomSource, ScoreWindow, ScoreWindowManager, SharedRandom, VolumeFrame, VolumeMeter,
};
use crate::utils::performance::PerformanceMonitor;

pub use playback::{LoadEvent, LoadStatus, LoadTracker, PlaybackClock, Transport};

/// Query side of the media-analysis player
pub trait MediaSource {
    fn song_name(&self) -> &str;
    fn song_url(&self) -> Option<&str>;
    fn duration(&self) -> f64;
    fn raw_beats(&self) -> &[RawBeat];
    fn raw_chords(&self) -> &[RawChord];
    fn raw_phrases(&self) -> &[RawPhrase];

    /// Player-provided beat lookup; the stage searches its own table if `None`
    fn beat_finder(&self) -> Option<Box<dyn BeatFinder>> {
        None
    }

    /// Loudness at `time`; silent unless the player analyses volume
    fn volume_at(&self, _time: f64) -> f64 {
        0.0
    }

    fn max_volume(&self) -> f64 {
        0.0
    }
}

impl MediaSource for SongSnapshot {
    fn song_name(&self) -> &str {
        &self.name
    }

    fn song_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn raw_beats(&self) -> &[RawBeat] {
        &self.beats
    }

    fn raw_chords(&self) -> &[RawChord] {
        &self.chords
    }

    fn raw_phrases(&self) -> &[RawPhrase] {
        &self.phrases
    }

    fn volume_at(&self, time: f64) -> f64 {
        self.volume.at(time)
    }

    fn max_volume(&self) -> f64 {
        self.volume.max()
    }
}

/// The volume meter never steps more often than this
const VOLUME_SAMPLE_MS: f64 = 40.0;

/// Tables derived once per song
struct SongTables {
    rules_name: String,
    beats: BeatIndex,
    chords: ChordTimeline,
    actions: ActionCycleResolver,
    lights: LightTracker,
    volume: VolumeTrack,
}

/// Everything the host needs to draw one frame
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameState {
    pub ready: bool,
    pub seek_time: f64,
    pub beat: Option<Beat>,
    pub beat_position: Option<f64>,
    pub chord: Option<String>,
    pub chord_root: Option<PitchClass>,
    pub dance: Option<DanceFrame>,
    pub blink: f64,
    pub light: Option<LightFrame>,
    pub keys: Option<KeyChange>,
    pub lyrics: LyricFrame,
    pub score: Option<ScoreWindow>,
    pub scroll_y: f64,
    pub volume: VolumeFrame,
}

pub struct Stage {
    config: StageConfig,
    choreography: ChoreographyTable,
    song: Option<SongTables>,
    score: ScoreWindowManager,
    lyrics: LyricWindowTracker,
    dance: DanceDriver,
    blink: BlinkScheduler<SharedRandom>,
    meter: VolumeMeter<SharedRandom>,
    keys: KeyboardHighlighter,
    monitor: PerformanceMonitor,
}

impl Stage {
    pub fn new(config: StageConfig, choreography: ChoreographyTable) -> Self {
        Self::with_random(config, choreography, Box::new(OsRandom))
    }

    /// Build with an explicit random source for blinks and the volume meter
    pub fn with_random(config: StageConfig, choreography: ChoreographyTable, random: Box<dyn RandomSource>) -> Self {
        let random = SharedRandom::new(random);
        Self {
            score: ScoreWindowManager::new(&config),
            lyrics: LyricWindowTracker::new(&config),
            dance: DanceDriver::new(),
            blink: BlinkScheduler::with_random(config.blink.clone(), random.clone()),
            meter: VolumeMeter::with_random(random),
            keys: KeyboardHighlighter::new(),
            monitor: PerformanceMonitor::new(),
            song: None,
            config,
            choreography,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.song.is_some()
    }

    /// Name of the choreography entry in use
    pub fn rules_name(&self) -> Option<&str> {
        self.song.as_ref().map(|song| song.rules_name.as_str())
    }

    pub fn song_duration(&self) -> f64 {
        self.song
            .as_ref()
            .map_or(0.0, |song| song.beats.song_duration() as f64)
    }

    pub fn beats(&self) -> StageResult<&BeatIndex> {
        self.song.as_ref().map(|song| &song.beats).ok_or(StageError::NotReady)
    }

    pub fn chords(&self) -> StageResult<&ChordTimeline> {
        self.song.as_ref().map(|song| &song.chords).ok_or(StageError::NotReady)
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Build the per-song tables and the song's scene entities
    ///
    /// Anything left from a previous song is torn down first.
    pub fn on_song_data_ready(&mut self, source: &dyn MediaSource, scene: &mut dyn SceneSink) -> StageResult<()> {
        self.on_song_reset(scene);

        let duration = source.duration();
        if !duration.is_finite() || duration < 0.0 {
            return Err(StageError::InvalidSongData(format!("song duration {}", duration)));
        }
        let beats = match source.beat_finder() {
            Some(finder) => BeatIndex::with_finder(source.raw_beats(), duration, finder)?,
            None => BeatIndex::new(source.raw_beats(), duration)?,
        };
        let chords = ChordTimeline::from_raw(source.raw_chords());

        let name = source.song_name();
        let key = match source.song_url() {
            Some(url) if self.choreography.find(name).is_none() => url,
            _ => name,
        };
        let rules = self.choreography.select(key);

        self.score.on_song_data_ready(&chords, scene);
        self.lyrics.on_song_data_ready(source.raw_phrases(), scene);
        self.meter.on_song_data_ready(source.max_volume(), scene);
        let volume = VolumeTrack::sample(duration, VOLUME_SAMPLE_MS, |time| source.volume_at(time));

        log::info!(
            "song '{}' ready: {} beats, {} chords, choreography '{}'",
            name,
            beats.beat_count(),
            chords.len(),
            rules.name
        );
        self.song = Some(SongTables {
            rules_name: rules.name,
            beats,
            chords,
            actions: ActionCycleResolver::new(rules.actions),
            lights: LightTracker::new(rules.lights),
            volume,
        });
        Ok(())
    }

    /// Drop every per-song table and release the song's scene entities
    pub fn on_song_reset(&mut self, scene: &mut dyn SceneSink) {
        if self.song.take().is_some() {
            log::info!("song reset");
        }
        self.score.on_song_reset(scene);
        self.lyrics.on_song_reset(scene);
        self.meter.reset(scene);
        self.dance.reset();
        self.blink.reset();
        self.keys.reset();
    }

    /// Resolve one frame; never fails, missing data degrades to empty parts
    pub fn update(&mut self, seek_time: f64, scene: &mut dyn SceneSink) -> FrameState {
        let started = crate::utils::performance::now_ms();
        let frame = self.resolve_frame(seek_time, scene);
        self.monitor
            .record_measurement("update", crate::utils::performance::now_ms() - started);
        frame
    }

    fn resolve_frame(&mut self, seek_time: f64, scene: &mut dyn SceneSink) -> FrameState {
        let Some(song) = self.song.as_ref() else {
            return FrameState {
                seek_time,
                ..FrameState::default()
            };
        };

        let beat = song.beats.get_by_seek_time(seek_time);
        let chord = song.chords.active_at(seek_time);

        FrameState {
            ready: true,
            seek_time,
            beat,
            beat_position: beat.map(|beat| beat.position(seek_time)),
            chord: chord.map(|span| span.symbol.clone()),
            chord_root: chord.and_then(|span| span.root_pitch_class),
            light: song.lights.update(&song.beats, seek_time),
            dance: self.dance.update(&song.actions, &song.beats, seek_time),
            blink: self.blink.update(seek_time),
            keys: self.keys.update(&song.chords, seek_time),
            lyrics: self.lyrics.update(seek_time, scene),
            score: Some(self.score.update(&song.beats, &song.chords, seek_time, scene)),
            scroll_y: self.score.scroll_y(seek_time),
            volume: self.meter.update(song.volume.at(seek_time), seek_time, scene),
        }
    }
}
