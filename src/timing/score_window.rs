//! Scrolling score: beat markers and chord bars inside the lookahead window
//!
//! Beat markers come from a reusable pool and are only repositioned when a
//! new beat scrolls in. Chord bars are built once per song (one bar per
//! pitch class of each chord) and only toggle their scene membership.

use serde::Serialize;
use crate::models::chord::PITCH_CLASS_COUNT;
use crate::models::config::StageConfig;
use crate::scene::{EntityId, Primitive, SceneSink, Vec3};
use super::beat_index::BeatIndex;
use super::chord_timeline::ChordTimeline;

/// Depth of a chord bar box
const CHORD_BAR_DEPTH: f64 = 1.0;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWindow {
    pub window_start: f64,
    pub window_end: f64,
}

impl ScoreWindow {
    /// `[seek_time, seek_time + lookahead]` clamped to the song duration
    pub fn at(seek_time: f64, lookahead_ms: f64, song_duration: f64) -> Self {
        Self {
            window_start: seek_time,
            window_end: (seek_time + lookahead_ms).min(song_duration),
        }
    }
}

#[derive(Debug)]
struct ChordBar {
    span_index: usize,
    entities: Vec<EntityId>,
    attached: bool,
}

#[derive(Debug)]
pub struct ScoreWindowManager {
    lookahead_ms: f64,
    scroll_speed: f64,
    score_width: f64,
    pool_size: usize,
    free: Vec<EntityId>,
    /// `(beat index, marker)` in insertion order
    in_use: Vec<(i64, EntityId)>,
    chord_bars: Vec<ChordBar>,
    highlighted: Option<usize>,
    window: Option<ScoreWindow>,
    spawned: usize,
}

impl ScoreWindowManager {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            lookahead_ms: config.lookahead_ms,
            scroll_speed: config.scroll_speed,
            score_width: config.score_width,
            pool_size: config.marker_pool_size,
            free: Vec::new(),
            in_use: Vec::new(),
            chord_bars: Vec::new(),
            highlighted: None,
            window: None,
            spawned: 0,
        }
    }

    /// Width of one key column
    fn key_width(&self) -> f64 {
        self.score_width / PITCH_CLASS_COUNT as f64
    }

    /// Score position of a time
    pub fn time_to_y(&self, time: f64) -> f64 {
        (time / 1000.0) * self.scroll_speed
    }

    /// Offset of the scrolling layer at `seek_time`
    pub fn scroll_y(&self, seek_time: f64) -> f64 {
        -self.time_to_y(seek_time)
    }

    pub fn window(&self) -> Option<ScoreWindow> {
        self.window
    }

    /// Beat indices with a marker on the score, in insertion order
    pub fn visible_beats(&self) -> Vec<i64> {
        self.in_use.iter().map(|(index, _)| *index).collect()
    }

    /// Spans with their bars on the score
    pub fn visible_chords(&self) -> Vec<usize> {
        self.chord_bars
            .iter()
            .filter(|bar| bar.attached)
            .map(|bar| bar.span_index)
            .collect()
    }

    pub fn highlighted_chord(&self) -> Option<usize> {
        self.highlighted.map(|bar| self.chord_bars[bar].span_index)
    }

    /// Markers ever spawned; stays at the pool size unless the window outgrew it
    pub fn markers_spawned(&self) -> usize {
        self.spawned
    }

    fn spawn_marker(&mut self, scene: &mut dyn SceneSink) -> EntityId {
        self.spawned += 1;
        scene.spawn(Primitive::BeatMarker { width: self.score_width }, None)
    }

    fn acquire_marker(&mut self, scene: &mut dyn SceneSink) -> EntityId {
        match self.free.pop() {
            Some(marker) => marker,
            None => {
                log::debug!("beat marker pool exhausted, growing past {}", self.spawned);
                self.spawn_marker(scene)
            }
        }
    }

    /// Fill the marker pool (once) and build the chord bars of the new song
    pub fn on_song_data_ready(&mut self, chords: &ChordTimeline, scene: &mut dyn SceneSink) {
        self.on_song_reset(scene);
        while self.spawned < self.pool_size {
            let marker = self.spawn_marker(scene);
            self.free.push(marker);
        }

        let key_width = self.key_width();
        for (span_index, span) in chords.spans().iter().enumerate() {
            let Some(pitch_classes) = &span.pitch_classes else {
                continue;
            };
            let start_y = self.time_to_y(span.start_time);
            let length = self.time_to_y(span.end_time) - start_y;
            let entities = pitch_classes
                .iter()
                .map(|&key| {
                    let id = scene.spawn(Primitive::ChordBar { key, length }, None);
                    scene.set_position(
                        id,
                        Vec3::new(
                            key as f64 * key_width + key_width / 2.0,
                            start_y + length / 2.0,
                            CHORD_BAR_DEPTH / 2.0,
                        ),
                    );
                    id
                })
                .collect();
            self.chord_bars.push(ChordBar {
                span_index,
                entities,
                attached: false,
            });
        }
        log::info!("score ready: {} chord bars", self.chord_bars.len());
    }

    /// Return every marker to the pool and drop the chord bars
    ///
    /// Safe to call repeatedly; pooled markers survive song changes.
    pub fn on_song_reset(&mut self, scene: &mut dyn SceneSink) {
        for (_, marker) in self.in_use.drain(..) {
            scene.detach(marker);
            self.free.push(marker);
        }
        for bar in self.chord_bars.drain(..) {
            for id in bar.entities {
                scene.despawn(id);
            }
        }
        self.highlighted = None;
        self.window = None;
    }

    pub fn update(
        &mut self,
        beats: &BeatIndex,
        chords: &ChordTimeline,
        seek_time: f64,
        scene: &mut dyn SceneSink,
    ) -> ScoreWindow {
        let window = ScoreWindow::at(seek_time, self.lookahead_ms, beats.song_duration() as f64);
        self.window = Some(window);

        match (
            beats.get_by_seek_time(window.window_start),
            beats.get_by_seek_time(window.window_end),
        ) {
            (Some(first), Some(last)) => self.update_markers(beats, first.index, last.index, scene),
            _ => log::warn!("score window {:?} has no beat bounds; keeping markers", window),
        }

        self.update_chord_bars(chords, &window, scene);
        self.update_highlight(chords, seek_time, scene);
        window
    }

    fn update_markers(&mut self, beats: &BeatIndex, first: i64, last: i64, scene: &mut dyn SceneSink) {
        let mut kept = Vec::with_capacity(self.in_use.len());
        for (index, marker) in self.in_use.drain(..) {
            if index < first || last < index {
                scene.detach(marker);
                self.free.push(marker);
            } else {
                kept.push((index, marker));
            }
        }
        self.in_use = kept;

        for index in first..=last {
            if self.in_use.iter().any(|(used, _)| *used == index) {
                continue;
            }
            let Some(beat) = beats.get_by_index(index) else {
                continue;
            };
            let marker = self.acquire_marker(scene);
            scene.set_position(
                marker,
                Vec3::new(self.score_width / 2.0, self.time_to_y(beat.start as f64), 0.0),
            );
            scene.attach(marker);
            self.in_use.push((index, marker));
        }
    }

    fn update_chord_bars(&mut self, chords: &ChordTimeline, window: &ScoreWindow, scene: &mut dyn SceneSink) {
        for bar in self.chord_bars.iter_mut() {
            let Some(span) = chords.spans().get(bar.span_index) else {
                continue;
            };
            let inside = span.overlaps(window.window_start, window.window_end);
            if inside != bar.attached {
                for &id in &bar.entities {
                    if inside {
                        scene.attach(id);
                    } else {
                        scene.detach(id);
                    }
                }
                bar.attached = inside;
            }
        }
    }

    /// Keep exactly one chord highlighted, clearing the old one first
    fn update_highlight(&mut self, chords: &ChordTimeline, seek_time: f64, scene: &mut dyn SceneSink) {
        let active = chords
            .active_index_at(seek_time)
            .and_then(|span_index| self.chord_bars.iter().position(|bar| bar.span_index == span_index));
        if active == self.highlighted {
            return;
        }
        if let Some(previous) = self.highlighted {
            for &id in &self.chord_bars[previous].entities {
                scene.set_highlight(id, false);
            }
        }
        if let Some(current) = active {
            for &id in &self.chord_bars[current].entities {
                scene.set_highlight(id, true);
            }
        }
        self.highlighted = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::beat::RawBeat;
    use crate::models::chord::RawChord;
    use crate::scene::{SceneCommand, SceneCommands};

    fn song() -> (BeatIndex, ChordTimeline) {
        let raw: Vec<RawBeat> = (0..20)
            .map(|i| RawBeat::new(500.0 * i as f64, 500.0 * (i + 1) as f64))
            .collect();
        let beats = BeatIndex::new(&raw, 10000.0).unwrap();
        let chords = ChordTimeline::from_raw(&[
            RawChord::new("N", 0.0, 1000.0),
            RawChord::new("C", 1000.0, 3000.0),
            RawChord::new("G7", 3000.0, 6000.0),
        ]);
        (beats, chords)
    }

    fn manager(lookahead_ms: f64) -> ScoreWindowManager {
        let config = StageConfig {
            lookahead_ms,
            marker_pool_size: 4,
            ..StageConfig::default()
        };
        ScoreWindowManager::new(&config)
    }

    #[test]
    fn test_window_clamped_to_song() {
        assert_eq!(
            ScoreWindow::at(9000.0, 2000.0, 10000.0),
            ScoreWindow { window_start: 9000.0, window_end: 10000.0 }
        );
    }

    #[test]
    fn test_markers_slide_with_window() {
        let (beats, chords) = song();
        let mut scene = SceneCommands::new();
        let mut score = manager(1000.0);
        score.on_song_data_ready(&chords, &mut scene);

        score.update(&beats, &chords, 0.0, &mut scene);
        assert_eq!(score.visible_beats(), vec![0, 1, 2]);

        score.update(&beats, &chords, 600.0, &mut scene);
        assert_eq!(score.visible_beats(), vec![1, 2, 3]);

        // Backwards seek
        score.update(&beats, &chords, 0.0, &mut scene);
        assert_eq!(score.visible_beats(), vec![1, 2, 0]);
    }

    #[test]
    fn test_pool_reuses_and_grows() {
        let (beats, chords) = song();
        let mut scene = SceneCommands::new();
        let mut score = manager(2000.0);
        score.on_song_data_ready(&chords, &mut scene);
        assert_eq!(score.markers_spawned(), 4);

        score.update(&beats, &chords, 0.0, &mut scene);
        assert_eq!(score.visible_beats().len(), 5);
        assert_eq!(score.markers_spawned(), 5);

        score.update(&beats, &chords, 5000.0, &mut scene);
        assert_eq!(score.markers_spawned(), 5, "released markers are reused");
    }

    #[test]
    fn test_chord_bars_and_single_highlight() {
        let (beats, chords) = song();
        let mut scene = SceneCommands::new();
        let mut score = manager(1500.0);
        score.on_song_data_ready(&chords, &mut scene);
        let spawned_bars = scene
            .commands()
            .iter()
            .filter(|command| matches!(command, SceneCommand::Spawn { primitive: Primitive::ChordBar { .. }, .. }))
            .count();
        assert_eq!(spawned_bars, 3 + 4, "one bar per pitch class, none for N");

        score.update(&beats, &chords, 500.0, &mut scene);
        assert_eq!(score.visible_chords(), vec![1]);
        assert_eq!(score.highlighted_chord(), None);

        score.update(&beats, &chords, 2000.0, &mut scene);
        assert_eq!(score.visible_chords(), vec![1, 2]);
        assert_eq!(score.highlighted_chord(), Some(1));

        scene.drain();
        score.update(&beats, &chords, 3500.0, &mut scene);
        assert_eq!(score.highlighted_chord(), Some(2));
        let highlights: Vec<bool> = scene
            .commands()
            .iter()
            .filter_map(|command| match command {
                SceneCommand::SetHighlight { on, .. } => Some(*on),
                _ => None,
            })
            .collect();
        assert_eq!(highlights, vec![false, false, false, true, true, true, true]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (beats, chords) = song();
        let mut scene = SceneCommands::new();
        let mut score = manager(1000.0);
        score.on_song_data_ready(&chords, &mut scene);
        score.update(&beats, &chords, 1000.0, &mut scene);
        score.on_song_reset(&mut scene);
        score.on_song_reset(&mut scene);
        assert!(score.visible_beats().is_empty());
        assert!(score.visible_chords().is_empty());
        assert_eq!(score.window(), None);
        assert_eq!(score.scroll_y(2000.0), -20.0);
    }
}
