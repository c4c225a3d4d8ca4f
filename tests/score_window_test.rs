// Scrolling score window near the end of the song

use live_stage_wasm::models::{RawBeat, RawChord, StageConfig};
use live_stage_wasm::scene::{SceneCommand, SceneCommands};
use live_stage_wasm::timing::{BeatIndex, ChordTimeline, ScoreWindow, ScoreWindowManager};

fn song() -> (BeatIndex, ChordTimeline) {
    let raw: Vec<RawBeat> = (0..20)
        .map(|i| RawBeat::new(500.0 * i as f64, 500.0 * (i + 1) as f64))
        .collect();
    let beats = BeatIndex::new(&raw, 10000.0).unwrap();
    let chords = ChordTimeline::from_raw(&[
        RawChord::new("C", 0.0, 5000.0),
        RawChord::new("G7", 5000.0, 10000.0),
    ]);
    (beats, chords)
}

#[test]
fn test_window_end_clamped_to_duration() {
    let (beats, chords) = song();
    let config = StageConfig {
        lookahead_ms: 2000.0,
        ..StageConfig::default()
    };
    let mut scene = SceneCommands::new();
    let mut score = ScoreWindowManager::new(&config);
    score.on_song_data_ready(&chords, &mut scene);

    let window = score.update(&beats, &chords, 9000.0, &mut scene);
    assert_eq!(window, ScoreWindow { window_start: 9000.0, window_end: 10000.0 });
    assert_eq!(score.visible_beats(), vec![18, 19, 20]);
    assert_eq!(score.visible_chords(), vec![1]);
    assert_eq!(score.highlighted_chord(), Some(1));
}

#[test]
fn test_pool_is_spawned_once_across_songs() {
    let (beats, chords) = song();
    let config = StageConfig {
        marker_pool_size: 8,
        ..StageConfig::default()
    };
    let mut scene = SceneCommands::new();
    let mut score = ScoreWindowManager::new(&config);

    score.on_song_data_ready(&chords, &mut scene);
    score.update(&beats, &chords, 0.0, &mut scene);
    score.on_song_reset(&mut scene);
    scene.drain();

    score.on_song_data_ready(&chords, &mut scene);
    let markers = scene
        .commands()
        .iter()
        .filter(|command| {
            matches!(
                command,
                SceneCommand::Spawn { primitive: live_stage_wasm::scene::Primitive::BeatMarker { .. }, .. }
            )
        })
        .count();
    assert_eq!(markers, 0);
    assert_eq!(score.markers_spawned(), 8);
}
