//! `LiveStage`: the stage as a JavaScript class
//!
//! The host page forwards player events and calls `update` from its
//! animation loop. Each update returns the frame state together with the
//! scene commands to apply to the renderer.

use wasm_bindgen::prelude::*;
use js_sys::Function;
use serde::Serialize;
use crate::api::helpers::{deserialize, deserialize_or_default, serialize, validate_time, validation_error};
use crate::models::config::StageConfig;
use crate::models::song::{ChoreographyTable, SongSnapshot};
use crate::scene::{SceneCommand, SceneCommands};
use crate::stage::playback::{self, LoadEvent, LoadStatus, LoadTracker, PlaybackClock, Transport};
use crate::stage::{FrameState, Stage};

/// Transport requests forwarded to JavaScript callbacks
struct JsTransport {
    play: Function,
    pause: Function,
    seek: Function,
}

impl JsTransport {
    fn report(result: Result<JsValue, JsValue>, request: &str) {
        if let Err(err) = result {
            crate::wasm_error!("{} request failed: {:?}", request, err);
        }
    }
}

impl Transport for JsTransport {
    fn request_play(&mut self) {
        Self::report(self.play.call0(&JsValue::NULL), "play");
    }

    fn request_pause(&mut self) {
        Self::report(self.pause.call0(&JsValue::NULL), "pause");
    }

    fn request_seek(&mut self, time: f64) {
        Self::report(self.seek.call1(&JsValue::NULL, &JsValue::from_f64(time)), "seek");
    }
}

#[derive(Serialize)]
struct FrameUpdate {
    frame: FrameState,
    commands: Vec<SceneCommand>,
}

#[wasm_bindgen]
pub struct LiveStage {
    stage: Stage,
    scene: SceneCommands,
    load: LoadTracker,
    clock: PlaybackClock,
    transport: Option<JsTransport>,
}

#[wasm_bindgen]
impl LiveStage {
    /// Create a stage from an optional config object and an optional YAML
    /// choreography table (the embedded table is used when absent)
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, choreography_yaml: Option<String>) -> Result<LiveStage, JsValue> {
        let config: StageConfig = deserialize_or_default(config, "Invalid stage config")?;
        config
            .validate()
            .map_err(|e| validation_error(format!("Invalid stage config: {}", e)))?;

        let choreography = match choreography_yaml {
            Some(text) => ChoreographyTable::from_yaml(&text),
            None => ChoreographyTable::builtin(),
        }
        .map_err(|e| validation_error(format!("Invalid choreography table: {}", e)))?;

        crate::wasm_info!(
            "LiveStage created: lookahead={}ms, {} choreographed songs",
            config.lookahead_ms,
            choreography.songs.len()
        );
        Ok(LiveStage {
            stage: Stage::new(config, choreography),
            scene: SceneCommands::new(),
            load: LoadTracker::new(),
            clock: PlaybackClock::new(),
            transport: None,
        })
    }

    /// Report a player load status (1..=10); returns the lifecycle events
    /// the host should act on
    #[wasm_bindgen(js_name = onLoadStatus)]
    pub fn on_load_status(&mut self, status: u8) -> Result<JsValue, JsValue> {
        let status = LoadStatus::from_code(status)
            .ok_or_else(|| validation_error(format!("Unknown load status: {}", status)))?;
        let events = self.load.on_status(status);
        if events.contains(&LoadEvent::SongChanged) {
            self.stage.on_song_reset(&mut self.scene);
            self.clock.reset();
        }
        serialize(&events, "Failed to serialize load events")
    }

    /// Build the song tables from a song snapshot object
    #[wasm_bindgen(js_name = onSongDataReady)]
    pub fn on_song_data_ready(&mut self, snapshot: JsValue) -> Result<(), JsValue> {
        let snapshot: SongSnapshot = deserialize(snapshot, "Invalid song snapshot")?;
        crate::wasm_info!(
            "onSongDataReady: '{}' {} beats, {} chords, {} phrases",
            snapshot.name,
            snapshot.beats.len(),
            snapshot.chords.len(),
            snapshot.phrases.len()
        );
        self.stage
            .on_song_data_ready(&snapshot, &mut self.scene)
            .map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = onSongReset)]
    pub fn on_song_reset(&mut self) {
        self.stage.on_song_reset(&mut self.scene);
        self.clock.reset();
    }

    /// The player reported a seek
    #[wasm_bindgen(js_name = onSeek)]
    pub fn on_seek(&mut self, time: f64) {
        self.clock.on_seek(time);
    }

    /// Time the next frame should be drawn at
    #[wasm_bindgen(js_name = frameSeekTime)]
    pub fn frame_seek_time(&mut self, is_playing: bool, position: f64) -> f64 {
        self.clock
            .frame_time(self.load.status(), is_playing, position, self.stage.song_duration())
    }

    /// Resolve one frame: `{ frame, commands }`
    ///
    /// A non-finite seek time redraws the previous frame's time instead of
    /// failing the host's animation loop.
    pub fn update(&mut self, seek_time: f64) -> Result<JsValue, JsValue> {
        if !seek_time.is_finite() {
            crate::wasm_warn!("update: seek time {} is not finite, using {}ms", seek_time, self.clock.seek_time());
        }
        let seek_time = self.clock.finite_or_last(seek_time);
        let frame = self.stage.update(seek_time, &mut self.scene);
        let update = FrameUpdate {
            frame,
            commands: self.scene.drain(),
        };
        serialize(&update, "Failed to serialize frame")
    }

    /// Scene commands produced outside `update` (song ready / reset)
    #[wasm_bindgen(js_name = drainCommands)]
    pub fn drain_commands(&mut self) -> Result<JsValue, JsValue> {
        serialize(&self.scene.drain(), "Failed to serialize scene commands")
    }

    #[wasm_bindgen(js_name = setTransport)]
    pub fn set_transport(&mut self, play: Function, pause: Function, seek: Function) {
        self.transport = Some(JsTransport { play, pause, seek });
    }

    #[wasm_bindgen(js_name = requestPlay)]
    pub fn request_play(&mut self, is_playing: bool) -> bool {
        match self.transport.as_mut() {
            Some(transport) => playback::request_play(transport, is_playing),
            None => {
                crate::wasm_warn!("requestPlay: no transport set");
                false
            }
        }
    }

    #[wasm_bindgen(js_name = requestPause)]
    pub fn request_pause(&mut self, is_playing: bool) -> bool {
        match self.transport.as_mut() {
            Some(transport) => playback::request_pause(transport, is_playing),
            None => {
                crate::wasm_warn!("requestPause: no transport set");
                false
            }
        }
    }

    #[wasm_bindgen(js_name = requestSeek)]
    pub fn request_seek(&mut self, time: f64) -> Result<(), JsValue> {
        validate_time(time, "seek time").map_err(validation_error)?;
        match self.transport.as_mut() {
            Some(transport) => transport.request_seek(time),
            None => crate::wasm_warn!("requestSeek: no transport set"),
        }
        Ok(())
    }

    /// Seek to a fraction of the song; returns the requested time
    #[wasm_bindgen(js_name = seekToRatio)]
    pub fn seek_to_ratio(&mut self, ratio: f64) -> Option<f64> {
        let time = playback::seek_time_for_ratio(ratio, self.stage.song_duration())?;
        if let Some(transport) = self.transport.as_mut() {
            transport.request_seek(time);
        }
        Some(time)
    }

    #[wasm_bindgen(js_name = songDuration)]
    pub fn song_duration(&self) -> f64 {
        self.stage.song_duration()
    }

    #[wasm_bindgen(js_name = averageUpdateMs)]
    pub fn average_update_ms(&self) -> Option<f64> {
        self.stage.monitor().get_average_time("update")
    }
}

/// `m:ss` display of a playback time
#[wasm_bindgen(js_name = formatPlayTime)]
pub fn format_play_time(time_ms: f64) -> String {
    playback::format_play_time(time_ms)
}
