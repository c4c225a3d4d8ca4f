//! Live Stage WASM Module
//!
//! Timing core of the live stage visualizer. The host page owns the 3D
//! renderer and the media-analysis player; this module turns the playback
//! position into the current beat, chord, dance cycle, lyric state and the
//! scene changes needed to show them.

pub mod error;
pub mod models;
pub mod timing;
pub mod scene;
pub mod stage;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use error::{LoadError, StageError, StageResult};
pub use models::*;
pub use scene::{SceneCommand, SceneCommands, SceneSink};
pub use stage::{FrameState, Stage};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }

    log::info!("Live stage WASM module initialized");
}
