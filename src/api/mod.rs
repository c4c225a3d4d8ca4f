//! Live stage WASM API
//!
//! The JavaScript-facing surface of the crate.
//!
//! # Module Structure
//!
//! - `helpers`: Console logging macros, serialization and validation helpers
//! - `stage`: The `LiveStage` class driven by the host page

pub mod helpers;
pub mod stage;

pub use stage::{format_play_time, LiveStage};
