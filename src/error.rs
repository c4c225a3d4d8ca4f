//! Error types for the stage core
//!
//! `StageError` covers the per-frame failure taxonomy. None of these are fatal:
//! every consumer logs them and falls back to a sentinel or the previous
//! frame's state. `LoadError` covers parsing of configuration and song tables.

use thiserror::Error;

/// Runtime lookup failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// A beat index outside the loaded table and its two sentinels
    #[error("no beat at index {0}")]
    MissingBeat(i64),

    /// Chord symbol whose root or attribute is not in the known tables
    #[error("unsupported chord symbol: {0}")]
    UnsupportedSymbol(String),

    /// No action rule covers the beat position (authoring defect)
    #[error("no action rule covers beat position {0}")]
    NoMatchingRule(f64),

    /// Seek time inside the song span but the beat finder found nothing
    #[error("beat lookup failed at {seek_time}ms inside the song span")]
    InconsistentBeatLookup { seek_time: f64 },

    /// Song data has not been loaded yet (or was reset)
    #[error("song data not ready")]
    NotReady,

    /// Raw song data that cannot be used at all
    #[error("invalid song data: {0}")]
    InvalidSongData(String),
}

/// Configuration and data table loading failures
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value: {0}")]
    Invalid(String),
}

pub type StageResult<T> = Result<T, StageError>;
