//! Per-song data
//!
//! `ChoreographyTable` holds the hand-authored dance and light rules for
//! known songs; `SongSnapshot` is the analysis data the host hands over when
//! a song becomes ready.

use serde::{Deserialize, Serialize};
use crate::error::LoadError;
use super::action::{ActionRule, LightRule};
use super::beat::RawBeat;
use super::chord::RawChord;
use super::lyric::RawPhrase;
use super::volume::VolumeTrack;

const BUILTIN_CHOREOGRAPHY: &str = include_str!("../../data/choreography.yaml");

/// Longest repetition a rule may ask for; the cycle span walks every beat of it
pub const MAX_CYCLE_BEATS: f64 = 256.0;

/// Rules authored for one song
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SongChoreography {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionRule>,
    #[serde(default)]
    pub lights: Vec<LightRule>,
}

/// Effective rule lists for the selected song
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SongRules {
    pub name: String,
    pub actions: Vec<ActionRule>,
    pub lights: Vec<LightRule>,
}

/// Choreography for every known song plus the catch-all defaults
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChoreographyTable {
    pub default_action: ActionRule,
    pub default_light: LightRule,
    #[serde(default)]
    pub songs: Vec<SongChoreography>,
}

impl ChoreographyTable {
    /// The table embedded in the module
    pub fn builtin() -> Result<Self, LoadError> {
        Self::from_yaml(BUILTIN_CHOREOGRAPHY)
    }

    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        let table: ChoreographyTable = serde_yaml::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let table: ChoreographyTable = serde_json::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Reject rules that would make cycle arithmetic meaningless
    pub fn validate(&self) -> Result<(), LoadError> {
        validate_action("default", &self.default_action)?;
        for song in &self.songs {
            for rule in &song.actions {
                validate_action(&song.name, rule)?;
            }
        }
        Ok(())
    }

    /// Find a song by name or URL
    pub fn find(&self, key: &str) -> Option<&SongChoreography> {
        self.songs
            .iter()
            .find(|song| song.name == key || song.url.as_deref() == Some(key))
    }

    /// Rules for `key`, falling back to the defaults for unknown songs
    ///
    /// The default action and light rule are appended to every list so any
    /// beat position resolves to some rule.
    pub fn select(&self, key: &str) -> SongRules {
        let (name, mut actions, mut lights) = match self.find(key) {
            Some(song) => (song.name.clone(), song.actions.clone(), song.lights.clone()),
            None => {
                log::info!("No choreography for '{}', using defaults", key);
                ("default".to_string(), Vec::new(), Vec::new())
            }
        };
        actions.push(self.default_action.clone());
        lights.push(self.default_light.clone());
        SongRules { name, actions, lights }
    }
}

fn validate_action(song: &str, rule: &ActionRule) -> Result<(), LoadError> {
    if !rule.cycle_beats.is_finite() || rule.cycle_beats <= 0.0 || rule.cycle_beats > MAX_CYCLE_BEATS {
        return Err(LoadError::Invalid(format!(
            "song '{}': clip '{}' has cycle length {} (allowed: (0, {}])",
            song, rule.clip, rule.cycle_beats, MAX_CYCLE_BEATS
        )));
    }
    if rule.beat.start >= rule.beat.end {
        return Err(LoadError::Invalid(format!(
            "song '{}': clip '{}' has empty beat range [{}, {})",
            song, rule.clip, rule.beat.start, rule.beat.end
        )));
    }
    Ok(())
}

/// Song analysis data pushed by the host when the song becomes ready
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SongSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    pub duration: f64,
    #[serde(default)]
    pub beats: Vec<RawBeat>,
    #[serde(default)]
    pub chords: Vec<RawChord>,
    #[serde(default)]
    pub phrases: Vec<RawPhrase>,
    #[serde(default)]
    pub volume: VolumeTrack,
}
