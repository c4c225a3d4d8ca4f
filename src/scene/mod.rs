//! Scene attachment
//!
//! The renderer lives on the host side. Components that add or remove
//! entities get a `&mut dyn SceneSink` for the duration of a call and never
//! hold on to it. `SceneCommands` records the calls so the host can replay
//! them against its scene graph once per frame.

use serde::{Deserialize, Serialize};
use crate::models::chord::PitchClass;
use crate::models::lyric::ColorKey;

/// Host-side handle of a spawned entity
pub type EntityId = u32;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Things the stage asks the renderer to build
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Primitive {
    /// Horizontal line across the score at a beat start
    BeatMarker { width: f64 },
    /// Vertical bar over one piano key for the length of a chord
    #[serde(rename_all = "camelCase")]
    ChordBar { key: PitchClass, length: f64 },
    /// Container that scrolls one lyric phrase
    PhraseGroup { lane: u8 },
    /// One lyric display unit
    #[serde(rename_all = "camelCase")]
    LyricBox { text: String, width: f64, color_key: ColorKey },
    /// One cell of the volume meter
    VolumeCell { column: u8, row: u8 },
}

pub trait SceneSink {
    /// Create an entity, detached, optionally as a child of `parent`
    fn spawn(&mut self, primitive: Primitive, parent: Option<EntityId>) -> EntityId;
    fn attach(&mut self, id: EntityId);
    fn detach(&mut self, id: EntityId);
    fn set_position(&mut self, id: EntityId, position: Vec3);
    fn set_highlight(&mut self, id: EntityId, on: bool);
    /// Reveal animation progress in `0..=1`
    fn set_progress(&mut self, id: EntityId, progress: f64);
    fn despawn(&mut self, id: EntityId);
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SceneCommand {
    Spawn { id: EntityId, primitive: Primitive, parent: Option<EntityId> },
    Attach { id: EntityId },
    Detach { id: EntityId },
    SetPosition { id: EntityId, position: Vec3 },
    SetHighlight { id: EntityId, on: bool },
    SetProgress { id: EntityId, progress: f64 },
    Despawn { id: EntityId },
}

impl SceneCommand {
    pub fn id(&self) -> EntityId {
        match self {
            SceneCommand::Spawn { id, .. }
            | SceneCommand::Attach { id }
            | SceneCommand::Detach { id }
            | SceneCommand::SetPosition { id, .. }
            | SceneCommand::SetHighlight { id, .. }
            | SceneCommand::SetProgress { id, .. }
            | SceneCommand::Despawn { id } => *id,
        }
    }
}

/// Recording sink with sequential entity ids
#[derive(Debug, Clone, Default)]
pub struct SceneCommands {
    next_id: EntityId,
    commands: Vec<SceneCommand>,
}

impl SceneCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[SceneCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take the recorded commands, keeping the id counter
    pub fn drain(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl SceneSink for SceneCommands {
    fn spawn(&mut self, primitive: Primitive, parent: Option<EntityId>) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.commands.push(SceneCommand::Spawn { id, primitive, parent });
        id
    }

    fn attach(&mut self, id: EntityId) {
        self.commands.push(SceneCommand::Attach { id });
    }

    fn detach(&mut self, id: EntityId) {
        self.commands.push(SceneCommand::Detach { id });
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) {
        self.commands.push(SceneCommand::SetPosition { id, position });
    }

    fn set_highlight(&mut self, id: EntityId, on: bool) {
        self.commands.push(SceneCommand::SetHighlight { id, on });
    }

    fn set_progress(&mut self, id: EntityId, progress: f64) {
        self.commands.push(SceneCommand::SetProgress { id, progress });
    }

    fn despawn(&mut self, id: EntityId) {
        self.commands.push(SceneCommand::Despawn { id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_across_drains() {
        let mut scene = SceneCommands::new();
        let first = scene.spawn(Primitive::BeatMarker { width: 8.0 }, None);
        scene.attach(first);
        assert_eq!(scene.drain().len(), 2);
        assert!(scene.is_empty());
        let second = scene.spawn(Primitive::PhraseGroup { lane: 3 }, None);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_command_json_shape() {
        let command = SceneCommand::Spawn {
            id: 4,
            primitive: Primitive::ChordBar { key: 7, length: 2.5 },
            parent: None,
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["op"], "spawn");
        assert_eq!(json["primitive"]["kind"], "chordBar");
        assert_eq!(json["primitive"]["key"], 7);
        assert_eq!(command.id(), 4);
    }
}
