//! Lyric phrases entering and leaving the stage
//!
//! Phrases are regrouped into display units once per song. Each frame the
//! tracker attaches phrases whose visibility window contains the playback
//! time, detaches the rest, and positions the units of the visible ones.

use serde::Serialize;
use crate::models::config::StageConfig;
use crate::models::lyric::{LyricPhrase, LyricUnit, RawChar, RawPhrase, UnitKind, LANG_LATIN};
use crate::scene::{EntityId, Primitive, SceneSink, Vec3};
use crate::utils::easing::{circ_out, quint_in, quint_out};

/// Off-stage x position for units outside their visibility window
const OFF_STAGE_X: f64 = -100.0;

/// Animation phase of a unit at a point in time
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "phase", content = "progress", rename_all = "camelCase")]
pub enum UnitPhase {
    Hidden,
    Entering(f64),
    Singing(f64),
    Leaving(f64),
    Gone,
}

impl UnitPhase {
    pub fn at(unit: &LyricUnit, time: f64) -> Self {
        let start = unit.start_time;
        let end = unit.end_time;
        if time < start - unit.visibility_lead {
            UnitPhase::Hidden
        } else if time < start {
            UnitPhase::Entering(1.0 - (start - time) / unit.visibility_lead)
        } else if time <= end {
            UnitPhase::Singing(unit.reveal_progress(time))
        } else if time < end + unit.visibility_lag {
            // Only reachable with a positive lag
            UnitPhase::Leaving((time - end) / unit.visibility_lag)
        } else {
            UnitPhase::Gone
        }
    }

    /// Horizontal offset from the unit's rest position; `None` when off stage
    pub fn offset_x(&self, travel: f64) -> Option<f64> {
        match *self {
            UnitPhase::Entering(progress) => Some(travel * (1.0 - quint_out(progress))),
            UnitPhase::Singing(_) => Some(0.0),
            UnitPhase::Leaving(progress) => Some(-travel * quint_in(progress)),
            UnitPhase::Hidden | UnitPhase::Gone => None,
        }
    }

    /// Radius fraction of the reveal circle drawn over the unit
    pub fn reveal_radius(&self) -> f64 {
        match *self {
            UnitPhase::Singing(progress) => circ_out(progress),
            UnitPhase::Leaving(_) | UnitPhase::Gone => 1.0,
            UnitPhase::Hidden | UnitPhase::Entering(_) => 0.0,
        }
    }
}

struct PendingWord<'a> {
    chars: Vec<&'a RawChar>,
    pos: &'a str,
}

/// Regroup one phrase into display units
///
/// Latin characters of one word merge into a single unit, every other
/// character becomes its own unit, and punctuation from the configured set
/// is always isolated. A pending Latin word is flushed at its word end, on
/// a language change, before punctuation and at the phrase end.
pub fn group_units(phrase: &RawPhrase, config: &StageConfig) -> Vec<LyricUnit> {
    let mut units = Vec::new();
    let mut pending: Option<PendingWord> = None;

    for word in &phrase.words {
        let last = word.chars.len().saturating_sub(1);
        for (position, ch) in word.chars.iter().enumerate() {
            if config.is_punctuation(&ch.text) {
                flush_word(&mut pending, &mut units, config);
                units.push(single_unit(UnitKind::Punctuation, ch, &word.language, &word.pos, config));
            } else if word.language == LANG_LATIN {
                let buffer = pending.get_or_insert_with(|| PendingWord {
                    chars: Vec::new(),
                    pos: &word.pos,
                });
                buffer.chars.push(ch);
                if position == last {
                    flush_word(&mut pending, &mut units, config);
                }
            } else {
                flush_word(&mut pending, &mut units, config);
                units.push(single_unit(UnitKind::Cjk, ch, &word.language, &word.pos, config));
            }
        }
    }
    flush_word(&mut pending, &mut units, config);
    layout(&mut units);
    units
}

fn single_unit(kind: UnitKind, ch: &RawChar, language: &str, pos: &str, config: &StageConfig) -> LyricUnit {
    LyricUnit {
        kind,
        text: ch.text.clone(),
        start_time: ch.start_time,
        end_time: ch.end_time,
        language: language.to_string(),
        color_key: kind.color_key(pos),
        width: kind.width(1),
        x: 0.0,
        visibility_lead: config.lyric_lead_ms,
        visibility_lag: config.lyric_lag_ms,
    }
}

fn flush_word(pending: &mut Option<PendingWord>, units: &mut Vec<LyricUnit>, config: &StageConfig) {
    let Some(word) = pending.take() else {
        return;
    };
    let (Some(first), Some(last)) = (word.chars.first(), word.chars.last()) else {
        return;
    };
    let kind = UnitKind::Latin;
    units.push(LyricUnit {
        kind,
        text: word.chars.iter().map(|ch| ch.text.as_str()).collect(),
        start_time: first.start_time,
        end_time: last.end_time,
        language: LANG_LATIN.to_string(),
        color_key: kind.color_key(word.pos),
        width: kind.width(word.chars.len()),
        x: 0.0,
        visibility_lead: config.lyric_lead_ms,
        visibility_lag: config.lyric_lag_ms,
    });
}

/// Place unit centres so neighbouring boxes touch, starting at 0
fn layout(units: &mut [LyricUnit]) {
    let mut x = 0.0;
    let mut previous_half = None;
    for unit in units.iter_mut() {
        if let Some(half) = previous_half {
            x += half + unit.width / 2.0;
        }
        unit.x = x;
        previous_half = Some(unit.width / 2.0);
    }
}

/// Build every phrase of a song with its display lane
pub fn build_phrases(raw: &[RawPhrase], config: &StageConfig) -> Vec<LyricPhrase> {
    raw.iter()
        .enumerate()
        .map(|(index, phrase)| LyricPhrase {
            start_time: phrase.start_time,
            end_time: phrase.end_time,
            lane: config.lane_for(index),
            units: group_units(phrase, config),
            visibility_lead: config.lyric_lead_ms,
            visibility_lag: config.lyric_lag_ms,
        })
        .collect()
}

/// Phrases that entered and left the stage this frame
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricFrame {
    pub visible: Vec<usize>,
    pub entered: Vec<usize>,
    pub left: Vec<usize>,
    /// `(phrase, unit)` being sung right now
    pub current_unit: Option<(usize, usize)>,
}

struct PhraseEntities {
    container: EntityId,
    units: Vec<EntityId>,
    attached: bool,
}

pub struct LyricWindowTracker {
    config: StageConfig,
    phrases: Vec<LyricPhrase>,
    entities: Vec<PhraseEntities>,
}

impl LyricWindowTracker {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            config: config.clone(),
            phrases: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn phrases(&self) -> &[LyricPhrase] {
        &self.phrases
    }

    /// Build the phrases and spawn their (detached) entities
    pub fn on_song_data_ready(&mut self, raw: &[RawPhrase], scene: &mut dyn SceneSink) {
        self.on_song_reset(scene);
        self.phrases = build_phrases(raw, &self.config);
        for phrase in &self.phrases {
            let container = scene.spawn(Primitive::PhraseGroup { lane: phrase.lane }, None);
            scene.set_position(container, Vec3::new(0.0, phrase.lane as f64, 0.0));
            let units = phrase
                .units
                .iter()
                .map(|unit| {
                    let id = scene.spawn(
                        Primitive::LyricBox {
                            text: unit.text.clone(),
                            width: unit.width,
                            color_key: unit.color_key,
                        },
                        Some(container),
                    );
                    scene.set_position(id, Vec3::new(unit.x, 0.0, 0.0));
                    id
                })
                .collect();
            self.entities.push(PhraseEntities {
                container,
                units,
                attached: false,
            });
        }
        log::info!(
            "lyrics ready: {} phrases, {} units",
            self.phrases.len(),
            self.phrases.iter().map(|phrase| phrase.units.len()).sum::<usize>()
        );
    }

    /// Despawn every phrase; safe to call repeatedly
    pub fn on_song_reset(&mut self, scene: &mut dyn SceneSink) {
        for phrase in self.entities.drain(..) {
            for unit in phrase.units {
                scene.despawn(unit);
            }
            scene.despawn(phrase.container);
        }
        self.phrases.clear();
    }

    pub fn update(&mut self, time: f64, scene: &mut dyn SceneSink) -> LyricFrame {
        let mut frame = LyricFrame::default();
        let travel = self.config.lyric_travel;

        for (index, (phrase, entities)) in self.phrases.iter().zip(self.entities.iter_mut()).enumerate() {
            if !phrase.is_visible(time) {
                if entities.attached {
                    scene.detach(entities.container);
                    entities.attached = false;
                    frame.left.push(index);
                }
                continue;
            }

            if !entities.attached {
                scene.attach(entities.container);
                entities.attached = true;
                frame.entered.push(index);
            }
            frame.visible.push(index);
            scene.set_position(
                entities.container,
                Vec3::new(phrase.scroll_offset(time), phrase.lane as f64, 0.0),
            );

            for (unit_index, (unit, id)) in phrase.units.iter().zip(entities.units.iter()).enumerate() {
                let phase = UnitPhase::at(unit, time);
                let x = phase
                    .offset_x(travel)
                    .map_or(OFF_STAGE_X, |offset| unit.x + offset);
                scene.set_position(*id, Vec3::new(x, 0.0, 0.0));
                scene.set_progress(*id, phase.reveal_radius());
                if unit.start_time <= time && time < unit.end_time {
                    frame.current_unit = Some((index, unit_index));
                }
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lyric::{ColorKey, RawWord};
    use crate::scene::{SceneCommand, SceneCommands};

    fn ch(text: &str, start: f64) -> RawChar {
        RawChar {
            text: text.to_string(),
            start_time: start,
            end_time: start + 100.0,
        }
    }

    fn word(language: &str, pos: &str, chars: Vec<RawChar>) -> RawWord {
        RawWord {
            language: language.to_string(),
            pos: pos.to_string(),
            chars,
        }
    }

    fn mixed_phrase() -> RawPhrase {
        RawPhrase {
            start_time: 1000.0,
            end_time: 2000.0,
            words: vec![
                word("ja", "N", vec![ch("夏", 1000.0)]),
                word("ja", "P", vec![ch("を", 1100.0)]),
                word("en", "N", vec![ch("L", 1200.0), ch("o", 1300.0), ch("v", 1400.0), ch("e", 1500.0)]),
                word("ja", "S", vec![ch("！", 1600.0)]),
            ],
        }
    }

    #[test]
    fn test_grouping_and_layout() {
        let units = group_units(&mixed_phrase(), &StageConfig::default());
        let texts: Vec<&str> = units.iter().map(|unit| unit.text.as_str()).collect();
        assert_eq!(texts, vec!["夏", "を", "Love", "！"]);

        assert_eq!(units[0].color_key, ColorKey::JapaneseNoun);
        assert_eq!(units[1].color_key, ColorKey::JapaneseOther);
        assert_eq!(units[2].color_key, ColorKey::English);
        assert_eq!(units[3].color_key, ColorKey::Symbol);

        assert_eq!(units[2].width, 2.0);
        assert_eq!(units[2].start_time, 1200.0);
        assert_eq!(units[2].end_time, 1600.0);

        let xs: Vec<f64> = units.iter().map(|unit| unit.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.5, 3.75]);
    }

    #[test]
    fn test_punctuation_splits_latin_word() {
        let phrase = RawPhrase {
            start_time: 0.0,
            end_time: 500.0,
            words: vec![word("en", "N", vec![ch("h", 0.0), ch("i", 100.0), ch("!", 200.0)])],
        };
        let units = group_units(&phrase, &StageConfig::default());
        let texts: Vec<&str> = units.iter().map(|unit| unit.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "!"]);
    }

    #[test]
    fn test_unit_phases() {
        let units = group_units(&mixed_phrase(), &StageConfig::default());
        let unit = &units[0];
        assert_eq!(UnitPhase::at(unit, -600.0), UnitPhase::Hidden);
        assert_eq!(UnitPhase::at(unit, 250.0), UnitPhase::Entering(0.5));
        assert_eq!(UnitPhase::at(unit, 1050.0), UnitPhase::Singing(0.5));
        assert_eq!(UnitPhase::at(unit, 1850.0), UnitPhase::Leaving(0.5));
        assert_eq!(UnitPhase::at(unit, 2700.0), UnitPhase::Gone);
        assert!(matches!(UnitPhase::at(unit, 2599.0), UnitPhase::Leaving(progress) if progress < 1.0));
        assert_eq!(UnitPhase::at(unit, 2600.0), UnitPhase::Gone, "gone exactly when it stops being visible");
        assert!(!unit.is_visible(2600.0));
        assert_eq!(UnitPhase::Entering(0.0).offset_x(12.0), Some(12.0));
        assert_eq!(UnitPhase::Leaving(1.0).offset_x(12.0), Some(-12.0));
        assert_eq!(UnitPhase::Gone.offset_x(12.0), None);
    }

    #[test]
    fn test_phrase_enters_and_leaves_once() {
        let mut scene = SceneCommands::new();
        let mut tracker = LyricWindowTracker::new(&StageConfig::default());
        tracker.on_song_data_ready(&[mixed_phrase()], &mut scene);
        scene.drain();

        assert!(tracker.update(-600.0, &mut scene).visible.is_empty());
        let frame = tracker.update(0.0, &mut scene);
        assert_eq!(frame.entered, vec![0]);
        let frame = tracker.update(1050.0, &mut scene);
        assert!(frame.entered.is_empty());
        assert_eq!(frame.current_unit, Some((0, 0)));

        scene.drain();
        let frame = tracker.update(3500.0, &mut scene);
        assert_eq!(frame.left, vec![0]);
        assert!(matches!(scene.commands(), [SceneCommand::Detach { .. }]));

        tracker.on_song_reset(&mut scene);
        tracker.on_song_reset(&mut scene);
        assert!(tracker.phrases().is_empty());
    }
}
