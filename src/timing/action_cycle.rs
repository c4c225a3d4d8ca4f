//! Looping dance clips over beats of varying length
//!
//! A rule loops its clip every `cycle_beats` beats, counted from the start
//! of the rule's beat range. Beats are not all the same length, so the
//! absolute span of one repetition is found by summing the durations of
//! the beats it covers.

use serde::Serialize;
use crate::error::{StageError, StageResult};
use crate::models::action::ActionRule;
use crate::models::beat::Beat;
use super::beat_index::{BeatIndex, BEFORE_SONG};

/// Absorbs binary-float error when a fractional cycle length divides the
/// distance from the rule start exactly.
const CYCLE_EPSILON: f64 = 1e-9;

/// Absolute time span of one repetition, in milliseconds
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct CycleSpan {
    pub start: f64,
    pub end: f64,
}

impl CycleSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Playback offset of the clip at `seek_time`
    pub fn offset(&self, seek_time: f64) -> f64 {
        seek_time - self.start
    }
}

/// The rule active at a beat position and its current repetition
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAction {
    pub rule_index: usize,
    pub clip: String,
    pub cycle_start_beat: f64,
    pub cycle_end_beat: f64,
    pub span: CycleSpan,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCycleResolver {
    rules: Vec<ActionRule>,
}

impl ActionCycleResolver {
    pub fn new(rules: Vec<ActionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// First rule in list order whose beat range contains `position`
    pub fn rule_at(&self, position: f64) -> StageResult<(usize, &ActionRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.beat.contains(position))
            .ok_or(StageError::NoMatchingRule(position))
    }

    /// Start and end beat positions of the repetition containing `position`
    pub fn cycle_beats(rule: &ActionRule, position: f64) -> (f64, f64) {
        let start = rule.beat.start;
        let length = rule.cycle_beats;
        let cycles = ((position - start) / length + CYCLE_EPSILON).floor();
        let cycle_start = start + cycles * length;
        (cycle_start, cycle_start + length)
    }

    /// Resolve the rule and repetition span at a fractional beat position
    pub fn resolve(&self, beats: &BeatIndex, position: f64) -> StageResult<ResolvedAction> {
        let (rule_index, rule) = self.rule_at(position)?;
        let (cycle_start_beat, cycle_end_beat) = Self::cycle_beats(rule, position);
        Ok(ResolvedAction {
            rule_index,
            clip: rule.clip.clone(),
            cycle_start_beat,
            cycle_end_beat,
            span: cycle_span(beats, cycle_start_beat, cycle_end_beat),
        })
    }
}

/// Convert a range of fractional beat positions to absolute milliseconds
///
/// Beats past the end of the table borrow the duration of the beat the
/// range starts in.
pub fn cycle_span(beats: &BeatIndex, start_beat: f64, end_beat: f64) -> CycleSpan {
    let start_floor = start_beat.floor();
    let start_ref = beats
        .get_by_index(start_floor as i64)
        .or_else(|| beats.get_by_index(BEFORE_SONG))
        .unwrap_or_else(|| Beat::new(BEFORE_SONG, 0, 0));
    let ref_duration = start_ref.duration() as f64;
    let duration_of = |index: i64| {
        beats
            .get_by_index(index)
            .map_or(ref_duration, |beat| beat.duration() as f64)
    };

    let start = start_ref.start as f64 + ref_duration * (start_beat - start_floor);
    let end_floor = end_beat.floor();
    let mut length = 0.0;

    // Head: from a fractional start to the next whole beat
    if start_beat != start_floor {
        if start_floor == end_floor {
            length += ref_duration * (end_beat - start_beat);
            return CycleSpan { start, end: start + length };
        }
        length += ref_duration * (start_beat.ceil() - start_beat);
    }

    let mut index = start_beat.ceil() as i64;
    let past_table = beats.beat_count() + 1;
    while (index as f64) < end_floor && index < past_table {
        length += duration_of(index);
        index += 1;
    }
    // Every whole beat past the closing sentinel borrows the reference duration
    if (index as f64) < end_floor {
        length += ref_duration * (end_floor - index as f64);
    }

    // Tail: from the last whole beat to a fractional end
    if end_beat != end_floor {
        length += duration_of(end_floor as i64) * (end_beat - end_floor);
    }

    CycleSpan { start, end: start + length }
}
