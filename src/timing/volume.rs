//! Volume meter: columns of cells that rise and fall with the song's loudness
//!
//! Each column has its own random gain, refreshed every few frames, so the
//! columns wobble around the current loudness instead of moving in lockstep.
//! Heights move one cell per update toward their target.

use serde::Serialize;
use crate::scene::{EntityId, Primitive, SceneSink, Vec3};
use super::dance::{OsRandom, RandomSource};

pub const METER_COLUMNS: usize = 10;
pub const METER_ROWS: usize = 20;

/// Minimum time between two height steps
const STEP_INTERVAL_MS: f64 = 40.0;
/// Gains are redrawn once this much time has passed
const GAIN_INTERVAL_MS: f64 = 60.0;
const MAX_GAIN: f64 = 1.5;
/// Height every column starts from
const IDLE_HEIGHT: usize = 1;

/// Column heights after an update; a column of height `h` shows rows `0..=h`
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeFrame {
    pub heights: Vec<u8>,
    pub changed: bool,
}

#[derive(Debug)]
pub struct VolumeMeter<R: RandomSource = OsRandom> {
    random: R,
    /// `cells[column][row]`, empty until the first song is ready
    cells: Vec<Vec<EntityId>>,
    /// Rows currently attached per column
    shown: [usize; METER_COLUMNS],
    heights: [usize; METER_COLUMNS],
    gains: [f64; METER_COLUMNS],
    volume_per_cell: f64,
    last_step: f64,
    last_gain: f64,
}

impl VolumeMeter<OsRandom> {
    pub fn new() -> Self {
        Self::with_random(OsRandom)
    }
}

impl<R: RandomSource> VolumeMeter<R> {
    pub fn with_random(random: R) -> Self {
        Self {
            random,
            cells: Vec::new(),
            shown: [0; METER_COLUMNS],
            heights: [IDLE_HEIGHT; METER_COLUMNS],
            gains: [1.0; METER_COLUMNS],
            volume_per_cell: 0.0,
            last_step: 0.0,
            last_gain: 0.0,
        }
    }

    pub fn heights(&self) -> [usize; METER_COLUMNS] {
        self.heights
    }

    /// Scale the meter to the song's loudest moment
    ///
    /// The cells are spawned on the first call and kept for later songs.
    pub fn on_song_data_ready(&mut self, max_volume: f64, scene: &mut dyn SceneSink) {
        self.volume_per_cell = if max_volume.is_finite() && max_volume > 0.0 {
            max_volume / METER_ROWS as f64
        } else {
            log::warn!("volume meter: no usable max volume ({}), meter stays idle", max_volume);
            0.0
        };

        if self.cells.is_empty() {
            self.cells = (0..METER_COLUMNS)
                .map(|column| {
                    (0..METER_ROWS)
                        .map(|row| {
                            let id = scene.spawn(
                                Primitive::VolumeCell {
                                    column: column as u8,
                                    row: row as u8,
                                },
                                None,
                            );
                            scene.set_position(id, Vec3::new(column as f64, row as f64, 0.0));
                            id
                        })
                        .collect()
                })
                .collect();
            for column in 0..METER_COLUMNS {
                self.show(column, 1, scene);
            }
        }
    }

    /// Step the columns toward `volume`
    ///
    /// Updates closer than the step interval to the previous one, in either
    /// direction, are skipped.
    pub fn update(&mut self, volume: f64, seek_time: f64, scene: &mut dyn SceneSink) -> VolumeFrame {
        if (seek_time - self.last_step).abs() < STEP_INTERVAL_MS {
            return self.frame(false);
        }
        self.last_step = seek_time;

        if (seek_time - self.last_gain).abs() > GAIN_INTERVAL_MS {
            for gain in self.gains.iter_mut() {
                *gain = self.random.next_unit() * MAX_GAIN;
            }
            self.last_gain = seek_time;
        }

        let mut changed = false;
        for column in 0..METER_COLUMNS {
            let target = self.target_height(volume, self.gains[column]);
            let height = self.heights[column];
            let next = if target > height {
                height + 1
            } else if target < height {
                height - 1
            } else {
                height
            };
            changed |= next != height;
            self.heights[column] = next;
            self.show(column, next + 1, scene);
        }
        self.frame(changed)
    }

    /// Back to the idle look: one cell per column
    pub fn reset(&mut self, scene: &mut dyn SceneSink) {
        self.heights = [IDLE_HEIGHT; METER_COLUMNS];
        self.volume_per_cell = 0.0;
        self.last_step = 0.0;
        self.last_gain = 0.0;
        for column in 0..METER_COLUMNS {
            self.show(column, 1, scene);
        }
    }

    fn target_height(&self, volume: f64, gain: f64) -> usize {
        if self.volume_per_cell <= 0.0 || !volume.is_finite() || volume <= 0.0 {
            return 0;
        }
        let cells = (volume / self.volume_per_cell * gain).round();
        cells.min((METER_ROWS - 1) as f64) as usize
    }

    /// Attach or detach cells so exactly `rows` rows of `column` are shown
    fn show(&mut self, column: usize, rows: usize, scene: &mut dyn SceneSink) {
        let Some(cells) = self.cells.get(column) else {
            return;
        };
        let rows = rows.min(cells.len());
        let shown = self.shown[column];
        for &id in cells.iter().take(rows).skip(shown) {
            scene.attach(id);
        }
        for &id in cells.iter().take(shown).skip(rows) {
            scene.detach(id);
        }
        self.shown[column] = rows;
    }

    fn frame(&self, changed: bool) -> VolumeFrame {
        VolumeFrame {
            heights: self.heights.iter().map(|&height| height as u8).collect(),
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneCommand, SceneCommands};

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    fn count(commands: &[SceneCommand], predicate: fn(&SceneCommand) -> bool) -> usize {
        commands.iter().filter(|command| predicate(command)).count()
    }

    /// Gain 1.0: one cell per 5 volume units with a max volume of 100
    fn meter(scene: &mut SceneCommands) -> VolumeMeter<Fixed> {
        let mut meter = VolumeMeter::with_random(Fixed(1.0 / MAX_GAIN));
        meter.on_song_data_ready(100.0, scene);
        meter
    }

    #[test]
    fn test_ready_spawns_grid_once() {
        let mut scene = SceneCommands::new();
        let mut meter = meter(&mut scene);
        let commands = scene.drain();
        assert_eq!(
            count(&commands, |c| matches!(c, SceneCommand::Spawn { .. })),
            METER_COLUMNS * METER_ROWS
        );
        assert_eq!(count(&commands, |c| matches!(c, SceneCommand::Attach { .. })), METER_COLUMNS);

        meter.on_song_data_ready(80.0, &mut scene);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_heights_step_one_cell_toward_target() {
        let mut scene = SceneCommands::new();
        let mut meter = meter(&mut scene);
        scene.drain();

        // Target 10 cells; each update climbs a single cell
        let frame = meter.update(50.0, 100.0, &mut scene);
        assert!(frame.changed);
        assert_eq!(frame.heights, vec![2; METER_COLUMNS]);
        assert_eq!(count(&scene.drain(), |c| matches!(c, SceneCommand::Attach { .. })), 2 * METER_COLUMNS);

        assert_eq!(meter.update(50.0, 140.0, &mut scene).heights[0], 3);
        assert_eq!(meter.update(50.0, 180.0, &mut scene).heights[0], 4);
        scene.drain();

        // Silence: one cell down
        let frame = meter.update(0.0, 220.0, &mut scene);
        assert_eq!(frame.heights[0], 3);
        assert_eq!(count(&scene.drain(), |c| matches!(c, SceneCommand::Detach { .. })), METER_COLUMNS);
    }

    #[test]
    fn test_updates_inside_step_interval_are_skipped() {
        let mut scene = SceneCommands::new();
        let mut meter = meter(&mut scene);
        scene.drain();

        assert!(meter.update(50.0, 100.0, &mut scene).changed);
        scene.drain();
        let skipped = meter.update(50.0, 139.0, &mut scene);
        assert!(!skipped.changed);
        assert_eq!(skipped.heights[0], 2);
        assert!(scene.is_empty());

        // Backward jumps are throttled the same way
        assert!(!meter.update(50.0, 61.0, &mut scene).changed);
        assert!(meter.update(50.0, 40.0, &mut scene).changed);
    }

    #[test]
    fn test_gains_redrawn_after_interval() {
        let mut scene = SceneCommands::new();
        let mut meter = VolumeMeter::with_random(Fixed(0.0));
        meter.on_song_data_ready(100.0, &mut scene);

        // Gains start at 1.0 and are only redrawn past the gain interval
        assert_eq!(meter.update(50.0, 50.0, &mut scene).heights[0], 2);
        // Gain 0: target 0
        assert_eq!(meter.update(50.0, 100.0, &mut scene).heights[0], 1);
        assert_eq!(meter.update(50.0, 140.0, &mut scene).heights[0], 0);
        assert_eq!(meter.update(50.0, 180.0, &mut scene).heights[0], 0);
    }

    #[test]
    fn test_height_capped_at_top_row() {
        let mut scene = SceneCommands::new();
        let mut meter = VolumeMeter::with_random(Fixed(1.0));
        meter.on_song_data_ready(100.0, &mut scene);

        for step in 1..40 {
            meter.update(100.0, step as f64 * 100.0, &mut scene);
        }
        assert_eq!(meter.heights(), [METER_ROWS - 1; METER_COLUMNS]);
        // Falls as soon as the volume drops
        assert_eq!(meter.update(0.0, 5000.0, &mut scene).heights[0] as usize, METER_ROWS - 2);
    }

    #[test]
    fn test_without_max_volume_meter_stays_low() {
        let mut scene = SceneCommands::new();
        let mut meter = VolumeMeter::with_random(Fixed(1.0));
        meter.on_song_data_ready(0.0, &mut scene);
        assert_eq!(meter.update(50.0, 100.0, &mut scene).heights[0], 0);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut scene = SceneCommands::new();
        let mut meter = meter(&mut scene);
        for step in 1..5 {
            meter.update(50.0, step as f64 * 100.0, &mut scene);
        }
        scene.drain();

        assert_eq!(meter.heights(), [5; METER_COLUMNS]);

        meter.reset(&mut scene);
        assert_eq!(meter.heights(), [IDLE_HEIGHT; METER_COLUMNS]);
        let commands = scene.drain();
        assert_eq!(count(&commands, |c| matches!(c, SceneCommand::Detach { .. })), 5 * METER_COLUMNS);
        assert_eq!(count(&commands, |c| matches!(c, SceneCommand::Despawn { .. })), 0);

        meter.reset(&mut scene);
        assert!(scene.is_empty());
    }
}
