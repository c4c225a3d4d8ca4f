//! Load status, frame clock and transport requests
//!
//! The media player reports its loading progress as a status number. A
//! status that goes backwards means the player switched songs.

use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Serialize_repr, Deserialize_repr, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LoadStatus {
    NoData = 1,
    AppReady = 2,
    VideoLoad = 3,
    SongMapLoad = 4,
    SongInfoLoad = 5,
    LyricsLoad = 6,
    FontsLoad = 7,
    TextLoad = 8,
    VideoReady = 9,
    TimerReady = 10,
}

impl LoadStatus {
    /// Status at which loading is complete
    pub const COMPLETE: LoadStatus = LoadStatus::TimerReady;

    pub fn from_code(code: u8) -> Option<Self> {
        use LoadStatus::*;
        Some(match code {
            1 => NoData,
            2 => AppReady,
            3 => VideoLoad,
            4 => SongMapLoad,
            5 => SongInfoLoad,
            6 => LyricsLoad,
            7 => FontsLoad,
            8 => TextLoad,
            9 => VideoReady,
            10 => TimerReady,
            _ => return None,
        })
    }

    pub fn is_complete(&self) -> bool {
        *self >= Self::COMPLETE
    }
}

/// Lifecycle steps triggered by a status change, in the order to run them
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LoadEvent {
    /// Tear down everything derived from the previous song
    SongChanged,
    /// Song analysis data can be read now
    DataReady,
    /// Playback can be controlled
    TimerReady,
}

#[derive(Debug, Clone)]
pub struct LoadTracker {
    status: LoadStatus,
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self { status: LoadStatus::NoData }
    }
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn on_status(&mut self, next: LoadStatus) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        let mut previous = self.status;
        if next < previous {
            log::info!("load status {:?} -> {:?}: song changed", previous, next);
            events.push(LoadEvent::SongChanged);
            previous = LoadStatus::AppReady;
        }
        if previous < LoadStatus::VideoReady && next >= LoadStatus::VideoReady {
            events.push(LoadEvent::DataReady);
        }
        if previous < LoadStatus::TimerReady && next >= LoadStatus::TimerReady {
            events.push(LoadEvent::TimerReady);
        }
        self.status = next;
        events
    }
}

/// Picks the playback time each frame is drawn at
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    seek_time: f64,
    pending_seek: Option<f64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The player reported a seek; non-finite times are dropped
    pub fn on_seek(&mut self, time: f64) {
        if !time.is_finite() {
            log::warn!("ignoring seek to {}", time);
            return;
        }
        self.pending_seek = Some(time);
    }

    /// 0 while loading, the player position while playing, otherwise the
    /// last reported seek (or the previous frame's time)
    pub fn frame_time(&mut self, status: LoadStatus, is_playing: bool, position: f64, duration: f64) -> f64 {
        if !status.is_complete() {
            self.seek_time = 0.0;
        } else if is_playing && position <= duration {
            self.seek_time = position;
        } else if let Some(seek) = self.pending_seek.take() {
            self.seek_time = seek;
        }
        self.seek_time
    }

    pub fn seek_time(&self) -> f64 {
        self.seek_time
    }

    /// `time` if it is a usable playback time, otherwise the previous frame's
    pub fn finite_or_last(&self, time: f64) -> f64 {
        if time.is_finite() {
            time
        } else {
            self.seek_time
        }
    }

    pub fn reset(&mut self) {
        self.seek_time = 0.0;
        self.pending_seek = None;
    }
}

/// Fire-and-forget playback requests to the media player
pub trait Transport {
    fn request_play(&mut self);
    fn request_pause(&mut self);
    fn request_seek(&mut self, time: f64);
}

/// Ask to play unless already playing; returns whether a request was sent
pub fn request_play(transport: &mut dyn Transport, is_playing: bool) -> bool {
    if is_playing {
        return false;
    }
    transport.request_play();
    true
}

/// Ask to pause if playing; returns whether a request was sent
pub fn request_pause(transport: &mut dyn Transport, is_playing: bool) -> bool {
    if !is_playing {
        return false;
    }
    transport.request_pause();
    true
}

/// Seek time for a position on the seek bar, `None` before a song is loaded
pub fn seek_time_for_ratio(ratio: f64, duration: f64) -> Option<f64> {
    if duration <= 0.0 || !ratio.is_finite() {
        return None;
    }
    Some(ratio.clamp(0.0, 1.0) * duration)
}

/// `m:ss` display of a playback time in milliseconds
pub fn format_play_time(time_ms: f64) -> String {
    let total_seconds = (time_ms.max(0.0) / 1000.0).floor() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Transport for Recorder {
        fn request_play(&mut self) {
            self.calls.push("play".to_string());
        }

        fn request_pause(&mut self) {
            self.calls.push("pause".to_string());
        }

        fn request_seek(&mut self, time: f64) {
            self.calls.push(format!("seek {}", time));
        }
    }

    #[test]
    fn test_load_sequence() {
        let mut tracker = LoadTracker::new();
        assert!(tracker.on_status(LoadStatus::AppReady).is_empty());
        assert_eq!(tracker.on_status(LoadStatus::VideoReady), vec![LoadEvent::DataReady]);
        assert_eq!(tracker.on_status(LoadStatus::TimerReady), vec![LoadEvent::TimerReady]);
        assert!(tracker.on_status(LoadStatus::TimerReady).is_empty());
    }

    #[test]
    fn test_regression_means_song_change() {
        let mut tracker = LoadTracker::new();
        tracker.on_status(LoadStatus::TimerReady);
        assert_eq!(tracker.on_status(LoadStatus::VideoLoad), vec![LoadEvent::SongChanged]);
        assert_eq!(
            tracker.on_status(LoadStatus::TimerReady),
            vec![LoadEvent::DataReady, LoadEvent::TimerReady]
        );
        assert_eq!(LoadStatus::from_code(11), None);
    }

    #[test]
    fn test_frame_time() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.frame_time(LoadStatus::VideoReady, true, 500.0, 1000.0), 0.0);
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, true, 500.0, 1000.0), 500.0);
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, false, 900.0, 1000.0), 500.0);
        clock.on_seek(0.0);
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, false, 900.0, 1000.0), 0.0, "seek to zero counts");
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, true, 1200.0, 1000.0), 0.0);
    }

    #[test]
    fn test_non_finite_times_keep_the_last_frame() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, true, 700.0, 1000.0), 700.0);
        assert_eq!(clock.finite_or_last(f64::NAN), 700.0);
        assert_eq!(clock.finite_or_last(f64::INFINITY), 700.0);
        assert_eq!(clock.finite_or_last(250.0), 250.0);

        clock.on_seek(f64::NAN);
        assert_eq!(clock.frame_time(LoadStatus::TimerReady, false, 0.0, 1000.0), 700.0);
        assert!(clock.frame_time(LoadStatus::TimerReady, true, f64::NAN, 1000.0).is_finite());
    }

    #[test]
    fn test_transport_requests_only_on_change() {
        let mut transport = Recorder::default();
        assert!(!request_play(&mut transport, true));
        assert!(request_play(&mut transport, false));
        assert!(!request_pause(&mut transport, false));
        assert!(request_pause(&mut transport, true));
        assert_eq!(transport.calls, vec!["play", "pause"]);
    }

    #[test]
    fn test_seek_ratio_and_format() {
        assert_eq!(seek_time_for_ratio(0.5, 200_000.0), Some(100_000.0));
        assert_eq!(seek_time_for_ratio(1.7, 200_000.0), Some(200_000.0));
        assert_eq!(seek_time_for_ratio(0.5, 0.0), None);
        assert_eq!(format_play_time(65_432.0), "1:05");
        assert_eq!(format_play_time(0.0), "0:00");
        assert_eq!(format_play_time(600_000.0), "10:00");
    }
}
