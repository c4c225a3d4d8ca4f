//! Frame timing
//!
//! Keeps a bounded history of durations per operation so the host can show
//! how long each stage update takes.

use std::collections::{HashMap, VecDeque};

/// Samples kept per operation
const HISTORY_LEN: usize = 120;

/// Milliseconds from a monotonic-enough clock: `performance.now()` in the
/// browser, wall time elsewhere
pub fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
            .and_then(|window| window.performance())
            .map_or(0.0, |performance| performance.now())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
    }
}

/// Performance monitor for measuring operation times
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor {
    measurements: HashMap<String, VecDeque<f64>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_measurement(&mut self, operation: &str, duration_ms: f64) {
        let samples = self.measurements.entry(operation.to_string()).or_default();
        if samples.len() == HISTORY_LEN {
            samples.pop_front();
        }
        samples.push_back(duration_ms);
    }

    /// Run `work` and record how long it took
    pub fn measure<T>(&mut self, operation: &str, work: impl FnOnce() -> T) -> T {
        let started = now_ms();
        let result = work();
        self.record_measurement(operation, now_ms() - started);
        result
    }

    pub fn get_average_time(&self, operation: &str) -> Option<f64> {
        self.measurements.get(operation).map(|times| {
            if times.is_empty() {
                0.0
            } else {
                times.iter().sum::<f64>() / times.len() as f64
            }
        })
    }

    pub fn get_last_time(&self, operation: &str) -> Option<f64> {
        self.measurements.get(operation).and_then(|times| times.back().copied())
    }

    pub fn clear(&mut self) {
        self.measurements.clear();
    }
}
