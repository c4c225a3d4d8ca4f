//! Easing curves for lyric entry, exit and reveal
//!
//! Inputs are clamped to `0..=1`.

pub fn quint_in(t: f64) -> f64 {
    t.clamp(0.0, 1.0).powi(5)
}

pub fn quint_out(t: f64) -> f64 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(5)
}

pub fn circ_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) - 1.0;
    (1.0 - t * t).sqrt()
}
