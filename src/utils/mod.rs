//! Utility modules for the live stage
//!
//! Easing curves and frame timing.

pub mod easing;
pub mod performance;

// Re-export commonly used types
pub use performance::*;
