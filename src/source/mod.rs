//! Lazy, pull-based frame production.
//!
//! A [`frame_source::FrameSource`] renders and compresses one pose per pull and reports progress
//! after each frame.

/// Pull-based render + encode adapter over a camera path.
pub mod frame_source;
/// Progress snapshots and observers.
pub mod progress;
