//! Camera-path interpolation.
//!
//! Turns the sparse keyframe list of a scene into the dense, frame-by-frame pose sequence the
//! encoder streams.

/// Piecewise-linear keyframe interpolation bounded by per-frame quanta.
pub mod interpolate;
