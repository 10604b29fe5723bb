//! JSON scene input: the keyframe camera path plus the environment the preview renderer draws.

/// Scene file model and loader.
pub mod model;
