//! Frame rendering collaborators.
//!
//! The encode core only depends on [`backend::FrameRenderer`]; [`preview::PreviewRenderer`] is the
//! built-in headless implementation used by the CLI.

/// Renderer trait and error type.
pub mod backend;
/// Exactly-once ownership of a renderer.
pub mod lease;
/// Headless software preview renderer.
pub mod preview;
