//! Encoding sinks.
//!
//! Sinks receive compressed frames in path order from the encode pipeline and package them into a
//! container.

/// `ffmpeg`-based muxer (QuickTime/MP4/Matroska output via the system `ffmpeg`).
pub mod ffmpeg;
/// Frame sink capability trait, formats and the in-memory sink.
pub mod sink;
