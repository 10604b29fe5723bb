//! The streaming encode pipeline.
//!
//! A dedicated encode thread owns the frame source and the sink and executes controller commands;
//! the caller blocks on a state cell for transitions and on a separate completion signal for the
//! end of the stream.

/// Single-slot completion signal.
pub mod completion;
/// Pipeline controller and encode thread.
pub mod encode;
/// Controller states and the blocking state cell.
pub mod state;
