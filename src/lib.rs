//! Flythrough renders a headless camera fly-through of a scene into a video file.
//!
//! The work splits into two halves:
//!
//! - [`compute_path`] expands a sparse list of keyframe poses into one pose per output frame,
//!   bounded by per-frame movement, rotation and time quanta.
//! - An [`EncodePipeline`] pulls frames lazily from a [`FrameSource`] (render one pose, compress
//!   it) on a dedicated encode thread and hands them to a [`FrameSink`] muxer, with cooperative
//!   interruption through an [`InterruptFlag`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Encoding sinks.
pub mod encode;
/// Camera-path interpolation.
pub mod path;
/// The streaming encode pipeline.
pub mod pipeline;
/// Frame renderers.
pub mod render;
/// Scene input.
pub mod scene;
/// Pull-based frame production.
pub mod source;

pub use crate::foundation::core::{CameraPose, FrameIndex, FrameSize, Lens};
pub use crate::foundation::error::{FlythroughError, FlythroughResult};
pub use crate::foundation::interrupt::InterruptFlag;

pub use crate::encode::ffmpeg::{Container, FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{Codec, FrameSink, InMemorySink, SinkRecording, VideoFormat};
pub use crate::path::interpolate::{CameraPath, MAX_PATH_FRAMES, PathQuanta, compute_path};
pub use crate::pipeline::encode::{EncodePipeline, PipelineOpts};
pub use crate::pipeline::state::PipelineState;
pub use crate::render::backend::{FrameRenderer, RasterImage, RenderError};
pub use crate::render::preview::PreviewRenderer;
pub use crate::scene::model::{Environment, Rgb8, Scene};
pub use crate::source::frame_source::{EncodedFrame, FrameSource, FrameSourceOpts};
pub use crate::source::progress::{
    LogProgress, PrintProgress, ProgressObserver, ProgressSnapshot,
};
