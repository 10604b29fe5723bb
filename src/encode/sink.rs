use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::FrameSize;
use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::source::frame_source::EncodedFrame;

/// Compression format of a frame or of a container track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Baseline JPEG stills (motion JPEG when muxed).
    Jpeg,
    /// Lossless PNG stills.
    Png,
    /// H.264 video. Only valid as a track format.
    H264,
}

impl Codec {
    /// Short format tag, e.g. `"JPEG"`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::H264 => "H264",
        }
    }

    /// Return `true` for codecs a frame source can produce frame by frame.
    pub fn is_still_image(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// Codec, dimensions and frame rate of a video stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    /// Compression format.
    pub codec: Codec,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

impl VideoFormat {
    /// Same dimensions and frame rate with a different codec.
    pub fn with_codec(self, codec: Codec) -> Self {
        Self { codec, ..self }
    }

    /// Frame dimensions.
    pub fn frame_size(&self) -> FrameSize {
        FrameSize {
            width: self.width,
            height: self.height,
        }
    }
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}x{} @ {} fps",
            self.codec.tag(),
            self.width,
            self.height,
            self.fps
        )
    }
}

/// Muxer capability consumed by the encode pipeline.
///
/// Call order: `configure` → `realize` → `prefetch` → `push_frame`* → `finish`, with `stop` on
/// interruption and `close` exactly once at the end regardless of outcome. `push_frame` receives
/// frames in strictly increasing index order.
pub trait FrameSink: Send {
    /// Track formats this sink can write for `track`, given the declared input format.
    ///
    /// Preferred formats come first. An empty list means the input cannot be muxed.
    fn supported_formats(&self, track: usize, input: &VideoFormat) -> Vec<VideoFormat>;

    /// Negotiate the declared input format and output dimensions.
    fn configure(&mut self, input: &VideoFormat) -> FlythroughResult<()>;

    /// Allocate encoder resources for the selected track format.
    fn realize(&mut self, track: &VideoFormat) -> FlythroughResult<()>;

    /// Warm up before the first frame.
    fn prefetch(&mut self) -> FlythroughResult<()> {
        Ok(())
    }

    /// Mux one frame.
    fn push_frame(&mut self, frame: &EncodedFrame) -> FlythroughResult<()>;

    /// Finalize and flush the output after the last frame.
    fn finish(&mut self) -> FlythroughResult<()>;

    /// Stop early, keeping whatever was written so far.
    fn stop(&mut self);

    /// Release all sink resources. Must tolerate being called in any state.
    fn close(&mut self);
}

/// Everything an [`InMemorySink`] observed.
#[derive(Clone, Debug, Default)]
pub struct SinkRecording {
    /// Input format passed to `configure`.
    pub input: Option<VideoFormat>,
    /// Track format passed to `realize`.
    pub track: Option<VideoFormat>,
    /// Whether `prefetch` ran.
    pub prefetched: bool,
    /// Frames in the order they were pushed.
    pub frames: Vec<EncodedFrame>,
    /// Whether `finish` ran.
    pub finished: bool,
    /// Number of `stop` calls.
    pub stop_calls: usize,
    /// Number of `close` calls.
    pub close_calls: usize,
}

/// In-memory sink for tests and debugging.
///
/// Clones share one recording, so a clone kept by the caller can inspect what the pipeline pushed.
#[derive(Clone, Debug, Default)]
pub struct InMemorySink {
    supported: Option<Vec<VideoFormat>>,
    recording: Arc<Mutex<SinkRecording>>,
}

impl InMemorySink {
    /// Create a sink that accepts its input format unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise exactly `formats` for track 0 instead of echoing the input format.
    pub fn with_supported_formats(mut self, formats: Vec<VideoFormat>) -> Self {
        self.supported = Some(formats);
        self
    }

    /// Snapshot of everything recorded so far.
    pub fn recording(&self) -> SinkRecording {
        self.lock().clone()
    }

    /// Number of frames pushed so far.
    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    fn lock(&self) -> MutexGuard<'_, SinkRecording> {
        self.recording
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for InMemorySink {
    fn supported_formats(&self, track: usize, input: &VideoFormat) -> Vec<VideoFormat> {
        if track != 0 {
            return Vec::new();
        }
        match &self.supported {
            Some(formats) => formats.clone(),
            None => vec![*input],
        }
    }

    fn configure(&mut self, input: &VideoFormat) -> FlythroughResult<()> {
        self.lock().input = Some(*input);
        Ok(())
    }

    fn realize(&mut self, track: &VideoFormat) -> FlythroughResult<()> {
        let mut rec = self.lock();
        if rec.input.is_none() {
            return Err(FlythroughError::sink("in-memory sink realized before configure"));
        }
        rec.track = Some(*track);
        Ok(())
    }

    fn prefetch(&mut self) -> FlythroughResult<()> {
        self.lock().prefetched = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &EncodedFrame) -> FlythroughResult<()> {
        let mut rec = self.lock();
        if rec.track.is_none() {
            return Err(FlythroughError::sink("in-memory sink not realized"));
        }
        if let Some(last) = rec.frames.last()
            && frame.index <= last.index
        {
            return Err(FlythroughError::sink(
                "in-memory sink received out-of-order frame index",
            ));
        }
        rec.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> FlythroughResult<()> {
        self.lock().finished = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stop_calls += 1;
    }

    fn close(&mut self) {
        self.lock().close_calls += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
