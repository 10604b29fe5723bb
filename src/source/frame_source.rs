use std::time::Instant;

use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;

use crate::encode::sink::{Codec, VideoFormat};
use crate::foundation::core::{FrameIndex, FrameSize};
use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::path::interpolate::CameraPath;
use crate::render::backend::{FrameRenderer, RasterImage};
use crate::render::lease::RendererLease;
use crate::source::progress::{LogProgress, ProgressObserver, ProgressSnapshot};

/// One compressed frame, handed to the sink and then dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Position of the frame in the camera path.
    pub index: FrameIndex,
    /// Compression format of `data`.
    pub codec: Codec,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Compressed bytes (a complete JPEG or PNG file).
    pub data: Vec<u8>,
}

/// Options for [`FrameSource`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSourceOpts {
    /// Rendered frame size.
    pub size: FrameSize,
    /// Still-image codec used for each frame.
    pub codec: Codec,
    /// JPEG quality in `1..=100`. Ignored for PNG.
    pub jpeg_quality: u8,
}

impl Default for FrameSourceOpts {
    fn default() -> Self {
        Self {
            size: FrameSize {
                width: 640,
                height: 480,
            },
            codec: Codec::Jpeg,
            jpeg_quality: 90,
        }
    }
}

impl FrameSourceOpts {
    /// Validate codec, size and quality.
    pub fn validate(&self) -> FlythroughResult<()> {
        FrameSize::new(self.size.width, self.size.height)?;
        if !self.codec.is_still_image() {
            return Err(FlythroughError::validation(format!(
                "frame codec must be JPEG or PNG, got {}",
                self.codec.tag()
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(FlythroughError::validation(
                "jpeg quality must be within 1..=100",
            ));
        }
        Ok(())
    }
}

/// Single-pass, pull-based sequence of encoded frames over a camera path.
///
/// Each [`FrameSource::pull`] renders and compresses exactly one pose; nothing is buffered or
/// rendered ahead. Once the last frame has been produced, or a render fails, the renderer is
/// released; later pulls never render again.
pub struct FrameSource {
    path: CameraPath,
    renderer: RendererLease,
    opts: FrameSourceOpts,
    observer: Box<dyn ProgressObserver>,
    cursor: usize,
    started_at: Option<Instant>,
    poisoned: bool,
}

impl FrameSource {
    /// Create a source that renders `path` with `renderer`. Takes ownership of the renderer.
    pub fn new(
        path: CameraPath,
        renderer: Box<dyn FrameRenderer>,
        opts: FrameSourceOpts,
    ) -> FlythroughResult<Self> {
        opts.validate()?;
        Ok(Self {
            path,
            renderer: RendererLease::new(renderer),
            opts,
            observer: Box::new(LogProgress),
            cursor: 0,
            started_at: None,
            poisoned: false,
        })
    }

    /// Replace the progress observer (defaults to [`LogProgress`]).
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Format of the frames this source produces.
    pub fn declared_format(&self) -> VideoFormat {
        VideoFormat {
            codec: self.opts.codec,
            width: self.opts.size.width,
            height: self.opts.size.height,
            fps: self.path.fps(),
        }
    }

    /// Total number of frames.
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Return `true` when the path holds no frames.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Index of the next frame to be pulled.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Return `true` once every frame has been pulled.
    pub fn is_end_of_stream(&self) -> bool {
        self.cursor >= self.path.len()
    }

    /// Always `false`: a pull only costs one render and encode.
    pub fn will_read_block(&self) -> bool {
        false
    }

    /// Return `true` after a failed pull.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Return `true` once the renderer has been released.
    pub fn is_released(&self) -> bool {
        self.renderer.is_released()
    }

    /// Release the renderer now. Idempotent; also happens automatically.
    pub fn release(&mut self) {
        self.renderer.release();
    }

    /// Render and encode the next frame, or return `None` at end of stream.
    ///
    /// A failure poisons the source without advancing it and releases the renderer.
    pub fn pull(&mut self) -> FlythroughResult<Option<EncodedFrame>> {
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        if self.poisoned {
            return Err(FlythroughError::render(
                "frame source is poisoned by an earlier failure",
            ));
        }
        if self.is_end_of_stream() {
            self.renderer.release();
            return Ok(None);
        }

        let frame = match self.produce() {
            Ok(frame) => frame,
            Err(e) => {
                self.poisoned = true;
                self.renderer.release();
                return Err(e);
            }
        };

        self.cursor += 1;
        let snapshot = ProgressSnapshot::compute(
            self.cursor as u64,
            self.path.len() as u64,
            started_at.elapsed(),
        );
        self.observer.on_frame(&snapshot);
        if self.is_end_of_stream() {
            self.renderer.release();
        }
        Ok(Some(frame))
    }

    fn produce(&mut self) -> FlythroughResult<EncodedFrame> {
        let FrameSize { width, height } = self.opts.size;
        let pose = self.path[self.cursor];
        let renderer = self
            .renderer
            .get_mut()
            .ok_or_else(|| FlythroughError::render("renderer was already released"))?;
        let raster = renderer.render(&pose, width, height)?;
        if raster.dimensions() != (width, height) {
            return Err(FlythroughError::render(format!(
                "renderer returned a {}x{} raster, expected {width}x{height}",
                raster.width(),
                raster.height()
            )));
        }

        Ok(EncodedFrame {
            index: FrameIndex(self.cursor as u64),
            codec: self.opts.codec,
            width,
            height,
            data: encode_raster(&raster, self.opts.codec, self.opts.jpeg_quality)?,
        })
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("format", &self.declared_format())
            .field("len", &self.len())
            .field("position", &self.cursor)
            .field("poisoned", &self.poisoned)
            .field("renderer", &self.renderer)
            .finish()
    }
}

/// Compress an RGB raster into a standalone JPEG or PNG file.
pub fn encode_raster(
    raster: &RasterImage,
    codec: Codec,
    jpeg_quality: u8,
) -> FlythroughResult<Vec<u8>> {
    let mut out = Vec::new();
    match codec {
        Codec::Jpeg => JpegEncoder::new_with_quality(&mut out, jpeg_quality)
            .encode_image(raster)
            .map_err(|e| FlythroughError::render(format!("jpeg encoding failed: {e}")))?,
        Codec::Png => PngEncoder::new(&mut out)
            .write_image(
                raster.as_raw(),
                raster.width(),
                raster.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| FlythroughError::render(format!("png encoding failed: {e}")))?,
        Codec::H264 => {
            return Err(FlythroughError::validation(
                "H264 is a track format, not a still-image codec",
            ));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/source/frame_source.rs"]
mod tests;
