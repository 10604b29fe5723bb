use crate::encode::sink::{Codec, FrameSink, VideoFormat};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::source::frame_source::EncodedFrame;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Output container written by [`FfmpegSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Container {
    /// QuickTime `.mov`; carries motion JPEG or PNG tracks without re-encoding.
    #[default]
    QuickTime,
    /// MPEG-4 `.mp4`; H.264 only.
    Mp4,
    /// Matroska `.mkv`.
    Matroska,
}

impl Container {
    /// Infer the container from the output file extension, defaulting to QuickTime.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4" | "m4v") => Self::Mp4,
            Some("mkv") => Self::Matroska,
            _ => Self::QuickTime,
        }
    }

    /// Container name as understood by `ffmpeg -f`.
    pub fn muxer_name(self) -> &'static str {
        match self {
            Self::QuickTime => "mov",
            Self::Mp4 => "mp4",
            Self::Matroska => "matroska",
        }
    }

    fn passes_stills_through(self) -> bool {
        !matches!(self, Self::Mp4)
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Output container.
    pub container: Container,
}

impl FfmpegSinkOpts {
    /// Create options for `out_path`, inferring the container from its extension.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        let out_path = out_path.into();
        let container = Container::from_path(&out_path);
        Self {
            out_path,
            overwrite: true,
            container,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and pipes encoded stills to its stdin.
///
/// Frames go in as an `image2pipe` stream. Track 0 is either the input stream copied as-is or an
/// H.264 re-encode, depending on what the negotiation picked.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    input: Option<VideoFormat>,
    track: Option<VideoFormat>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            input: None,
            track: None,
            last_idx: None,
        }
    }

    /// Output options.
    pub fn opts(&self) -> &FfmpegSinkOpts {
        &self.opts
    }

    fn join_stderr(&mut self) -> FlythroughResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => Ok(handle
                .join()
                .map_err(|_| FlythroughError::sink("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| FlythroughError::sink(format!("ffmpeg stderr read failed: {e}")))?),
            None => Ok(Vec::new()),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn supported_formats(&self, track: usize, input: &VideoFormat) -> Vec<VideoFormat> {
        if track != 0 || !input.codec.is_still_image() {
            return Vec::new();
        }
        let mut formats = Vec::with_capacity(2);
        if self.opts.container.passes_stills_through() {
            formats.push(*input);
        }
        // yuv420p needs even dimensions.
        if input.frame_size().is_even() {
            formats.push(input.with_codec(Codec::H264));
        }
        formats
    }

    #[tracing::instrument(skip(self), fields(out = %self.opts.out_path.display()))]
    fn configure(&mut self, input: &VideoFormat) -> FlythroughResult<()> {
        if input.fps == 0 {
            return Err(FlythroughError::validation("fps must be non-zero"));
        }
        if input.width == 0 || input.height == 0 {
            return Err(FlythroughError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !input.codec.is_still_image() {
            return Err(FlythroughError::format_negotiation(format!(
                "ffmpeg sink cannot take {} frames as input",
                input.codec.tag()
            )));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(FlythroughError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        self.input = Some(*input);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(out = %self.opts.out_path.display()))]
    fn realize(&mut self, track: &VideoFormat) -> FlythroughResult<()> {
        let input = self
            .input
            .ok_or_else(|| FlythroughError::sink("ffmpeg sink realized before configure"))?;
        if !self.supported_formats(0, &input).contains(track) {
            return Err(FlythroughError::format_negotiation(format!(
                "{} cannot be written to a {} container",
                track,
                self.opts.container.muxer_name()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(FlythroughError::sink(
                "ffmpeg is required for video output, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(ffmpeg_args(&self.opts, &input, track));

        let mut child = cmd.spawn().map_err(|e| {
            FlythroughError::sink(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlythroughError::sink("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FlythroughError::sink("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(track = %track, "ffmpeg spawned");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.track = Some(*track);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, frame: &EncodedFrame) -> FlythroughResult<()> {
        let input = self
            .input
            .filter(|_| self.track.is_some())
            .ok_or_else(|| FlythroughError::sink("ffmpeg sink not realized"))?;
        if let Some(last) = self.last_idx
            && frame.index.0 <= last.0
        {
            return Err(FlythroughError::sink(
                "ffmpeg sink received out-of-order frame index",
            ));
        }

        if frame.codec != input.codec {
            return Err(FlythroughError::format_negotiation(format!(
                "frame codec {} does not match the negotiated input {}",
                frame.codec.tag(),
                input.codec.tag()
            )));
        }
        if frame.width != input.width || frame.height != input.height {
            return Err(FlythroughError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, input.width, input.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FlythroughError::sink("ffmpeg sink is already finalized"));
        };
        self.last_idx = Some(frame.index);

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            FlythroughError::sink(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> FlythroughResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| FlythroughError::sink("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            FlythroughError::sink(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = self.join_stderr()?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(FlythroughError::sink(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg finished");
        Ok(())
    }

    fn stop(&mut self) {
        // Closing stdin lets ffmpeg finalize the frames it already has.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) if status.success() => {
                    tracing::info!(out = %self.opts.out_path.display(), "partial video kept")
                }
                Ok(status) => tracing::warn!(%status, "ffmpeg exited abnormally after stop"),
                Err(e) => tracing::warn!(error = %e, "failed to wait for ffmpeg after stop"),
            }
        }
        if let Err(e) = self.join_stderr() {
            tracing::warn!(error = %e, "ffmpeg stderr drain failed");
        }
    }

    fn close(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        let _ = self.join_stderr();
        self.input = None;
        self.track = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the `ffmpeg` argument list for muxing `input` stills into a `track` stream.
pub fn ffmpeg_args(
    opts: &FfmpegSinkOpts,
    input: &VideoFormat,
    track: &VideoFormat,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(|s| OsString::from(*s)));

    push(&[if opts.overwrite { "-y" } else { "-n" }]);
    push(&["-loglevel", "error", "-f", "image2pipe"]);
    push(&["-framerate", &input.fps.to_string()]);
    push(&["-c:v", decoder_name(input.codec), "-i", "pipe:0", "-an"]);

    if track.codec == input.codec {
        push(&["-c:v", "copy"]);
    } else {
        push(&["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
    }
    push(&["-f", opts.container.muxer_name()]);
    if !matches!(opts.container, Container::Matroska) {
        push(&["-movflags", "+faststart"]);
    }

    args.push(opts.out_path.clone().into_os_string());
    args
}

fn decoder_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Jpeg => "mjpeg",
        Codec::Png => "png",
        Codec::H264 => "h264",
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FlythroughResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
