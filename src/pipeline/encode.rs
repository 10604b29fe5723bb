use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::encode::sink::{FrameSink, VideoFormat};
use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::foundation::interrupt::InterruptFlag;
use crate::pipeline::completion::Completion;
use crate::pipeline::state::{PipelineState, StateCell};
use crate::source::frame_source::FrameSource;

/// Name of the encode worker thread.
pub const ENCODE_THREAD_NAME: &str = "flythrough-encode";

/// Options controlling how the caller waits on the encode thread.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Upper bound on a single blocking wait before the interrupt flag is rechecked.
    pub poll_interval: Duration,
    /// Optional wall-clock budget for the whole run, measured from [`EncodePipeline::new`].
    pub deadline: Option<Duration>,
    /// Cooperative cancellation flag shared with the renderer and signal handlers.
    pub interrupt: InterruptFlag,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            deadline: None,
            interrupt: InterruptFlag::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Configure,
    Realize,
    Prefetch,
    Start,
    Close,
}

#[derive(Debug, Default)]
struct Shared {
    state: StateCell,
    completion: Completion,
    close_requested: AtomicBool,
}

impl Shared {
    /// Post `err` as the terminal result, then mark the state failed.
    fn fail(&self, err: FlythroughError) {
        tracing::debug!(error = %err, "encode pipeline failed");
        self.completion.post(Err(err));
        self.state.fail();
    }
}

/// Controller driving a [`FrameSource`] into a [`FrameSink`] on a dedicated encode thread.
///
/// Lifecycle methods block until the encode thread reports the matching state. Whatever happens,
/// the sink is closed exactly once and the renderer is released once the pipeline is closed or
/// dropped.
pub struct EncodePipeline {
    shared: Arc<Shared>,
    commands: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    opts: PipelineOpts,
    deadline: Option<Instant>,
    input: VideoFormat,
    frames_total: usize,
}

impl EncodePipeline {
    /// Spawn the encode thread, handing it ownership of `source` and `sink`.
    pub fn new(
        source: FrameSource,
        sink: Box<dyn FrameSink>,
        opts: PipelineOpts,
    ) -> FlythroughResult<Self> {
        let shared = Arc::new(Shared::default());
        let input = source.declared_format();
        let frames_total = source.len();
        let (tx, rx) = mpsc::channel();

        let worker = {
            let shared = Arc::clone(&shared);
            let interrupt = opts.interrupt.clone();
            std::thread::Builder::new()
                .name(ENCODE_THREAD_NAME.to_owned())
                .spawn(move || {
                    Worker {
                        source,
                        sink,
                        shared,
                        interrupt,
                        track: None,
                    }
                    .run(rx)
                })
                .map_err(|e| {
                    FlythroughError::pipeline(format!("failed to spawn encode thread: {e}"))
                })?
        };

        Ok(Self {
            shared,
            commands: Some(tx),
            worker: Some(worker),
            deadline: opts.deadline.map(|d| Instant::now() + d),
            opts,
            input,
            frames_total,
        })
    }

    /// Current controller state.
    pub fn state(&self) -> PipelineState {
        self.shared.state.get()
    }

    /// Input format declared by the frame source.
    pub fn input_format(&self) -> VideoFormat {
        self.input
    }

    /// Flag that cancels this pipeline when raised.
    pub fn interrupt_handle(&self) -> InterruptFlag {
        self.opts.interrupt.clone()
    }

    /// Negotiate the input format with the sink.
    pub fn configure(&mut self) -> FlythroughResult<()> {
        self.request(Command::Configure, PipelineState::Configured)
    }

    /// Select the track format and allocate sink resources.
    ///
    /// Fails with [`FlythroughError::FormatNegotiation`] when the sink supports no format for the
    /// declared input.
    pub fn realize(&mut self) -> FlythroughResult<()> {
        self.request(Command::Realize, PipelineState::Realized)
    }

    /// Warm up the sink.
    pub fn prefetch(&mut self) -> FlythroughResult<()> {
        self.request(Command::Prefetch, PipelineState::Prefetched)
    }

    /// Start pulling frames. Returns once the encode thread has entered the pull loop.
    pub fn start(&mut self) -> FlythroughResult<()> {
        self.request(Command::Start, PipelineState::Started)
    }

    /// Block until the stream ends, then return its outcome.
    ///
    /// An interrupt or elapsed deadline ends the wait with [`FlythroughError::Interrupted`] and
    /// asks the encode thread to stop the sink. Fails with [`FlythroughError::Pipeline`] when the
    /// pipeline was never started.
    pub fn await_completion(&mut self) -> FlythroughResult<()> {
        let state = self.state();
        if state != PipelineState::Failed && !state.has_reached(PipelineState::Started) {
            return Err(FlythroughError::pipeline(
                "cannot await completion before the pipeline is started",
            ));
        }
        let result = self.shared.completion.wait(
            &self.opts.interrupt,
            self.opts.poll_interval,
            self.deadline,
        );
        self.escalate(result)
    }

    /// Drive the whole lifecycle and close the pipeline, whatever the outcome.
    #[tracing::instrument(skip(self), fields(frames = self.frames_total))]
    pub fn run(mut self) -> FlythroughResult<()> {
        tracing::info!(format = %self.input, "creating video ({} frames)", self.frames_total);
        let result = self.drive();
        self.close();
        match &result {
            Ok(()) => tracing::info!("video complete"),
            Err(e) if e.is_interrupted() => tracing::warn!(error = %e, "video interrupted"),
            Err(e) => tracing::error!(error = %e, "video failed"),
        }
        result
    }

    /// Stop the encode thread and release sink and renderer. Idempotent.
    ///
    /// A stream still running is stopped as if interrupted.
    pub fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.close_requested.store(true, Ordering::SeqCst);
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(Command::Close);
        }
        if worker.join().is_err() {
            tracing::warn!("encode thread panicked");
        }
        self.shared.state.set(PipelineState::Closed);
    }

    fn drive(&mut self) -> FlythroughResult<()> {
        self.configure()?;
        self.realize()?;
        self.prefetch()?;
        self.start()?;
        self.await_completion()
    }

    fn request(&mut self, command: Command, target: PipelineState) -> FlythroughResult<()> {
        if self.commands.is_none() {
            return Err(FlythroughError::pipeline("pipeline is closed"));
        }
        let current = self.state();
        if current == PipelineState::Failed {
            return Err(self.failure(target));
        }
        if current.has_reached(target) {
            return Ok(());
        }
        let ready = match command {
            Command::Configure => current == PipelineState::Unconfigured,
            Command::Realize => current == PipelineState::Configured,
            Command::Prefetch => current == PipelineState::Realized,
            Command::Start => {
                matches!(current, PipelineState::Realized | PipelineState::Prefetched)
            }
            Command::Close => true,
        };
        if !ready {
            return Err(FlythroughError::pipeline(format!(
                "cannot move to {target} from {current}"
            )));
        }

        let Some(tx) = self.commands.as_ref() else {
            return Err(FlythroughError::pipeline("pipeline is closed"));
        };
        tx.send(command)
            .map_err(|_| FlythroughError::pipeline("encode thread is no longer running"))?;

        let reached = self.shared.state.await_state(
            target,
            &self.opts.interrupt,
            self.opts.poll_interval,
            self.deadline,
        );
        match self.escalate(reached)? {
            PipelineState::Failed => Err(self.failure(target)),
            _ => Ok(()),
        }
    }

    fn failure(&self, target: PipelineState) -> FlythroughError {
        match self.shared.completion.take() {
            Some(Err(e)) => e,
            _ => FlythroughError::pipeline(format!("pipeline failed before becoming {target}")),
        }
    }

    /// Raise the interrupt flag when the caller gave up waiting, so the encode thread stops too.
    fn escalate<T>(&self, result: FlythroughResult<T>) -> FlythroughResult<T> {
        if let Err(e) = &result
            && e.is_interrupted()
        {
            self.opts.interrupt.raise();
        }
        result
    }
}

impl Drop for EncodePipeline {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EncodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodePipeline")
            .field("state", &self.state())
            .field("input", &self.input)
            .field("frames_total", &self.frames_total)
            .finish_non_exhaustive()
    }
}

/// State owned by the encode thread. Dropping it closes the sink and releases the renderer.
struct Worker {
    source: FrameSource,
    sink: Box<dyn FrameSink>,
    shared: Arc<Shared>,
    interrupt: InterruptFlag,
    track: Option<VideoFormat>,
}

impl Worker {
    fn run(mut self, commands: mpsc::Receiver<Command>) {
        for command in commands.iter() {
            if command == Command::Close {
                break;
            }
            if self.shared.state.get() == PipelineState::Failed {
                continue;
            }
            self.handle(command);
        }
    }

    fn handle(&mut self, command: Command) {
        let input = self.source.declared_format();
        let step = match command {
            Command::Configure => self
                .sink
                .configure(&input)
                .map(|()| PipelineState::Configured),
            Command::Realize => self.realize(&input).map(|()| PipelineState::Realized),
            Command::Prefetch => self.sink.prefetch().map(|()| PipelineState::Prefetched),
            Command::Start => {
                self.shared.state.set(PipelineState::Started);
                self.stream()
            }
            Command::Close => return,
        };
        match step {
            Ok(next) => self.shared.state.set(next),
            Err(e) => self.shared.fail(e),
        }
    }

    fn realize(&mut self, input: &VideoFormat) -> FlythroughResult<()> {
        let formats = self.sink.supported_formats(0, input);
        let Some(track) = formats.first().copied() else {
            return Err(FlythroughError::format_negotiation(format!(
                "the muxer does not support the input format: {input}"
            )));
        };
        self.sink.realize(&track)?;
        tracing::debug!(track = %track, "track format selected");
        self.track = Some(track);
        Ok(())
    }

    /// Pull loop. Always posts the completion; the returned state only reflects success.
    fn stream(&mut self) -> FlythroughResult<PipelineState> {
        match self.pump() {
            Ok(()) => {
                self.shared.completion.post(Ok(()));
                Ok(PipelineState::Stopped)
            }
            Err(e) if e.is_interrupted() => {
                tracing::warn!(
                    frames = self.source.position(),
                    total = self.source.len(),
                    "encode stopped early"
                );
                self.shared.completion.post(Err(e));
                Ok(PipelineState::Stopped)
            }
            Err(e) => Err(e),
        }
    }

    fn pump(&mut self) -> FlythroughResult<()> {
        loop {
            if self.interrupt.is_raised() || self.shared.close_requested.load(Ordering::SeqCst) {
                self.sink.stop();
                return Err(FlythroughError::interrupted(format!(
                    "stopped after {} of {} frames",
                    self.source.position(),
                    self.source.len()
                )));
            }
            match self.source.pull() {
                Ok(Some(frame)) => self.sink.push_frame(&frame)?,
                Ok(None) => break,
                Err(e) => {
                    if e.is_interrupted() {
                        self.sink.stop();
                    }
                    return Err(e);
                }
            }
        }
        self.sink.finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.shared
                .fail(FlythroughError::pipeline("encode thread panicked"));
        } else if !self.shared.completion.is_posted() {
            self.shared.completion.post(Err(FlythroughError::pipeline(
                "pipeline closed before the stream completed",
            )));
        }
        self.sink.close();
        self.source.release();
        tracing::debug!(track = ?self.track, "encode resources released");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/encode.rs"]
mod tests;
