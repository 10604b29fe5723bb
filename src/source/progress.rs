use std::time::Duration;

/// Progress of a frame source after a completed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Frames rendered and encoded so far (1-based index of the latest frame).
    pub frames_processed: u64,
    /// Frames in the whole path.
    pub frames_total: u64,
    /// Wall-clock time since the first pull.
    pub elapsed: Duration,
    /// Estimated wall-clock time until the last frame, from the average time per frame so far.
    pub remaining: Duration,
}

impl ProgressSnapshot {
    /// Derive a snapshot from frame counters and elapsed time.
    pub fn compute(frames_processed: u64, frames_total: u64, elapsed: Duration) -> Self {
        let remaining = if frames_processed == 0 {
            Duration::ZERO
        } else {
            let left = frames_total.saturating_sub(frames_processed) as f64;
            let per_frame = elapsed.as_secs_f64() / frames_processed as f64;
            Duration::try_from_secs_f64(per_frame * left).unwrap_or(Duration::MAX)
        };
        Self {
            frames_processed,
            frames_total,
            elapsed,
            remaining,
        }
    }

    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 1.0;
        }
        (self.frames_processed as f64 / self.frames_total as f64).min(1.0)
    }
}

impl std::fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed frame {}/{} in {}. ETA: {}",
            self.frames_processed,
            self.frames_total,
            format_hms(self.elapsed),
            format_hms(self.remaining)
        )
    }
}

/// Format a duration as `H:MM:SS`, truncating sub-second precision.
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Receives one snapshot per completed frame, in frame order.
pub trait ProgressObserver: Send {
    /// Called after frame `snapshot.frames_processed` has been encoded.
    fn on_frame(&mut self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressSnapshot) + Send,
{
    fn on_frame(&mut self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Emits each snapshot as a `tracing` info event. Default observer of a frame source.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_frame(&mut self, snapshot: &ProgressSnapshot) {
        tracing::info!(
            frame = snapshot.frames_processed,
            total = snapshot.frames_total,
            "{snapshot}"
        );
    }
}

/// Prints each snapshot as one line on stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintProgress;

impl ProgressObserver for PrintProgress {
    fn on_frame(&mut self, snapshot: &ProgressSnapshot) {
        println!("{snapshot}");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/progress.rs"]
mod tests;
