/// Convenience result type used across flythrough.
pub type FlythroughResult<T> = Result<T, FlythroughError>;

/// Top-level error taxonomy used by the path, source and pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum FlythroughError {
    /// Invalid user-provided parameters (speed, fps, frame size, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed or unreadable scene input. Raised before any rendering happens.
    #[error("scene read error: {0}")]
    SceneRead(String),

    /// The frame renderer failed mid-stream.
    #[error("render error: {0}")]
    Render(String),

    /// Cooperative cancellation (interrupt flag or elapsed deadline).
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// The muxer rejected the declared or realized format.
    #[error("format negotiation error: {0}")]
    FormatNegotiation(String),

    /// Write or finalize failure reported by the sink.
    #[error("sink error: {0}")]
    Sink(String),

    /// Controller misuse, e.g. starting a pipeline that was never realized.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlythroughError {
    /// Build a [`FlythroughError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlythroughError::SceneRead`] value.
    pub fn scene_read(msg: impl Into<String>) -> Self {
        Self::SceneRead(msg.into())
    }

    /// Build a [`FlythroughError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`FlythroughError::Interrupted`] value.
    pub fn interrupted(msg: impl Into<String>) -> Self {
        Self::Interrupted(msg.into())
    }

    /// Build a [`FlythroughError::FormatNegotiation`] value.
    pub fn format_negotiation(msg: impl Into<String>) -> Self {
        Self::FormatNegotiation(msg.into())
    }

    /// Build a [`FlythroughError::Sink`] value.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Build a [`FlythroughError::Pipeline`] value.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Return `true` for cooperative cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
