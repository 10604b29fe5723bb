use crate::foundation::core::CameraPose;
use crate::foundation::error::FlythroughError;

/// A rendered raster: tightly packed RGB8, row-major.
pub type RasterImage = image::RgbImage;

/// Failure reported by a [`FrameRenderer`].
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// The renderer noticed a cooperative interrupt and gave up on the frame.
    #[error("rendering interrupted")]
    Interrupted,
    /// Any other rendering failure.
    #[error("{0}")]
    Failed(String),
}

impl RenderError {
    /// Build a [`RenderError::Failed`] value.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<RenderError> for FlythroughError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Interrupted => FlythroughError::interrupted("rendering interrupted"),
            RenderError::Failed(msg) => FlythroughError::render(msg),
        }
    }
}

/// Something that turns one camera pose into one raster image.
///
/// Renderers are driven from the encode thread, one frame at a time, so they only need to be
/// `Send`. [`FrameRenderer::dispose`] is called exactly once by the owning
/// [`RendererLease`](crate::render::lease::RendererLease).
pub trait FrameRenderer: Send {
    /// Render the scene as seen from `pose` into a `width` x `height` raster.
    fn render(
        &mut self,
        pose: &CameraPose,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, RenderError>;

    /// Release renderer resources.
    fn dispose(&mut self) {}
}

impl<R: FrameRenderer + ?Sized> FrameRenderer for Box<R> {
    fn render(
        &mut self,
        pose: &CameraPose,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, RenderError> {
        (**self).render(pose, width, height)
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }
}
