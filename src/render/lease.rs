use crate::render::backend::FrameRenderer;

/// Ownership token for a renderer that guarantees [`FrameRenderer::dispose`] runs exactly once.
///
/// The renderer is moved in at construction and disposed on the first [`RendererLease::release`]
/// or on drop, whichever comes first.
pub struct RendererLease {
    renderer: Option<Box<dyn FrameRenderer>>,
}

impl RendererLease {
    /// Take ownership of `renderer`.
    pub fn new(renderer: Box<dyn FrameRenderer>) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }

    /// Borrow the renderer while it is still held.
    pub fn get_mut(&mut self) -> Option<&mut (dyn FrameRenderer + 'static)> {
        self.renderer.as_deref_mut()
    }

    /// Return `true` once the renderer has been disposed.
    pub fn is_released(&self) -> bool {
        self.renderer.is_none()
    }

    /// Dispose the renderer. Later calls are no-ops.
    pub fn release(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
            tracing::debug!("renderer released");
        }
    }
}

impl Drop for RendererLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RendererLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererLease")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/lease.rs"]
mod tests;
