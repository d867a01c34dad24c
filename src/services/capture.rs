// Screen-capture collaborator contract.

use anyhow::Result;
use image::RgbImage;
use tracing::warn;

use crate::core::config::CaptureMode;
use crate::core::types::Region;

/// A screen-capture backend. Frames are dense RGB8 buffers, row-major, no
/// alpha.
///
/// Real backends are often thread-bound (device contexts tied to the calling
/// thread), so the pipeline constructs backends through a [`CaptureFactory`]
/// on the worker thread and keeps the instance there for the whole session.
pub trait CaptureBackend: Send {
    /// Bind the backend to a monitor and acquire capture resources.
    fn start(&mut self, monitor: usize) -> Result<()>;

    /// Grab one frame. `Ok(None)` means the backend had nothing to deliver
    /// this instant (a transient condition, retried next cycle); `Err` means
    /// the grab itself failed.
    fn grab(
        &mut self,
        mode: CaptureMode,
        region: Option<Region>,
        monitor: usize,
    ) -> Result<Option<RgbImage>>;

    /// Release capture resources. Idempotent.
    fn stop(&mut self);

    /// Resolve a window title (partial match) to its screen rectangle, when
    /// the platform supports it.
    fn resolve_window(&mut self, title: &str) -> Option<Region> {
        let _ = title;
        None
    }
}

/// Deferred backend construction, invoked on the worker thread.
pub type CaptureFactory = Box<dyn FnMut() -> Result<Box<dyn CaptureBackend>> + Send>;

/// Compose a preferred and an alternate factory: construction tries the
/// preferred backend first and falls back on error.
pub fn with_fallback(mut preferred: CaptureFactory, mut fallback: CaptureFactory) -> CaptureFactory {
    Box::new(move || match preferred() {
        Ok(backend) => Ok(backend),
        Err(e) => {
            warn!("preferred capture backend unavailable ({e:#}), trying fallback");
            fallback()
        }
    })
}
