use futures::future::{self, BoxFuture};

use crate::browser::driver::BrowserHandle;
use crate::foundation::core::{FrameBuffer, RenderJob};
use crate::foundation::error::FlipbookResult;

/// Caller-supplied logic that drives pages through the frames of a recording.
///
/// `render` mutates page state so the page visually represents one frame; the recorder then
/// captures the page contents. One script instance is shared by all concurrent frame jobs, so
/// methods take `&self` and any per-frame state lives on the page.
pub trait FrameScript<H: BrowserHandle>: Send + Sync {
    /// Prepare a freshly opened page (navigation, viewport, seed state) before it enters pool
    /// rotation. Called once per page. The default does nothing.
    fn prepare<'a>(
        &'a self,
        browser: &'a mut H,
        page: &'a mut H::Page,
    ) -> BoxFuture<'a, FlipbookResult<()>> {
        let _ = (browser, page);
        Box::pin(future::ready(Ok(())))
    }

    /// Drive `page` so it visually represents `job.frame`.
    fn render<'a>(
        &'a self,
        page: &'a mut H::Page,
        job: RenderJob,
    ) -> BoxFuture<'a, FlipbookResult<()>>;

    /// Bracket one frame's capture call with caller instrumentation (timing, tracing).
    ///
    /// `capture` performs the actual screenshot. Implementations must await it and return its
    /// buffer; the default runs it unmodified.
    fn wrap_capture<'a>(
        &'a self,
        capture: BoxFuture<'a, FlipbookResult<FrameBuffer>>,
    ) -> BoxFuture<'a, FlipbookResult<FrameBuffer>> {
        capture
    }
}
