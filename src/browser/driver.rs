use std::future::Future;

use crate::foundation::core::{CaptureSettings, FrameBuffer};
use crate::foundation::error::FlipbookResult;

/// A controllable rendering surface capable of producing screenshots.
///
/// Pages are owned exclusively by whoever currently holds them checked out of the
/// [`PagePool`](crate::browser::pool::PagePool); no page is touched outside that bracket.
pub trait PageHandle: Send + 'static {
    /// Capture the page's current visual state as encoded image bytes.
    fn capture(
        &mut self,
        settings: &CaptureSettings,
    ) -> impl Future<Output = FlipbookResult<FrameBuffer>> + Send;

    /// Close the page, freeing its renderer-side resources.
    fn close(&mut self) -> impl Future<Output = FlipbookResult<()>> + Send;
}

/// A live browser instance, as issued by a [`BrowserPool`].
pub trait BrowserHandle: Send + 'static {
    /// Page type opened by this browser.
    type Page: PageHandle;

    /// Open a fresh page in this browser.
    fn open_page(&mut self) -> impl Future<Output = FlipbookResult<Self::Page>> + Send;
}

/// Externally owned pool of whole browser instances.
///
/// The page pool borrows a browser from here every time it grows and hands it back when the page
/// it backed is destroyed. The browser pool remains the sole owner of browser lifecycles; this
/// crate never launches or terminates browsers itself.
pub trait BrowserPool: Send + Sync + 'static {
    /// Browser handle type issued by this pool.
    type Browser: BrowserHandle;

    /// Borrow a browser instance, suspending until one is available.
    fn acquire(&self) -> impl Future<Output = FlipbookResult<Self::Browser>> + Send;

    /// Hand a borrowed browser instance back.
    fn release(&self, browser: Self::Browser) -> impl Future<Output = ()> + Send;
}

/// Page type opened by the browsers of pool `P`.
pub type PageOf<P> = <<P as BrowserPool>::Browser as BrowserHandle>::Page;
