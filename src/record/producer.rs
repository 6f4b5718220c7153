use crate::browser::driver::{BrowserHandle, BrowserPool, PageHandle};
use crate::browser::pool::PagePool;
use crate::foundation::core::{CaptureSettings, FrameBuffer, RenderJob};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::record::progress::ProgressSink;
use crate::record::script::FrameScript;

/// Render and capture a single frame.
///
/// Acquires a page, runs the script's `render`, captures the page contents (inside the script's
/// capture wrapper), and returns the captured bytes. The page goes back into the pool before the
/// buffer is returned, so the next job never waits on buffer consumption. A page whose frame
/// failed is destroyed rather than reused.
pub async fn produce_frame<B: BrowserPool>(
    pool: &PagePool<B>,
    script: &dyn FrameScript<B::Browser>,
    progress: &dyn ProgressSink,
    settings: &CaptureSettings,
    job: RenderJob,
) -> FlipbookResult<FrameBuffer> {
    let mut held = pool.acquire().await?;
    progress.frame_started(job);
    match drive_frame(script, held.page_mut(), settings, job).await {
        Ok(buffer) => {
            pool.release(held).await;
            Ok(buffer)
        }
        Err(err) => {
            // The page may hold half-applied frame state; take it out of rotation.
            if let Err(destroy_err) = pool.destroy(held).await {
                tracing::warn!(error = %destroy_err, "page destroy failed after frame failure");
            }
            Err(err)
        }
    }
}

async fn drive_frame<H: BrowserHandle>(
    script: &dyn FrameScript<H>,
    page: &mut H::Page,
    settings: &CaptureSettings,
    job: RenderJob,
) -> FlipbookResult<FrameBuffer> {
    script
        .render(page, job)
        .await
        .map_err(|e| FlipbookError::render(format!("frame {}: {e}", job.frame.0)))?;
    script
        .wrap_capture(Box::pin(page.capture(settings)))
        .await
        .map_err(|e| FlipbookError::capture(format!("frame {}: {e}", job.frame.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::FrameIndex;
    use crate::record::progress::NullProgress;
    use futures::future::{self, BoxFuture};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Browsers {
        released: AtomicUsize,
    }

    struct Browser;

    #[derive(Default)]
    struct Page {
        frames_seen: Vec<u64>,
    }

    impl BrowserPool for Browsers {
        type Browser = Browser;

        async fn acquire(&self) -> FlipbookResult<Browser> {
            Ok(Browser)
        }

        async fn release(&self, _browser: Browser) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl BrowserHandle for Browser {
        type Page = Page;

        async fn open_page(&mut self) -> FlipbookResult<Page> {
            Ok(Page::default())
        }
    }

    impl PageHandle for Page {
        async fn capture(&mut self, _settings: &CaptureSettings) -> FlipbookResult<FrameBuffer> {
            Ok(self.frames_seen.iter().map(|f| *f as u8).collect())
        }

        async fn close(&mut self) -> FlipbookResult<()> {
            Ok(())
        }
    }

    struct Script {
        fail_on: Option<u64>,
        wrapped: AtomicUsize,
    }

    impl Script {
        fn new(fail_on: Option<u64>) -> Self {
            Self {
                fail_on,
                wrapped: AtomicUsize::new(0),
            }
        }
    }

    impl FrameScript<Browser> for Script {
        fn render<'a>(
            &'a self,
            page: &'a mut Page,
            job: RenderJob,
        ) -> BoxFuture<'a, FlipbookResult<()>> {
            if self.fail_on == Some(job.frame.0) {
                return Box::pin(future::ready(Err(FlipbookError::render(
                    "injected render failure",
                ))));
            }
            page.frames_seen.push(job.frame.0);
            Box::pin(future::ready(Ok(())))
        }

        fn wrap_capture<'a>(
            &'a self,
            capture: BoxFuture<'a, FlipbookResult<FrameBuffer>>,
        ) -> BoxFuture<'a, FlipbookResult<FrameBuffer>> {
            self.wrapped.fetch_add(1, Ordering::SeqCst);
            capture
        }
    }

    struct RecordingProgress {
        lines: Mutex<Vec<u64>>,
    }

    impl ProgressSink for RecordingProgress {
        fn frame_started(&self, job: RenderJob) {
            self.lines.lock().unwrap().push(job.frame.0);
        }
    }

    fn job(frame: u64) -> RenderJob {
        RenderJob {
            frame: FrameIndex(frame),
            total: 3,
        }
    }

    #[tokio::test]
    async fn captures_through_the_wrapper_and_releases_the_page() {
        let script = Arc::new(Script::new(None));
        let pool = PagePool::new(Arc::new(Browsers::default()), script.clone(), 1).unwrap();
        let progress = RecordingProgress {
            lines: Mutex::new(Vec::new()),
        };

        let buffer = produce_frame(
            &pool,
            script.as_ref(),
            &progress,
            &CaptureSettings::default(),
            job(2),
        )
        .await
        .unwrap();

        assert_eq!(buffer, vec![2]);
        assert_eq!(script.wrapped.load(Ordering::SeqCst), 1);
        assert_eq!(*progress.lines.lock().unwrap(), vec![2]);
        let stats = pool.stats().await;
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.checked_out, 0);
    }

    #[tokio::test]
    async fn render_failure_destroys_the_page_and_frees_capacity() {
        let script = Arc::new(Script::new(Some(1)));
        let browsers = Arc::new(Browsers::default());
        let pool = PagePool::new(Arc::clone(&browsers), script.clone(), 1).unwrap();

        let err = produce_frame(
            &pool,
            script.as_ref(),
            &NullProgress,
            &CaptureSettings::default(),
            job(1),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("frame 1"));
        assert_eq!(browsers.released.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().await.created, 0);

        // The freed slot accepts the next frame on a fresh page.
        let buffer = produce_frame(
            &pool,
            script.as_ref(),
            &NullProgress,
            &CaptureSettings::default(),
            job(2),
        )
        .await
        .unwrap();
        assert_eq!(buffer, vec![2]);
    }
}
