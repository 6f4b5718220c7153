use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::browser::driver::{BrowserHandle, BrowserPool, PageHandle, PageOf};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::record::script::FrameScript;

/// Point-in-time page pool counters, primarily for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PagePoolStats {
    /// Maximum number of live pages.
    pub capacity: usize,
    /// Pages currently alive (idle plus checked out).
    pub created: usize,
    /// Pages sitting in the idle set.
    pub idle: usize,
    /// Pages currently checked out.
    pub checked_out: usize,
}

/// A page checked out of a [`PagePool`], paired with the browser that created it.
///
/// The browser rides along as a plain association, not shared ownership: it is handed back to the
/// outer [`BrowserPool`] only when the page is destroyed.
pub struct PooledPage<B: BrowserPool> {
    page: PageOf<B>,
    browser: B::Browser,
    permit: OwnedSemaphorePermit,
}

impl<B: BrowserPool> PooledPage<B> {
    /// Mutable access to the underlying page for rendering and capture.
    pub fn page_mut(&mut self) -> &mut PageOf<B> {
        &mut self.page
    }
}

impl<B: BrowserPool> std::fmt::Debug for PooledPage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledPage").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PoolState {
    Open,
    Draining,
    Closed,
}

struct PoolShared<B: BrowserPool> {
    state: PoolState,
    idle: Vec<IdlePage<B>>,
    created: usize,
    checked_out: usize,
}

struct IdlePage<B: BrowserPool> {
    page: PageOf<B>,
    browser: B::Browser,
}

struct PoolInner<B: BrowserPool> {
    browsers: Arc<B>,
    script: Arc<dyn FrameScript<B::Browser>>,
    capacity: usize,
    // Fair semaphore: one permit per page slot, granted strictly in arrival order. A checked-out
    // page carries its permit, so capacity and first-come-first-served ordering are enforced by
    // permit accounting alone.
    slots: Arc<Semaphore>,
    shared: Mutex<PoolShared<B>>,
}

/// Bounded pool of reusable pages drawn from an outer [`BrowserPool`].
///
/// Growing the pool borrows a browser, opens a page on it, and runs the script's `prepare` hook
/// before the page is handed out. Destroying a page closes it and then releases its owning
/// browser, in that order. The pool is cheap to clone; clones share state.
pub struct PagePool<B: BrowserPool> {
    inner: Arc<PoolInner<B>>,
}

impl<B: BrowserPool> Clone for PagePool<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: BrowserPool> PagePool<B> {
    /// Build a pool of at most `capacity` pages over `browsers`.
    pub fn new(
        browsers: Arc<B>,
        script: Arc<dyn FrameScript<B::Browser>>,
        capacity: usize,
    ) -> FlipbookResult<Self> {
        if capacity == 0 {
            return Err(FlipbookError::validation("page pool capacity must be >= 1"));
        }
        if u32::try_from(capacity).is_err() {
            return Err(FlipbookError::validation("page pool capacity must fit in u32"));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                browsers,
                script,
                capacity,
                slots: Arc::new(Semaphore::new(capacity)),
                shared: Mutex::new(PoolShared {
                    state: PoolState::Open,
                    idle: Vec::new(),
                    created: 0,
                    checked_out: 0,
                }),
            }),
        })
    }

    /// Check a page out, suspending until one is idle or a new one can be created under the
    /// capacity limit. Waiters are served in arrival order.
    pub async fn acquire(&self) -> FlipbookResult<PooledPage<B>> {
        {
            let shared = self.inner.shared.lock().await;
            if shared.state != PoolState::Open {
                return Err(FlipbookError::pool("page pool is no longer issuing pages"));
            }
        }

        let permit = Arc::clone(&self.inner.slots)
            .acquire_owned()
            .await
            .map_err(|_| FlipbookError::pool("page pool slots closed"))?;

        let reused = {
            let mut shared = self.inner.shared.lock().await;
            if shared.state != PoolState::Open {
                return Err(FlipbookError::pool("page pool is no longer issuing pages"));
            }
            match shared.idle.pop() {
                Some(idle) => {
                    shared.checked_out += 1;
                    Some(idle)
                }
                None => None,
            }
        };
        if let Some(IdlePage { page, browser }) = reused {
            return Ok(PooledPage {
                page,
                browser,
                permit,
            });
        }

        // Slot held but nothing idle: grow by one page. On failure the permit drops with the
        // early return, freeing the slot for the next waiter.
        let (page, browser) = self.create_page().await?;
        let mut shared = self.inner.shared.lock().await;
        shared.created += 1;
        shared.checked_out += 1;
        let created = shared.created;
        drop(shared);
        tracing::debug!(created, capacity = self.inner.capacity, "page pool grew");
        Ok(PooledPage {
            page,
            browser,
            permit,
        })
    }

    /// Return a page to the idle set without destroying it.
    ///
    /// Releasing into a pool that has already been cleared destroys the page instead.
    pub async fn release(&self, page: PooledPage<B>) {
        let PooledPage {
            page,
            browser,
            permit,
        } = page;
        let mut shared = self.inner.shared.lock().await;
        shared.checked_out -= 1;
        if shared.state == PoolState::Closed {
            // Clear has already emptied the idle set; a page parked now would never be destroyed
            // and its browser never returned.
            shared.created -= 1;
            drop(shared);
            if let Err(err) = dispose(page, browser, self.inner.browsers.as_ref()).await {
                tracing::warn!(error = %err, "page destroy failed on release into closed pool");
            }
            drop(permit);
            return;
        }
        shared.idle.push(IdlePage { page, browser });
        drop(shared);
        // The slot frees only after the page is back in the idle set, so the next waiter in line
        // finds it there.
        drop(permit);
    }

    /// Destroy a checked-out page instead of returning it to rotation.
    ///
    /// The page is closed first, then its owning browser is released back to the outer pool; the
    /// browser is released even when closing fails.
    pub async fn destroy(&self, page: PooledPage<B>) -> FlipbookResult<()> {
        let PooledPage {
            page,
            browser,
            permit,
        } = page;
        {
            let mut shared = self.inner.shared.lock().await;
            shared.checked_out -= 1;
            shared.created -= 1;
        }
        let result = dispose(page, browser, self.inner.browsers.as_ref()).await;
        drop(permit);
        result
    }

    /// Stop issuing pages and wait until all in-flight acquire and destroy work has finished.
    ///
    /// Idle pages survive a drain; [`PagePool::clear`] destroys them.
    pub async fn drain(&self) -> FlipbookResult<()> {
        {
            let mut shared = self.inner.shared.lock().await;
            if shared.state == PoolState::Open {
                shared.state = PoolState::Draining;
            }
        }
        // Taking every slot queues behind all current holders and waiters, so this resolves once
        // the pool is quiescent.
        let all = self
            .inner
            .slots
            .acquire_many(self.inner.capacity as u32)
            .await
            .map_err(|_| FlipbookError::pool("page pool slots closed"))?;
        drop(all);
        Ok(())
    }

    /// Destroy every idle page, releasing each owning browser back to the outer pool.
    ///
    /// Every page is destroyed even when some destroys fail; the first failure is reported.
    pub async fn clear(&self) -> FlipbookResult<()> {
        let idle = {
            let mut shared = self.inner.shared.lock().await;
            shared.state = PoolState::Closed;
            shared.created -= shared.idle.len();
            std::mem::take(&mut shared.idle)
        };
        let count = idle.len();
        let results = futures::future::join_all(
            idle.into_iter()
                .map(|IdlePage { page, browser }| dispose(page, browser, self.inner.browsers.as_ref())),
        )
        .await;
        tracing::debug!(destroyed = count, "page pool cleared");

        let mut first_err = None;
        for res in results {
            if let Err(err) = res {
                tracing::warn!(error = %err, "page destroy failed during clear");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Snapshot the pool counters.
    pub async fn stats(&self) -> PagePoolStats {
        let shared = self.inner.shared.lock().await;
        PagePoolStats {
            capacity: self.inner.capacity,
            created: shared.created,
            idle: shared.idle.len(),
            checked_out: shared.checked_out,
        }
    }

    async fn create_page(&self) -> FlipbookResult<(PageOf<B>, B::Browser)> {
        let mut browser = self
            .inner
            .browsers
            .acquire()
            .await
            .map_err(|e| FlipbookError::pool(format!("browser acquire failed: {e}")))?;

        let mut page = match browser.open_page().await {
            Ok(page) => page,
            Err(e) => {
                self.inner.browsers.release(browser).await;
                return Err(FlipbookError::pool(format!("page open failed: {e}")));
            }
        };

        if let Err(e) = self.inner.script.prepare(&mut browser, &mut page).await {
            // Close the half-open page before handing the browser back.
            if let Err(close_err) = page.close().await {
                tracing::warn!(error = %close_err, "failed to close page after prepare failure");
            }
            self.inner.browsers.release(browser).await;
            return Err(FlipbookError::pool(format!("page prepare failed: {e}")));
        }

        Ok((page, browser))
    }
}

async fn dispose<B: BrowserPool>(
    mut page: PageOf<B>,
    browser: B::Browser,
    browsers: &B,
) -> FlipbookResult<()> {
    let closed = page.close().await;
    browsers.release(browser).await;
    closed.map_err(|e| FlipbookError::pool(format!("page close failed: {e}")))
}
