//! Reactive preview state: `render(markdown) -> { html, is_loading }`.
//!
//! Each render is tagged with a sequence number when it starts. A render that
//! finishes after a newer one has started is dropped, so a slow early render
//! can never overwrite the HTML of a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use n0_future::task;
use quill_common::Debouncer;
use tokio::sync::watch;

use crate::processor::Processor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    pub html: String,
    pub is_loading: bool,
}

struct Inner {
    processor: Arc<Processor>,
    state: watch::Sender<RenderResult>,
    latest: AtomicU64,
}

impl Inner {
    async fn render(&self, markdown: &str) {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.is_loading = true);

        let result = self.processor.process(markdown).await;

        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "discarding stale render");
            return;
        }
        self.state.send_modify(|state| {
            match result {
                Ok(html) => state.html = html,
                Err(e) => tracing::warn!(error = %e, "render failed, keeping previous preview"),
            }
            state.is_loading = false;
        });
    }
}

pub struct Preview {
    inner: Arc<Inner>,
    debouncer: Debouncer<String>,
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("state", &*self.inner.state.borrow())
            .field("debouncer", &self.debouncer)
            .finish()
    }
}

impl Preview {
    /// A preview whose scheduled renders settle after `window`.
    pub fn new(processor: Arc<Processor>, window: Duration) -> Self {
        let (state, _) = watch::channel(RenderResult::default());
        let inner = Arc::new(Inner {
            processor,
            state,
            latest: AtomicU64::new(0),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let debouncer = Debouncer::new(window, move |markdown: String| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            task::spawn(async move {
                inner.render(&markdown).await;
            });
        });

        Self { inner, debouncer }
    }

    /// Render now and publish the result, unless a newer render started
    /// meanwhile.
    pub async fn render(&self, markdown: &str) {
        self.inner.render(markdown).await
    }

    /// Render once input has been quiet for the settling window.
    pub fn schedule(&self, markdown: impl Into<String>) {
        self.debouncer.call(markdown.into());
    }

    /// Drop a scheduled render. One already running still completes.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn current(&self) -> RenderResult {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderResult> {
        self.inner.state.subscribe()
    }

    pub fn processor(&self) -> &Arc<Processor> {
        &self.inner.processor
    }
}
