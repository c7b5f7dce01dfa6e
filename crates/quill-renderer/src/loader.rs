//! Coalescing, retrying module loader.
//!
//! The first [`PipelineLoader::load_modules`] call starts the load and parks
//! the shared in-flight future in the loader; every caller that arrives while
//! it runs awaits that same future. A successful result is kept for the life
//! of the loader. A failed one is forgotten so the next call starts over.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::error::LoadError;
use crate::modules::{ModuleSource, PipelineModules};

pub type LoadResult = Result<Arc<PipelineModules>, Arc<LoadError>>;

type InFlight = Shared<BoxFuture<'static, LoadResult>>;

enum LoadState {
    Idle,
    Loading { attempt: u64, future: InFlight },
    Ready(Arc<PipelineModules>),
}

pub struct PipelineLoader {
    source: Arc<dyn ModuleSource>,
    state: Mutex<LoadState>,
    attempts: AtomicU64,
    loads: Arc<AtomicUsize>,
}

impl std::fmt::Debug for PipelineLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state() {
            LoadState::Idle => "idle",
            LoadState::Loading { .. } => "loading",
            LoadState::Ready(_) => "ready",
        };
        f.debug_struct("PipelineLoader")
            .field("state", &state)
            .field("loads", &self.load_count())
            .finish()
    }
}

impl PipelineLoader {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            source,
            state: Mutex::new(LoadState::Idle),
            attempts: AtomicU64::new(0),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of underlying loads started so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.state(), LoadState::Ready(_))
    }

    pub async fn load_modules(&self) -> LoadResult {
        let (attempt, future) = {
            let mut state = self.state();
            match &*state {
                LoadState::Ready(modules) => return Ok(Arc::clone(modules)),
                LoadState::Loading { attempt, future } => (*attempt, future.clone()),
                LoadState::Idle => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.start_load(attempt);
                    *state = LoadState::Loading {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state();
        let current = matches!(
            &*state,
            LoadState::Loading { attempt: a, .. } if *a == attempt
        );
        if current {
            match &result {
                Ok(modules) => *state = LoadState::Ready(Arc::clone(modules)),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "pipeline module load failed");
                    *state = LoadState::Idle;
                }
            }
        }
        result
    }

    fn start_load(&self, attempt: u64) -> InFlight {
        let source = Arc::clone(&self.source);
        let loads = Arc::clone(&self.loads);
        async move {
            loads.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(attempt, "loading pipeline modules");
            source.load().await.map(Arc::new).map_err(Arc::new)
        }
        .boxed()
        .shared()
    }
}
