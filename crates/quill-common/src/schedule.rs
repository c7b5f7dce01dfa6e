//! Trailing-edge debouncing.
//!
//! A [`Debouncer`] owns a single pending-task slot. Every [`Debouncer::call`]
//! replaces whatever is pending, so only the arguments of the most recent call
//! inside a settling window ever reach the action.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use n0_future::task::{self, JoinHandle};
use n0_future::time;

pub struct Debouncer<A> {
    inner: Arc<Inner<A>>,
}

type Action<A> = Box<dyn Fn(A) + Send + Sync>;

struct Inner<A> {
    window: Duration,
    action: Action<A>,
    slot: Mutex<Slot<A>>,
}

struct Slot<A> {
    /// Bumped on every call and cancel; a woken timer only fires if its
    /// generation is still current.
    generation: u64,
    pending: Option<Pending<A>>,
}

struct Pending<A> {
    args: A,
    timer: JoinHandle<()>,
}

impl<A> Inner<A> {
    fn slot(&self) -> MutexGuard<'_, Slot<A>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wrap `action` so that bursts of calls collapse into one trailing call made
/// `window` after the last of them.
pub fn debounce<A, F>(action: F, window: Duration) -> Debouncer<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debouncer::new(window, action)
}

impl<A> Debouncer<A>
where
    A: Send + 'static,
{
    pub fn new(window: Duration, action: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                action: Box::new(action),
                slot: Mutex::new(Slot {
                    generation: 0,
                    pending: None,
                }),
            }),
        }
    }

    /// Schedule `args`, replacing any call that has not fired yet.
    pub fn call(&self, args: A) {
        let mut slot = self.inner.slot();
        if let Some(previous) = slot.pending.take() {
            previous.timer.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let inner = Arc::clone(&self.inner);
        let timer = task::spawn(async move {
            time::sleep(inner.window).await;
            let args = {
                let mut slot = inner.slot();
                if slot.generation != generation {
                    return;
                }
                match slot.pending.take() {
                    Some(pending) => pending.args,
                    None => return,
                }
            };
            (inner.action)(args);
        });
        slot.pending = Some(Pending { args, timer });
    }

    /// Run the pending call immediately, if there is one.
    ///
    /// Returns whether anything ran.
    pub fn flush(&self) -> bool {
        let pending = {
            let mut slot = self.inner.slot();
            slot.generation = slot.generation.wrapping_add(1);
            slot.pending.take()
        };
        match pending {
            Some(pending) => {
                pending.timer.abort();
                (self.inner.action)(pending.args);
                true
            }
            None => false,
        }
    }
}

impl<A> Debouncer<A> {
    /// Remove the pending call and hand its arguments back instead of running
    /// the action.
    pub fn take(&self) -> Option<A> {
        let mut slot = self.inner.slot();
        slot.generation = slot.generation.wrapping_add(1);
        slot.pending.take().map(|pending| {
            pending.timer.abort();
            pending.args
        })
    }

    /// Drop the pending call without running it.
    ///
    /// Work the action already started is not interrupted.
    pub fn cancel(&self) {
        let mut slot = self.inner.slot();
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(pending) = slot.pending.take() {
            pending.timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.slot().pending.is_some()
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<A> std::fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.inner.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: String| sink.lock().unwrap().push(value))
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_call_in_window_fires() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));

        for text in ["# H", "# He", "# Hel", "# Hello"] {
            debouncer.call(text.to_string());
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["# Hello".to_string()]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_restarts_the_window() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));

        debouncer.call("a".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.call("b".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_fire_separately() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(100));

        debouncer.call("first".into());
        tokio::time::sleep(Duration::from_millis(150)).await;
        debouncer.call("second".into());
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_pending_call() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));

        debouncer.call("stale".into());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_debouncer_cancels() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));
        debouncer.call("orphan".into());
        drop(debouncer);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_pending_call_once() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));

        debouncer.call("now".into());
        assert!(debouncer.flush());
        assert!(!debouncer.flush());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["now".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn take_returns_args_without_running() {
        let (seen, action) = recorder();
        let debouncer = debounce(action, Duration::from_millis(300));

        debouncer.call("mine".into());
        assert_eq!(debouncer.take().as_deref(), Some("mine"));
        assert_eq!(debouncer.take(), None);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(seen.lock().unwrap().is_empty());
    }
}
