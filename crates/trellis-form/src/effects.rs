//! Runtime effects used by form validators
//!
//! Validators only need two things from a runtime: a way to wait and a way to
//! run a future in the background. Both are traits so tests and hosts can
//! swap in their own handlers; [`TokioEffects`] is the production one.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Timer effect.
#[async_trait]
pub trait TimeEffects: Send + Sync {
    /// Resolve after `duration` has elapsed.
    async fn sleep(&self, duration: Duration);
}

/// Task spawning contract for runtime implementations.
pub trait TaskSpawner: Send + Sync {
    /// Spawn a background task.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// Everything a form needs from its runtime.
pub trait FormEffects: TimeEffects + TaskSpawner {}

impl<T: TimeEffects + TaskSpawner + ?Sized> FormEffects for T {}

/// Blanket implementation for Arc<T> where T: TimeEffects
#[async_trait]
impl<T: TimeEffects + ?Sized> TimeEffects for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Blanket implementation for Arc<T> where T: TaskSpawner
impl<T: TaskSpawner + ?Sized> TaskSpawner for Arc<T> {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        (**self).spawn(fut);
    }
}

/// Tokio-backed effects.
///
/// Tasks are spawned on the ambient runtime. Outstanding tasks are tracked so
/// [`TokioEffects::shutdown`] can abort them.
#[derive(Debug, Default)]
pub struct TokioEffects {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioEffects {
    /// Create a handler with no tracked tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn active_tasks(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.len()
    }

    /// Abort every outstanding task.
    pub fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            handle.abort();
        }
    }
}

#[async_trait]
impl TimeEffects for TokioEffects {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl TaskSpawner for TokioEffects {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(fut);
                let mut handles = self.handles.lock();
                handles.retain(|handle| !handle.is_finished());
                handles.push(handle);
            }
            Err(e) => {
                tracing::error!(error = %e, "no tokio runtime available, dropping background task");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_spawned_task_runs() {
        let effects = TokioEffects::new();
        let (tx, rx) = oneshot::channel();

        effects.spawn(
            async move {
                let _ = tx.send(7);
            }
            .boxed(),
        );

        assert_eq!(rx.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_tasks() {
        let effects = TokioEffects::new();
        let (tx, rx) = oneshot::channel::<()>();

        effects.spawn(
            async move {
                futures::future::pending::<()>().await;
                let _ = tx.send(());
            }
            .boxed(),
        );
        assert_eq!(effects.active_tasks(), 1);

        effects.shutdown();
        assert!(rx.await.is_err(), "aborted task drops its sender");
        assert_eq!(effects.active_tasks(), 0);
    }

    #[test]
    fn test_spawn_without_runtime_is_dropped() {
        let effects = TokioEffects::new();
        effects.spawn(async {}.boxed());
        assert_eq!(effects.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_arc_handler_delegates() {
        let effects: Arc<dyn FormEffects> = Arc::new(TokioEffects::new());
        effects.sleep(Duration::from_millis(1)).await;
    }
}
