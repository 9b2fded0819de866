//! Task spawning seam for the cooperative run loop.
//!
//! The router never resumes the coordinator synchronously from inside a
//! message handler; anything that needs to run "later" is spawned as a new
//! unit of work through a [`TaskProvider`]. Worker peers and their
//! forwarders go through the same seam, which keeps the whole system on one
//! single-threaded execution context.

use std::future::Future;

use tokio::task::JoinHandle;

/// Spawns futures as new units of work on the current run loop.
pub trait TaskProvider: Clone {
    /// Spawn a named local task.
    ///
    /// The name is for diagnostics only.
    fn spawn_task<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + 'static;
}

/// Production provider backed by `tokio::task::spawn_local`.
///
/// Requires running inside a `tokio::task::LocalSet` on a current-thread
/// runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + 'static,
    {
        tracing::trace!(task = name, "spawning local task");
        tokio::task::spawn_local(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn test_spawned_task_runs_on_local_set() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let ran = Rc::new(Cell::new(false));
                let flag = Rc::clone(&ran);

                let handle = TokioTaskProvider.spawn_task("probe", async move {
                    flag.set(true);
                });
                handle.await.expect("task should complete");

                assert!(ran.get());
            })
            .await;
    }
}
