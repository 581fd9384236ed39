//! Task supervisor for a session.
//!
//! A [`TaskGroup`] owns every task a session runs: the fixed session tasks
//! plus one task per active stream. Tasks already running register new ones
//! through a cloneable [`TaskSpawner`]. The group reaps completions as they
//! happen:
//!
//! - `Ok(())` retires the task quietly.
//! - A contained error ([`SessionError::is_fatal`] is `false`) is logged and
//!   retired; the rest of the group keeps running.
//! - A fatal error cancels every other task, once, and ends the group.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::error::{SessionError, SessionResult};

type BoxTask = Pin<Box<dyn Future<Output = SessionResult<()>> + Send + 'static>>;

/// Registers tasks with a running [`TaskGroup`].
#[derive(Debug, Clone)]
pub struct TaskSpawner {
    tx: mpsc::UnboundedSender<(&'static str, BoxTask)>,
}

impl TaskSpawner {
    /// Add a task to the group.
    ///
    /// Returns `false` if the group has already shut down; the task is
    /// dropped without running.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = SessionResult<()>> + Send + 'static,
    {
        self.tx.send((name, Box::pin(task))).is_ok()
    }
}

/// Structured group of session tasks with cancel-on-first-fatal semantics.
#[derive(Debug)]
pub struct TaskGroup {
    tasks: JoinSet<SessionResult<()>>,
    names: HashMap<task::Id, &'static str>,
    queue: mpsc::UnboundedReceiver<(&'static str, BoxTask)>,
    cancel: CancellationToken,
}

impl TaskGroup {
    /// Create an empty group that stops when `cancel` fires.
    pub fn new(cancel: CancellationToken) -> (Self, TaskSpawner) {
        let (tx, rx) = mpsc::unbounded_channel();
        let group = Self {
            tasks: JoinSet::new(),
            names: HashMap::new(),
            queue: rx,
            cancel,
        };
        (group, TaskSpawner { tx })
    }

    /// Add a task directly.
    pub fn add<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = SessionResult<()>> + Send + 'static,
    {
        let handle = self.tasks.spawn(task);
        self.names.insert(handle.id(), name);
    }

    /// Number of tasks currently running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no task is running.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Reap tasks until the group is done.
    ///
    /// Returns `Ok(())` when canceled from outside or when every task has
    /// finished and no spawner is left, and the first fatal error otherwise.
    pub async fn run(mut self) -> SessionResult<()> {
        let mut accepting = true;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(tasks = self.tasks.len(), "task group canceled");
                    self.tasks.shutdown().await;
                    return Ok(());
                }
                task = self.queue.recv(), if accepting => match task {
                    Some((name, task)) => self.add(name, task),
                    None => accepting = false,
                },
                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => {
                    let id = match &joined {
                        Ok((id, _)) => *id,
                        Err(e) => e.id(),
                    };
                    let name = self.names.remove(&id).unwrap_or("task");
                    if let Err(e) = reap(name, joined.map(|(_, result)| result)) {
                        self.cancel_all().await;
                        return Err(e);
                    }
                }
            }

            if !accepting && self.tasks.is_empty() {
                return Ok(());
            }
        }
    }

    async fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.queue.close();
        self.tasks.shutdown().await;
    }
}

fn reap(name: &'static str, joined: Result<SessionResult<()>, JoinError>) -> SessionResult<()> {
    match joined {
        Ok(Ok(())) => {
            debug!(task = name, "task finished");
            Ok(())
        }
        Ok(Err(e)) if e.is_fatal() => {
            error!(task = name, error = %e, "task failed, ending session");
            Err(e)
        }
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "stream failed");
            Ok(())
        }
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => {
            error!(task = name, error = %e, "task panicked");
            Err(SessionError::Panicked(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{StreamError, TransportError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_all_tasks_finish() {
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        group.add("a", async { Ok(()) });
        spawner.spawn("b", async { Ok(()) });
        drop(spawner);

        assert!(group.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_contained_error_keeps_group() {
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        group.add("stream", async { Err(StreamError::Closed.into()) });

        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        group.add("worker", async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        drop(spawner);

        assert!(group.run().await.is_ok());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fatal_error_cancels_group() {
        let cancel = CancellationToken::new();
        let (mut group, spawner) = TaskGroup::new(cancel.clone());

        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        group.add("forever", async move {
            let _flag = flag;
            std::future::pending::<()>().await;
            Ok(())
        });
        spawner.spawn("accept", async {
            Err(SessionError::AcceptUni(TransportError::ConnectionClosed))
        });

        let err = group.run().await.unwrap_err();
        assert!(matches!(err, SessionError::AcceptUni(_)));
        assert!(cancel.is_cancelled());
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!spawner.spawn("late", async { Ok(()) }));
    }

    #[tokio::test]
    async fn test_panic_names_task() {
        let (mut group, spawner) = TaskGroup::new(CancellationToken::new());
        group.add("steady", async {
            std::future::pending::<()>().await;
            Ok(())
        });
        spawner.spawn("control", async { panic!("bad state") });

        let err = group.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Panicked("control")));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "task control panicked");
    }

    #[tokio::test]
    async fn test_external_cancel() {
        let cancel = CancellationToken::new();
        let (mut group, _spawner) = TaskGroup::new(cancel.child_token());
        group.add("forever", async {
            std::future::pending::<()>().await;
            Ok(())
        });

        let run = tokio::spawn(group.run());
        cancel.cancel();
        assert!(run.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_tasks_spawn_tasks() {
        let (group, spawner) = TaskGroup::new(CancellationToken::new());
        let inner = spawner.clone();
        spawner.spawn("parent", async move {
            inner.spawn("child", async {
                Err(SessionError::Media {
                    track: crate::media::TrackKind::Audio,
                    source: crate::core::MediaError::source("boom"),
                })
            });
            Ok(())
        });
        drop(spawner);

        assert!(matches!(
            group.run().await,
            Err(SessionError::Media { .. })
        ));
    }
}
