use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to start dispatch runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Shared delayed-task scheduler backing every throttler instance.
///
/// Built once near process start and passed around behind an `Arc`; each
/// scheduled job runs exactly once on the dispatch worker after its delay.
pub struct RefreshScheduler {
    handle: Handle,
    owned: Mutex<Option<Runtime>>,
}

impl RefreshScheduler {
    /// Start a scheduler with its own single-worker runtime and a named
    /// dispatch thread.
    pub fn new() -> Result<Self, SchedulerError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("refresh-dispatch")
            .enable_time()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            handle,
            owned: Mutex::new(Some(runtime)),
        })
    }

    /// Schedule jobs onto an existing runtime instead of owning one.
    /// `shutdown` is then a no-op; the runtime's owner tears it down.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            owned: Mutex::new(None),
        }
    }

    /// Run `job` once, no sooner than `delay` from now. The delay is
    /// realized on the runtime timer; the caller is never blocked.
    pub fn schedule_after(
        &self,
        delay: Duration,
        job: impl FnOnce() + Send + 'static,
    ) -> JoinHandle<()> {
        // The timer is created here, not inside the spawned future: the
        // window is anchored at the schedule call and must not slip to
        // whenever the task is first polled.
        let timer = {
            let _guard = self.handle.enter();
            tokio::time::sleep(delay)
        };
        self.handle.spawn(async move {
            timer.await;
            job();
        })
    }

    /// Release the owned runtime without waiting for in-flight jobs.
    /// Idempotent.
    pub fn shutdown(&self) {
        let runtime = self
            .owned
            .lock()
            .expect("scheduler runtime mutex poisoned")
            .take();
        if let Some(runtime) = runtime {
            tracing::debug!("refresh scheduler shutting down");
            runtime.shutdown_background();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
