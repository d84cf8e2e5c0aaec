use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{Executor, Task};

/// Tokio-backed executor.
///
/// Background tasks go to the blocking pool of the runtime. Foreground tasks
/// are queued and only run when the host drains its [`ForegroundQueue`].
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    foreground: mpsc::UnboundedSender<Task>,
    in_flight: Arc<AtomicUsize>,
}

/// Receiving end of the foreground context. Owned by the host loop.
pub struct ForegroundQueue {
    rx: mpsc::UnboundedReceiver<Task>,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> (Self, ForegroundQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = Self {
            handle,
            foreground: tx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        };
        (executor, ForegroundQueue { rx })
    }

    /// Number of background tasks submitted but not yet returned.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Executor for TokioExecutor {
    fn run_in_background(&self, task: Task) {
        let guard = InFlight::enter(&self.in_flight);
        self.handle.spawn_blocking(move || {
            let _guard = guard;
            task();
        });
    }

    fn run_in_foreground(&self, task: Task) {
        if self.foreground.send(task).is_err() {
            tracing::warn!("foreground queue closed, dropping task");
        }
    }
}

// Counts a background task until it returns or unwinds.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ForegroundQueue {
    /// Wait for the next foreground task.
    pub async fn next(&mut self) -> Option<Task> {
        self.rx.recv().await
    }

    /// Run every task that is queued right now. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}
