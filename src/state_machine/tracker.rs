//! Session-wide bookkeeping shared by the conversation and the work phase.
//!
//! [`SessionCore`] is the part of a session that both phases need: who the
//! user currently is, where to submit tasks, whom to tell when the session is
//! over, and the [`ResultTracker`]. It is reference counted and travels
//! inside the work baton; the states themselves never live here.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::{MachineResult, WizardUser};
use crate::scheduler::Executor;

/// The version a session is installing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetVersion {
    pub version: String,
}

impl TargetVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// Emitted exactly once when a session is torn down.
#[derive(Debug, Clone, Serialize)]
pub struct SessionFinished {
    pub session_id: Uuid,
    pub version: TargetVersion,
    pub outcome: MachineResult,
    pub finished_at: DateTime<Utc>,
}

/// Lifecycle collaborator notified at teardown.
pub trait SessionObserver: Send + Sync {
    fn session_finished(&self, event: &SessionFinished);
}

/// Fixed texts the core sends on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub done: String,
    pub still_running: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            done: "Installation done.".to_string(),
            still_running: "Installation is still running.".to_string(),
        }
    }
}

/// Result and flags read under a single lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub result: MachineResult,
    pub working: bool,
    pub finished: bool,
}

/// Last known result plus the work/teardown flags resume logic consults.
#[derive(Debug, Default)]
pub struct ResultTracker {
    inner: Mutex<Snapshot>,
}

impl ResultTracker {
    pub fn result(&self) -> MachineResult {
        self.lock().result
    }

    pub fn is_working(&self) -> bool {
        self.lock().working
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Result and both flags as one consistent view.
    pub fn snapshot(&self) -> Snapshot {
        *self.lock()
    }

    /// Record a new result. Resetting to `None` is always allowed; any
    /// other edge outside [`MachineResult::can_transition_to`] is logged and
    /// reported as `false`, but still recorded.
    pub fn set(&self, next: MachineResult) -> bool {
        let mut tracked = self.lock();
        let previous = tracked.result;
        let legal = next == MachineResult::None || previous.can_transition_to(next);
        if legal {
            tracing::debug!(%previous, %next, "session result");
        } else {
            tracing::warn!(%previous, %next, "unexpected session result transition");
        }
        tracked.result = next;
        legal
    }

    fn begin_work(&self) {
        self.lock().working = true;
    }

    /// Mark the session finished. Returns `false` when it already was.
    fn finish(&self, outcome: MachineResult) -> bool {
        let mut tracked = self.lock();
        if tracked.finished {
            return false;
        }
        tracked.finished = true;
        tracked.working = false;
        tracked.result = outcome;
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Collaborators and shared state of one session.
pub struct SessionCore {
    id: Uuid,
    version: TargetVersion,
    user: RwLock<Arc<dyn WizardUser>>,
    tracker: ResultTracker,
    executor: Arc<dyn Executor>,
    observer: Arc<dyn SessionObserver>,
    messages: Messages,
}

impl SessionCore {
    pub fn new(
        version: TargetVersion,
        user: Arc<dyn WizardUser>,
        executor: Arc<dyn Executor>,
        observer: Arc<dyn SessionObserver>,
        messages: Messages,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            version,
            user: RwLock::new(user),
            tracker: ResultTracker::default(),
            executor,
            observer,
            messages,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> &TargetVersion {
        &self.version
    }

    pub fn tracker(&self) -> &ResultTracker {
        &self.tracker
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// The user handle messages currently go to.
    pub fn user(&self) -> Arc<dyn WizardUser> {
        let guard = self.user.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    pub fn rebind_user(&self, user: Arc<dyn WizardUser>) {
        let mut guard = self.user.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::info!(session = %self.id, user = user.name(), "user rebound");
        *guard = user;
    }

    /// Send `text` to the user when it is non-empty and the user is online.
    pub fn notify(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let user = self.user();
        if user.is_online() {
            user.send_message(text);
        }
    }

    pub(super) fn begin_work(&self) {
        self.tracker.begin_work();
    }

    /// Tear the session down. Only the first call records `outcome` and
    /// notifies the observer.
    pub fn finish(&self, outcome: MachineResult) {
        if !self.tracker.finish(outcome) {
            return;
        }
        tracing::info!(session = %self.id, %outcome, "session finished");
        let event = SessionFinished {
            session_id: self.id,
            version: self.version.clone(),
            outcome,
            finished_at: Utc::now(),
        };
        self.observer.session_finished(&event);
    }
}
