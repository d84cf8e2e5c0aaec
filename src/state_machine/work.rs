//! Sequential background work after the conversation is over.
//!
//! The remaining states travel inside a [`WorkBaton`]. Whoever holds the
//! baton owns the queue: a background cycle pops one state and hands the
//! baton to that state's [`WorkListener`]; the listener carries it to the
//! foreground and from there back to the background for the next cycle.
//! Only one baton exists per session, so at most one state works at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use super::state::{MachineResult, WizardState};
use super::tracker::{SessionCore, TargetVersion};

pub(super) struct WorkBaton {
    core: Arc<SessionCore>,
    pending: VecDeque<Box<dyn WizardState>>,
}

impl WorkBaton {
    pub(super) fn new(core: Arc<SessionCore>, pending: VecDeque<Box<dyn WizardState>>) -> Self {
        Self { core, pending }
    }

    /// Submit the next cycle to the background context.
    pub(super) fn submit(self) {
        let executor = Arc::clone(self.core.executor());
        executor.run_in_background(Box::new(move || self.run()));
    }

    // One execution cycle. Runs on the background context.
    fn run(mut self) {
        let Some(state) = self.pending.pop_front() else {
            let core = self.core;
            let executor = Arc::clone(core.executor());
            executor.run_in_foreground(Box::new(move || {
                core.notify(&core.messages().done);
                core.finish(MachineResult::Done);
            }));
            return;
        };

        let name = state.name().to_string();
        tracing::info!(
            session = %self.core.id(),
            state = %name,
            remaining = self.pending.len(),
            "starting work"
        );
        state.do_work(WorkListener {
            baton: Some(self),
            state: name,
        });
    }
}

/// Completion handle given to a state's background work.
///
/// Exactly one of [`on_work_done`](Self::on_work_done) or
/// [`on_work_abort`](Self::on_work_abort) can be called, since both consume
/// the listener. Dropping it without calling either aborts the session.
pub struct WorkListener {
    baton: Option<WorkBaton>,
    state: String,
}

impl WorkListener {
    /// Name of the state this listener belongs to.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Version the session is installing.
    pub fn version(&self) -> Option<&TargetVersion> {
        self.baton.as_ref().map(|baton| baton.core.version())
    }

    /// Report success. `message` is shown to the user when non-empty, then
    /// the next state's work is scheduled.
    pub fn on_work_done(mut self, message: impl Into<String>) {
        let Some(baton) = self.baton.take() else {
            return;
        };
        let message = message.into();
        tracing::info!(session = %baton.core.id(), state = %self.state, "work done");

        let executor = Arc::clone(baton.core.executor());
        executor.run_in_foreground(Box::new(move || {
            baton.core.notify(&message);
            baton.submit();
        }));
    }

    /// Report failure. The session is torn down right away, so no further
    /// state works; `message` is shown to the user when non-empty.
    pub fn on_work_abort(mut self, message: impl Into<String>) {
        let Some(baton) = self.baton.take() else {
            return;
        };
        let message = message.into();
        tracing::warn!(
            session = %baton.core.id(),
            state = %self.state,
            skipped = baton.pending.len(),
            "work aborted"
        );

        let WorkBaton { core, pending } = baton;
        drop(pending);
        core.finish(MachineResult::Abort);

        let executor = Arc::clone(core.executor());
        executor.run_in_foreground(Box::new(move || core.notify(&message)));
    }
}

impl Drop for WorkListener {
    fn drop(&mut self) {
        if let Some(baton) = self.baton.take() {
            tracing::error!(
                session = %baton.core.id(),
                state = %self.state,
                "work listener dropped without reporting, aborting session"
            );
            baton.core.finish(MachineResult::Abort);
        }
    }
}
