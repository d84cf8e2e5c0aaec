use std::sync::Arc;

use uuid::Uuid;

use super::graph::StateGraph;
use super::state::{MachineResult, WizardUser};
use super::tracker::{Messages, SessionCore, SessionObserver, Snapshot, TargetVersion};
use super::work::WorkBaton;
use crate::error::{ConsistencyError, GraphError, UserFacingFailure};
use crate::scheduler::Executor;

/// Drives one wizard session: questions first, then background work.
///
/// All methods must be called from the foreground context.
pub struct Machine {
    core: Arc<SessionCore>,
    graph: StateGraph,
    current: Option<usize>,
}

impl Machine {
    /// Build a session over `graph`. The graph is validated and the
    /// conversation starts at its first state.
    pub fn new(
        graph: StateGraph,
        user: Arc<dyn WizardUser>,
        version: TargetVersion,
        executor: Arc<dyn Executor>,
        observer: Arc<dyn SessionObserver>,
        messages: Messages,
    ) -> Result<Self, GraphError> {
        graph.validate()?;
        let core = SessionCore::new(version, user, executor, observer, messages);
        tracing::info!(
            session = %core.id(),
            version = %core.version(),
            states = ?graph.names(),
            "wizard session created"
        );
        Ok(Self {
            core: Arc::new(core),
            graph,
            current: Some(0),
        })
    }

    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    /// Last computed result.
    pub fn result(&self) -> MachineResult {
        self.core.tracker().result()
    }

    pub fn is_working(&self) -> bool {
        self.core.tracker().is_working()
    }

    pub fn is_finished(&self) -> bool {
        self.core.tracker().is_finished()
    }

    /// Name of the pending state, if any.
    pub fn current_state(&self) -> Option<&str> {
        self.current
            .and_then(|idx| self.graph.get(idx))
            .map(|state| state.name())
    }

    /// Auto-resolve as far as possible, then ask the first state that needs
    /// the user.
    pub fn ask_question(&mut self) -> Result<MachineResult, ConsistencyError> {
        self.ensure_live()?;
        if self.core.tracker().result() == MachineResult::Done {
            return Err(ConsistencyError::ConversationOver);
        }

        let result = match self.resolve_pending() {
            Ok(Some(idx)) => {
                let user = self.core.user();
                if user.is_online() {
                    if let Some(state) = self.graph.get(idx) {
                        state.ask_question(user.as_ref());
                    }
                }
                MachineResult::Wait
            }
            Ok(None) => MachineResult::Done,
            Err(failure) => {
                self.fail(failure);
                return Ok(MachineResult::Abort);
            }
        };

        self.core.tracker().set(result);
        Ok(result)
    }

    /// Feed the user's reply to the pending state. A reply leading into
    /// auto-resolvable states cascades until the next real question.
    pub fn react_on_message(&mut self, text: &str) -> Result<MachineResult, ConsistencyError> {
        self.ensure_live()?;
        let idx = self.current.ok_or(ConsistencyError::NoPendingQuestion)?;
        let Some(state) = self.graph.get_mut(idx) else {
            return Err(ConsistencyError::NoPendingQuestion);
        };

        self.core.tracker().set(MachineResult::None);
        let user = self.core.user();
        let reply = state.react_on_answer(user.as_ref(), text);
        let aborted = state.is_abortion();

        match reply {
            Err(failure) => {
                self.fail(failure);
                Ok(MachineResult::Abort)
            }
            Ok(None) if aborted => {
                tracing::info!(session = %self.core.id(), "user aborted the wizard");
                self.teardown(MachineResult::Abort);
                Ok(MachineResult::Abort)
            }
            Ok(None) => {
                self.current = None;
                self.core.tracker().set(MachineResult::Done);
                Ok(MachineResult::Done)
            }
            Ok(Some(next)) => match self.graph.index_of(&next) {
                Some(next_idx) => {
                    self.current = Some(next_idx);
                    self.ask_question()
                }
                None => {
                    self.fail(UserFacingFailure::new(format!("Unknown wizard step `{next}`.")));
                    Ok(MachineResult::Abort)
                }
            },
        }
    }

    /// Continue the session with a new user handle, e.g. after a reconnect.
    pub fn resume(&mut self, user: Arc<dyn WizardUser>) -> Result<(), ConsistencyError> {
        self.core.rebind_user(Arc::clone(&user));

        let Snapshot {
            result,
            working,
            finished,
        } = self.core.tracker().snapshot();
        match result {
            MachineResult::Wait => {
                let state = self
                    .current
                    .and_then(|idx| self.graph.get(idx))
                    .ok_or(ConsistencyError::WaitWithoutPendingState)?;
                state.ask_question(user.as_ref());
                Ok(())
            }
            MachineResult::Done if working => {
                user.send_message(&self.core.messages().still_running);
                Ok(())
            }
            MachineResult::Done if finished => {
                Err(ConsistencyError::SessionFinished)
            }
            MachineResult::Done => Ok(()),
            MachineResult::Abort => Err(ConsistencyError::ResumeAborted),
            MachineResult::None => Err(ConsistencyError::ResumeUndefined),
        }
    }

    /// Hand every state to the background context, one at a time, in graph
    /// order.
    pub fn start_work(&mut self) -> Result<(), ConsistencyError> {
        let tracker = self.core.tracker();
        if tracker.is_finished() {
            return Err(ConsistencyError::SessionFinished);
        }
        if tracker.is_working() {
            return Err(ConsistencyError::WorkAlreadyRunning);
        }
        let result = tracker.result();
        if result != MachineResult::Done {
            return Err(ConsistencyError::WorkNotReady(result));
        }
        if self.graph.is_empty() {
            return Err(ConsistencyError::NothingToWork);
        }

        self.current = None;
        let pending = self.graph.drain();
        tracing::info!(session = %self.core.id(), items = pending.len(), "starting work phase");
        self.core.begin_work();
        WorkBaton::new(Arc::clone(&self.core), pending).submit();
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), ConsistencyError> {
        if self.core.tracker().is_finished() {
            return Err(ConsistencyError::SessionFinished);
        }
        if self.core.tracker().is_working() {
            return Err(ConsistencyError::WorkAlreadyRunning);
        }
        Ok(())
    }

    // Walks auto-resolvable states from `current`. Returns the state that
    // needs an answer, or `None` once the chain runs out.
    fn resolve_pending(&mut self) -> Result<Option<usize>, UserFacingFailure> {
        let limit = self.graph.len();
        let mut steps = 0;
        while let Some(idx) = self.current {
            let Some(state) = self.graph.get_mut(idx) else {
                return Err(UserFacingFailure::new("Wizard step vanished."));
            };
            if !state.guess_answer()? {
                return Ok(Some(idx));
            }
            let name = state.name().to_string();
            let next = state.next_state().map(str::to_owned);
            tracing::debug!(session = %self.core.id(), state = %name, "auto-resolved");

            steps += 1;
            if steps > limit {
                return Err(UserFacingFailure::new(format!(
                    "Wizard step `{name}` loops back on itself."
                )));
            }

            self.current = match next {
                None => None,
                Some(next) => match self.graph.index_of(&next) {
                    Some(next_idx) => Some(next_idx),
                    None => {
                        return Err(UserFacingFailure::new(format!(
                            "Unknown wizard step `{next}`."
                        )));
                    }
                },
            };
        }
        Ok(None)
    }

    fn fail(&mut self, failure: UserFacingFailure) {
        tracing::warn!(session = %self.core.id(), error = %failure, "wizard failed");
        self.core.user().send_message(failure.message());
        self.teardown(MachineResult::Abort);
    }

    fn teardown(&mut self, outcome: MachineResult) {
        self.current = None;
        self.graph.clear();
        self.core.finish(outcome);
    }
}
