use std::fmt;

use serde::Serialize;

use super::work::WorkListener;
use crate::error::UserFacingFailure;

/// Outcome of the conversational phase.
///
/// - `None`: not evaluated yet; resuming is illegal.
/// - `Wait`: a question is pending.
/// - `Done`: every state was answered or auto-resolved.
/// - `Abort`: a fatal error tore the session down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MachineResult {
    #[default]
    None,
    Wait,
    Done,
    Abort,
}

impl MachineResult {
    /// Whether a session may move from `self` to `next`.
    ///
    /// `Abort` is reachable from anything that is not already aborted; the
    /// work phase uses the `Done -> Abort` edge.
    pub fn can_transition_to(self, next: MachineResult) -> bool {
        use MachineResult::*;
        matches!(
            (self, next),
            (None, Wait)
                | (None, Done)
                | (Wait, Wait)
                | (Wait, Done)
                | (None | Wait | Done, Abort)
        )
    }
}

impl fmt::Display for MachineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineResult::None => write!(f, "NONE"),
            MachineResult::Wait => write!(f, "WAIT"),
            MachineResult::Done => write!(f, "DONE"),
            MachineResult::Abort => write!(f, "ABORT"),
        }
    }
}

/// The person going through the wizard, as seen by the session.
///
/// Delivery is best-effort: the session never waits for confirmation.
pub trait WizardUser: Send + Sync {
    fn name(&self) -> &str;

    fn is_online(&self) -> bool;

    fn send_message(&self, text: &str);
}

/// One step of the wizard.
///
/// Implementations are registered into a [`StateGraph`](super::StateGraph)
/// and refer to each other by name.
pub trait WizardState: Send {
    /// Unique name inside the graph.
    fn name(&self) -> &str;

    /// Successor taken after this state auto-resolves. `None` ends the
    /// conversation.
    fn next_state(&self) -> Option<&str>;

    /// Try to settle this step without asking. `Ok(false)` means the user
    /// has to answer.
    fn guess_answer(&mut self) -> Result<bool, UserFacingFailure>;

    /// Render the question for this step.
    fn ask_question(&self, user: &dyn WizardUser);

    /// Parse the user's reply. Returns the name of the state to continue
    /// with, or `None` when this branch is closed.
    fn react_on_answer(
        &mut self,
        user: &dyn WizardUser,
        answer: &str,
    ) -> Result<Option<String>, UserFacingFailure>;

    /// Set when the last answer asked to abandon the whole wizard.
    fn is_abortion(&self) -> bool {
        false
    }

    /// Perform the setup for this step. Runs on the background context and
    /// must eventually report through `listener`.
    fn do_work(self: Box<Self>, listener: WorkListener);
}
