use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::WizardConfig;
use crate::error::ConsistencyError;
use crate::features::build_graph;
use crate::scheduler::{ForegroundQueue, TokioExecutor};
use crate::state_machine::{
    Machine, MachineResult, SessionFinished, SessionObserver, TargetVersion, WizardUser,
};
use crate::ui::{ConsoleUser, Terminal};

/// Forwards the session-finished event to the host loop.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionFinished>,
}

impl SessionObserver for ChannelObserver {
    fn session_finished(&self, event: &SessionFinished) {
        let _ = self.tx.send(event.clone());
    }
}

/// Hosts one wizard session on the current tokio runtime.
///
/// The loop owning the [`Machine`] is the foreground context: it handles
/// user input and runs every task the session posts to the foreground.
pub struct SessionOrchestrator {
    config: WizardConfig,
    terminal: Arc<Terminal>,
}

impl SessionOrchestrator {
    pub fn new(config: WizardConfig, terminal: Arc<Terminal>) -> Self {
        Self { config, terminal }
    }

    /// Run a session to its end, taking user lines from `inputs`.
    pub async fn run(&self, mut inputs: mpsc::UnboundedReceiver<String>) -> Result<SessionFinished> {
        let graph = build_graph(&self.config.features, &self.config.output_dir)?;
        let (executor, mut foreground) = TokioExecutor::new(Handle::current());
        let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();

        let mut user = self.terminal.connect();
        let mut machine = Machine::new(
            graph,
            user.clone(),
            TargetVersion::new(self.config.target_version.clone()),
            Arc::new(executor.clone()),
            Arc::new(ChannelObserver { tx: finished_tx }),
            self.config.messages(),
        )?;

        let result = machine.ask_question()?;
        self.advance(&mut machine, result)?;

        let mut inputs_open = true;
        loop {
            tokio::select! {
                Some(task) = foreground.next() => task(),
                Some(event) = finished_rx.recv() => {
                    settle(&executor, &mut foreground).await;
                    self.terminal.finish(&event);
                    return Ok(event);
                }
                line = inputs.recv(), if inputs_open => match line {
                    Some(line) => self.handle_line(&mut machine, &mut user, line.trim())?,
                    None => {
                        inputs_open = false;
                        if machine.result() == MachineResult::Wait {
                            bail!("input closed while a question is pending");
                        }
                    }
                },
            }
        }
    }

    fn handle_line(
        &self,
        machine: &mut Machine,
        user: &mut Arc<ConsoleUser>,
        line: &str,
    ) -> Result<()> {
        if machine.is_finished() {
            return Ok(());
        }
        match line {
            "" => {}
            "/disconnect" => {
                user.disconnect();
                self.terminal.note("(disconnected, type /reconnect to continue)");
            }
            "/reconnect" => self.reconnect(machine, user)?,
            answer if machine.result() == MachineResult::Wait => {
                let result = machine.react_on_message(answer)?;
                self.advance(machine, result)?;
            }
            _ if machine.is_working() => self.terminal.note("Setup is running, no question is pending."),
            _ => self.terminal.note("No question is pending."),
        }
        Ok(())
    }

    fn reconnect(&self, machine: &mut Machine, user: &mut Arc<ConsoleUser>) -> Result<()> {
        let fresh = self.terminal.connect();
        tracing::debug!(
            session = %machine.id(),
            pending = ?machine.current_state(),
            user = fresh.name(),
            "resuming session"
        );
        match machine.resume(fresh.clone()) {
            Ok(()) => {}
            // Background work can end the session after the caller's
            // `is_finished` check; the finished event is still on its way.
            Err(ConsistencyError::ResumeAborted | ConsistencyError::SessionFinished) => {
                tracing::debug!(session = %machine.id(), "session ended before reconnect");
                self.terminal.note("Setup has already ended.");
            }
            Err(e) => return Err(e.into()),
        }
        *user = fresh;
        Ok(())
    }

    // Moves from the conversation into the work phase once it is done.
    fn advance(&self, machine: &mut Machine, result: MachineResult) -> Result<()> {
        if result == MachineResult::Done {
            machine.start_work()?;
            self.terminal.begin_work();
        }
        Ok(())
    }
}

// A work abort tears the session down before its message reaches the
// foreground queue; keep draining until no background task is left.
async fn settle(executor: &TokioExecutor, foreground: &mut ForegroundQueue) {
    loop {
        foreground.run_pending();
        if executor.in_flight() == 0 && foreground.run_pending() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
