//! Test doubles for the wizard collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::state::{WizardState, WizardUser};
use super::tracker::{SessionFinished, SessionObserver};
use super::work::WorkListener;
use crate::error::UserFacingFailure;

/// Shared, ordered record of what the scripted states did.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// User that records every message it receives.
pub struct RecordingUser {
    name: String,
    online: AtomicBool,
    messages: Mutex<Vec<String>>,
}

impl RecordingUser {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            online: AtomicBool::new(true),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl WizardUser for RecordingUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionFinished>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<SessionFinished> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_finished(&self, event: &SessionFinished) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// How a scripted state reacts to one answer.
#[derive(Clone)]
pub enum Reply {
    Next(String),
    Close,
    Abort,
    Fail(String),
}

/// What a scripted state's background work does.
#[derive(Clone)]
pub enum WorkPlan {
    Done(String),
    Abort(String),
    /// Drop the listener without reporting.
    Forget,
    /// Sleep, logging `start:` and `end:` around it, then report done.
    Sleep(Duration),
}

pub struct ScriptedState {
    name: String,
    next: Option<String>,
    guess: Result<bool, UserFacingFailure>,
    answers: HashMap<String, Reply>,
    aborted: bool,
    work: WorkPlan,
    log: EventLog,
}

impl ScriptedState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next: None,
            guess: Ok(false),
            answers: HashMap::new(),
            aborted: false,
            work: WorkPlan::Done(String::new()),
            log: EventLog::default(),
        }
    }

    pub fn next(mut self, name: &str) -> Self {
        self.next = Some(name.to_string());
        self
    }

    /// Resolve without asking.
    pub fn auto(mut self) -> Self {
        self.guess = Ok(true);
        self
    }

    pub fn guess_fails(mut self, message: &str) -> Self {
        self.guess = Err(UserFacingFailure::new(message));
        self
    }

    pub fn on(mut self, answer: &str, reply: Reply) -> Self {
        self.answers.insert(answer.to_string(), reply);
        self
    }

    pub fn work(mut self, plan: WorkPlan) -> Self {
        self.work = plan;
        self
    }

    pub fn log(mut self, log: &EventLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn question(name: &str) -> String {
        format!("{name}?")
    }
}

impl WizardState for ScriptedState {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_state(&self) -> Option<&str> {
        self.next.as_deref()
    }

    fn guess_answer(&mut self) -> Result<bool, UserFacingFailure> {
        self.log.push(format!("guess:{}", self.name));
        self.guess.clone()
    }

    fn ask_question(&self, user: &dyn WizardUser) {
        self.log.push(format!("ask:{}", self.name));
        user.send_message(&Self::question(&self.name));
    }

    fn react_on_answer(
        &mut self,
        _user: &dyn WizardUser,
        answer: &str,
    ) -> Result<Option<String>, UserFacingFailure> {
        self.log.push(format!("answer:{}={answer}", self.name));
        match self.answers.get(answer).cloned().unwrap_or(Reply::Close) {
            Reply::Next(next) => Ok(Some(next)),
            Reply::Close => Ok(None),
            Reply::Abort => {
                self.aborted = true;
                Ok(None)
            }
            Reply::Fail(message) => Err(UserFacingFailure::new(message)),
        }
    }

    fn is_abortion(&self) -> bool {
        self.aborted
    }

    fn do_work(self: Box<Self>, listener: WorkListener) {
        self.log.push(format!("work:{}", self.name));
        match self.work {
            WorkPlan::Done(message) => listener.on_work_done(message),
            WorkPlan::Abort(message) => listener.on_work_abort(message),
            WorkPlan::Forget => drop(listener),
            WorkPlan::Sleep(duration) => {
                self.log.push(format!("start:{}", self.name));
                std::thread::sleep(duration);
                self.log.push(format!("end:{}", self.name));
                listener.on_work_done("");
            }
        }
    }
}
