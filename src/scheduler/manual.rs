//! Deterministic executor for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Executor, Task};

/// Which context a task ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Background,
    Foreground,
}

/// Queues tasks and runs them only when asked, foreground first.
#[derive(Default)]
pub struct ManualExecutor {
    queues: Mutex<Queues>,
}

#[derive(Default)]
struct Queues {
    background: VecDeque<Task>,
    foreground: VecDeque<Task>,
    trace: Vec<Context>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued (background, foreground) tasks.
    pub fn pending(&self) -> (usize, usize) {
        let queues = self.queues.lock().unwrap();
        (queues.background.len(), queues.foreground.len())
    }

    /// Run a single queued task. Returns the context it ran on.
    pub fn step(&self) -> Option<Context> {
        let (context, task) = {
            let mut queues = self.queues.lock().unwrap();
            if let Some(task) = queues.foreground.pop_front() {
                (Context::Foreground, task)
            } else if let Some(task) = queues.background.pop_front() {
                (Context::Background, task)
            } else {
                return None;
            }
        };
        task();
        self.queues.lock().unwrap().trace.push(context);
        Some(context)
    }

    /// Run tasks until both queues are empty.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.step().is_some() {
            ran += 1;
        }
        ran
    }

    /// Contexts of every task run so far, in order.
    pub fn trace(&self) -> Vec<Context> {
        self.queues.lock().unwrap().trace.clone()
    }
}

impl Executor for ManualExecutor {
    fn run_in_background(&self, task: Task) {
        self.queues.lock().unwrap().background.push_back(task);
    }

    fn run_in_foreground(&self, task: Task) {
        self.queues.lock().unwrap().foreground.push_back(task);
    }
}
