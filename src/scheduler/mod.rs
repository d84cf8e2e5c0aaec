//! The two execution contexts a wizard session runs on.
//!
//! The foreground context serializes everything the user can see and every
//! mutation of the conversational state. The background context runs the
//! slow setup work. A session never touches a global scheduler: the host
//! hands it an [`Executor`] at construction.

mod executor;
#[cfg(test)]
pub mod manual;

pub use executor::{ForegroundQueue, TokioExecutor};

/// A unit of work submitted to one of the contexts.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Submission capability supplied by the host.
pub trait Executor: Send + Sync {
    /// Run `task` on the background (worker) context.
    fn run_in_background(&self, task: Task);

    /// Run `task` on the foreground (interactive) context.
    fn run_in_foreground(&self, task: Task);
}
