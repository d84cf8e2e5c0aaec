mod graph;
mod machine;
mod state;
#[cfg(test)]
pub mod testing;
mod tracker;
mod work;

pub use graph::StateGraph;
pub use machine::Machine;
pub use state::{MachineResult, WizardState, WizardUser};
pub use tracker::{Messages, SessionFinished, SessionObserver, TargetVersion};
pub use work::WorkListener;
