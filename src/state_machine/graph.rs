use std::collections::{HashSet, VecDeque};

use super::state::WizardState;
use crate::error::GraphError;

/// Insertion-ordered collection of the states of one session.
///
/// Order is both the auto-resolution seed (the first state is where the
/// conversation starts) and the order background work runs in.
#[derive(Default)]
pub struct StateGraph {
    states: Vec<Box<dyn WizardState>>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a state. Names must be unique.
    pub fn add(&mut self, state: Box<dyn WizardState>) -> Result<&mut Self, GraphError> {
        if self.index_of(state.name()).is_some() {
            return Err(GraphError::DuplicateState(state.name().to_string()));
        }
        self.states.push(state);
        Ok(self)
    }

    /// Check that the graph can be walked: it is non-empty, every declared
    /// successor exists, and following successors never revisits a state.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.states.is_empty() {
            return Err(GraphError::Empty);
        }

        for state in &self.states {
            if let Some(next) = state.next_state() {
                if self.index_of(next).is_none() {
                    return Err(GraphError::UnknownState {
                        from: state.name().to_string(),
                        to: next.to_string(),
                    });
                }
            }
        }

        // Each state has at most one successor, so a walk from every start
        // either ends or runs into a state it has already seen.
        for start in 0..self.states.len() {
            let mut seen = HashSet::new();
            let mut path = Vec::new();
            let mut cursor = Some(start);
            while let Some(idx) = cursor {
                let name = self.states[idx].name();
                path.push(name.to_string());
                if !seen.insert(idx) {
                    return Err(GraphError::Cycle(path));
                }
                cursor = self.states[idx]
                    .next_state()
                    .and_then(|next| self.index_of(next));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name() == name)
    }

    pub fn get(&self, idx: usize) -> Option<&dyn WizardState> {
        self.states.get(idx).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut (dyn WizardState + 'static)> {
        self.states.get_mut(idx).map(|s| s.as_mut())
    }

    /// State names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.name()).collect()
    }

    /// Hand every state over, in insertion order, leaving the graph empty.
    pub fn drain(&mut self) -> VecDeque<Box<dyn WizardState>> {
        self.states.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
