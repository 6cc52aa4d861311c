use rustc_hash::FxHashMap;

use crate::animation::state::{AnimatorState, StateId};
use crate::errors::{AnimationError, Result};

/// The set of states available to one layer.
///
/// Transitions are driven explicitly by `play` / `cross_fade`, so the machine
/// is only a registry: states are stored densely by [`StateId`] and a name
/// index built on insertion makes lookups O(1). The names are kept for
/// diagnostics and authoring.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    states: Vec<AnimatorState>,
    by_name: FxHashMap<String, StateId>,
}

impl StateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state and returns its id. Names must be unique.
    pub fn add_state(&mut self, mut state: AnimatorState) -> Result<StateId> {
        if self.by_name.contains_key(state.name()) {
            return Err(AnimationError::DuplicateState(state.name().to_owned()));
        }
        let id = StateId(self.states.len() as u32);
        state.id = id;
        self.by_name.insert(state.name().to_owned(), id);
        self.states.push(state);
        Ok(id)
    }

    /// Builder form of [`add_state`](Self::add_state).
    pub fn with_state(mut self, state: AnimatorState) -> Result<Self> {
        self.add_state(state)?;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn find_state(&self, name: &str) -> Option<&AnimatorState> {
        self.find(name).and_then(|id| self.state(id))
    }

    #[inline]
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AnimatorState> {
        self.states.get(id.index())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimatorState> {
        self.states.iter()
    }
}
