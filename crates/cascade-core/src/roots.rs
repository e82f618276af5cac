//! Core roots: named state selectors.
//!
//! A [`CoreRoot`] groups items into named states (for example "menu",
//! "settings", "game"). Selecting a state closes every item that belongs only
//! to other states and opens the items of the selected one. When a scene is
//! loaded each registered root selects its default state.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::activation::{self, Ctx};
use crate::id::ItemId;

/// One named state of a core root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreState {
    pub name: String,
    pub items: Vec<ItemId>,
    /// Selected when the scene is loaded.
    #[serde(default)]
    pub is_default: bool,
}

/// Named collection of mutually exclusive item states.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreRoot {
    pub name: String,
    states: Vec<CoreState>,
    current: Option<usize>,
}

impl CoreRoot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            current: None,
        }
    }

    pub fn with_state(
        mut self,
        name: impl Into<String>,
        items: impl IntoIterator<Item = ItemId>,
        is_default: bool,
    ) -> Self {
        self.add_state(name, items, is_default);
        self
    }

    /// Add a state. Marking it default clears the flag on every other state.
    pub fn add_state(
        &mut self,
        name: impl Into<String>,
        items: impl IntoIterator<Item = ItemId>,
        is_default: bool,
    ) {
        if is_default {
            for state in self.states.iter_mut() {
                state.is_default = false;
            }
        }
        self.states.push(CoreState {
            name: name.into(),
            items: items.into_iter().collect(),
            is_default,
        });
    }

    pub fn states(&self) -> &[CoreState] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&CoreState> {
        self.states.iter().find(|state| state.name == name)
    }

    /// Name of the last selected state.
    pub fn current_state(&self) -> Option<&str> {
        self.current
            .and_then(|index| self.states.get(index))
            .map(|state| state.name.as_str())
    }

    pub fn default_state(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|state| state.is_default)
            .map(|state| state.name.as_str())
    }

    /// Close the items of every other state, then open the selected state.
    ///
    /// Items that belong to the selected state are never closed. Returns
    /// `false` if no state has that name.
    pub fn select_state(&mut self, ctx: &mut Ctx<'_>, name: &str) -> bool {
        let Some(index) = self.states.iter().position(|state| state.name == name) else {
            warn!(root = %self.name, state = name, "unknown core state");
            return false;
        };

        let selected = &self.states[index].items;
        for (i, state) in self.states.iter().enumerate() {
            if i == index {
                continue;
            }
            for item in state.items.iter().filter(|item| !selected.contains(item)) {
                activation::close(ctx, *item);
            }
        }
        for item in selected {
            activation::open(ctx, *item);
        }

        debug!(root = %self.name, state = name, "core state selected");
        self.current = Some(index);
        true
    }

    /// Select the default state, if one is marked.
    pub fn select_default_state(&mut self, ctx: &mut Ctx<'_>) -> bool {
        match self.default_state().map(str::to_string) {
            Some(name) => self.select_state(ctx, &name),
            None => false,
        }
    }
}
