use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::{event::InputKey, functor::FunctorId};

/// Possible errors when changing modes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModeError {
    #[error("unknown mode: {0}")]
    UnknownMode(String),
}

/// A named scope of input bindings which may inherit bindings from a parent
/// mode. The parent is referenced by name so modes can live in a flat arena.
#[derive(Debug, Clone, Default)]
pub struct Mode {
    pub name: String,
    pub parent: Option<String>,
    /// Root functors bound to each input, in declaration order
    pub bindings: HashMap<InputKey, Vec<FunctorId>>,
}

impl Mode {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent,
            bindings: HashMap::new(),
        }
    }

    /// Append a root functor to the binding list of the given input
    pub fn bind(&mut self, key: InputKey, functor: FunctorId) {
        self.bindings.entry(key).or_default().push(functor);
    }
}

/// Describes the outcome of a mode transition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModeChange {
    pub from: String,
    pub to: String,
    /// Modes that were part of the previous inheritance chain but are no
    /// longer active
    pub deactivated: Vec<String>,
}

/// Tracks the current mode, the previously active mode and the stack of
/// temporary mode overrides.
#[derive(Debug, Clone)]
pub struct ModeManager {
    modes: HashMap<String, Mode>,
    /// Declaration order of the modes, used for stable listings
    order: Vec<String>,
    /// Mode selected by the last permanent switch
    committed: String,
    /// Effective mode: the top of the temporary stack or the committed mode
    current: String,
    previous: String,
    temporary_stack: Vec<String>,
}

impl ModeManager {
    /// Create a new mode manager starting in `start`. Modes are given in
    /// declaration order.
    pub fn new(modes: Vec<Mode>, start: &str) -> Result<Self, ModeError> {
        let order: Vec<String> = modes.iter().map(|mode| mode.name.clone()).collect();
        let modes: HashMap<String, Mode> = modes
            .into_iter()
            .map(|mode| (mode.name.clone(), mode))
            .collect();
        if !modes.contains_key(start) {
            return Err(ModeError::UnknownMode(start.to_string()));
        }

        for mode in modes.values() {
            if let Some(parent) = mode.parent.as_ref() {
                if !modes.contains_key(parent) {
                    log::warn!(
                        "Mode '{}' references missing parent '{parent}'; inheritance stops there",
                        mode.name
                    );
                }
            }
        }

        Ok(Self {
            modes,
            order,
            committed: start.to_string(),
            current: start.to_string(),
            previous: start.to_string(),
            temporary_stack: Vec::new(),
        })
    }

    /// Name of the currently active mode
    pub fn current(&self) -> &str {
        self.current.as_str()
    }

    /// Name of the mode that was active before the last transition
    pub fn previous(&self) -> &str {
        self.previous.as_str()
    }

    /// Returns the names of all modes in declaration order
    pub fn mode_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Returns the mode with the given name
    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }

    /// Returns the currently stacked temporary modes, bottom first
    pub fn temporary_stack(&self) -> &[String] {
        self.temporary_stack.as_slice()
    }

    /// Returns the given mode followed by its ancestors. A missing parent ends
    /// the chain and each mode is visited at most once.
    pub fn inheritance_chain(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(name.to_string());
        while let Some(name) = next {
            if !visited.insert(name.clone()) {
                log::warn!("Mode inheritance cycle detected at '{name}'");
                break;
            }
            let Some(mode) = self.modes.get(&name) else {
                break;
            };
            next = mode.parent.clone();
            chain.push(name);
        }
        chain
    }

    /// Resolve the bindings for the given input in the current mode. The
    /// first mode in the inheritance chain with a non-empty binding wins.
    pub fn resolve(&self, key: &InputKey) -> Option<(&str, &[FunctorId])> {
        self.resolve_in(&self.current, key)
    }

    /// Resolve the bindings for the given input starting at `mode`
    pub fn resolve_in(&self, mode: &str, key: &InputKey) -> Option<(&str, &[FunctorId])> {
        for name in self.inheritance_chain(mode) {
            let Some(mode) = self.modes.get(&name) else {
                continue;
            };
            let Some(bound) = mode.bindings.get(key) else {
                continue;
            };
            if bound.is_empty() {
                continue;
            }
            return Some((mode.name.as_str(), bound.as_slice()));
        }
        None
    }

    /// Permanently switch to the given mode. Any temporary modes are
    /// discarded. Switching to the current mode is a no-op and returns `None`.
    pub fn switch_to(&mut self, name: &str) -> Result<Option<ModeChange>, ModeError> {
        if !self.modes.contains_key(name) {
            return Err(ModeError::UnknownMode(name.to_string()));
        }
        if self.current == name && self.temporary_stack.is_empty() {
            log::trace!("Already in mode '{name}'");
            return Ok(None);
        }

        self.temporary_stack.clear();
        self.committed = name.to_string();
        Ok(self.transition(name.to_string()))
    }

    /// Switch back to the mode that was active before the last transition
    pub fn switch_to_previous(&mut self) -> Result<Option<ModeChange>, ModeError> {
        let previous = self.previous.clone();
        self.switch_to(&previous)
    }

    /// Activate the given mode until the matching [ModeManager::pop_temporary]
    pub fn push_temporary(&mut self, name: &str) -> Result<Option<ModeChange>, ModeError> {
        if !self.modes.contains_key(name) {
            return Err(ModeError::UnknownMode(name.to_string()));
        }
        self.temporary_stack.push(name.to_string());
        Ok(self.transition(name.to_string()))
    }

    /// Remove the most recent temporary mode and return to the mode beneath
    /// it. Popping an empty stack does nothing.
    pub fn pop_temporary(&mut self) -> Option<ModeChange> {
        if self.temporary_stack.pop().is_none() {
            log::trace!("No temporary mode to pop");
            return None;
        }
        let next = self
            .temporary_stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.committed.clone());
        self.transition(next)
    }

    /// Advance to the mode following the current one in the given list,
    /// wrapping around at the end. If the current mode is not part of the list
    /// the first entry is used. An empty list does nothing.
    pub fn cycle(&mut self, names: &[String]) -> Result<Option<ModeChange>, ModeError> {
        if names.is_empty() {
            return Ok(None);
        }
        let next = match names.iter().position(|name| *name == self.current) {
            Some(idx) => &names[(idx + 1) % names.len()],
            None => &names[0],
        };
        let next = next.clone();
        self.switch_to(&next)
    }

    /// Move `current` to the given mode and compute which modes went inactive
    fn transition(&mut self, to: String) -> Option<ModeChange> {
        if to == self.current {
            return None;
        }
        let old_chain = self.inheritance_chain(&self.current);
        let new_chain = self.inheritance_chain(&to);
        let deactivated = old_chain
            .into_iter()
            .filter(|name| !new_chain.contains(name))
            .collect();

        let from = std::mem::replace(&mut self.current, to.clone());
        self.previous = from.clone();
        log::debug!("Switched mode from '{from}' to '{to}'");

        Some(ModeChange {
            from,
            to,
            deactivated,
        })
    }
}
