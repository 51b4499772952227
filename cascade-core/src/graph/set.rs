//! Action Set
//!
//! The [`ActionSet`] owns every action of a run, in the order they were
//! created. Edges between actions are plain [`ActionId`] indices into this
//! arena, so the set is also where both ends of an edge get updated together.
//!
//! # Invariants
//!
//! - Labels are unique.
//! - Edges are symmetric: `a` lists `b` as a dependency if and only if `b`
//!   lists `a` as a dependent.
//! - Once [`freeze`](ActionSet::freeze) has been called nothing more is
//!   inserted.

use indexmap::IndexMap;

use crate::error::{Error, Result};

use super::action::{Action, Input, Inputs};
use super::node::{ActionCore, ActionId};

/// Insertion-ordered owner of every action.
#[derive(Debug, Default)]
pub struct ActionSet {
    pub(super) actions: Vec<Box<dyn Action>>,
    pub(super) labels: IndexMap<String, ActionId>,
    frozen: bool,
}

impl ActionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action and return its id.
    ///
    /// Dependencies the action declared while being built are linked back
    /// here, which is the moment both ends of those edges exist.
    pub fn insert(&mut self, mut action: Box<dyn Action>) -> Result<ActionId> {
        let label = action.core().label().to_string();
        if self.frozen {
            return Err(Error::RegistryFrozen(label));
        }
        if self.labels.contains_key(&label) {
            return Err(Error::DuplicateLabel(label));
        }
        if let Some(missing) = action
            .core()
            .dependencies()
            .iter()
            .find(|dep| dep.index() >= self.actions.len())
        {
            return Err(Error::UnknownAction(missing.index()));
        }

        let id = ActionId::from(self.actions.len());
        let dependencies: Vec<ActionId> = action.core().dependencies().iter().copied().collect();
        for dep in dependencies {
            self.actions[dep.index()].core_mut().dependents_mut().insert(id);
        }
        action.lock_requests();

        tracing::debug!(%label, %id, "registered action");
        self.labels.insert(label, id);
        self.actions.push(action);
        Ok(id)
    }

    /// End the construction pass.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the construction pass is over.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The id of the action labelled `label`.
    pub fn find_by_label(&self, label: &str) -> Option<ActionId> {
        self.labels.get(label).copied()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Get an action.
    pub fn get(&self, id: ActionId) -> Option<&dyn Action> {
        self.actions.get(id.index()).map(|action| action.as_ref())
    }

    /// Get an action mutably.
    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut (dyn Action + 'static)> {
        self.actions.get_mut(id.index()).map(|action| action.as_mut())
    }

    /// Get an action's shared state.
    pub fn core(&self, id: ActionId) -> Result<&ActionCore> {
        self.get(id)
            .map(|action| action.core())
            .ok_or(Error::UnknownAction(id.index()))
    }

    pub(super) fn core_mut(&mut self, id: ActionId) -> Result<&mut ActionCore> {
        self.actions
            .get_mut(id.index())
            .map(|action| action.core_mut())
            .ok_or(Error::UnknownAction(id.index()))
    }

    /// The label of an action.
    pub fn label(&self, id: ActionId) -> Option<&str> {
        self.get(id).map(|action| action.core().label())
    }

    /// Iterate over actions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &dyn Action)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(index, action)| (ActionId::from(index), action.as_ref()))
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ActionId> {
        (0..self.actions.len()).map(ActionId::from)
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Make `dependent` depend on `dependency`.
    ///
    /// A self-edge is refused since activating it would never terminate.
    pub fn add_dependency(&mut self, dependent: ActionId, dependency: ActionId) -> Result<()> {
        self.core(dependency)?;
        if dependent == dependency {
            return Err(Error::CycleDetected {
                labels: vec![self.core(dependent)?.label().to_string()],
            });
        }
        debug_assert_eq!(
            self.core(dependent)?.dependencies().contains(&dependency),
            self.core(dependency)?.dependents().contains(&dependent),
            "asymmetric edge between {dependent} and {dependency}"
        );

        self.core_mut(dependent)?.dependencies_mut().insert(dependency);
        self.core_mut(dependency)?.dependents_mut().insert(dependent);
        Ok(())
    }

    /// Retract every dependency of `id`, from both ends.
    pub fn clear_dependencies(&mut self, id: ActionId) -> Result<()> {
        let dependencies = std::mem::take(self.core_mut(id)?.dependencies_mut());
        for dep in dependencies {
            self.core_mut(dep)?.dependents_mut().shift_remove(&id);
        }
        Ok(())
    }

    /// Check the symmetry invariant over the whole set.
    pub fn is_consistent(&self) -> bool {
        self.iter().all(|(id, action)| {
            action.core().dependencies().iter().all(|dep| {
                self.core(*dep)
                    .map(|core| core.dependents().contains(&id))
                    .unwrap_or(false)
            }) && action.core().dependents().iter().all(|dependent| {
                self.core(*dependent)
                    .map(|core| core.dependencies().contains(&id))
                    .unwrap_or(false)
            })
        })
    }

    // ------------------------------------------------------------------
    // Step bookkeeping
    // ------------------------------------------------------------------

    /// Mark every action inactive. This opens a new activation epoch.
    pub fn reset_active(&mut self) {
        for action in &mut self.actions {
            action.core_mut().set_active(false);
        }
    }

    /// Ids of the actions active in the current epoch, in insertion order.
    pub fn active(&self) -> Vec<ActionId> {
        self.iter()
            .filter(|(_, action)| action.core().is_active())
            .map(|(id, _)| id)
            .collect()
    }

    /// Values of `id`'s dependencies, in dependency order.
    pub fn inputs(&self, id: ActionId) -> Result<Inputs> {
        let core = self.core(id)?;
        let mut inputs = Vec::with_capacity(core.dependencies().len());
        for dep in core.dependencies() {
            let action = self.get(*dep).ok_or(Error::UnknownAction(dep.index()))?;
            inputs.push(Input {
                label: action.core().label().to_string(),
                value: action.value(),
            });
        }
        Ok(Inputs::new(inputs))
    }

    /// Flush every action's output files.
    pub fn flush_all(&mut self) -> Result<()> {
        for action in &mut self.actions {
            action.core_mut().flush_all()?;
        }
        Ok(())
    }

    /// Tear the graph down: close every file and drop every action.
    ///
    /// The set accepts insertions again afterwards.
    pub fn clear(&mut self) -> Result<()> {
        let mut first = None;
        for action in &mut self.actions {
            if let Err(err) = action.core_mut().close_all() {
                first.get_or_insert(err);
            }
        }
        self.actions.clear();
        self.labels.clear();
        self.frozen = false;
        first.map_or(Ok(()), Err)
    }
}
