//! Activation Scheduler
//!
//! Decides, once per step, which actions must run and in which order.
//!
//! # Algorithm
//!
//! Activation is a lazy depth-first walk over the depends-on edges:
//!
//! 1. The driving process opens an epoch by clearing every active flag
//!    ([`ActionSet::reset_active`]).
//! 2. It calls [`ActionSet::activate`] on each action that is demanded at
//!    this step.
//! 3. On the first activation of an action in the epoch, its requests are
//!    unlocked, [`Action::prepare`](super::Action::prepare) runs (and may
//!    rewire the action's own dependencies), and requests are locked again.
//! 4. Every current dependency is activated recursively, then the action
//!    itself is marked active.
//!
//! Because preparation finishes before the walk starts, the dependencies
//! visited are always the post-preparation set.
//!
//! The graph must be acyclic. Activation does not look for cycles; run
//! [`ActionSet::check_acyclic`] after construction to validate the graph.
//!
//! Evaluation order comes from a topological sort of the active actions
//! (Kahn's algorithm), so dependencies are calculated before dependents.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::context::StepContext;
use crate::error::{Error, Result};

use super::node::ActionId;
use super::set::ActionSet;

/// Dependency change requested from inside [`Action::prepare`](super::Action::prepare).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewire {
    Clear,
    Add(ActionId),
}

/// What an action sees while it prepares.
///
/// Dependency changes are recorded here and applied to the graph as soon as
/// `prepare` returns, before any dependency is activated.
pub struct PrepareContext<'a> {
    id: ActionId,
    step: &'a StepContext,
    labels: &'a IndexMap<String, ActionId>,
    rewires: SmallVec<[Rewire; 4]>,
}

impl<'a> PrepareContext<'a> {
    fn new(id: ActionId, step: &'a StepContext, labels: &'a IndexMap<String, ActionId>) -> Self {
        Self {
            id,
            step,
            labels,
            rewires: SmallVec::new(),
        }
    }

    /// The id of the action being prepared.
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// The current step.
    pub fn step(&self) -> u64 {
        self.step.step()
    }

    /// The current simulation time.
    pub fn time(&self) -> f64 {
        self.step.time()
    }

    /// The integration time step.
    pub fn time_step(&self) -> f64 {
        self.step.time_step()
    }

    /// Resolve another action by label.
    pub fn find(&self, label: &str) -> Option<ActionId> {
        self.labels.get(label).copied()
    }

    /// Retract every current dependency of the action.
    pub fn clear_dependencies(&mut self) {
        self.rewires.push(Rewire::Clear);
    }

    /// Add a dependency of the action.
    pub fn add_dependency(&mut self, dependency: ActionId) {
        self.rewires.push(Rewire::Add(dependency));
    }
}

impl ActionSet {
    /// Activate `id` and, transitively, everything it depends on.
    ///
    /// Idempotent within an epoch: preparation runs only on the first call,
    /// and the active set after two calls equals the set after one.
    pub fn activate(&mut self, id: ActionId, step: &StepContext) -> Result<()> {
        let first = !self.core(id)?.is_active();
        if first {
            self.prepare(id, step)?;
        }

        let dependencies: SmallVec<[ActionId; 8]> =
            self.core(id)?.dependencies().iter().copied().collect();
        for dep in dependencies {
            self.activate(dep, step)?;
        }

        self.core_mut(id)?.set_active(true);
        if first {
            tracing::trace!(%id, "activated");
        }
        Ok(())
    }

    fn prepare(&mut self, id: ActionId, step: &StepContext) -> Result<()> {
        let action = self
            .actions
            .get_mut(id.index())
            .ok_or(Error::UnknownAction(id.index()))?;
        let mut cx = PrepareContext::new(id, step, &self.labels);

        action.unlock_requests();
        let prepared = action.prepare(&mut cx);
        action.lock_requests();
        prepared?;

        let rewires = cx.rewires;
        if !rewires.is_empty() {
            tracing::debug!(%id, count = rewires.len(), "rewiring dependencies during preparation");
        }
        for rewire in rewires {
            match rewire {
                Rewire::Clear => self.clear_dependencies(id)?,
                Rewire::Add(dependency) => self.add_dependency(id, dependency)?,
            }
        }
        Ok(())
    }

    /// The active actions, dependencies before dependents.
    pub fn active_order(&self) -> Result<Vec<ActionId>> {
        self.topological_sort(self.active())
    }

    /// Fail with [`Error::CycleDetected`] if the dependency graph has a cycle.
    pub fn check_acyclic(&self) -> Result<()> {
        self.topological_sort(self.ids().collect()).map(|_| ())
    }

    /// Sort `nodes` so that dependencies come before dependents.
    ///
    /// Only edges inside `nodes` count. Nodes left over once no node of
    /// in-degree zero remains sit on a cycle (or downstream of one) and are
    /// reported.
    fn topological_sort(&self, nodes: Vec<ActionId>) -> Result<Vec<ActionId>> {
        let node_set: HashSet<_> = nodes.iter().copied().collect();
        let mut in_degree: HashMap<ActionId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();

        for &node_id in &nodes {
            let degree = self
                .core(node_id)?
                .dependencies()
                .iter()
                .filter(|d| node_set.contains(*d))
                .count();
            in_degree.insert(node_id, degree);
            if degree == 0 {
                queue.push_back(node_id);
            }
        }

        // Kahn's algorithm
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            for &dependent_id in self.core(node_id)?.dependents() {
                if let Some(degree) = in_degree.get_mut(&dependent_id) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(dependent_id);
                    }
                }
            }
        }

        if result.len() < nodes.len() {
            let sorted: HashSet<_> = result.iter().copied().collect();
            let labels = nodes
                .iter()
                .filter(|id| !sorted.contains(*id))
                .filter_map(|id| self.label(*id))
                .map(str::to_string)
                .collect();
            return Err(Error::CycleDetected { labels });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLine;
    use crate::graph::{Action, ActionCore, ActionOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records its preparations and can swap its dependency during prepare.
    #[derive(Debug)]
    struct Probe {
        core: ActionCore,
        log: Log,
        switch_to: Option<ActionId>,
    }

    impl Action for Probe {
        fn core(&self) -> &ActionCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ActionCore {
            &mut self.core
        }

        fn prepare(&mut self, cx: &mut PrepareContext<'_>) -> Result<()> {
            assert!(!self.core.requests_locked());
            self.log
                .borrow_mut()
                .push(format!("prepare {}", self.core.label()));
            if let Some(target) = self.switch_to {
                cx.clear_dependencies();
                cx.add_dependency(target);
            }
            Ok(())
        }
    }

    fn probe(set: &mut ActionSet, log: &Log, deps: &[ActionId], switch_to: Option<ActionId>) -> ActionId {
        let mut options = ActionOptions::new(ConfigLine::new(["PROBE"]), set);
        let mut core = ActionCore::new(&mut options).unwrap();
        for dep in deps {
            core.require(*dep).unwrap();
        }
        set.insert(Box::new(Probe {
            core,
            log: Rc::clone(log),
            switch_to,
        }))
        .unwrap()
    }

    #[test]
    fn activation_walks_transitive_closure_only() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let a = probe(&mut set, &log, &[], None);
        let b = probe(&mut set, &log, &[a], None);
        let c = probe(&mut set, &log, &[b], None);
        let unrelated = probe(&mut set, &log, &[], None);

        set.activate(c, &StepContext::default()).unwrap();

        assert_eq!(set.active(), vec![a, b, c]);
        assert!(!set.core(unrelated).unwrap().is_active());
        assert_eq!(*log.borrow(), ["prepare @2", "prepare @1", "prepare @0"]);
    }

    #[test]
    fn activation_is_idempotent_within_an_epoch() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let a = probe(&mut set, &log, &[], None);
        let b = probe(&mut set, &log, &[a], None);
        let step = StepContext::default();

        set.activate(b, &step).unwrap();
        let once = set.active();
        set.activate(b, &step).unwrap();
        set.activate(a, &step).unwrap();

        assert_eq!(set.active(), once);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn reset_opens_a_new_epoch() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let a = probe(&mut set, &log, &[], None);
        let step = StepContext::default();

        set.activate(a, &step).unwrap();
        set.reset_active();
        assert!(set.active().is_empty());
        set.activate(a, &step).unwrap();

        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn prepare_rewires_before_dependencies_are_walked() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let old = probe(&mut set, &log, &[], None);
        let new = probe(&mut set, &log, &[], None);
        let switcher = probe(&mut set, &log, &[old], Some(new));

        set.activate(switcher, &StepContext::default()).unwrap();

        assert!(set.core(new).unwrap().is_active());
        assert!(!set.core(old).unwrap().is_active());
        assert!(!set.core(old).unwrap().dependents().contains(&switcher));
        assert!(set.is_consistent());
        assert!(set.core(switcher).unwrap().requests_locked());
    }

    #[test]
    fn active_order_puts_dependencies_first() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let a = probe(&mut set, &log, &[], None);
        let b = probe(&mut set, &log, &[a], None);
        let c = probe(&mut set, &log, &[a, b], None);

        set.activate(c, &StepContext::default()).unwrap();
        assert_eq!(set.active_order().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn cycles_are_reported_by_validation() {
        let log = Log::default();
        let mut set = ActionSet::new();
        let a = probe(&mut set, &log, &[], None);
        let b = probe(&mut set, &log, &[a], None);
        let c = probe(&mut set, &log, &[], None);
        set.check_acyclic().unwrap();

        set.add_dependency(a, b).unwrap();
        match set.check_acyclic() {
            Err(Error::CycleDetected { labels }) => assert_eq!(labels, ["@0", "@1"]),
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert!(!set.core(c).unwrap().is_active());
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut set = ActionSet::new();
        assert!(matches!(
            set.activate(ActionId::from(0), &StepContext::default()),
            Err(Error::UnknownAction(0))
        ));
    }
}
