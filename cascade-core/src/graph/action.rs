//! The Action Trait
//!
//! An action is a unit of computation that lives in the dependency graph.
//! Concrete kinds embed an [`ActionCore`] and implement [`Action`]; the
//! scheduler only ever talks to them through this trait.

use std::fmt::Debug;

use smallvec::SmallVec;

use crate::config::ConfigLine;
use crate::context::{Communicator, StepContext};
use crate::error::Result;

use super::node::{ActionCore, ActionId, UNDOCUMENTED};
use super::scheduler::PrepareContext;
use super::set::ActionSet;

/// A node of the action graph.
pub trait Action: Debug {
    /// Shared node state.
    fn core(&self) -> &ActionCore;

    /// Shared node state, mutably.
    fn core_mut(&mut self) -> &mut ActionCore;

    /// One-time preparation, run on the first activation of each step.
    ///
    /// This is the only place an action may change its own dependencies
    /// once it has been registered, through `cx`. The new dependencies are
    /// the ones walked by the activation that called `prepare`.
    fn prepare(&mut self, cx: &mut PrepareContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Lift the request restriction before [`prepare`](Self::prepare).
    fn unlock_requests(&mut self) {
        self.core_mut().unlock_requests();
    }

    /// Reimpose the request restriction after [`prepare`](Self::prepare).
    fn lock_requests(&mut self) {
        self.core_mut().lock_requests();
    }

    /// Whether the action asks to run at this step on its own account
    /// (output writers). Everything else runs only when something active
    /// depends on it.
    fn is_demanded(&self, step: &StepContext) -> bool {
        let _ = step;
        false
    }

    /// Evaluate the action. Dependencies have already been evaluated.
    fn calculate(&mut self, inputs: &Inputs, step: &StepContext) -> Result<()> {
        let _ = (inputs, step);
        Ok(())
    }

    /// Runs after every active action has been calculated.
    fn update(&mut self, step: &StepContext) -> Result<()> {
        let _ = step;
        Ok(())
    }

    /// The scalar this action produced at the last calculation, if any.
    fn value(&self) -> Option<f64> {
        None
    }

    /// Human readable documentation of the kind.
    fn documentation(&self) -> &str {
        self.core().documentation()
    }
}

/// Everything an action constructor receives.
pub struct ActionOptions<'a> {
    line: ConfigLine,
    actions: &'a ActionSet,
    comm: Communicator,
    documentation: &'static str,
}

impl<'a> ActionOptions<'a> {
    /// Options for building from `line` against the actions registered so far.
    pub fn new(line: ConfigLine, actions: &'a ActionSet) -> Self {
        Self {
            line,
            actions,
            comm: Communicator::serial(),
            documentation: UNDOCUMENTED,
        }
    }

    /// Use the given communicator for output files.
    pub fn with_comm(mut self, comm: Communicator) -> Self {
        self.comm = comm;
        self
    }

    /// Attach the documentation of the kind being built.
    pub fn with_documentation(mut self, documentation: &'static str) -> Self {
        self.documentation = documentation;
        self
    }

    pub(crate) fn take_line(&mut self) -> ConfigLine {
        std::mem::take(&mut self.line)
    }

    /// The tokens not yet handed to [`ActionCore::new`].
    pub fn line(&self) -> &ConfigLine {
        &self.line
    }

    /// The actions registered before this one.
    pub fn actions(&self) -> &ActionSet {
        self.actions
    }

    /// Resolve a label among the actions registered before this one.
    pub fn find(&self, label: &str) -> Option<ActionId> {
        self.actions.find_by_label(label)
    }

    /// The communicator of the run.
    pub fn comm(&self) -> Communicator {
        self.comm
    }

    /// Documentation of the kind being built.
    pub fn documentation(&self) -> &'static str {
        self.documentation
    }
}

/// A dependency value handed to [`Action::calculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Label of the dependency.
    pub label: String,
    /// Its value, if it produces one.
    pub value: Option<f64>,
}

/// Values of an action's dependencies, in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    inputs: SmallVec<[Input; 4]>,
}

impl Inputs {
    /// Build from `(label, value)` pairs.
    pub fn new<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = Input>,
    {
        Self {
            inputs: inputs.into_iter().collect(),
        }
    }

    /// The value of the dependency labelled `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.inputs
            .iter()
            .find(|input| input.label == label)
            .and_then(|input| input.value)
    }

    /// Whether a dependency labelled `label` is present.
    pub fn contains(&self, label: &str) -> bool {
        self.inputs.iter().any(|input| input.label == label)
    }

    /// Iterate over the inputs.
    pub fn iter(&self) -> impl Iterator<Item = &Input> {
        self.inputs.iter()
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
