//! Engine
//!
//! The driving process around the action graph. It owns the register of
//! kinds, the action set and the step context, and it is the party
//! responsible for epoch boundaries.
//!
//! # Per-step contract
//!
//! 1. [`begin_step`](Engine::begin_step) sets the step and clears every
//!    active flag. Nothing else ever clears them.
//! 2. Demanded actions are activated, which activates their dependencies.
//! 3. Active actions are calculated with dependencies first, then updated.
//!
//! [`run_step`](Engine::run_step) performs the three phases in order.

use crate::config::{parse_input, ConfigLine, EngineConfig};
use crate::context::{Communicator, StepContext};
use crate::error::Result;
use crate::graph::{ActionId, ActionSet};
use crate::register::ActionRegister;

/// Owns the action graph and drives it step by step.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    register: ActionRegister,
    actions: ActionSet,
    step: StepContext,
}

impl Engine {
    /// Create an engine with the given kinds.
    pub fn new(config: EngineConfig, register: ActionRegister) -> Self {
        let step = StepContext::new(0, config.time_step);
        Self {
            config,
            register,
            actions: ActionSet::new(),
            step,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The communicator of this process.
    pub fn comm(&self) -> Result<Communicator> {
        self.config.communicator()
    }

    /// The current step context.
    pub fn step(&self) -> &StepContext {
        &self.step
    }

    /// The action graph.
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// The action graph, mutably.
    pub fn actions_mut(&mut self) -> &mut ActionSet {
        &mut self.actions
    }

    /// Build and register one action.
    pub fn create(&mut self, line: ConfigLine) -> Result<ActionId> {
        let action = self.register.create(line, &self.actions, self.comm()?)?;
        self.actions.insert(action)
    }

    /// Run the construction pass over a whole input text.
    ///
    /// Every line becomes one action. The set is frozen afterwards and the
    /// graph is checked for cycles.
    pub fn read_input(&mut self, text: &str) -> Result<Vec<ActionId>> {
        let mut ids = Vec::new();
        for line in parse_input(text)? {
            let number = line.line_number();
            let id = self.create(line).inspect_err(|err| {
                tracing::debug!(line = number, %err, "failed to build action");
            })?;
            ids.push(id);
        }
        self.actions.freeze();
        self.actions.check_acyclic()?;
        tracing::info!(count = ids.len(), "input read");
        Ok(ids)
    }

    /// Open a new epoch at `step`.
    pub fn begin_step(&mut self, step: u64) {
        self.step = StepContext::new(step, self.config.time_step);
        self.actions.reset_active();
    }

    /// Activate an action for the current step.
    pub fn activate(&mut self, id: ActionId) -> Result<()> {
        self.actions.activate(id, &self.step)
    }

    /// Actions that ask to run at the current step.
    pub fn demanded(&self) -> Vec<ActionId> {
        self.actions
            .iter()
            .filter(|(_, action)| action.is_demanded(&self.step))
            .map(|(id, _)| id)
            .collect()
    }

    /// Calculate then update every active action, dependencies first.
    ///
    /// Returns the evaluation order.
    pub fn evaluate(&mut self) -> Result<Vec<ActionId>> {
        let order = self.actions.active_order()?;
        for &id in &order {
            let inputs = self.actions.inputs(id)?;
            let step = self.step;
            if let Some(action) = self.actions.get_mut(id) {
                action.calculate(&inputs, &step)?;
            }
        }
        for &id in &order {
            let step = self.step;
            if let Some(action) = self.actions.get_mut(id) {
                action.update(&step)?;
            }
        }
        Ok(order)
    }

    /// Run one full step: open the epoch, activate what is demanded and
    /// evaluate it.
    pub fn run_step(&mut self, step: u64) -> Result<Vec<ActionId>> {
        self.begin_step(step);
        for id in self.demanded() {
            self.activate(id)?;
        }
        let order = self.evaluate()?;
        tracing::debug!(step, active = order.len(), "step evaluated");
        Ok(order)
    }

    /// Flush every action's output files.
    pub fn flush(&mut self) -> Result<()> {
        self.actions.flush_all()
    }

    /// Close every file and drop every action.
    pub fn reset(&mut self) -> Result<()> {
        self.actions.clear()
    }
}
