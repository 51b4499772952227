//! `SELECT`: forward one argument, chosen from the current step.
//!
//! The chosen argument is the only dependency, so the action rewires its own
//! edges in [`Action::prepare`] at every epoch. Arguments that are not chosen
//! are not activated.

use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::graph::{Action, ActionCore, ActionId, ActionOptions, Inputs, PrepareContext};

pub(super) const DOCUMENTATION: &str = "SELECT ARG=<labels> [STRIDE=<n>]: forwards \
     ARG[(step / STRIDE) % count], depending only on the chosen argument";

/// Forwards the value of one argument, picked again at every preparation.
#[derive(Debug)]
pub struct Select {
    core: ActionCore,
    arguments: Vec<(String, ActionId)>,
    stride: u64,
    chosen: usize,
    value: Option<f64>,
}

impl Select {
    /// Build from `SELECT ARG=a,b,... [STRIDE=n]`.
    pub fn create(mut options: ActionOptions<'_>) -> Result<Box<dyn Action>> {
        let mut core = ActionCore::new(&mut options)?;
        let labels = core.parse_list("ARG")?;
        let stride: u64 = core.parse_or("STRIDE", 1)?;
        if labels.is_empty() || stride == 0 {
            return Err(Error::BadArguments {
                label: core.label().to_string(),
                message: "SELECT needs at least one argument and a positive STRIDE".into(),
            });
        }

        let mut arguments = Vec::with_capacity(labels.len());
        for target in labels {
            let id = options.find(&target).ok_or_else(|| Error::UnknownLabel {
                label: core.label().to_string(),
                target: target.clone(),
            })?;
            arguments.push((target, id));
        }
        core.require(arguments[0].1)?;
        tracing::info!(label = %core.label(), count = arguments.len(), stride, "  selecting among arguments");
        core.check_read()?;

        Ok(Box::new(Self {
            core,
            arguments,
            stride,
            chosen: 0,
            value: None,
        }))
    }

    /// Label of the argument chosen at the last preparation.
    pub fn chosen(&self) -> &str {
        &self.arguments[self.chosen].0
    }
}

impl Action for Select {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn prepare(&mut self, cx: &mut PrepareContext<'_>) -> Result<()> {
        let count = self.arguments.len() as u64;
        self.chosen = ((cx.step() / self.stride) % count) as usize;
        cx.clear_dependencies();
        cx.add_dependency(self.arguments[self.chosen].1);
        Ok(())
    }

    fn calculate(&mut self, inputs: &Inputs, _step: &StepContext) -> Result<()> {
        self.value = inputs.get(self.chosen());
        Ok(())
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::testing::add;
    use crate::context::StepContext;
    use crate::graph::ActionSet;

    #[test]
    fn depends_on_first_argument_after_construction() {
        let mut set = ActionSet::new();
        let a = add(&mut set, "CONSTANT VALUE=1 LABEL=a").unwrap();
        let b = add(&mut set, "CONSTANT VALUE=2 LABEL=b").unwrap();
        let s = add(&mut set, "SELECT ARG=a,b").unwrap();

        let deps: Vec<_> = set.core(s).unwrap().dependencies().iter().copied().collect();
        assert_eq!(deps, vec![a]);
        assert!(set.core(b).unwrap().dependents().is_empty());
    }

    #[test]
    fn choice_follows_the_step() {
        let mut set = ActionSet::new();
        let a = add(&mut set, "CONSTANT VALUE=1 LABEL=a").unwrap();
        let b = add(&mut set, "CONSTANT VALUE=2 LABEL=b").unwrap();
        let s = add(&mut set, "SELECT ARG=a,b STRIDE=2").unwrap();

        for (step, expected, other) in [(0, a, b), (2, b, a), (3, b, a), (4, a, b)] {
            set.reset_active();
            set.activate(s, &StepContext::new(step, 1.0)).unwrap();
            assert!(set.core(expected).unwrap().is_active(), "step {step}");
            assert!(!set.core(other).unwrap().is_active(), "step {step}");
            assert!(set.is_consistent());
        }
    }
}
