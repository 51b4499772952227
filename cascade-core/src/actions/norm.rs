//! `NORM`: length of the vector formed by the arguments.

use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::graph::{Action, ActionCore, ActionId, ActionOptions, Inputs};

pub(super) const DOCUMENTATION: &str =
    "NORM ARG=<labels>: Euclidean norm of the vector whose components are the arguments";

/// Euclidean norm of the argument values.
#[derive(Debug)]
pub struct Norm {
    core: ActionCore,
    arguments: Vec<(String, ActionId)>,
    value: Option<f64>,
}

impl Norm {
    /// Build from `NORM ARG=a,b,...`.
    pub fn create(mut options: ActionOptions<'_>) -> Result<Box<dyn Action>> {
        let mut core = ActionCore::new(&mut options)?;
        let arguments = core.parse_arguments("ARG", &options)?;
        if arguments.is_empty() {
            return Err(Error::BadArguments {
                label: core.label().to_string(),
                message: "NORM needs at least one argument".into(),
            });
        }
        core.check_read()?;
        Ok(Box::new(Self {
            core,
            arguments,
            value: None,
        }))
    }
}

impl Action for Norm {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn calculate(&mut self, inputs: &Inputs, _step: &StepContext) -> Result<()> {
        let mut sum = 0.0;
        for (label, _) in &self.arguments {
            let component = inputs.get(label).ok_or_else(|| Error::BadArguments {
                label: self.core.label().to_string(),
                message: format!("argument {label} has no value"),
            })?;
            sum += component * component;
        }
        self.value = Some(sum.sqrt());
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
    use crate::error::Error;
    use crate::graph::ActionSet;

    #[test]
    fn norm_of_arguments() {
        let mut set = ActionSet::new();
        add(&mut set, "CONSTANT VALUE=3 LABEL=x").unwrap();
        add(&mut set, "CONSTANT VALUE=4 LABEL=y").unwrap();
        let n = add(&mut set, "NORM ARG=x,y").unwrap();

        let inputs = set.inputs(n).unwrap();
        set.get_mut(n).unwrap().calculate(&inputs, &StepContext::default()).unwrap();
        assert_eq!(set.get(n).unwrap().value(), Some(5.0));
    }

    #[test]
    fn unknown_argument_label() {
        let mut set = ActionSet::new();
        let err = add(&mut set, "NORM ARG=missing").unwrap_err();
        assert!(matches!(err, Error::UnknownLabel { ref target, .. } if target == "missing"));
    }

    #[test]
    fn arguments_are_required() {
        let mut set = ActionSet::new();
        assert!(matches!(
            add(&mut set, "NORM"),
            Err(Error::BadArguments { .. })
        ));
    }
}
