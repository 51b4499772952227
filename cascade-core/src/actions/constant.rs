//! `CONSTANT`: a value that never changes.

use crate::error::Result;
use crate::graph::{Action, ActionCore, ActionOptions};

pub(super) const DOCUMENTATION: &str = "CONSTANT VALUE=<number>: a fixed scalar value";

/// A source action holding a fixed value.
#[derive(Debug)]
pub struct Constant {
    core: ActionCore,
    value: f64,
}

impl Constant {
    /// Build from `CONSTANT VALUE=<number>`.
    pub fn create(mut options: ActionOptions<'_>) -> Result<Box<dyn Action>> {
        let mut core = ActionCore::new(&mut options)?;
        let value: f64 = core.parse_required("VALUE")?;
        tracing::info!(label = %core.label(), value, "  constant value");
        core.check_read()?;
        Ok(Box::new(Self { core, value }))
    }
}

impl Action for Constant {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn value(&self) -> Option<f64> {
        Some(self.value)
    }
}
