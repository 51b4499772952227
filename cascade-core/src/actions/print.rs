//! `PRINT`: write arguments to a file.
//!
//! Printers are the demanded leaves of the graph: every `STRIDE` steps a
//! printer asks to run, which activates everything it prints. The file is
//! owned by the action and opened through its output registry, so only the
//! designated writer process produces it.

use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::graph::{Action, ActionCore, ActionId, ActionOptions, Inputs};
use crate::io::{FileHandle, FileMode};

pub(super) const DOCUMENTATION: &str = "PRINT ARG=<labels> FILE=<path> [STRIDE=<n>] [APPEND]: \
     writes time and arguments every STRIDE steps";

/// Periodic writer of argument values.
#[derive(Debug)]
pub struct Print {
    core: ActionCore,
    arguments: Vec<(String, ActionId)>,
    stride: u64,
    file: FileHandle,
    row: Vec<f64>,
}

impl Print {
    /// Build from `PRINT ARG=a,b FILE=path [STRIDE=n] [APPEND]`.
    pub fn create(mut options: ActionOptions<'_>) -> Result<Box<dyn Action>> {
        let mut core = ActionCore::new(&mut options)?;
        let arguments = core.parse_arguments("ARG", &options)?;
        let path: String = core.parse_required("FILE")?;
        let stride: u64 = core.parse_or("STRIDE", 1)?;
        let append = core.parse_flag("APPEND")?;
        core.check_read()?;

        if arguments.is_empty() || stride == 0 {
            return Err(Error::BadArguments {
                label: core.label().to_string(),
                message: "PRINT needs at least one argument and a positive STRIDE".into(),
            });
        }
        if path.is_empty() {
            return Err(Error::MissingKeyword {
                label: core.label().to_string(),
                keyword: "FILE".into(),
            });
        }

        let mode = if append { FileMode::Append } else { FileMode::Write };
        let file = core.open(&path, mode)?;
        tracing::info!(label = %core.label(), %path, stride, "  printing on file");

        let mut header = String::from("#! FIELDS time");
        for (label, _) in &arguments {
            header.push(' ');
            header.push_str(label);
        }
        header.push('\n');
        core.file(file)?.write_text(&header)?;

        Ok(Box::new(Self {
            core,
            arguments,
            stride,
            file,
            row: Vec::new(),
        }))
    }
}

impl Action for Print {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn is_demanded(&self, step: &StepContext) -> bool {
        step.step() % self.stride == 0
    }

    fn calculate(&mut self, inputs: &Inputs, _step: &StepContext) -> Result<()> {
        self.row.clear();
        for (label, _) in &self.arguments {
            let value = inputs.get(label).ok_or_else(|| Error::BadArguments {
                label: self.core.label().to_string(),
                message: format!("argument {label} has no value"),
            })?;
            self.row.push(value);
        }
        Ok(())
    }

    fn update(&mut self, step: &StepContext) -> Result<()> {
        let mut line = format!("{:.6}", step.time());
        for value in &self.row {
            line.push_str(&format!(" {value:.6}"));
        }
        line.push('\n');
        let file = self.file;
        self.core.file(file)?.write_text(&line)
    }
}
