//! Graph Nodes
//!
//! This module defines the state every action carries in the dependency
//! graph: identity (name and label), the configuration tokens still to be
//! consumed, the activation flag, the two adjacency sets and the output
//! streams it owns.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexSet;

use crate::config::{split_list, ConfigLine};
use crate::context::Communicator;
use crate::error::{Error, Result};
use crate::io::{FileHandle, FileMode, OutputFile, OutputFiles};

use super::action::ActionOptions;

/// Documentation reported for kinds registered without any.
pub const UNDOCUMENTED: &str = "UNDOCUMENTED ACTION";

/// Index of an action in its [`ActionSet`](super::ActionSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

impl ActionId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for ActionId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State shared by every action.
#[derive(Debug)]
pub struct ActionCore {
    /// The action kind, taken from the first configuration token.
    name: String,

    /// Unique key in the action set.
    label: String,

    /// Configuration tokens not consumed yet.
    line: ConfigLine,

    /// Whether the action was activated in the current step.
    active: bool,

    /// Requests may only change while this is false.
    requests_locked: bool,

    /// Actions this action depends on.
    dependencies: IndexSet<ActionId>,

    /// Actions that depend on this action.
    dependents: IndexSet<ActionId>,

    /// Streams opened by this action.
    files: OutputFiles,

    comm: Communicator,

    documentation: &'static str,
}

impl ActionCore {
    /// Build the shared state from an action line.
    ///
    /// Consumes the kind name and the `LABEL` keyword. Without an explicit
    /// label the action is called `@<n>`, `n` being the number of actions
    /// already registered. A label that is already taken is a structural
    /// error.
    pub fn new(options: &mut ActionOptions<'_>) -> Result<Self> {
        let mut line = options.take_line();
        let name = line.take_first().ok_or(Error::EmptyLine)?;
        tracing::info!(action = %name, "Action {name}");

        let label = match line.take_value("LABEL") {
            Some(label) if !label.is_empty() => label,
            _ => format!("@{}", options.actions().len()),
        };
        if options.actions().find_by_label(&label).is_some() {
            return Err(Error::DuplicateLabel(label));
        }
        tracing::info!(action = %name, %label, "  with label {label}");

        Ok(Self {
            name,
            label,
            line,
            active: false,
            requests_locked: false,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            files: OutputFiles::new(),
            comm: options.comm(),
            documentation: options.documentation(),
        })
    }

    /// The action kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unique label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Documentation of the action kind.
    pub fn documentation(&self) -> &'static str {
        self.documentation
    }

    /// The communicator this action was built with.
    pub fn comm(&self) -> &Communicator {
        &self.comm
    }

    /// Configuration tokens not consumed yet.
    pub fn remaining(&self) -> &ConfigLine {
        &self.line
    }

    /// Whether the action was activated in the current step.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Actions this action depends on, in insertion order.
    pub fn dependencies(&self) -> &IndexSet<ActionId> {
        &self.dependencies
    }

    /// Actions that depend on this action.
    pub fn dependents(&self) -> &IndexSet<ActionId> {
        &self.dependents
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut IndexSet<ActionId> {
        &mut self.dependencies
    }

    pub(crate) fn dependents_mut(&mut self) -> &mut IndexSet<ActionId> {
        &mut self.dependents
    }

    // ------------------------------------------------------------------
    // Keyword parsing
    // ------------------------------------------------------------------

    /// Consume `KEY=VALUE` and parse the value.
    pub fn parse<T: FromStr>(&mut self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.line.take_value(key) else {
            return Ok(None);
        };
        value.parse().map(Some).map_err(|_| Error::InvalidValue {
            label: self.label.clone(),
            keyword: key.to_string(),
            value,
        })
    }

    /// Like [`parse`](Self::parse), falling back to `default`.
    pub fn parse_or<T: FromStr>(&mut self, key: &str, default: T) -> Result<T> {
        Ok(self.parse(key)?.unwrap_or(default))
    }

    /// Like [`parse`](Self::parse), failing when the keyword is absent.
    pub fn parse_required<T: FromStr>(&mut self, key: &str) -> Result<T> {
        self.parse(key)?.ok_or_else(|| Error::MissingKeyword {
            label: self.label.clone(),
            keyword: key.to_string(),
        })
    }

    /// Consume a comma separated list; absent keywords give an empty list.
    pub fn parse_list(&mut self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .line
            .take_value(key)
            .map(|value| split_list(&value))
            .unwrap_or_default())
    }

    /// Consume a bare switch keyword.
    ///
    /// A switch given with a value is reported together with the kind's
    /// documentation.
    pub fn parse_flag(&mut self, key: &str) -> Result<bool> {
        self.line.take_flag(key).map_err(|_| Error::MalformedFlag {
            label: self.label.clone(),
            keyword: key.to_string(),
            documentation: self.documentation.to_string(),
        })
    }

    /// Consume a list of labels and declare a dependency on each of them.
    ///
    /// Returns the resolved ids in the order they were written.
    pub fn parse_arguments(
        &mut self,
        key: &str,
        options: &ActionOptions<'_>,
    ) -> Result<Vec<(String, ActionId)>> {
        let labels = self.parse_list(key)?;
        let mut arguments = Vec::with_capacity(labels.len());
        for target in labels {
            let id = options
                .find(&target)
                .ok_or_else(|| Error::UnknownLabel {
                    label: self.label.clone(),
                    target: target.clone(),
                })?;
            self.require(id)?;
            arguments.push((target, id));
        }
        Ok(arguments)
    }

    /// Fail if any configuration token was left unconsumed.
    pub fn check_read(&mut self) -> Result<()> {
        if self.line.is_empty() {
            return Ok(());
        }
        Err(Error::UnreadTokens {
            label: self.label.clone(),
            words: self.line.drain(),
        })
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Declare a dependency while the action is being built.
    ///
    /// The action has no id yet, so only this side of the edge is recorded;
    /// the action set adds the reverse edge when the action is inserted.
    pub fn require(&mut self, id: ActionId) -> Result<()> {
        self.ensure_requests_unlocked()?;
        self.dependencies.insert(id);
        Ok(())
    }

    /// Whether requests are currently locked.
    pub fn requests_locked(&self) -> bool {
        self.requests_locked
    }

    /// Allow the action to change what it requests.
    pub fn unlock_requests(&mut self) {
        self.requests_locked = false;
    }

    /// Forbid the action from changing what it requests.
    pub fn lock_requests(&mut self) {
        self.requests_locked = true;
    }

    /// Fail with [`Error::RequestsLocked`] outside of construction and
    /// preparation.
    pub fn ensure_requests_unlocked(&self) -> Result<()> {
        if self.requests_locked {
            Err(Error::RequestsLocked(self.label.clone()))
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Output files
    // ------------------------------------------------------------------

    /// Open an output stream owned by this action.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: FileMode) -> Result<FileHandle> {
        let handle = self.files.open(path, mode, &self.comm)?;
        tracing::debug!(label = %self.label, %handle, "opened output file");
        Ok(handle)
    }

    /// An open stream of this action.
    pub fn file(&mut self, handle: FileHandle) -> Result<&mut OutputFile> {
        self.files.get_mut(handle)
    }

    /// Close one of this action's streams.
    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        self.files.close(handle)
    }

    /// Flush every stream this action owns.
    pub fn flush_all(&mut self) -> Result<()> {
        self.files.flush_all()
    }

    /// The streams this action owns.
    pub fn files(&self) -> &OutputFiles {
        &self.files
    }

    pub(crate) fn close_all(&mut self) -> Result<()> {
        self.files.close_all()
    }
}
