//! Action Register
//!
//! Maps action kind names to the constructors that build them. A register is
//! populated once through an [`ActionRegisterBuilder`] before any input is
//! read and is read-only afterwards.

use indexmap::IndexMap;

use crate::config::ConfigLine;
use crate::context::Communicator;
use crate::error::{Error, Result};
use crate::graph::{Action, ActionOptions, ActionSet};

/// Constructor of one action kind.
pub type ActionFactory = fn(ActionOptions<'_>) -> Result<Box<dyn Action>>;

/// A registered kind.
#[derive(Debug, Clone, Copy)]
pub struct ActionKind {
    factory: ActionFactory,
    documentation: &'static str,
}

impl ActionKind {
    /// Documentation of the kind.
    pub fn documentation(&self) -> &'static str {
        self.documentation
    }
}

/// Read-only mapping from kind names to constructors.
#[derive(Debug, Clone, Default)]
pub struct ActionRegister {
    kinds: IndexMap<String, ActionKind>,
}

impl ActionRegister {
    /// Start populating a register.
    pub fn builder() -> ActionRegisterBuilder {
        ActionRegisterBuilder::default()
    }

    /// A register with every built-in kind.
    pub fn with_builtins() -> Result<Self> {
        Ok(crate::actions::register_builtins(Self::builder())?.build())
    }

    /// Look up a kind.
    pub fn get(&self, name: &str) -> Result<&ActionKind> {
        self.kinds
            .get(name)
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Build the action described by `line`.
    ///
    /// A frozen set is refused before the constructor runs, so a kind that
    /// opens files while being built never touches them.
    pub fn create(
        &self,
        line: ConfigLine,
        actions: &ActionSet,
        comm: Communicator,
    ) -> Result<Box<dyn Action>> {
        let name = line.kind().ok_or(Error::EmptyLine)?;
        if actions.is_frozen() {
            return Err(Error::RegistryFrozen(name.to_string()));
        }
        let kind = self.get(name)?;
        let options = ActionOptions::new(line, actions)
            .with_comm(comm)
            .with_documentation(kind.documentation);
        (kind.factory)(options)
    }
}

/// Collects kinds before they are frozen into an [`ActionRegister`].
#[derive(Debug, Default)]
pub struct ActionRegisterBuilder {
    kinds: IndexMap<String, ActionKind>,
}

impl ActionRegisterBuilder {
    /// Register a kind. Registering the same name twice is an error.
    pub fn register(
        mut self,
        name: &str,
        documentation: &'static str,
        factory: ActionFactory,
    ) -> Result<Self> {
        if self.kinds.contains_key(name) {
            return Err(Error::DuplicateKind(name.to_string()));
        }
        self.kinds.insert(
            name.to_string(),
            ActionKind {
                factory,
                documentation,
            },
        );
        Ok(self)
    }

    /// Freeze the collected kinds.
    pub fn build(self) -> ActionRegister {
        ActionRegister { kinds: self.kinds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ActionCore;

    #[derive(Debug)]
    struct Dummy {
        core: ActionCore,
    }

    impl Action for Dummy {
        fn core(&self) -> &ActionCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ActionCore {
            &mut self.core
        }
    }

    fn dummy(mut options: ActionOptions<'_>) -> Result<Box<dyn Action>> {
        let mut core = ActionCore::new(&mut options)?;
        core.check_read()?;
        Ok(Box::new(Dummy { core }))
    }

    #[test]
    fn creates_registered_kinds() {
        let register = ActionRegister::builder()
            .register("DUMMY", "does nothing", dummy)
            .unwrap()
            .build();
        let set = ActionSet::new();
        let action = register
            .create(ConfigLine::new(["DUMMY", "LABEL=d"]), &set, Communicator::serial())
            .unwrap();
        assert_eq!(action.core().label(), "d");
        assert_eq!(action.documentation(), "does nothing");
    }

    #[test]
    fn unknown_kinds_are_configuration_errors() {
        let register = ActionRegister::builder().build();
        let set = ActionSet::new();
        let err = register
            .create(ConfigLine::new(["NOPE"]), &set, Communicator::serial())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownKind(ref k) if k == "NOPE"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn frozen_set_is_refused_before_construction() {
        fn never(_: ActionOptions<'_>) -> Result<Box<dyn Action>> {
            panic!("constructor must not run on a frozen set");
        }
        let register = ActionRegister::builder()
            .register("NEVER", "", never)
            .unwrap()
            .build();
        let mut set = ActionSet::new();
        set.freeze();
        let err = register
            .create(ConfigLine::new(["NEVER"]), &set, Communicator::serial())
            .unwrap_err();
        assert!(matches!(err, Error::RegistryFrozen(ref k) if k == "NEVER"));
    }

    #[test]
    fn duplicate_kinds_are_refused() {
        let err = ActionRegister::builder()
            .register("DUMMY", "", dummy)
            .and_then(|b| b.register("DUMMY", "", dummy))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKind(_)));
    }

    #[test]
    fn builtins_are_available() {
        let register = ActionRegister::with_builtins().unwrap();
        for name in ["CONSTANT", "NORM", "SELECT", "PRINT"] {
            assert!(register.contains(name), "{name} missing");
        }
    }
}
