//! Cascade Core
//!
//! This crate provides the core runtime for Cascade, a graph of derived
//! quantities ("actions") computed over simulation state. It implements:
//!
//! - Actions with error-checked configuration consumption
//! - An arena-owned dependency graph with symmetric, index-based edges
//! - Lazy per-step activation with a one-time preparation hook
//! - Per-action output files with single-writer suppression
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: actions, the action set and the activation scheduler
//! - `config`: input parsing, keyword consumption and engine settings
//! - `io`: output streams owned by actions
//! - `register`: kind name to constructor mapping
//! - `engine`: the driving process and its per-step contract
//! - `actions`: built-in action kinds
//!
//! # Example
//!
//! ```rust,ignore
//! use cascade_core::{ActionRegister, Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default(), ActionRegister::with_builtins()?);
//! engine.read_input(
//!     "x: CONSTANT VALUE=3
//!      y: CONSTANT VALUE=4
//!      n: NORM ARG=x,y
//!      PRINT ARG=n FILE=colvar STRIDE=10",
//! )?;
//!
//! for step in 0..100 {
//!     // Activates the printer every 10 steps, and with it x, y and n.
//!     engine.run_step(step)?;
//! }
//! engine.flush()?;
//! ```

pub mod actions;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod io;
pub mod register;

pub use config::{ConfigLine, EngineConfig};
pub use context::{Communicator, StepContext};
pub use engine::Engine;
pub use error::{report_fatal, Error, Result};
pub use graph::{Action, ActionCore, ActionId, ActionOptions, ActionSet, Inputs, PrepareContext};
pub use register::{ActionRegister, ActionRegisterBuilder};
