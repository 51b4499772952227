//! Action Graph
//!
//! This module implements the dependency graph between actions and the
//! per-step activation that decides which of them run.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are actions, owned by an [`ActionSet`] arena in creation order
//! - Edges are dependencies: if A needs B's output, A depends on B
//!
//! Each action keeps both directions of its edges (what it depends on and
//! what depends on it) as [`ActionId`] indices into the arena. The set is
//! the only place that changes edges, and it always changes both ends.
//!
//! # Design Decisions
//!
//! 1. Edges are indices, not references, so the arena alone owns actions and
//!    there is no ownership cycle between mutually linked nodes.
//!
//! 2. Activation is lazy and demand driven: only actions reachable from
//!    something demanded at the current step are activated.
//!
//! 3. The active flag is reset by the driving process, never by the graph,
//!    so the epoch boundary is explicit.

mod action;
mod node;
mod scheduler;
mod set;

pub use action::{Action, ActionOptions, Input, Inputs};
pub use node::{ActionCore, ActionId, UNDOCUMENTED};
pub use scheduler::PrepareContext;
pub use set::ActionSet;
