//! Step Context
//!
//! Explicit driving-process state handed to actions during preparation and
//! evaluation. Actions never look up the current step or time through a
//! global; whatever they need arrives through a [`StepContext`].

use crate::error::{Error, Result};

/// The current simulation step as seen by actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    step: u64,
    time_step: f64,
}

impl StepContext {
    /// Create a context for `step` with the given integration time step.
    pub fn new(step: u64, time_step: f64) -> Self {
        Self { step, time_step }
    }

    /// The current step number.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// The simulation time at the current step (`step * time_step`).
    pub fn time(&self) -> f64 {
        self.time_step * self.step as f64
    }

    /// The integration time step.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new(0, 1.0)
    }
}

/// Position of this process among the cooperating processes of a run.
///
/// Only the designated writer (rank 0) produces real output files; every
/// other rank writes into a discard sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Communicator {
    rank: usize,
    size: usize,
}

impl Communicator {
    /// A communicator for `rank` out of `size` processes.
    ///
    /// `size` 0 is read as a single process.
    pub fn new(rank: usize, size: usize) -> Result<Self> {
        let size = size.max(1);
        if rank >= size {
            return Err(Error::InvalidConfig(format!(
                "rank {rank} out of range for size {size}"
            )));
        }
        Ok(Self { rank, size })
    }

    /// A single-process run.
    pub fn serial() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// This process's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of cooperating processes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this process performs real writes for shared output.
    pub fn is_designated_writer(&self) -> bool {
        self.rank == 0
    }
}

impl Default for Communicator {
    fn default() -> Self {
        Self::serial()
    }
}
