//! Configuration
//!
//! Everything an action is built from: the raw input text, the per-action
//! token lines, and the engine-wide settings.

mod engine;
mod input;
mod line;

pub use engine::EngineConfig;
pub use input::parse_input;
pub use line::{split_list, ConfigLine, Malformed};
