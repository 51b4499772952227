//! Per-action output streams.

mod files;

pub use files::{FileHandle, FileMode, OutputFile, OutputFiles};
