//! Built-in Actions
//!
//! A handful of small action kinds that plug into the graph the same way any
//! externally written kind would:
//!
//! - `CONSTANT`: a source value
//! - `NORM`: Euclidean norm of its arguments
//! - `SELECT`: forwards one of its arguments, chosen anew every epoch
//! - `PRINT`: writes its arguments to a file every `STRIDE` steps

mod constant;
mod norm;
mod print;
mod select;

pub use constant::Constant;
pub use norm::Norm;
pub use print::Print;
pub use select::Select;

use crate::error::Result;
use crate::register::ActionRegisterBuilder;

/// Add every built-in kind to `builder`.
pub fn register_builtins(builder: ActionRegisterBuilder) -> Result<ActionRegisterBuilder> {
    builder
        .register("CONSTANT", constant::DOCUMENTATION, Constant::create)?
        .register("NORM", norm::DOCUMENTATION, Norm::create)?
        .register("SELECT", select::DOCUMENTATION, Select::create)?
        .register("PRINT", print::DOCUMENTATION, Print::create)
}
