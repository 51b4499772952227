//! Errors
//!
//! Every fatal condition in the action graph is an [`Error`] value. Nothing in
//! this crate terminates the process: errors propagate with `?` up to the
//! single boundary that owns the process (see [`report_fatal`]), which logs
//! the diagnostic and decides the exit code.
//!
//! Errors fall into two classes:
//!
//! - Configuration errors are caller mistakes in the static input. They map
//!   to exit code 1.
//! - Structural errors mean the graph itself is inconsistent (duplicate
//!   labels, inserting after the construction pass, cycles). They map to
//!   exit code 2.

use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for configuration errors.
pub const EXIT_CONFIGURATION: i32 = 1;

/// Exit code for internal-consistency faults.
pub const EXIT_STRUCTURAL: i32 = 2;

/// Errors raised while building or running the action graph.
#[derive(Debug, Error)]
pub enum Error {
    // ------------------------------------------------------------------
    // Configuration errors
    // ------------------------------------------------------------------
    #[error("empty action line")]
    EmptyLine,

    #[error("action {label}: ERROR parsing keyword {keyword}\n{documentation}")]
    MalformedFlag {
        label: String,
        keyword: String,
        documentation: String,
    },

    #[error(
        "action {label}: ERROR READING INPUT FILE\nI CANNOT UNDERSTAND THE FOLLOWING WORDS:\n{}\nSTOP!!",
        .words.iter().map(|w| format!("  {w}")).collect::<Vec<_>>().join("\n")
    )]
    UnreadTokens { label: String, words: Vec<String> },

    #[error("action {label}: cannot parse value {value:?} for keyword {keyword}")]
    InvalidValue {
        label: String,
        keyword: String,
        value: String,
    },

    #[error("action {label}: missing required keyword {keyword}")]
    MissingKeyword { label: String, keyword: String },

    #[error("action {label}: {message}")]
    BadArguments { label: String, message: String },

    #[error("unknown action kind {0}")]
    UnknownKind(String),

    #[error("action {label}: cannot find action labelled {target}")]
    UnknownLabel { label: String, target: String },

    #[error("unbalanced braces in input line {line}")]
    UnbalancedBraces { line: usize },

    #[error("invalid file mode {0:?}")]
    InvalidMode(String),

    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine configuration: {0}")]
    EngineConfig(#[from] serde_json::Error),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    // ------------------------------------------------------------------
    // Structural errors
    // ------------------------------------------------------------------
    #[error("label {0} is already in use")]
    DuplicateLabel(String),

    #[error("action kind {0} registered twice")]
    DuplicateKind(String),

    #[error("action set is frozen, cannot insert {0}")]
    RegistryFrozen(String),

    #[error("no action with id {0}")]
    UnknownAction(usize),

    #[error("action {0} changed its requests outside of preparation")]
    RequestsLocked(String),

    #[error("dependency cycle between actions: {}", .labels.join(", "))]
    CycleDetected { labels: Vec<String> },

    #[error("file handle {0} is not open")]
    UnknownHandle(u64),
}

impl Error {
    /// Whether this error was caused by the user's configuration.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Error::DuplicateLabel(_)
                | Error::DuplicateKind(_)
                | Error::RegistryFrozen(_)
                | Error::UnknownAction(_)
                | Error::RequestsLocked(_)
                | Error::CycleDetected { .. }
                | Error::UnknownHandle(_)
        )
    }

    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            EXIT_CONFIGURATION
        } else {
            EXIT_STRUCTURAL
        }
    }
}

/// Log a fatal error and return the exit code the process should use.
///
/// This is the only place that turns an [`Error`] into a termination
/// decision. Binaries call it once at the top level:
///
/// ```rust,ignore
/// if let Err(err) = engine.read_input(&text) {
///     std::process::exit(cascade_core::report_fatal(&err));
/// }
/// ```
pub fn report_fatal(err: &Error) -> i32 {
    let code = err.exit_code();
    if err.is_configuration() {
        tracing::error!(code, "{err}");
    } else {
        tracing::error!(code, "internal consistency fault: {err}");
    }
    code
}
