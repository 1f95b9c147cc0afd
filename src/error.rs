//! Typed errors for the repository adapter and the file parsers
//!
//! Application plumbing uses `anyhow`; these enums exist where callers need
//! to tell failure classes apart (configuration vs. tool failures, parse
//! failures that skip one artifact).

use std::path::PathBuf;

/// Errors raised by the repository adapter
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    /// The repository record cannot describe a checkout at all.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external tool exited non-zero. Carries the last line of its output.
    #[error("{program} failed: {message}")]
    Tool { program: String, message: String },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("could not lock checkout {0}")]
    Locked(PathBuf),

    /// One revision's output could not be understood; the rest of the
    /// history is still readable.
    #[error("unparseable revision {0}")]
    Unparseable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScmError {
    pub fn config(msg: impl Into<String>) -> Self {
        ScmError::Config(msg.into())
    }

    /// Skipping past this error would leave a hole in the imported history
    pub fn interrupts_history(&self) -> bool {
        !matches!(self, ScmError::Unparseable(_))
    }

    /// Message suitable for the branch `error` field
    pub fn branch_message(&self) -> String {
        match self {
            ScmError::Tool { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by the file-format extractors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("variable substitution cycle through {0}")]
    Cycle(String),

    #[error("variable substitution exceeded depth {0}")]
    TooDeep(usize),

    #[error("duplicate key {key} in group {group}")]
    DuplicateKey { group: String, key: String },

    #[error("malformed line {line}: {text}")]
    Malformed { line: usize, text: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
