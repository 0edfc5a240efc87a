//! Errors raised while building a machine or emitting artifacts.
//!
//! Everything is detected eagerly: a machine either validates completely or
//! not at all, and no artifact is written for a run that fails.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `rtl-automata`.
#[derive(Debug, Error)]
pub enum Error {
    /// The document does not have the expected shape.
    #[error("malformed machine description: {0}")]
    StructuralInput(String),

    /// A transition or output clause does not match any recognized shape.
    #[error("state `{state}`: {message} in clause `{clause}`")]
    Grammar {
        state: String,
        clause: String,
        message: String,
    },

    /// A state, output or output index referenced by name does not exist.
    #[error("{0}")]
    Reference(String),

    /// Two states resolved to the same encoding value.
    #[error("states `{first}` and `{second}` share encoding {value}")]
    EncodingConflict {
        first: String,
        second: String,
        value: u64,
    },

    /// The chosen scheme cannot represent this many states.
    #[error("{scheme} encoding cannot represent {states} states")]
    EncodingOverflow { scheme: String, states: usize },

    /// A global model invariant does not hold.
    #[error("machine `{machine}`: {message}")]
    Invariant { machine: String, message: String },

    /// An artifact destination could not be written.
    #[error("cannot write `{}`: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralInput(msg.into())
    }

    pub(crate) fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    pub(crate) fn grammar(state: &str, clause: &str, message: impl Into<String>) -> Self {
        Self::Grammar {
            state: state.to_owned(),
            clause: clause.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
