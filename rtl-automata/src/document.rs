//! The machine description as it arrives from the outside world.
//!
//! ```yaml
//! name: handshake
//! reset: { asynchronous: true, active_low: false }
//! inputs:
//!   - go: { width: 1 }
//! outputs:
//!   - busy: { width: 1, reg: false }
//! encoding: onehot
//! transitions:
//!   - IDLE: ["(go==1), RUN"]
//!   - RUN: ["<busy=1'b1>", "(go==0), IDLE"]
//! initial_state: IDLE
//! ```
//!
//! Nothing here is validated beyond its shape; [`crate::Machine::from_document`]
//! does the real work.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::encoding::EncodingScheme;
use crate::error::{Error, Result};

/// Top-level document.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineDocument {
    pub name: String,
    #[serde(default)]
    pub reset: ResetDocument,
    #[serde(default)]
    pub inputs: Vec<IndexMap<String, PortDocument>>,
    #[serde(default)]
    pub outputs: Vec<IndexMap<String, PortDocument>>,
    #[serde(default)]
    pub encoding: EncodingScheme,
    /// One single-key mapping per state, `state -> [clause, ...]`.
    pub transitions: Vec<IndexMap<String, Option<Vec<String>>>>,
    pub initial_state: String,
}

/// Reset behaviour.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResetDocument {
    #[serde(default = "default_true")]
    pub asynchronous: bool,
    #[serde(default)]
    pub active_low: bool,
}

impl Default for ResetDocument {
    fn default() -> Self {
        Self {
            asynchronous: true,
            active_low: false,
        }
    }
}

/// Port attributes. `reg` is only meaningful for outputs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PortDocument {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default)]
    pub reg: bool,
}

fn default_true() -> bool {
    true
}

fn default_width() -> usize {
    1
}

impl MachineDocument {
    /// Parse a YAML machine description.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::structural(e.to_string()))
    }
}

/// Unwraps a list entry that must be a mapping with exactly one key.
pub(crate) fn single_entry<'a, V>(
    entry: &'a IndexMap<String, V>,
    section: &str,
) -> Result<(&'a String, &'a V)> {
    match entry.first() {
        Some(kv) if entry.len() == 1 => Ok(kv),
        _ => Err(Error::structural(format!(
            "every `{section}` entry must map exactly one name, found {} keys",
            entry.len()
        ))),
    }
}
