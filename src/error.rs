//! Parse error shared by the named enums accepted on the command line and in
//! stored configuration

use thiserror::Error;

/// A name that matches none of an enum's spellings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownNameError {
    /// What was being named, e.g. `"setting"`
    pub kind: &'static str,
    pub value: String,
}

impl UnknownNameError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
