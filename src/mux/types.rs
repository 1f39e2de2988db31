// Data types for Mux module
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// One fragment of output belonging to one logical stream.
///
/// `data` is whatever a single write carried; it need not be a whole line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Logical stream name, e.g. "build-stdout" or "run-stderr"
    pub tag: String,
    /// Raw fragment text
    pub data: String,
}

impl Message {
    pub fn new(tag: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            data: data.into(),
        }
    }
}
