//! Debate data exchanged with the web backend.

use serde::{Deserialize, Serialize};

/// A debate flagged as hot by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Debate {
    pub debate_id: u64,
    pub title: String,
}

/// Result of a hot-debate recomputation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebateSet {
    #[serde(default)]
    pub debates: Vec<Debate>,
}

impl DebateSet {
    pub fn len(&self) -> usize {
        self.debates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debates.is_empty()
    }
}
