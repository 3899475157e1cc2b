//! Script definition
//!
//! A Script is a named sequence of actions that can be called as a service.
//! The compiler emits one script per guarded writer.

use hassl_automation::ExecutionMode;
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Script configuration as written to YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Script alias (human-readable name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Execution mode
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Maximum runs (for queued/parallel modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,

    /// Action sequence
    pub sequence: Vec<Action>,
}

impl ScriptConfig {
    /// Queued script bounded at `max` runs
    pub fn queued(alias: impl Into<String>, max: usize, sequence: Vec<Action>) -> Self {
        Self {
            alias: Some(alias.into()),
            mode: ExecutionMode::Queued,
            max: Some(max),
            sequence,
        }
    }
}
