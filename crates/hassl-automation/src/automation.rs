//! Automation documents
//!
//! An automation ties together triggers, conditions, and actions. The
//! action type is generic so this crate stays independent of the script
//! action model; it defaults to raw JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::condition::Condition;
use crate::trigger::Trigger;

/// Automation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AutomationError {
    #[error("Invalid automation configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Execution mode for automations and scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Ignore new triggers while running
    #[default]
    Single,

    /// Restart from beginning on new trigger
    Restart,

    /// Queue triggers (up to `max`)
    Queued,

    /// Run all simultaneously (up to `max`)
    Parallel,
}

impl ExecutionMode {
    /// Whether `max` is meaningful for this mode
    pub fn takes_max(&self) -> bool {
        matches!(self, ExecutionMode::Queued | ExecutionMode::Parallel)
    }
}

/// Automation configuration as written to YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de>"))]
pub struct AutomationConfig<A = serde_json::Value> {
    /// Unique ID, also used to derive the entity id
    pub id: String,

    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Execution mode
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Maximum number of runs (for queued/parallel modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,

    /// Triggers that start the automation
    #[serde(default, alias = "trigger")]
    pub triggers: Vec<Trigger>,

    /// Conditions that must be met
    #[serde(default, alias = "condition", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Actions to execute
    #[serde(default, alias = "action")]
    pub actions: Vec<A>,
}

impl<A> AutomationConfig<A> {
    /// Empty automation with `id` as both id and alias
    pub fn new(id: impl Into<String>, mode: ExecutionMode) -> Self {
        let id = id.into();
        Self {
            alias: Some(id.clone()),
            id,
            description: None,
            mode,
            max: None,
            triggers: Vec::new(),
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.triggers.push(trigger.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Check the structural requirements Home Assistant enforces on load
    pub fn validate(&self) -> AutomationResult<()> {
        if self.id.trim().is_empty() {
            return Err(AutomationError::InvalidConfig(
                "automation id must not be empty".to_string(),
            ));
        }
        if self.triggers.is_empty() {
            return Err(AutomationError::InvalidConfig(format!(
                "automation '{}' has no triggers",
                self.id
            )));
        }
        if self.max.is_some() && !self.mode.takes_max() {
            return Err(AutomationError::InvalidConfig(format!(
                "automation '{}' sets max in {:?} mode",
                self.id, self.mode
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_queued() {
        let config: AutomationConfig = AutomationConfig::new(
            "hassl_sync__home__k__onoff__downstream",
            ExecutionMode::Queued,
        )
        .with_max(10)
        .trigger(Trigger::state("input_boolean.proxy"))
        .action(json!({"service": "light.turn_on"}));

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "id": "hassl_sync__home__k__onoff__downstream",
                "alias": "hassl_sync__home__k__onoff__downstream",
                "mode": "queued",
                "max": 10,
                "triggers": [{"trigger": "state", "entity_id": "input_boolean.proxy"}],
                "actions": [{"service": "light.turn_on"}]
            })
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_legacy_keys() {
        let config: AutomationConfig = serde_json::from_value(json!({
            "id": "a1",
            "trigger": [{"trigger": "homeassistant", "event": "start"}],
            "condition": [{"condition": "trigger", "id": "x"}],
            "action": []
        }))
        .unwrap();
        assert_eq!(config.mode, ExecutionMode::Single);
        assert_eq!(config.triggers.len(), 1);
        assert_eq!(config.conditions.len(), 1);
    }

    #[test]
    fn test_validate() {
        let config: AutomationConfig = AutomationConfig::new("a", ExecutionMode::Restart);
        assert!(matches!(
            config.validate(),
            Err(AutomationError::InvalidConfig(msg)) if msg.contains("no triggers")
        ));

        let config: AutomationConfig = AutomationConfig::new("a", ExecutionMode::Restart)
            .with_max(3)
            .trigger(Trigger::state("light.a"));
        assert!(config.validate().is_err());

        let config: AutomationConfig =
            AutomationConfig::new(" ", ExecutionMode::Single).trigger(Trigger::state("light.a"));
        assert!(config.validate().is_err());
    }
}
