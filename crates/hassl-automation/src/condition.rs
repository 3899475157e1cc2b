//! Condition types
//!
//! Conditions are state-based tests evaluated at trigger time. All
//! top-level conditions of an automation must hold for its actions to run.

use chrono::NaiveTime;
use hassl_core::{SunEvent, Weekday};
use serde::{Deserialize, Serialize};

use crate::trigger::StateMatch;

/// Condition definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    State(StateCondition),
    Time(TimeCondition),
    Sun(SunCondition),
    Template(TemplateCondition),
    /// Started by the trigger carrying a given id
    Trigger(TriggerCondition),
    And(AndCondition),
    Or(OrCondition),
    /// Holds when none of the inner conditions hold
    Not(NotCondition),
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(AndCondition { conditions })
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(OrCondition { conditions })
    }

    /// Negate a single condition
    pub fn not(condition: Condition) -> Self {
        Condition::Not(NotCondition {
            conditions: vec![condition],
        })
    }

    /// Entity is in `state`
    pub fn state(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Condition::State(StateCondition {
            entity_id: entity_id.into(),
            state: StateMatch::Single(state.into()),
            attribute: None,
        })
    }

    /// Template renders truthy
    pub fn template(value_template: impl Into<String>) -> Self {
        Condition::Template(TemplateCondition {
            value_template: value_template.into(),
        })
    }

    /// The automation was started by the trigger with `id`
    pub fn trigger(id: impl Into<String>) -> Self {
        Condition::Trigger(TriggerCondition { id: id.into() })
    }
}

/// Entity state (or attribute) equals a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCondition {
    pub entity_id: String,

    pub state: StateMatch,

    /// Compare this attribute rather than the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Current time lies in a window
///
/// When `after` is later than `before` the window wraps midnight.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<NaiveTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<NaiveTime>,

    /// Restrict to these days; empty means every day
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekday: Vec<Weekday>,
}

/// Position relative to sunrise/sunset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SunCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<SunEvent>,

    /// Offset applied to `after`, e.g. `-00:30:00`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_offset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<SunEvent>,

    /// Offset applied to `before`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_offset: Option<String>,
}

/// Template renders truthy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCondition {
    pub value_template: String,
}

/// Matches `trigger.id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndCondition {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrCondition {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotCondition {
    pub conditions: Vec<Condition>,
}
