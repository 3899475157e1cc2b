//! Trigger types
//!
//! Triggers are the event detectors that start an automation. Only the
//! platforms the compiler emits are modelled; each serializes to the exact
//! YAML shape Home Assistant reads.

use chrono::NaiveTime;
use hassl_core::duration::{option_hms_serde, signed_hms_serde};
use hassl_core::SunEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trigger definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when an entity's state or attribute changes
    State(StateTrigger),

    /// Fires at a specific time of day
    Time(TimeTrigger),

    /// Fires on a time pattern (e.g., every minute)
    TimePattern(TimePatternTrigger),

    /// Fires when a template starts evaluating to true
    Template(TemplateTrigger),

    /// Fires at sunrise/sunset, optionally offset
    Sun(SunTrigger),

    /// Fires on Home Assistant start/shutdown
    Homeassistant(HomeassistantTrigger),
}

impl Trigger {
    /// State trigger on one entity
    pub fn state(entity_id: impl Into<String>) -> StateTrigger {
        StateTrigger {
            id: None,
            entity_id: entity_id.into(),
            from: None,
            to: None,
            attribute: None,
            r#for: None,
        }
    }

    /// Copy of this trigger carrying `id`
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            Trigger::State(t) => t.id = id,
            Trigger::Time(t) => t.id = id,
            Trigger::TimePattern(t) => t.id = id,
            Trigger::Template(t) => t.id = id,
            Trigger::Sun(t) => t.id = id,
            Trigger::Homeassistant(t) => t.id = id,
        }
        self
    }
}

/// State change trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub entity_id: String,

    /// Only fire when leaving this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<StateMatch>,

    /// Only fire when entering this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<StateMatch>,

    /// Watch this attribute rather than the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// How long the new state must hold
    #[serde(default, skip_serializing_if = "Option::is_none", with = "option_hms_serde")]
    pub r#for: Option<Duration>,
}

impl StateTrigger {
    pub fn to(mut self, state: StateMatch) -> Self {
        self.to = Some(state);
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl From<StateTrigger> for Trigger {
    fn from(t: StateTrigger) -> Self {
        Trigger::State(t)
    }
}

/// Time trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rendered `HH:MM:SS`
    pub at: NaiveTime,
}

/// Periodic trigger; each field is a value or `/N`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePatternTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<String>,
}

/// Template trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Fires on the false-to-true edge
    pub value_template: String,

    /// How long the template must stay true
    #[serde(default, skip_serializing_if = "Option::is_none", with = "option_hms_serde")]
    pub r#for: Option<Duration>,
}

/// Sun trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// sunrise or sunset
    pub event: SunEvent,

    /// Signed offset in seconds, written as `-00:30:00` for 30 min before
    #[serde(default, skip_serializing_if = "is_zero", with = "signed_hms_serde")]
    pub offset: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Platform start/shutdown trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeassistantTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub event: HassEvent,
}

/// One state value, or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateMatch {
    Single(String),
    List(Vec<String>),
}

/// Platform lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HassEvent {
    Start,
    Shutdown,
}
