//! Action types
//!
//! Actions are the building blocks of scripts and automation action lists.
//! Only the primitives the compiler emits are modelled: service calls,
//! delays, waits on a trigger or a template, and conditional branching.

use hassl_automation::{Condition, Trigger};
use hassl_core::duration::{hms_serde, option_hms_serde};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Accept `entity_id: x` as well as `entity_id: [x, y]`
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    match StringOrVec::deserialize(deserializer)? {
        StringOrVec::String(s) => Ok(vec![s]),
        StringOrVec::Vec(v) => Ok(v),
    }
}

/// Entities a service call acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Target {
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_or_vec"
    )]
    pub entity_id: Vec<String>,
}

impl Target {
    pub fn entity(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: vec![entity_id.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_id.is_empty()
    }
}

/// One step of a script or automation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Service(ServiceAction),

    Delay(DelayAction),

    WaitForTrigger(WaitForTriggerAction),

    /// Returns at once when the template already holds
    WaitTemplate(WaitTemplateAction),

    /// First matching option runs, else `default`
    Choose(ChooseAction),
}

impl Action {
    /// Service call targeting one entity, without data
    pub fn service(service: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Action::Service(ServiceAction {
            alias: None,
            service: service.into(),
            target: Some(Target::entity(entity_id)),
            data: IndexMap::new(),
        })
    }

    /// Service call with no target, e.g. running a script by its service name
    pub fn call(service: impl Into<String>) -> Self {
        Action::Service(ServiceAction {
            alias: None,
            service: service.into(),
            target: None,
            data: IndexMap::new(),
        })
    }

    /// Add a data entry. No-op for actions other than service calls.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        if let Action::Service(service) = &mut self {
            service.data.insert(key.into(), value.into());
        }
        self
    }

    pub fn delay(duration: Duration) -> Self {
        Action::Delay(DelayAction {
            alias: None,
            delay: duration,
        })
    }

    /// Wait, without a timeout, for any of `triggers`
    pub fn wait_for(triggers: Vec<Trigger>) -> Self {
        Action::WaitForTrigger(WaitForTriggerAction {
            alias: None,
            wait_for_trigger: triggers,
            timeout: None,
            continue_on_timeout: true,
        })
    }

    /// Wait for any of `triggers` or until `timeout` elapses, then carry on.
    /// `wait.trigger` is none afterwards if the timeout won.
    pub fn wait_at_most(triggers: Vec<Trigger>, timeout: Duration) -> Self {
        Action::WaitForTrigger(WaitForTriggerAction {
            alias: None,
            wait_for_trigger: triggers,
            timeout: Some(timeout),
            continue_on_timeout: true,
        })
    }

    pub fn wait_template(template: impl Into<String>) -> Self {
        Action::WaitTemplate(WaitTemplateAction {
            alias: None,
            wait_template: template.into(),
            timeout: None,
            continue_on_timeout: true,
        })
    }

    /// Run `sequence` only if all `conditions` hold
    pub fn when(conditions: Vec<Condition>, sequence: Vec<Action>) -> Self {
        Self::when_else(conditions, sequence, Vec::new())
    }

    /// Run `sequence` if all `conditions` hold, `otherwise` if not
    pub fn when_else(
        conditions: Vec<Condition>,
        sequence: Vec<Action>,
        otherwise: Vec<Action>,
    ) -> Self {
        Action::Choose(ChooseAction {
            alias: None,
            choose: vec![ChooseOption {
                conditions,
                sequence,
            }],
            default: otherwise,
        })
    }
}

/// `action: domain.service` step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub service: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    /// Service data, in insertion order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Delay duration, written as `HH:MM:SS`
    #[serde(with = "hms_serde")]
    pub delay: Duration,
}

/// Blocks until a trigger fires or the timeout elapses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitForTriggerAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub wait_for_trigger: Vec<Trigger>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "option_hms_serde")]
    pub timeout: Option<Duration>,

    /// Keep going after the timeout instead of aborting
    #[serde(default = "default_true")]
    pub continue_on_timeout: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitTemplateAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub wait_template: String,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "option_hms_serde")]
    pub timeout: Option<Duration>,

    #[serde(default = "default_true")]
    pub continue_on_timeout: bool,
}

/// Multi-way branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChooseAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub choose: Vec<ChooseOption>,

    /// Runs when no option matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChooseOption {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    pub sequence: Vec<Action>,
}
