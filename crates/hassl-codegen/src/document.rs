//! Generated output document
//!
//! The document is plain data: helper cells, writer scripts, automations
//! and workday sensors, all in deterministic order. Writing it to disk is
//! the job of `hassl-config`.

use chrono::NaiveDate;
use hassl_automation::AutomationConfig;
use hassl_core::ast::ExcludeDay;
use hassl_core::Weekday;
use hassl_script::{Action, ScriptConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::naming::GeneratedId;

/// Everything generated for one module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub package: String,
    pub helpers: Helpers,
    pub scripts: BTreeMap<String, ScriptConfig>,
    pub automations: Vec<AutomationConfig<Action>>,
    pub binary_sensors: Vec<WorkdaySensor>,
}

impl Document {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Register a writer script; the first definition of a name wins.
    pub fn add_script(&mut self, id: &GeneratedId, script: ScriptConfig) {
        self.scripts.entry(id.object_id.clone()).or_insert(script);
    }

    pub fn has_script(&self, id: &GeneratedId) -> bool {
        self.scripts.contains_key(&id.object_id)
    }

    pub fn automation(&self, id: &str) -> Option<&AutomationConfig<Action>> {
        self.automations.iter().find(|a| a.id == id)
    }

    /// The per-package file body: scripts, automations and sensors
    pub fn package_file(&self) -> PackageFile<'_> {
        PackageFile {
            script: &self.scripts,
            automation: &self.automations,
            binary_sensor: &self.binary_sensors,
        }
    }
}

/// Serialized shape of `hassl__<pkg>.yaml`
#[derive(Debug, Serialize)]
pub struct PackageFile<'a> {
    #[serde(skip_serializing_if = "no_scripts")]
    pub script: &'a BTreeMap<String, ScriptConfig>,
    #[serde(skip_serializing_if = "no_items")]
    pub automation: &'a [AutomationConfig<Action>],
    #[serde(skip_serializing_if = "no_items")]
    pub binary_sensor: &'a [WorkdaySensor],
}

fn no_scripts(scripts: &&BTreeMap<String, ScriptConfig>) -> bool {
    scripts.is_empty()
}

fn no_items<T>(items: &&[T]) -> bool {
    items.is_empty()
}

/// Helper cells, keyed by object id within each family
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Helpers {
    #[serde(default)]
    pub input_boolean: BTreeMap<String, InputBoolean>,
    #[serde(default)]
    pub input_number: BTreeMap<String, InputNumber>,
    #[serde(default)]
    pub input_text: BTreeMap<String, InputText>,
}

impl Helpers {
    pub fn is_empty(&self) -> bool {
        self.input_boolean.is_empty() && self.input_number.is_empty() && self.input_text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.input_boolean.len() + self.input_number.len() + self.input_text.len()
    }

    pub fn add_boolean(
        &mut self,
        id: &GeneratedId,
        name: impl Into<String>,
        initial: Option<bool>,
    ) {
        self.input_boolean
            .entry(id.object_id.clone())
            .or_insert_with(|| InputBoolean {
                name: name.into(),
                initial,
            });
    }

    pub fn add_number(
        &mut self,
        id: &GeneratedId,
        name: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
    ) {
        self.input_number
            .entry(id.object_id.clone())
            .or_insert_with(|| InputNumber {
                name: name.into(),
                min,
                max,
                step,
                mode: NumberMode::Slider,
            });
    }

    pub fn add_text(&mut self, id: &GeneratedId, name: impl Into<String>, max: u32) {
        self.input_text
            .entry(id.object_id.clone())
            .or_insert_with(|| InputText {
                name: name.into(),
                max,
            });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBoolean {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputNumber {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(default)]
    pub mode: NumberMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberMode {
    #[default]
    Slider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputText {
    pub name: String,
    pub max: u32,
}

/// `workday` binary sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkdaySensor {
    pub platform: String,
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub workdays: Vec<Weekday>,
    pub excludes: Vec<ExcludeDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_holidays: Vec<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_holidays: Vec<NaiveDate>,
}
