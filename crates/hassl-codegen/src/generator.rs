//! Module generator
//!
//! Drives the lowering passes over one analyzed module in a fixed order:
//! syncs, rules, local schedules, then holiday sets.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Document;
use crate::guard::GuardRegistry;
use crate::holidays::lower_holidays;
use crate::naming;
use crate::rules::lower_rule;
use crate::schedule::compile_schedule;
use crate::sync::lower_sync;
use hassl_semantics::Module;

/// Tunables for generated artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// `max` of queued sync automations and writer scripts
    pub sync_max_queued: usize,
    /// Interval of the schedule `maintain` automation
    pub maintain_minutes: u32,
    /// Length of guard cells; must hold a context id
    pub guard_max_len: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            sync_max_queued: 10,
            maintain_minutes: 1,
            guard_max_len: 64,
        }
    }
}

/// Generate the output document for one module.
pub fn generate(module: &Module, options: &GeneratorOptions) -> Document {
    let mut doc = Document::new(&module.package);
    let guards = GuardRegistry::for_module(module);
    debug!(
        package = %module.package,
        guard_cells = guards.cells().len(),
        "Collected guard cells"
    );

    for sync in &module.syncs {
        lower_sync(&mut doc, sync, options);
    }

    for rule in &module.rules {
        lower_rule(&mut doc, rule, &guards, options);
    }

    for (name, schedule) in &module.schedules {
        let cell = naming::schedule_cell(&name.package, &name.name);
        doc.helpers.add_boolean(
            &cell,
            format!("HASSL schedule {name}"),
            Some(false),
        );
        doc.automations.extend(compile_schedule(
            &name.package,
            &name.name,
            &cell,
            &schedule.clauses,
            options.maintain_minutes,
        ));
    }

    for set in module.holidays.values() {
        doc.binary_sensors.extend(lower_holidays(set));
    }

    info!(
        package = %module.package,
        helpers = doc.helpers.len(),
        scripts = doc.scripts.len(),
        automations = doc.automations.len(),
        sensors = doc.binary_sensors.len(),
        "Generated package"
    );
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_fill_missing_keys() {
        let options: GeneratorOptions = serde_yaml::from_str("maintain_minutes: 5").unwrap();
        assert_eq!(options.maintain_minutes, 5);
        assert_eq!(options.sync_max_queued, 10);
        assert_eq!(options.guard_max_len, 64);
    }

    #[test]
    fn test_empty_module() {
        let module = Module {
            package: "empty".into(),
            ..Module::default()
        };
        let doc = generate(&module, &GeneratorOptions::default());
        assert!(doc.helpers.is_empty());
        assert!(doc.automations.is_empty());
    }
}
