//! Context-guard protocol
//!
//! Every generated write to a device first stamps a guard cell with the
//! writer script's context id. A state change whose context (or parent
//! context) matches a stamp was caused by that writer, which lets upstream
//! sync automations and `not_by` clauses ignore their own echoes.

use hassl_core::{EntityId, Property};
use hassl_semantics::ir::{Action, Module, Qualifier};
use std::collections::{BTreeMap, BTreeSet};

use crate::expr::quote;
use crate::naming::{self, GeneratedId};

/// Every guard cell a module needs, computed before lowering.
#[derive(Debug, Clone, Default)]
pub struct GuardRegistry {
    package: String,
    sync: BTreeMap<EntityId, BTreeSet<GeneratedId>>,
    rule: BTreeMap<String, BTreeSet<EntityId>>,
}

impl GuardRegistry {
    pub fn for_module(module: &Module) -> Self {
        let mut registry = Self {
            package: module.package.clone(),
            ..Self::default()
        };

        for sync in &module.syncs {
            for member in &sync.members {
                for property in &sync.properties {
                    registry
                        .sync
                        .entry(member.clone())
                        .or_default()
                        .insert(naming::sync_guard(member, *property));
                }
            }
        }

        for rule in &module.rules {
            let mut written = BTreeSet::new();
            for clause in &rule.clauses {
                collect_written(&clause.actions, &mut written);
            }
            if !written.is_empty() {
                registry.rule.insert(rule.name.clone(), written);
            }
        }

        registry
    }

    /// Guard stamped by `rule`'s writers for `entity`
    pub fn rule_cell(&self, rule: &str, entity: &EntityId) -> GeneratedId {
        naming::rule_guard(&self.package, rule, entity)
    }

    /// All guard cells, sorted
    pub fn cells(&self) -> BTreeSet<GeneratedId> {
        let mut out: BTreeSet<GeneratedId> = self.sync.values().flatten().cloned().collect();
        for (rule, entities) in &self.rule {
            out.extend(entities.iter().map(|e| self.rule_cell(rule, e)));
        }
        out
    }

    /// Cells a `not_by` qualifier on a clause of `rule` consults for a
    /// change of `entity`.
    pub fn cells_for(
        &self,
        qualifier: &Qualifier,
        rule: &str,
        entity: &EntityId,
    ) -> Vec<GeneratedId> {
        let sync_cells = || self.sync.get(entity).into_iter().flatten().cloned();
        let rule_cell = |name: &str| {
            self.rule
                .get(name)
                .filter(|written| written.contains(entity))
                .map(|_| self.rule_cell(name, entity))
        };

        let mut out: BTreeSet<GeneratedId> = BTreeSet::new();
        match qualifier {
            Qualifier::This => {
                out.extend(sync_cells());
                out.extend(rule_cell(rule));
            }
            Qualifier::Rule(other) => out.extend(rule_cell(other)),
            Qualifier::AnyHassl => {
                out.extend(sync_cells());
                for name in self.rule.keys() {
                    out.extend(rule_cell(name));
                }
            }
        }
        out.into_iter().collect()
    }
}

fn collect_written(actions: &[Action], out: &mut BTreeSet<EntityId>) {
    for action in actions {
        match action {
            Action::Assign { target, .. } => {
                out.insert(target.clone());
            }
            Action::AttrAssign { entity, .. } => {
                out.insert(entity.clone());
            }
            Action::Wait { then, .. } => collect_written(then, out),
            Action::RuleCtrl { .. } | Action::Tag { .. } => {}
        }
    }
}

/// Template that holds unless the triggering change carries a context
/// stamped in one of the cells listed for `trigger.entity_id`.
///
/// Returns `None` when no entity has any cell, so callers can skip the
/// condition entirely.
pub fn guard_template(cells: &BTreeMap<EntityId, Vec<GeneratedId>>) -> Option<String> {
    if cells.values().all(Vec::is_empty) {
        return None;
    }

    let entries: Vec<String> = cells
        .iter()
        .map(|(entity, cells)| {
            let stamps: Vec<String> = cells
                .iter()
                .map(|c| format!("states({})", quote(&c.entity_id())))
                .collect();
            format!("{}: [{}]", quote(&entity.to_string()), stamps.join(", "))
        })
        .collect();

    Some(format!(
        "{{% set stamps = {{{}}}[trigger.entity_id] %}}\
         {{{{ trigger.to_state.context.id not in stamps \
         and trigger.to_state.context.parent_id not in stamps }}}}",
        entries.join(", ")
    ))
}

/// Writer step stamping `cell` with the running script's context id
pub fn stamp(cell: &GeneratedId) -> hassl_script::Action {
    hassl_script::Action::service("input_text.set_value", cell.entity_id())
        .with_data("value", "{{ context.id }}")
}
