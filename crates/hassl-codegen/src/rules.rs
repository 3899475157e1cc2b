//! Rule lowering
//!
//! Each clause of a rule becomes one `restart` automation. Device writes go
//! through rule-scoped writer scripts that stamp the rule's guard cell, so
//! `not_by` clauses elsewhere can recognise them.

use chrono::NaiveTime;
use hassl_automation::trigger::{TemplateTrigger, TimeTrigger};
use hassl_automation::{AutomationConfig, Condition, ExecutionMode, StateMatch, Trigger};
use hassl_core::ast::{Literal, OnOff, RuleOp};
use hassl_core::domains::{attribute_writer, turn_service};
use hassl_core::EntityId;
use hassl_script::{Action, ScriptConfig};
use hassl_semantics::ir::{Action as IrAction, Clause, Expr, Rule, RuleCtrlEnd};
use hassl_semantics::QualifiedName;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

use crate::document::Document;
use crate::expr::{compile_condition, compile_template, entities_in, format_number};
use crate::generator::GeneratorOptions;
use crate::guard::{guard_template, stamp, GuardRegistry};
use crate::naming::{self, GeneratedId};
use crate::schedule::{compile_schedule, time_trigger};

/// Longest value a tag cell holds
pub const TAG_MAX_LEN: u32 = 255;

/// Lower one rule into `doc`.
pub fn lower_rule(
    doc: &mut Document,
    rule: &Rule,
    guards: &GuardRegistry,
    options: &GeneratorOptions,
) {
    let package = doc.package.clone();
    let gate = naming::gate_cell(&package, &rule.name);
    doc.helpers
        .add_boolean(&gate, format!("HASSL gate {package}.{}", rule.name), Some(true));

    let mut schedule_cells: Vec<GeneratedId> = rule
        .schedule_uses
        .iter()
        .map(|qn| naming::schedule_cell(&qn.package, &qn.name))
        .collect();

    if !rule.schedule_inline.is_empty() {
        let name = naming::inline_schedule_name(&rule.name);
        let cell = naming::schedule_cell(&package, &name);
        doc.helpers
            .add_boolean(&cell, format!("HASSL schedule {package}.{name}"), Some(false));
        doc.automations.extend(compile_schedule(
            &package,
            &name,
            &cell,
            &rule.schedule_inline,
            options.maintain_minutes,
        ));
        schedule_cells.push(cell);
    }

    let mut lowering = RuleLowering {
        doc,
        package,
        rule,
        guards,
        options,
    };
    for (index, clause) in rule.clauses.iter().enumerate() {
        let automation = lowering.clause(index + 1, clause, &gate, &schedule_cells);
        lowering.doc.automations.push(automation);
    }

    debug!(
        rule = %rule.name,
        clauses = rule.clauses.len(),
        schedules = schedule_cells.len(),
        "Lowered rule"
    );
}

struct RuleLowering<'a> {
    doc: &'a mut Document,
    package: String,
    rule: &'a Rule,
    guards: &'a GuardRegistry,
    options: &'a GeneratorOptions,
}

impl RuleLowering<'_> {
    fn clause(
        &mut self,
        index: usize,
        clause: &Clause,
        gate: &GeneratedId,
        schedule_cells: &[GeneratedId],
    ) -> AutomationConfig<Action> {
        let id = naming::rule_automation(&self.package, &self.rule.name, index);
        let mut automation = AutomationConfig::new(id, ExecutionMode::Restart);

        let entities = entities_in(&clause.condition);
        if entities.is_empty() {
            automation = automation.trigger(Trigger::Time(TimeTrigger {
                id: None,
                at: NaiveTime::MIN,
            }));
            for cell in schedule_cells {
                automation = automation
                    .trigger(Trigger::state(cell.entity_id()).to(StateMatch::Single("on".into())));
            }
        }
        for entity in &entities {
            automation = automation.trigger(Trigger::state(entity.to_string()));
        }

        automation = automation
            .condition(compile_condition(&clause.condition))
            .condition(Condition::state(gate.entity_id(), "on"));
        for cell in schedule_cells {
            automation = automation.condition(Condition::state(cell.entity_id(), "on"));
        }

        if let Some(qualifier) = &clause.qualifier {
            let cells: BTreeMap<EntityId, Vec<GeneratedId>> = entities
                .iter()
                .map(|e| (e.clone(), self.guards.cells_for(qualifier, &self.rule.name, e)))
                .collect();
            match guard_template(&cells) {
                Some(template) => automation = automation.condition(Condition::template(template)),
                None => trace!(rule = %self.rule.name, index, "No guard cells for qualifier"),
            }
        }

        automation.actions = self.actions(&clause.actions);
        automation
    }

    fn actions(&mut self, actions: &[IrAction]) -> Vec<Action> {
        let mut out = Vec::new();
        for action in actions {
            self.action(action, &mut out);
        }
        out
    }

    fn action(&mut self, action: &IrAction, out: &mut Vec<Action>) {
        match action {
            IrAction::Assign {
                target,
                state,
                duration,
            } => {
                out.push(self.call_state_writer(target, *state));
                if let Some(duration) = duration {
                    out.push(Action::delay(*duration));
                    out.push(self.call_state_writer(target, state.inverse()));
                }
            }
            IrAction::AttrAssign {
                entity,
                attr,
                value,
            } => {
                let writer = self.attr_writer(entity, attr);
                out.push(Action::call(writer.entity_id()).with_data("value", literal_value(value)));
            }
            IrAction::Wait {
                condition,
                duration,
                then,
            } => {
                out.push(lower_wait(condition, *duration));
                out.extend(self.actions(then));
            }
            IrAction::RuleCtrl { op, rule, end } => lower_rule_ctrl(*op, rule, end.as_ref(), out),
            IrAction::Tag { name, value } => {
                let cell = naming::tag_cell(&self.package, name);
                self.doc.helpers.add_text(
                    &cell,
                    format!("HASSL tag {}.{name}", self.package),
                    TAG_MAX_LEN,
                );
                out.push(
                    Action::service("input_text.set_value", cell.entity_id())
                        .with_data("value", literal_text(value)),
                );
            }
        }
    }

    fn guard_cell(&mut self, entity: &EntityId) -> GeneratedId {
        let cell = self.guards.rule_cell(&self.rule.name, entity);
        self.doc.helpers.add_text(
            &cell,
            format!("HASSL rctx {}.{} {entity}", self.package, self.rule.name),
            self.options.guard_max_len,
        );
        cell
    }

    fn add_writer(&mut self, id: &GeneratedId, entity: &EntityId, write: Action) {
        if self.doc.has_script(id) {
            return;
        }
        let guard = self.guard_cell(entity);
        let script = ScriptConfig::queued(
            &id.object_id,
            self.options.sync_max_queued,
            vec![stamp(&guard), write],
        );
        self.doc.add_script(id, script);
    }

    fn call_state_writer(&mut self, target: &EntityId, state: OnOff) -> Action {
        let id = naming::rule_writer(&self.package, &self.rule.name, target, state.as_str());
        let write = Action::service(
            turn_service(target.domain(), state == OnOff::On),
            target.to_string(),
        );
        self.add_writer(&id, target, write);
        Action::call(id.entity_id())
    }

    fn attr_writer(&mut self, entity: &EntityId, attr: &str) -> GeneratedId {
        let id = naming::rule_writer(&self.package, &self.rule.name, entity, attr);
        let mapping = attribute_writer(entity.domain(), attr);
        let write = Action::service(mapping.service, entity.to_string())
            .with_data(mapping.data_key, "{{ value }}");
        self.add_writer(&id, entity, write);
        id
    }
}

const WAIT_TRIGGERED: &str = "{{ wait.trigger is not none }}";

/// Block until `condition` has held for `duration`.
///
/// A template trigger only fires on a false-to-true edge. When the
/// condition already holds, the run goes on unless it drops within
/// `duration`, in which case the run waits for the next edge.
fn lower_wait(condition: &Expr, duration: Duration) -> Action {
    let holds = compile_template(condition);
    if duration.is_zero() {
        return Action::wait_template(holds);
    }
    let held = || {
        Action::wait_for(vec![Trigger::Template(TemplateTrigger {
            id: None,
            value_template: holds.clone(),
            r#for: Some(duration),
        })])
    };
    let dropped = Trigger::Template(TemplateTrigger {
        id: None,
        value_template: compile_template(&negate(condition)),
        r#for: None,
    });
    Action::when_else(
        vec![compile_condition(condition)],
        vec![
            Action::wait_at_most(vec![dropped], duration),
            Action::when(vec![Condition::template(WAIT_TRIGGERED)], vec![held()]),
        ],
        vec![held()],
    )
}

fn negate(expr: &Expr) -> Expr {
    match expr {
        Expr::Not(inner) => (**inner).clone(),
        other => Expr::Not(Box::new(other.clone())),
    }
}

fn lower_rule_ctrl(
    op: RuleOp,
    rule: &QualifiedName,
    end: Option<&RuleCtrlEnd>,
    out: &mut Vec<Action>,
) {
    let gate = naming::gate_cell(&rule.package, &rule.name).entity_id();
    let (first, restore) = match op {
        RuleOp::Disable => ("input_boolean.turn_off", "input_boolean.turn_on"),
        RuleOp::Enable => ("input_boolean.turn_on", "input_boolean.turn_off"),
    };
    out.push(Action::service(first, gate.clone()));
    match end {
        Some(RuleCtrlEnd::For(duration)) => out.push(Action::delay(*duration)),
        Some(RuleCtrlEnd::Until(at)) => out.push(Action::wait_for(vec![time_trigger(at)])),
        None => return,
    }
    out.push(Action::service(restore, gate));
}

fn literal_value(value: &Literal) -> serde_json::Value {
    match value {
        Literal::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            serde_json::Value::from(*n as i64)
        }
        Literal::Number(n) => serde_json::Value::from(*n),
        Literal::State(s) => serde_json::Value::from(s.as_str()),
        Literal::Str(s) => serde_json::Value::from(s.as_str()),
    }
}

fn literal_text(value: &Literal) -> String {
    match value {
        Literal::Number(n) => format_number(*n),
        Literal::State(s) => s.as_str().to_string(),
        Literal::Str(s) => s.clone(),
    }
}
