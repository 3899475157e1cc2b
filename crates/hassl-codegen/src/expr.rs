//! Expression compiler
//!
//! Turns IR condition trees into automation conditions and Jinja
//! expressions. Both functions are total: every well-formed tree compiles.

use hassl_automation::Condition;
use hassl_core::ast::{CompareOp, Literal, OnOff};
use hassl_core::EntityId;
use hassl_semantics::ir::{Expr, Operand};
use std::collections::BTreeSet;

/// Compile a condition tree to a platform condition.
///
/// `==`/`!=` between a device and `on`/`off` becomes a state condition.
/// Ordering operators, and `==`/`!=` against a number, compare every
/// operand as `| float(0)`; the rest compares state strings. A bare device
/// means "is on"; a bare literal is always true.
pub fn compile_condition(expr: &Expr) -> Condition {
    match expr {
        Expr::And(l, r) => Condition::and(vec![compile_condition(l), compile_condition(r)]),
        Expr::Or(l, r) => Condition::or(vec![compile_condition(l), compile_condition(r)]),
        Expr::Not(e) => Condition::not(compile_condition(e)),
        Expr::Compare { op, left, right } => match state_test(*op, left, right) {
            Some((entity, state, true)) => Condition::state(entity.to_string(), state.as_str()),
            Some((entity, state, false)) => {
                Condition::not(Condition::state(entity.to_string(), state.as_str()))
            }
            None => Condition::template(wrap(&compare(*op, left, right))),
        },
        Expr::Operand(Operand::Entity(id)) => Condition::state(id.to_string(), "on"),
        Expr::Operand(Operand::Literal(_)) => Condition::template(wrap("true")),
    }
}

/// Compile a condition tree to a full `{{ ... }}` template.
pub fn compile_template(expr: &Expr) -> String {
    wrap(&jinja(expr))
}

/// Devices referenced anywhere in the tree, sorted.
pub fn entities_in(expr: &Expr) -> BTreeSet<EntityId> {
    expr.entities()
}

/// Jinja boolean expression, without delimiters.
pub fn jinja(expr: &Expr) -> String {
    match expr {
        Expr::And(l, r) => format!("({} and {})", jinja(l), jinja(r)),
        Expr::Or(l, r) => format!("({} or {})", jinja(l), jinja(r)),
        Expr::Not(e) => format!("(not {})", jinja(e)),
        Expr::Compare { op, left, right } => match state_test(*op, left, right) {
            Some((entity, state, true)) => is_state(entity, state),
            Some((entity, state, false)) => format!("(not {})", is_state(entity, state)),
            None => compare(*op, left, right),
        },
        Expr::Operand(Operand::Entity(id)) => is_state(id, OnOff::On),
        Expr::Operand(Operand::Literal(_)) => "true".to_string(),
    }
}

/// Quote `s` as a single-quoted Jinja string literal.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn wrap(body: &str) -> String {
    format!("{{{{ {body} }}}}")
}

fn is_state(entity: &EntityId, state: OnOff) -> String {
    format!("is_state({}, {})", quote(&entity.to_string()), quote(state.as_str()))
}

// (entity, state, positive) for device ==/!= on|off, either side.
fn state_test<'e>(
    op: CompareOp,
    left: &'e Operand,
    right: &'e Operand,
) -> Option<(&'e EntityId, OnOff, bool)> {
    let positive = match op {
        CompareOp::Eq => true,
        CompareOp::Ne => false,
        _ => return None,
    };
    match (left, right) {
        (Operand::Entity(e), Operand::Literal(Literal::State(s)))
        | (Operand::Literal(Literal::State(s)), Operand::Entity(e)) => Some((e, *s, positive)),
        _ => None,
    }
}

fn compare(op: CompareOp, left: &Operand, right: &Operand) -> String {
    let numeric = op.is_ordering()
        || [left, right]
            .iter()
            .any(|o| matches!(o, Operand::Literal(Literal::Number(_))));
    format!(
        "({} {} {})",
        operand(left, numeric),
        op.as_str(),
        operand(right, numeric)
    )
}

fn operand(operand: &Operand, numeric: bool) -> String {
    let text = match operand {
        Operand::Entity(id) => format!("states({})", quote(&id.to_string())),
        Operand::Literal(Literal::Number(n)) => return format_number(*n),
        Operand::Literal(Literal::State(s)) => quote(s.as_str()),
        Operand::Literal(Literal::Str(s)) => quote(s),
    };
    if numeric {
        format!("({text} | float(0))")
    } else {
        text
    }
}

/// Integral values render without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(s: &str) -> Operand {
        Operand::Entity(s.parse().unwrap())
    }

    fn lit(l: Literal) -> Operand {
        Operand::Literal(l)
    }

    fn cmp(op: CompareOp, left: Operand, right: Operand) -> Expr {
        Expr::Compare { op, left, right }
    }

    #[test]
    fn test_state_equality_either_side() {
        let expr = cmp(
            CompareOp::Eq,
            lit(Literal::State(OnOff::Off)),
            entity("light.a"),
        );
        assert_eq!(
            serde_json::to_value(compile_condition(&expr)).unwrap(),
            json!({"condition": "state", "entity_id": "light.a", "state": "off"})
        );
    }

    #[test]
    fn test_state_inequality_is_negated() {
        let expr = cmp(CompareOp::Ne, entity("light.a"), lit(Literal::State(OnOff::On)));
        assert_eq!(
            serde_json::to_value(compile_condition(&expr)).unwrap(),
            json!({
                "condition": "not",
                "conditions": [{"condition": "state", "entity_id": "light.a", "state": "on"}]
            })
        );
        assert_eq!(compile_template(&expr), "{{ (not is_state('light.a', 'on')) }}");
    }

    #[test]
    fn test_numeric_comparison() {
        let expr = cmp(CompareOp::Gt, entity("sensor.temp"), lit(Literal::Number(20.0)));
        assert_eq!(
            serde_json::to_value(compile_condition(&expr)).unwrap(),
            json!({
                "condition": "template",
                "value_template": "{{ ((states('sensor.temp') | float(0)) > 20) }}"
            })
        );
    }

    #[test]
    fn test_ordering_between_devices_is_numeric() {
        let expr = cmp(CompareOp::Gt, entity("sensor.a"), entity("sensor.b"));
        assert_eq!(
            compile_template(&expr),
            "{{ ((states('sensor.a') | float(0)) > (states('sensor.b') | float(0))) }}"
        );
    }

    #[test]
    fn test_number_on_the_left() {
        let expr = cmp(CompareOp::Eq, lit(Literal::Number(21.0)), entity("sensor.temp"));
        assert_eq!(
            compile_template(&expr),
            "{{ (21 == (states('sensor.temp') | float(0))) }}"
        );
    }

    #[test]
    fn test_ordering_against_text_coerces_both_sides() {
        let expr = cmp(CompareOp::Lt, entity("sensor.temp"), lit(Literal::Str("18.5".into())));
        assert_eq!(
            compile_template(&expr),
            "{{ ((states('sensor.temp') | float(0)) < ('18.5' | float(0))) }}"
        );
    }

    #[test]
    fn test_device_equality_compares_states() {
        let expr = cmp(CompareOp::Ne, entity("input_select.a"), entity("input_select.b"));
        assert_eq!(
            compile_template(&expr),
            "{{ (states('input_select.a') != states('input_select.b')) }}"
        );
    }

    #[test]
    fn test_string_comparison() {
        let expr = cmp(
            CompareOp::Eq,
            entity("input_select.mode"),
            lit(Literal::Str("it's away".into())),
        );
        assert_eq!(
            compile_template(&expr),
            r"{{ (states('input_select.mode') == 'it\'s away') }}"
        );
    }

    #[test]
    fn test_bare_operands() {
        assert_eq!(
            serde_json::to_value(compile_condition(&Expr::Operand(entity("binary_sensor.m"))))
                .unwrap(),
            json!({"condition": "state", "entity_id": "binary_sensor.m", "state": "on"})
        );
        assert_eq!(
            compile_template(&Expr::Operand(lit(Literal::Number(3.0)))),
            "{{ true }}"
        );
    }

    #[test]
    fn test_structure_and_entities() {
        let expr = Expr::And(
            Box::new(Expr::Operand(entity("binary_sensor.m"))),
            Box::new(Expr::Not(Box::new(Expr::Operand(entity("light.a"))))),
        );
        assert!(matches!(compile_condition(&expr), Condition::And(c) if c.conditions.len() == 2));
        assert_eq!(
            compile_template(&expr),
            "{{ (is_state('binary_sensor.m', 'on') and (not is_state('light.a', 'on'))) }}"
        );
        let names: Vec<String> = entities_in(&expr).iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["binary_sensor.m", "light.a"]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-3.0), "-3");
    }
}
