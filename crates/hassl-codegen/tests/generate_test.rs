//! Generation over analyzed multi-module programs

use hassl_automation::Condition;
use hassl_codegen::naming::platform_object_id;
use hassl_codegen::{generate, Document, GeneratorOptions};
use hassl_core::ast::Program;
use hassl_semantics::build;
use minijinja::{context, Environment};
use serde_json::{json, Value};

fn program(value: Value) -> Program {
    serde_json::from_value(value).unwrap()
}

fn generate_all(programs: &[Program]) -> Vec<Document> {
    let (modules, _) = build(programs).unwrap();
    modules
        .iter()
        .map(|m| generate(m, &GeneratorOptions::default()))
        .collect()
}

fn find<'a>(docs: &'a [Document], package: &str) -> &'a Document {
    docs.iter().find(|d| d.package == package).unwrap()
}

fn ksync() -> Program {
    program(json!({
        "package": "home",
        "statements": [
            {"kind": "alias", "name": "a", "target": "light.kitchen"},
            {"kind": "alias", "name": "b", "target": "switch.kitchen_circuit"},
            {"kind": "sync", "name": "ksync", "sync_kind": "shared", "members": ["a", "b"]}
        ]
    }))
}

#[test]
fn test_ksync_shared_onoff() {
    let docs = generate_all(&[ksync()]);
    let doc = find(&docs, "home");

    assert_eq!(
        doc.helpers.input_boolean.keys().collect::<Vec<_>>(),
        vec!["hassl_sync__home__ksync__onoff"]
    );
    let ids: Vec<&str> = doc.automations.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "hassl_sync__home__ksync__onoff__upstream__light__kitchen",
            "hassl_sync__home__ksync__onoff__upstream__switch__kitchen_circuit",
            "hassl_sync__home__ksync__onoff__downstream",
        ]
    );
    for automation in &doc.automations {
        automation.validate().unwrap();
    }
    assert!(doc
        .scripts
        .contains_key("hassl_write__home__ksync__switch__kitchen_circuit__onoff__on"));
}

#[test]
fn test_wake_hours_schedule() {
    let docs = generate_all(&[
        program(json!({
            "package": "std.shared",
            "statements": [
                {"kind": "schedule", "name": "wake_hours", "clauses": [
                    {"form": "legacy", "op": "enable", "from": "07:00", "to": "23:00"}
                ]}
            ]
        })),
        program(json!({
            "package": "home",
            "statements": [
                {"kind": "import", "package": "std.shared", "form": "glob"},
                {"kind": "rule", "name": "motion_light", "items": [
                    {"item": "schedule_use", "names": ["wake_hours"]},
                    {"item": "clause",
                     "condition": {"expr": "operand", "value": {"name": "binary_sensor.motion"}},
                     "actions": [{"action": "assign", "target": "light.hall", "state": "on", "for": "10m"}]}
                ]}
            ]
        })),
    ]);

    let shared = find(&docs, "std.shared");
    assert!(shared
        .helpers
        .input_boolean
        .contains_key("hassl_schedule__std_shared__wake_hours"));
    let start = shared
        .automation("hassl_schedule__std_shared__wake_hours__start")
        .unwrap();
    let end = shared
        .automation("hassl_schedule__std_shared__wake_hours__end")
        .unwrap();
    assert!(shared
        .automation("hassl_schedule__std_shared__wake_hours__maintain")
        .is_some());
    assert_eq!(serde_json::to_value(&start.triggers).unwrap()[0]["at"], json!("07:00:00"));
    assert_eq!(serde_json::to_value(&end.triggers).unwrap()[0]["at"], json!("23:00:00"));

    // The importing package references the cell but does not own it.
    let home = find(&docs, "home");
    assert!(!home
        .helpers
        .input_boolean
        .contains_key("hassl_schedule__std_shared__wake_hours"));
    let rule = home.automation("hassl_rule__home__motion_light__1").unwrap();
    assert!(rule.conditions.contains(&Condition::state(
        "input_boolean.hassl_schedule__std_shared__wake_hours",
        "on"
    )));
}

#[test]
fn test_generation_is_deterministic() {
    let render = || {
        let docs = generate_all(&[ksync()]);
        let doc = find(&docs, "home");
        (
            serde_yaml::to_string(&doc.package_file()).unwrap(),
            serde_yaml::to_string(&doc.helpers).unwrap(),
        )
    };
    assert_eq!(render(), render());
}

#[test]
fn test_not_by_rule_guard_renders() {
    let docs = generate_all(&[program(json!({
        "package": "home",
        "statements": [
            {"kind": "rule", "name": "night", "items": [
                {"item": "clause",
                 "condition": {"expr": "operand", "value": {"name": "binary_sensor.bedtime"}},
                 "actions": [{"action": "assign", "target": "light.hall", "state": "off"}]}
            ]},
            {"kind": "rule", "name": "follow", "items": [
                {"item": "clause",
                 "condition": {"expr": "compare", "op": "==",
                               "left": {"name": "light.hall"}, "right": {"literal": "off"}},
                 "not_by": {"rule": "night"},
                 "actions": [{"action": "assign", "target": "switch.fan", "state": "off"}]}
            ]}
        ]
    }))]);
    let doc = find(&docs, "home");
    let automation = doc.automation("hassl_rule__home__follow__1").unwrap();
    let Some(Condition::Template(guard)) = automation.conditions.last() else {
        panic!("expected a guard condition");
    };

    let mut env = Environment::new();
    env.add_function("states", |entity: String| -> String {
        if entity == "input_text.hassl_rctx__home__night__light__hall" {
            "CTX-NIGHT".to_string()
        } else {
            "unknown".to_string()
        }
    });
    let render = |id: &str| {
        env.render_str(
            &guard.value_template,
            context! {
                trigger => context! {
                    entity_id => "light.hall",
                    to_state => context! {
                        context => context! { id => id, parent_id => () },
                    },
                },
            },
        )
        .unwrap()
    };

    assert_eq!(render("CTX-NIGHT"), "false");
    assert_eq!(render("CTX-USER"), "true");
}

#[test]
fn test_holiday_window_emits_sensors() {
    let docs = generate_all(&[program(json!({
        "package": "home",
        "statements": [
            {"kind": "holidays", "id": "us", "country": "US"},
            {"kind": "schedule", "name": "office", "clauses": [
                {"form": "window", "days": "weekdays", "start": "08:00", "end": "18:00",
                 "holidays": {"id": "us", "mode": "except"}}
            ]}
        ]
    }))]);
    let doc = find(&docs, "home");
    let names: Vec<&str> = doc.binary_sensors.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["hassl_holidays__home__us", "hassl_holidays__home__us__workday"]
    );

    // The window must reference the id the platform derives from the name.
    let derived = format!("binary_sensor.{}", platform_object_id(&doc.binary_sensors[0].name));
    assert_eq!(derived, "binary_sensor.hassl_holidays_home_us");

    let maintain = doc
        .automation("hassl_schedule__home__office__maintain")
        .unwrap();
    let value = serde_json::to_value(&maintain.actions).unwrap();
    let window = &value[0]["choose"][0]["conditions"][0];
    assert_eq!(window["conditions"][1]["entity_id"], json!(derived));
    assert_eq!(window["conditions"][1]["state"], json!("on"));
}
