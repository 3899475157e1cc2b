//! Sync lowering
//!
//! Each synchronized property gets a proxy helper holding the group's value.
//! Per member, an upstream automation copies device changes into the proxy
//! and guarded writer scripts push the proxy back out. A single downstream
//! automation fans proxy changes out to every member that differs.

use hassl_automation::{AutomationConfig, Condition, ExecutionMode, StateMatch, Trigger};
use hassl_core::domains::turn_service;
use hassl_core::{EntityId, Property, ProxyKind};
use hassl_script::action::{ChooseAction, ChooseOption};
use hassl_script::{Action, ScriptConfig};
use hassl_semantics::ir::SyncGroup;
use std::collections::BTreeMap;
use tracing::debug;

use crate::document::Document;
use crate::expr::quote;
use crate::generator::GeneratorOptions;
use crate::guard::{guard_template, stamp};
use crate::naming::{self, GeneratedId};

const ON_OFF: [&str; 2] = ["on", "off"];

/// Lower one sync group into `doc`.
pub fn lower_sync(doc: &mut Document, sync: &SyncGroup, options: &GeneratorOptions) {
    let package = doc.package.clone();
    for property in &sync.properties {
        SyncLowering {
            proxy: naming::sync_proxy(&package, &sync.name, *property),
            doc: &mut *doc,
            package: package.clone(),
            sync,
            property: *property,
            options,
        }
        .run();
    }
}

struct SyncLowering<'a> {
    doc: &'a mut Document,
    package: String,
    sync: &'a SyncGroup,
    property: Property,
    proxy: GeneratedId,
    options: &'a GeneratorOptions,
}

impl SyncLowering<'_> {
    fn run(mut self) {
        let spec = self.property.spec();
        let proxy_name = format!(
            "HASSL proxy {}.{} {}",
            self.package, self.sync.name, self.property
        );
        match spec.proxy {
            ProxyKind::Boolean => self.doc.helpers.add_boolean(&self.proxy, proxy_name, None),
            ProxyKind::Number { min, max, step } => {
                self.doc
                    .helpers
                    .add_number(&self.proxy, proxy_name, min, max, step)
            }
            ProxyKind::Text { max } => self.doc.helpers.add_text(&self.proxy, proxy_name, max),
        }

        let sync = self.sync;
        for member in &sync.members {
            let guard = naming::sync_guard(member, self.property);
            self.doc.helpers.add_text(
                &guard,
                format!("HASSL ctx {member}"),
                self.options.guard_max_len,
            );
            self.add_writers(member, &guard);
            let upstream = self.upstream(member, &guard);
            self.doc.automations.push(upstream);
        }

        let downstream = self.downstream();
        self.doc.automations.push(downstream);

        debug!(
            sync = %self.sync.name,
            property = %self.property,
            members = self.sync.members.len(),
            "Lowered sync property"
        );
    }

    fn writer(&self, member: &EntityId, direction: Option<&str>) -> GeneratedId {
        naming::sync_writer(
            &self.package,
            &self.sync.name,
            member,
            self.property,
            direction,
        )
    }

    fn queued(&self, id: &GeneratedId, sequence: Vec<Action>) -> ScriptConfig {
        ScriptConfig::queued(&id.object_id, self.options.sync_max_queued, sequence)
    }

    fn add_writers(&mut self, member: &EntityId, guard: &GeneratedId) {
        let spec = self.property.spec();
        if self.property == Property::Onoff {
            for (direction, on) in [("on", true), ("off", false)] {
                let id = self.writer(member, Some(direction));
                let script = self.queued(
                    &id,
                    vec![
                        stamp(guard),
                        Action::service(turn_service(member.domain(), on), member.to_string()),
                    ],
                );
                self.doc.add_script(&id, script);
            }
            return;
        }

        let (Some(service), Some(key)) = (spec.service, spec.data_key) else {
            return;
        };
        let id = self.writer(member, None);
        let script = self.queued(
            &id,
            vec![
                stamp(guard),
                Action::service(service, member.to_string()).with_data(key, "{{ value }}"),
            ],
        );
        self.doc.add_script(&id, script);
    }

    /// Device to proxy, ignoring writes stamped by this member's writers.
    fn upstream(&self, member: &EntityId, guard: &GeneratedId) -> AutomationConfig<Action> {
        let spec = self.property.spec();
        let proxy = self.proxy.entity_id();
        let id = naming::sync_upstream_automation(
            &self.package,
            &self.sync.name,
            self.property,
            member,
        );

        let trigger = match spec.attribute {
            None => Trigger::state(member.to_string()).to(on_off()),
            Some(attr) => Trigger::state(member.to_string()).attribute(attr),
        };

        let mut automation = AutomationConfig::new(id, ExecutionMode::Queued)
            .with_max(self.options.sync_max_queued)
            .trigger(trigger);

        let cells = BTreeMap::from([(member.clone(), vec![guard.clone()])]);
        if let Some(template) = guard_template(&cells) {
            automation = automation.condition(Condition::template(template));
        }

        let action = match (spec.proxy, spec.attribute) {
            (ProxyKind::Boolean, None) => {
                let (on, off) = if self.sync.is_inverted(member) {
                    ("input_boolean.turn_off", "input_boolean.turn_on")
                } else {
                    ("input_boolean.turn_on", "input_boolean.turn_off")
                };
                either(
                    "{{ trigger.to_state.state == 'on' }}",
                    Action::service(on, proxy.clone()),
                    Action::service(off, proxy),
                )
            }
            (ProxyKind::Boolean, Some(attr)) => either(
                format!("{{{{ state_attr(trigger.entity_id, {}) | bool }}}}", quote(attr)),
                Action::service("input_boolean.turn_on", proxy.clone()),
                Action::service("input_boolean.turn_off", proxy),
            ),
            (kind, attr) => {
                let attr = quote(attr.unwrap_or_default());
                let read = format!("state_attr(trigger.entity_id, {attr})");
                let service = format!("{}.set_value", kind.family());
                let write = Action::service(service, proxy)
                    .with_data("value", format!("{{{{ {read} }}}}"));
                Action::when(
                    vec![Condition::template(format!("{{{{ {read} is not none }}}}"))],
                    vec![write],
                )
            }
        };

        automation.action(action)
    }

    /// Proxy to every member whose value differs.
    fn downstream(&self) -> AutomationConfig<Action> {
        let spec = self.property.spec();
        let proxy = self.proxy.entity_id();
        let id = naming::sync_downstream_automation(&self.package, &self.sync.name, self.property);

        let trigger = match spec.proxy {
            ProxyKind::Boolean => Trigger::state(proxy.clone()).to(on_off()),
            _ => Trigger::state(proxy.clone()),
        };
        let mut automation = AutomationConfig::new(id, ExecutionMode::Queued)
            .with_max(self.options.sync_max_queued)
            .trigger(trigger);

        for member in &self.sync.members {
            let action = match (spec.proxy, spec.attribute) {
                (ProxyKind::Boolean, None) => self.push_onoff(member, &proxy),
                (kind, attr) => self.push_value(member, &proxy, kind, attr.unwrap_or_default()),
            };
            automation = automation.action(action);
        }
        automation
    }

    fn push_onoff(&self, member: &EntityId, proxy: &str) -> Action {
        let inverted = self.sync.is_inverted(member);
        let options = ON_OFF
            .iter()
            .map(|&proxy_state| {
                let want_on = (proxy_state == "on") != inverted;
                let want = if want_on { "on" } else { "off" };
                ChooseOption {
                    conditions: vec![
                        Condition::state(proxy, proxy_state),
                        Condition::not(Condition::state(member.to_string(), want)),
                    ],
                    sequence: vec![Action::call(self.writer(member, Some(want)).entity_id())],
                }
            })
            .collect();
        Action::Choose(ChooseAction {
            alias: None,
            choose: options,
            default: Vec::new(),
        })
    }

    fn push_value(&self, member: &EntityId, proxy: &str, kind: ProxyKind, attr: &str) -> Action {
        let proxy = quote(proxy);
        let current = format!("state_attr({}, {})", quote(&member.to_string()), quote(attr));
        let (differs, value) = match kind {
            ProxyKind::Number { step, .. } => {
                let cast = if step >= 1.0 { "int" } else { "float" };
                (
                    format!("(states({proxy}) | float(0)) != ({current} | float(0))"),
                    format!("states({proxy}) | {cast}(0)"),
                )
            }
            ProxyKind::Text { .. } => (
                format!("states({proxy}) != {current}"),
                format!("states({proxy})"),
            ),
            ProxyKind::Boolean => (
                format!("is_state({proxy}, 'on') != ({current} | bool)"),
                format!("is_state({proxy}, 'on')"),
            ),
        };
        Action::when(
            vec![Condition::template(format!("{{{{ {differs} }}}}"))],
            vec![Action::call(self.writer(member, None).entity_id())
                .with_data("value", format!("{{{{ {value} }}}}"))],
        )
    }
}

fn on_off() -> StateMatch {
    StateMatch::List(ON_OFF.iter().map(|s| s.to_string()).collect())
}

fn either(test: impl Into<String>, then: Action, otherwise: Action) -> Action {
    Action::Choose(ChooseAction {
        alias: None,
        choose: vec![ChooseOption {
            conditions: vec![Condition::template(test)],
            sequence: vec![then],
        }],
        default: vec![otherwise],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassl_core::ast::SyncKind;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    fn group(kind: SyncKind, members: &[&str], invert: &[&str], props: &[Property]) -> SyncGroup {
        SyncGroup {
            name: "ksync".into(),
            kind,
            members: members.iter().map(|m| id(m)).collect(),
            invert: invert.iter().map(|m| id(m)).collect(),
            properties: props.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn lowered(sync: &SyncGroup) -> Document {
        let mut doc = Document::new("home");
        lower_sync(&mut doc, sync, &GeneratorOptions::default());
        doc
    }

    #[test]
    fn test_onoff_sync_shape() {
        let sync = group(
            SyncKind::Onoff,
            &["light.kitchen", "switch.kitchen_fan"],
            &[],
            &[Property::Onoff],
        );
        let doc = lowered(&sync);

        assert_eq!(doc.helpers.input_boolean.len(), 1);
        assert!(doc.helpers.input_boolean["hassl_sync__home__ksync__onoff"]
            .initial
            .is_none());
        assert_eq!(doc.helpers.input_text.len(), 2);
        assert_eq!(doc.scripts.len(), 4);
        assert_eq!(doc.automations.len(), 3);

        let writer = &doc.scripts["hassl_write__home__ksync__switch__kitchen_fan__onoff__off"];
        assert_eq!(
            serde_json::to_value(&writer.sequence).unwrap(),
            json!([
                {
                    "service": "input_text.set_value",
                    "target": {"entity_id": ["input_text.hassl_ctx__switch__kitchen_fan"]},
                    "data": {"value": "{{ context.id }}"}
                },
                {"service": "switch.turn_off", "target": {"entity_id": ["switch.kitchen_fan"]}}
            ])
        );
    }

    #[test]
    fn test_upstream_is_guarded() {
        let sync = group(SyncKind::Onoff, &["light.a", "light.b"], &[], &[Property::Onoff]);
        let doc = lowered(&sync);
        let upstream = doc
            .automation("hassl_sync__home__ksync__onoff__upstream__light__a")
            .unwrap();
        let value = serde_json::to_value(upstream).unwrap();

        assert_eq!(value["mode"], json!("queued"));
        assert_eq!(value["max"], json!(10));
        assert_eq!(
            value["triggers"],
            json!([{"trigger": "state", "entity_id": "light.a", "to": ["on", "off"]}])
        );
        let guard = value["conditions"][0]["value_template"].as_str().unwrap();
        assert!(guard.contains("'light.a': [states('input_text.hassl_ctx__light__a')]"));
    }

    #[test]
    fn test_inverted_member() {
        let sync = group(
            SyncKind::Onoff,
            &["light.a", "switch.night_mode"],
            &["switch.night_mode"],
            &[Property::Onoff],
        );
        let doc = lowered(&sync);

        let upstream = doc
            .automation("hassl_sync__home__ksync__onoff__upstream__switch__night_mode")
            .unwrap();
        let value = serde_json::to_value(upstream).unwrap();
        assert_eq!(
            value["actions"][0]["choose"][0]["sequence"][0]["service"],
            json!("input_boolean.turn_off")
        );

        let downstream = doc
            .automation("hassl_sync__home__ksync__onoff__downstream")
            .unwrap();
        let value = serde_json::to_value(downstream).unwrap();
        // proxy on -> inverted member off
        assert_eq!(
            value["actions"][1]["choose"][0],
            json!({
                "conditions": [
                    {"condition": "state", "entity_id": "input_boolean.hassl_sync__home__ksync__onoff",
                     "state": "on"},
                    {"condition": "not", "conditions": [
                        {"condition": "state", "entity_id": "switch.night_mode", "state": "off"}
                    ]}
                ],
                "sequence": [
                    {"service": "script.hassl_write__home__ksync__switch__night_mode__onoff__off"}
                ]
            })
        );
    }

    #[test]
    fn test_brightness_sync() {
        let sync = group(
            SyncKind::Dimmer,
            &["light.a", "light.b"],
            &[],
            &[Property::Onoff, Property::Brightness],
        );
        let doc = lowered(&sync);

        assert_eq!(doc.helpers.input_number.len(), 1);
        // onoff and brightness each get a guard per member
        assert_eq!(doc.helpers.input_text.len(), 4);
        assert_eq!(doc.automations.len(), 6);

        let writer = &doc.scripts["hassl_write__home__ksync__light__b__brightness"];
        assert_eq!(
            serde_json::to_value(&writer.sequence[1]).unwrap(),
            json!({
                "service": "light.turn_on",
                "target": {"entity_id": ["light.b"]},
                "data": {"brightness": "{{ value }}"}
            })
        );

        let upstream = doc
            .automation("hassl_sync__home__ksync__brightness__upstream__light__b")
            .unwrap();
        let value = serde_json::to_value(upstream).unwrap();
        assert_eq!(value["triggers"][0]["attribute"], json!("brightness"));

        let downstream = doc
            .automation("hassl_sync__home__ksync__brightness__downstream")
            .unwrap();
        let value = serde_json::to_value(downstream).unwrap();
        assert_eq!(
            value["actions"][0]["choose"][0]["sequence"][0]["data"]["value"],
            json!("{{ states('input_number.hassl_sync__home__ksync__brightness') | int(0) }}")
        );
    }

    #[test]
    fn test_mute_uses_bool_comparison() {
        let sync = group(
            SyncKind::Shared,
            &["media_player.a", "media_player.b"],
            &[],
            &[Property::Mute],
        );
        let doc = lowered(&sync);
        let downstream = doc
            .automation("hassl_sync__home__ksync__mute__downstream")
            .unwrap();
        let value = serde_json::to_value(downstream).unwrap();
        assert_eq!(
            value["actions"][0]["choose"][0]["conditions"][0]["value_template"],
            json!(
                "{{ is_state('input_boolean.hassl_sync__home__ksync__mute', 'on') != \
                 (state_attr('media_player.a', 'is_volume_muted') | bool) }}"
            )
        );
    }
}
