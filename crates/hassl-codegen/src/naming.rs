//! Deterministic identifiers
//!
//! Every generated object id comes from [`slug`], so regenerating the same
//! module always yields the same names and an edited module only renames
//! what actually changed.

use hassl_core::{EntityId, Property, HASSL_PREFIX};
use std::fmt;

/// Lowercase `s`, mapping every character outside `[a-z0-9]` to `_`.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `hassl_<kind>__<part>__<part>...`, skipping empty parts.
pub fn slug(kind: &str, parts: &[&str]) -> String {
    let mut out = format!("{HASSL_PREFIX}_{kind}");
    for part in parts.iter().filter(|p| !p.is_empty()) {
        out.push_str("__");
        out.push_str(&sanitize(part));
    }
    out
}

/// A generated entity: helper cell, script or sensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratedId {
    pub domain: &'static str,
    pub object_id: String,
}

impl GeneratedId {
    fn new(domain: &'static str, object_id: String) -> Self {
        Self { domain, object_id }
    }

    pub fn entity_id(&self) -> String {
        format!("{}.{}", self.domain, self.object_id)
    }
}

impl fmt::Display for GeneratedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

pub fn gate_cell(package: &str, rule: &str) -> GeneratedId {
    GeneratedId::new("input_boolean", slug("gate", &[package, rule]))
}

pub fn schedule_cell(package: &str, schedule: &str) -> GeneratedId {
    GeneratedId::new("input_boolean", slug("schedule", &[package, schedule]))
}

/// Scope name of a rule's inline schedule, used in place of a schedule name
pub fn inline_schedule_name(rule: &str) -> String {
    format!("rule__{rule}")
}

pub fn sync_proxy(package: &str, sync: &str, property: Property) -> GeneratedId {
    GeneratedId::new(
        property.spec().proxy.family(),
        slug("sync", &[package, sync, property.as_str()]),
    )
}

/// Guard stamped by sync writers. On/off shares the entity-wide cell.
pub fn sync_guard(entity: &EntityId, property: Property) -> GeneratedId {
    let entity = entity.slug();
    let prop = match property {
        Property::Onoff => "",
        other => other.as_str(),
    };
    GeneratedId::new("input_text", slug("ctx", &[entity.as_str(), prop]))
}

pub fn rule_guard(package: &str, rule: &str, entity: &EntityId) -> GeneratedId {
    let entity = entity.slug();
    GeneratedId::new("input_text", slug("rctx", &[package, rule, entity.as_str()]))
}

pub fn tag_cell(package: &str, name: &str) -> GeneratedId {
    GeneratedId::new("input_text", slug("tag", &[package, name]))
}

/// Sync writer script; on/off properties get one script per direction.
pub fn sync_writer(
    package: &str,
    sync: &str,
    entity: &EntityId,
    property: Property,
    direction: Option<&str>,
) -> GeneratedId {
    let entity = entity.slug();
    GeneratedId::new(
        "script",
        slug(
            "write",
            &[
                package,
                sync,
                entity.as_str(),
                property.as_str(),
                direction.unwrap_or_default(),
            ],
        ),
    )
}

/// Rule writer script; `suffix` is `on`, `off` or an attribute name.
pub fn rule_writer(package: &str, rule: &str, entity: &EntityId, suffix: &str) -> GeneratedId {
    let entity = entity.slug();
    GeneratedId::new("script", slug("rwrite", &[package, rule, entity.as_str(), suffix]))
}

/// Object id the platform derives from a configured `name`: lowercased,
/// every run of characters outside `[a-z0-9]` collapsed to one `_`, and
/// trimmed of leading and trailing `_`.
pub fn platform_object_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Configured `name` of a holiday set's holiday sensor
pub fn holiday_sensor_name(package: &str, id: &str) -> String {
    slug("holidays", &[package, id])
}

/// Configured `name` of a holiday set's workday sensor
pub fn workday_sensor_name(package: &str, id: &str) -> String {
    slug("holidays", &[package, id, "workday"])
}

/// Holiday sensor as conditions reference it.
///
/// Workday sensors are declared by `name` only, so the entity id is the
/// one the platform derives from that name.
pub fn holiday_sensor(package: &str, id: &str) -> GeneratedId {
    GeneratedId::new(
        "binary_sensor",
        platform_object_id(&holiday_sensor_name(package, id)),
    )
}

pub fn sync_upstream_automation(
    package: &str,
    sync: &str,
    property: Property,
    member: &EntityId,
) -> String {
    let member = member.slug();
    slug(
        "sync",
        &[package, sync, property.as_str(), "upstream", member.as_str()],
    )
}

pub fn sync_downstream_automation(package: &str, sync: &str, property: Property) -> String {
    slug("sync", &[package, sync, property.as_str(), "downstream"])
}

/// Automation for the `index`-th clause of a rule, counted from 1.
pub fn rule_automation(package: &str, rule: &str, index: usize) -> String {
    let index = index.to_string();
    slug("rule", &[package, rule, index.as_str()])
}

/// `phase` is `start`, `end` or `maintain`.
pub fn schedule_automation(package: &str, schedule: &str, phase: &str) -> String {
    slug("schedule", &[package, schedule, phase])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("std.shared"), "std_shared");
        assert_eq!(sanitize("Light-Kitchen 2"), "light_kitchen_2");
    }

    #[test]
    fn test_slug_skips_empty_parts() {
        assert_eq!(slug("gate", &["home", "", "motion"]), "hassl_gate__home__motion");
        assert_eq!(slug("x", &[]), "hassl_x");
    }

    #[test]
    fn test_cells() {
        assert_eq!(
            gate_cell("home", "motion").entity_id(),
            "input_boolean.hassl_gate__home__motion"
        );
        assert_eq!(
            schedule_cell("std.shared", "wake_hours").to_string(),
            "input_boolean.hassl_schedule__std_shared__wake_hours"
        );
        assert_eq!(
            schedule_cell("home", &inline_schedule_name("night")).object_id,
            "hassl_schedule__home__rule__night"
        );
        assert_eq!(
            sync_proxy("home", "ksync", Property::Brightness).entity_id(),
            "input_number.hassl_sync__home__ksync__brightness"
        );
    }

    #[test]
    fn test_guards() {
        let lamp = id("light.kitchen");
        assert_eq!(
            sync_guard(&lamp, Property::Onoff).entity_id(),
            "input_text.hassl_ctx__light__kitchen"
        );
        assert_eq!(
            sync_guard(&lamp, Property::Brightness).entity_id(),
            "input_text.hassl_ctx__light__kitchen__brightness"
        );
        assert_eq!(
            rule_guard("home", "motion", &lamp).entity_id(),
            "input_text.hassl_rctx__home__motion__light__kitchen"
        );
    }

    #[test]
    fn test_writers_and_automations() {
        let lamp = id("light.kitchen");
        assert_eq!(
            sync_writer("home", "ksync", &lamp, Property::Onoff, Some("on")).entity_id(),
            "script.hassl_write__home__ksync__light__kitchen__onoff__on"
        );
        assert_eq!(
            sync_writer("home", "ksync", &lamp, Property::Brightness, None).object_id,
            "hassl_write__home__ksync__light__kitchen__brightness"
        );
        assert_eq!(
            sync_upstream_automation("home", "ksync", Property::Onoff, &lamp),
            "hassl_sync__home__ksync__onoff__upstream__light__kitchen"
        );
        assert_eq!(
            rule_automation("home", "motion", 1),
            "hassl_rule__home__motion__1"
        );
        assert_eq!(
            schedule_automation("home", "wake_hours", "maintain"),
            "hassl_schedule__home__wake_hours__maintain"
        );
    }

    #[test]
    fn test_entity_segments_do_not_collide() {
        let a = id("light.a_b");
        let b = id("light_a.b");
        assert_eq!(
            sync_guard(&a, Property::Onoff).entity_id(),
            "input_text.hassl_ctx__light__a_b"
        );
        assert_ne!(
            sync_guard(&a, Property::Onoff),
            sync_guard(&b, Property::Onoff)
        );
        assert_ne!(
            rule_writer("home", "r", &a, "on"),
            rule_writer("home", "r", &b, "on")
        );
    }

    #[test]
    fn test_platform_object_id() {
        assert_eq!(
            platform_object_id("hassl_holidays__std_shared__us"),
            "hassl_holidays_std_shared_us"
        );
        assert_eq!(platform_object_id("  Office Hours!! "), "office_hours");
    }

    #[test]
    fn test_holiday_sensor_matches_its_name() {
        let sensor = holiday_sensor("home", "us");
        assert_eq!(sensor.entity_id(), "binary_sensor.hassl_holidays_home_us");
        assert_eq!(
            platform_object_id(&holiday_sensor_name("home", "us")),
            sensor.object_id
        );
    }
}
