//! Domain metadata
//!
//! Static tables describing which properties each device domain exposes and
//! how a property is mirrored into a helper cell, observed on the device and
//! written back through a service call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A controllable device property that a sync group can keep consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Onoff,
    Brightness,
    ColorTemp,
    Percentage,
    PresetMode,
    Volume,
    Mute,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Onoff => "onoff",
            Property::Brightness => "brightness",
            Property::ColorTemp => "color_temp",
            Property::Percentage => "percentage",
            Property::PresetMode => "preset_mode",
            Property::Volume => "volume",
            Property::Mute => "mute",
        }
    }

    /// Metadata for this property
    pub fn spec(&self) -> &'static PropertySpec {
        match self {
            Property::Onoff => &ONOFF,
            Property::Brightness => &BRIGHTNESS,
            Property::ColorTemp => &COLOR_TEMP,
            Property::Percentage => &PERCENTAGE,
            Property::PresetMode => &PRESET_MODE,
            Property::Volume => &VOLUME,
            Property::Mute => &MUTE,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the helper cell that mirrors a property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProxyKind {
    /// `input_boolean`
    Boolean,
    /// `input_number` with a slider range
    Number { min: f64, max: f64, step: f64 },
    /// `input_text`
    Text { max: u32 },
}

impl ProxyKind {
    /// Helper family the proxy cell lives in
    pub fn family(&self) -> &'static str {
        match self {
            ProxyKind::Boolean => "input_boolean",
            ProxyKind::Number { .. } => "input_number",
            ProxyKind::Text { .. } => "input_text",
        }
    }
}

/// How a property is proxied, observed and written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySpec {
    pub property: Property,
    pub proxy: ProxyKind,
    /// State attribute carrying the value; `None` means the entity state itself
    pub attribute: Option<&'static str>,
    /// Service used to write the value; `None` means turn_on/turn_off
    pub service: Option<&'static str>,
    /// Data key the value is passed under
    pub data_key: Option<&'static str>,
}

static ONOFF: PropertySpec = PropertySpec {
    property: Property::Onoff,
    proxy: ProxyKind::Boolean,
    attribute: None,
    service: None,
    data_key: None,
};

static BRIGHTNESS: PropertySpec = PropertySpec {
    property: Property::Brightness,
    proxy: ProxyKind::Number {
        min: 0.0,
        max: 255.0,
        step: 1.0,
    },
    attribute: Some("brightness"),
    service: Some("light.turn_on"),
    data_key: Some("brightness"),
};

static COLOR_TEMP: PropertySpec = PropertySpec {
    property: Property::ColorTemp,
    proxy: ProxyKind::Number {
        min: 150.0,
        max: 500.0,
        step: 1.0,
    },
    attribute: Some("color_temp"),
    service: Some("light.turn_on"),
    data_key: Some("color_temp"),
};

static PERCENTAGE: PropertySpec = PropertySpec {
    property: Property::Percentage,
    proxy: ProxyKind::Number {
        min: 0.0,
        max: 100.0,
        step: 1.0,
    },
    attribute: Some("percentage"),
    service: Some("fan.set_percentage"),
    data_key: Some("percentage"),
};

static PRESET_MODE: PropertySpec = PropertySpec {
    property: Property::PresetMode,
    proxy: ProxyKind::Text { max: 120 },
    attribute: Some("preset_mode"),
    service: Some("fan.set_preset_mode"),
    data_key: Some("preset_mode"),
};

static VOLUME: PropertySpec = PropertySpec {
    property: Property::Volume,
    proxy: ProxyKind::Number {
        min: 0.0,
        max: 1.0,
        step: 0.01,
    },
    attribute: Some("volume_level"),
    service: Some("media_player.volume_set"),
    data_key: Some("volume_level"),
};

static MUTE: PropertySpec = PropertySpec {
    property: Property::Mute,
    proxy: ProxyKind::Boolean,
    attribute: Some("is_volume_muted"),
    service: Some("media_player.volume_mute"),
    data_key: Some("is_volume_muted"),
};

/// Properties exposed by each controllable domain.
pub static DOMAIN_PROPERTIES: &[(&str, &[Property])] = &[
    (
        "light",
        &[Property::Onoff, Property::Brightness, Property::ColorTemp],
    ),
    ("switch", &[Property::Onoff]),
    (
        "fan",
        &[Property::Onoff, Property::Percentage, Property::PresetMode],
    ),
    (
        "media_player",
        &[Property::Onoff, Property::Volume, Property::Mute],
    ),
    ("input_boolean", &[Property::Onoff]),
];

/// Domains with their own turn_on/turn_off services
static ONOFF_DOMAINS: &[&str] = &["light", "switch", "fan", "media_player", "input_boolean"];

/// Property set for a domain; unknown domains expose nothing.
pub fn domain_properties(domain: &str) -> BTreeSet<Property> {
    DOMAIN_PROPERTIES
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, props)| props.iter().copied().collect())
        .unwrap_or_default()
}

/// On/off service for a domain (`light.turn_on`, `homeassistant.turn_off`, ...).
pub fn turn_service(domain: &str, on: bool) -> String {
    let action = if on { "turn_on" } else { "turn_off" };
    if ONOFF_DOMAINS.contains(&domain) {
        format!("{domain}.{action}")
    } else {
        format!("homeassistant.{action}")
    }
}

/// Write mapping for a single attribute assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWriter {
    pub service: String,
    pub data_key: String,
}

/// Resolve the service and data key that set `attr` on a `domain` device.
///
/// Looks for a property of the domain observed through `attr` (or named
/// `attr`). Anything else goes through `homeassistant.turn_on` with the
/// attribute passed verbatim.
pub fn attribute_writer(domain: &str, attr: &str) -> AttributeWriter {
    let found = domain_properties(domain).into_iter().find_map(|p| {
        let spec = p.spec();
        let matches = spec.attribute == Some(attr) || p.as_str() == attr;
        match (matches, spec.service, spec.data_key) {
            (true, Some(service), Some(key)) => Some(AttributeWriter {
                service: service.to_string(),
                data_key: key.to_string(),
            }),
            _ => None,
        }
    });

    found.unwrap_or_else(|| AttributeWriter {
        service: "homeassistant.turn_on".to_string(),
        data_key: attr.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_properties() {
        let light = domain_properties("light");
        assert_eq!(light.len(), 3);
        assert!(light.contains(&Property::ColorTemp));
        assert_eq!(
            domain_properties("switch").into_iter().collect::<Vec<_>>(),
            vec![Property::Onoff]
        );
        assert!(domain_properties("sensor").is_empty());
    }

    #[test]
    fn test_turn_service() {
        assert_eq!(turn_service("light", true), "light.turn_on");
        assert_eq!(turn_service("switch", false), "switch.turn_off");
        assert_eq!(turn_service("cover", true), "homeassistant.turn_on");
    }

    #[test]
    fn test_attribute_writer_by_domain() {
        let light = attribute_writer("light", "brightness");
        assert_eq!(light.service, "light.turn_on");
        assert_eq!(light.data_key, "brightness");

        let fan = attribute_writer("fan", "percentage");
        assert_eq!(fan.service, "fan.set_percentage");

        let volume = attribute_writer("media_player", "volume");
        assert_eq!(volume.service, "media_player.volume_set");
        assert_eq!(volume.data_key, "volume_level");
    }

    #[test]
    fn test_attribute_writer_fallback() {
        let w = attribute_writer("switch", "brightness");
        assert_eq!(w.service, "homeassistant.turn_on");
        assert_eq!(w.data_key, "brightness");
    }

    #[test]
    fn test_proxy_families() {
        assert_eq!(Property::Onoff.spec().proxy.family(), "input_boolean");
        assert_eq!(Property::Volume.spec().proxy.family(), "input_number");
        assert_eq!(Property::PresetMode.spec().proxy.family(), "input_text");
    }
}
