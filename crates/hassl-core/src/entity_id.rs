//! Fully-qualified device identifiers (`domain.object_id`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for malformed device identifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("'{0}' is not of the form domain.object_id")]
    InvalidFormat(String),

    #[error("'{0}' has an invalid domain (lowercase alphanumerics and single underscores only)")]
    InvalidDomain(String),

    #[error("'{0}' has an invalid object id (lowercase alphanumerics and underscores only)")]
    InvalidObjectId(String),
}

/// A device identifier such as `light.kitchen`.
///
/// Ordering is lexicographic on the rendered form so that collections of
/// identifiers iterate the same way on every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if !is_valid_part(&domain) || domain.contains("__") {
            return Err(EntityIdError::InvalidDomain(format!("{domain}.{object_id}")));
        }
        if !is_valid_part(&object_id) {
            return Err(EntityIdError::InvalidObjectId(format!(
                "{domain}.{object_id}"
            )));
        }

        Ok(Self { domain, object_id })
    }

    /// The domain part (`light` in `light.kitchen`)
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The object id part (`kitchen` in `light.kitchen`)
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Identifier flattened into one name segment (`light__kitchen`).
    ///
    /// Domains never contain `__`, so the first double underscore always
    /// marks the domain boundary and distinct identifiers never collide.
    pub fn slug(&self) -> String {
        format!("{}__{}", self.domain, self.object_id)
    }
}

// Neither empty nor starting/ending with an underscore.
fn is_valid_part(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => {
                Self::new(domain, object_id)
            }
            _ => Err(EntityIdError::InvalidFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: EntityId = "light.kitchen".parse().unwrap();
        assert_eq!(id.domain(), "light");
        assert_eq!(id.object_id(), "kitchen");
        assert_eq!(id.to_string(), "light.kitchen");
        assert_eq!(id.slug(), "light__kitchen");
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            "kitchen".parse::<EntityId>(),
            Err(EntityIdError::InvalidFormat(_))
        ));
        assert!(matches!(
            "a.b.c".parse::<EntityId>(),
            Err(EntityIdError::InvalidFormat(_))
        ));
        assert!(matches!(
            "Light.kitchen".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
        assert!(matches!(
            "light._kitchen".parse::<EntityId>(),
            Err(EntityIdError::InvalidObjectId(_))
        ));
        assert!(matches!(
            "my__light.kitchen".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_slug_keeps_domain_boundary() {
        let a: EntityId = "light.a_b".parse().unwrap();
        let b: EntityId = "light_a.b".parse().unwrap();
        assert_eq!(a.slug(), "light__a_b");
        assert_eq!(b.slug(), "light_a__b");
        assert_ne!(a.slug(), b.slug());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids: Vec<EntityId> = ["switch.b", "light.z", "light.a"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["light.a", "light.z", "switch.b"]);
    }

    #[test]
    fn test_serde_as_string() {
        let id: EntityId = "switch.kitchen_circuit".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"switch.kitchen_circuit\"");
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<EntityId>("\"nope\"").is_err());
    }
}
