use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a legal entity in the group.
///
/// A legal entity can be a sales company, a delivery company, a transit
/// ("borrowed name") intermediary, or any other company that owns a leg of
/// a cleared transaction.
///
/// # Examples
///
/// ```
/// use freight_clearing::core::entity::EntityId;
///
/// let shanghai = EntityId::new("CN-SHA-SALES");
/// let hongkong = EntityId::new("HK-TRANSIT");
/// assert_ne!(shanghai, hongkong);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity identifier.
    ///
    /// Convention: region prefix followed by an institution identifier
    /// (e.g., "CN-SHA-SALES", "HK-TRANSIT").
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this entity ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Geographic region an entity operates in, used by cross-border flows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_equality() {
        let a = EntityId::new("CN-SHA-SALES");
        let b = EntityId::new("CN-SHA-SALES");
        let c = EntityId::new("HK-TRANSIT");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entity_display() {
        let e = EntityId::new("SG-DELIVERY");
        assert_eq!(format!("{}", e), "SG-DELIVERY");
    }

    #[test]
    fn test_region_equality() {
        assert_eq!(Region::new("HK"), Region::from("HK"));
        assert_ne!(Region::new("HK"), Region::new("CN"));
    }
}
