use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodegenError;

/// Absolute shape id: `namespace#Name` or `namespace#Name$member`.
///
/// Ordering is lexical over (namespace, name, member) which is what gives the
/// model its deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    namespace: String,
    name: String,
    member: Option<String>,
}

impl ShapeId {
    pub fn parse(raw: &str) -> Result<Self, CodegenError> {
        let invalid = || CodegenError::InvalidShapeId(raw.to_string());
        let (namespace, rest) = raw.split_once('#').ok_or_else(invalid)?;
        let (name, member) = match rest.split_once('$') {
            Some((name, member)) => (name, Some(member)),
            None => (rest, None),
        };
        if !namespace.split('.').all(is_identifier) || !is_identifier(name) {
            return Err(invalid());
        }
        if let Some(member) = member {
            if !is_identifier(member) {
                return Err(invalid());
            }
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            member: member.map(str::to_string),
        })
    }

    /// Infallible constructor for ids the crate itself owns (prelude, protocols).
    pub(crate) fn from_parts(namespace: &str, name: &str) -> Self {
        Self { namespace: namespace.to_string(), name: name.to_string(), member: None }
    }

    pub fn with_member(&self, member: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: Some(member.to_string()),
        }
    }

    /// The id of the aggregate shape a member id belongs to.
    pub fn without_member(&self) -> Self {
        Self { namespace: self.namespace.clone(), name: self.name.clone(), member: None }
    }

    pub fn namespace(&self) -> &str { &self.namespace }
    pub fn name(&self) -> &str { &self.name }
    pub fn member(&self) -> Option<&str> { self.member.as_deref() }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)?;
        if let Some(member) = &self.member {
            write!(f, "${member}")?;
        }
        Ok(())
    }
}

impl FromStr for ShapeId {
    type Err = CodegenError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl Serialize for ShapeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShapeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ShapeId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_member_ids() {
        let id = ShapeId::parse("com.example#Widget$id").unwrap();
        assert_eq!(id.namespace(), "com.example");
        assert_eq!(id.name(), "Widget");
        assert_eq!(id.member(), Some("id"));
        assert_eq!(id.to_string(), "com.example#Widget$id");
        assert_eq!(id.without_member().to_string(), "com.example#Widget");
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["Widget", "com.example#", "#Widget", "a#1b", "a#B$", "a..b#C"] {
            assert!(ShapeId::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn orders_members_after_their_container() {
        let a = ShapeId::parse("ns#A").unwrap();
        let a_x = ShapeId::parse("ns#A$x").unwrap();
        let b = ShapeId::parse("ns#B").unwrap();
        let mut ids = vec![b.clone(), a_x.clone(), a.clone()];
        ids.sort();
        assert_eq!(ids, vec![a, a_x, b]);
    }
}
