//! Policy conditions and the matchers that evaluate them
//!
//! A condition narrows a policy: its `type` selects a [`Matcher`] and its
//! `value` is handed to that matcher together with a field of the resource
//! being accessed. Unknown condition types never match.

pub mod matchers;

pub use matchers::{Matcher, MatcherRegistry, PrefixMatcher, SuffixMatcher, MATCH_PREFIX, MATCH_SUFFIX};

use crate::types::ConditionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Condition attached to a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition identifier, unique per policy
    pub id: ConditionId,

    /// Discriminator selecting the matcher (e.g., "matchSuffix")
    #[serde(rename = "type")]
    pub kind: String,

    /// Matcher-specific value
    pub value: Value,
}

impl Condition {
    /// Create a new condition
    pub fn new(id: ConditionId, kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id,
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Build a condition from a join column set where a missing or zero id
    /// stands for "no condition"
    pub fn from_sentinel(
        id: Option<ConditionId>,
        kind: Option<String>,
        value: Option<Value>,
    ) -> Option<Self> {
        match id {
            Some(id) if id != 0 => Some(Self {
                id,
                kind: kind.unwrap_or_default(),
                value: value.unwrap_or(Value::Null),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_creation() {
        let condition = Condition::new(1, MATCH_SUFFIX, "com");
        assert_eq!(condition.id, 1);
        assert_eq!(condition.kind, "matchSuffix");
        assert_eq!(condition.value, Value::String("com".to_string()));
    }

    #[test]
    fn test_from_sentinel() {
        assert!(Condition::from_sentinel(None, None, None).is_none());
        assert!(Condition::from_sentinel(Some(0), Some("matchSuffix".into()), None).is_none());

        let condition = Condition::from_sentinel(
            Some(7),
            Some("matchPrefix".to_string()),
            Some(Value::String("foo".to_string())),
        )
        .unwrap();
        assert_eq!(condition.id, 7);
        assert_eq!(condition.kind, "matchPrefix");
    }

    #[test]
    fn test_condition_serde_uses_type_key() {
        let condition: Condition =
            serde_json::from_str(r#"{"id": 2, "type": "matchSuffix", "value": "net"}"#).unwrap();
        assert_eq!(condition, Condition::new(2, "matchSuffix", "net"));
    }
}
