//! Policy records and effect handling

use crate::condition::Condition;
use crate::nrn::ResourceName;
use crate::types::{ConditionId, PolicyId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Policy effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

impl PolicyEffect {
    /// Parse a stored effect string; anything other than `allow`/`deny` is `None`
    pub fn parse(effect: &str) -> Option<Self> {
        match effect {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }

    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for PolicyEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy payload as carried by a denormalized row
///
/// The effect is kept as the raw stored string so rows with an unknown
/// effect can be recognised and dropped during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Unique policy identifier
    pub id: PolicyId,

    /// Policy name
    #[serde(default)]
    pub name: String,

    /// Raw effect ("allow", "deny", or anything else)
    pub effect: String,

    /// Actions the policy applies to
    #[serde(default)]
    pub actions: Vec<String>,

    /// Resource name pattern
    pub resource: ResourceName,
}

impl PolicyRecord {
    /// Create a new policy record
    pub fn new(
        id: PolicyId,
        effect: impl Into<String>,
        actions: Vec<String>,
        resource: impl Into<ResourceName>,
    ) -> Self {
        Self {
            id,
            name: String::new(),
            effect: effect.into(),
            actions,
            resource: resource.into(),
        }
    }

    /// Set the policy name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Parsed effect, `None` when unknown
    pub fn parsed_effect(&self) -> Option<PolicyEffect> {
        PolicyEffect::parse(&self.effect)
    }
}

/// Fully merged policy with its complete condition set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Unique policy identifier
    pub id: PolicyId,

    /// Policy name
    #[serde(default)]
    pub name: String,

    /// Policy effect
    pub effect: PolicyEffect,

    /// Actions the policy applies to
    pub actions: Vec<String>,

    /// Resource name pattern
    pub resource: ResourceName,

    /// Conditions keyed by condition id
    #[serde(default)]
    pub conditions: HashMap<ConditionId, Condition>,
}

impl RolePolicy {
    /// Copy a policy record with an empty condition set
    pub fn from_record(record: &PolicyRecord, effect: PolicyEffect) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            effect,
            actions: record.actions.clone(),
            resource: record.resource.clone(),
            conditions: HashMap::new(),
        }
    }

    /// Insert or overwrite a condition by id
    pub fn insert_condition(&mut self, condition: Condition) {
        self.conditions.insert(condition.id, condition);
    }

    /// Returns true if the policy lists `action`
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

impl fmt::Display for RolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut condition_ids: Vec<_> = self.conditions.keys().collect();
        condition_ids.sort();
        write!(
            f,
            "ID: {} Effect: {} Actions: {:?} Resource: {} Conditions: {:?}",
            self.id, self.effect, self.actions, self.resource, condition_ids
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_parsing() {
        assert_eq!(PolicyEffect::parse("allow"), Some(PolicyEffect::Allow));
        assert_eq!(PolicyEffect::parse("deny"), Some(PolicyEffect::Deny));
        assert_eq!(PolicyEffect::parse("ALLOW"), None);
        assert_eq!(PolicyEffect::parse("audit"), None);
        assert_eq!(PolicyEffect::parse(""), None);
    }

    #[test]
    fn test_effect_serde() {
        assert_eq!(serde_json::to_string(&PolicyEffect::Deny).unwrap(), "\"deny\"");
        assert_eq!(PolicyEffect::Allow.to_string(), "allow");
    }

    #[test]
    fn test_role_policy_from_record() {
        let record = PolicyRecord::new(1, "allow", vec!["view".to_string()], "oso:0:zone/*")
            .with_name("viewZonesPolicy");

        let mut policy = RolePolicy::from_record(&record, PolicyEffect::Allow);
        assert!(policy.conditions.is_empty());
        assert!(policy.has_action("view"));
        assert!(!policy.has_action("delete"));

        policy.insert_condition(Condition::new(1, "matchSuffix", "com"));
        policy.insert_condition(Condition::new(1, "matchSuffix", "com"));
        assert_eq!(policy.conditions.len(), 1);
        assert_eq!(
            policy.to_string(),
            "ID: 1 Effect: allow Actions: [\"view\"] Resource: oso:0:zone/* Conditions: [1]"
        );
    }
}
