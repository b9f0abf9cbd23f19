//! Effective permissions index
//!
//! The aggregated, read-only view of every policy that applies to a subject:
//! allow and deny tables keyed by resource name pattern and policy id, plus
//! a namespace index of the patterns seen per resource type.

use crate::nrn::ResourceName;
use crate::policy::{PolicyEffect, RolePolicy};
use crate::types::PolicyId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Policies keyed by resource name pattern, then by policy id
pub type PoliciesByPattern = HashMap<ResourceName, HashMap<PolicyId, RolePolicy>>;

/// Effective permissions for a subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    /// Resource type -> distinct patterns, in first-seen order
    #[serde(default)]
    pub(crate) namespaces: HashMap<String, Vec<ResourceName>>,

    /// Allow policies
    #[serde(default)]
    pub(crate) allow_policies: PoliciesByPattern,

    /// Deny policies
    #[serde(default)]
    pub(crate) deny_policies: PoliciesByPattern,
}

impl EffectivePermissions {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow table
    pub fn allow_policies(&self) -> &PoliciesByPattern {
        &self.allow_policies
    }

    /// Deny table
    pub fn deny_policies(&self) -> &PoliciesByPattern {
        &self.deny_policies
    }

    /// Table for an effect
    pub fn policies(&self, effect: PolicyEffect) -> &PoliciesByPattern {
        match effect {
            PolicyEffect::Allow => &self.allow_policies,
            PolicyEffect::Deny => &self.deny_policies,
        }
    }

    /// Namespace index
    pub fn namespaces(&self) -> &HashMap<String, Vec<ResourceName>> {
        &self.namespaces
    }

    /// Patterns observed for a resource type
    pub fn patterns_for_type(&self, resource_type: &str) -> &[ResourceName] {
        self.namespaces
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up a single policy
    pub fn policy(&self, effect: PolicyEffect, pattern: &str, id: PolicyId) -> Option<&RolePolicy> {
        self.policies(effect).get(pattern)?.get(&id)
    }

    /// Total number of indexed policies across both tables
    pub fn policy_count(&self) -> usize {
        self.allow_policies.values().map(HashMap::len).sum::<usize>()
            + self.deny_policies.values().map(HashMap::len).sum::<usize>()
    }

    /// Returns true if neither table holds a policy
    pub fn is_empty(&self) -> bool {
        self.policy_count() == 0
    }

    /// Policies of `effect` whose pattern contains `resource` and which list `action`
    ///
    /// Conditions are not evaluated here.
    pub fn candidates<'a>(
        &'a self,
        effect: PolicyEffect,
        resource: &'a ResourceName,
        action: &'a str,
    ) -> impl Iterator<Item = &'a RolePolicy> + 'a {
        self.policies(effect)
            .iter()
            .filter(move |(pattern, _)| pattern.contains_name(resource))
            .flat_map(|(_, policies)| policies.values())
            .filter(move |policy| policy.has_action(action))
    }

    pub(crate) fn table_mut(&mut self, effect: PolicyEffect) -> &mut PoliciesByPattern {
        match effect {
            PolicyEffect::Allow => &mut self.allow_policies,
            PolicyEffect::Deny => &mut self.deny_policies,
        }
    }

    /// Append `pattern` under its resource type
    ///
    /// Callers offer each pattern once; patterns without a derivable type
    /// are skipped.
    pub(crate) fn record_namespace(&mut self, pattern: &ResourceName) {
        let Ok(resource_type) = pattern.resource_type() else {
            return;
        };

        self.namespaces
            .entry(resource_type.to_string())
            .or_default()
            .push(pattern.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyRecord;

    fn policy(id: PolicyId, effect: PolicyEffect, action: &str, resource: &str) -> RolePolicy {
        let record = PolicyRecord::new(id, effect.as_str(), vec![action.to_string()], resource);
        RolePolicy::from_record(&record, effect)
    }

    fn insert(perms: &mut EffectivePermissions, policy: RolePolicy) {
        perms.record_namespace(&policy.resource);
        perms
            .table_mut(policy.effect)
            .entry(policy.resource.clone())
            .or_default()
            .insert(policy.id, policy);
    }

    #[test]
    fn test_empty_permissions() {
        let perms = EffectivePermissions::new();
        assert!(perms.is_empty());
        assert_eq!(perms.policy_count(), 0);
        assert!(perms.patterns_for_type("zone").is_empty());
    }

    #[test]
    fn test_lookup_and_counts() {
        let mut perms = EffectivePermissions::new();
        insert(&mut perms, policy(1, PolicyEffect::Allow, "delete", "oso:0:zone/*"));
        insert(&mut perms, policy(2, PolicyEffect::Deny, "delete", "oso:0:zone/foo.com"));

        assert_eq!(perms.policy_count(), 2);
        assert!(perms.policy(PolicyEffect::Allow, "oso:0:zone/*", 1).is_some());
        assert!(perms.policy(PolicyEffect::Deny, "oso:0:zone/*", 1).is_none());
        assert_eq!(perms.patterns_for_type("zone").len(), 2);
    }

    #[test]
    fn test_namespace_skips_untyped_patterns() {
        let mut perms = EffectivePermissions::new();
        insert(&mut perms, policy(1, PolicyEffect::Allow, "view", "oso:0:zone/*"));
        insert(&mut perms, policy(2, PolicyEffect::Allow, "delete", "oso:0:zone/foo.com"));
        insert(&mut perms, policy(3, PolicyEffect::Allow, "view", "malformed"));

        assert_eq!(
            perms.patterns_for_type("zone"),
            &[
                ResourceName::from("oso:0:zone/*"),
                ResourceName::from("oso:0:zone/foo.com"),
            ]
        );
        assert_eq!(perms.namespaces().len(), 1);
        assert_eq!(perms.policy_count(), 3);
    }

    #[test]
    fn test_candidates_filter_by_pattern_and_action() {
        let mut perms = EffectivePermissions::new();
        insert(&mut perms, policy(1, PolicyEffect::Allow, "view", "oso:0:zone/*"));
        insert(&mut perms, policy(2, PolicyEffect::Allow, "delete", "oso:0:zone/*"));
        insert(&mut perms, policy(3, PolicyEffect::Allow, "view", "oso:1:zone/*"));

        let target = ResourceName::from("oso:0:zone/foo.com");
        let ids: Vec<_> = perms
            .candidates(PolicyEffect::Allow, &target, "view")
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }
}
