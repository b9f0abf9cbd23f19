//! Aggregation of denormalized role/policy/condition rows
//!
//! The backing store returns one row per (role, policy, condition) triple.
//! [`aggregate`] folds those rows into an [`EffectivePermissions`] index in a
//! single pass:
//!
//! 1. The row's effect selects the allow or deny table; any other effect
//!    drops the row.
//! 2. The policy is inserted once per (pattern, policy id); later rows for
//!    the same policy only contribute conditions.
//! 3. Conditions are merged by id, so repeated rows are idempotent.
//!
//! The result does not depend on row order. Resource names are stored as-is
//! and validated only when queried.

use crate::condition::Condition;
use crate::nrn::ResourceName;
use crate::permissions::EffectivePermissions;
use crate::policy::{PolicyRecord, RolePolicy};
use crate::types::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Flattened (role, policy, condition) join record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenormalizedRow {
    /// Role the policy is attached to
    pub role_id: RoleId,

    /// Full policy payload
    pub policy: PolicyRecord,

    /// One attached condition, `None` when the policy has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl DenormalizedRow {
    /// Create a row without a condition
    pub fn new(role_id: RoleId, policy: PolicyRecord) -> Self {
        Self {
            role_id,
            policy,
            condition: None,
        }
    }

    /// Attach a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Incremental builder behind [`aggregate`]
#[derive(Debug, Default)]
pub struct Aggregator {
    permissions: EffectivePermissions,
    /// Patterns already offered to the namespace index
    indexed: HashSet<ResourceName>,
    rows: usize,
    dropped: usize,
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row into the index
    pub fn push(&mut self, row: &DenormalizedRow) {
        self.rows += 1;

        let Some(effect) = row.policy.parsed_effect() else {
            warn!(
                "Skipping policy {} on role {}: unknown effect '{}'",
                row.policy.id, row.role_id, row.policy.effect
            );
            self.dropped += 1;
            return;
        };

        let policy = self
            .permissions
            .table_mut(effect)
            .entry(row.policy.resource.clone())
            .or_default()
            .entry(row.policy.id)
            .or_insert_with(|| RolePolicy::from_record(&row.policy, effect));

        match &row.condition {
            Some(condition) if condition.id != 0 => policy.insert_condition(condition.clone()),
            Some(_) => debug!("Ignoring condition with id 0 on policy {}", row.policy.id),
            None => {}
        }

        if !self.indexed.contains(&row.policy.resource) {
            self.indexed.insert(row.policy.resource.clone());
            self.permissions.record_namespace(&row.policy.resource);
        }
    }

    /// Finish aggregation
    pub fn finish(self) -> EffectivePermissions {
        debug!(
            "Aggregated {} rows into {} policies ({} dropped)",
            self.rows,
            self.permissions.policy_count(),
            self.dropped
        );
        self.permissions
    }
}

/// Collapse denormalized rows into effective permissions
pub fn aggregate<'a, I>(rows: I) -> EffectivePermissions
where
    I: IntoIterator<Item = &'a DenormalizedRow>,
{
    let mut aggregator = Aggregator::new();
    for row in rows {
        aggregator.push(row);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nrn::ResourceName;
    use crate::policy::PolicyEffect;

    fn row(policy_id: i64, effect: &str, action: &str, resource: &str) -> DenormalizedRow {
        DenormalizedRow::new(
            1,
            PolicyRecord::new(policy_id, effect, vec![action.to_string()], resource),
        )
    }

    #[test]
    fn test_empty_rows() {
        let perms = aggregate(&Vec::<DenormalizedRow>::new());
        assert!(perms.is_empty());
        assert!(perms.namespaces().is_empty());
    }

    #[test]
    fn test_single_allow_policy() {
        let rows = vec![row(1, "allow", "view", "oso:0:zone/*")];
        let perms = aggregate(&rows);

        let policy = perms.policy(PolicyEffect::Allow, "oso:0:zone/*", 1).unwrap();
        assert_eq!(policy.actions, vec!["view".to_string()]);
        assert!(policy.conditions.is_empty());
        assert!(perms.deny_policies().is_empty());
    }

    #[test]
    fn test_conditions_merge_across_rows() {
        let rows = vec![
            row(1, "allow", "view", "oso:0:zone/foo")
                .with_condition(Condition::new(1, "matchSuffix", "com")),
            row(1, "allow", "view", "oso:0:zone/foo")
                .with_condition(Condition::new(2, "matchPrefix", "foo")),
        ];
        let perms = aggregate(&rows);

        assert_eq!(perms.allow_policies()["oso:0:zone/foo"].len(), 1);
        let policy = perms.policy(PolicyEffect::Allow, "oso:0:zone/foo", 1).unwrap();
        assert_eq!(policy.conditions.len(), 2);
        assert_eq!(policy.conditions[&1].kind, "matchSuffix");
        assert_eq!(policy.conditions[&2].kind, "matchPrefix");
    }

    #[test]
    fn test_unknown_effect_is_dropped() {
        let rows = vec![
            row(1, "audit", "view", "oso:0:zone/*"),
            row(2, "Allow", "view", "oso:0:zone/*"),
        ];
        let perms = aggregate(&rows);

        assert!(perms.is_empty());
        assert!(perms.allow_policies().is_empty());
        assert!(perms.deny_policies().is_empty());
        assert!(perms.namespaces().is_empty());
    }

    #[test]
    fn test_zero_condition_id_is_never_materialized() {
        let rows = vec![row(1, "deny", "delete", "oso:0:zone/foo.com")
            .with_condition(Condition::new(0, "matchSuffix", "com"))];
        let perms = aggregate(&rows);

        let policy = perms.policy(PolicyEffect::Deny, "oso:0:zone/foo.com", 1).unwrap();
        assert!(policy.conditions.is_empty());
    }

    #[test]
    fn test_malformed_resource_names_are_kept() {
        let rows = vec![row(1, "allow", "view", "foo")];
        let perms = aggregate(&rows);

        assert!(perms.policy(PolicyEffect::Allow, "foo", 1).is_some());
        assert!(perms.namespaces().is_empty());
    }

    #[test]
    fn test_namespaces_index() {
        let rows = vec![
            row(1, "allow", "delete", "oso:0:zone/*"),
            row(2, "deny", "delete", "oso:0:zone/foo.com"),
            row(3, "allow", "view", "oso:0:user/*"),
        ];
        let perms = aggregate(&rows);

        assert_eq!(perms.patterns_for_type("zone").len(), 2);
        assert_eq!(perms.patterns_for_type("user"), &[ResourceName::from("oso:0:user/*")]);
    }

    #[test]
    fn test_namespace_patterns_are_distinct_across_tables() {
        let rows = vec![
            row(1, "allow", "view", "oso:0:zone/*"),
            row(2, "allow", "delete", "oso:0:zone/*"),
            row(3, "deny", "delete", "oso:0:zone/*"),
            row(4, "allow", "view", "oso:0:zone/foo.com"),
            row(1, "allow", "view", "oso:0:zone/*"),
        ];
        let perms = aggregate(&rows);

        assert_eq!(
            perms.patterns_for_type("zone"),
            &[
                ResourceName::from("oso:0:zone/*"),
                ResourceName::from("oso:0:zone/foo.com"),
            ]
        );
    }

    #[test]
    fn test_many_distinct_patterns_indexed_once_each() {
        let rows: Vec<_> = (0..2_000)
            .map(|i| row(i, "allow", "view", &format!("oso:0:zone/{}.com", i)))
            .chain((0..2_000).map(|i| row(i, "allow", "view", &format!("oso:0:zone/{}.com", i))))
            .collect();
        let perms = aggregate(&rows);

        let zone = perms.patterns_for_type("zone");
        assert_eq!(zone.len(), 2_000);
        assert_eq!(zone[0], ResourceName::from("oso:0:zone/0.com"));
        assert_eq!(zone[1_999], ResourceName::from("oso:0:zone/1999.com"));
    }
}
