//! Authorization decision types and the deny-wins decision function

use crate::condition::MatcherRegistry;
use crate::nrn::ResourceName;
use crate::permissions::EffectivePermissions;
use crate::policy::{PolicyEffect, RolePolicy};
use crate::types::{PolicyId, Resource, Subject, SubjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Outcome of evaluating a request against effective permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// An allow policy matched and no deny policy did
    Allow,

    /// A deny policy matched
    Deny,

    /// Nothing matched; callers must treat this as a denial
    NoMatch,
}

impl Decision {
    /// Returns true only for [`Decision::Allow`]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::NoMatch => "no_match",
        };
        f.write_str(s)
    }
}

/// Reason for a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// A policy matched the resource, action and conditions
    PolicyMatch { reason: String },

    /// No policy matched, default deny applies
    DefaultDecision { reason: String },
}

/// Decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Unique decision ID
    pub id: String,

    /// Subject the decision was made for
    pub subject_id: SubjectId,

    /// Final decision
    pub decision: Decision,

    /// Policy that produced the decision, if any
    pub policy_id: Option<PolicyId>,

    /// Pattern under which the deciding policy is indexed
    pub pattern: Option<ResourceName>,

    /// Reason for the decision
    pub reason: DecisionReason,

    /// Decision timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl Verdict {
    fn matched(subject_id: SubjectId, decision: Decision, policy: &RolePolicy) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id,
            decision,
            policy_id: Some(policy.id),
            pattern: Some(policy.resource.clone()),
            reason: DecisionReason::PolicyMatch {
                reason: format!(
                    "Policy {} ({}) on {} matched",
                    policy.id, policy.effect, policy.resource
                ),
            },
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn no_match(subject_id: SubjectId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id,
            decision: Decision::NoMatch,
            policy_id: None,
            pattern: None,
            reason: DecisionReason::DefaultDecision {
                reason: "No matching policy, default deny".to_string(),
            },
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Returns true only if the request is allowed
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// Decide a request against a subject's effective permissions
///
/// Deny policies are scanned first and win outright. Otherwise a matching
/// allow policy allows. Otherwise the result is [`Decision::NoMatch`].
///
/// A policy matches when its pattern contains the resource name, it lists
/// `action` and every attached condition holds for `resource.name`. When
/// several policies of the winning effect match, the one with the lowest
/// (policy id, pattern) is reported.
pub fn decide(
    perms: &EffectivePermissions,
    matchers: &MatcherRegistry,
    subject: &Subject,
    action: &str,
    resource: &Resource,
) -> Verdict {
    for (effect, decision) in [
        (PolicyEffect::Deny, Decision::Deny),
        (PolicyEffect::Allow, Decision::Allow),
    ] {
        if let Some(policy) = first_match(perms, matchers, effect, action, resource) {
            debug!(
                "Subject {} {} {} on {}: policy {} under {}",
                subject.id, decision, action, resource.resource_name, policy.id, policy.resource
            );
            return Verdict::matched(subject.id, decision, policy);
        }
    }

    debug!(
        "Subject {} {} on {}: no matching policy",
        subject.id, action, resource.resource_name
    );
    Verdict::no_match(subject.id)
}

fn first_match<'a>(
    perms: &'a EffectivePermissions,
    matchers: &MatcherRegistry,
    effect: PolicyEffect,
    action: &'a str,
    resource: &'a Resource,
) -> Option<&'a RolePolicy> {
    perms
        .candidates(effect, &resource.resource_name, action)
        .filter(|policy| matchers.evaluate_all(policy.conditions.values(), &resource.name))
        .min_by(|a, b| a.id.cmp(&b.id).then_with(|| a.resource.cmp(&b.resource)))
}
