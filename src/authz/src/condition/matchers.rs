//! Condition matchers
//!
//! Every matcher receives the condition's stored value first and the runtime
//! field second. Matchers are total: a value they cannot interpret is a
//! non-match, never an error.

use super::Condition;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Condition type for [`SuffixMatcher`]
pub const MATCH_SUFFIX: &str = "matchSuffix";

/// Condition type for [`PrefixMatcher`]
pub const MATCH_PREFIX: &str = "matchPrefix";

/// Evaluates a condition value against a field value
pub trait Matcher: Send + Sync {
    /// Returns true if `field_value` satisfies `condition_value`
    fn matches(&self, condition_value: &Value, field_value: &str) -> bool;
}

/// Matches when the field ends with the condition value
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixMatcher;

impl Matcher for SuffixMatcher {
    fn matches(&self, condition_value: &Value, field_value: &str) -> bool {
        condition_value
            .as_str()
            .is_some_and(|suffix| field_value.ends_with(suffix))
    }
}

/// Matches when the field starts with the condition value
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixMatcher;

impl Matcher for PrefixMatcher {
    fn matches(&self, condition_value: &Value, field_value: &str) -> bool {
        condition_value
            .as_str()
            .is_some_and(|prefix| field_value.starts_with(prefix))
    }
}

/// Maps condition types to matchers
///
/// Shared by reference into decisions; cloning is cheap.
#[derive(Clone)]
pub struct MatcherRegistry {
    matchers: HashMap<String, Arc<dyn Matcher>>,
}

impl MatcherRegistry {
    /// Create an empty registry (every condition fails closed)
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in `matchSuffix` and `matchPrefix` matchers
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_matcher(MATCH_SUFFIX, SuffixMatcher)
            .with_matcher(MATCH_PREFIX, PrefixMatcher)
    }

    /// Register a matcher, replacing any previous one for `kind`
    pub fn register(&mut self, kind: impl Into<String>, matcher: impl Matcher + 'static) {
        self.matchers.insert(kind.into(), Arc::new(matcher));
    }

    /// Builder form of [`MatcherRegistry::register`]
    pub fn with_matcher(mut self, kind: impl Into<String>, matcher: impl Matcher + 'static) -> Self {
        self.register(kind, matcher);
        self
    }

    /// Returns true if a matcher is registered for `kind`
    pub fn supports(&self, kind: &str) -> bool {
        self.matchers.contains_key(kind)
    }

    /// Evaluate a condition against a field value
    ///
    /// Unknown condition types evaluate to false.
    pub fn evaluate(&self, condition: &Condition, field_value: &str) -> bool {
        match self.matchers.get(&condition.kind) {
            Some(matcher) => matcher.matches(&condition.value, field_value),
            None => {
                debug!(
                    "Unknown condition type '{}' (condition {}), treating as non-matching",
                    condition.kind, condition.id
                );
                false
            }
        }
    }

    /// Evaluate every condition; an empty set is satisfied
    pub fn evaluate_all<'a>(
        &self,
        conditions: impl IntoIterator<Item = &'a Condition>,
        field_value: &str,
    ) -> bool {
        conditions
            .into_iter()
            .all(|condition| self.evaluate(condition, field_value))
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.matchers.keys().collect();
        kinds.sort();
        f.debug_struct("MatcherRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_matcher_direction() {
        let matcher = SuffixMatcher;
        assert!(matcher.matches(&Value::from("com"), "foo.com"));
        assert!(!matcher.matches(&Value::from("foo.com"), "com"));
        assert!(matcher.matches(&Value::from(""), "anything"));
    }

    #[test]
    fn test_prefix_matcher() {
        let matcher = PrefixMatcher;
        assert!(matcher.matches(&Value::from("foo"), "foo.com"));
        assert!(!matcher.matches(&Value::from("bar"), "foo.com"));
    }

    #[test]
    fn test_non_string_values_never_match() {
        assert!(!SuffixMatcher.matches(&Value::from(42), "42"));
        assert!(!PrefixMatcher.matches(&Value::Null, "foo"));
    }

    #[test]
    fn test_registry_defaults() {
        let registry = MatcherRegistry::with_defaults();
        assert!(registry.supports(MATCH_SUFFIX));
        assert!(registry.supports(MATCH_PREFIX));
        assert!(!registry.supports("matchRegex"));

        assert!(registry.evaluate(&Condition::new(1, MATCH_SUFFIX, "com"), "foo.com"));
        assert!(!registry.evaluate(&Condition::new(2, MATCH_PREFIX, "bar"), "foo.com"));
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let registry = MatcherRegistry::with_defaults();
        let condition = Condition::new(1, "matchRegex", ".*");
        assert!(!registry.evaluate(&condition, "foo.com"));

        let empty = MatcherRegistry::empty();
        assert!(!empty.evaluate(&Condition::new(1, MATCH_SUFFIX, "com"), "foo.com"));
    }

    #[test]
    fn test_custom_matcher_registration() {
        struct Exact;

        impl Matcher for Exact {
            fn matches(&self, condition_value: &Value, field_value: &str) -> bool {
                condition_value.as_str() == Some(field_value)
            }
        }

        let registry = MatcherRegistry::with_defaults().with_matcher("matchExact", Exact);
        assert!(registry.evaluate(&Condition::new(1, "matchExact", "foo.com"), "foo.com"));
        assert!(!registry.evaluate(&Condition::new(1, "matchExact", "foo"), "foo.com"));
    }

    #[test]
    fn test_evaluate_all() {
        let registry = MatcherRegistry::with_defaults();
        let conditions = vec![
            Condition::new(1, MATCH_SUFFIX, "com"),
            Condition::new(2, MATCH_PREFIX, "foo"),
        ];

        assert!(registry.evaluate_all(&conditions, "foo.com"));
        assert!(!registry.evaluate_all(&conditions, "bar.com"));
        assert!(registry.evaluate_all(Vec::<Condition>::new().iter(), "bar.com"));
    }
}
