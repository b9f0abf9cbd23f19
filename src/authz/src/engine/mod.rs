//! Permission resolution engine
//!
//! Fetches a subject's denormalized rows, aggregates them into effective
//! permissions, caches the result per subject and decides requests against it.

pub mod cache;
pub mod decision;

pub use cache::{CacheConfig, CacheStats, PermissionsCache};
pub use decision::{decide, Decision, DecisionReason, Verdict};

use crate::aggregate::aggregate;
use crate::condition::MatcherRegistry;
use crate::error::{AuthzError, Result};
use crate::permissions::EffectivePermissions;
use crate::source::RoleSource;
use crate::types::{Resource, Subject, SubjectId};

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Cache effective permissions per subject
    pub enable_cache: bool,

    /// Cache configuration
    pub cache: CacheConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache: CacheConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from the environment
    ///
    /// - `AUTHZ_CACHE_ENABLED` - `true`/`false` (default: true)
    /// - `AUTHZ_CACHE_CAPACITY` - maximum cached subjects (default: 10000)
    /// - `AUTHZ_CACHE_TTL_SECS` - entry lifetime in seconds (default: 60)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enable_cache = parse_var(&lookup, "AUTHZ_CACHE_ENABLED")?.unwrap_or(defaults.enable_cache);
        let capacity = parse_var(&lookup, "AUTHZ_CACHE_CAPACITY")?.unwrap_or(defaults.cache.capacity);
        let ttl = parse_var::<u64, _>(&lookup, "AUTHZ_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache.ttl);

        Ok(Self {
            enable_cache,
            cache: CacheConfig { capacity, ttl },
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AuthzError::Config(format!("Invalid value '{}' for {}: {}", raw, key, e))),
    }
}

/// Permission resolver
///
/// ```text
/// Subject → RoleSource → aggregate → [PermissionsCache] → decide → Verdict
/// ```
pub struct PermissionResolver {
    /// Backing store for role/policy/condition rows
    source: Arc<dyn RoleSource>,

    /// Condition evaluators
    matchers: MatcherRegistry,

    /// Per-subject permissions cache
    cache: Option<PermissionsCache>,

    /// Resolver configuration
    config: ResolverConfig,
}

impl PermissionResolver {
    /// Create a resolver over `source` with the given matchers
    pub fn new(config: ResolverConfig, source: Arc<dyn RoleSource>, matchers: MatcherRegistry) -> Self {
        let cache = if config.enable_cache {
            Some(PermissionsCache::new(config.cache.clone()))
        } else {
            None
        };

        info!(
            "PermissionResolver initialized with cache={}, capacity={}, ttl={:?}",
            config.enable_cache, config.cache.capacity, config.cache.ttl
        );

        Self {
            source,
            matchers,
            cache,
            config,
        }
    }

    /// Effective permissions for a subject
    ///
    /// Row-source errors are returned unchanged and never cached.
    pub async fn effective_permissions(&self, subject: &Subject) -> Result<Arc<EffectivePermissions>> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_try_build(subject.id, || self.build(subject.id))
                    .await
            }
            None => self.build(subject.id).await.map(Arc::new),
        }
    }

    /// Decide whether `subject` may perform `action` on `resource`
    ///
    /// [`Decision::NoMatch`] in the returned verdict is a denial.
    pub async fn authorize(&self, subject: &Subject, action: &str, resource: &Resource) -> Result<Verdict> {
        let start = Instant::now();

        let permissions = self.effective_permissions(subject).await?;
        let verdict = decide(&permissions, &self.matchers, subject, action, resource);

        debug!(
            "Authorization for subject {} completed in {:?}: {}",
            subject.id,
            start.elapsed(),
            verdict.decision
        );

        Ok(verdict)
    }

    /// Drop cached permissions for a subject whose roles or policies changed
    pub fn invalidate(&self, subject_id: SubjectId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(subject_id);
        }
    }

    /// Drop all cached permissions
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Cache statistics, `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(PermissionsCache::stats)
    }

    /// Matchers used for condition evaluation
    pub fn matchers(&self) -> &MatcherRegistry {
        &self.matchers
    }

    /// Resolver configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    async fn build(&self, subject_id: SubjectId) -> Result<EffectivePermissions> {
        let rows = self.source.fetch_rows(subject_id).await?;
        debug!("Aggregating {} rows for subject {}", rows.len(), subject_id);
        Ok(aggregate(&rows))
    }
}
