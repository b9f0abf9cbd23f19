//! Per-subject cache of effective permissions

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::permissions::EffectivePermissions;
use crate::types::SubjectId;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of subjects held in the cache
    pub capacity: usize,

    /// Time-to-live for a built permission set
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Built permission set with its build time
struct CachedEntry {
    permissions: Arc<EffectivePermissions>,
    cached_at: Instant,
}

impl CachedEntry {
    fn new(permissions: EffectivePermissions) -> Self {
        Self {
            permissions: Arc::new(permissions),
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Result of one build, handed to every caller that waited on it
type Outcome = std::result::Result<CachedEntry, AuthzError>;

/// A slot is either being built (empty cell) or holds a finished outcome
type Slot = Arc<OnceCell<Outcome>>;

/// Effective-permissions cache keyed by subject id
///
/// Concurrent misses for one subject share a single build: the first caller
/// runs it and the others await the same slot and receive its outcome,
/// errors included. A slot only becomes visible to readers once its value is
/// complete. A failed slot is dropped once its error is handed out, so the
/// next lookup builds again.
pub struct PermissionsCache {
    entries: Arc<DashMap<SubjectId, Slot>>,

    config: CacheConfig,

    stats: Arc<DashMap<String, usize>>,
}

impl PermissionsCache {
    /// Create an empty cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Return the cached permissions for `subject_id`, building them with
    /// `build` on a miss
    pub async fn get_or_try_build<F, Fut>(
        &self,
        subject_id: SubjectId,
        build: F,
    ) -> Result<Arc<EffectivePermissions>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EffectivePermissions>>,
    {
        let slot = match self.lookup(subject_id) {
            Lookup::Hit(permissions) => return Ok(permissions),
            Lookup::Pending(slot) => slot,
        };

        let outcome = slot
            .get_or_init(|| async move { build().await.map(CachedEntry::new) })
            .await;

        match outcome {
            Ok(entry) => Ok(Arc::clone(&entry.permissions)),
            Err(e) => {
                self.discard(subject_id, &slot);
                debug!("Permission build for subject {} failed: {}", subject_id, e);
                Err(e.clone())
            }
        }
    }

    /// Return cached permissions without building
    pub fn get(&self, subject_id: SubjectId) -> Option<Arc<EffectivePermissions>> {
        let slot = self.entries.get(&subject_id).map(|slot| Arc::clone(slot.value()))?;
        let Ok(entry) = slot.get()? else {
            return None;
        };

        if entry.is_expired(self.config.ttl) {
            self.expire(subject_id, &slot);
            return None;
        }

        Some(Arc::clone(&entry.permissions))
    }

    /// Drop the entry for one subject
    ///
    /// A build already in flight is not cancelled: it completes for the
    /// callers already waiting on it, while the next lookup starts a second
    /// build against fresh rows. For that window two builds for the same
    /// subject can run at once.
    pub fn invalidate(&self, subject_id: SubjectId) {
        if self.entries.remove(&subject_id).is_some() {
            debug!("Invalidated cached permissions for subject {}", subject_id);
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
        debug!("Cleared permissions cache");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            entries: self.entries.len(),
            max_entries: self.config.capacity,
        }
    }

    fn lookup(&self, subject_id: SubjectId) -> Lookup {
        let existing = self.entries.get(&subject_id).map(|slot| Arc::clone(slot.value()));

        if let Some(slot) = existing {
            match slot.get() {
                Some(Ok(entry)) if !entry.is_expired(self.config.ttl) => {
                    self.increment_stat("hits");
                    debug!("Permissions cache hit for subject {}", subject_id);
                    return Lookup::Hit(Arc::clone(&entry.permissions));
                }
                Some(Ok(_)) => self.expire(subject_id, &slot),
                Some(Err(_)) => self.discard(subject_id, &slot),
                None => {
                    self.increment_stat("misses");
                    debug!("Joining in-flight permission build for subject {}", subject_id);
                    return Lookup::Pending(slot);
                }
            }
        }

        self.increment_stat("misses");
        debug!("Permissions cache miss for subject {}", subject_id);

        if !self.entries.contains_key(&subject_id) && self.entries.len() >= self.config.capacity {
            self.evict_batch();
        }

        let slot = self
            .entries
            .entry(subject_id)
            .or_insert_with(|| Arc::new(OnceCell::new()));
        Lookup::Pending(Arc::clone(slot.value()))
    }

    fn discard(&self, subject_id: SubjectId, slot: &Slot) {
        self.entries
            .remove_if(&subject_id, |_, current| Arc::ptr_eq(current, slot));
    }

    fn expire(&self, subject_id: SubjectId, slot: &Slot) {
        let removed = self
            .entries
            .remove_if(&subject_id, |_, current| Arc::ptr_eq(current, slot));
        if removed.is_some() {
            self.increment_stat("expirations");
            debug!("Cached permissions for subject {} expired", subject_id);
        }
    }

    /// Evict about a tenth of the capacity, taking finished entries in map
    /// iteration order (not by age)
    fn evict_batch(&self) {
        let to_remove = (self.config.capacity / 10).max(1);
        let mut removed = 0;

        // In-flight builds stay reachable for their waiters
        self.entries.retain(|_, slot| {
            if removed < to_remove && slot.initialized() {
                removed += 1;
                false
            } else {
                true
            }
        });
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

enum Lookup {
    Hit(Arc<EffectivePermissions>),
    Pending(Slot),
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a finished entry
    pub hits: usize,

    /// Lookups that started or joined a build
    pub misses: usize,

    /// Entries dropped because their TTL elapsed
    pub expirations: usize,

    /// Slots currently held, in-flight builds included
    pub entries: usize,

    /// Configured capacity
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
