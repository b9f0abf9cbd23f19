//! Row sources: where denormalized role/policy/condition rows come from

use crate::aggregate::DenormalizedRow;
use crate::error::Result;
use crate::types::SubjectId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRoleSource;

/// Role source trait
///
/// Implementations return the complete row set for a subject; aggregation
/// only starts once this future has resolved. Rows come back in no
/// particular order.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Fetch every (role, policy, condition) row for a subject
    async fn fetch_rows(&self, subject_id: SubjectId) -> Result<Vec<DenormalizedRow>>;
}

/// Load a JSON array of denormalized rows from a file
pub async fn load_rows(path: impl AsRef<Path>) -> Result<Vec<DenormalizedRow>> {
    let raw = tokio::fs::read_to_string(path.as_ref()).await?;
    let rows = serde_json::from_str(&raw)?;
    Ok(rows)
}

/// In-memory role source
///
/// Subjects without rows have no permissions.
pub struct InMemoryRoleSource {
    rows: Arc<RwLock<HashMap<SubjectId, Vec<DenormalizedRow>>>>,
    fetches: AtomicUsize,
}

impl InMemoryRoleSource {
    /// Create an empty in-memory role source
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace all rows for a subject
    pub async fn set_rows(&self, subject_id: SubjectId, rows: Vec<DenormalizedRow>) {
        let mut all = self.rows.write().await;
        all.insert(subject_id, rows);
    }

    /// Append a row for a subject
    pub async fn push_row(&self, subject_id: SubjectId, row: DenormalizedRow) {
        let mut all = self.rows.write().await;
        all.entry(subject_id).or_default().push(row);
    }

    /// Remove all rows for a subject
    pub async fn remove(&self, subject_id: SubjectId) {
        let mut all = self.rows.write().await;
        all.remove(&subject_id);
    }

    /// Number of `fetch_rows` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryRoleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleSource for InMemoryRoleSource {
    async fn fetch_rows(&self, subject_id: SubjectId) -> Result<Vec<DenormalizedRow>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let all = self.rows.read().await;
        Ok(all.get(&subject_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyRecord;

    fn view_row() -> DenormalizedRow {
        DenormalizedRow::new(
            1,
            PolicyRecord::new(1, "allow", vec!["view".to_string()], "oso:0:zone/*"),
        )
    }

    #[tokio::test]
    async fn test_load_rows_errors() {
        let missing = std::env::temp_dir().join("iam-authz-missing-rows.json");
        let result = load_rows(&missing).await;
        assert!(matches!(result, Err(crate::error::AuthzError::Io(_))));

        let invalid = std::env::temp_dir().join(format!("iam-authz-rows-{}.json", std::process::id()));
        tokio::fs::write(&invalid, "{ not json").await.unwrap();
        let result = load_rows(&invalid).await;
        assert!(matches!(result, Err(crate::error::AuthzError::Json(_))));
        tokio::fs::remove_file(&invalid).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_rows() {
        let path = std::env::temp_dir().join(format!("iam-authz-load-{}.json", std::process::id()));
        let rows = vec![view_row()];
        tokio::fs::write(&path, serde_json::to_string(&rows).unwrap()).await.unwrap();

        let loaded = load_rows(&path).await.unwrap();
        assert_eq!(loaded, rows);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let source = InMemoryRoleSource::new();
        source.set_rows(1, vec![view_row()]).await;
        source.push_row(1, view_row()).await;

        let rows = source.fetch_rows(1).await.unwrap();
        assert_eq!(rows.len(), 2);

        let rows = source.fetch_rows(2).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(source.fetch_count(), 2);

        source.remove(1).await;
        assert!(source.fetch_rows(1).await.unwrap().is_empty());
    }
}
