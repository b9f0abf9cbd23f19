//! # IAM Authorization Core
//!
//! Permission resolution for namespaced resource names.
//!
//! ## Features
//!
//! - **Resource names** of the form `scheme:org:type/id` with wildcard containment
//! - **Condition matchers** (`matchSuffix`, `matchPrefix`) behind a pluggable registry
//! - **Aggregation** of denormalized role/policy/condition rows into effective permissions
//! - **Deny-wins decisions** with default deny
//! - **Per-subject caching** with single-flight builds and TTL expiry
//! - **PostgreSQL row source** (feature `postgres`)
//!
//! ## Example
//!
//! ```rust
//! use iam_authz::{
//!     DenormalizedRow, InMemoryRoleSource, MatcherRegistry, PermissionResolver,
//!     PolicyRecord, Resource, ResolverConfig, Subject,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(InMemoryRoleSource::new());
//!     source
//!         .push_row(
//!             1,
//!             DenormalizedRow::new(
//!                 10,
//!                 PolicyRecord::new(100, "allow", vec!["view".to_string()], "oso:0:zone/*"),
//!             ),
//!         )
//!         .await;
//!
//!     let resolver = PermissionResolver::new(
//!         ResolverConfig::default(),
//!         source,
//!         MatcherRegistry::with_defaults(),
//!     );
//!
//!     let verdict = resolver
//!         .authorize(&Subject::new(1), "view", &Resource::new("oso:0:zone/foo.com"))
//!         .await?;
//!
//!     if verdict.is_allowed() {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod condition;
pub mod engine;
pub mod error;
pub mod nrn;
pub mod permissions;
pub mod policy;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use aggregate::{aggregate, Aggregator, DenormalizedRow};
pub use condition::{Condition, Matcher, MatcherRegistry};
pub use engine::{
    decide, CacheConfig, CacheStats, Decision, PermissionResolver, ResolverConfig, Verdict,
};
pub use error::{AuthzError, Result};
pub use nrn::ResourceName;
pub use permissions::{EffectivePermissions, PoliciesByPattern};
pub use policy::{PolicyEffect, PolicyRecord, RolePolicy};
pub use source::{InMemoryRoleSource, RoleSource};
pub use types::{ConditionId, PolicyId, Resource, RoleId, Subject, SubjectId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
