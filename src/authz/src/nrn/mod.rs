//! Namespaced resource names
//!
//! A resource name (NRN) has the form `scheme:org:type/id`. Policies use the
//! same grammar with wildcards to express their scope:
//!
//! - `oso:2000:zone/example.com` - exact resource
//! - `oso:*:zone/example.com` - any organization
//! - `oso:2000:zone/*` - any zone in organization 2000
//! - `oso:2000:*` - anything in organization 2000
//!
//! # Examples
//!
//! ```
//! use iam_authz::nrn::ResourceName;
//!
//! let pattern = ResourceName::new("oso:2000:zone/*");
//! assert!(pattern.contains("oso:2000:zone/example.com"));
//! assert!(!pattern.contains("oso:6666:zone/example.com"));
//! ```

mod types;


pub use types::{contains, is_type, resource_type, split_resource_name, ResourceName, ORG_WILDCARD};
