//! Core identifier, subject and resource types

use crate::nrn::ResourceName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique subject (user) identifier
pub type SubjectId = i64;

/// Unique role identifier
pub type RoleId = i64;

/// Unique policy identifier
pub type PolicyId = i64;

/// Condition identifier, unique per policy
pub type ConditionId = i64;

/// Subject an authorization decision is made for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject identifier (keys the permissions cache)
    pub id: SubjectId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Organization the subject belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,

    /// Additional attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Subject {
    /// Create a new subject
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            name: String::new(),
            org_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the organization
    pub fn with_org(mut self, org_id: i64) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Add an attribute to the subject
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Resource being accessed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Namespaced resource name (e.g., "oso:0:zone/foo.com")
    pub resource_name: ResourceName,

    /// Value condition matchers are evaluated against (e.g., a zone name)
    pub name: String,

    /// Additional attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Resource {
    /// Create a resource from its resource name.
    ///
    /// The condition field defaults to the handle after the first `/`, or
    /// the whole name when it has no handle.
    pub fn new(resource_name: impl Into<ResourceName>) -> Self {
        let resource_name = resource_name.into();
        let name = resource_name
            .handle()
            .map(str::to_string)
            .unwrap_or_else(|_| resource_name.as_str().to_string());

        Self {
            resource_name,
            name,
            attributes: HashMap::new(),
        }
    }

    /// Override the condition field
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add an attribute to the resource
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
