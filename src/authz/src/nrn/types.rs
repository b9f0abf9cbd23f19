//! Resource name type, parsing and wildcard containment

use std::borrow::Borrow;
use std::fmt;

use globset::GlobBuilder;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{AuthzError, Result};

/// Organization segment that matches every organization
pub const ORG_WILDCARD: &str = "*";

/// Splits a resource name into its organization and resource id segments
///
/// Fails with [`AuthzError::MalformedResourceName`] unless the name has
/// exactly three colon-delimited parts.
pub fn split_resource_name(name: &str) -> Result<(&str, &str)> {
    let mut parts = name.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_scheme), Some(org), Some(resource_id), None) => Ok((org, resource_id)),
        _ => Err(AuthzError::MalformedResourceName(name.to_string())),
    }
}

/// Returns the resource type (the part of the resource id before the first `/`)
pub fn resource_type(name: &str) -> Result<&str> {
    let (_, resource_id) = split_resource_name(name)?;
    resource_id
        .split_once('/')
        .map(|(resource_type, _)| resource_type)
        .ok_or_else(|| AuthzError::MalformedResourceId(name.to_string()))
}

/// Returns true if the name is well formed and its type equals `t`
pub fn is_type(name: &str, t: &str) -> bool {
    resource_type(name).map(|rt| rt == t).unwrap_or(false)
}

/// Checks whether `pattern` contains `candidate`
///
/// The organization segment must be equal or the literal `*`; the resource
/// id segment of the pattern is a shell glob matched against the candidate's
/// whole resource id, `/` included. A run of `*` is a single wildcard, so a
/// literal `/` next to it must still appear in the candidate. Malformed
/// names and invalid globs never match.
pub fn contains(pattern: &str, candidate: &str) -> bool {
    let Ok((pattern_org, pattern_id)) = split_resource_name(pattern) else {
        return false;
    };
    let Ok((candidate_org, candidate_id)) = split_resource_name(candidate) else {
        return false;
    };

    if pattern_org != ORG_WILDCARD && pattern_org != candidate_org {
        return false;
    }

    let glob = collapse_stars(pattern_id);
    match GlobBuilder::new(&glob).literal_separator(false).build() {
        Ok(glob) => glob.compile_matcher().is_match(candidate_id),
        Err(e) => {
            trace!("Invalid resource id glob '{}': {}", pattern_id, e);
            false
        }
    }
}

/// Folds every run of unescaped `*` into one, leaving no `**` form for the
/// glob engine to read as a recursive segment wildcard
pub(crate) fn collapse_stars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    let mut after_star = false;

    for c in pattern.chars() {
        if escaped {
            escaped = false;
            after_star = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                after_star = false;
            }
            '*' if after_star => continue,
            '*' => after_star = true,
            _ => after_star = false,
        }
        out.push(c);
    }

    out
}

/// A namespaced resource name or resource name pattern
///
/// Stored as-is: well-formedness is only checked when the name is queried,
/// so malformed names can travel through aggregation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a resource name from any string
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a resource name, rejecting names without an org and a
    /// `type/id` resource id
    pub fn parse(name: &str) -> Result<Self> {
        resource_type(name)?;
        Ok(Self::from(name))
    }

    /// Returns the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `(org, resource_id)`
    pub fn split(&self) -> Result<(&str, &str)> {
        split_resource_name(&self.0)
    }

    /// Returns the organization segment
    pub fn org(&self) -> Result<&str> {
        self.split().map(|(org, _)| org)
    }

    /// Returns the `type/id` segment
    pub fn resource_id(&self) -> Result<&str> {
        self.split().map(|(_, resource_id)| resource_id)
    }

    /// Returns the resource type
    pub fn resource_type(&self) -> Result<&str> {
        resource_type(&self.0)
    }

    /// Returns the part of the resource id after the first `/`
    pub fn handle(&self) -> Result<&str> {
        let resource_id = self.resource_id()?;
        resource_id
            .split_once('/')
            .map(|(_, handle)| handle)
            .ok_or_else(|| AuthzError::MalformedResourceId(self.0.clone()))
    }

    /// Returns true if this name has type `t`
    pub fn is_type(&self, t: &str) -> bool {
        is_type(&self.0, t)
    }

    /// Returns true if this pattern contains `candidate`
    pub fn contains(&self, candidate: &str) -> bool {
        contains(&self.0, candidate)
    }

    /// Returns true if this pattern contains the resource name `candidate`
    pub fn contains_name(&self, candidate: &ResourceName) -> bool {
        contains(&self.0, candidate.as_str())
    }

    /// Returns true if the name splits into org and a `type/id` resource id
    pub fn is_well_formed(&self) -> bool {
        self.resource_type().is_ok()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&String> for ResourceName {
    fn from(name: &String) -> Self {
        Self(name.clone())
    }
}
