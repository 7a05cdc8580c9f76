//! core::version
//!
//! The version registry: an append-only tree of immutable versions.
//!
//! # Invariants
//!
//! - Versions are never mutated or deleted after creation
//! - Exactly one root (the version created without a parent)
//! - Version numbers are unique and increase in creation order, so a parent
//!   always carries a smaller number than any of its descendants
//!
//! # Example
//!
//! ```
//! use evograph::core::version::VersionRegistry;
//!
//! let mut registry = VersionRegistry::new();
//! let v1 = registry.create("initial", None).unwrap();
//! let v2 = registry.create("draft", Some(v1)).unwrap();
//!
//! assert_eq!(registry.parent(v2), Some(v1));
//! assert!(registry.is_ancestor(v1, v2));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{UtcTimestamp, VersionId};

/// Errors from version registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),

    #[error("version tree already has a root ({0}); new versions must name a parent")]
    RootExists(VersionId),
}

/// An immutable point in the model's evolution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Identity (the version number)
    pub id: VersionId,
    /// Human-readable label
    pub label: String,
    /// The version this one was branched from (`None` for the root)
    pub created_from: Option<VersionId>,
    /// Creation time
    pub created_at: UtcTimestamp,
}

impl Version {
    /// The version number.
    pub fn number(&self) -> u32 {
        self.id.number()
    }

    /// Whether this is the root of the version tree.
    pub fn is_root(&self) -> bool {
        self.created_from.is_none()
    }
}

/// Append-only registry of versions.
///
/// Versions are stored in creation order; version number `n` lives at
/// index `n - 1`.
#[derive(Debug, Default, Clone)]
pub struct VersionRegistry {
    versions: Vec<Version>,
}

impl VersionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding only a root version.
    pub fn with_root(label: impl Into<String>) -> (Self, VersionId) {
        let id = VersionId::new(1);
        let registry = Self {
            versions: vec![Version {
                id,
                label: label.into(),
                created_from: None,
                created_at: UtcTimestamp::now(),
            }],
        };
        (registry, id)
    }

    /// Create a new version branched from `parent`, or the root when
    /// `parent` is `None`.
    ///
    /// # Errors
    ///
    /// - [`VersionError::UnknownVersion`] if `parent` is not registered
    /// - [`VersionError::RootExists`] if `parent` is `None` and a root exists
    pub fn create(
        &mut self,
        label: impl Into<String>,
        parent: Option<VersionId>,
    ) -> Result<VersionId, VersionError> {
        match parent {
            Some(p) if self.get(p).is_none() => return Err(VersionError::UnknownVersion(p)),
            None => {
                if let Some(root) = self.root() {
                    return Err(VersionError::RootExists(root));
                }
            }
            Some(_) => {}
        }

        let id = VersionId::new(self.versions.len() as u32 + 1);
        self.versions.push(Version {
            id,
            label: label.into(),
            created_from: parent,
            created_at: UtcTimestamp::now(),
        });
        tracing::debug!(version = %id, parent = ?parent, "created version");
        Ok(id)
    }

    /// Restore a previously persisted version record.
    ///
    /// Records must arrive in number order with parents already present.
    pub(crate) fn restore(&mut self, version: Version) -> Result<(), VersionError> {
        let expected = VersionId::new(self.versions.len() as u32 + 1);
        if version.id != expected {
            return Err(VersionError::UnknownVersion(version.id));
        }
        match version.created_from {
            Some(p) if self.get(p).is_none() => return Err(VersionError::UnknownVersion(p)),
            None => {
                if let Some(root) = self.root() {
                    return Err(VersionError::RootExists(root));
                }
            }
            Some(_) => {}
        }
        self.versions.push(version);
        Ok(())
    }

    /// Look up a version record.
    pub fn get(&self, id: VersionId) -> Option<&Version> {
        let index = (id.number() as usize).checked_sub(1)?;
        self.versions.get(index)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: VersionId) -> bool {
        self.get(id).is_some()
    }

    /// The root version, if any version has been created.
    pub fn root(&self) -> Option<VersionId> {
        self.versions.first().map(|v| v.id)
    }

    /// The version `id` was created from.
    pub fn parent(&self, id: VersionId) -> Option<VersionId> {
        self.get(id).and_then(|v| v.created_from)
    }

    /// Versions created directly from `id`, in creation order.
    pub fn children(&self, id: VersionId) -> Vec<VersionId> {
        self.versions
            .iter()
            .filter(|v| v.created_from == Some(id))
            .map(|v| v.id)
            .collect()
    }

    /// All ancestors of `id`, from immediate parent to root.
    pub fn ancestors(&self, id: VersionId) -> Vec<VersionId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(v) = current {
            result.push(v);
            current = self.parent(v);
        }
        result
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: VersionId, descendant: VersionId) -> bool {
        // Parents always have smaller numbers, so the walk can stop early.
        let mut current = self.parent(descendant);
        while let Some(v) = current {
            if v == ancestor {
                return true;
            }
            if v < ancestor {
                return false;
            }
            current = self.parent(v);
        }
        false
    }

    /// Number of versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no version has been created.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// All versions in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (VersionRegistry, VersionId, VersionId, VersionId, VersionId) {
        // v1 -> v2 -> v3, v1 -> v4
        let mut registry = VersionRegistry::new();
        let v1 = registry.create("root", None).unwrap();
        let v2 = registry.create("a", Some(v1)).unwrap();
        let v3 = registry.create("b", Some(v2)).unwrap();
        let v4 = registry.create("c", Some(v1)).unwrap();
        (registry, v1, v2, v3, v4)
    }

    #[test]
    fn numbers_are_assigned_in_creation_order() {
        let (registry, v1, v2, v3, v4) = tree();
        assert_eq!(v1.number(), 1);
        assert_eq!(v2.number(), 2);
        assert_eq!(v3.number(), 3);
        assert_eq!(v4.number(), 4);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn root_has_no_parent() {
        let (registry, v1, ..) = tree();
        assert_eq!(registry.root(), Some(v1));
        assert!(registry.get(v1).unwrap().is_root());
        assert_eq!(registry.parent(v1), None);
    }

    #[test]
    fn second_root_rejected() {
        let (mut registry, v1, ..) = tree();
        assert_eq!(
            registry.create("again", None),
            Err(VersionError::RootExists(v1))
        );
    }

    #[test]
    fn unknown_parent_rejected() {
        let mut registry = VersionRegistry::new();
        let missing = VersionId::new(9);
        assert_eq!(
            registry.create("x", Some(missing)),
            Err(VersionError::UnknownVersion(missing))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn children_in_creation_order() {
        let (registry, v1, v2, _, v4) = tree();
        assert_eq!(registry.children(v1), vec![v2, v4]);
    }

    #[test]
    fn ancestors_nearest_first() {
        let (registry, v1, v2, v3, _) = tree();
        assert_eq!(registry.ancestors(v3), vec![v2, v1]);
        assert!(registry.ancestors(v1).is_empty());
    }

    #[test]
    fn ancestry_follows_tree_not_numbers() {
        let (registry, v1, v2, v3, v4) = tree();
        assert!(registry.is_ancestor(v1, v3));
        assert!(registry.is_ancestor(v2, v3));
        assert!(!registry.is_ancestor(v2, v4));
        assert!(!registry.is_ancestor(v3, v3));
        assert!(!registry.is_ancestor(v3, v1));
    }

    #[test]
    fn with_root_starts_at_one() {
        let (registry, root) = VersionRegistry::with_root("base");
        assert_eq!(root.number(), 1);
        assert_eq!(registry.root(), Some(root));
        assert_eq!(registry.get(root).unwrap().label, "base");
    }

    #[test]
    fn children_are_never_older_than_parents() {
        let (registry, ..) = tree();
        for version in registry.iter() {
            if let Some(parent) = version.created_from.and_then(|p| registry.get(p)) {
                assert!(version.created_at.as_datetime() >= parent.created_at.as_datetime());
            }
        }
    }

    #[test]
    fn get_zero_is_none() {
        let (registry, ..) = tree();
        assert!(registry.get(VersionId::new(0)).is_none());
    }
}
