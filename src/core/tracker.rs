//! core::tracker
//!
//! The branch tracker: identity of elements across versions.
//!
//! # Architecture
//!
//! Every element instance belongs to at most one *branch*, the set of
//! instances that represent the same conceptual element in different
//! versions. A branch is anchored by its root (the earliest instance) and
//! addressed only through that root:
//!
//! - `members`: element -> (root, version)
//! - `branches`: root -> version -> element
//!
//! [`BranchTracker::get_in_version`] resolves `element -> root -> member at v`
//! and is the single primitive all change detectors are built on.
//!
//! # Invariants
//!
//! - `first_version_of(e) == e` iff `e` is the earliest instance of its branch
//! - A branch has at most one member per version
//! - Every member recorded in `branches` has a matching `members` entry
//! - Failing operations leave both tables untouched
//!
//! # Mutation
//!
//! All mutating operations must be issued by a single owner (the model
//! mutation layer). The tracker performs no locking.
//!
//! # Example
//!
//! ```
//! use evograph::core::tracker::BranchTracker;
//! use evograph::core::types::{ElementId, VersionId};
//!
//! let (v1, v2) = (VersionId::new(1), VersionId::new(2));
//! let (a1, a2) = (ElementId::new(0), ElementId::new(1));
//!
//! let mut tracker = BranchTracker::new();
//! tracker.set_as_first_version(a1, v1).unwrap();
//! tracker.register_branch(a1, a2, v2, false, v1).unwrap();
//!
//! assert_eq!(tracker.get_in_version(a2, v1), Some(a1));
//! assert_eq!(tracker.get_in_version(a1, v2), Some(a2));
//! assert_eq!(tracker.first_version_of(a2), Some(a1));
//! ```

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::types::{ElementId, VersionId};

/// Invariant violations raised by the branch tracker.
///
/// None of these are expected runtime states. They indicate corrupted
/// bookkeeping in the caller and must not be silently recovered from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("element {0} already belongs to a branch")]
    AlreadyTracked(ElementId),

    #[error("element {0} does not belong to any branch")]
    NotTracked(ElementId),

    #[error("branch rooted at {root} already has a member at {version}")]
    DuplicateMember { root: ElementId, version: VersionId },

    #[error("branch token for {token_element} cannot re-register {element}")]
    TokenMismatch {
        element: ElementId,
        token_element: ElementId,
    },

    #[error("branch token for {0} is stale or was never issued by this tracker")]
    StaleToken(ElementId),
}

/// Where an element sits in its branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    /// The branch root (first version)
    pub root: ElementId,
    /// The version this instance is valid in
    pub version: VersionId,
}

/// Bookkeeping captured by [`BranchTracker::unregister_branch`].
///
/// The token is consumed by [`BranchTracker::re_register_branch`]; it cannot
/// be cloned, so a single unregistration can be inverted at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct BranchToken {
    element: ElementId,
    membership: Membership,
    serial: u64,
}

impl BranchToken {
    /// The element this token was issued for.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The branch position the element held before unregistration.
    pub fn membership(&self) -> Membership {
        self.membership
    }
}

/// Registry mapping (branch root, version) to element instances.
#[derive(Debug, Default, Clone)]
pub struct BranchTracker {
    members: HashMap<ElementId, Membership>,
    branches: HashMap<ElementId, BTreeMap<VersionId, ElementId>>,
    /// Serial of the outstanding token per unregistered element
    outstanding: HashMap<ElementId, u64>,
    next_serial: u64,
}

fn violation(err: TrackerError) -> TrackerError {
    tracing::error!(error = %err, "branch tracker invariant violation");
    err
}

impl BranchTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `element` as the root of a new branch at `version`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::AlreadyTracked`] if `element` already belongs to a
    /// branch or still anchors one.
    pub fn set_as_first_version(
        &mut self,
        element: ElementId,
        version: VersionId,
    ) -> Result<(), TrackerError> {
        if self.members.contains_key(&element) || self.anchors_branch(element) {
            return Err(violation(TrackerError::AlreadyTracked(element)));
        }

        self.insert(element, Membership { root: element, version });
        tracing::trace!(%element, %version, "set as first version");
        Ok(())
    }

    /// Link `derived` into the branch of `branched` at `version`.
    ///
    /// `branched` may be any member of the branch, not only its root. When
    /// `is_first_branch_point` is set and `branched` is not tracked yet, it is
    /// first made the root of its own branch at `branched_from`.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::AlreadyTracked`] if `derived` already belongs to a
    ///   branch (or is `branched` itself)
    /// - [`TrackerError::NotTracked`] if `branched` is untracked and this is
    ///   not a first branch point
    /// - [`TrackerError::DuplicateMember`] if the branch already has a member
    ///   at `version`
    pub fn register_branch(
        &mut self,
        branched: ElementId,
        derived: ElementId,
        version: VersionId,
        is_first_branch_point: bool,
        branched_from: VersionId,
    ) -> Result<(), TrackerError> {
        if derived == branched || self.members.contains_key(&derived) {
            return Err(violation(TrackerError::AlreadyTracked(derived)));
        }

        let (root, needs_root) = match self.members.get(&branched) {
            Some(m) => (m.root, false),
            None if is_first_branch_point => {
                if self.anchors_branch(branched) {
                    return Err(violation(TrackerError::AlreadyTracked(branched)));
                }
                if version == branched_from {
                    return Err(violation(TrackerError::DuplicateMember {
                        root: branched,
                        version,
                    }));
                }
                (branched, true)
            }
            None => return Err(violation(TrackerError::NotTracked(branched))),
        };

        if self.slot(root, version).is_some() {
            return Err(violation(TrackerError::DuplicateMember { root, version }));
        }

        if needs_root {
            self.insert(
                branched,
                Membership {
                    root,
                    version: branched_from,
                },
            );
        }
        self.insert(derived, Membership { root, version });
        tracing::trace!(%root, %derived, %version, first = needs_root, "registered branch");
        Ok(())
    }

    /// Remove `element`'s branch bookkeeping.
    ///
    /// Lookups for its branch at its version stop returning it. The returned
    /// token restores the bookkeeping via [`Self::re_register_branch`].
    ///
    /// # Errors
    ///
    /// [`TrackerError::NotTracked`] if `element` is not a branch member.
    pub fn unregister_branch(&mut self, element: ElementId) -> Result<BranchToken, TrackerError> {
        let membership = self
            .members
            .remove(&element)
            .ok_or_else(|| violation(TrackerError::NotTracked(element)))?;

        if let Some(versions) = self.branches.get_mut(&membership.root) {
            versions.remove(&membership.version);
            if versions.is_empty() {
                self.branches.remove(&membership.root);
            }
        }

        self.next_serial += 1;
        let serial = self.next_serial;
        self.outstanding.insert(element, serial);
        tracing::trace!(%element, root = %membership.root, version = %membership.version, "unregistered branch");

        Ok(BranchToken {
            element,
            membership,
            serial,
        })
    }

    /// Restore bookkeeping captured by a prior [`Self::unregister_branch`].
    ///
    /// # Errors
    ///
    /// - [`TrackerError::TokenMismatch`] if the token was issued for another
    ///   element
    /// - [`TrackerError::StaleToken`] if the token is not the outstanding one
    ///   for `element`
    /// - [`TrackerError::AlreadyTracked`] / [`TrackerError::DuplicateMember`]
    ///   if the element or its slot was taken in the meantime
    pub fn re_register_branch(
        &mut self,
        element: ElementId,
        token: BranchToken,
    ) -> Result<(), TrackerError> {
        if token.element != element {
            return Err(violation(TrackerError::TokenMismatch {
                element,
                token_element: token.element,
            }));
        }
        if self.outstanding.get(&element) != Some(&token.serial) {
            return Err(violation(TrackerError::StaleToken(element)));
        }
        if self.members.contains_key(&element) {
            return Err(violation(TrackerError::AlreadyTracked(element)));
        }
        let Membership { root, version } = token.membership;
        if self.slot(root, version).is_some() {
            return Err(violation(TrackerError::DuplicateMember { root, version }));
        }

        self.outstanding.remove(&element);
        self.insert(element, token.membership);
        tracing::trace!(%element, %root, %version, "re-registered branch");
        Ok(())
    }

    /// Re-insert a persisted membership record.
    ///
    /// # Errors
    ///
    /// [`TrackerError::AlreadyTracked`] / [`TrackerError::DuplicateMember`]
    /// if the element or its slot is already taken.
    pub(crate) fn restore(&mut self, element: ElementId, membership: Membership) -> Result<(), TrackerError> {
        if self.members.contains_key(&element) {
            return Err(violation(TrackerError::AlreadyTracked(element)));
        }
        let Membership { root, version } = membership;
        if self.slot(root, version).is_some() {
            return Err(violation(TrackerError::DuplicateMember { root, version }));
        }
        self.insert(element, membership);
        Ok(())
    }

    /// Resolve the member of `element`'s branch that is valid at `version`.
    ///
    /// Untracked elements and versions without a member resolve to `None`.
    pub fn get_in_version(&self, element: ElementId, version: VersionId) -> Option<ElementId> {
        let root = self.members.get(&element)?.root;
        self.slot(root, version)
    }

    /// The version `element` is valid in.
    pub fn version_of(&self, element: ElementId) -> Option<VersionId> {
        self.members.get(&element).map(|m| m.version)
    }

    /// The root of `element`'s branch.
    pub fn first_version_of(&self, element: ElementId) -> Option<ElementId> {
        self.members.get(&element).map(|m| m.root)
    }

    /// Full membership record of `element`.
    pub fn membership(&self, element: ElementId) -> Option<Membership> {
        self.members.get(&element).copied()
    }

    /// Whether `element` is the root of its branch.
    pub fn is_branch_root(&self, element: ElementId) -> bool {
        self.first_version_of(element) == Some(element)
    }

    /// Whether `element` currently belongs to a branch.
    pub fn is_tracked(&self, element: ElementId) -> bool {
        self.members.contains_key(&element)
    }

    /// Members of `element`'s branch ordered by version number.
    pub fn branch_members(&self, element: ElementId) -> Vec<(VersionId, ElementId)> {
        let Some(root) = self.first_version_of(element) else {
            return Vec::new();
        };
        self.branches
            .get(&root)
            .map(|versions| versions.iter().map(|(v, e)| (*v, *e)).collect())
            .unwrap_or_default()
    }

    /// All memberships, in unspecified order.
    pub fn memberships(&self) -> impl Iterator<Item = (ElementId, Membership)> + '_ {
        self.members.iter().map(|(e, m)| (*e, *m))
    }

    /// Number of tracked elements.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn slot(&self, root: ElementId, version: VersionId) -> Option<ElementId> {
        self.branches.get(&root)?.get(&version).copied()
    }

    fn anchors_branch(&self, element: ElementId) -> bool {
        self.branches.contains_key(&element)
    }

    fn insert(&mut self, element: ElementId, membership: Membership) {
        self.branches
            .entry(membership.root)
            .or_default()
            .insert(membership.version, element);
        self.members.insert(element, membership);
    }
}
