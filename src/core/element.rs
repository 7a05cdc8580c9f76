//! core::element
//!
//! The versioned element protocol.
//!
//! Every graph element, whatever its domain kind, exposes the same three
//! facts: the version it is valid in, the root of its branch, and the
//! tracker that owns that branch. Elements do not hold these facts
//! themselves; they are read from the tracker's id-indexed tables through a
//! borrowed handle, so there are no back-pointers from elements into the
//! tracker.

use super::tracker::BranchTracker;
use super::types::{ElementId, VersionId};

/// Contract implemented by handles onto tracked element instances.
///
/// Only `element_id` and `tracker` are required; everything else forwards to
/// the tracker. An element that has been pulled out of the live model (its
/// branch membership unregistered) reports `None` for its version and first
/// version.
pub trait VersionedElement {
    /// The identity of this instance.
    fn element_id(&self) -> ElementId;

    /// The tracker owning this element's branch.
    fn tracker(&self) -> &BranchTracker;

    /// The version this instance is valid in.
    fn version(&self) -> Option<VersionId> {
        self.tracker().version_of(self.element_id())
    }

    /// The root of this instance's branch (itself when it is the root).
    fn first_version(&self) -> Option<ElementId> {
        self.tracker().first_version_of(self.element_id())
    }

    /// Whether this instance is the earliest member of its branch.
    fn is_branch_root(&self) -> bool {
        self.first_version() == Some(self.element_id())
    }

    /// The member of this instance's branch valid at `version`.
    fn get_in_version(&self, version: VersionId) -> Option<ElementId> {
        self.tracker().get_in_version(self.element_id(), version)
    }
}
