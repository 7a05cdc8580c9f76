//! evolution::detect::presence
//!
//! Identity-based presence detection, shared by every relationship scope.
//!
//! # Algorithm
//!
//! - **Additions**: for each `a` in the container's collection, emit when
//!   `a` does not resolve at `v1` but resolves at `v2`. The change names the
//!   `v2` instance.
//! - **Removals**: resolve the container at `v1` (skip when it is new); for
//!   each `a` in that instance's collection, emit when `a` resolves at `v1`
//!   but not at `v2`. The change names the `v1` instance.
//!
//! Changes come out in collection order.

use crate::core::types::{ElementId, VersionId};
use crate::model::{ModelView, Scope};

use super::super::change::{EditKind, EvolutionChange, SubelementChange};
use super::Detector;

/// Presence detector for one scope and one of addition / removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceDetector {
    scope: Scope,
    removals: bool,
}

impl PresenceDetector {
    /// Detects sub-elements added to `scope`.
    pub fn additions(scope: Scope) -> Self {
        Self {
            scope,
            removals: false,
        }
    }

    /// Detects sub-elements removed from `scope`.
    pub fn removals(scope: Scope) -> Self {
        Self {
            scope,
            removals: true,
        }
    }
}

impl Detector for PresenceDetector {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn edit_kind(&self) -> EditKind {
        if self.removals {
            EditKind::Removal
        } else {
            EditKind::Addition
        }
    }

    fn detect(
        &self,
        model: &dyn ModelView,
        v1: VersionId,
        v2: VersionId,
        container: ElementId,
    ) -> Vec<EvolutionChange> {
        if self.removals {
            detect_removals(model, self.scope, v1, v2, container)
        } else {
            detect_additions(model, self.scope, v1, v2, container)
        }
    }
}

fn detect_additions(
    model: &dyn ModelView,
    scope: Scope,
    v1: VersionId,
    v2: VersionId,
    container: ElementId,
) -> Vec<EvolutionChange> {
    let members = model.collection(container, scope).unwrap_or(&[]);
    members
        .iter()
        .filter(|a| model.get_in_version(**a, v1).is_none())
        .filter_map(|a| model.get_in_version(*a, v2))
        .map(|a2| EvolutionChange::added(scope, SubelementChange::new(container, a2, v1, v2)))
        .collect()
}

fn detect_removals(
    model: &dyn ModelView,
    scope: Scope,
    v1: VersionId,
    v2: VersionId,
    container: ElementId,
) -> Vec<EvolutionChange> {
    let Some(old) = model.get_in_version(container, v1) else {
        return Vec::new();
    };
    let members = model.collection(old, scope).unwrap_or(&[]);
    members
        .iter()
        .filter_map(|a| model.get_in_version(*a, v1))
        .filter(|a1| model.get_in_version(*a1, v2).is_none())
        .map(|a1| EvolutionChange::removed(scope, SubelementChange::new(container, a1, v1, v2)))
        .collect()
}
