//! evolution::detect
//!
//! Change detectors and the registry that dispatches to them.
//!
//! # Contract
//!
//! A [`Detector`] is a pure, read-only function
//! `(model, v1, v2, container) -> changes`. It never fails: identities that
//! do not resolve in a version are treated as absent, and a container that
//! does not expose the detector's scope yields no changes.
//!
//! # Registry
//!
//! [`DetectorRegistry`] maps each `(scope, edit kind)` pair to exactly one
//! detector. Registration is explicit; [`DetectorRegistry::standard`]
//! registers the built-in set:
//!
//! | Scope           | Addition / Removal    | Sedentary            |
//! |-----------------|-----------------------|----------------------|
//! | attributes      | [`PresenceDetector`]  | [`PropertyDetector`] |
//! | generalizations | [`PresenceDetector`]  |                      |
//! | components      | [`PresenceDetector`]  | [`OrderDetector`]    |
//! | associations    | [`PresenceDetector`]  | [`PropertyDetector`] |
//! | union members   | [`PresenceDetector`]  |                      |
//!
//! # Ordering
//!
//! Each detector emits changes in collection order. The registry runs
//! detectors in `(scope, edit kind)` order. Use [`ChangeOrder::Scope`] to get
//! a total order independent of collection layout.
//!
//! # Example
//!
//! ```
//! use evograph::evolution::detect::{DetectOptions, DetectorRegistry};
//! use evograph::model::{DesignModel, ModelView, Multiplicity};
//!
//! let mut model = DesignModel::new("v1");
//! let v1 = model.root_version();
//! let person = model.add_class(v1, "Person").unwrap();
//! let v2 = model.branch(v1, "v2").unwrap();
//! let person2 = model.get_in_version(person, v2).unwrap();
//! model.add_attribute(person2, "age", Some("int"), Multiplicity::ONE).unwrap();
//!
//! let registry = DetectorRegistry::standard();
//! let changes = registry
//!     .detect(&model, v1, v2, person2, &DetectOptions::default())
//!     .unwrap();
//! assert_eq!(changes.len(), 1);
//! assert!(changes.invalidates_attributes(&model));
//! ```

mod presence;
mod sedentary;

pub use presence::PresenceDetector;
pub use sedentary::{OrderDetector, PropertyDetector};

pub(crate) use sedentary::relative_positions;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{ElementId, VersionId};
use crate::model::{ElementKind, ModelView, Scope};

use super::change::{EditKind, EvolutionChange};
use super::report::ChangeSet;
use super::verify::VerifyError;

/// A detector for one `(scope, edit kind)` pair.
pub trait Detector {
    fn scope(&self) -> Scope;

    fn edit_kind(&self) -> EditKind;

    /// Whether containers of `kind` can be inspected by this detector.
    fn applies_to(&self, kind: ElementKind) -> bool {
        kind.supports(self.scope())
    }

    /// Compare `container`'s relationship state at `v1` and `v2`.
    fn detect(
        &self,
        model: &dyn ModelView,
        v1: VersionId,
        v2: VersionId,
        container: ElementId,
    ) -> Vec<EvolutionChange>;
}

/// Errors from registry construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a {edit_kind} detector for {scope} is already registered")]
    Duplicate { scope: Scope, edit_kind: EditKind },
}

/// Errors from a detection pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("detected change failed verification: {change}")]
    Verification {
        change: String,
        #[source]
        source: VerifyError,
    },
}

/// How a detection pass orders its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrder {
    /// Registry order, then collection order
    #[default]
    Collection,
    /// Sorted by scope, edit kind, then sub-element name
    Scope,
}

/// Options for [`DetectorRegistry::detect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Verify every detected change before returning
    pub verify: bool,
    pub order: ChangeOrder,
    /// Restrict detection to these scopes (`None` = all)
    pub scopes: Option<BTreeSet<Scope>>,
}

impl DetectOptions {
    /// Options with verification enabled.
    pub fn verified() -> Self {
        Self {
            verify: true,
            ..Self::default()
        }
    }

    pub fn scope_enabled(&self, scope: Scope) -> bool {
        self.scopes.as_ref().map_or(true, |s| s.contains(&scope))
    }
}

/// Explicit `(scope, edit kind) -> detector` mapping.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: BTreeMap<(Scope, EditKind), Box<dyn Detector>>,
}

impl DetectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in detector.
    pub fn standard() -> Self {
        let mut detectors: BTreeMap<(Scope, EditKind), Box<dyn Detector>> = BTreeMap::new();
        for scope in Scope::ALL {
            detectors.insert((scope, EditKind::Addition), Box::new(PresenceDetector::additions(scope)));
            detectors.insert((scope, EditKind::Removal), Box::new(PresenceDetector::removals(scope)));
        }
        detectors.insert(
            (Scope::Attributes, EditKind::Sedentary),
            Box::new(PropertyDetector::attributes()),
        );
        detectors.insert(
            (Scope::Associations, EditKind::Sedentary),
            Box::new(PropertyDetector::associations()),
        );
        detectors.insert((Scope::Components, EditKind::Sedentary), Box::new(OrderDetector));
        Self { detectors }
    }

    /// Register `detector` under its `(scope, edit kind)`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if that pair already has a detector.
    pub fn register(&mut self, detector: Box<dyn Detector>) -> Result<(), RegistryError> {
        let key = (detector.scope(), detector.edit_kind());
        if self.detectors.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                scope: key.0,
                edit_kind: key.1,
            });
        }
        self.detectors.insert(key, detector);
        Ok(())
    }

    /// The detector registered for `(scope, edit_kind)`.
    pub fn get(&self, scope: Scope, edit_kind: EditKind) -> Option<&dyn Detector> {
        self.detectors.get(&(scope, edit_kind)).map(|d| d.as_ref())
    }

    /// Registered pairs, in dispatch order.
    pub fn keys(&self) -> impl Iterator<Item = (Scope, EditKind)> + '_ {
        self.detectors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every enabled detector applicable to `container`.
    ///
    /// A container that does not resolve to a known element yields an empty
    /// change set.
    ///
    /// # Errors
    ///
    /// [`DetectError::Verification`] when `options.verify` is set and a
    /// detected change fails its postconditions.
    pub fn detect(
        &self,
        model: &dyn ModelView,
        v1: VersionId,
        v2: VersionId,
        container: ElementId,
        options: &DetectOptions,
    ) -> Result<ChangeSet, DetectError> {
        let Some(kind) = model.kind(container) else {
            tracing::debug!(%container, "container does not resolve; nothing to detect");
            return Ok(ChangeSet::new());
        };

        let mut changes = ChangeSet::new();
        for ((scope, edit_kind), detector) in &self.detectors {
            if !options.scope_enabled(*scope) || !detector.applies_to(kind) {
                continue;
            }
            let found = detector.detect(model, v1, v2, container);
            tracing::trace!(%container, %scope, %edit_kind, found = found.len(), "ran detector");
            changes.extend(found);
        }

        if options.verify {
            for change in changes.iter() {
                change
                    .verify(model)
                    .map_err(|source| DetectError::Verification {
                        change: change.describe(model),
                        source,
                    })?;
            }
        }
        if options.order == ChangeOrder::Scope {
            changes.sort(model);
        }

        tracing::debug!(%container, %v1, %v2, changes = changes.len(), "detection pass complete");
        Ok(changes)
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("detectors", &self.detectors.keys().collect::<Vec<_>>())
            .finish()
    }
}
