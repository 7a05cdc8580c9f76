//! model::snapshot
//!
//! Model snapshot schema (v1).
//!
//! # Schema Design
//!
//! A snapshot is:
//! - Self-describing with `kind` and `schema_version`
//! - Strictly parsed (unknown fields rejected)
//! - Sealed with a SHA-256 fingerprint over its structural tables (version
//!   tree, element kinds, collections, targets, branch memberships, roots)
//!
//! Labels and element content are not fingerprinted, so they can be edited
//! by hand. Anything that changes identity or structure cannot.
//!
//! Pulled-out elements are persisted as untracked arena slots. Their
//! [`PulledOut`](super::PulledOut) handles do not survive a round trip.
//!
//! # Example
//!
//! ```
//! use evograph::model::snapshot::{parse_snapshot, SNAPSHOT_KIND};
//! use evograph::model::{DesignModel, ModelView};
//!
//! let mut model = DesignModel::new("initial");
//! let v1 = model.root_version();
//! let person = model.add_class(v1, "Person").unwrap();
//! let v2 = model.branch(v1, "next").unwrap();
//!
//! let snapshot = model.to_snapshot();
//! assert_eq!(snapshot.kind, SNAPSHOT_KIND);
//!
//! let json = snapshot.to_json().unwrap();
//! let restored = DesignModel::from_snapshot(&parse_snapshot(&json).unwrap()).unwrap();
//! assert_eq!(restored.get_in_version(person, v2), model.get_in_version(person, v2));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::design::{DesignModel, ElementRecord, ModelError};
use super::{ElementKind, ElementProperties, Scope};
use crate::core::tracker::{BranchTracker, Membership, TrackerError};
use crate::core::types::{ElementId, Fingerprint, VersionId};
use crate::core::version::{Version, VersionError, VersionRegistry};

/// The kind identifier for model snapshots.
pub const SNAPSHOT_KIND: &str = "evograph.model-snapshot";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to parse snapshot: {0}")]
    ParseError(String),

    #[error("failed to serialize snapshot: {0}")]
    SerializeError(String),

    #[error("invalid kind '{found}', expected '{}'", SNAPSHOT_KIND)]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("fingerprint mismatch: recorded {recorded}, computed {computed}")]
    FingerprintMismatch {
        recorded: Fingerprint,
        computed: Fingerprint,
    },

    #[error("element record {found} found at position {expected}")]
    OutOfOrder { expected: ElementId, found: ElementId },

    #[error("{from} references unknown element {target}")]
    DanglingReference { from: String, target: ElementId },

    #[error("invalid snapshot value: {0}")]
    InvalidValue(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct SnapshotEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse snapshot JSON with version dispatch and fingerprint check.
///
/// # Errors
///
/// Returns an error if:
/// - The JSON is malformed or carries unknown fields
/// - The `kind` field doesn't match [`SNAPSHOT_KIND`]
/// - The `schema_version` is not supported
/// - The recorded fingerprint doesn't match the structural tables
pub fn parse_snapshot(json: &str) -> Result<ModelSnapshotV1, SnapshotError> {
    let envelope: SnapshotEnvelope =
        serde_json::from_str(json).map_err(|e| SnapshotError::ParseError(e.to_string()))?;

    if envelope.kind != SNAPSHOT_KIND {
        return Err(SnapshotError::InvalidKind {
            found: envelope.kind,
        });
    }

    match envelope.schema_version {
        1 => {
            let snapshot: ModelSnapshotV1 =
                serde_json::from_str(json).map_err(|e| SnapshotError::ParseError(e.to_string()))?;
            snapshot.validate()?;
            Ok(snapshot)
        }
        v => Err(SnapshotError::UnsupportedVersion(v)),
    }
}

/// A full model snapshot (v1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelSnapshotV1 {
    /// Kind identifier (always "evograph.model-snapshot")
    pub kind: String,

    /// Schema version (always 1 for this struct)
    pub schema_version: u32,

    /// The version tree, in creation order
    pub versions: Vec<Version>,

    /// Every arena slot, in id order
    pub elements: Vec<ElementSnapshot>,

    /// Branch memberships, sorted by element
    pub memberships: Vec<MembershipSnapshot>,

    /// Top-level classes per version
    pub roots: Vec<RootSet>,

    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub kind: ElementKind,
    pub version: VersionId,
    pub properties: ElementProperties,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<Scope, Vec<ElementId>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MembershipSnapshot {
    pub element: ElementId,
    pub root: ElementId,
    pub version: VersionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RootSet {
    pub version: VersionId,
    pub elements: Vec<ElementId>,
}

impl ModelSnapshotV1 {
    /// Canonical lines the fingerprint is computed over.
    fn structural_lines(&self) -> Vec<String> {
        let ids = |ids: &[ElementId]| {
            ids.iter()
                .map(|id| id.index().to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut lines = Vec::new();
        for v in &self.versions {
            let parent = v.created_from.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
            lines.push(format!("version {} {parent}", v.id));
        }
        for e in &self.elements {
            let target = e
                .properties
                .target
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into());
            lines.push(format!("element {} {} {} {target}", e.id, e.kind, e.version));
            for (scope, members) in &e.collections {
                lines.push(format!("collection {} {scope} {}", e.id, ids(members)));
            }
        }
        for m in &self.memberships {
            lines.push(format!("member {} {} {}", m.element, m.root, m.version));
        }
        for r in &self.roots {
            lines.push(format!("roots {} {}", r.version, ids(&r.elements)));
        }
        lines
    }

    /// Recompute the fingerprint from the structural tables.
    pub fn compute_fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.structural_lines())
    }

    /// Validate the envelope and fingerprint.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.kind != SNAPSHOT_KIND {
            return Err(SnapshotError::InvalidKind {
                found: self.kind.clone(),
            });
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.schema_version));
        }
        let computed = self.compute_fingerprint();
        if computed != self.fingerprint {
            tracing::error!(recorded = %self.fingerprint, %computed, "snapshot fingerprint mismatch");
            return Err(SnapshotError::FingerprintMismatch {
                recorded: self.fingerprint.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::SerializeError(e.to_string()))
    }
}

impl DesignModel {
    /// Capture the whole model, history included.
    pub fn to_snapshot(&self) -> ModelSnapshotV1 {
        let elements = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, record)| ElementSnapshot {
                id: ElementId::new(i as u32),
                kind: record.kind,
                version: record.version,
                properties: record.properties.clone(),
                collections: record
                    .collections
                    .iter()
                    .filter(|(_, members)| !members.is_empty())
                    .map(|(scope, members)| (*scope, members.clone()))
                    .collect(),
            })
            .collect();

        let mut memberships: Vec<MembershipSnapshot> = self
            .tracker
            .memberships()
            .map(|(element, m)| MembershipSnapshot {
                element,
                root: m.root,
                version: m.version,
            })
            .collect();
        memberships.sort_by_key(|m| m.element);

        let roots = self
            .roots
            .iter()
            .map(|(version, elements)| RootSet {
                version: *version,
                elements: elements.clone(),
            })
            .collect();

        let mut snapshot = ModelSnapshotV1 {
            kind: SNAPSHOT_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            versions: self.versions.iter().cloned().collect(),
            elements,
            memberships,
            roots,
            fingerprint: Fingerprint::compute(&[]),
        };
        snapshot.fingerprint = snapshot.compute_fingerprint();
        snapshot
    }

    /// Rebuild a model from a snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot does not validate, or if any table references
    /// an unknown version or element, or if the memberships break branch
    /// tracker invariants.
    pub fn from_snapshot(snapshot: &ModelSnapshotV1) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        if snapshot.versions.is_empty() {
            return Err(SnapshotError::InvalidValue("snapshot has no versions".into()));
        }

        let mut versions = VersionRegistry::new();
        for version in &snapshot.versions {
            versions.restore(version.clone())?;
        }

        let len = snapshot.elements.len();
        let known = |from: String, target: ElementId| {
            if target.slot() < len {
                Ok(())
            } else {
                Err(SnapshotError::DanglingReference { from, target })
            }
        };

        let mut elements = Vec::with_capacity(len);
        for (i, e) in snapshot.elements.iter().enumerate() {
            let expected = ElementId::new(i as u32);
            if e.id != expected {
                return Err(SnapshotError::OutOfOrder {
                    expected,
                    found: e.id,
                });
            }
            if !versions.contains(e.version) {
                return Err(VersionError::UnknownVersion(e.version).into());
            }
            if let Some(target) = e.properties.target {
                known(format!("target of {}", e.id), target)?;
            }

            let mut record = ElementRecord::new(e.kind, e.version, e.properties.clone());
            for (scope, members) in &e.collections {
                let slot = record.collections.get_mut(scope).ok_or(ModelError::ScopeNotSupported {
                    element: e.id,
                    kind: e.kind,
                    scope: *scope,
                })?;
                for member in members {
                    known(format!("{scope} of {}", e.id), *member)?;
                }
                slot.clone_from(members);
            }
            elements.push(record);
        }

        let mut tracker = BranchTracker::new();
        for m in &snapshot.memberships {
            known("membership".into(), m.element)?;
            known(format!("membership of {}", m.element), m.root)?;
            let home = elements[m.element.slot()].version;
            if home != m.version {
                return Err(ModelError::CrossVersion {
                    element: m.element,
                    expected: home,
                    found: m.version,
                }
                .into());
            }
            tracker.restore(
                m.element,
                Membership {
                    root: m.root,
                    version: m.version,
                },
            )?;
        }

        let mut roots = BTreeMap::new();
        for set in &snapshot.roots {
            if !versions.contains(set.version) {
                return Err(VersionError::UnknownVersion(set.version).into());
            }
            for id in &set.elements {
                known(format!("roots of {}", set.version), *id)?;
            }
            roots.insert(set.version, set.elements.clone());
        }
        for version in versions.iter() {
            roots.entry(version.id).or_insert_with(Vec::new);
        }

        tracing::debug!(
            versions = versions.len(),
            elements = elements.len(),
            tracked = tracker.len(),
            "restored model snapshot"
        );
        Ok(Self {
            versions,
            tracker,
            elements,
            roots,
        })
    }

    /// Write a snapshot of the model to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = self.to_snapshot().to_json()?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a model from a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_snapshot(&parse_snapshot(&json)?)
    }
}
