//! evolution::verify
//!
//! Postcondition checks for detected changes.
//!
//! # Contract
//!
//! - **Addition**: the subelement does not resolve at the old version and
//!   resolves to itself at the new version; the container's collection holds
//!   it; the container's old-version counterpart (if any) does not.
//! - **Removal**: the subelement resolves to itself at the old version and
//!   not at the new version; the old-version container holds it; the
//!   container's collection does not.
//! - **Sedentary**: the subelement resolves at both versions, both
//!   containers hold it, and the compared content actually differs.
//!
//! Collection membership is checked by identity (branch root), not by
//! instance id, so a container from a later version still "holds" the
//! instance of the same branch.
//!
//! A failure means a detector bug or corrupted bookkeeping. It is returned
//! as a value so tests and optional runtime checks can use the same code.
//!
//! # Invariants
//!
//! - Never mutates the graph
//! - Deterministic

use thiserror::Error;

use crate::core::types::{ElementId, VersionId};
use crate::model::{ModelView, Scope};

use super::change::{EditKind, EvolutionChange, Property};

/// A violated change postcondition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("{subelement} unexpectedly resolves at {version}")]
    ResolvesAt {
        subelement: ElementId,
        version: VersionId,
    },

    #[error("{subelement} resolves to {resolved:?} at {version}, expected itself")]
    NotSelfAt {
        subelement: ElementId,
        version: VersionId,
        resolved: Option<ElementId>,
    },

    #[error("{subelement} does not resolve at {version}")]
    MissingAt {
        subelement: ElementId,
        version: VersionId,
    },

    #[error("container {container} does not resolve at {version}")]
    ContainerMissing {
        container: ElementId,
        version: VersionId,
    },

    #[error("{scope} of {container} does not hold {subelement}")]
    NotInCollection {
        container: ElementId,
        scope: Scope,
        subelement: ElementId,
    },

    #[error("{scope} of {container} still holds {subelement}")]
    StillInCollection {
        container: ElementId,
        scope: Scope,
        subelement: ElementId,
    },

    #[error("{property} of {subelement} is identical in both versions")]
    Unchanged {
        subelement: ElementId,
        property: Property,
    },

    #[error("{subelement} keeps its relative position in {container}")]
    NotMoved {
        container: ElementId,
        subelement: ElementId,
    },
}

/// Re-check `change` against the live graph.
pub fn verify(change: &EvolutionChange, model: &dyn ModelView) -> Result<(), VerifyError> {
    let result = match change.edit_kind() {
        EditKind::Addition => verify_addition(change, model),
        EditKind::Removal => verify_removal(change, model),
        EditKind::Sedentary => verify_sedentary(change, model),
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, ?change, "change failed verification");
    }
    result
}

fn verify_addition(change: &EvolutionChange, model: &dyn ModelView) -> Result<(), VerifyError> {
    let base = change.base();
    let scope = change.scope();
    let sub = base.subelement;

    if model.get_in_version(sub, base.old_version).is_some() {
        return Err(VerifyError::ResolvesAt {
            subelement: sub,
            version: base.old_version,
        });
    }
    expect_self(model, sub, base.new_version)?;

    if !holds(model, base.element, scope, sub) {
        return Err(VerifyError::NotInCollection {
            container: base.element,
            scope,
            subelement: sub,
        });
    }
    if let Some(old) = model.get_in_version(base.element, base.old_version) {
        if holds(model, old, scope, sub) {
            return Err(VerifyError::StillInCollection {
                container: old,
                scope,
                subelement: sub,
            });
        }
    }
    Ok(())
}

fn verify_removal(change: &EvolutionChange, model: &dyn ModelView) -> Result<(), VerifyError> {
    let base = change.base();
    let scope = change.scope();
    let sub = base.subelement;

    expect_self(model, sub, base.old_version)?;
    if model.get_in_version(sub, base.new_version).is_some() {
        return Err(VerifyError::ResolvesAt {
            subelement: sub,
            version: base.new_version,
        });
    }

    let old = model
        .get_in_version(base.element, base.old_version)
        .ok_or(VerifyError::ContainerMissing {
            container: base.element,
            version: base.old_version,
        })?;
    if !holds(model, old, scope, sub) {
        return Err(VerifyError::NotInCollection {
            container: old,
            scope,
            subelement: sub,
        });
    }
    if holds(model, base.element, scope, sub) {
        return Err(VerifyError::StillInCollection {
            container: base.element,
            scope,
            subelement: sub,
        });
    }
    Ok(())
}

fn verify_sedentary(change: &EvolutionChange, model: &dyn ModelView) -> Result<(), VerifyError> {
    let base = change.base();
    let scope = change.scope();
    let sub = base.subelement;

    let old_sub = model
        .get_in_version(sub, base.old_version)
        .ok_or(VerifyError::MissingAt {
            subelement: sub,
            version: base.old_version,
        })?;
    expect_self(model, sub, base.new_version)?;

    if !holds(model, base.element, scope, sub) {
        return Err(VerifyError::NotInCollection {
            container: base.element,
            scope,
            subelement: sub,
        });
    }
    let old_container = model
        .get_in_version(base.element, base.old_version)
        .ok_or(VerifyError::ContainerMissing {
            container: base.element,
            version: base.old_version,
        })?;
    if !holds(model, old_container, scope, sub) {
        return Err(VerifyError::NotInCollection {
            container: old_container,
            scope,
            subelement: sub,
        });
    }

    match change {
        EvolutionChange::ComponentMoved(_) => match super::detect::relative_positions(model, base) {
            Some((from, to)) if from != to => Ok(()),
            _ => Err(VerifyError::NotMoved {
                container: base.element,
                subelement: sub,
            }),
        },
        _ => {
            let property = change.property().unwrap_or(Property::Name);
            let differs = match (model.properties(old_sub), model.properties(sub)) {
                (Some(old), Some(new)) => property.differs(old, new),
                _ => false,
            };
            if differs {
                Ok(())
            } else {
                Err(VerifyError::Unchanged {
                    subelement: sub,
                    property,
                })
            }
        }
    }
}

fn expect_self(model: &dyn ModelView, sub: ElementId, version: VersionId) -> Result<(), VerifyError> {
    let resolved = model.get_in_version(sub, version);
    if resolved == Some(sub) {
        Ok(())
    } else {
        Err(VerifyError::NotSelfAt {
            subelement: sub,
            version,
            resolved,
        })
    }
}

/// Whether `container`'s `scope` collection holds a member of `sub`'s branch.
pub(crate) fn holds(model: &dyn ModelView, container: ElementId, scope: Scope, sub: ElementId) -> bool {
    let tracker = model.tracker();
    let Some(root) = tracker.first_version_of(sub) else {
        return false;
    };
    model
        .collection(container, scope)
        .unwrap_or(&[])
        .iter()
        .any(|id| *id == sub || tracker.first_version_of(*id) == Some(root))
}
