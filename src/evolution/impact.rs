//! evolution::impact
//!
//! Downstream impact classification.
//!
//! Generated artifacts (schemas, content models) depend on the completeness
//! of a container's attributes and content. A change *invalidates* such an
//! artifact when a document valid before the change may be invalid after it.
//!
//! Flags are computed from the change's structural parameters every time
//! they are read; nothing is cached on the change.
//!
//! # Rules
//!
//! - Additions invalidate only when the added element is required (lower
//!   bound greater than zero).
//! - Removals invalidate unconditionally.
//! - Attribute changes in a class-like container affect attributes; in a
//!   content-model container they affect content.
//! - Component, association and union member changes affect content only.
//! - Adding a generalization affects whatever required structure the general
//!   class brings along, including what it inherits through its own
//!   generalizations; removing one affects both.

use std::collections::HashSet;

use crate::core::types::ElementId;
use crate::model::{ElementKind, ModelView, Scope};

use super::change::{EvolutionChange, Property};

/// Whether `change` invalidates artifacts relying on attribute completeness.
pub fn invalidates_attributes(change: &EvolutionChange, model: &dyn ModelView) -> bool {
    use EvolutionChange::*;

    match change {
        AttributeAdded(_) => class_like(change, model) && required(change, model),
        AttributeRemoved(_) => class_like(change, model),
        AttributeModified(p) => class_like(change, model) && structural(p.property),
        GeneralizationAdded(_) => inherited(change, model)
            .iter()
            .any(|class| has_required(model, *class, Scope::Attributes)),
        GeneralizationRemoved(_) => true,
        ComponentAdded(_)
        | ComponentRemoved(_)
        | ComponentMoved(_)
        | AssociationAdded(_)
        | AssociationRemoved(_)
        | AssociationModified(_)
        | UnionMemberAdded(_)
        | UnionMemberRemoved(_) => false,
    }
}

/// Whether `change` invalidates artifacts relying on content completeness.
pub fn invalidates_content(change: &EvolutionChange, model: &dyn ModelView) -> bool {
    use EvolutionChange::*;

    match change {
        AttributeAdded(_) => content_model(change, model) && required(change, model),
        AttributeRemoved(_) => content_model(change, model),
        AttributeModified(p) => content_model(change, model) && structural(p.property),
        GeneralizationAdded(_) => inherited(change, model).iter().any(|class| {
            has_required(model, *class, Scope::Components)
                || has_required(model, *class, Scope::Associations)
        }),
        GeneralizationRemoved(_) => true,
        ComponentAdded(_) | AssociationAdded(_) => required(change, model),
        ComponentRemoved(_) | ComponentMoved(_) | AssociationRemoved(_) | AssociationModified(_) => {
            true
        }
        // A union gaining an alternative accepts strictly more documents
        UnionMemberAdded(_) => false,
        UnionMemberRemoved(_) => true,
    }
}

fn container_kind(change: &EvolutionChange, model: &dyn ModelView) -> Option<ElementKind> {
    model.kind(change.element())
}

fn class_like(change: &EvolutionChange, model: &dyn ModelView) -> bool {
    container_kind(change, model).is_some_and(ElementKind::is_class_like)
}

fn content_model(change: &EvolutionChange, model: &dyn ModelView) -> bool {
    container_kind(change, model).is_some_and(ElementKind::is_content_model)
}

/// Defaults do not affect validity.
fn structural(property: Property) -> bool {
    !matches!(property, Property::Default)
}

/// Lower bound of the added element in the new version.
fn required(change: &EvolutionChange, model: &dyn ModelView) -> bool {
    model
        .get_in_version(change.subelement(), change.new_version())
        .and_then(|id| model.properties(id))
        .is_some_and(|props| props.lower_bound() > 0)
}

/// The general class of an added generalization, resolved in the new version.
fn general_class(change: &EvolutionChange, model: &dyn ModelView) -> Option<ElementId> {
    let target = model.properties(change.subelement())?.target?;
    model.get_in_version(target, change.new_version())
}

/// The general class of an added generalization and every class it
/// specializes in turn, all in the new version. Cycles are cut.
fn inherited(change: &EvolutionChange, model: &dyn ModelView) -> Vec<ElementId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut pending: Vec<ElementId> = general_class(change, model).into_iter().collect();
    while let Some(class) = pending.pop() {
        if !seen.insert(class) {
            continue;
        }
        order.push(class);
        pending.extend(
            model
                .collection(class, Scope::Generalizations)
                .unwrap_or(&[])
                .iter()
                .filter_map(|link| model.properties(*link)?.target),
        );
    }
    order
}

fn has_required(model: &dyn ModelView, container: ElementId, scope: Scope) -> bool {
    model
        .collection(container, scope)
        .unwrap_or(&[])
        .iter()
        .filter_map(|id| model.properties(*id))
        .any(|props| props.lower_bound() > 0)
}
