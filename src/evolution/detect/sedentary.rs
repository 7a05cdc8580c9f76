//! evolution::detect::sedentary
//!
//! Detection of in-place changes: the same identity is present in both
//! versions but its content or position differs.
//!
//! - [`PropertyDetector`] compares content properties of attributes and
//!   associations, one change per differing property.
//! - [`OrderDetector`] compares the relative order of components that exist
//!   in both versions. Insertions and removals around a component do not
//!   count as a move.

use std::collections::HashSet;

use crate::core::types::{ElementId, VersionId};
use crate::model::{ModelView, Scope};

use super::super::change::{EditKind, EvolutionChange, Property, PropertyChange, SubelementChange};
use super::super::verify::holds;
use super::Detector;

/// Content comparison for attributes or associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDetector {
    scope: Scope,
}

impl PropertyDetector {
    pub fn attributes() -> Self {
        Self {
            scope: Scope::Attributes,
        }
    }

    pub fn associations() -> Self {
        Self {
            scope: Scope::Associations,
        }
    }

    fn properties(&self) -> &'static [Property] {
        match self.scope {
            Scope::Associations => &Property::ASSOCIATION,
            _ => &Property::ATTRIBUTE,
        }
    }

    fn change(&self, change: SubelementChange, property: Property) -> EvolutionChange {
        let change = PropertyChange { change, property };
        match self.scope {
            Scope::Associations => EvolutionChange::AssociationModified(change),
            _ => EvolutionChange::AttributeModified(change),
        }
    }
}

impl Detector for PropertyDetector {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn edit_kind(&self) -> EditKind {
        EditKind::Sedentary
    }

    fn detect(
        &self,
        model: &dyn ModelView,
        v1: VersionId,
        v2: VersionId,
        container: ElementId,
    ) -> Vec<EvolutionChange> {
        // A container without a counterpart at v1 has only additions
        let Some(old_container) = model.get_in_version(container, v1) else {
            return Vec::new();
        };

        let mut changes = Vec::new();
        for a in model.collection(container, self.scope).unwrap_or(&[]) {
            let (Some(a1), Some(a2)) = (model.get_in_version(*a, v1), model.get_in_version(*a, v2))
            else {
                continue;
            };
            // Moved in from another container; not an in-place change
            if !holds(model, old_container, self.scope, a1) {
                continue;
            }
            let (Some(old), Some(new)) = (model.properties(a1), model.properties(a2)) else {
                continue;
            };
            for property in self.properties() {
                if property.differs(old, new) {
                    changes.push(self.change(SubelementChange::new(container, a2, v1, v2), *property));
                }
            }
        }
        changes
    }
}

/// Relative-order comparison for components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderDetector;

impl Detector for OrderDetector {
    fn scope(&self) -> Scope {
        Scope::Components
    }

    fn edit_kind(&self) -> EditKind {
        EditKind::Sedentary
    }

    fn detect(
        &self,
        model: &dyn ModelView,
        v1: VersionId,
        v2: VersionId,
        container: ElementId,
    ) -> Vec<EvolutionChange> {
        let Some((old, new)) = survivors(model, container, v1, v2) else {
            return Vec::new();
        };
        new.iter()
            .enumerate()
            .filter(|(to, (root, _))| old.iter().position(|(r, _)| r == root) != Some(*to))
            .map(|(_, (_, a2))| *a2)
            .filter(|a2| holds(model, container, Scope::Components, *a2))
            .map(|a2| EvolutionChange::ComponentMoved(SubelementChange::new(container, a2, v1, v2)))
            .collect()
    }
}

/// `(branch root, instance)` of components present in both versions of
/// `container`, in old and new collection order.
fn survivors(
    model: &dyn ModelView,
    container: ElementId,
    v1: VersionId,
    v2: VersionId,
) -> Option<(Vec<(ElementId, ElementId)>, Vec<(ElementId, ElementId)>)> {
    let tracker = model.tracker();
    let members = |instance: ElementId| -> Vec<(ElementId, ElementId)> {
        model
            .collection(instance, Scope::Components)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| tracker.first_version_of(*id).map(|root| (root, *id)))
            .collect()
    };

    let old = members(model.get_in_version(container, v1)?);
    let new = members(model.get_in_version(container, v2)?);

    let old_roots: HashSet<ElementId> = old.iter().map(|(r, _)| *r).collect();
    let new_roots: HashSet<ElementId> = new.iter().map(|(r, _)| *r).collect();
    let old = old.into_iter().filter(|(r, _)| new_roots.contains(r)).collect();
    let new = new.into_iter().filter(|(r, _)| old_roots.contains(r)).collect();
    Some((old, new))
}

/// Relative positions `(old, new)` of a component among the components both
/// versions of the container share.
pub(crate) fn relative_positions(
    model: &dyn ModelView,
    change: &SubelementChange,
) -> Option<(usize, usize)> {
    let root = model.tracker().first_version_of(change.subelement)?;
    let (old, new) = survivors(model, change.element, change.old_version, change.new_version)?;
    let from = old.iter().position(|(r, _)| *r == root)?;
    let to = new.iter().position(|(r, _)| *r == root)?;
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DesignModel, ElementKind, Multiplicity};

    #[test]
    fn property_detector_reports_each_differing_property() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let person = model.add_class(v1, "Person").unwrap();
        let age = model
            .add_attribute(person, "age", Some("int"), Multiplicity::OPTIONAL)
            .unwrap();

        let v2 = model.branch(v1, "v2").unwrap();
        let person2 = model.get_in_version(person, v2).unwrap();
        let age2 = model.get_in_version(age, v2).unwrap();
        model.set_multiplicity(age2, Multiplicity::ONE).unwrap();
        model.set_data_type(age2, Some("long")).unwrap();

        let changes = PropertyDetector::attributes().detect(&model, v1, v2, person2);
        let properties: Vec<_> = changes.iter().filter_map(|c| c.property()).collect();
        assert_eq!(properties, vec![Property::DataType, Property::Lower]);
        assert!(changes.iter().all(|c| c.subelement() == age2));
    }

    #[test]
    fn unchanged_content_reports_nothing() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let person = model.add_class(v1, "Person").unwrap();
        model.add_attribute(person, "age", None, Multiplicity::ONE).unwrap();
        let v2 = model.branch(v1, "v2").unwrap();
        let person2 = model.get_in_version(person, v2).unwrap();

        assert!(PropertyDetector::attributes().detect(&model, v1, v2, person2).is_empty());
        assert!(OrderDetector.detect(&model, v1, v2, person2).is_empty());
    }

    #[test]
    fn order_detector_ignores_insertions() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        model.add_component(order, ElementKind::ContentContainer, "head").unwrap();
        model.add_component(order, ElementKind::ContentContainer, "body").unwrap();

        let v2 = model.branch(v1, "v2").unwrap();
        let order2 = model.get_in_version(order, v2).unwrap();
        let extra = model.add_component(order2, ElementKind::ContentChoice, "extra").unwrap();
        model.move_component(order2, extra, 0).unwrap();

        assert!(OrderDetector.detect(&model, v1, v2, order2).is_empty());
    }

    #[test]
    fn order_detector_reports_swapped_components() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        let head = model.add_component(order, ElementKind::ContentContainer, "head").unwrap();
        model.add_component(order, ElementKind::ContentContainer, "body").unwrap();

        let v2 = model.branch(v1, "v2").unwrap();
        let order2 = model.get_in_version(order, v2).unwrap();
        let head2 = model.get_in_version(head, v2).unwrap();
        model.move_component(order2, head2, 1).unwrap();

        let changes = OrderDetector.detect(&model, v1, v2, order2);
        assert_eq!(changes.len(), 2);
        let moved = EvolutionChange::ComponentMoved(SubelementChange::new(order2, head2, v1, v2));
        assert!(changes.contains(&moved));
        assert_eq!(relative_positions(&model, moved.base()), Some((0, 1)));
    }
}
