//! evolution::change
//!
//! The closed taxonomy of structural changes.
//!
//! # Taxonomy
//!
//! Every change is tagged with exactly one relationship [`Scope`] and one
//! [`EditKind`]. Each valid `(scope, edit kind)` pair is one variant of
//! [`EvolutionChange`], so consumers can match exhaustively:
//!
//! | Scope           | Addition              | Removal                 | Sedentary             |
//! |-----------------|-----------------------|-------------------------|-----------------------|
//! | attributes      | `AttributeAdded`      | `AttributeRemoved`      | `AttributeModified`   |
//! | generalizations | `GeneralizationAdded` | `GeneralizationRemoved` |                       |
//! | components      | `ComponentAdded`      | `ComponentRemoved`      | `ComponentMoved`      |
//! | associations    | `AssociationAdded`    | `AssociationRemoved`    | `AssociationModified` |
//! | union members   | `UnionMemberAdded`    | `UnionMemberRemoved`    |                       |
//!
//! Changes carry ids and versions only. Names, bounds and other content are
//! read back from the graph on demand, which is why `describe`, `verify` and
//! the impact flags take a [`ModelView`].

use serde::{Deserialize, Serialize};

use crate::core::types::{ElementId, VersionId};
use crate::model::{ElementProperties, ModelView, Scope};

use super::verify::VerifyError;

/// Whether a change adds, removes, or modifies in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Addition,
    Removal,
    /// Same identity present in both versions, differing content
    Sedentary,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EditKind::Addition => "addition",
            EditKind::Removal => "removal",
            EditKind::Sedentary => "sedentary",
        })
    }
}

/// A content property compared by sedentary detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Name,
    DataType,
    Lower,
    Upper,
    Default,
}

impl Property {
    /// Properties compared for attributes.
    pub const ATTRIBUTE: [Property; 5] = [
        Property::Name,
        Property::DataType,
        Property::Lower,
        Property::Upper,
        Property::Default,
    ];

    /// Properties compared for associations.
    pub const ASSOCIATION: [Property; 3] = [Property::Name, Property::Lower, Property::Upper];

    /// Render this property of `props` for comparison and display.
    pub fn value(self, props: &ElementProperties) -> String {
        let multiplicity = props.multiplicity.unwrap_or_default();
        match self {
            Property::Name => props.name.clone(),
            Property::DataType => props.data_type.clone().unwrap_or_else(|| "-".into()),
            Property::Lower => multiplicity.lower.to_string(),
            Property::Upper => multiplicity
                .upper
                .map(|u| u.to_string())
                .unwrap_or_else(|| "*".into()),
            Property::Default => props.default.clone().unwrap_or_else(|| "-".into()),
        }
    }

    /// Whether the property differs between two content records.
    pub fn differs(self, old: &ElementProperties, new: &ElementProperties) -> bool {
        self.value(old) != self.value(new)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::DataType => "type",
            Property::Lower => "lower bound",
            Property::Upper => "upper bound",
            Property::Default => "default value",
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields every change carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubelementChange {
    /// The container whose relationship changed
    pub element: ElementId,
    /// The related element added, removed, modified or moved
    pub subelement: ElementId,
    pub old_version: VersionId,
    pub new_version: VersionId,
}

impl SubelementChange {
    pub fn new(
        element: ElementId,
        subelement: ElementId,
        old_version: VersionId,
        new_version: VersionId,
    ) -> Self {
        Self {
            element,
            subelement,
            old_version,
            new_version,
        }
    }
}

/// A sedentary change of one content property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyChange {
    #[serde(flatten)]
    pub change: SubelementChange,
    pub property: Property,
}

/// A detected structural difference between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum EvolutionChange {
    AttributeAdded(SubelementChange),
    AttributeRemoved(SubelementChange),
    AttributeModified(PropertyChange),
    GeneralizationAdded(SubelementChange),
    GeneralizationRemoved(SubelementChange),
    ComponentAdded(SubelementChange),
    ComponentRemoved(SubelementChange),
    ComponentMoved(SubelementChange),
    AssociationAdded(SubelementChange),
    AssociationRemoved(SubelementChange),
    AssociationModified(PropertyChange),
    UnionMemberAdded(SubelementChange),
    UnionMemberRemoved(SubelementChange),
}

impl EvolutionChange {
    /// The addition variant of `scope`.
    pub fn added(scope: Scope, change: SubelementChange) -> Self {
        match scope {
            Scope::Attributes => Self::AttributeAdded(change),
            Scope::Generalizations => Self::GeneralizationAdded(change),
            Scope::Components => Self::ComponentAdded(change),
            Scope::Associations => Self::AssociationAdded(change),
            Scope::UnionMembers => Self::UnionMemberAdded(change),
        }
    }

    /// The removal variant of `scope`.
    pub fn removed(scope: Scope, change: SubelementChange) -> Self {
        match scope {
            Scope::Attributes => Self::AttributeRemoved(change),
            Scope::Generalizations => Self::GeneralizationRemoved(change),
            Scope::Components => Self::ComponentRemoved(change),
            Scope::Associations => Self::AssociationRemoved(change),
            Scope::UnionMembers => Self::UnionMemberRemoved(change),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::AttributeAdded(_) | Self::AttributeRemoved(_) | Self::AttributeModified(_) => {
                Scope::Attributes
            }
            Self::GeneralizationAdded(_) | Self::GeneralizationRemoved(_) => Scope::Generalizations,
            Self::ComponentAdded(_) | Self::ComponentRemoved(_) | Self::ComponentMoved(_) => {
                Scope::Components
            }
            Self::AssociationAdded(_)
            | Self::AssociationRemoved(_)
            | Self::AssociationModified(_) => Scope::Associations,
            Self::UnionMemberAdded(_) | Self::UnionMemberRemoved(_) => Scope::UnionMembers,
        }
    }

    pub fn edit_kind(&self) -> EditKind {
        match self {
            Self::AttributeAdded(_)
            | Self::GeneralizationAdded(_)
            | Self::ComponentAdded(_)
            | Self::AssociationAdded(_)
            | Self::UnionMemberAdded(_) => EditKind::Addition,
            Self::AttributeRemoved(_)
            | Self::GeneralizationRemoved(_)
            | Self::ComponentRemoved(_)
            | Self::AssociationRemoved(_)
            | Self::UnionMemberRemoved(_) => EditKind::Removal,
            Self::AttributeModified(_) | Self::AssociationModified(_) | Self::ComponentMoved(_) => {
                EditKind::Sedentary
            }
        }
    }

    /// The shared id/version fields.
    pub fn base(&self) -> &SubelementChange {
        match self {
            Self::AttributeModified(p) | Self::AssociationModified(p) => &p.change,
            Self::AttributeAdded(c)
            | Self::AttributeRemoved(c)
            | Self::GeneralizationAdded(c)
            | Self::GeneralizationRemoved(c)
            | Self::ComponentAdded(c)
            | Self::ComponentRemoved(c)
            | Self::ComponentMoved(c)
            | Self::AssociationAdded(c)
            | Self::AssociationRemoved(c)
            | Self::UnionMemberAdded(c)
            | Self::UnionMemberRemoved(c) => c,
        }
    }

    /// The container whose relationship changed.
    pub fn element(&self) -> ElementId {
        self.base().element
    }

    /// The related element this change is about.
    pub fn subelement(&self) -> ElementId {
        self.base().subelement
    }

    pub fn old_version(&self) -> VersionId {
        self.base().old_version
    }

    pub fn new_version(&self) -> VersionId {
        self.base().new_version
    }

    /// The element added or removed. `None` for sedentary changes.
    pub fn changed_subelement(&self) -> Option<ElementId> {
        match self.edit_kind() {
            EditKind::Addition | EditKind::Removal => Some(self.subelement()),
            EditKind::Sedentary => None,
        }
    }

    /// The property a modification changed.
    pub fn property(&self) -> Option<Property> {
        match self {
            Self::AttributeModified(p) | Self::AssociationModified(p) => Some(p.property),
            _ => None,
        }
    }

    /// Re-check this change against the live graph.
    ///
    /// See [`super::verify::verify`].
    pub fn verify(&self, model: &dyn ModelView) -> Result<(), VerifyError> {
        super::verify::verify(self, model)
    }

    /// Whether derived artifacts relying on attribute completeness are stale.
    pub fn invalidates_attributes(&self, model: &dyn ModelView) -> bool {
        super::impact::invalidates_attributes(self, model)
    }

    /// Whether derived artifacts relying on content-model completeness are
    /// stale.
    pub fn invalidates_content(&self, model: &dyn ModelView) -> bool {
        super::impact::invalidates_content(self, model)
    }

    /// Human-readable one-line description.
    pub fn describe(&self, model: &dyn ModelView) -> String {
        let base = self.base();
        let container = container_label(model, base.element);
        let sub = subelement_label(model, base.subelement);
        let versions = format!("({} -> {})", base.old_version, base.new_version);

        match self {
            Self::AttributeModified(p) | Self::AssociationModified(p) => {
                let old = model
                    .get_in_version(base.subelement, base.old_version)
                    .and_then(|id| model.properties(id))
                    .map(|props| p.property.value(props))
                    .unwrap_or_else(|| "?".into());
                let new = model
                    .properties(base.subelement)
                    .map(|props| p.property.value(props))
                    .unwrap_or_else(|| "?".into());
                format!(
                    "{sub} of {container}: {} changed from '{old}' to '{new}' {versions}",
                    p.property
                )
            }
            Self::ComponentMoved(_) => match super::detect::relative_positions(model, base) {
                Some((from, to)) => {
                    format!("{sub} moved from position {from} to {to} in {container} {versions}")
                }
                None => format!("{sub} moved in {container} {versions}"),
            },
            Self::GeneralizationAdded(_) => {
                format!("{container} now specializes {sub} {versions}")
            }
            Self::GeneralizationRemoved(_) => {
                format!("{container} no longer specializes {sub} {versions}")
            }
            _ => match self.edit_kind() {
                EditKind::Addition => format!("{sub} added to {container} {versions}"),
                _ => format!("{sub} removed from {container} {versions}"),
            },
        }
    }
}

fn container_label(model: &dyn ModelView, id: ElementId) -> String {
    match model.kind(id) {
        Some(kind) => format!("{kind} '{}'", model.name_of(id)),
        None => format!("element {id}"),
    }
}

/// Generalizations are named after their general class.
fn subelement_label(model: &dyn ModelView, id: ElementId) -> String {
    use crate::model::ElementKind;

    match model.kind(id) {
        Some(ElementKind::Generalization) => {
            let target = model.properties(id).and_then(|p| p.target);
            match target {
                Some(general) => container_label(model, general),
                None => format!("class '{}'", model.name_of(id)),
            }
        }
        Some(_) => container_label(model, id),
        None => format!("element {id}"),
    }
}
