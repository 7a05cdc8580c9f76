//! model
//!
//! The design element graph as seen by the evolution engine.
//!
//! # Modules
//!
//! - [`design`] - Arena-backed model and its mutation layer
//! - [`snapshot`] - Self-describing JSON persistence of a model
//!
//! # The read seam
//!
//! Detectors and verification read the graph only through [`ModelView`]:
//! element kinds, content properties, ordered per-scope collections, and
//! identity lookup. Domain content is otherwise opaque to them.

pub mod design;
pub mod snapshot;

pub use design::{DesignModel, ModelError, PulledOut};
pub use snapshot::{parse_snapshot, ModelSnapshotV1, SnapshotError};

use serde::{Deserialize, Serialize};

use crate::core::element::VersionedElement;
use crate::core::tracker::BranchTracker;
use crate::core::types::{ElementId, VersionId};
use crate::core::version::VersionRegistry;

/// A category of structural relationship between a container and its
/// sub-elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Owned attributes
    Attributes,
    /// Generalizations in which the container is the specific class
    Generalizations,
    /// Ordered content components (containers, choices, attribute containers)
    Components,
    /// Associations to child classes
    Associations,
    /// Member classes of a class union
    UnionMembers,
}

impl Scope {
    /// All scopes in canonical order.
    pub const ALL: [Scope; 5] = [
        Scope::Attributes,
        Scope::Generalizations,
        Scope::Components,
        Scope::Associations,
        Scope::UnionMembers,
    ];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Attributes => "attributes",
            Scope::Generalizations => "generalizations",
            Scope::Components => "components",
            Scope::Associations => "associations",
            Scope::UnionMembers => "union_members",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The domain kind of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Class,
    Attribute,
    Association,
    Generalization,
    AttributeContainer,
    ContentContainer,
    ContentChoice,
    ClassUnion,
}

impl ElementKind {
    /// Relationship scopes a container of this kind exposes.
    pub fn scopes(self) -> &'static [Scope] {
        match self {
            ElementKind::Class => &[
                Scope::Attributes,
                Scope::Generalizations,
                Scope::Components,
                Scope::Associations,
            ],
            ElementKind::AttributeContainer => &[Scope::Attributes],
            ElementKind::ContentContainer | ElementKind::ContentChoice => &[Scope::Components],
            ElementKind::ClassUnion => &[Scope::UnionMembers],
            ElementKind::Attribute | ElementKind::Association | ElementKind::Generalization => &[],
        }
    }

    /// Whether a container of this kind exposes `scope`.
    pub fn supports(self, scope: Scope) -> bool {
        self.scopes().contains(&scope)
    }

    /// Whether derived attribute declarations are generated from this kind.
    pub fn is_class_like(self) -> bool {
        matches!(self, ElementKind::Class)
    }

    /// Whether this kind contributes directly to a generated content model.
    pub fn is_content_model(self) -> bool {
        matches!(
            self,
            ElementKind::AttributeContainer
                | ElementKind::ContentContainer
                | ElementKind::ContentChoice
                | ElementKind::ClassUnion
        )
    }

    /// Whether elements of this kind can be placed in `scope` collections.
    pub fn fits(self, scope: Scope) -> bool {
        match scope {
            Scope::Attributes => self == ElementKind::Attribute,
            Scope::Generalizations => self == ElementKind::Generalization,
            Scope::Associations => self == ElementKind::Association,
            Scope::UnionMembers => self == ElementKind::Class,
            Scope::Components => matches!(
                self,
                ElementKind::AttributeContainer
                    | ElementKind::ContentContainer
                    | ElementKind::ContentChoice
                    | ElementKind::ClassUnion
            ),
        }
    }

    /// Human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Attribute => "attribute",
            ElementKind::Association => "association",
            ElementKind::Generalization => "generalization",
            ElementKind::AttributeContainer => "attribute container",
            ElementKind::ContentContainer => "content container",
            ElementKind::ContentChoice => "content choice",
            ElementKind::ClassUnion => "class union",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occurrence bounds. `upper == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplicity {
    pub lower: u32,
    pub upper: Option<u32>,
}

impl Multiplicity {
    /// Exactly one occurrence.
    pub const ONE: Multiplicity = Multiplicity {
        lower: 1,
        upper: Some(1),
    };

    /// Zero or one occurrence.
    pub const OPTIONAL: Multiplicity = Multiplicity {
        lower: 0,
        upper: Some(1),
    };

    /// Zero or more occurrences.
    pub const MANY: Multiplicity = Multiplicity {
        lower: 0,
        upper: None,
    };

    pub fn new(lower: u32, upper: Option<u32>) -> Self {
        Self { lower, upper }
    }
}

impl Default for Multiplicity {
    fn default() -> Self {
        Self::ONE
    }
}

impl std::fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upper {
            Some(upper) if upper == self.lower => write!(f, "{}", self.lower),
            Some(upper) => write!(f, "{}..{}", self.lower, upper),
            None => write!(f, "{}..*", self.lower),
        }
    }
}

/// Domain content of an element that the evolution engine compares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementProperties {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<Multiplicity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// General class of a generalization, child class of an association
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
}

impl ElementProperties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Minimum number of occurrences. Elements without a multiplicity occur
    /// exactly once.
    pub fn lower_bound(&self) -> u32 {
        self.multiplicity.map(|m| m.lower).unwrap_or(1)
    }
}

/// Read-only view of a versioned design graph.
///
/// Resolution misses are `None`, never errors. `collection` returns `None`
/// when the element does not exist or its kind does not expose `scope`.
pub trait ModelView {
    /// The branch tracker owning every element of this graph.
    fn tracker(&self) -> &BranchTracker;

    /// The version tree.
    fn versions(&self) -> &VersionRegistry;

    /// Kind of an element instance.
    fn kind(&self, id: ElementId) -> Option<ElementKind>;

    /// Content of an element instance.
    fn properties(&self, id: ElementId) -> Option<&ElementProperties>;

    /// Ordered sub-elements of `id` in `scope`.
    fn collection(&self, id: ElementId, scope: Scope) -> Option<&[ElementId]>;

    /// The member of `id`'s branch valid at `version`.
    fn get_in_version(&self, id: ElementId, version: VersionId) -> Option<ElementId> {
        self.tracker().get_in_version(id, version)
    }

    /// Display name of an element, `?` when unknown.
    fn name_of(&self, id: ElementId) -> &str {
        self.properties(id).map(|p| p.name.as_str()).unwrap_or("?")
    }
}

/// Borrowed handle onto one element instance of a [`ModelView`].
#[derive(Clone, Copy)]
pub struct ElementRef<'m> {
    model: &'m dyn ModelView,
    id: ElementId,
}

impl<'m> ElementRef<'m> {
    pub fn new(model: &'m dyn ModelView, id: ElementId) -> Self {
        Self { model, id }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> Option<ElementKind> {
        self.model.kind(self.id)
    }

    pub fn properties(&self) -> Option<&'m ElementProperties> {
        self.model.properties(self.id)
    }

    pub fn name(&self) -> &'m str {
        self.model.name_of(self.id)
    }

    pub fn collection(&self, scope: Scope) -> Option<&'m [ElementId]> {
        self.model.collection(self.id, scope)
    }

    /// This element's counterpart at `version`, as a handle.
    pub fn in_version(&self, version: VersionId) -> Option<ElementRef<'m>> {
        self.get_in_version(version)
            .map(|id| ElementRef::new(self.model, id))
    }
}

impl VersionedElement for ElementRef<'_> {
    fn element_id(&self) -> ElementId {
        self.id
    }

    fn tracker(&self) -> &BranchTracker {
        self.model.tracker()
    }
}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_supports_structural_scopes() {
        assert!(ElementKind::Class.supports(Scope::Attributes));
        assert!(ElementKind::Class.supports(Scope::Associations));
        assert!(!ElementKind::Class.supports(Scope::UnionMembers));
        assert!(ElementKind::ClassUnion.supports(Scope::UnionMembers));
        assert!(ElementKind::Attribute.scopes().is_empty());
    }

    #[test]
    fn only_classes_are_class_like() {
        assert!(ElementKind::Class.is_class_like());
        assert!(!ElementKind::AttributeContainer.is_class_like());
        assert!(ElementKind::AttributeContainer.is_content_model());
        assert!(!ElementKind::Class.is_content_model());
    }

    #[test]
    fn fits_matches_scope_element_kinds() {
        assert!(ElementKind::Attribute.fits(Scope::Attributes));
        assert!(!ElementKind::Class.fits(Scope::Attributes));
        assert!(ElementKind::ContentChoice.fits(Scope::Components));
        assert!(ElementKind::Class.fits(Scope::UnionMembers));
    }

    #[test]
    fn multiplicity_display() {
        assert_eq!(Multiplicity::ONE.to_string(), "1");
        assert_eq!(Multiplicity::OPTIONAL.to_string(), "0..1");
        assert_eq!(Multiplicity::MANY.to_string(), "0..*");
        assert_eq!(Multiplicity::new(2, Some(5)).to_string(), "2..5");
    }

    #[test]
    fn lower_bound_defaults_to_one() {
        let mut props = ElementProperties::named("x");
        assert_eq!(props.lower_bound(), 1);
        props.multiplicity = Some(Multiplicity::MANY);
        assert_eq!(props.lower_bound(), 0);
    }

    #[test]
    fn scope_serializes_snake_case() {
        let json = serde_json::to_string(&Scope::UnionMembers).unwrap();
        assert_eq!(json, "\"union_members\"");
    }
}
