//! model::design
//!
//! Arena-backed design model and its mutation layer.
//!
//! # Architecture
//!
//! Elements live in a flat arena addressed by [`ElementId`]. Each record
//! holds the element's kind, content, and ordered per-scope collections of
//! sub-element ids. Version and branch identity are kept in the
//! [`BranchTracker`], never in back-pointers from elements.
//!
//! A version of the model is the set of elements reachable from that
//! version's top-level classes. Deriving a version copies every reachable
//! element (copy-on-branch) and registers each copy as a new member of the
//! original's branch.
//!
//! # Invariants
//!
//! - Sub-elements always live in the same version as their container
//! - Every live element is tracked; removed and pulled-out elements
//!   (with everything they contain) are not
//! - A live element's target is live
//! - Arena slots are never reused
//!
//! # Example
//!
//! ```
//! use evograph::model::{DesignModel, ModelView, Multiplicity};
//!
//! let mut model = DesignModel::new("initial");
//! let v1 = model.root_version();
//! let person = model.add_class(v1, "Person").unwrap();
//!
//! let v2 = model.branch(v1, "add age").unwrap();
//! let person2 = model.get_in_version(person, v2).unwrap();
//! model.add_attribute(person2, "age", Some("int"), Multiplicity::ONE).unwrap();
//!
//! assert_eq!(model.get_in_version(person2, v1), Some(person));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use thiserror::Error;

use super::{ElementKind, ElementProperties, ModelView, Multiplicity, Scope};
use crate::core::tracker::{BranchToken, BranchTracker, TrackerError};
use crate::core::types::{ElementId, VersionId};
use crate::core::version::{VersionError, VersionRegistry};

/// Errors from model mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("{kind} {element} has no {scope} collection")]
    ScopeNotSupported {
        element: ElementId,
        kind: ElementKind,
        scope: Scope,
    },

    #[error("a {kind} cannot be placed in a {scope} collection")]
    KindNotAllowed { kind: ElementKind, scope: Scope },

    #[error("element {element} is a {found}, expected a {expected}")]
    UnexpectedKind {
        element: ElementId,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("element {element} lives in {found}, expected {expected}")]
    CrossVersion {
        element: ElementId,
        expected: VersionId,
        found: VersionId,
    },

    #[error("element {element} is not in the {scope} collection of {container}")]
    NotInCollection {
        container: ElementId,
        scope: Scope,
        element: ElementId,
    },

    #[error("element {element} is still the target of {referrer}")]
    StillReferenced { element: ElementId, referrer: ElementId },

    #[error("index {index} out of range for a collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// One arena slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementRecord {
    pub(crate) kind: ElementKind,
    /// The version this instance was created in
    pub(crate) version: VersionId,
    pub(crate) properties: ElementProperties,
    pub(crate) collections: BTreeMap<Scope, Vec<ElementId>>,
}

impl ElementRecord {
    pub(crate) fn new(kind: ElementKind, version: VersionId, properties: ElementProperties) -> Self {
        let collections = kind.scopes().iter().map(|s| (*s, Vec::new())).collect();
        Self {
            kind,
            version,
            properties,
            collections,
        }
    }
}

/// An element removed from the live model together with the bookkeeping
/// needed to put it back exactly where it was.
#[derive(Debug)]
pub struct PulledOut {
    container: ElementId,
    scope: Scope,
    index: usize,
    element: ElementId,
    /// One token per unregistered element, `element` first
    tokens: Vec<BranchToken>,
}

impl PulledOut {
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn container(&self) -> ElementId {
        self.container
    }
}

/// In-memory design model with version history.
#[derive(Debug, Clone)]
pub struct DesignModel {
    pub(crate) versions: VersionRegistry,
    pub(crate) tracker: BranchTracker,
    pub(crate) elements: Vec<ElementRecord>,
    /// Top-level classes per version
    pub(crate) roots: BTreeMap<VersionId, Vec<ElementId>>,
}

impl DesignModel {
    /// Create an empty model with a root version labelled `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let (versions, root) = VersionRegistry::with_root(label);
        let mut roots = BTreeMap::new();
        roots.insert(root, Vec::new());
        Self {
            versions,
            tracker: BranchTracker::new(),
            elements: Vec::new(),
            roots,
        }
    }

    /// The root of the version tree.
    pub fn root_version(&self) -> VersionId {
        self.versions.root().unwrap_or(VersionId::new(1))
    }

    /// Create an empty version derived from `parent` without copying any
    /// element.
    pub fn create_version(
        &mut self,
        label: impl Into<String>,
        parent: VersionId,
    ) -> Result<VersionId, ModelError> {
        let id = self.versions.create(label, Some(parent))?;
        self.roots.insert(id, Vec::new());
        Ok(id)
    }

    /// Derive a new version from `from`, copying every element of `from`.
    ///
    /// Each copy is registered as a member of its original's branch. Returns
    /// the new version.
    pub fn branch(&mut self, from: VersionId, label: impl Into<String>) -> Result<VersionId, ModelError> {
        if !self.versions.contains(from) {
            return Err(VersionError::UnknownVersion(from).into());
        }
        let originals = self.reachable(from);
        let to = self.create_version(label, from)?;

        let base = self.elements.len() as u32;
        let copies: HashMap<ElementId, ElementId> = originals
            .iter()
            .enumerate()
            .map(|(i, old)| (*old, ElementId::new(base + i as u32)))
            .collect();
        let remap = |id: &ElementId| copies.get(id).copied().unwrap_or(*id);

        for old in &originals {
            let mut copy = self.elements[old.slot()].clone();
            copy.version = to;
            copy.properties.target = copy.properties.target.as_ref().map(remap);
            for members in copy.collections.values_mut() {
                *members = members.iter().map(remap).collect();
            }
            self.elements.push(copy);
        }

        for old in &originals {
            let first = !self.tracker.is_tracked(*old);
            self.tracker
                .register_branch(*old, copies[old], to, first, from)?;
        }

        let top_level: Vec<ElementId> = self
            .roots
            .get(&from)
            .map(|r| r.iter().map(remap).collect())
            .unwrap_or_default();
        self.roots.insert(to, top_level);

        tracing::debug!(%from, %to, copied = originals.len(), "branched model version");
        Ok(to)
    }

    /// Add a top-level class to `version`.
    pub fn add_class(&mut self, version: VersionId, name: impl Into<String>) -> Result<ElementId, ModelError> {
        if !self.versions.contains(version) {
            return Err(VersionError::UnknownVersion(version).into());
        }
        let id = self.alloc(ElementKind::Class, version, ElementProperties::named(name))?;
        self.roots.entry(version).or_default().push(id);
        Ok(id)
    }

    /// Add an attribute to a class or attribute container.
    pub fn add_attribute(
        &mut self,
        container: ElementId,
        name: impl Into<String>,
        data_type: Option<&str>,
        multiplicity: Multiplicity,
    ) -> Result<ElementId, ModelError> {
        let properties = ElementProperties {
            name: name.into(),
            data_type: data_type.map(str::to_string),
            multiplicity: Some(multiplicity),
            ..ElementProperties::default()
        };
        self.attach(container, Scope::Attributes, ElementKind::Attribute, properties)
    }

    /// Add an association from class `parent` to class `child`.
    pub fn add_association(
        &mut self,
        parent: ElementId,
        child: ElementId,
        name: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Result<ElementId, ModelError> {
        self.expect_class_in(child, self.record(parent)?.version)?;
        let properties = ElementProperties {
            name: name.into(),
            multiplicity: Some(multiplicity),
            target: Some(child),
            ..ElementProperties::default()
        };
        self.attach(parent, Scope::Associations, ElementKind::Association, properties)
    }

    /// Make `specific` a specialization of `general`.
    pub fn add_generalization(
        &mut self,
        specific: ElementId,
        general: ElementId,
    ) -> Result<ElementId, ModelError> {
        let general_name = self.record(general)?.properties.name.clone();
        self.expect_class_in(general, self.record(specific)?.version)?;
        let properties = ElementProperties {
            name: general_name,
            target: Some(general),
            ..ElementProperties::default()
        };
        self.attach(specific, Scope::Generalizations, ElementKind::Generalization, properties)
    }

    /// Append a content component (container, choice, attribute container or
    /// class union) to `container`.
    pub fn add_component(
        &mut self,
        container: ElementId,
        kind: ElementKind,
        name: impl Into<String>,
    ) -> Result<ElementId, ModelError> {
        self.attach(container, Scope::Components, kind, ElementProperties::named(name))
    }

    /// Add a class owned by class union `union` as one of its alternatives.
    pub fn add_union_member(
        &mut self,
        union: ElementId,
        name: impl Into<String>,
    ) -> Result<ElementId, ModelError> {
        self.attach(union, Scope::UnionMembers, ElementKind::Class, ElementProperties::named(name))
    }

    /// Remove `element` from a collection of `container`. Returns the index
    /// it occupied.
    ///
    /// The element and everything it contains leave the live model: their
    /// branch membership is dropped, so later versions report them as
    /// removed. The arena slots stay, so history at earlier versions is
    /// unaffected. Use [`Self::pull_out`] when the removal may be undone.
    ///
    /// # Errors
    ///
    /// - [`ModelError::NotInCollection`] if `element` is not a member
    /// - [`ModelError::StillReferenced`] if a live element outside the
    ///   removed subtree targets it
    pub fn remove(
        &mut self,
        container: ElementId,
        scope: Scope,
        element: ElementId,
    ) -> Result<usize, ModelError> {
        let (index, tokens) = self.detach(container, scope, element)?;
        tracing::debug!(%container, %scope, %element, dropped = tokens.len(), "removed element");
        Ok(index)
    }

    /// Pull `element` out of the live model: remove it from the collection
    /// and unregister its branch membership (and that of everything it
    /// contains). [`Self::put_back`] reverses it.
    pub fn pull_out(
        &mut self,
        container: ElementId,
        scope: Scope,
        element: ElementId,
    ) -> Result<PulledOut, ModelError> {
        let (index, tokens) = self.detach(container, scope, element)?;
        Ok(PulledOut {
            container,
            scope,
            index,
            element,
            tokens,
        })
    }

    /// Undo a [`Self::pull_out`].
    pub fn put_back(&mut self, pulled: PulledOut) -> Result<(), ModelError> {
        let PulledOut {
            container,
            scope,
            index,
            element,
            tokens,
        } = pulled;
        let len = self.collection(container, scope).map(<[_]>::len).ok_or_else(|| {
            self.scope_error(container, scope)
        })?;
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }

        let mut restored = Vec::with_capacity(tokens.len());
        for token in tokens {
            let id = token.element();
            if let Err(err) = self.tracker.re_register_branch(id, token) {
                for id in restored {
                    self.tracker.unregister_branch(id)?;
                }
                return Err(err.into());
            }
            restored.push(id);
        }
        self.collection_mut(container, scope)?.insert(index, element);
        Ok(())
    }

    /// Move a component of `container` to `index`.
    pub fn move_component(
        &mut self,
        container: ElementId,
        component: ElementId,
        index: usize,
    ) -> Result<(), ModelError> {
        let len = self
            .collection(container, Scope::Components)
            .map(<[_]>::len)
            .ok_or_else(|| self.scope_error(container, Scope::Components))?;
        if index >= len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        self.take(container, Scope::Components, component)?;
        self.collection_mut(container, Scope::Components)?.insert(index, component);
        Ok(())
    }

    pub fn rename(&mut self, element: ElementId, name: impl Into<String>) -> Result<(), ModelError> {
        self.record_mut(element)?.properties.name = name.into();
        Ok(())
    }

    pub fn set_data_type(&mut self, element: ElementId, data_type: Option<&str>) -> Result<(), ModelError> {
        self.record_mut(element)?.properties.data_type = data_type.map(str::to_string);
        Ok(())
    }

    pub fn set_multiplicity(&mut self, element: ElementId, multiplicity: Multiplicity) -> Result<(), ModelError> {
        self.record_mut(element)?.properties.multiplicity = Some(multiplicity);
        Ok(())
    }

    pub fn set_default(&mut self, element: ElementId, default: Option<&str>) -> Result<(), ModelError> {
        self.record_mut(element)?.properties.default = default.map(str::to_string);
        Ok(())
    }

    /// Top-level classes of `version`.
    pub fn roots(&self, version: VersionId) -> &[ElementId] {
        self.roots.get(&version).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live elements of `version`, in arena order.
    pub fn elements_in(&self, version: VersionId) -> Vec<ElementId> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, _)| ElementId::new(i as u32))
            .filter(|id| self.tracker.version_of(*id) == Some(version))
            .collect()
    }

    /// First live element of `kind` named `name` in `version`.
    pub fn find(&self, version: VersionId, kind: ElementKind, name: &str) -> Option<ElementId> {
        self.elements_in(version).into_iter().find(|id| {
            let record = &self.elements[id.slot()];
            record.kind == kind && record.properties.name == name
        })
    }

    /// The version an element instance was created in, tracked or not.
    pub fn home_version(&self, element: ElementId) -> Option<VersionId> {
        self.elements.get(element.slot()).map(|r| r.version)
    }

    /// Number of arena slots.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn alloc(
        &mut self,
        kind: ElementKind,
        version: VersionId,
        properties: ElementProperties,
    ) -> Result<ElementId, ModelError> {
        let id = ElementId::new(self.elements.len() as u32);
        self.tracker.set_as_first_version(id, version)?;
        self.elements.push(ElementRecord::new(kind, version, properties));
        Ok(id)
    }

    fn attach(
        &mut self,
        container: ElementId,
        scope: Scope,
        kind: ElementKind,
        properties: ElementProperties,
    ) -> Result<ElementId, ModelError> {
        if !kind.fits(scope) {
            return Err(ModelError::KindNotAllowed { kind, scope });
        }
        let version = self.container_version(container, scope)?;
        let id = self.alloc(kind, version, properties)?;
        self.collection_mut(container, scope)?.push(id);
        Ok(id)
    }

    /// Take `element` out of the collection only. Returns its index.
    fn take(&mut self, container: ElementId, scope: Scope, element: ElementId) -> Result<usize, ModelError> {
        let members = self.collection_mut(container, scope)?;
        let index = members
            .iter()
            .position(|e| *e == element)
            .ok_or(ModelError::NotInCollection {
                container,
                scope,
                element,
            })?;
        members.remove(index);
        Ok(index)
    }

    /// Take `element` out of the collection and unregister its subtree.
    /// Nothing changes on error.
    fn detach(
        &mut self,
        container: ElementId,
        scope: Scope,
        element: ElementId,
    ) -> Result<(usize, Vec<BranchToken>), ModelError> {
        let position = self
            .collection(container, scope)
            .ok_or_else(|| self.scope_error(container, scope))?
            .iter()
            .position(|e| *e == element);
        if position.is_none() {
            return Err(ModelError::NotInCollection {
                container,
                scope,
                element,
            });
        }

        let subtree = self.subtree(element);
        self.ensure_unreferenced(&subtree)?;

        let mut tokens = Vec::with_capacity(subtree.len());
        for id in &subtree {
            match self.tracker.unregister_branch(*id) {
                Ok(token) => tokens.push(token),
                Err(err) => {
                    for token in tokens.into_iter().rev() {
                        self.tracker.re_register_branch(token.element(), token)?;
                    }
                    return Err(err.into());
                }
            }
        }
        let index = self.take(container, scope, element)?;
        Ok((index, tokens))
    }

    /// `element` followed by everything reachable through its collections.
    fn subtree(&self, element: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![element];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(record) = self.elements.get(id.slot()) {
                for members in record.collections.values() {
                    stack.extend(members.iter().rev().copied());
                }
            }
        }
        order
    }

    /// Fail if a live element outside `subtree` targets an element in it.
    fn ensure_unreferenced(&self, subtree: &[ElementId]) -> Result<(), ModelError> {
        let inside: HashSet<ElementId> = subtree.iter().copied().collect();
        for (i, record) in self.elements.iter().enumerate() {
            let id = ElementId::new(i as u32);
            if inside.contains(&id) || !self.tracker.is_tracked(id) {
                continue;
            }
            if let Some(target) = record.properties.target.filter(|t| inside.contains(t)) {
                return Err(ModelError::StillReferenced {
                    element: target,
                    referrer: id,
                });
            }
        }
        Ok(())
    }

    fn container_version(&self, container: ElementId, scope: Scope) -> Result<VersionId, ModelError> {
        let record = self.record(container)?;
        if !record.kind.supports(scope) {
            return Err(self.scope_error(container, scope));
        }
        Ok(record.version)
    }

    fn expect_class_in(&self, element: ElementId, version: VersionId) -> Result<(), ModelError> {
        let record = self.record(element)?;
        if record.kind != ElementKind::Class {
            return Err(ModelError::UnexpectedKind {
                element,
                expected: ElementKind::Class,
                found: record.kind,
            });
        }
        if record.version != version {
            return Err(ModelError::CrossVersion {
                element,
                expected: version,
                found: record.version,
            });
        }
        Ok(())
    }

    fn scope_error(&self, element: ElementId, scope: Scope) -> ModelError {
        match self.elements.get(element.slot()) {
            Some(record) => ModelError::ScopeNotSupported {
                element,
                kind: record.kind,
                scope,
            },
            None => ModelError::UnknownElement(element),
        }
    }

    fn record(&self, element: ElementId) -> Result<&ElementRecord, ModelError> {
        self.elements
            .get(element.slot())
            .ok_or(ModelError::UnknownElement(element))
    }

    fn record_mut(&mut self, element: ElementId) -> Result<&mut ElementRecord, ModelError> {
        self.elements
            .get_mut(element.slot())
            .ok_or(ModelError::UnknownElement(element))
    }

    fn collection_mut(&mut self, element: ElementId, scope: Scope) -> Result<&mut Vec<ElementId>, ModelError> {
        let kind = self.record(element)?.kind;
        self.record_mut(element)?
            .collections
            .get_mut(&scope)
            .ok_or(ModelError::ScopeNotSupported { element, kind, scope })
    }

    /// Elements reachable from the top-level classes of `version` through
    /// collections and targets, in breadth-first discovery order.
    fn reachable(&self, version: VersionId) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<ElementId> = self.roots(version).iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            let Some(record) = self.elements.get(id.slot()) else {
                continue;
            };
            if record.version != version || !seen.insert(id) {
                continue;
            }
            order.push(id);
            for members in record.collections.values() {
                queue.extend(members.iter().copied());
            }
            queue.extend(record.properties.target);
        }
        order
    }
}

impl ModelView for DesignModel {
    fn tracker(&self) -> &BranchTracker {
        &self.tracker
    }

    fn versions(&self) -> &VersionRegistry {
        &self.versions
    }

    fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.elements.get(id.slot()).map(|r| r.kind)
    }

    fn properties(&self, id: ElementId) -> Option<&ElementProperties> {
        self.elements.get(id.slot()).map(|r| &r.properties)
    }

    fn collection(&self, id: ElementId, scope: Scope) -> Option<&[ElementId]> {
        self.elements
            .get(id.slot())?
            .collections
            .get(&scope)
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::element::VersionedElement;
    use crate::model::ElementRef;

    fn person_model() -> (DesignModel, VersionId, ElementId, ElementId) {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let person = model.add_class(v1, "Person").unwrap();
        let name = model
            .add_attribute(person, "name", Some("string"), Multiplicity::ONE)
            .unwrap();
        (model, v1, person, name)
    }

    #[test]
    fn new_elements_are_branch_roots() {
        let (model, v1, person, name) = person_model();
        assert!(model.tracker().is_branch_root(person));
        assert!(model.tracker().is_branch_root(name));
        assert_eq!(model.tracker().version_of(name), Some(v1));
        assert_eq!(model.roots(v1), &[person]);
    }

    #[test]
    fn branch_copies_and_links_every_element() {
        let (mut model, v1, person, name) = person_model();
        let v2 = model.branch(v1, "v2").unwrap();

        let person2 = model.get_in_version(person, v2).unwrap();
        let name2 = model.get_in_version(name, v2).unwrap();
        assert_ne!(person, person2);
        assert_eq!(model.collection(person2, Scope::Attributes), Some(&[name2][..]));
        assert_eq!(model.tracker().first_version_of(name2), Some(name));
        assert_eq!(model.roots(v2), &[person2]);
        assert_eq!(model.elements_in(v2), vec![person2, name2]);
    }

    #[test]
    fn branch_remaps_targets_within_the_new_version() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let base = model.add_class(v1, "Base").unwrap();
        let derived = model.add_class(v1, "Derived").unwrap();
        let gen = model.add_generalization(derived, base).unwrap();

        let v2 = model.branch(v1, "v2").unwrap();
        let gen2 = model.get_in_version(gen, v2).unwrap();
        let base2 = model.get_in_version(base, v2).unwrap();
        assert_eq!(model.properties(gen2).unwrap().target, Some(base2));
    }

    #[test]
    fn edits_in_new_version_leave_old_version_untouched() {
        let (mut model, v1, person, name) = person_model();
        let v2 = model.branch(v1, "v2").unwrap();
        let person2 = model.get_in_version(person, v2).unwrap();
        model
            .add_attribute(person2, "age", Some("int"), Multiplicity::ONE)
            .unwrap();

        assert_eq!(model.collection(person, Scope::Attributes), Some(&[name][..]));
        assert_eq!(model.collection(person2, Scope::Attributes).unwrap().len(), 2);
    }

    #[test]
    fn scope_mismatch_is_none_for_views_and_error_for_mutation() {
        let (mut model, _, _, name) = person_model();
        assert_eq!(model.collection(name, Scope::Attributes), None);
        assert_eq!(
            model.add_attribute(name, "x", None, Multiplicity::ONE),
            Err(ModelError::ScopeNotSupported {
                element: name,
                kind: ElementKind::Attribute,
                scope: Scope::Attributes
            })
        );
    }

    #[test]
    fn association_child_must_share_version() {
        let (mut model, v1, person, _) = person_model();
        let v2 = model.branch(v1, "v2").unwrap();
        let address = model.add_class(v2, "Address").unwrap();
        assert_eq!(
            model.add_association(person, address, "home", Multiplicity::ONE),
            Err(ModelError::CrossVersion {
                element: address,
                expected: v1,
                found: v2
            })
        );
    }

    #[test]
    fn wrong_component_kind_rejected() {
        let (mut model, _, person, _) = person_model();
        assert_eq!(
            model.add_component(person, ElementKind::Attribute, "x"),
            Err(ModelError::KindNotAllowed {
                kind: ElementKind::Attribute,
                scope: Scope::Components
            })
        );
    }

    #[test]
    fn pull_out_and_put_back_restore_position_and_identity() {
        let (mut model, v1, person, name) = person_model();
        let email = model
            .add_attribute(person, "email", None, Multiplicity::OPTIONAL)
            .unwrap();

        let pulled = model.pull_out(person, Scope::Attributes, name).unwrap();
        assert_eq!(model.collection(person, Scope::Attributes), Some(&[email][..]));
        assert_eq!(model.get_in_version(name, v1), None);

        model.put_back(pulled).unwrap();
        assert_eq!(
            model.collection(person, Scope::Attributes),
            Some(&[name, email][..])
        );
        assert_eq!(model.get_in_version(name, v1), Some(name));
    }

    #[test]
    fn pulled_out_elements_are_not_copied_on_branch() {
        let (mut model, v1, person, name) = person_model();
        let _pulled = model.pull_out(person, Scope::Attributes, name).unwrap();
        let v2 = model.branch(v1, "v2").unwrap();
        assert_eq!(model.elements_in(v2).len(), 1);
    }

    #[test]
    fn remove_missing_element_is_error() {
        let (mut model, _, person, _) = person_model();
        let other = ElementId::new(40);
        assert_eq!(
            model.remove(person, Scope::Attributes, other),
            Err(ModelError::NotInCollection {
                container: person,
                scope: Scope::Attributes,
                element: other
            })
        );
    }

    #[test]
    fn remove_drops_membership_but_keeps_history() {
        let (mut model, v1, person, name) = person_model();
        let v2 = model.branch(v1, "v2").unwrap();
        let person2 = model.get_in_version(person, v2).unwrap();
        let name2 = model.get_in_version(name, v2).unwrap();

        assert_eq!(model.remove(person2, Scope::Attributes, name2), Ok(0));
        assert_eq!(model.collection(person2, Scope::Attributes), Some(&[][..]));
        assert_eq!(model.get_in_version(name, v2), None);
        assert_eq!(model.get_in_version(name2, v1), None);
        assert_eq!(model.get_in_version(name, v1), Some(name));
        assert_eq!(model.find(v2, ElementKind::Attribute, "name"), None);
        assert_eq!(model.home_version(name2), Some(v2));
    }

    #[test]
    fn remove_takes_contained_elements_along() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        let payment = model.add_component(order, ElementKind::ClassUnion, "Payment").unwrap();
        let card = model.add_union_member(payment, "Card").unwrap();
        let number = model
            .add_attribute(card, "number", Some("string"), Multiplicity::ONE)
            .unwrap();

        model.remove(order, Scope::Components, payment).unwrap();
        for id in [payment, card, number] {
            assert!(!model.tracker().is_tracked(id));
        }
        assert_eq!(model.elements_in(v1), vec![order]);

        let v2 = model.branch(v1, "v2").unwrap();
        assert_eq!(model.elements_in(v2).len(), 1);
    }

    #[test]
    fn referenced_class_cannot_be_removed() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        let payment = model.add_component(order, ElementKind::ClassUnion, "Payment").unwrap();
        let card = model.add_union_member(payment, "Card").unwrap();
        let gift = model.add_class(v1, "GiftCard").unwrap();
        let link = model.add_generalization(gift, card).unwrap();

        assert_eq!(
            model.remove(payment, Scope::UnionMembers, card),
            Err(ModelError::StillReferenced {
                element: card,
                referrer: link
            })
        );
        assert_eq!(model.collection(payment, Scope::UnionMembers), Some(&[card][..]));
        assert!(model.tracker().is_tracked(card));

        // Once the referrer is gone the class can go too
        model.remove(gift, Scope::Generalizations, link).unwrap();
        assert!(model.pull_out(payment, Scope::UnionMembers, card).is_ok());
    }

    #[test]
    fn put_back_restores_contained_elements() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        let payment = model.add_component(order, ElementKind::ClassUnion, "Payment").unwrap();
        let card = model.add_union_member(payment, "Card").unwrap();
        let cash = model.add_union_member(payment, "Cash").unwrap();
        let number = model
            .add_attribute(card, "number", Some("string"), Multiplicity::ONE)
            .unwrap();

        let pulled = model.pull_out(payment, Scope::UnionMembers, card).unwrap();
        assert_eq!(model.get_in_version(number, v1), None);

        model.put_back(pulled).unwrap();
        assert_eq!(
            model.collection(payment, Scope::UnionMembers),
            Some(&[card, cash][..])
        );
        assert_eq!(model.get_in_version(card, v1), Some(card));
        assert_eq!(model.get_in_version(number, v1), Some(number));
    }

    #[test]
    fn move_component_requires_components_scope() {
        let mut model = DesignModel::new("v1");
        let v1 = model.root_version();
        let order = model.add_class(v1, "Order").unwrap();
        let audit = model
            .add_component(order, ElementKind::AttributeContainer, "audit")
            .unwrap();
        let stamp = model
            .add_attribute(audit, "stamp", None, Multiplicity::ONE)
            .unwrap();

        assert_eq!(
            model.move_component(audit, stamp, 0),
            Err(ModelError::ScopeNotSupported {
                element: audit,
                kind: ElementKind::AttributeContainer,
                scope: Scope::Components
            })
        );
    }

    #[test]
    fn move_component_reorders() {
        let (mut model, _, person, _) = person_model();
        let a = model.add_component(person, ElementKind::ContentContainer, "a").unwrap();
        let b = model.add_component(person, ElementKind::ContentChoice, "b").unwrap();
        model.move_component(person, b, 0).unwrap();
        assert_eq!(model.collection(person, Scope::Components), Some(&[b, a][..]));
        assert!(matches!(
            model.move_component(person, b, 2),
            Err(ModelError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn element_ref_forwards_versioned_protocol() {
        let (mut model, v1, person, _) = person_model();
        let v2 = model.branch(v1, "v2").unwrap();
        let person2 = model.get_in_version(person, v2).unwrap();

        let handle = ElementRef::new(&model, person2);
        assert_eq!(handle.version(), Some(v2));
        assert_eq!(handle.first_version(), Some(person));
        assert!(!handle.is_branch_root());
        assert_eq!(handle.in_version(v1).map(|h| h.id()), Some(person));
        assert_eq!(handle.name(), "Person");
    }

    #[test]
    fn find_by_kind_and_name() {
        let (model, v1, person, name) = person_model();
        assert_eq!(model.find(v1, ElementKind::Class, "Person"), Some(person));
        assert_eq!(model.find(v1, ElementKind::Attribute, "name"), Some(name));
        assert_eq!(model.find(v1, ElementKind::Class, "name"), None);
    }
}
