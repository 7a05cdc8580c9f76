//! evolution::report
//!
//! [`ChangeSet`]: the result of a detection pass, with aggregate impact.

use serde::{Deserialize, Serialize};

use crate::model::{ModelView, Scope};

use super::change::{EditKind, EvolutionChange};
use super::verify::VerifyError;

/// An ordered collection of detected changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<EvolutionChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: EvolutionChange) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvolutionChange> {
        self.changes.iter()
    }

    pub fn as_slice(&self) -> &[EvolutionChange] {
        &self.changes
    }

    pub fn into_vec(self) -> Vec<EvolutionChange> {
        self.changes
    }

    /// Changes in `scope`, in set order.
    pub fn by_scope(&self, scope: Scope) -> impl Iterator<Item = &EvolutionChange> + '_ {
        self.changes.iter().filter(move |c| c.scope() == scope)
    }

    /// Changes of `edit_kind`, in set order.
    pub fn by_edit_kind(&self, edit_kind: EditKind) -> impl Iterator<Item = &EvolutionChange> + '_ {
        self.changes.iter().filter(move |c| c.edit_kind() == edit_kind)
    }

    /// Sort by scope, edit kind, sub-element name, then sub-element id.
    ///
    /// Stable, so changes on the same sub-element keep their property order.
    pub fn sort(&mut self, model: &dyn ModelView) {
        self.changes.sort_by(|a, b| {
            (a.scope(), a.edit_kind())
                .cmp(&(b.scope(), b.edit_kind()))
                .then_with(|| model.name_of(a.subelement()).cmp(&model.name_of(b.subelement())))
                .then_with(|| a.subelement().cmp(&b.subelement()))
        });
    }

    /// Whether any change invalidates attribute-completeness artifacts.
    pub fn invalidates_attributes(&self, model: &dyn ModelView) -> bool {
        self.changes.iter().any(|c| c.invalidates_attributes(model))
    }

    /// Whether any change invalidates content-model artifacts.
    pub fn invalidates_content(&self, model: &dyn ModelView) -> bool {
        self.changes.iter().any(|c| c.invalidates_content(model))
    }

    /// Verify every change, stopping at the first failure.
    pub fn verify_all(&self, model: &dyn ModelView) -> Result<(), VerifyError> {
        self.changes.iter().try_for_each(|c| c.verify(model))
    }

    /// One description line per change.
    pub fn describe(&self, model: &dyn ModelView) -> Vec<String> {
        self.changes.iter().map(|c| c.describe(model)).collect()
    }
}

impl Extend<EvolutionChange> for ChangeSet {
    fn extend<T: IntoIterator<Item = EvolutionChange>>(&mut self, iter: T) {
        self.changes.extend(iter);
    }
}

impl FromIterator<EvolutionChange> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = EvolutionChange>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = EvolutionChange;
    type IntoIter = std::vec::IntoIter<EvolutionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a EvolutionChange;
    type IntoIter = std::slice::Iter<'a, EvolutionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
