//! evograph - version-aware design graphs and structural evolution
//!
//! evograph keeps several versions of a design model (classes, attributes,
//! associations, generalizations, content models) side by side and tracks
//! which element instances in different versions are "the same" element.
//! On top of that identity it detects structural changes between two
//! versions and classifies their downstream impact.
//!
//! # Architecture
//!
//! - [`core`] - Version tree, branch tracker, shared types, configuration
//! - [`model`] - The element graph, its mutation layer and snapshots
//! - [`evolution`] - Change taxonomy, detectors, verification and impact
//!
//! # Correctness Invariants
//!
//! 1. A branch has at most one member per version
//! 2. Detection never mutates the graph
//! 3. Every detected change satisfies its own postconditions
//!
//! # Example
//!
//! ```
//! use evograph::evolution::{DetectOptions, DetectorRegistry, EvolutionChange};
//! use evograph::model::{DesignModel, ModelView, Multiplicity, Scope};
//!
//! let mut model = DesignModel::new("v1");
//! let v1 = model.root_version();
//! let person = model.add_class(v1, "Person").unwrap();
//! let nickname = model
//!     .add_attribute(person, "nickname", None, Multiplicity::OPTIONAL)
//!     .unwrap();
//!
//! let v2 = model.branch(v1, "v2").unwrap();
//! let person2 = model.get_in_version(person, v2).unwrap();
//! let nickname2 = model.get_in_version(nickname, v2).unwrap();
//! model.pull_out(person2, Scope::Attributes, nickname2).unwrap();
//!
//! let changes = DetectorRegistry::standard()
//!     .detect(&model, v1, v2, person2, &DetectOptions::verified())
//!     .unwrap();
//! assert!(matches!(changes.as_slice(), [EvolutionChange::AttributeRemoved(_)]));
//! assert!(changes.invalidates_attributes(&model));
//! ```

pub mod core;
pub mod evolution;
pub mod model;
