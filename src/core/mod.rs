//! core
//!
//! Version tree, element identity, and shared types for evograph.
//!
//! # Modules
//!
//! - [`types`] - Strong types: VersionId, ElementId, Fingerprint, etc.
//! - [`version`] - The append-only version tree
//! - [`tracker`] - Branch tracking of element instances across versions
//! - [`element`] - The versioned-element protocol
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing keeps version numbers and element ids apart
//! - Identity lives in the tracker, never in element back-pointers
//! - Failed mutations leave every table untouched

pub mod config;
pub mod element;
pub mod tracker;
pub mod types;
pub mod version;
