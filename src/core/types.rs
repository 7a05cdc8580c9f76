//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`VersionId`] - Identity of a version in the version tree
//! - [`ElementId`] - Stable opaque identity of an element instance
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Fingerprint`] - Hash over structural tables for integrity checks
//!
//! # Identity
//!
//! Ids are opaque handles into arenas. An `ElementId` names one *instance*
//! of an element (one member of a branch), not the conceptual element across
//! time. Use the branch tracker to move between instances.
//!
//! # Examples
//!
//! ```
//! use evograph::core::types::{ElementId, VersionId};
//!
//! let v = VersionId::new(1);
//! assert_eq!(v.number(), 1);
//! assert_eq!(v.to_string(), "v1");
//!
//! let e = ElementId::new(7);
//! assert_eq!(e.to_string(), "#7");
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a version.
///
/// The wrapped number is assigned by the version registry and is unique
/// within one registry. Numbers are monotonically increasing in creation
/// order, so a parent always has a smaller number than its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(u32);

impl VersionId {
    /// Wrap a raw version number.
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// The version number.
    pub fn number(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity of a single element instance in a model arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u32);

impl ElementId {
    /// Wrap a raw arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw arena index.
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use evograph::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable hash over structural model tables.
///
/// Snapshots carry a fingerprint so that a hand-edited or truncated file is
/// rejected on load instead of producing a silently corrupted identity table.
///
/// # Example
///
/// ```
/// use evograph::core::types::Fingerprint;
///
/// let lines = vec!["b".to_string(), "a".to_string()];
/// let fp = Fingerprint::compute(&lines);
///
/// // Input order does not matter
/// let reordered = vec!["a".to_string(), "b".to_string()];
/// assert_eq!(fp, Fingerprint::compute(&reordered));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from a set of canonical record lines.
    ///
    /// The lines are sorted before hashing to ensure determinism regardless
    /// of input order.
    pub fn compute(lines: &[String]) -> Self {
        let mut sorted: Vec<&String> = lines.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        for line in sorted {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ids {
        use super::*;

        #[test]
        fn version_ids_order_by_number() {
            assert!(VersionId::new(1) < VersionId::new(2));
            assert_eq!(VersionId::new(3).number(), 3);
        }

        #[test]
        fn ids_serialize_as_bare_numbers() {
            let json = serde_json::to_string(&ElementId::new(12)).unwrap();
            assert_eq!(json, "12");
            let parsed: VersionId = serde_json::from_str("4").unwrap();
            assert_eq!(parsed, VersionId::new(4));
        }

        #[test]
        fn display_is_prefixed() {
            assert_eq!(VersionId::new(2).to_string(), "v2");
            assert_eq!(ElementId::new(0).to_string(), "#0");
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn deterministic() {
            let lines = vec!["x".to_string(), "y".to_string()];
            assert_eq!(Fingerprint::compute(&lines), Fingerprint::compute(&lines));
        }

        #[test]
        fn content_sensitive() {
            let a = Fingerprint::compute(&["x".to_string()]);
            let b = Fingerprint::compute(&["y".to_string()]);
            assert_ne!(a, b);
        }

        #[test]
        fn is_sha256_hex() {
            let fp = Fingerprint::compute(&[]);
            assert_eq!(fp.as_str().len(), 64);
            assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
