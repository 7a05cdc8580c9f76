//! Structural evolution between two versions of a design graph.
//!
//! Given a container element and two versions, the detectors in
//! [`detect`] report what changed in each relationship scope as a closed set
//! of [`EvolutionChange`] values. Each change can re-check itself against the
//! graph ([`verify`]) and report whether it breaks artifacts generated from
//! the older version ([`impact`]).

pub mod change;
pub mod detect;
pub mod impact;
pub mod report;
pub mod verify;

pub use change::{EditKind, EvolutionChange, Property, PropertyChange, SubelementChange};
pub use detect::{
    ChangeOrder, DetectError, DetectOptions, Detector, DetectorRegistry, RegistryError,
};
pub use report::ChangeSet;
pub use verify::VerifyError;
