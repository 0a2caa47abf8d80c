//! Error types for recoverable engine failures.
//!
//! Per the engine's error policy these are logged and skipped at the call
//! site; none of them aborts a tick.

use podium_data::{ObjectCategory, ValueKind};
use thiserror::Error;

/// A generic property access failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("unknown property `{property}` on {category} object")]
    UnknownProperty {
        category: ObjectCategory,
        property: String,
    },
    #[error("unknown component suffix `{suffix}` in `{property}` (expected x, y, or z)")]
    BadComponent { property: String, suffix: String },
    #[error("type mismatch writing `{property}`: expected {expected:?}, got {got:?}")]
    TypeMismatch {
        property: String,
        expected: ValueKind,
        got: ValueKind,
    },
    #[error("object {0} does not exist")]
    NoSuchObject(usize),
}

/// A slide navigation request could not be honored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("no slide deck is bound to this scope")]
    NoDeck,
    #[error("slide deck is empty")]
    EmptyDeck,
    #[error("unknown slide name `{0}`")]
    UnknownName(String),
    #[error("slide index {index} out of range ({len} slides)")]
    IndexOutOfRange { index: usize, len: usize },
}
