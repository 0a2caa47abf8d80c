//! Podium: a runtime engine for authored, time-based 3D/2D presentations.
//!
//! The crates compose as:
//! - [`podium_data`] — the authored data model (slides, tracks, keyframes).
//! - [`podium_core`] — scene synchronization, slide playback, animation.
//!
//! This facade re-exports the full public surface.

pub use podium_core::*;
pub use podium_data as data;
