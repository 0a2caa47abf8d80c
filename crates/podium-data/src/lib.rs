//! Data structures for authored podium presentations.
//!
//! This crate is pure data: the slide graph (master slides, child slides,
//! membership, static overrides), animation tracks and keyframes, property
//! values, and data-input declarations. All types are `serde`-derived so a
//! host can load or store a presentation as JSON. The runtime semantics live
//! in `podium-core`.

pub mod model;

pub use model::*;
