//! # Podium Core
//!
//! The scene synchronization and timeline playback engine for authored
//! presentations.
//!
//! ## Responsibilities
//! - **Presentation Graph**: arena-based node hierarchy (`graph`, `object`).
//! - **Attached State**: cached global transform/opacity/visibility with
//!   dirty-flag bookkeeping (`attached`).
//! - **Scene Synchronizer**: the per-frame tree walk resolving dirty state
//!   and dispatching per-category backend updates (`sync`).
//! - **Slide Playback**: slide decks and the timeline state machine,
//!   including nested component scopes (`slides`, `player`).
//! - **Animation**: keyframe channel binding, coalesced property writes,
//!   and rollback (`animation`).
//! - **Property System**: generic get/set by string name (`property`),
//!   backed by the capability registry (`registry`).
//! - **Driver Surface**: the `Engine` facade and its tick loop (`engine`),
//!   events (`events`), data inputs (`datainput`), and the render backend
//!   contract (`backend`).

pub mod animation;
pub mod attached;
pub mod backend;
pub mod datainput;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod object;
pub mod player;
pub mod property;
pub mod registry;
pub mod slides;
pub mod sync;

pub use animation::{AnimationManager, PendingChanges};
pub use attached::{AttachedState, ChangeReasons, DirtyFlags};
pub use backend::{BackendCall, RecordingBackend, RenderBackend, RenderPass};
pub use engine::{Engine, EngineMode};
pub use error::{NavigationError, PropertyError};
pub use events::{Event, EventQueue, HandlerId};
pub use graph::PresentationGraph;
pub use object::{GraphObject, LightKind, ObjectData};
pub use player::{PlayerState, SlidePlayer};
pub use slides::{SlideDeck, TimelineScope};
pub use sync::SceneSynchronizer;

pub use podium_data::{
    AnimationTrack, DataInput, Interp, Keyframe, MasterSlide, ObjectCategory, ObjectId, PlayMode,
    PlayState, PlayThroughTarget, PropertyChange, Slide, Value, ValueKind,
};
