use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a graph object for the lifetime of the presentation.
///
/// Ids are arena indices assigned by the runtime when the graph is built;
/// slide membership, property changes, and animation tracks all refer to
/// objects through them.
pub type ObjectId = usize;

/// The closed set of graph-object categories.
///
/// Every object in the presentation graph belongs to exactly one category;
/// the runtime dispatches per-category update handlers and property access
/// over this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectCategory {
    Group,
    Layer,
    Model,
    Camera,
    Light,
    Material,
    Effect,
    Text,
    Component,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 9] = [
        ObjectCategory::Group,
        ObjectCategory::Layer,
        ObjectCategory::Model,
        ObjectCategory::Camera,
        ObjectCategory::Light,
        ObjectCategory::Material,
        ObjectCategory::Effect,
        ObjectCategory::Text,
        ObjectCategory::Component,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectCategory::Group => "Group",
            ObjectCategory::Layer => "Layer",
            ObjectCategory::Model => "Model",
            ObjectCategory::Camera => "Camera",
            ObjectCategory::Light => "Light",
            ObjectCategory::Material => "Material",
            ObjectCategory::Effect => "Effect",
            ObjectCategory::Text => "Text",
            ObjectCategory::Component => "Component",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of value a property holds, used to resolve animatable property
/// types before channel construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Float,
    Vec2,
    Vec3,
    Color,
    String,
}

/// A property value.
///
/// Vectors and colors are stored as plain float arrays so the model stays
/// independent of any math library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    /// RGB, each channel in `[0, 1]`.
    Color([f32; 3]),
    String(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Float(_) => ValueKind::Float,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Color(_) => ValueKind::Color,
            Value::String(_) => ValueKind::String,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Value::Vec3(v)
    }
}

/// What a slide does when its timeline position reaches its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayMode {
    /// Restart at time 0 and keep playing.
    Looping,
    /// Move the deck's current index to the target, then enter that slide
    /// with its own initial play state.
    PlayThrough(PlayThroughTarget),
    /// Reverse the playback rate once; on the second pass restore the
    /// original rate and stop.
    Ping,
    /// Reverse the playback rate at every end, indefinitely.
    PingPong,
    /// Stop with the position held at the end.
    StopAtEnd,
}

impl Default for PlayMode {
    fn default() -> Self {
        PlayMode::StopAtEnd
    }
}

/// Target of a `PlayMode::PlayThrough`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayThroughTarget {
    Next,
    Previous,
    Index(usize),
}

/// Whether a slide starts playing or paused when entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Play,
    Pause,
}

impl Default for PlayState {
    fn default() -> Self {
        PlayState::Play
    }
}

/// Keyframe interpolation authored on the segment leaving a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Interp {
    /// Straight lerp to the next keyframe.
    Linear,
    /// Explicit cubic Bezier control points in absolute time / value space.
    /// Control values are authored in percent of the property range and
    /// normalized at bind time.
    Bezier {
        c1_time: f32,
        c1_value: f32,
        c2_time: f32,
        c2_value: f32,
    },
    /// Ease-in/ease-out percentage pair (0–100), converted to Bezier control
    /// points at bind time.
    Ease { ease_in: f32, ease_out: f32 },
}

impl Default for Interp {
    fn default() -> Self {
        Interp::Linear
    }
}

/// One keyframe on an animation track. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub interp: Interp,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            interp: Interp::Linear,
        }
    }

    pub fn with_ease(time: f32, value: f32, ease_in: f32, ease_out: f32) -> Self {
        Self {
            time,
            value,
            interp: Interp::Ease { ease_in, ease_out },
        }
    }
}

/// An authored animation track: keyframes for one property of one object.
///
/// `property` may carry a vector component suffix (`position.x`). Tracks are
/// immutable data; binding them produces transient channel state owned by
/// the runtime's animation manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    pub object: ObjectId,
    pub property: String,
    /// When true, the first keyframe's value is replaced at bind time with
    /// the target's live value so playback blends from wherever the property
    /// currently is.
    #[serde(default)]
    pub dynamic: bool,
    pub keyframes: Vec<Keyframe>,
}

impl AnimationTrack {
    pub fn new(object: ObjectId, property: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        Self {
            object,
            property: property.into(),
            dynamic: false,
            keyframes,
        }
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

/// A static property override applied verbatim on slide entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub object: ObjectId,
    pub property: String,
    pub value: Value,
}

impl PropertyChange {
    pub fn new(object: ObjectId, property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            object,
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A named segment of a timeline: membership, static overrides, and
/// animation tracks, plus the end-of-timeline behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub name: String,
    /// Authored timeline window of the slide in milliseconds. The runtime
    /// publishes the effective duration as the maximum of `end_time` and
    /// the member objects' end times.
    #[serde(default)]
    pub start_time: f32,
    #[serde(default)]
    pub end_time: f32,
    #[serde(default)]
    pub play_mode: PlayMode,
    #[serde(default)]
    pub initial_play_state: PlayState,
    /// Objects owned by this slide. Objects in neither the current slide nor
    /// the master slide of the scope are not rendered.
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    /// Applied in list order on slide entry; later entries for the same
    /// object/property win.
    #[serde(default)]
    pub property_changes: Vec<PropertyChange>,
    #[serde(default)]
    pub animation_tracks: Vec<AnimationTrack>,
}

impl Slide {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: 0.0,
            end_time: 0.0,
            play_mode: PlayMode::default(),
            initial_play_state: PlayState::default(),
            objects: Vec::new(),
            property_changes: Vec::new(),
            animation_tracks: Vec::new(),
        }
    }

    pub fn with_time_window(mut self, start: f32, end: f32) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_play_mode(mut self, mode: PlayMode) -> Self {
        self.play_mode = mode;
        self
    }

    pub fn with_initial_play_state(mut self, state: PlayState) -> Self {
        self.initial_play_state = state;
        self
    }

    pub fn with_objects(mut self, objects: Vec<ObjectId>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_property_changes(mut self, changes: Vec<PropertyChange>) -> Self {
        self.property_changes = changes;
        self
    }

    pub fn with_tracks(mut self, tracks: Vec<AnimationTrack>) -> Self {
        self.animation_tracks = tracks;
        self
    }
}

/// The always-present parent slide of a timeline scope.
///
/// Its membership, overrides, and tracks apply in every child slide unless a
/// child overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterSlide {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    #[serde(default)]
    pub property_changes: Vec<PropertyChange>,
    #[serde(default)]
    pub animation_tracks: Vec<AnimationTrack>,
    pub slides: Vec<Slide>,
}

impl MasterSlide {
    pub fn new(name: impl Into<String>, slides: Vec<Slide>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            property_changes: Vec::new(),
            animation_tracks: Vec::new(),
            slides,
        }
    }

    pub fn with_objects(mut self, objects: Vec<ObjectId>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_property_changes(mut self, changes: Vec<PropertyChange>) -> Self {
        self.property_changes = changes;
        self
    }

    pub fn with_tracks(mut self, tracks: Vec<AnimationTrack>) -> Self {
        self.animation_tracks = tracks;
        self
    }

    pub fn slide_index_by_name(&self, name: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.name == name)
    }
}

/// One (object, property) binding of a data input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInputBinding {
    pub object: ObjectId,
    pub property: String,
    /// Target range for linear remapping of a bounded input, as (min, max).
    #[serde(default)]
    pub target_range: Option<(f32, f32)>,
}

/// A named external input that drives one or more object properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInput {
    pub name: String,
    /// Declared input bounds. When present, incoming floats are remapped
    /// linearly from `[min, max]` onto each binding's target range.
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
    #[serde(default)]
    pub bindings: Vec<DataInputBinding>,
}

impl DataInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: None,
            max: None,
            bindings: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn bind(mut self, object: ObjectId, property: impl Into<String>) -> Self {
        self.bindings.push(DataInputBinding {
            object,
            property: property.into(),
            target_range: None,
        });
        self
    }

    pub fn bind_range(
        mut self,
        object: ObjectId,
        property: impl Into<String>,
        target: (f32, f32),
    ) -> Self {
        self.bindings.push(DataInputBinding {
            object,
            property: property.into(),
            target_range: Some(target),
        });
        self
    }
}
