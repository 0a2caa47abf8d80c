//! # Graph Objects
//!
//! The typed node record stored in the presentation graph arena.
//!
//! ## Responsibilities
//! - **`GraphObject`**: hierarchy links, authored per-node state (timeline
//!   window, eyeball flag, local TRS, local opacity), and the category
//!   payload.
//! - **`ObjectData`**: tagged union over the closed category set with the
//!   per-category runtime fields the update handlers maintain.

use glam::{Mat4, Quat, Vec3};
use podium_data::{MasterSlide, ObjectCategory, ObjectId};

use crate::backend::RenderPass;

/// Light source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Area,
}

/// Per-category payload of a graph object.
///
/// The runtime fields (`projection`, `pass`) are recomputed by the scene
/// synchronizer's category handlers, never authored.
#[derive(Debug, Clone)]
pub enum ObjectData {
    Group,
    Layer {
        /// Camera currently presenting this layer, maintained by the
        /// synchronizer when camera visibility flips.
        active_camera: Option<ObjectId>,
    },
    Model {
        mesh: String,
        pass: RenderPass,
    },
    Camera {
        fov_degrees: f32,
        clip_near: f32,
        clip_far: f32,
        orthographic: bool,
        projection: Mat4,
    },
    Light {
        kind: LightKind,
        color: Vec3,
        brightness: f32,
        cast_shadow: bool,
    },
    Material {
        diffuse: Vec3,
        /// Material transparency in percent; anything below 100 moves the
        /// owning model into the transparent pass.
        transparency: f32,
    },
    Effect {
        effect: String,
        strength: f32,
    },
    Text {
        text: String,
        color: Vec3,
        size: f32,
    },
    /// Owner of a nested timeline scope. The authored master slide seeds the
    /// component's own deck, created lazily the first time the component
    /// becomes reachable from a live slide.
    Component { master: Box<MasterSlide> },
}

impl ObjectData {
    pub fn category(&self) -> ObjectCategory {
        match self {
            ObjectData::Group => ObjectCategory::Group,
            ObjectData::Layer { .. } => ObjectCategory::Layer,
            ObjectData::Model { .. } => ObjectCategory::Model,
            ObjectData::Camera { .. } => ObjectCategory::Camera,
            ObjectData::Light { .. } => ObjectCategory::Light,
            ObjectData::Material { .. } => ObjectCategory::Material,
            ObjectData::Effect { .. } => ObjectCategory::Effect,
            ObjectData::Text { .. } => ObjectCategory::Text,
            ObjectData::Component { .. } => ObjectCategory::Component,
        }
    }

    pub fn layer() -> Self {
        ObjectData::Layer {
            active_camera: None,
        }
    }

    pub fn model(mesh: impl Into<String>) -> Self {
        ObjectData::Model {
            mesh: mesh.into(),
            pass: RenderPass::Opaque,
        }
    }

    pub fn camera() -> Self {
        ObjectData::Camera {
            fov_degrees: 60.0,
            clip_near: 10.0,
            clip_far: 5000.0,
            orthographic: false,
            projection: Mat4::IDENTITY,
        }
    }

    pub fn light(kind: LightKind) -> Self {
        ObjectData::Light {
            kind,
            color: Vec3::ONE,
            brightness: 100.0,
            cast_shadow: false,
        }
    }

    pub fn material() -> Self {
        ObjectData::Material {
            diffuse: Vec3::ONE,
            transparency: 100.0,
        }
    }

    pub fn effect(effect: impl Into<String>) -> Self {
        ObjectData::Effect {
            effect: effect.into(),
            strength: 100.0,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ObjectData::Text {
            text: text.into(),
            color: Vec3::ONE,
            size: 36.0,
        }
    }

    pub fn component(master: MasterSlide) -> Self {
        ObjectData::Component {
            master: Box::new(master),
        }
    }
}

/// A node in the presentation graph.
///
/// The hierarchy shape is static from the core's point of view: parents and
/// children are only rewired through the graph's add/remove API, never
/// during a tick.
#[derive(Debug, Clone)]
pub struct GraphObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,

    /// Timeline window of the object on its slide, in milliseconds.
    pub start_time: f32,
    pub end_time: f32,

    /// Authored "eyeball" flag.
    pub active: bool,
    /// Slide-membership visibility, committed by the slide players at the
    /// end of a tick. Participates in effective visibility only.
    pub slide_visible: bool,

    pub position: Vec3,
    /// Euler rotation in degrees (XYZ order).
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Local opacity in percent (0–100).
    pub opacity: f32,

    pub data: ObjectData,
}

impl GraphObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            start_time: 0.0,
            end_time: 10_000.0,
            active: true,
            slide_visible: false,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            opacity: 100.0,
            data,
        }
    }

    pub fn with_time_window(mut self, start: f32, end: f32) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn category(&self) -> ObjectCategory {
        self.data.category()
    }

    /// Local transform composed from TRS. Rotation is authored in degrees.
    pub fn local_transform(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            glam::EulerRot::XYZ,
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_payload() {
        assert_eq!(
            GraphObject::new("m", ObjectData::model("cube")).category(),
            ObjectCategory::Model
        );
        assert_eq!(
            GraphObject::new("c", ObjectData::component(MasterSlide::new("m", vec![]))).category(),
            ObjectCategory::Component
        );
    }

    #[test]
    fn local_transform_translates() {
        let obj = GraphObject::new("g", ObjectData::Group).with_position(Vec3::new(1.0, 2.0, 3.0));
        let t = obj.local_transform();
        let p = t.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }
}
