//! # Render Backend Contract
//!
//! The collaborator interface the scene synchronizer reports into. The core
//! never builds native rendering resources itself; it tells the backend what
//! changed, keyed by object identity. Backends are expected to be idempotent
//! when called with unchanged values.

use glam::{Mat4, Vec3};
use podium_data::ObjectId;

/// Render pass membership of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    Opaque,
    Transparent,
}

/// Backend operations dispatched by the scene synchronizer.
pub trait RenderBackend {
    /// Inherited transform/opacity/visibility for an entity changed.
    fn update_node(&mut self, id: ObjectId, transform: &Mat4, opacity: f32, visible: bool);

    /// A material's shader-facing values must be rebuilt.
    fn rebuild_material(&mut self, id: ObjectId, diffuse: Vec3, opacity: f32);

    /// A model moved between the opaque and transparent passes.
    fn update_model_pass(&mut self, id: ObjectId, pass: RenderPass);

    /// A camera's projection was recomputed.
    fn update_camera_projection(&mut self, id: ObjectId, projection: &Mat4);

    /// The active camera for a layer changed (possibly to none).
    fn set_active_camera(&mut self, layer: ObjectId, camera: Option<ObjectId>);

    /// A light's uniform state for its layer changed.
    fn update_light_uniforms(
        &mut self,
        layer: ObjectId,
        light: ObjectId,
        color: Vec3,
        brightness: f32,
        visible: bool,
    );

    /// A light's effective visibility flipped; shadow and ambient-occlusion
    /// state for the layer must be re-evaluated.
    fn rebuild_shadow_state(&mut self, layer: ObjectId);
}

/// One recorded backend call, for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    UpdateNode {
        id: ObjectId,
        opacity: f32,
        visible: bool,
    },
    RebuildMaterial {
        id: ObjectId,
    },
    UpdateModelPass {
        id: ObjectId,
        pass: RenderPass,
    },
    UpdateCameraProjection {
        id: ObjectId,
    },
    SetActiveCamera {
        layer: ObjectId,
        camera: Option<ObjectId>,
    },
    UpdateLightUniforms {
        layer: ObjectId,
        light: ObjectId,
        visible: bool,
    },
    RebuildShadowState {
        layer: ObjectId,
    },
}

/// Backend double that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count_node_updates(&self, target: ObjectId) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::UpdateNode { id, .. } if *id == target))
            .count()
    }
}

// Shared handle so a test can hand the engine a backend and still inspect
// the recorded calls afterwards. Single-threaded by design, like the engine.
impl RenderBackend for std::rc::Rc<std::cell::RefCell<RecordingBackend>> {
    fn update_node(&mut self, id: ObjectId, transform: &Mat4, opacity: f32, visible: bool) {
        self.borrow_mut().update_node(id, transform, opacity, visible);
    }

    fn rebuild_material(&mut self, id: ObjectId, diffuse: Vec3, opacity: f32) {
        self.borrow_mut().rebuild_material(id, diffuse, opacity);
    }

    fn update_model_pass(&mut self, id: ObjectId, pass: RenderPass) {
        self.borrow_mut().update_model_pass(id, pass);
    }

    fn update_camera_projection(&mut self, id: ObjectId, projection: &Mat4) {
        self.borrow_mut().update_camera_projection(id, projection);
    }

    fn set_active_camera(&mut self, layer: ObjectId, camera: Option<ObjectId>) {
        self.borrow_mut().set_active_camera(layer, camera);
    }

    fn update_light_uniforms(
        &mut self,
        layer: ObjectId,
        light: ObjectId,
        color: Vec3,
        brightness: f32,
        visible: bool,
    ) {
        self.borrow_mut()
            .update_light_uniforms(layer, light, color, brightness, visible);
    }

    fn rebuild_shadow_state(&mut self, layer: ObjectId) {
        self.borrow_mut().rebuild_shadow_state(layer);
    }
}

impl RenderBackend for RecordingBackend {
    fn update_node(&mut self, id: ObjectId, _transform: &Mat4, opacity: f32, visible: bool) {
        self.calls.push(BackendCall::UpdateNode {
            id,
            opacity,
            visible,
        });
    }

    fn rebuild_material(&mut self, id: ObjectId, _diffuse: Vec3, _opacity: f32) {
        self.calls.push(BackendCall::RebuildMaterial { id });
    }

    fn update_model_pass(&mut self, id: ObjectId, pass: RenderPass) {
        self.calls.push(BackendCall::UpdateModelPass { id, pass });
    }

    fn update_camera_projection(&mut self, id: ObjectId, _projection: &Mat4) {
        self.calls.push(BackendCall::UpdateCameraProjection { id });
    }

    fn set_active_camera(&mut self, layer: ObjectId, camera: Option<ObjectId>) {
        self.calls.push(BackendCall::SetActiveCamera { layer, camera });
    }

    fn update_light_uniforms(
        &mut self,
        layer: ObjectId,
        light: ObjectId,
        _color: Vec3,
        _brightness: f32,
        visible: bool,
    ) {
        self.calls.push(BackendCall::UpdateLightUniforms {
            layer,
            light,
            visible,
        });
    }

    fn rebuild_shadow_state(&mut self, layer: ObjectId) {
        self.calls.push(BackendCall::RebuildShadowState { layer });
    }
}
