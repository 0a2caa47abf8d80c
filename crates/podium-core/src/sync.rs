//! # Scene Synchronizer
//!
//! The per-frame tree walk that resolves dirty flags into global-state
//! recomputation and dispatches per-category backend updates.
//!
//! ## Responsibilities
//! - **Attached State ownership**: creates, mutates, and destroys the
//!   per-object runtime records.
//! - **`mark_dirty`**: O(1) bit setting, safe to call repeatedly per frame.
//! - **`sync`**: one full depth-first walk per call. Change-gated
//!   recomputation of inherited transform/opacity/visibility, category
//!   handler dispatch through a fixed table, camera/light visibility side
//!   effects.
//!
//! The walk recurses into children unconditionally: a child's global state
//! depends on the parent's freshly computed value even when the child has no
//! local dirty bits. The walk is O(n) every frame by contract.

use glam::Mat4;
use tracing::trace;

use podium_data::{ObjectCategory, ObjectId};

use crate::attached::{AttachedState, ChangeReasons, DirtyFlags};
use crate::backend::{RenderBackend, RenderPass};
use crate::graph::PresentationGraph;
use crate::object::ObjectData;

/// Opacities this close to 1.0 snap exactly to 1.0, keeping fully opaque
/// content out of opacity-under-1 branches. The tolerance is load-bearing
/// for authored content; do not "clean it up".
pub const OPACITY_SNAP_EPSILON: f32 = 1e-4;

/// Inherited state handed from a parent to its children during the walk.
#[derive(Debug, Clone, Copy)]
struct ParentSnapshot {
    transform: Mat4,
    opacity: f32,
    logical_visible: bool,
    effective_visible: bool,
}

impl ParentSnapshot {
    fn root() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            opacity: 1.0,
            logical_visible: true,
            effective_visible: true,
        }
    }

    fn from_attached(att: &AttachedState) -> Self {
        Self {
            transform: att.global_transform,
            opacity: att.global_opacity,
            logical_visible: att.global_logical_visible,
            effective_visible: att.global_effective_visible,
        }
    }
}

/// Per-category update handler invoked when an object's own dirty bits are
/// set.
type Handler = fn(&mut SyncCtx<'_>, &mut PresentationGraph, ObjectId);

fn category_index(category: ObjectCategory) -> usize {
    match category {
        ObjectCategory::Group => 0,
        ObjectCategory::Layer => 1,
        ObjectCategory::Model => 2,
        ObjectCategory::Camera => 3,
        ObjectCategory::Light => 4,
        ObjectCategory::Material => 5,
        ObjectCategory::Effect => 6,
        ObjectCategory::Text => 7,
        ObjectCategory::Component => 8,
    }
}

struct SyncCtx<'a> {
    attached: &'a mut Vec<Option<AttachedState>>,
    backend: &'a mut dyn RenderBackend,
}

impl SyncCtx<'_> {
    fn effective_visible(&self, id: ObjectId) -> bool {
        self.attached
            .get(id)
            .and_then(|a| a.as_ref())
            .map(|a| a.global_effective_visible)
            .unwrap_or(false)
    }

    fn global_opacity(&self, id: ObjectId) -> f32 {
        self.attached
            .get(id)
            .and_then(|a| a.as_ref())
            .map(|a| a.global_opacity)
            .unwrap_or(1.0)
    }
}

/// Owns all attached state and performs the per-frame walk.
pub struct SceneSynchronizer {
    attached: Vec<Option<AttachedState>>,
    handlers: [Handler; 9],
}

impl Default for SceneSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneSynchronizer {
    pub fn new() -> Self {
        // The dispatch table is fixed at startup; traversal never branches
        // on category beyond this index.
        let mut handlers: [Handler; 9] = [handle_noop; 9];
        handlers[category_index(ObjectCategory::Layer)] = handle_layer;
        handlers[category_index(ObjectCategory::Model)] = handle_model;
        handlers[category_index(ObjectCategory::Camera)] = handle_camera;
        handlers[category_index(ObjectCategory::Light)] = handle_light;
        handlers[category_index(ObjectCategory::Material)] = handle_material;
        Self {
            attached: Vec::new(),
            handlers,
        }
    }

    /// Creates attached state for an object entering the live scene. All
    /// dirty bits start set so the first walk computes everything.
    pub fn attach(&mut self, id: ObjectId, category: ObjectCategory) {
        if self.attached.len() <= id {
            self.attached.resize_with(id + 1, || None);
        }
        let mut state = AttachedState::new(category);
        state.dirty = DirtyFlags::TRANSFORM
            .union(DirtyFlags::OPACITY)
            .union(DirtyFlags::VISIBILITY)
            .union(DirtyFlags::category_bit(category));
        state.reasons = ChangeReasons::PROPERTY;
        self.attached[id] = Some(state);
    }

    /// Destroys attached state; pending dirty state is discarded.
    pub fn detach(&mut self, id: ObjectId) {
        if let Some(slot) = self.attached.get_mut(id) {
            *slot = None;
        }
    }

    pub fn is_attached(&self, id: ObjectId) -> bool {
        self.attached.get(id).map(Option::is_some).unwrap_or(false)
    }

    pub fn attached_state(&self, id: ObjectId) -> Option<&AttachedState> {
        self.attached.get(id).and_then(|a| a.as_ref())
    }

    /// Records that an object changed. Only sets bits; never recomputes.
    /// An object without attached state is skipped.
    pub fn mark_dirty(&mut self, id: ObjectId, reasons: ChangeReasons) {
        let Some(att) = self.attached.get_mut(id).and_then(|a| a.as_mut()) else {
            return;
        };
        att.reasons.insert(reasons);
        if reasons.contains(ChangeReasons::TRANSFORM) {
            att.dirty.insert(DirtyFlags::TRANSFORM);
        }
        if reasons.contains(ChangeReasons::OPACITY) {
            att.dirty.insert(DirtyFlags::OPACITY);
        }
        if reasons.contains(ChangeReasons::EYEBALL.union(ChangeReasons::TIMELINE)) {
            att.dirty.insert(DirtyFlags::VISIBILITY);
        }
        if !reasons.is_empty() {
            att.dirty.insert(DirtyFlags::category_bit(att.category));
        }
    }

    /// Walks the presentation graph depth-first exactly once, resolving
    /// dirty state and reporting changes to the backend.
    pub fn sync(&mut self, graph: &mut PresentationGraph, backend: &mut dyn RenderBackend) {
        if self.attached.len() < graph.capacity() {
            self.attached.resize_with(graph.capacity(), || None);
        }
        let handlers = self.handlers;
        let mut ctx = SyncCtx {
            attached: &mut self.attached,
            backend,
        };
        for root in graph.roots() {
            visit(
                &mut ctx,
                graph,
                &handlers,
                root,
                ParentSnapshot::root(),
                DirtyFlags::EMPTY,
            );
        }
    }
}

fn snap_opacity(value: f32) -> f32 {
    let clamped = value.clamp(0.0, 1.0);
    if (1.0 - clamped).abs() < OPACITY_SNAP_EPSILON {
        1.0
    } else {
        clamped
    }
}

fn visit(
    ctx: &mut SyncCtx<'_>,
    graph: &mut PresentationGraph,
    handlers: &[Handler; 9],
    id: ObjectId,
    parent: ParentSnapshot,
    inherited: DirtyFlags,
) {
    let children = match graph.get(id) {
        Some(obj) => obj.children.clone(),
        None => return,
    };

    let Some(att) = ctx.attached.get(id).and_then(|a| a.as_ref()).copied() else {
        // Not built yet (or already torn down): nothing to resolve here,
        // but built descendants still inherit from the snapshot we carry.
        for child in children {
            visit(ctx, graph, handlers, child, parent, inherited);
        }
        return;
    };

    let own_dirty = att.dirty;
    let effective_dirty = own_dirty.union(inherited);
    let mut changed = DirtyFlags::EMPTY;
    let mut new_state = att;

    if !effective_dirty.is_empty() {
        let obj = graph.get(id).expect("object checked above");

        let transform = parent.transform * obj.local_transform();
        let opacity = snap_opacity(parent.opacity * (obj.opacity / 100.0));
        let logical = obj.active && parent.logical_visible;
        let effective = obj.active && obj.slide_visible && parent.effective_visible;

        // Change-gating: only a recomputed value that actually differs from
        // the cache propagates to children and to the backend.
        if transform != att.global_transform {
            new_state.global_transform = transform;
            changed.insert(DirtyFlags::TRANSFORM);
        }
        if opacity != att.global_opacity {
            new_state.global_opacity = opacity;
            changed.insert(DirtyFlags::OPACITY);
        }
        if logical != att.global_logical_visible {
            new_state.global_logical_visible = logical;
            changed.insert(DirtyFlags::VISIBILITY);
        }
        if effective != att.global_effective_visible {
            new_state.global_effective_visible = effective;
            changed.insert(DirtyFlags::VISIBILITY);
        }
    }

    let visibility_flipped = changed.contains(DirtyFlags::VISIBILITY)
        && new_state.global_effective_visible != att.global_effective_visible;

    new_state.dirty = DirtyFlags::EMPTY;
    new_state.reasons = ChangeReasons::EMPTY;
    ctx.attached[id] = Some(new_state);

    if !changed.is_empty() {
        trace!(id, changed = changed.bits(), "synchronized object");
        ctx.backend.update_node(
            id,
            &new_state.global_transform,
            new_state.global_opacity,
            new_state.global_effective_visible,
        );
    }

    let category = graph.get(id).map(|o| o.category());
    if let Some(category) = category {
        // Camera/light visibility flips carry render-graph side effects
        // beyond the plain node update.
        if visibility_flipped {
            match category {
                ObjectCategory::Camera => {
                    if let Some(layer) = graph.enclosing_layer(id) {
                        re_evaluate_active_camera(ctx, graph, layer);
                    }
                }
                ObjectCategory::Light => {
                    if let Some(layer) = graph.enclosing_layer(id) {
                        ctx.backend.rebuild_shadow_state(layer);
                    }
                }
                _ => {}
            }
        }

        // Type-specific handler only when the object itself was edited, not
        // when it merely inherited a change.
        if !own_dirty.is_empty() {
            handlers[category_index(category)](ctx, graph, id);
        }
    }

    let snapshot = ParentSnapshot::from_attached(&new_state);
    for child in children {
        visit(ctx, graph, handlers, child, snapshot, changed);
    }
}

fn handle_noop(_ctx: &mut SyncCtx<'_>, _graph: &mut PresentationGraph, _id: ObjectId) {}

fn handle_layer(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    re_evaluate_active_camera(ctx, graph, id);
}

fn handle_model(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    retag_model_pass(ctx, graph, id);
}

fn handle_camera(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    let Some(obj) = graph.get_mut(id) else {
        return;
    };
    if let ObjectData::Camera {
        fov_degrees,
        clip_near,
        clip_far,
        orthographic,
        projection,
    } = &mut obj.data
    {
        // Aspect is owned by the render target; the backend corrects it.
        // 16:9 keeps the cached matrix meaningful for picking collaborators.
        let aspect = 16.0 / 9.0;
        *projection = if *orthographic {
            Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, *clip_near, *clip_far)
        } else {
            Mat4::perspective_rh(fov_degrees.to_radians(), aspect, *clip_near, *clip_far)
        };
        let projection = *projection;
        ctx.backend.update_camera_projection(id, &projection);
    }
}

fn handle_light(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    let Some(layer) = graph.enclosing_layer(id) else {
        return;
    };
    let Some(obj) = graph.get(id) else {
        return;
    };
    if let ObjectData::Light {
        color, brightness, ..
    } = &obj.data
    {
        let visible = ctx.effective_visible(id);
        let color = *color;
        let brightness = *brightness;
        ctx.backend
            .update_light_uniforms(layer, id, color, brightness, visible);
    }
}

fn handle_material(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    let Some(obj) = graph.get(id) else {
        return;
    };
    if let ObjectData::Material {
        diffuse,
        transparency,
    } = &obj.data
    {
        let diffuse = *diffuse;
        let transparency = *transparency;
        ctx.backend
            .rebuild_material(id, diffuse, (transparency / 100.0).clamp(0.0, 1.0));
    }
    // A transparency edit can move the owning model between passes.
    if let Some(parent) = graph.get(id).and_then(|o| o.parent) {
        if graph.get(parent).map(|o| o.category()) == Some(ObjectCategory::Model) {
            retag_model_pass(ctx, graph, parent);
        }
    }
}

fn retag_model_pass(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, id: ObjectId) {
    let Some(obj) = graph.get(id) else {
        return;
    };

    let mut transparent = ctx.global_opacity(id) < 1.0;
    if !transparent {
        for &child in &obj.children {
            if let Some(ObjectData::Material { transparency, .. }) =
                graph.get(child).map(|o| &o.data)
            {
                if *transparency < 100.0 {
                    transparent = true;
                    break;
                }
            }
        }
    }

    let pass = if transparent {
        RenderPass::Transparent
    } else {
        RenderPass::Opaque
    };

    if let Some(ObjectData::Model {
        pass: current_pass, ..
    }) = graph.get_mut(id).map(|o| &mut o.data)
    {
        if *current_pass != pass {
            *current_pass = pass;
            ctx.backend.update_model_pass(id, pass);
        }
    }
}

/// Picks the first effectively-visible camera in the layer's subtree and
/// publishes it when it changed.
fn re_evaluate_active_camera(ctx: &mut SyncCtx<'_>, graph: &mut PresentationGraph, layer: ObjectId) {
    let mut new_camera = None;
    for id in graph.subtree(layer) {
        if graph.get(id).map(|o| o.category()) == Some(ObjectCategory::Camera)
            && ctx.effective_visible(id)
        {
            new_camera = Some(id);
            break;
        }
    }

    if let Some(ObjectData::Layer { active_camera }) = graph.get_mut(layer).map(|o| &mut o.data) {
        if *active_camera != new_camera {
            *active_camera = new_camera;
            ctx.backend.set_active_camera(layer, new_camera);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};
    use crate::object::{GraphObject, ObjectData};

    fn build(graph: &mut PresentationGraph, sync: &mut SceneSynchronizer, obj: GraphObject) -> ObjectId {
        let category = obj.category();
        let id = graph.add_object(obj);
        sync.attach(id, category);
        id
    }

    fn shown(mut obj: GraphObject) -> GraphObject {
        obj.slide_visible = true;
        obj
    }

    #[test]
    fn opacity_snaps_near_one() {
        assert_eq!(snap_opacity(0.99999), 1.0);
        assert_eq!(snap_opacity(1.2), 1.0);
        assert!(snap_opacity(0.995) < 1.0);
        assert_eq!(snap_opacity(-0.5), 0.0);
    }

    #[test]
    fn inherited_opacity_multiplies_and_clamps() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let parent = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("p", ObjectData::Group).with_opacity(50.0)),
        );
        let child = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("c", ObjectData::Group).with_opacity(50.0)),
        );
        graph.add_child(parent, child);

        sync.sync(&mut graph, &mut backend);

        assert_eq!(sync.attached_state(parent).unwrap().global_opacity, 0.5);
        assert_eq!(sync.attached_state(child).unwrap().global_opacity, 0.25);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let parent = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("p", ObjectData::Group)),
        );
        let child = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("c", ObjectData::Group)),
        );
        graph.add_child(parent, child);

        sync.sync(&mut graph, &mut backend);
        assert!(!backend.calls.is_empty());

        backend.clear();
        sync.sync(&mut graph, &mut backend);
        assert!(
            backend.calls.is_empty(),
            "second sync with no mutation must not emit updates"
        );
    }

    #[test]
    fn parent_transform_change_propagates_without_child_dirty_bits() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let parent = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("p", ObjectData::Group)),
        );
        let child = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("c", ObjectData::Group)),
        );
        graph.add_child(parent, child);
        sync.sync(&mut graph, &mut backend);

        graph.get_mut(parent).unwrap().position = glam::Vec3::new(5.0, 0.0, 0.0);
        sync.mark_dirty(parent, ChangeReasons::TRANSFORM);

        backend.clear();
        sync.sync(&mut graph, &mut backend);

        let child_transform = sync.attached_state(child).unwrap().global_transform;
        let p = child_transform.transform_point3(glam::Vec3::ZERO);
        assert!((p.x - 5.0).abs() < 1e-6);
        assert_eq!(backend.count_node_updates(child), 1);
    }

    #[test]
    fn unattached_objects_are_skipped_not_asserted() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let parent = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("p", ObjectData::Group)),
        );
        // Child added to the graph but never built into the live scene.
        let child = graph.add_object(GraphObject::new("c", ObjectData::Group));
        graph.add_child(parent, child);

        sync.mark_dirty(child, ChangeReasons::TRANSFORM); // no-op
        sync.sync(&mut graph, &mut backend);
        assert!(sync.attached_state(child).is_none());
    }

    #[test]
    fn eyeball_flip_updates_effective_and_logical_visibility() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let parent = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("p", ObjectData::Group)),
        );
        let child = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("c", ObjectData::Group)),
        );
        graph.add_child(parent, child);
        sync.sync(&mut graph, &mut backend);
        assert!(sync.attached_state(child).unwrap().global_effective_visible);

        graph.get_mut(parent).unwrap().active = false;
        sync.mark_dirty(parent, ChangeReasons::EYEBALL);
        sync.sync(&mut graph, &mut backend);

        let child_att = sync.attached_state(child).unwrap();
        assert!(!child_att.global_logical_visible);
        assert!(!child_att.global_effective_visible);
    }

    #[test]
    fn camera_visibility_flip_reevaluates_active_camera() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let layer = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("layer", ObjectData::layer())),
        );
        let cam_a = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("camA", ObjectData::camera())),
        );
        let cam_b = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("camB", ObjectData::camera())),
        );
        graph.add_child(layer, cam_a);
        graph.add_child(layer, cam_b);
        sync.sync(&mut graph, &mut backend);

        assert!(backend.calls.contains(&BackendCall::SetActiveCamera {
            layer,
            camera: Some(cam_a)
        }));

        graph.get_mut(cam_a).unwrap().active = false;
        sync.mark_dirty(cam_a, ChangeReasons::EYEBALL);
        backend.clear();
        sync.sync(&mut graph, &mut backend);

        assert!(backend.calls.contains(&BackendCall::SetActiveCamera {
            layer,
            camera: Some(cam_b)
        }));
    }

    #[test]
    fn light_visibility_flip_rebuilds_shadow_state() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let layer = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("layer", ObjectData::layer())),
        );
        let light = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new(
                "key",
                ObjectData::light(crate::object::LightKind::Directional),
            )),
        );
        graph.add_child(layer, light);
        sync.sync(&mut graph, &mut backend);

        graph.get_mut(light).unwrap().active = false;
        sync.mark_dirty(light, ChangeReasons::EYEBALL);
        backend.clear();
        sync.sync(&mut graph, &mut backend);

        assert!(backend
            .calls
            .contains(&BackendCall::RebuildShadowState { layer }));
    }

    #[test]
    fn transparent_opacity_retags_model_pass() {
        let mut graph = PresentationGraph::new();
        let mut sync = SceneSynchronizer::new();
        let mut backend = RecordingBackend::new();

        let model = build(
            &mut graph,
            &mut sync,
            shown(GraphObject::new("m", ObjectData::model("cube"))),
        );
        sync.sync(&mut graph, &mut backend);

        graph.get_mut(model).unwrap().opacity = 40.0;
        sync.mark_dirty(model, ChangeReasons::OPACITY);
        backend.clear();
        sync.sync(&mut graph, &mut backend);

        assert!(backend.calls.contains(&BackendCall::UpdateModelPass {
            id: model,
            pass: RenderPass::Transparent
        }));
    }
}
