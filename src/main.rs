//! Demo driver: assembles a small presentation in code and runs it for a
//! few seconds of simulated frames, logging backend traffic.

use anyhow::Result;
use glam::Vec3;
use podium_core::{
    Engine, EngineMode, GraphObject, LightKind, ObjectData, RenderBackend, TimelineScope,
};
use podium_data::{
    AnimationTrack, Keyframe, MasterSlide, ObjectId, PlayMode, PlayThroughTarget, PropertyChange,
    Slide,
};
use tracing::info;

/// Backend that logs what the synchronizer reports.
struct LoggingBackend;

impl RenderBackend for LoggingBackend {
    fn update_node(&mut self, id: ObjectId, _t: &glam::Mat4, opacity: f32, visible: bool) {
        info!(id, opacity, visible, "node update");
    }

    fn rebuild_material(&mut self, id: ObjectId, diffuse: Vec3, opacity: f32) {
        info!(id, ?diffuse, opacity, "material rebuild");
    }

    fn update_model_pass(&mut self, id: ObjectId, pass: podium_core::RenderPass) {
        info!(id, ?pass, "model pass");
    }

    fn update_camera_projection(&mut self, id: ObjectId, _projection: &glam::Mat4) {
        info!(id, "camera projection");
    }

    fn set_active_camera(&mut self, layer: ObjectId, camera: Option<ObjectId>) {
        info!(layer, ?camera, "active camera");
    }

    fn update_light_uniforms(
        &mut self,
        layer: ObjectId,
        light: ObjectId,
        _color: Vec3,
        brightness: f32,
        visible: bool,
    ) {
        info!(layer, light, brightness, visible, "light uniforms");
    }

    fn rebuild_shadow_state(&mut self, layer: ObjectId) {
        info!(layer, "shadow state");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let mut engine = Engine::new(Box::new(LoggingBackend), EngineMode::Viewer);

    // Layer with a camera, a light, and an animated model.
    let layer = engine.add_object(
        GraphObject::new("scene_layer", ObjectData::layer()).with_time_window(0.0, 3000.0),
        None,
    );
    let camera = engine.add_object(
        GraphObject::new("camera", ObjectData::camera())
            .with_position(Vec3::new(0.0, 0.0, -600.0))
            .with_time_window(0.0, 3000.0),
        Some(layer),
    );
    let light = engine.add_object(
        GraphObject::new("key_light", ObjectData::light(LightKind::Directional))
            .with_time_window(0.0, 3000.0),
        Some(layer),
    );
    let cube = engine.add_object(
        GraphObject::new("cube", ObjectData::model("#Cube")).with_time_window(0.0, 3000.0),
        Some(layer),
    );

    let spin = AnimationTrack::new(
        cube,
        "rotation.y",
        vec![
            Keyframe::with_ease(0.0, 0.0, 0.0, 100.0),
            Keyframe::with_ease(2000.0, 360.0, 100.0, 0.0),
        ],
    );

    engine.set_presentation_deck(MasterSlide::new(
        "master",
        vec![
            Slide::new("spin")
                .with_play_mode(PlayMode::PlayThrough(PlayThroughTarget::Next))
                .with_objects(vec![layer, camera, light, cube])
                .with_tracks(vec![spin]),
            Slide::new("hold")
                .with_play_mode(PlayMode::StopAtEnd)
                .with_objects(vec![layer, camera, light, cube])
                .with_property_changes(vec![PropertyChange::new(cube, "opacity", 50.0)]),
        ],
    ));

    engine.play(TimelineScope::Presentation);
    for frame in 0..240u32 {
        engine.tick(1000.0 / 60.0);
        if frame % 60 == 0 {
            info!(
                frame,
                slide = ?engine.current_slide_index(TimelineScope::Presentation),
                position = ?engine.position(TimelineScope::Presentation),
                "frame"
            );
        }
    }

    Ok(())
}
