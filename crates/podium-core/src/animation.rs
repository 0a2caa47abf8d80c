//! # Animation Manager
//!
//! Builds and tears down keyframe channels for a slide's animation tracks,
//! queues per-object property writes produced by channel evaluation,
//! coalesces them, and rolls back previously-animated values on slide exit.
//!
//! ## Responsibilities
//! - **Channel Binding**: track → evaluable channel, with master-slide
//!   override resolution, ease→Bezier synthesis, and dynamic-track rebasing.
//! - **Evaluation**: position → value per channel, Newton–Raphson cubic
//!   Bezier easing.
//! - **Coalescing**: at most one pending write per (object, property) per
//!   frame, one batched dirty-mark per touched object.
//! - **Rollback**: restore pre-entry values through the same queue/apply
//!   path when a slide is left.

use glam::Vec2;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use podium_data::{AnimationTrack, Interp, MasterSlide, ObjectId, Value, ValueKind};

use crate::attached::ChangeReasons;
use crate::graph::PresentationGraph;
use crate::property;
use crate::registry;
use crate::slides::TimelineScope;
use crate::sync::SceneSynchronizer;

/// Cubic Bezier easing: returns the eased progress `y` for timeline
/// progress `x`, with control points `p1`, `p2` in normalized segment space.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t -= err / dx_dt;
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// Easing of one channel segment, precomputed at bind time.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SegmentEase {
    Linear,
    Bezier { p1: Vec2, p2: Vec2 },
}

/// Damping applied when synthesizing control points from an ease pair.
const EASE_DAMPING: f32 = 1.0 / 3.0;

impl SegmentEase {
    /// Converts the authored interpolation of the segment leaving a keyframe
    /// into normalized control points. `t0..t1` bound the segment in
    /// absolute time so authored control points can never invert ordering.
    fn from_interp(interp: Interp, t0: f32, t1: f32, v0: f32, v1: f32) -> Self {
        match interp {
            Interp::Linear => SegmentEase::Linear,
            Interp::Ease { ease_in, ease_out } => {
                let eo = (ease_out / 100.0).clamp(0.0, 1.0);
                let ei = (ease_in / 100.0).clamp(0.0, 1.0);
                if eo == 0.0 && ei == 0.0 {
                    return SegmentEase::Linear;
                }
                SegmentEase::Bezier {
                    p1: Vec2::new(eo * EASE_DAMPING, 0.0),
                    p2: Vec2::new(1.0 - ei * EASE_DAMPING, 1.0),
                }
            }
            Interp::Bezier {
                c1_time,
                c1_value,
                c2_time,
                c2_value,
            } => {
                let dt = t1 - t0;
                if dt <= 0.0 {
                    return SegmentEase::Linear;
                }
                // Times normalize into the segment and clamp to it; control
                // values are authored in percent of the value delta. The
                // vertical axis is left unclamped so overshoot eases remain
                // expressible.
                let dv = v1 - v0;
                let norm_value = |cv: f32, fallback: f32| {
                    if dv.abs() > f32::EPSILON {
                        cv / 100.0
                    } else {
                        fallback
                    }
                };
                SegmentEase::Bezier {
                    p1: Vec2::new(
                        ((c1_time - t0) / dt).clamp(0.0, 1.0),
                        norm_value(c1_value, 0.0),
                    ),
                    p2: Vec2::new(
                        ((c2_time - t0) / dt).clamp(0.0, 1.0),
                        norm_value(c2_value, 1.0),
                    ),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelKeyframe {
    time: f32,
    value: f32,
}

/// One evaluable keyframe channel bound to a single (object, property).
#[derive(Debug, Clone)]
pub struct Channel {
    target: ObjectId,
    /// Full property path including any component suffix.
    property: String,
    keyframes: Vec<ChannelKeyframe>,
    /// One entry per segment between consecutive keyframes.
    segments: Vec<SegmentEase>,
}

impl Channel {
    pub fn target(&self) -> ObjectId {
        self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Evaluates the channel at a timeline position in milliseconds.
    pub fn evaluate(&self, position: f32) -> f32 {
        let keyframes = &self.keyframes;
        debug_assert!(!keyframes.is_empty(), "channels are never bound empty");

        let idx = keyframes.partition_point(|kf| kf.time <= position);
        if idx == 0 {
            return keyframes[0].value;
        }
        let len = keyframes.len();
        if idx >= len {
            return keyframes[len - 1].value;
        }

        let k0 = keyframes[idx - 1];
        let k1 = keyframes[idx];
        let duration = k1.time - k0.time;
        if duration <= 0.0 {
            return k0.value;
        }

        let local_t = (position - k0.time) / duration;
        let eased = match self.segments[idx - 1] {
            SegmentEase::Linear => local_t,
            SegmentEase::Bezier { p1, p2 } => solve_cubic_bezier(p1, p2, local_t),
        };
        k0.value + (k1.value - k0.value) * eased
    }
}

/// Queued property writes for one frame. At most one write per
/// (object, property); the last write wins.
#[derive(Debug, Default)]
pub struct PendingChanges {
    changes: BTreeMap<(ObjectId, String), Value>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, target: ObjectId, property: impl Into<String>, value: Value) {
        self.changes.insert((target, property.into()), value);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The value queued for one (object, property), if any.
    pub fn queued(&self, target: ObjectId, property: &str) -> Option<Value> {
        self.changes.get(&(target, property.to_string())).cloned()
    }

    /// Merges `other` into this queue; `other`'s writes win on conflicts.
    pub fn merge(&mut self, other: PendingChanges) {
        self.changes.extend(other.changes);
    }
}

/// Transient animation state for one bound slide in one scope.
#[derive(Debug, Default)]
struct BoundSlide {
    channels: Vec<Channel>,
    /// Pre-entry values of every animated property, for rollback.
    rollback: Vec<(ObjectId, String, Value)>,
}

/// Builds, evaluates, and tears down keyframe channels; owns nothing beyond
/// the transient per-slide state.
#[derive(Debug, Default)]
pub struct AnimationManager {
    bound: HashMap<TimelineScope, BoundSlide>,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the animation tracks of a slide (child tracks override master
    /// tracks for the same target+property pair). Reads pre-entry values for
    /// rollback and rebases dynamic tracks outside editor mode.
    pub fn bind(
        &mut self,
        scope: TimelineScope,
        master: &MasterSlide,
        slide_index: usize,
        graph: &PresentationGraph,
        editor_mode: bool,
    ) {
        // Master tracks first so child tracks override them.
        let mut effective: Vec<&AnimationTrack> = Vec::new();
        let mut seen: Vec<(ObjectId, &str)> = Vec::new();

        let child_tracks = master
            .slides
            .get(slide_index)
            .map(|s| s.animation_tracks.as_slice())
            .unwrap_or(&[]);

        for track in child_tracks.iter().chain(master.animation_tracks.iter()) {
            let key = (track.object, track.property.as_str());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            effective.push(track);
        }

        let mut state = BoundSlide::default();
        for track in effective {
            if let Some(channel) = self.build_channel(track, graph, editor_mode, &mut state) {
                state.channels.push(channel);
            }
        }

        debug!(
            ?scope,
            slide = slide_index,
            channels = state.channels.len(),
            "bound animation channels"
        );
        self.bound.insert(scope, state);
    }

    fn build_channel(
        &self,
        track: &AnimationTrack,
        graph: &PresentationGraph,
        editor_mode: bool,
        state: &mut BoundSlide,
    ) -> Option<Channel> {
        let (base, component) = match property::split_path(&track.property) {
            Ok(parts) => parts,
            Err(err) => {
                warn!(object = track.object, %err, "skipping animation channel");
                return None;
            }
        };

        let Some(obj) = graph.get(track.object) else {
            warn!(
                object = track.object,
                property = %track.property,
                "animation track targets an object that does not exist"
            );
            return None;
        };

        let Some(kind) = registry::animatable_kind(obj.category(), base) else {
            warn!(
                object = track.object,
                property = %track.property,
                category = %obj.category(),
                "animatable property type cannot be resolved; skipping track"
            );
            return None;
        };

        let component_ok = match kind {
            ValueKind::Float => component.is_none(),
            ValueKind::Vec3 | ValueKind::Color => component.is_some(),
            _ => false,
        };
        if !component_ok {
            warn!(
                object = track.object,
                property = %track.property,
                ?kind,
                "animation track does not address a float channel; skipping"
            );
            return None;
        }

        if track.keyframes.is_empty() {
            warn!(
                object = track.object,
                property = %track.property,
                "animation track has no keyframes; skipping"
            );
            return None;
        }

        // Pre-entry value for rollback, read through the same accessor the
        // writes go through.
        match property::get(obj, &track.property) {
            Ok(value) => {
                state
                    .rollback
                    .push((track.object, track.property.clone(), value));
            }
            Err(err) => {
                warn!(object = track.object, %err, "skipping animation channel");
                return None;
            }
        }

        let mut keyframes: Vec<ChannelKeyframe> = track
            .keyframes
            .iter()
            .map(|kf| ChannelKeyframe {
                time: kf.time,
                value: kf.value,
            })
            .collect();

        if track.dynamic && !editor_mode {
            // Rebase the first keyframe onto the live value so playback
            // blends from wherever the property is now.
            match property::get(obj, &track.property).ok().and_then(|v| v.as_float()) {
                Some(live) => keyframes[0].value = live,
                None => {
                    warn!(
                        object = track.object,
                        property = %track.property,
                        "dynamic track read produced a non-numeric value; keeping authored start"
                    );
                }
            }
        }

        let segments = track
            .keyframes
            .windows(2)
            .map(|pair| {
                SegmentEase::from_interp(
                    pair[0].interp,
                    pair[0].time,
                    pair[1].time,
                    pair[0].value,
                    pair[1].value,
                )
            })
            .collect();

        Some(Channel {
            target: track.object,
            property: track.property.clone(),
            keyframes,
            segments,
        })
    }

    /// Whether a scope currently has bound channels.
    pub fn is_bound(&self, scope: TimelineScope) -> bool {
        self.bound.contains_key(&scope)
    }

    /// Evaluates every channel bound to `scope` at the given position and
    /// queues the resulting writes.
    pub fn evaluate(&self, scope: TimelineScope, position: f32, pending: &mut PendingChanges) {
        let Some(state) = self.bound.get(&scope) else {
            return;
        };
        for channel in &state.channels {
            let value = channel.evaluate(position);
            pending.queue(channel.target, channel.property.clone(), Value::Float(value));
        }
    }

    /// Stops and destroys the scope's channels and queues rollback of every
    /// recorded pre-entry value. The caller applies the returned queue
    /// immediately (not deferred): later code in the same tick may read the
    /// restored values.
    pub fn clear_animations(&mut self, scope: TimelineScope) -> PendingChanges {
        let mut pending = PendingChanges::new();
        if let Some(state) = self.bound.remove(&scope) {
            for (object, prop, value) in state.rollback {
                pending.queue(object, prop, value);
            }
        }
        pending
    }

    /// Drops all transient state for a scope without rollback (scope
    /// teardown).
    pub fn drop_scope(&mut self, scope: TimelineScope) {
        self.bound.remove(&scope);
    }

    /// Writes every queued value through the generic property setter and
    /// issues exactly one batched dirty-mark per touched object.
    pub fn apply_changes(
        graph: &mut PresentationGraph,
        sync: &mut SceneSynchronizer,
        pending: PendingChanges,
    ) {
        let mut current: Option<(ObjectId, ChangeReasons)> = None;

        for ((object, prop), value) in pending.changes {
            if current.map(|(id, _)| id) != Some(object) {
                if let Some((id, reasons)) = current.take() {
                    sync.mark_dirty(id, reasons);
                }
                current = Some((object, ChangeReasons::EMPTY));
            }

            let Some(obj) = graph.get_mut(object) else {
                warn!(object, property = %prop, "dropping change for missing object");
                continue;
            };
            match property::set(obj, &prop, &value) {
                Ok(reasons) => {
                    if let Some((_, acc)) = current.as_mut() {
                        acc.insert(reasons);
                    }
                }
                Err(err) => {
                    warn!(object, %err, "dropping queued property change");
                }
            }
        }

        if let Some((id, reasons)) = current.take() {
            sync.mark_dirty(id, reasons);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{GraphObject, ObjectData};
    use podium_data::{Keyframe, Slide};

    fn track(object: ObjectId, property: &str, keyframes: Vec<Keyframe>) -> AnimationTrack {
        AnimationTrack::new(object, property, keyframes)
    }

    fn bind_single(
        graph: &PresentationGraph,
        t: AnimationTrack,
        editor: bool,
    ) -> (AnimationManager, TimelineScope) {
        let master = MasterSlide::new("m", vec![Slide::new("s").with_tracks(vec![t])]);
        let mut mgr = AnimationManager::new();
        mgr.bind(TimelineScope::Presentation, &master, 0, graph, editor);
        (mgr, TimelineScope::Presentation)
    }

    #[test]
    fn bezier_solver_is_identity_on_the_diagonal() {
        let p1 = Vec2::new(1.0 / 3.0, 1.0 / 3.0);
        let p2 = Vec2::new(2.0 / 3.0, 2.0 / 3.0);
        for i in 0..=10 {
            let x = i as f32 / 10.0;
            assert!((solve_cubic_bezier(p1, p2, x) - x).abs() < 1e-3);
        }
    }

    #[test]
    fn bezier_solver_clamps_outside_range() {
        let p1 = Vec2::new(0.3, 0.0);
        let p2 = Vec2::new(0.7, 1.0);
        assert_eq!(solve_cubic_bezier(p1, p2, -0.5), 0.0);
        assert_eq!(solve_cubic_bezier(p1, p2, 1.5), 1.0);
    }

    #[test]
    fn ease_pair_synthesizes_bounded_control_points() {
        let ease = SegmentEase::from_interp(
            Interp::Ease {
                ease_in: 250.0,
                ease_out: 250.0,
            },
            0.0,
            1000.0,
            0.0,
            1.0,
        );
        match ease {
            SegmentEase::Bezier { p1, p2 } => {
                // Percentages clamp to 100 before damping.
                assert!((p1.x - 1.0 / 3.0).abs() < 1e-6);
                assert_eq!(p1.y, 0.0);
                assert!((p2.x - 2.0 / 3.0).abs() < 1e-6);
                assert_eq!(p2.y, 1.0);
            }
            other => panic!("expected bezier, got {other:?}"),
        }
    }

    #[test]
    fn zero_ease_collapses_to_linear() {
        let ease = SegmentEase::from_interp(
            Interp::Ease {
                ease_in: 0.0,
                ease_out: 0.0,
            },
            0.0,
            1000.0,
            0.0,
            1.0,
        );
        assert_eq!(ease, SegmentEase::Linear);
    }

    #[test]
    fn channel_evaluates_linear_segments() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let (mgr, scope) = bind_single(
            &graph,
            track(
                id,
                "opacity",
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(1000.0, 100.0)],
            ),
            false,
        );

        let mut pending = PendingChanges::new();
        mgr.evaluate(scope, 500.0, &mut pending);
        assert_eq!(pending.len(), 1);
        let value = pending.changes.values().next().unwrap();
        assert_eq!(*value, Value::Float(50.0));
    }

    #[test]
    fn channel_holds_ends() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let master = MasterSlide::new(
            "m",
            vec![Slide::new("s").with_tracks(vec![track(
                id,
                "position.x",
                vec![Keyframe::new(100.0, 5.0), Keyframe::new(200.0, 10.0)],
            )])],
        );
        let mut mgr = AnimationManager::new();
        mgr.bind(TimelineScope::Presentation, &master, 0, &graph, false);

        let channel = &mgr.bound[&TimelineScope::Presentation].channels[0];
        assert_eq!(channel.evaluate(0.0), 5.0);
        assert_eq!(channel.evaluate(999.0), 10.0);
    }

    #[test]
    fn dynamic_track_rebases_first_keyframe() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group).with_opacity(42.0));

        let (mgr, scope) = bind_single(
            &graph,
            track(
                id,
                "opacity",
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(1000.0, 100.0)],
            )
            .dynamic(),
            false,
        );

        let channel = &mgr.bound[&scope].channels[0];
        assert_eq!(channel.evaluate(0.0), 42.0);
    }

    #[test]
    fn dynamic_track_keeps_authored_start_in_editor_mode() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group).with_opacity(42.0));

        let (mgr, scope) = bind_single(
            &graph,
            track(
                id,
                "opacity",
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(1000.0, 100.0)],
            )
            .dynamic(),
            true,
        );

        let channel = &mgr.bound[&scope].channels[0];
        assert_eq!(channel.evaluate(0.0), 0.0);
    }

    #[test]
    fn child_track_overrides_master_track() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let master = MasterSlide::new(
            "m",
            vec![Slide::new("s").with_tracks(vec![track(
                id,
                "opacity",
                vec![Keyframe::new(0.0, 10.0), Keyframe::new(100.0, 10.0)],
            )])],
        )
        .with_tracks(vec![track(
            id,
            "opacity",
            vec![Keyframe::new(0.0, 99.0), Keyframe::new(100.0, 99.0)],
        )]);

        let mut mgr = AnimationManager::new();
        mgr.bind(TimelineScope::Presentation, &master, 0, &graph, false);

        let state = &mgr.bound[&TimelineScope::Presentation];
        assert_eq!(state.channels.len(), 1, "override, not merge");
        assert_eq!(state.channels[0].evaluate(50.0), 10.0);
    }

    #[test]
    fn master_tracks_play_when_not_overridden() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let master = MasterSlide::new("m", vec![Slide::new("s")]).with_tracks(vec![track(
            id,
            "opacity",
            vec![Keyframe::new(0.0, 7.0), Keyframe::new(100.0, 7.0)],
        )]);

        let mut mgr = AnimationManager::new();
        mgr.bind(TimelineScope::Presentation, &master, 0, &graph, false);
        assert_eq!(mgr.bound[&TimelineScope::Presentation].channels.len(), 1);
    }

    #[test]
    fn bad_component_suffix_skips_channel_only() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let master = MasterSlide::new(
            "m",
            vec![Slide::new("s").with_tracks(vec![
                track(id, "position.w", vec![Keyframe::new(0.0, 0.0)]),
                track(
                    id,
                    "position.x",
                    vec![Keyframe::new(0.0, 0.0), Keyframe::new(100.0, 1.0)],
                ),
            ])],
        );

        let mut mgr = AnimationManager::new();
        mgr.bind(TimelineScope::Presentation, &master, 0, &graph, false);
        assert_eq!(mgr.bound[&TimelineScope::Presentation].channels.len(), 1);
    }

    #[test]
    fn vector_track_without_suffix_is_skipped() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group));

        let (mgr, scope) = bind_single(
            &graph,
            track(
                id,
                "position",
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(100.0, 1.0)],
            ),
            false,
        );
        assert!(mgr.bound[&scope].channels.is_empty());
    }

    #[test]
    fn pending_changes_coalesce_last_write_wins() {
        let mut pending = PendingChanges::new();
        pending.queue(1, "opacity", Value::Float(10.0));
        pending.queue(1, "opacity", Value::Float(20.0));
        pending.queue(1, "opacity", Value::Float(30.0));
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending.changes[&(1, "opacity".to_string())],
            Value::Float(30.0)
        );
    }

    #[test]
    fn clear_animations_queues_pre_entry_values() {
        let mut graph = PresentationGraph::new();
        let id = graph.add_object(GraphObject::new("g", ObjectData::Group).with_opacity(64.0));

        let (mut mgr, scope) = bind_single(
            &graph,
            track(
                id,
                "opacity",
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(100.0, 100.0)],
            ),
            false,
        );

        let rollback = mgr.clear_animations(scope);
        assert_eq!(rollback.len(), 1);
        assert_eq!(
            rollback.changes[&(id, "opacity".to_string())],
            Value::Float(64.0)
        );
        assert!(!mgr.is_bound(scope));
    }
}
