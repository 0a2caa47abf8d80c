//! # Engine
//!
//! The driver-facing facade: owns the presentation graph, the scene
//! synchronizer, the animation manager, one slide player per timeline
//! scope, the event queue, and the data-input table, and runs the per-frame
//! tick.
//!
//! ## Tick order (normative)
//! 1. Flush the event queue to registered handlers.
//! 2. Advance every live slide player; queue animation writes and
//!    visibility-window changes.
//! 3. Apply the queued property changes (one batched dirty-mark per object).
//! 4. Run the scene synchronizer's tree walk.
//! 5. Commit pending visibility changes (resolved by the next walk).
//!
//! Everything runs to completion inside `tick`; there is no internal
//! threading.

use std::collections::{BTreeMap, HashMap};
use std::mem;

use tracing::{debug, warn};

use podium_data::{
    DataInput, MasterSlide, ObjectCategory, ObjectId, PlayState, PlayThroughTarget, PropertyChange,
    Value,
};

use crate::animation::{AnimationManager, PendingChanges};
use crate::attached::{AttachedState, ChangeReasons};
use crate::backend::RenderBackend;
use crate::error::PropertyError;
use crate::events::{Event, EventQueue};
use crate::graph::PresentationGraph;
use crate::object::{GraphObject, ObjectData};
use crate::player::{AdvanceOutcome, PlayerState, SlidePlayer};
use crate::property;
use crate::slides::SlideDeck;
pub use crate::slides::TimelineScope;
use crate::sync::SceneSynchronizer;

/// Viewer mode honors authored playback branching; editor mode stops at
/// every timeline end and never rebases dynamic keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Viewer,
    Editor,
}

/// The presentation runtime.
pub struct Engine {
    graph: PresentationGraph,
    sync: SceneSynchronizer,
    animation: AnimationManager,
    players: HashMap<TimelineScope, SlidePlayer>,
    /// Scopes in creation order; the presentation scope is always first.
    scope_order: Vec<TimelineScope>,
    events: EventQueue,
    data_inputs: HashMap<String, DataInput>,
    backend: Box<dyn RenderBackend>,
    mode: EngineMode,
    /// Tick-scoped queues, cleared every tick.
    pending_changes: PendingChanges,
    pending_visibility: BTreeMap<ObjectId, bool>,
}

impl Engine {
    pub fn new(backend: Box<dyn RenderBackend>, mode: EngineMode) -> Self {
        let mut players = HashMap::new();
        players.insert(TimelineScope::Presentation, SlidePlayer::new());
        Self {
            graph: PresentationGraph::new(),
            sync: SceneSynchronizer::new(),
            animation: AnimationManager::new(),
            players,
            scope_order: vec![TimelineScope::Presentation],
            events: EventQueue::new(),
            data_inputs: HashMap::new(),
            backend,
            mode,
            pending_changes: PendingChanges::new(),
            pending_visibility: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    fn editor_mode(&self) -> bool {
        self.mode == EngineMode::Editor
    }

    // ===== Scene construction =====

    /// Adds an object to the graph and builds it into the live scene
    /// (creates its attached state).
    pub fn add_object(&mut self, object: GraphObject, parent: Option<ObjectId>) -> ObjectId {
        let category = object.category();
        let id = self.graph.add_object(object);
        if let Some(parent) = parent {
            self.graph.add_child(parent, id);
        }
        self.sync.attach(id, category);
        id
    }

    /// Tears down a subtree: attached state is destroyed, component scopes
    /// rooted in the subtree lose their players and transient animation
    /// state, and the objects leave the graph.
    pub fn remove_object(&mut self, id: ObjectId) {
        for member in self.graph.subtree(id) {
            self.sync.detach(member);
            if self.graph.get(member).map(|o| o.category()) == Some(ObjectCategory::Component) {
                let scope = TimelineScope::Component(member);
                self.players.remove(&scope);
                self.animation.drop_scope(scope);
                self.scope_order.retain(|s| *s != scope);
            }
        }
        self.graph.destroy_object(id);
    }

    /// Reparents `child` under `parent` and marks it dirty: its whole
    /// inherited state depends on the new ancestor chain.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) {
        if self.graph.try_add_child(parent, child) {
            self.sync.mark_dirty(
                child,
                ChangeReasons::TRANSFORM
                    .union(ChangeReasons::OPACITY)
                    .union(ChangeReasons::EYEBALL),
            );
        }
    }

    pub fn graph(&self) -> &PresentationGraph {
        &self.graph
    }

    pub fn attached_state(&self, id: ObjectId) -> Option<&AttachedState> {
        self.sync.attached_state(id)
    }

    /// Binds the presentation-scope deck and enters its current slide. The
    /// player lands in `Ready`; playback starts with [`Engine::play`].
    pub fn set_presentation_deck(&mut self, master: MasterSlide) {
        self.animation.drop_scope(TimelineScope::Presentation);
        let player = self
            .players
            .get_mut(&TimelineScope::Presentation)
            .expect("presentation scope always exists");
        player.set_deck(SlideDeck::new(master));
        self.change_slide(TimelineScope::Presentation, 0, false, true);
    }

    // ===== Property access =====

    /// External property edit: writes the value and queues a dirty mark.
    /// The recomputation happens in the next tick's walk.
    pub fn set_property(
        &mut self,
        id: ObjectId,
        property: &str,
        value: Value,
    ) -> Result<(), PropertyError> {
        let obj = self.graph.get_mut(id).ok_or(PropertyError::NoSuchObject(id))?;
        let reasons = property::set(obj, property, &value)?;
        self.sync.mark_dirty(id, reasons);
        Ok(())
    }

    pub fn get_property(&self, id: ObjectId, property: &str) -> Result<Value, PropertyError> {
        let obj = self.graph.get(id).ok_or(PropertyError::NoSuchObject(id))?;
        property::get(obj, property)
    }

    // ===== Events =====

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    pub fn enqueue_custom_event(&mut self, target: ObjectId, name: impl Into<String>) {
        self.events.enqueue(Event::Custom {
            target,
            name: name.into(),
        });
    }

    // ===== Data inputs =====

    pub fn register_data_input(&mut self, input: DataInput) {
        self.data_inputs.insert(input.name.clone(), input);
    }

    /// Looks up every binding of the named input and applies the value as an
    /// immediate property-change batch.
    pub fn set_data_input_value(&mut self, name: &str, value: Value) {
        let Some(input) = self.data_inputs.get(name) else {
            warn!(input = name, "unknown data input; dropping value");
            return;
        };
        let batch = crate::datainput::build_changes(input, &value);
        AnimationManager::apply_changes(&mut self.graph, &mut self.sync, batch);
    }

    // ===== Driver surface =====

    /// Advances the whole presentation by one frame.
    pub fn tick(&mut self, dt_ms: f32) {
        self.events.flush();

        let scopes = self.scope_order.clone();
        for scope in scopes {
            self.advance_scope(scope, dt_ms);
        }

        let pending = mem::take(&mut self.pending_changes);
        AnimationManager::apply_changes(&mut self.graph, &mut self.sync, pending);

        self.sync.sync(&mut self.graph, self.backend.as_mut());

        self.commit_visibility();
    }

    pub fn play(&mut self, scope: TimelineScope) {
        let Some(player) = self.players.get_mut(&scope) else {
            warn!(?scope, "play on unknown scope");
            return;
        };
        match player.state {
            PlayerState::Idle => warn!(?scope, "play without a bound deck"),
            _ => player.state = PlayerState::Playing,
        }
    }

    pub fn pause(&mut self, scope: TimelineScope) {
        if let Some(player) = self.players.get_mut(&scope) {
            if player.state == PlayerState::Playing {
                player.state = PlayerState::Paused;
            }
        }
    }

    /// Stops playback, forces the position to 0, and replays the
    /// rollback/entry protocol so the scope is in a clean slide-start state.
    pub fn stop(&mut self, scope: TimelineScope) {
        let Some(player) = self.players.get_mut(&scope) else {
            return;
        };
        let Some(current) = player.deck().map(|d| d.current_index()) else {
            warn!(?scope, "stop without a bound deck");
            return;
        };
        self.change_slide(scope, current, false, true);
        if let Some(player) = self.players.get_mut(&scope) {
            player.state = PlayerState::Stopped;
        }
    }

    /// Forces `Stopped`, re-enters the current slide, and (viewer mode)
    /// resumes with the slide's initial play state.
    pub fn reload(&mut self, scope: TimelineScope) {
        let Some(player) = self.players.get_mut(&scope) else {
            return;
        };
        let Some(current) = player.deck().map(|d| d.current_index()) else {
            warn!(?scope, "reload without a bound deck");
            return;
        };
        if let Some(player) = self.players.get_mut(&scope) {
            player.state = PlayerState::Stopped;
        }
        self.change_slide(scope, current, true, true);
    }

    pub fn seek(&mut self, scope: TimelineScope, position_ms: f32) {
        if let Some(player) = self.players.get_mut(&scope) {
            player.seek(position_ms);
        }
    }

    pub fn set_rate(&mut self, scope: TimelineScope, rate: f32) {
        if let Some(player) = self.players.get_mut(&scope) {
            player.set_rate(rate);
        }
    }

    pub fn player_state(&self, scope: TimelineScope) -> Option<PlayerState> {
        self.players.get(&scope).map(|p| p.state)
    }

    pub fn position(&self, scope: TimelineScope) -> Option<f32> {
        self.players.get(&scope).map(|p| p.position)
    }

    pub fn current_slide_index(&self, scope: TimelineScope) -> Option<usize> {
        self.players
            .get(&scope)
            .and_then(|p| p.deck())
            .map(|d| d.current_index())
    }

    // ===== Navigation =====

    pub fn next_slide(&mut self, scope: TimelineScope) {
        self.navigate(scope, |deck| deck.next());
    }

    pub fn previous_slide(&mut self, scope: TimelineScope) {
        self.navigate(scope, |deck| deck.previous_slide());
    }

    /// Returns to the slide in the deck's single-entry history.
    pub fn preceding_slide(&mut self, scope: TimelineScope) {
        self.navigate(scope, |deck| deck.preceding_slide());
    }

    pub fn change_slide_by_index(&mut self, scope: TimelineScope, index: usize) {
        self.navigate(scope, move |deck| deck.go_to_index(index));
    }

    pub fn change_slide_by_name(&mut self, scope: TimelineScope, name: &str) {
        let name = name.to_string();
        self.navigate(scope, move |deck| deck.go_to_name(&name));
    }

    fn navigate(
        &mut self,
        scope: TimelineScope,
        nav: impl FnOnce(&mut SlideDeck) -> Result<usize, crate::error::NavigationError>,
    ) {
        let Some(player) = self.players.get_mut(&scope) else {
            warn!(?scope, "navigation on unknown scope");
            return;
        };
        let Some(deck) = player.deck_mut() else {
            warn!(?scope, "navigation without a bound deck");
            return;
        };
        match nav(deck) {
            Ok(index) => self.change_slide(scope, index, true, false),
            Err(err) => warn!(?scope, %err, "navigation request dropped"),
        }
    }

    // ===== Internals =====

    fn advance_scope(&mut self, scope: TimelineScope, dt_ms: f32) {
        let editor = self.editor_mode();
        let Some(player) = self.players.get_mut(&scope) else {
            return;
        };
        if !player.has_deck() {
            return;
        }

        let was_playing = player.state == PlayerState::Playing;
        let outcome = player.advance(dt_ms, editor);
        if let AdvanceOutcome::PlayThrough(target) = outcome {
            self.play_through(scope, target);
        }

        let Some(player) = self.players.get_mut(&scope) else {
            return;
        };
        let evaluate = was_playing || player.state == PlayerState::Playing || player.force_channel_eval;
        let position = player.position;
        player.force_channel_eval = false;
        if evaluate {
            self.animation
                .evaluate(scope, position, &mut self.pending_changes);
        }

        let scope_visible = self.is_scope_reachable(scope);
        let mut updates = Vec::new();
        if let Some(player) = self.players.get_mut(&scope) {
            player.evaluate_visibility(&self.graph, scope_visible, &mut updates);
        }
        for (id, show) in updates {
            self.pending_visibility.insert(id, show);
        }
    }

    fn play_through(&mut self, scope: TimelineScope, target: PlayThroughTarget) {
        let Some(deck) = self.players.get_mut(&scope).and_then(|p| p.deck_mut()) else {
            return;
        };
        let result = match target {
            PlayThroughTarget::Next => deck.next(),
            PlayThroughTarget::Previous => deck.previous_slide(),
            PlayThroughTarget::Index(index) => deck.go_to_index(index),
        };
        match result {
            Ok(index) => self.change_slide(scope, index, true, true),
            Err(err) => {
                warn!(?scope, %err, "play-through target unavailable; stopping");
                if let Some(player) = self.players.get_mut(&scope) {
                    player.state = PlayerState::Stopped;
                }
            }
        }
    }

    /// The slide-change protocol.
    ///
    /// Rollback of the leaving slide is applied immediately (code later in
    /// the same tick may read the restored values), then the entering
    /// slide's static overrides, then channel binding — in that order.
    fn change_slide(
        &mut self,
        scope: TimelineScope,
        new_index: usize,
        apply_initial_state: bool,
        force: bool,
    ) {
        let Some(player) = self.players.get(&scope) else {
            return;
        };
        let Some(deck) = player.deck() else {
            warn!(?scope, "slide change without a bound deck");
            return;
        };
        if deck.is_empty() {
            warn!(?scope, "slide change on an empty deck");
            return;
        }
        if deck.slide(new_index).is_none() {
            warn!(?scope, new_index, "slide change to unknown index dropped");
            return;
        }

        let old_entered = player.entered_slide;
        if !force && old_entered == Some(new_index) {
            return;
        }

        // Members of the leaving slide are queued hidden now; the entering
        // slide's members are re-queued by the forced boundary evaluation,
        // overwriting these entries for objects present in both.
        if let Some(old_index) = old_entered {
            let mut leaving = deck.master.objects.clone();
            if let Some(slide) = deck.slide(old_index) {
                leaving.extend(slide.objects.iter().copied());
            }
            for id in leaving {
                self.pending_visibility.insert(id, false);
            }
        }

        // 1. Leave the previous slide: stop its animators and roll every
        // animated property back to its pre-entry value in one batch.
        if old_entered.is_some() {
            let rollback = self.animation.clear_animations(scope);
            AnimationManager::apply_changes(&mut self.graph, &mut self.sync, rollback);
        }

        // 2. An unreachable slide is entered logically (time resets) but
        // triggers none of the visible entry work.
        let reachable = self.is_scope_reachable(scope);

        let player = self
            .players
            .get_mut(&scope)
            .expect("player checked above");
        let old_name = old_entered
            .and_then(|i| player.deck().and_then(|d| d.slide(i)))
            .map(|s| s.name.clone());
        player.begin_slide(new_index);
        player.clear_applied_visibility();

        if !reachable {
            debug!(?scope, new_index, "scope unreachable; slide entered logically");
            return;
        }

        // 3. Enter: master overrides first, then the slide's own, in list
        // order — later entries for the same object/property win.
        let deck = player.deck().expect("deck checked above");
        let master = deck.master.clone();
        let slide = &master.slides[new_index];
        let new_name = slide.name.clone();

        let mut overrides: Vec<PropertyChange> = master.property_changes.clone();
        overrides.extend(slide.property_changes.iter().cloned());
        for change in &overrides {
            self.apply_property_change(change);
        }

        let editor = self.editor_mode();
        self.animation
            .bind(scope, &master, new_index, &self.graph, editor);

        let duration = self.compute_duration(&master, new_index);
        let player = self
            .players
            .get_mut(&scope)
            .expect("player checked above");
        player.duration = duration;

        if apply_initial_state {
            player.state = match (self.mode, slide.initial_play_state) {
                (EngineMode::Editor, _) => PlayerState::Stopped,
                (EngineMode::Viewer, PlayState::Play) => PlayerState::Playing,
                (EngineMode::Viewer, PlayState::Pause) => PlayerState::Paused,
            };
        }

        if let Some(old_index) = old_entered {
            if let Some(name) = old_name {
                self.events.enqueue(Event::SlideExited {
                    scope,
                    index: old_index,
                    name,
                });
            }
        }
        self.events.enqueue(Event::SlideEntered {
            scope,
            index: new_index,
            name: new_name,
        });
        debug!(?scope, new_index, duration, "slide entered");

        // 4. Recurse into every component that is a member of the entered
        // slide, creating its player and deck lazily on first use.
        let mut members = master.objects.clone();
        members.extend(slide.objects.iter().copied());
        for member in members {
            if self.graph.get(member).map(|o| o.category()) == Some(ObjectCategory::Component) {
                self.enter_component(member);
            }
        }
    }

    /// Creates the component's player/deck on first use and (re)enters its
    /// current slide, per step 4 of the slide-change protocol.
    fn enter_component(&mut self, component: ObjectId) {
        let scope = TimelineScope::Component(component);

        if !self.players.contains_key(&scope) {
            let Some(ObjectData::Component { master }) = self.graph.get(component).map(|o| &o.data)
            else {
                return;
            };
            let master = (**master).clone();
            if master.slides.is_empty() {
                warn!(component, "component has an empty deck; scope not created");
                return;
            }
            let mut player = SlidePlayer::new();
            player.set_deck(SlideDeck::new(master));
            self.players.insert(scope, player);
            self.scope_order.push(scope);
            debug!(component, "component scope created");
        }

        let Some(current) = self
            .players
            .get(&scope)
            .and_then(|p| p.deck())
            .map(|d| d.current_index())
        else {
            return;
        };
        self.change_slide(scope, current, true, true);
    }

    /// Component-scoping rule: a scope is reachable when every enclosing
    /// component is a member of the current-or-master slide of its own
    /// scope, recursively up to the presentation.
    fn is_scope_reachable(&self, scope: TimelineScope) -> bool {
        match scope {
            TimelineScope::Presentation => true,
            TimelineScope::Component(component) => {
                let owner = self
                    .graph
                    .enclosing_component(component)
                    .map(TimelineScope::Component)
                    .unwrap_or(TimelineScope::Presentation);
                let member = self
                    .players
                    .get(&owner)
                    .and_then(|p| p.deck())
                    .map(|d| d.is_member(component))
                    .unwrap_or(false);
                member && self.is_scope_reachable(owner)
            }
        }
    }

    /// Slide duration: the maximum end time across the slide's own members,
    /// plus master-inherited objects whose end time this slide overrides.
    /// Layer end times take precedence over other node end times.
    fn compute_duration(&self, master: &MasterSlide, slide_index: usize) -> f32 {
        let Some(slide) = master.slides.get(slide_index) else {
            return 0.0;
        };

        let mut layer_max: Option<f32> = None;
        let mut other_max: Option<f32> = None;
        let mut consider = |graph: &PresentationGraph, id: ObjectId| {
            let Some(obj) = graph.get(id) else {
                return;
            };
            let slot = if obj.category() == ObjectCategory::Layer {
                &mut layer_max
            } else {
                &mut other_max
            };
            *slot = Some(slot.map_or(obj.end_time, |m: f32| m.max(obj.end_time)));
        };

        for &id in &slide.objects {
            consider(&self.graph, id);
        }
        for &id in &master.objects {
            let overridden = slide.property_changes.iter().any(|pc| {
                pc.object == id
                    && property::split_path(&pc.property)
                        .map(|(base, _)| base == "end_time")
                        .unwrap_or(false)
            });
            if overridden {
                consider(&self.graph, id);
            }
        }

        let derived = layer_max.or(other_max).unwrap_or(0.0);
        derived.max(slide.end_time)
    }

    fn apply_property_change(&mut self, change: &PropertyChange) {
        let Some(obj) = self.graph.get_mut(change.object) else {
            warn!(object = change.object, "property change targets a missing object");
            return;
        };
        match property::set(obj, &change.property, &change.value) {
            Ok(reasons) => self.sync.mark_dirty(change.object, reasons),
            Err(err) => warn!(object = change.object, %err, "property change dropped"),
        }
    }

    /// Commits the tick's queued visibility changes. They are resolved by
    /// the next walk, and boundary ticks force-mark even unchanged values so
    /// the first synced frame after a transition sees a full snapshot.
    fn commit_visibility(&mut self) {
        let pending = mem::take(&mut self.pending_visibility);
        for (id, show) in pending {
            let Some(obj) = self.graph.get_mut(id) else {
                continue;
            };
            obj.slide_visible = show;
            self.sync.mark_dirty(id, ChangeReasons::TIMELINE);
        }
    }
}
