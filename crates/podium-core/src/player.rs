//! # Slide Player
//!
//! The timeline state machine for one scope: playback state, signed rate,
//! position integration, end-of-timeline branching, and visibility-window
//! evaluation against the current deck.
//!
//! One player exists per timeline scope — the presentation itself plus one
//! per live component instance. The slide-change protocol (rollback, static
//! overrides, channel binding, component recursion) needs the whole engine
//! context and lives in `engine`; everything the player can decide from its
//! own state is here.

use std::collections::HashMap;

use podium_data::{ObjectId, PlayMode, PlayThroughTarget};
use tracing::debug;

use crate::graph::PresentationGraph;
use crate::slides::SlideDeck;

/// Playback state of one timeline scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No deck bound.
    Idle,
    /// Deck bound, playback not started.
    Ready,
    Stopped,
    Playing,
    Paused,
}

/// What the engine must do after a timeline advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    None,
    /// End-of-timeline branching asked for another slide.
    PlayThrough(PlayThroughTarget),
}

/// Timeline state machine for one scope.
pub struct SlidePlayer {
    pub state: PlayerState,
    deck: Option<SlideDeck>,
    /// Timeline position in milliseconds, `0 ≤ position ≤ duration`.
    pub position: f32,
    /// Signed playback rate; negative plays backwards.
    pub rate: f32,
    /// Duration of the entered slide, published on slide entry.
    pub duration: f32,
    /// Slide currently entered (bound), if any. Differs from the deck's
    /// current index transiently, during navigation.
    pub entered_slide: Option<usize>,
    /// Set on boundary ticks, seeks, and slide entry so the next visibility
    /// evaluation re-queues every member even when unchanged.
    pub force_visibility_eval: bool,
    /// Set on slide entry and seeks so channels evaluate once while paused.
    pub force_channel_eval: bool,
    /// A `Ping` slide is on its reversed pass.
    ping_returning: bool,
    /// Last visibility value applied per member object.
    applied_visibility: HashMap<ObjectId, bool>,
}

impl Default for SlidePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidePlayer {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            deck: None,
            position: 0.0,
            rate: 1.0,
            duration: 0.0,
            entered_slide: None,
            force_visibility_eval: false,
            force_channel_eval: false,
            ping_returning: false,
            applied_visibility: HashMap::new(),
        }
    }

    /// Binds a deck, passing through `Idle` so any previous playback state
    /// is discarded, then lands in `Ready`.
    pub fn set_deck(&mut self, deck: SlideDeck) {
        self.reset();
        self.deck = Some(deck);
        self.state = PlayerState::Ready;
    }

    /// Back to `Idle`: no deck, position 0, defaults restored.
    pub fn reset(&mut self) {
        self.state = PlayerState::Idle;
        self.deck = None;
        self.position = 0.0;
        self.rate = 1.0;
        self.duration = 0.0;
        self.entered_slide = None;
        self.force_visibility_eval = false;
        self.force_channel_eval = false;
        self.ping_returning = false;
        self.applied_visibility.clear();
    }

    pub fn deck(&self) -> Option<&SlideDeck> {
        self.deck.as_ref()
    }

    pub fn deck_mut(&mut self) -> Option<&mut SlideDeck> {
        self.deck.as_mut()
    }

    pub fn has_deck(&self) -> bool {
        self.deck.is_some()
    }

    /// Marks a fresh slide entry: time cursor to 0, forced evaluation of
    /// both visibility windows and channels on the next advancement.
    pub fn begin_slide(&mut self, index: usize) {
        self.position = 0.0;
        self.entered_slide = Some(index);
        self.ping_returning = false;
        self.force_visibility_eval = true;
        self.force_channel_eval = true;
    }

    pub fn seek(&mut self, position_ms: f32) {
        let clamped = position_ms.clamp(0.0, self.duration.max(0.0));
        self.position = clamped;
        self.force_visibility_eval = true;
        self.force_channel_eval = true;
    }

    /// Integrates the timeline position and resolves end-of-timeline
    /// branching. In editor mode every end stops unconditionally.
    ///
    /// Returns `PlayThrough` when the deck must move to another slide; the
    /// caller performs the navigation and slide entry.
    pub fn advance(&mut self, dt_ms: f32, editor_mode: bool) -> AdvanceOutcome {
        if self.state != PlayerState::Playing {
            return AdvanceOutcome::None;
        }

        let play_mode = self
            .deck
            .as_ref()
            .and_then(|d| d.current_slide())
            .map(|s| s.play_mode)
            .unwrap_or_default();

        self.position += dt_ms * self.rate;

        let at_end = self.rate >= 0.0 && self.position >= self.duration;
        let at_start = self.rate < 0.0 && self.position <= 0.0;

        if at_end {
            self.force_visibility_eval = true;
            if editor_mode {
                self.position = self.duration;
                self.state = PlayerState::Stopped;
                return AdvanceOutcome::None;
            }
            match play_mode {
                PlayMode::Looping => {
                    self.position = 0.0;
                }
                PlayMode::StopAtEnd => {
                    self.position = self.duration;
                    self.state = PlayerState::Stopped;
                }
                PlayMode::PlayThrough(target) => {
                    self.position = self.duration;
                    return AdvanceOutcome::PlayThrough(target);
                }
                PlayMode::Ping => {
                    self.position = self.duration;
                    self.rate = -self.rate;
                    self.ping_returning = true;
                }
                PlayMode::PingPong => {
                    self.position = self.duration;
                    self.rate = -self.rate;
                }
            }
        } else if at_start {
            self.force_visibility_eval = true;
            self.position = 0.0;
            if editor_mode {
                self.state = PlayerState::Stopped;
                return AdvanceOutcome::None;
            }
            match play_mode {
                PlayMode::Ping => {
                    // Second pass done: restore the original rate and stop.
                    self.rate = -self.rate;
                    self.ping_returning = false;
                    self.state = PlayerState::Stopped;
                }
                PlayMode::PingPong => {
                    self.rate = -self.rate;
                }
                PlayMode::Looping => {
                    // Reverse-rate looping wraps around the end.
                    self.position = self.duration;
                }
                _ => {
                    self.state = PlayerState::Stopped;
                }
            }
        }

        AdvanceOutcome::None
    }

    /// Evaluates the visibility window of every member of the current and
    /// master slide.
    ///
    /// `scope_visible` is the recursive component-scoping result for the
    /// whole scope. A change is only queued when it differs from the last
    /// applied value, except on forced (boundary) ticks, which re-queue
    /// everything for a consistent snapshot after transitions.
    pub fn evaluate_visibility(
        &mut self,
        graph: &PresentationGraph,
        scope_visible: bool,
        pending: &mut Vec<(ObjectId, bool)>,
    ) {
        let Some(deck) = self.deck.as_ref() else {
            return;
        };
        let force = self.force_visibility_eval;
        self.force_visibility_eval = false;

        let position = self.position;
        for id in deck.visible_members() {
            let Some(obj) = graph.get(id) else {
                continue;
            };
            let in_window = position >= obj.start_time && position <= obj.end_time;
            let show = scope_visible && in_window && obj.active;

            let last = self.applied_visibility.get(&id).copied();
            if force || last != Some(show) {
                self.applied_visibility.insert(id, show);
                pending.push((id, show));
            }
        }
    }

    /// Drops memory of applied visibility (slide exit): the next evaluation
    /// re-queues everything.
    pub fn clear_applied_visibility(&mut self) {
        self.applied_visibility.clear();
        self.force_visibility_eval = true;
    }

    pub fn set_rate(&mut self, rate: f32) {
        debug!(rate, "playback rate changed");
        self.rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_data::{MasterSlide, PlayState, Slide};

    fn player_with(mode: PlayMode, duration: f32) -> SlidePlayer {
        let mut player = SlidePlayer::new();
        player.set_deck(SlideDeck::new(MasterSlide::new(
            "m",
            vec![Slide::new("s")
                .with_play_mode(mode)
                .with_initial_play_state(PlayState::Play)],
        )));
        player.begin_slide(0);
        player.duration = duration;
        player.state = PlayerState::Playing;
        player
    }

    #[test]
    fn set_deck_passes_through_idle_to_ready() {
        let mut player = SlidePlayer::new();
        assert_eq!(player.state, PlayerState::Idle);

        player.set_deck(SlideDeck::new(MasterSlide::new("m", vec![Slide::new("a")])));
        assert_eq!(player.state, PlayerState::Ready);
        assert_eq!(player.position, 0.0);

        player.state = PlayerState::Playing;
        player.position = 123.0;
        player.set_deck(SlideDeck::new(MasterSlide::new("m", vec![Slide::new("b")])));
        assert_eq!(player.state, PlayerState::Ready);
        assert_eq!(player.position, 0.0);
    }

    #[test]
    fn stop_at_end_stops_and_holds() {
        let mut player = player_with(PlayMode::StopAtEnd, 1000.0);
        assert_eq!(player.advance(1500.0, false), AdvanceOutcome::None);
        assert_eq!(player.state, PlayerState::Stopped);
        assert_eq!(player.position, 1000.0);
    }

    #[test]
    fn looping_restarts_and_keeps_playing() {
        let mut player = player_with(PlayMode::Looping, 1000.0);
        player.advance(1200.0, false);
        assert_eq!(player.state, PlayerState::Playing);
        assert_eq!(player.position, 0.0);
    }

    #[test]
    fn play_through_reports_target() {
        let mut player = player_with(PlayMode::PlayThrough(PlayThroughTarget::Next), 1000.0);
        assert_eq!(
            player.advance(1000.0, false),
            AdvanceOutcome::PlayThrough(PlayThroughTarget::Next)
        );
        assert_eq!(player.state, PlayerState::Playing);
    }

    #[test]
    fn ping_pong_reverses_at_both_ends_forever() {
        let mut player = player_with(PlayMode::PingPong, 1000.0);

        player.advance(1000.0, false);
        assert_eq!(player.rate, -1.0);
        assert_eq!(player.state, PlayerState::Playing);
        assert_eq!(player.position, 1000.0);

        player.advance(1000.0, false);
        assert_eq!(player.rate, 1.0);
        assert_eq!(player.state, PlayerState::Playing);
        assert_eq!(player.position, 0.0);

        player.advance(1000.0, false);
        assert_eq!(player.rate, -1.0);
        assert_eq!(player.state, PlayerState::Playing);
    }

    #[test]
    fn ping_reverses_once_then_stops_with_original_rate() {
        let mut player = player_with(PlayMode::Ping, 1000.0);

        player.advance(1000.0, false);
        assert_eq!(player.rate, -1.0);
        assert_eq!(player.state, PlayerState::Playing);

        player.advance(1000.0, false);
        assert_eq!(player.rate, 1.0, "original rate restored");
        assert_eq!(player.state, PlayerState::Stopped);
        assert_eq!(player.position, 0.0);
    }

    #[test]
    fn editor_mode_stops_unconditionally() {
        let mut player = player_with(PlayMode::Looping, 1000.0);
        player.advance(1200.0, true);
        assert_eq!(player.state, PlayerState::Stopped);
        assert_eq!(player.position, 1000.0);
    }

    #[test]
    fn paused_player_does_not_advance() {
        let mut player = player_with(PlayMode::StopAtEnd, 1000.0);
        player.state = PlayerState::Paused;
        player.advance(500.0, false);
        assert_eq!(player.position, 0.0);
    }

    #[test]
    fn seek_clamps_and_forces_evaluation() {
        let mut player = player_with(PlayMode::StopAtEnd, 1000.0);
        player.force_visibility_eval = false;
        player.force_channel_eval = false;

        player.seek(5000.0);
        assert_eq!(player.position, 1000.0);
        assert!(player.force_visibility_eval);
        assert!(player.force_channel_eval);

        player.seek(-20.0);
        assert_eq!(player.position, 0.0);
    }

    #[test]
    fn visibility_window_respects_time_and_eyeball() {
        use crate::object::{GraphObject, ObjectData};

        let mut graph = PresentationGraph::new();
        let visible = graph.add_object(
            GraphObject::new("in", ObjectData::Group).with_time_window(0.0, 1000.0),
        );
        let late = graph.add_object(
            GraphObject::new("late", ObjectData::Group).with_time_window(500.0, 1000.0),
        );
        let eyeballed_off = {
            let mut o = GraphObject::new("off", ObjectData::Group).with_time_window(0.0, 1000.0);
            o.active = false;
            graph.add_object(o)
        };

        let mut player = SlidePlayer::new();
        player.set_deck(SlideDeck::new(MasterSlide::new(
            "m",
            vec![Slide::new("s").with_objects(vec![visible, late, eyeballed_off])],
        )));
        player.begin_slide(0);
        player.duration = 1000.0;

        let mut pending = Vec::new();
        player.evaluate_visibility(&graph, true, &mut pending);
        pending.sort();
        assert_eq!(
            pending,
            vec![(visible, true), (late, false), (eyeballed_off, false)]
        );

        // Nothing changed: no re-queue without force.
        let mut pending = Vec::new();
        player.evaluate_visibility(&graph, true, &mut pending);
        assert!(pending.is_empty());

        // Moving into the late window queues only the delta.
        player.position = 600.0;
        let mut pending = Vec::new();
        player.evaluate_visibility(&graph, true, &mut pending);
        assert_eq!(pending, vec![(late, true)]);

        // Boundary ticks force a full snapshot.
        player.force_visibility_eval = true;
        let mut pending = Vec::new();
        player.evaluate_visibility(&graph, true, &mut pending);
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn hidden_scope_hides_all_members() {
        use crate::object::{GraphObject, ObjectData};

        let mut graph = PresentationGraph::new();
        let id = graph
            .add_object(GraphObject::new("o", ObjectData::Group).with_time_window(0.0, 1000.0));

        let mut player = SlidePlayer::new();
        player.set_deck(SlideDeck::new(MasterSlide::new(
            "m",
            vec![Slide::new("s").with_objects(vec![id])],
        )));
        player.begin_slide(0);
        player.duration = 1000.0;

        let mut pending = Vec::new();
        player.evaluate_visibility(&graph, false, &mut pending);
        assert_eq!(pending, vec![(id, false)]);
    }
}
