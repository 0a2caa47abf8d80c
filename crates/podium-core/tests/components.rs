use std::cell::RefCell;
use std::rc::Rc;

use podium_core::{
    Engine, EngineMode, GraphObject, ObjectData, PlayerState, RecordingBackend, TimelineScope,
};
use podium_data::{MasterSlide, ObjectId, PlayState, Slide};

const TOP: TimelineScope = TimelineScope::Presentation;

fn engine() -> Engine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = Rc::new(RefCell::new(RecordingBackend::new()));
    Engine::new(Box::new(backend), EngineMode::Viewer)
}

fn settle(engine: &mut Engine) {
    engine.tick(0.0);
    engine.tick(0.0);
}

fn group(engine: &mut Engine, name: &str) -> ObjectId {
    engine.add_object(
        GraphObject::new(name, ObjectData::Group).with_time_window(0.0, 1000.0),
        None,
    )
}

/// Builds a component whose deck is `[shown(members), hidden()]` and makes
/// the members graph children of the component.
fn component(engine: &mut Engine, name: &str, members: Vec<ObjectId>) -> ObjectId {
    let master = MasterSlide::new(
        format!("{name}_master"),
        vec![
            Slide::new("shown").with_objects(members.clone()),
            Slide::new("hidden"),
        ],
    );
    let comp = engine.add_object(
        GraphObject::new(name, ObjectData::component(master)).with_time_window(0.0, 1000.0),
        None,
    );
    for member in members {
        engine.add_child(comp, member);
    }
    comp
}

fn effectively_visible(engine: &Engine, id: ObjectId) -> bool {
    engine
        .attached_state(id)
        .map(|a| a.global_effective_visible)
        .unwrap_or(false)
}

#[test]
fn component_scope_is_created_lazily_on_first_reachable_entry() {
    let mut engine = engine();

    let inner = group(&mut engine, "inner");
    let comp = component(&mut engine, "comp", vec![inner]);

    // Component not yet reachable from any slide: no scope exists.
    assert_eq!(engine.player_state(TimelineScope::Component(comp)), None);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![
            Slide::new("with_comp").with_objects(vec![comp]),
            Slide::new("without_comp"),
        ],
    ));

    assert!(engine.player_state(TimelineScope::Component(comp)).is_some());
}

#[test]
fn component_members_follow_the_component_deck() {
    let mut engine = engine();

    let inner = group(&mut engine, "inner");
    let comp = component(&mut engine, "comp", vec![inner]);
    let scope = TimelineScope::Component(comp);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![
            Slide::new("with_comp").with_objects(vec![comp]),
            Slide::new("without_comp"),
        ],
    ));
    settle(&mut engine);
    assert!(effectively_visible(&engine, inner));

    // Navigate the component's own deck away from the member slide.
    engine.change_slide_by_index(scope, 1);
    settle(&mut engine);
    assert!(!effectively_visible(&engine, inner));

    engine.change_slide_by_index(scope, 0);
    settle(&mut engine);
    assert!(effectively_visible(&engine, inner));
}

#[test]
fn leaving_the_outer_slide_hides_the_component_scope() {
    let mut engine = engine();

    let inner = group(&mut engine, "inner");
    let comp = component(&mut engine, "comp", vec![inner]);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![
            Slide::new("with_comp").with_objects(vec![comp]),
            Slide::new("without_comp"),
        ],
    ));
    settle(&mut engine);
    assert!(effectively_visible(&engine, inner));

    engine.change_slide_by_index(TOP, 1);
    settle(&mut engine);
    assert!(!effectively_visible(&engine, inner));
    assert!(!effectively_visible(&engine, comp));

    // Returning makes the component's current slide visible again.
    engine.change_slide_by_index(TOP, 0);
    settle(&mut engine);
    assert!(effectively_visible(&engine, inner));
}

/// The nested-scoping property: an object under components C1 (outer) and
/// C2 (inner) is effectively visible only when every link of the chain is a
/// member of its scope's current-or-master slide.
#[test]
fn nested_components_require_the_whole_membership_chain() {
    let mut engine = engine();

    let obj = group(&mut engine, "obj");
    let c2 = component(&mut engine, "c2", vec![obj]);
    let c1 = component(&mut engine, "c1", vec![c2]);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![
            Slide::new("with_c1").with_objects(vec![c1]),
            Slide::new("without_c1"),
        ],
    ));
    settle(&mut engine);
    assert!(effectively_visible(&engine, obj));

    // Break the innermost link.
    engine.change_slide_by_index(TimelineScope::Component(c2), 1);
    settle(&mut engine);
    assert!(!effectively_visible(&engine, obj));
    engine.change_slide_by_index(TimelineScope::Component(c2), 0);
    settle(&mut engine);
    assert!(effectively_visible(&engine, obj));

    // Break the middle link: C2 leaves C1's current slide.
    engine.change_slide_by_index(TimelineScope::Component(c1), 1);
    settle(&mut engine);
    assert!(!effectively_visible(&engine, obj));
    engine.change_slide_by_index(TimelineScope::Component(c1), 0);
    settle(&mut engine);
    assert!(effectively_visible(&engine, obj));

    // Break the outermost link.
    engine.change_slide_by_index(TOP, 1);
    settle(&mut engine);
    assert!(!effectively_visible(&engine, obj));
}

#[test]
fn component_slides_honor_their_initial_play_state() {
    let mut engine = engine();

    let inner = group(&mut engine, "inner");
    let master = MasterSlide::new(
        "comp_master",
        vec![Slide::new("paused")
            .with_objects(vec![inner])
            .with_initial_play_state(PlayState::Pause)],
    );
    let comp = engine.add_object(
        GraphObject::new("comp", ObjectData::component(master)).with_time_window(0.0, 1000.0),
        None,
    );
    engine.add_child(comp, inner);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![Slide::new("s").with_objects(vec![comp])],
    ));

    assert_eq!(
        engine.player_state(TimelineScope::Component(comp)),
        Some(PlayerState::Paused)
    );
}

#[test]
fn component_teardown_destroys_its_scope() {
    let mut engine = engine();

    let inner = group(&mut engine, "inner");
    let comp = component(&mut engine, "comp", vec![inner]);

    engine.set_presentation_deck(MasterSlide::new(
        "top",
        vec![Slide::new("s").with_objects(vec![comp])],
    ));
    assert!(engine.player_state(TimelineScope::Component(comp)).is_some());

    engine.remove_object(comp);
    assert_eq!(engine.player_state(TimelineScope::Component(comp)), None);
    assert!(engine.graph().get(inner).is_none(), "subtree destroyed");
    assert!(engine.attached_state(inner).is_none());
}
