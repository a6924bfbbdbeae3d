//! End-to-end pointer and keyboard workflows driven through `Editor`.

use stackcut_core::*;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Events {
    video: Vec<Vec<VideoClip>>,
    audio: Vec<Vec<AudioClip>>,
    seeks: Vec<f64>,
    selections: Vec<Vec<Uuid>>,
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Events>>);

impl EditorObserver for Recorder {
    fn on_update_video_clips(&mut self, clips: &[VideoClip]) {
        self.0.borrow_mut().video.push(clips.to_vec());
    }

    fn on_update_audio_clips(&mut self, clips: &[AudioClip]) {
        self.0.borrow_mut().audio.push(clips.to_vec());
    }

    fn on_seek(&mut self, time: f64) {
        self.0.borrow_mut().seeks.push(time);
    }

    fn on_selection_changed(&mut self, ids: &[Uuid]) {
        self.0.borrow_mut().selections.push(ids.to_vec());
    }
}

// Default layout at 50 px/s: video layer 0 covers y 300..360, layer 1
// covers 240..300, audio layer 0 covers 380..440.
const BASE_Y: f64 = 330.0;

struct Fixture {
    editor: Editor,
    events: Recorder,
    a: Uuid,
    b: Uuid,
}

/// A: 0..4s on layer 0 (x 0..200) with 10s of source.
/// B: 10..12s on layer 0 (x 500..600).
fn fixture() -> Fixture {
    let mut config = EngineConfig::default();
    config.modes.snap = false;
    let events = Recorder::default();
    let mut editor = Editor::new(config)
        .unwrap()
        .with_observer(events.clone())
        .with_history(History::new(50));

    let a = VideoClip::new(ClipSpan::new(0.0, 0.0, 4.0, 10.0, 0));
    let b = VideoClip::new(ClipSpan::new(10.0, 0.0, 2.0, 2.0, 0));
    let (a_id, b_id) = (a.id, b.id);
    editor.load(vec![a, b], vec![]).unwrap();
    *events.0.borrow_mut() = Events::default();

    Fixture {
        editor,
        events,
        a: a_id,
        b: b_id,
    }
}

fn span(editor: &Editor, id: Uuid) -> ClipSpan {
    editor.store().span(id).cloned().unwrap()
}

// ---------------------------------------------------------------------------
// Click vs drag
// ---------------------------------------------------------------------------

#[test]
fn short_travel_on_clip_is_a_click() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(103.0, BASE_Y));
    f.editor.pointer_up(Point::new(103.0, BASE_Y));

    assert_eq!(f.editor.selection(), &[f.a]);
    assert_eq!(span(&f.editor, f.a).start_time, 0.0);
    let events = f.events.0.borrow();
    assert!(events.video.is_empty());
    assert_eq!(events.selections, vec![vec![f.a]]);
}

#[test]
fn modifier_click_toggles_without_dragging() {
    let mut f = fixture();
    f.editor.select([f.a]);
    f.editor.pointer_down(Point::new(550.0, BASE_Y), true);
    assert!(f.editor.gesture_state().is_idle());
    assert_eq!(f.editor.selection(), &[f.a, f.b]);

    f.editor.pointer_down(Point::new(100.0, BASE_Y), true);
    assert_eq!(f.editor.selection(), &[f.b]);
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

#[test]
fn move_commits_release_position() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(150.0, BASE_Y));
    match f.editor.preview() {
        Some(Preview::Move { start_time, .. }) => assert!((start_time - 1.0).abs() < 1e-9),
        other => panic!("expected a move preview, got {other:?}"),
    }
    // Store is untouched until release.
    assert_eq!(span(&f.editor, f.a).start_time, 0.0);

    // Released further right than the last move event.
    f.editor.pointer_up(Point::new(250.0, BASE_Y));
    let moved = span(&f.editor, f.a);
    assert!((moved.start_time - 3.0).abs() < 1e-9);
    assert!((moved.end_time - 7.0).abs() < 1e-9);
    assert!(f.editor.preview().is_none());
    assert!(f.editor.gesture_state().is_idle());
    assert_eq!(f.events.0.borrow().video.len(), 1);
}

#[test]
fn move_onto_neighbour_is_pushed_into_a_gap() {
    let mut f = fixture();
    // Drop A (4s) at 9s: it overlaps B and lands in the free gap before it.
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_up(Point::new(100.0, BASE_Y));
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(300.0, BASE_Y));
    f.editor.pointer_up(Point::new(550.0, BASE_Y));

    let a = span(&f.editor, f.a);
    let b = span(&f.editor, f.b);
    assert!(!a.overlaps(&b));
    assert!(a.end_time <= 10.0 + 1e-9);
    assert_eq!(b.start_time, 10.0);
    assert!(f.editor.store().validate(0.1).is_ok());
}

#[test]
fn vertical_drag_needs_hysteresis_to_change_layer() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);

    // 70px up: past the boundary but within hysteresis.
    f.editor.pointer_move(Point::new(100.0, BASE_Y - 70.0));
    assert!(matches!(f.editor.preview(), Some(Preview::Move { layer: 0, .. })));

    f.editor.pointer_move(Point::new(100.0, BASE_Y - 85.0));
    assert!(matches!(f.editor.preview(), Some(Preview::Move { layer: 1, .. })));

    // Dropping back below the boundary is not enough to return.
    f.editor.pointer_move(Point::new(100.0, BASE_Y - 50.0));
    assert!(matches!(f.editor.preview(), Some(Preview::Move { layer: 1, .. })));

    f.editor.pointer_up(Point::new(100.0, BASE_Y - 85.0));
    let a = span(&f.editor, f.a);
    assert_eq!(a.layer, 1);
    assert_eq!(a.start_time, 0.0);
}

#[test]
fn layer_never_exceeds_one_above_highest() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(100.0, BASE_Y - 400.0));
    assert!(matches!(f.editor.preview(), Some(Preview::Move { layer: 1, .. })));
    f.editor.blur();
}

// ---------------------------------------------------------------------------
// Trim
// ---------------------------------------------------------------------------

#[test]
fn right_handle_drag_trims() {
    let mut f = fixture();
    // Right handle of A sits in x 192..200.
    f.editor.pointer_down(Point::new(196.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(160.0, BASE_Y));
    assert!(matches!(
        f.editor.gesture_state(),
        GestureState::TrimmingRight(_)
    ));
    f.editor.pointer_up(Point::new(146.0, BASE_Y));

    let a = span(&f.editor, f.a);
    assert!((a.end_time - 3.0).abs() < 1e-9);
    assert!((a.source_end - 3.0).abs() < 1e-9);
}

#[test]
fn trim_extension_stops_at_neighbour() {
    let mut f = fixture();
    // Extend A by 10s; B starts at 10s and the source allows 10s total.
    f.editor.pointer_down(Point::new(196.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(400.0, BASE_Y));
    f.editor.pointer_up(Point::new(696.0, BASE_Y));
    let a = span(&f.editor, f.a);
    assert!((a.end_time - 10.0).abs() < 1e-9);
    assert!(f.editor.store().validate(0.1).is_ok());
}

// ---------------------------------------------------------------------------
// Abort
// ---------------------------------------------------------------------------

#[test]
fn blur_abandons_drag() {
    let mut f = fixture();
    let before = f.editor.snapshot();
    f.editor.pointer_down(Point::new(100.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(300.0, BASE_Y - 90.0));
    assert!(f.editor.preview().is_some());

    f.editor.blur();
    assert!(f.editor.gesture_state().is_idle());
    assert!(f.editor.preview().is_none());
    assert_eq!(f.editor.snapshot(), before);

    // A release after the abort does nothing.
    f.editor.pointer_up(Point::new(300.0, BASE_Y));
    assert_eq!(f.editor.snapshot(), before);
    assert!(f.events.0.borrow().video.is_empty());
}

// ---------------------------------------------------------------------------
// Background and marquee
// ---------------------------------------------------------------------------

#[test]
fn background_click_seeks() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(300.0, BASE_Y), false);
    f.editor.pointer_move(Point::new(310.0, BASE_Y));
    f.editor.pointer_up(Point::new(310.0, BASE_Y));
    assert!((f.editor.playhead() - 6.2).abs() < 1e-9);
    assert_eq!(f.events.0.borrow().seeks.len(), 1);
}

#[test]
fn marquee_selects_intersecting_clips() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(300.0, 200.0), false);
    f.editor.pointer_move(Point::new(50.0, 320.0));
    assert!(matches!(f.editor.preview(), Some(Preview::Marquee { .. })));
    assert_eq!(f.editor.selection(), &[f.a]);

    f.editor.pointer_move(Point::new(550.0, 320.0));
    assert_eq!(f.editor.selection(), &[f.b]);

    f.editor.pointer_up(Point::new(550.0, 320.0));
    assert_eq!(f.editor.selection(), &[f.b]);
    assert!(f.editor.preview().is_none());
    assert!(f.events.0.borrow().seeks.is_empty());
}

#[test]
fn additive_marquee_keeps_initial_selection() {
    let mut f = fixture();
    f.editor.select([f.b]);
    f.editor.pointer_down(Point::new(300.0, 200.0), true);
    f.editor.pointer_move(Point::new(50.0, 320.0));
    assert_eq!(f.editor.selection(), &[f.b, f.a]);
}

#[test]
fn blur_during_marquee_restores_selection() {
    let mut f = fixture();
    f.editor.select([f.b]);
    f.editor.pointer_down(Point::new(300.0, 200.0), false);
    f.editor.pointer_move(Point::new(50.0, 320.0));
    assert_eq!(f.editor.selection(), &[f.a]);
    f.editor.blur();
    assert_eq!(f.editor.selection(), &[f.b]);
}

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

#[test]
fn split_then_undo_and_redo() {
    let mut f = fixture();
    let before = f.editor.snapshot();
    f.editor.seek(1.0);
    f.editor.handle_key(KeyInput::plain(Key::Char('e')));
    assert_eq!(f.editor.store().video_clips().len(), 3);
    let after = f.editor.snapshot();

    f.editor.handle_key(KeyInput::with_command(Key::Char('z')));
    assert_eq!(f.editor.snapshot(), before);

    let redo = KeyInput {
        key: Key::Char('z'),
        command: true,
        shift: true,
    };
    f.editor.handle_key(redo);
    assert_eq!(f.editor.snapshot(), after);

    let events = f.events.0.borrow();
    assert_eq!(events.video.len(), 3);
    assert!(events.audio.is_empty());
}

#[test]
fn delete_key_removes_selection() {
    let mut f = fixture();
    f.editor.pointer_down(Point::new(550.0, BASE_Y), false);
    f.editor.pointer_up(Point::new(550.0, BASE_Y));
    f.editor.handle_key(KeyInput::plain(Key::Backspace));

    assert!(f.editor.store().video(f.b).is_none());
    assert!(f.editor.selection().is_empty());
    assert_eq!(f.events.0.borrow().selections.last().unwrap(), &Vec::<Uuid>::new());
}

#[test]
fn magnet_delete_closes_gap() {
    let mut f = fixture();
    f.editor.set_modes(EditModes {
        magnet: true,
        ..f.editor.modes()
    });
    f.editor.select([f.a]);
    f.editor.run(EditorCommand::Delete);
    assert_eq!(span(&f.editor, f.b).start_time, 6.0);
}

#[test]
fn unlink_then_drag_audio_separately() {
    let mut f = fixture();
    f.editor.select([f.a]);
    let outcome = f.editor.run(EditorCommand::Unlink);
    let audio_id = outcome.created[0];
    assert_eq!(f.editor.store().audio(audio_id).unwrap().video_clip_id, Some(f.a));

    // Audio layer 0 band starts at y 380.
    f.editor.pointer_down(Point::new(100.0, 410.0), false);
    f.editor.pointer_move(Point::new(150.0, 410.0));
    f.editor.pointer_up(Point::new(200.0, 410.0));
    let audio = span(&f.editor, audio_id);
    assert!((audio.start_time - 2.0).abs() < 1e-9);
    assert_eq!(span(&f.editor, f.a).start_time, 0.0);
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[test]
fn results_for_deleted_clips_are_dropped() {
    let mut f = fixture();
    let requests = f.editor.extraction_requests();
    assert_eq!(requests.len(), 4);

    f.editor.select([f.b]);
    f.editor.run(EditorCommand::Delete);
    let late = MetadataUpdate::Waveform {
        clip_id: f.b,
        peaks: vec![0.2, 0.4],
    };
    assert!(!f.editor.apply_metadata(late));

    let fresh = MetadataUpdate::Thumbnails {
        clip_id: f.a,
        items: vec!["a-0.jpg".into()],
    };
    assert!(f.editor.apply_metadata(fresh));
    assert_eq!(f.editor.extraction_requests().len(), 1);
}
