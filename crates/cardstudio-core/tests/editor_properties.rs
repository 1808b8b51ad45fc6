//! Integration tests: drag sessions, history and reordering driven through
//! the public `Editor` API.

use cardstudio_core::transform::HandleKind;
use cardstudio_core::{Compass, Editor, EditorConfig, ManualClock, NodeId, NodeTransform};
use kurbo::{Point, Rect, Vec2};

const DECK: &str = include_str!("fixtures/two_slides.html");

fn editor_at(zoom: f64) -> (Editor, ManualClock) {
    let clock = ManualClock::new();
    let mut editor = Editor::new(EditorConfig::default()).with_clock(clock.clone());
    editor.load_markup(DECK).unwrap();
    editor.set_zoom(zoom);
    (editor, clock)
}

fn title(editor: &Editor) -> NodeId {
    editor.surface().element_at_path(0, &[0]).unwrap()
}

fn record(editor: &Editor, id: NodeId) -> NodeTransform {
    editor.surface().transform(id).cloned().unwrap_or_default()
}

fn selected_box(editor: &Editor) -> Rect {
    editor.selection().viewport_box.unwrap()
}

/// Drag a handle from `from` by a viewport delta and release.
fn drag(editor: &mut Editor, handle: HandleKind, from: Point, delta: Vec2) {
    assert!(editor.begin_handle_drag(handle, from));
    editor.pointer_move(from + delta * 0.5);
    editor.pointer_move(from + delta);
    editor.pointer_up(from + delta);
}

/// Let the debounce window pass and run timers.
fn settle(editor: &mut Editor, clock: &ManualClock) {
    clock.advance_ms(600);
    editor.tick();
}

// ─── Drag sessions ──────────────────────────────────────────────────────

#[test]
fn se_resize_at_half_zoom() {
    let (mut editor, _) = editor_at(0.5);
    let id = title(&editor);
    editor.select(Some(id));
    let before = selected_box(&editor);
    assert_eq!(before, Rect::new(50.0, 50.0, 250.0, 100.0));

    drag(
        &mut editor,
        HandleKind::Resize(Compass::SE),
        Point::new(before.x1, before.y1),
        Vec2::new(100.0, 50.0),
    );

    let after = selected_box(&editor);
    assert_eq!(after.origin(), before.origin());
    assert_eq!(after.width() - before.width(), 100.0);
    assert_eq!(after.height() - before.height(), 50.0);

    let record = record(&editor, id);
    assert_eq!(record.width, Some(600.0));
    assert_eq!(record.height, Some(200.0));
    assert_eq!(record.translation(), Vec2::ZERO);
}

#[test]
fn zero_delta_release_is_bit_identical() {
    let handles = [
        HandleKind::Move,
        HandleKind::Rotate,
        HandleKind::Resize(Compass::N),
        HandleKind::Resize(Compass::NW),
        HandleKind::Resize(Compass::SE),
        HandleKind::Resize(Compass::W),
    ];
    for handle in handles {
        let (mut editor, _) = editor_at(0.55);
        let id = title(&editor);
        editor.select(Some(id));
        editor.set_translate(12.3, -4.7);
        editor.set_rotation(17.5);
        let before = record(&editor, id);
        let content = editor.content();

        let start = Point::new(123.0, 77.0);
        assert!(editor.begin_handle_drag(handle, start));
        editor.pointer_up(start);

        let after = record(&editor, id);
        assert_eq!(after.translate_x.to_bits(), before.translate_x.to_bits());
        assert_eq!(after.translate_y.to_bits(), before.translate_y.to_bits());
        assert_eq!(after.rotation_degrees.to_bits(), before.rotation_degrees.to_bits());
        assert_eq!(after.width, before.width);
        assert_eq!(after.height, before.height);
        assert_eq!(editor.content(), content);
    }
}

#[test]
fn drag_out_and_back_restores_node() {
    let handles = Compass::ALL
        .into_iter()
        .map(HandleKind::Resize)
        .chain([HandleKind::Move, HandleKind::Rotate]);
    for handle in handles {
        for resized in [false, true] {
            let (mut editor, _) = editor_at(0.5);
            let id = title(&editor);
            editor.select(Some(id));
            if resized {
                editor.set_size(Some(300.0), None);
            }
            let before = record(&editor, id);
            let content = editor.content();
            let start = selected_box(&editor).center();

            assert!(editor.begin_handle_drag(handle, start));
            editor.pointer_move(start + Vec2::new(100.0, 50.0));
            assert_ne!(record(&editor, id), before, "{handle:?}");
            editor.pointer_up(start);

            assert_eq!(record(&editor, id), before, "{handle:?}");
            assert_eq!(editor.content(), content, "{handle:?}");
        }
    }
}

#[test]
fn nw_resize_keeps_se_corner_anchored() {
    let (mut editor, _) = editor_at(0.5);
    editor.select(Some(title(&editor)));
    let before = selected_box(&editor);

    // Content delta (40, 20) is a viewport delta of (20, 10) at zoom 0.5.
    drag(
        &mut editor,
        HandleKind::Resize(Compass::NW),
        before.origin(),
        Vec2::new(20.0, 10.0),
    );

    let after = selected_box(&editor);
    assert_eq!(Point::new(after.x1, after.y1), Point::new(before.x1, before.y1));
    assert_eq!(after.origin(), before.origin() + Vec2::new(20.0, 10.0));
}

#[test]
fn resize_floor_holds_at_any_zoom() {
    let (mut editor, _) = editor_at(0.35);
    let id = title(&editor);
    editor.select(Some(id));
    let before = selected_box(&editor);
    drag(
        &mut editor,
        HandleKind::Resize(Compass::NE),
        Point::new(before.x1, before.y0),
        Vec2::new(-5000.0, 5000.0),
    );
    let record = record(&editor, id);
    assert!((record.width.unwrap() - 20.0).abs() < 1e-9);
    assert!((record.height.unwrap() - 20.0).abs() < 1e-9);
    let after = selected_box(&editor);
    assert!((after.y1 - before.y1).abs() < 1e-9);
    assert!((after.x0 - before.x0).abs() < 1e-9);
}

#[test]
fn rotate_and_move_commute_on_translate() {
    let rotate = |editor: &mut Editor| {
        let b = selected_box(editor);
        drag(editor, HandleKind::Rotate, Point::new(b.center().x, b.y0 - 30.0), Vec2::new(80.0, 30.0));
    };
    let translate = |editor: &mut Editor| {
        let b = selected_box(editor);
        drag(editor, HandleKind::Move, b.center(), Vec2::new(33.0, -21.0));
    };

    let (mut first, _) = editor_at(0.55);
    let a = title(&first);
    first.select(Some(a));
    rotate(&mut first);
    translate(&mut first);

    let (mut second, _) = editor_at(0.55);
    let b = title(&second);
    second.select(Some(b));
    translate(&mut second);
    rotate(&mut second);

    let ra = record(&first, a);
    let rb = record(&second, b);
    assert_eq!(ra.translation(), rb.translation());
    assert_ne!(ra.rotation_degrees, 0.0);
}

#[test]
fn drag_survives_pointer_leaving_the_box() {
    let (mut editor, _) = editor_at(0.5);
    let id = title(&editor);
    editor.select(Some(id));
    let b = selected_box(&editor);
    drag(&mut editor, HandleKind::Move, b.center(), Vec2::new(900.0, 700.0));
    assert_eq!(record(&editor, id).translation(), Vec2::new(1800.0, 1400.0));
}

// ─── History ────────────────────────────────────────────────────────────

#[test]
fn ten_moves_make_one_undo_entry() {
    let (mut editor, clock) = editor_at(0.5);
    editor.select(Some(title(&editor)));
    let start = selected_box(&editor).center();
    assert!(editor.begin_handle_drag(HandleKind::Move, start));
    for step in 1..=10 {
        clock.advance_ms(16);
        editor.pointer_move(start + Vec2::new(step as f64, step as f64));
        editor.tick();
    }
    editor.pointer_up(start + Vec2::new(10.0, 10.0));
    assert_eq!(editor.history().undo_len(), 1);

    settle(&mut editor, &clock);
    assert_eq!(editor.history().undo_len(), 1);
}

#[test]
fn forty_edits_keep_thirty_most_recent() {
    let (mut editor, clock) = editor_at(0.5);
    editor.select(Some(title(&editor)));
    for _ in 0..40 {
        editor.nudge(1.0, 0.0);
        settle(&mut editor, &clock);
    }
    assert_eq!(editor.history().undo_len(), 30);

    for _ in 0..30 {
        assert!(editor.undo());
    }
    assert!(!editor.undo());
    // Oldest surviving state is the one after the tenth nudge.
    let id = title(&editor);
    assert_eq!(record(&editor, id).translate_x, 10.0);
}

#[test]
fn undo_then_redo_restores_exact_content() {
    let (mut editor, clock) = editor_at(0.5);
    let start = editor.content();
    editor.select(Some(title(&editor)));

    editor.nudge(3.0, 4.0);
    settle(&mut editor, &clock);
    editor.set_rotation(-12.5);
    settle(&mut editor, &clock);
    editor.set_size(Some(250.0), None);
    settle(&mut editor, &clock);
    editor.set_style("color", "#ff3366");
    settle(&mut editor, &clock);
    editor.move_block(1, 0);
    settle(&mut editor, &clock);
    let end = editor.content();
    assert_eq!(editor.history().undo_len(), 5);

    for _ in 0..5 {
        assert!(editor.undo());
    }
    assert_eq!(editor.content(), start);
    for _ in 0..5 {
        assert!(editor.redo());
    }
    assert_eq!(editor.content(), end);
}

#[test]
fn undo_restores_transform_records() {
    let (mut editor, clock) = editor_at(0.5);
    editor.select(Some(title(&editor)));
    editor.set_translate(40.0, 8.0);
    settle(&mut editor, &clock);
    editor.set_rotation(15.0);
    settle(&mut editor, &clock);

    assert!(editor.undo());
    let id = title(&editor);
    let record = record(&editor, id);
    assert_eq!(record.translation(), Vec2::new(40.0, 8.0));
    assert_eq!(record.rotation_degrees, 0.0);
}

#[test]
fn delete_during_pending_snapshot_then_undo() {
    let (mut editor, _) = editor_at(0.5);
    let id = title(&editor);
    editor.select(Some(id));
    editor.nudge(5.0, 0.0);
    assert!(editor.delete_selected());
    assert!(editor.history().is_pending());

    assert!(editor.undo());
    assert_eq!(editor.selected(), None);
    assert!(editor.drag().is_none());

    // The old id belongs to a surface that no longer exists.
    editor.select(Some(id));
    assert_eq!(editor.selected(), None);
    assert!(!editor.begin_handle_drag(HandleKind::Move, Point::ZERO));
    assert!(!editor.nudge(1.0, 1.0));

    let restored = title(&editor);
    assert_eq!(editor.surface().text_content(restored), "Morning Brief");
}

#[test]
fn load_clears_selection_and_history() {
    let (mut editor, clock) = editor_at(0.5);
    editor.select(Some(title(&editor)));
    editor.nudge(1.0, 1.0);
    settle(&mut editor, &clock);
    assert!(editor.can_undo());

    editor.load_markup(DECK).unwrap();
    assert_eq!(editor.selected(), None);
    assert!(!editor.can_undo());
    assert!(!editor.can_redo());
}

// ─── Structural blocks ──────────────────────────────────────────────────

#[test]
fn reorder_refreshes_blocks_and_selection_box() {
    let (mut editor, clock) = editor_at(0.5);
    let titles = |editor: &Editor| -> Vec<String> {
        editor.blocks().iter().map(|b| b.display_title.clone()).collect()
    };
    assert_eq!(titles(&editor), vec!["Morning Brief", "What to watch"]);

    let id = title(&editor);
    editor.select(Some(id));
    let before = selected_box(&editor);

    assert!(editor.move_block(0, 1));
    assert_eq!(titles(&editor), vec!["What to watch", "Morning Brief"]);
    // The selected title moved with its block, one block height down.
    let after = selected_box(&editor);
    assert_eq!(after, before + Vec2::new(0.0, 1350.0 * 0.5));
    assert_eq!(editor.selected(), Some(id));

    settle(&mut editor, &clock);
    assert!(editor.undo());
    assert_eq!(titles(&editor), vec!["Morning Brief", "What to watch"]);
}
