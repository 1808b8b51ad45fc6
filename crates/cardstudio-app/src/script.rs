//! Scripted editing sessions.
//!
//! A script is a JSON array of steps. Steps are applied in order to an
//! editor driven by a manual clock, so debounce timing is reproducible.

use cardstudio_core::input::{Key, KeyEvent, KeyTarget, Modifiers};
use cardstudio_core::selection::EditMode;
use cardstudio_core::transform::HandleKind;
use cardstudio_core::{Editor, EditorError, EditorResult, ManualClock, NudgeDirection};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Select the element at `path` (element-child indices) in a block.
    Select {
        block: usize,
        #[serde(default)]
        path: Vec<usize>,
    },
    Deselect,
    /// Click at a viewport point.
    Click { x: f64, y: f64 },
    /// Grab a handle of the current selection and drag it by a viewport
    /// delta.
    Drag { handle: HandleKind, dx: f64, dy: f64 },
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        target: KeyTarget,
    },
    Undo,
    Redo,
    Duplicate,
    Delete,
    Style { prop: String, value: String },
    Mode { mode: EditMode },
    MoveBlock { from: usize, to: usize },
    NudgeBlock { index: usize, direction: NudgeDirection },
    Zoom { value: f64 },
    /// Advance the clock and run due timers.
    Wait { ms: u64 },
}

/// Parse a script from JSON.
pub fn parse_script(json: &str) -> EditorResult<Vec<ScriptStep>> {
    serde_json::from_str(json).map_err(|e| EditorError::Script(e.to_string()))
}

/// Apply steps in order, then let pending timers fire.
pub fn run_script(editor: &mut Editor, clock: &ManualClock, steps: &[ScriptStep]) -> EditorResult<()> {
    for (index, step) in steps.iter().enumerate() {
        log::debug!("Step {}: {:?}", index, step);
        apply_step(editor, clock, step).map_err(|e| EditorError::Script(format!("step {index}: {e}")))?;
    }
    clock.advance(editor.config().debounce());
    editor.tick();
    Ok(())
}

fn apply_step(editor: &mut Editor, clock: &ManualClock, step: &ScriptStep) -> Result<(), String> {
    match step {
        ScriptStep::Select { block, path } => {
            let id = editor
                .surface()
                .element_at_path(*block, path)
                .ok_or_else(|| format!("no element at block {block} path {path:?}"))?;
            editor.select(Some(id));
            if editor.selected() != Some(id) {
                return Err("element could not be selected".to_string());
            }
        }
        ScriptStep::Deselect => editor.select(None),
        ScriptStep::Click { x, y } => {
            editor.click(Point::new(*x, *y));
        }
        ScriptStep::Drag { handle, dx, dy } => {
            let start = grab_point(editor, *handle).ok_or("drag needs a measured selection")?;
            let end = start + Vec2::new(*dx, *dy);
            editor.begin_handle_drag(*handle, start);
            editor.pointer_move(end);
            editor.pointer_up(end);
        }
        ScriptStep::Key {
            key,
            shift,
            ctrl,
            meta,
            target,
        } => {
            let modifiers = Modifiers {
                shift: *shift,
                ctrl: *ctrl,
                alt: false,
                meta: *meta,
            };
            let event = KeyEvent::new(Key::from_name(key))
                .with_modifiers(modifiers)
                .with_target(*target);
            editor.handle_key(&event);
        }
        ScriptStep::Undo => {
            editor.undo();
        }
        ScriptStep::Redo => {
            editor.redo();
        }
        ScriptStep::Duplicate => {
            editor.duplicate_selected();
        }
        ScriptStep::Delete => {
            editor.delete_selected();
        }
        ScriptStep::Style { prop, value } => {
            editor.set_style(prop, value);
        }
        ScriptStep::Mode { mode } => {
            editor.set_mode(*mode);
        }
        ScriptStep::MoveBlock { from, to } => {
            editor.move_block(*from, *to);
        }
        ScriptStep::NudgeBlock { index, direction } => {
            editor.nudge_block(*index, *direction);
        }
        ScriptStep::Zoom { value } => {
            editor.set_zoom(*value);
        }
        ScriptStep::Wait { ms } => {
            clock.advance_ms(*ms);
            editor.tick();
        }
    }
    Ok(())
}

/// Viewport point to press for a handle of the current selection.
fn grab_point(editor: &Editor, handle: HandleKind) -> Option<Point> {
    let rect = editor.selection().viewport_box?;
    match handle {
        HandleKind::Move => Some(rect.center()),
        _ => editor
            .handles()
            .into_iter()
            .find(|h| h.kind == handle)
            .map(|h| h.position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstudio_core::EditorConfig;
    use cardstudio_core::transform::Compass;

    const DECK: &str = "<section><h1 style=\"left: 100px; top: 100px; width: 400px; height: 100px\">One</h1></section>\
                        <section><h2 style=\"width: 200px; height: 50px\">Two</h2></section>";

    fn editor() -> (Editor, ManualClock) {
        let clock = ManualClock::new();
        let mut editor = Editor::new(EditorConfig::default()).with_clock(clock.clone());
        editor.load_markup(DECK).unwrap();
        (editor, clock)
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse_script(
            r#"[
                { "type": "select", "block": 0, "path": [0] },
                { "type": "drag", "handle": { "resize": "se" }, "dx": 100, "dy": 50 },
                { "type": "key", "key": "ArrowLeft", "shift": true },
                { "type": "nudge_block", "index": 1, "direction": "up" },
                { "type": "wait", "ms": 600 }
            ]"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(
            steps[1],
            ScriptStep::Drag {
                handle: HandleKind::Resize(Compass::SE),
                dx: 100.0,
                dy: 50.0
            }
        );
    }

    #[test]
    fn test_unknown_step_is_script_error() {
        assert!(matches!(
            parse_script(r#"[{ "type": "explode" }]"#),
            Err(EditorError::Script(_))
        ));
    }

    #[test]
    fn test_run_resize_script() {
        let (mut editor, clock) = editor();
        let steps = vec![
            ScriptStep::Zoom { value: 0.5 },
            ScriptStep::Select { block: 0, path: vec![0] },
            ScriptStep::Drag {
                handle: HandleKind::Resize(Compass::SE),
                dx: 100.0,
                dy: 50.0,
            },
        ];
        run_script(&mut editor, &clock, &steps).unwrap();
        let id = editor.surface().element_at_path(0, &[0]).unwrap();
        let record = editor.surface().transform(id).unwrap();
        assert_eq!(record.width, Some(600.0));
        assert_eq!(record.height, Some(200.0));
        assert_eq!(editor.history().undo_len(), 1);
    }

    #[test]
    fn test_drag_without_selection_fails() {
        let (mut editor, clock) = editor();
        let steps = vec![ScriptStep::Drag {
            handle: HandleKind::Move,
            dx: 1.0,
            dy: 1.0,
        }];
        let err = run_script(&mut editor, &clock, &steps).unwrap_err();
        assert!(err.to_string().contains("step 0"));
    }

    #[test]
    fn test_key_and_block_steps() {
        let (mut editor, clock) = editor();
        let steps = vec![
            ScriptStep::Select { block: 0, path: vec![0] },
            ScriptStep::Key {
                key: "Delete".to_string(),
                shift: false,
                ctrl: false,
                meta: false,
                target: KeyTarget::Surface,
            },
            ScriptStep::Wait { ms: 600 },
            ScriptStep::NudgeBlock {
                index: 1,
                direction: NudgeDirection::Up,
            },
        ];
        run_script(&mut editor, &clock, &steps).unwrap();
        assert_eq!(editor.blocks()[0].display_title, "Two");
        assert_eq!(editor.blocks()[1].display_title, "Slide 2");
        assert_eq!(editor.history().undo_len(), 2);
    }
}
