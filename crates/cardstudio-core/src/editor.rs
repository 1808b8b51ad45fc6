//! The editor controller.
//!
//! `Editor` owns the surface and every piece of session state (viewport,
//! selection, drag session, history, block list) and exposes each user
//! operation as a method. All derived state is re-derived after every
//! mutation rather than patched.

use crate::blocks::{self, BlockList, NudgeDirection, StructuralBlock};
use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::error::EditorResult;
use crate::history::History;
use crate::input::{Key, KeyEvent, KeyOutcome, Modifiers, PointerEvent};
use crate::layout::{self, Layout, SlideLayout};
use crate::selection::{EditMode, PointerTarget, SelectionManager, SelectionState};
use crate::surface::{Element, NodeId, NodeKind, Surface};
use crate::transform::{
    DragSession, HANDLE_HIT_TOLERANCE, Handle, HandleKind, apply_frame, get_handles, hit_test_handles,
};
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};
use std::ops::Range;

/// Direct-manipulation editor over one surface.
#[derive(Debug)]
pub struct Editor<L: Layout = SlideLayout> {
    config: EditorConfig,
    surface: Surface,
    layout: L,
    viewport: Viewport,
    selection: SelectionManager,
    drag: Option<DragSession>,
    history: History,
    blocks: BlockList,
    clock: Box<dyn Clock>,
    /// Set by every mutation, cleared by `take_changes`.
    changed: bool,
}

impl Default for Editor<SlideLayout> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor<SlideLayout> {
    /// Create an editor with the deterministic slide layout.
    pub fn new(config: EditorConfig) -> Self {
        let layout = SlideLayout::new(config.block_size());
        Self::with_layout(config, layout)
    }
}

impl<L: Layout> Editor<L> {
    /// Create an editor over a host-provided layout.
    pub fn with_layout(config: EditorConfig, layout: L) -> Self {
        let surface = Surface::new();
        let mut history = History::new(config.history_capacity, config.debounce());
        history.reset(surface.to_markup());
        Self {
            viewport: Viewport::new(&config),
            config,
            surface,
            layout,
            selection: SelectionManager::new(),
            drag: None,
            history,
            blocks: BlockList::new(),
            clock: Box::new(SystemClock),
            changed: false,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Mutable access for hosts that report measured geometry. Call
    /// `notify_layout_shift` after updating it.
    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    // --- content in / out ---

    /// Load new markup. History starts over from the loaded state.
    ///
    /// On a parse error the current surface is kept.
    pub fn load_markup(&mut self, markup: &str) -> EditorResult<()> {
        let surface = Surface::parse(markup)?;
        self.drop_session_state();
        self.surface = surface;
        self.history.reset(self.surface.to_markup());
        self.blocks.cancel_drag();
        self.refresh_blocks();
        self.changed = false;
        log::info!(
            "Loaded surface: {} nodes, {} blocks",
            self.surface.len(),
            self.blocks.len()
        );
        Ok(())
    }

    /// Current serialized content.
    pub fn content(&self) -> String {
        self.surface.to_markup()
    }

    /// Serialized content if anything changed since the last call.
    pub fn take_changes(&mut self) -> Option<String> {
        if std::mem::take(&mut self.changed) {
            Some(self.content())
        } else {
            None
        }
    }

    // --- viewport ---

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let changed = self.viewport.set_zoom(zoom);
        if changed {
            self.refresh_box();
        }
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.viewport.zoom_in();
        if changed {
            self.refresh_box();
        }
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.viewport.zoom_out();
        if changed {
            self.refresh_box();
        }
        changed
    }

    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.viewport.set_scroll(scroll);
        self.refresh_box();
    }

    pub fn set_canvas_offset(&mut self, offset: Vec2) {
        self.viewport.set_canvas_offset(offset);
        self.refresh_box();
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.set_size(size);
        self.refresh_box();
    }

    /// A layout-affecting UI change happened (e.g. a side panel opened).
    /// Re-measure now and once more after the layout settles.
    pub fn notify_layout_shift(&mut self) {
        self.refresh_box();
        let deadline = self.clock.now() + self.config.layout_settle();
        self.selection.schedule_remeasure(deadline);
    }

    /// Run due timers: the debounced history commit and deferred
    /// re-measures. Returns true if anything fired.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        let committed = self.history.tick(now, &self.surface);
        let remeasure = self.selection.take_due_remeasure(now);
        if remeasure {
            self.refresh_box();
        }
        committed || remeasure
    }

    // --- selection ---

    pub fn selection(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn selection_manager(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.selected()
    }

    pub fn mode(&self) -> EditMode {
        self.selection.mode()
    }

    /// Switch between element-select and text-edit mode.
    pub fn set_mode(&mut self, mode: EditMode) -> bool {
        let changed = self.selection.set_mode(mode);
        if changed {
            self.drag = None;
        }
        changed
    }

    pub fn toggle_element_select(&mut self) -> EditMode {
        let next = match self.mode() {
            EditMode::ElementSelect => EditMode::TextEdit,
            EditMode::TextEdit => EditMode::ElementSelect,
        };
        self.set_mode(next);
        next
    }

    pub fn pointer_target_mode(&self) -> PointerTarget {
        self.selection.pointer_target_mode()
    }

    pub fn rich_text_intercepts_pointer(&self) -> bool {
        self.selection.rich_text_intercepts_pointer()
    }

    /// Select a node (or clear with `None`).
    pub fn select(&mut self, id: Option<NodeId>) {
        if self.drag.as_ref().is_some_and(|d| Some(d.node) != id) {
            self.drag = None;
        }
        self.selection
            .select(&mut self.surface, &self.layout, &self.viewport, id);
    }

    /// Select whatever is under a viewport point.
    pub fn click(&mut self, point: Point) -> Option<NodeId> {
        if self.mode() != EditMode::ElementSelect {
            return None;
        }
        let hit = layout::hit_test(&self.surface, &self.layout, &self.viewport, point);
        self.select(hit);
        self.selected()
    }

    /// Update hover highlighting for a viewport point.
    pub fn hover(&mut self, point: Point) {
        let hit = if self.mode() == EditMode::ElementSelect {
            layout::hit_test(&self.surface, &self.layout, &self.viewport, point)
        } else {
            None
        };
        self.selection.hover(hit);
    }

    /// Overlay handles for the current selection.
    pub fn handles(&self) -> Vec<Handle> {
        match self.selection.viewport_box() {
            Some(rect) => get_handles(rect, self.selection.rotation_degrees()),
            None => Vec::new(),
        }
    }

    pub fn panel_anchor(&self) -> Option<Point> {
        self.selection.panel_anchor(self.viewport.size())
    }

    pub fn size_readout(&self) -> Option<Size> {
        self.selection.size_readout(self.viewport.zoom())
    }

    // --- pointer ---

    /// Dispatch a pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { position, modifiers } => self.pointer_down(position, modifiers),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position } => self.pointer_up(position),
            PointerEvent::Hover { position } => {
                self.hover(position);
                false
            }
        }
    }

    /// Pointer pressed. Grabs a handle of the current selection if one is
    /// under the pointer, otherwise selects the node under it.
    /// Returns true if a drag session started.
    pub fn pointer_down(&mut self, point: Point, _modifiers: Modifiers) -> bool {
        if self.mode() != EditMode::ElementSelect {
            return false;
        }
        if let Some(rect) = self.selection.viewport_box() {
            let grabbed = hit_test_handles(
                rect,
                self.selection.rotation_degrees(),
                point,
                HANDLE_HIT_TOLERANCE,
            );
            if let Some(handle) = grabbed {
                return self.begin_handle_drag(handle, point);
            }
        }
        self.click(point);
        false
    }

    /// Start a drag session on the selected node.
    pub fn begin_handle_drag(&mut self, handle: HandleKind, point: Point) -> bool {
        let (Some(node), Some(rect)) = (self.selection.selected(), self.selection.viewport_box()) else {
            return false;
        };
        let Some(record) = self.surface.ensure_transform(node) else {
            self.drop_stale(node);
            return false;
        };
        self.drag = Some(DragSession::new(
            node,
            handle,
            point,
            rect,
            record,
            self.viewport.zoom(),
        ));
        log::debug!("Drag start: {:?} on {}", handle, node);
        true
    }

    /// Pointer moved. Applies the session to the node and schedules a
    /// debounced snapshot.
    pub fn pointer_move(&mut self, point: Point) -> bool {
        if self.drag.is_none() {
            return false;
        }
        self.apply_drag(point)
    }

    /// Pointer released. Ends the session, flushes history and schedules
    /// a settle re-measure. Without a session this does nothing.
    pub fn pointer_up(&mut self, point: Point) -> bool {
        if self.drag.is_none() {
            return false;
        }
        let applied = self.apply_drag(point);
        self.drag = None;
        self.history.flush(&self.surface);
        self.refresh_box();
        let deadline = self.clock.now() + self.config.drag_settle();
        self.selection.schedule_remeasure(deadline);
        applied
    }

    fn apply_drag(&mut self, point: Point) -> bool {
        let Some(session) = self.drag.as_ref() else {
            return false;
        };
        let node = session.node;
        let frame = session.frame(point, self.config.min_size);
        let Some(record) = self.surface.transform_mut(node) else {
            self.drag = None;
            self.drop_stale(node);
            return false;
        };
        let before = record.clone();
        apply_frame(record, &frame);
        let moved = *record != before;
        self.selection
            .set_feedback(frame.viewport_box, frame.rotation_degrees);
        if moved {
            self.changed = true;
            self.record();
        }
        true
    }

    // --- node operations ---

    /// Nudge the selected node by a content-space offset.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> bool {
        self.edit_selected(|record| {
            record.translate_x += dx;
            record.translate_y += dy;
        })
    }

    /// Set the selected node's translate.
    pub fn set_translate(&mut self, x: f64, y: f64) -> bool {
        self.edit_selected(|record| record.set_translation(Vec2::new(x, y)))
    }

    pub fn set_rotation(&mut self, degrees: f64) -> bool {
        if !degrees.is_finite() {
            return false;
        }
        self.edit_selected(|record| record.rotation_degrees = degrees)
    }

    /// Set explicit content size overrides. `None` leaves an axis alone.
    pub fn set_size(&mut self, width: Option<f64>, height: Option<f64>) -> bool {
        let floor = self.config.min_size;
        self.edit_selected(|record| {
            if let Some(w) = width.filter(|w| w.is_finite()) {
                record.width = Some(w.max(floor));
            }
            if let Some(h) = height.filter(|h| h.is_finite()) {
                record.height = Some(h.max(floor));
            }
        })
    }

    fn edit_selected(&mut self, edit: impl FnOnce(&mut crate::surface::NodeTransform)) -> bool {
        let Some(node) = self.selected_attached() else {
            return false;
        };
        let Some(record) = self.surface.ensure_transform(node) else {
            self.drop_stale(node);
            return false;
        };
        edit(record);
        self.after_mutation();
        true
    }

    /// Set an inline style property on the selected node. An empty value
    /// removes it. `transform` is owned by the transform record and is
    /// rejected.
    pub fn set_style(&mut self, prop: &str, value: &str) -> bool {
        let prop = prop.trim().to_ascii_lowercase();
        if prop.is_empty() || prop == "transform" {
            log::debug!("Rejected style edit of {:?}", prop);
            return false;
        }
        let Some(node) = self.selected_attached() else {
            return false;
        };
        let Some(element) = self.surface.element_mut(node) else {
            self.drop_stale(node);
            return false;
        };
        let value = value.trim();
        if value.is_empty() {
            element.style.remove(&prop);
        } else {
            element.style.set(&prop, value);
        }
        self.after_mutation();
        true
    }

    /// Remove the selected node and its subtree.
    pub fn delete_selected(&mut self) -> bool {
        let Some(node) = self.selected_attached() else {
            return false;
        };
        self.drag = None;
        self.selection.forget(node);
        self.surface.remove(node);
        log::debug!("Deleted {}", node);
        self.after_mutation();
        true
    }

    /// Clone the selected node next to itself, offset so it is visibly
    /// distinct, and select the clone.
    pub fn duplicate_selected(&mut self) -> Option<NodeId> {
        let node = self.selected_attached()?;
        let clone = self.surface.duplicate(node)?;
        let offset = self.config.duplicate_offset;
        if let Some(record) = self.surface.ensure_transform(clone) {
            record.translate_x += offset;
            record.translate_y += offset;
            record.rotation_degrees = 0.0;
        }
        self.drag = None;
        self.select(Some(clone));
        log::debug!("Duplicated {} -> {}", node, clone);
        self.after_mutation();
        Some(clone)
    }

    // --- text editing ---

    /// Replace a node's text (text-edit mode input).
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        if !self.surface.set_text(id, text) {
            self.drop_stale(id);
            return false;
        }
        self.after_mutation();
        true
    }

    /// Style part of a text run from the text-edit toolbar.
    ///
    /// A non-empty `range` (char offsets into the run) is wrapped in a
    /// styled `span`. A collapsed caret styles the run's parent element
    /// instead, and an empty value there removes the property.
    pub fn set_text_style(&mut self, run: NodeId, range: Option<Range<usize>>, prop: &str, value: &str) -> bool {
        if self.mode() != EditMode::TextEdit {
            return false;
        }
        let prop = prop.trim().to_ascii_lowercase();
        if prop.is_empty() || prop == "transform" {
            log::debug!("Rejected text style edit of {:?}", prop);
            return false;
        }
        let is_text = self
            .surface
            .node(run)
            .is_some_and(|node| matches!(node.kind, NodeKind::Text(_)));
        if !is_text {
            log::debug!("Text style target {} is not a text run", run);
            return false;
        }
        let value = value.trim();

        match range.filter(|r| !r.is_empty()) {
            Some(range) => {
                if value.is_empty() {
                    return false;
                }
                let mut span = Element::new("span");
                span.style.set(&prop, value);
                if self.surface.wrap_text_range(run, range, span).is_none() {
                    return false;
                }
            }
            None => {
                let Some(element) = self
                    .surface
                    .parent(run)
                    .and_then(|parent| self.surface.element_mut(parent))
                else {
                    return false;
                };
                if value.is_empty() {
                    element.style.remove(&prop);
                } else {
                    element.style.set(&prop, value);
                }
            }
        }
        self.after_mutation();
        true
    }

    /// Adopt markup produced by free-text editing on the host surface.
    /// Unlike `load_markup`, history is kept and the change is recorded.
    pub fn apply_text_edit(&mut self, markup: &str) -> EditorResult<()> {
        let surface = Surface::parse(markup)?;
        self.drop_session_state();
        self.surface = surface;
        self.after_mutation();
        Ok(())
    }

    // --- history ---

    pub fn undo(&mut self) -> bool {
        self.drag = None;
        if !self.history.undo(&mut self.surface) {
            return false;
        }
        self.after_replace();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.drag = None;
        if !self.history.redo(&mut self.surface) {
            return false;
        }
        self.after_replace();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.history.is_pending()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- structural blocks ---

    pub fn blocks(&self) -> &[StructuralBlock] {
        self.blocks.blocks()
    }

    /// Move a block next to the block currently at `to`.
    pub fn move_block(&mut self, from: usize, to: usize) -> bool {
        if !blocks::move_block(&mut self.surface, from, to) {
            return false;
        }
        self.after_mutation();
        true
    }

    /// Swap a block with its neighbour.
    pub fn nudge_block(&mut self, index: usize, direction: NudgeDirection) -> bool {
        match direction.target(index, self.blocks.len()) {
            Some(target) => self.move_block(index, target),
            None => false,
        }
    }

    pub fn begin_block_drag(&mut self, index: usize) -> bool {
        self.blocks.begin_drag(index)
    }

    /// Drop a dragged block on the block at `target`.
    pub fn drop_block(&mut self, target: usize) -> bool {
        match self.blocks.drop_on(target) {
            Some((from, to)) => self.move_block(from, to),
            None => false,
        }
    }

    // --- keyboard ---

    /// Apply the keyboard contract.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let editable = event.target.is_editable();
        let mods = event.modifiers;

        if mods.primary() {
            if editable {
                return KeyOutcome::IGNORED;
            }
            return match event.key {
                Key::Character('z') if mods.shift => {
                    self.redo();
                    KeyOutcome::HANDLED
                }
                Key::Character('z') => {
                    self.undo();
                    KeyOutcome::HANDLED
                }
                Key::Character('y') => {
                    self.redo();
                    KeyOutcome::HANDLED
                }
                _ => KeyOutcome::IGNORED,
            };
        }

        let active = self.mode() == EditMode::ElementSelect && self.selected().is_some();
        match &event.key {
            Key::Escape if active => {
                self.drag = None;
                self.select(None);
                KeyOutcome::HANDLED
            }
            Key::Delete | Key::Backspace if active && !editable => {
                self.delete_selected();
                KeyOutcome::HANDLED
            }
            key if active && !editable && key.arrow_direction().is_some() => {
                let step = if mods.shift {
                    self.config.nudge_large
                } else {
                    self.config.nudge_small
                };
                if let Some((x, y)) = key.arrow_direction() {
                    self.nudge(x * step, y * step);
                }
                KeyOutcome::HANDLED
            }
            Key::Backspace if !editable => KeyOutcome {
                handled: false,
                prevent_default: true,
            },
            _ => KeyOutcome::IGNORED,
        }
    }

    // --- internals ---

    fn record(&mut self) {
        let now = self.clock.now();
        self.history.record_debounced(now);
    }

    fn refresh_box(&mut self) {
        self.selection
            .refresh_box(&self.surface, &self.layout, &self.viewport);
    }

    fn refresh_blocks(&mut self) {
        self.blocks.refresh(&self.surface, self.config.title_max_chars);
    }

    /// Re-derive dependent state, mark dirty and schedule a snapshot.
    fn after_mutation(&mut self) {
        self.refresh_box();
        self.refresh_blocks();
        self.changed = true;
        self.record();
    }

    /// The surface was swapped by undo or redo.
    fn after_replace(&mut self) {
        self.drop_session_state();
        self.refresh_blocks();
        self.changed = true;
    }

    /// Selected node if still attached; a stale selection is cleared.
    fn selected_attached(&mut self) -> Option<NodeId> {
        let node = self.selection.selected()?;
        if self.surface.contains(node) {
            Some(node)
        } else {
            self.drop_stale(node);
            None
        }
    }

    fn drop_stale(&mut self, id: NodeId) {
        log::debug!("Stale node {}; clearing selection", id);
        self.drag = None;
        self.selection.forget(id);
        self.selection.clear();
    }

    /// Clear everything that points into the current surface.
    fn drop_session_state(&mut self) {
        self.drag = None;
        self.selection.clear();
        self.selection.hover(None);
    }
}
