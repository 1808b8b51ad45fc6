//! Single-node selection, hover highlighting and edit mode.

use crate::clock::Instant;
use crate::layout::{Layout, viewport_box};
use crate::surface::{NodeId, Surface};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Horizontal room the property panel needs inside the viewport.
pub const PANEL_WIDTH: f64 = 240.0;
/// Vertical room the property panel needs inside the viewport.
pub const PANEL_HEIGHT: f64 = 180.0;
/// Gap between the selection box and the property panel.
pub const PANEL_GAP: f64 = 8.0;

/// Highlight drawn for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Normal,
    Hovered,
    Selected,
}

/// Which interaction owns the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Clicks pick nodes; handles and keyboard shortcuts are live.
    #[default]
    ElementSelect,
    /// Clicks place a text cursor; no selection chrome.
    TextEdit,
}

/// How the host should route a click on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    SelectNode,
    PlaceCursor,
}

/// Derived selection state for overlay rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionState {
    pub node: Option<NodeId>,
    pub viewport_box: Option<Rect>,
    pub rotation_degrees: f64,
}

impl SelectionState {
    /// Whether there is something to draw. A selected node that has not
    /// been measured yet is not representable.
    pub fn is_representable(&self) -> bool {
        self.node.is_some() && self.viewport_box.is_some()
    }
}

/// Tracks at most one selected node and its overlay geometry.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    state: SelectionState,
    hovered: Option<NodeId>,
    mode: EditMode,
    /// Deferred re-measure deadline.
    remeasure_at: Option<Instant>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.state.node
    }

    pub fn viewport_box(&self) -> Option<Rect> {
        self.state.viewport_box
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.state.rotation_degrees
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Switch mode. Leaving element-select drops the selection and hover.
    /// Returns true if the mode changed.
    pub fn set_mode(&mut self, mode: EditMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        if mode != EditMode::ElementSelect {
            self.clear();
            self.hovered = None;
        }
        log::debug!("Edit mode: {:?}", mode);
        true
    }

    pub fn pointer_target_mode(&self) -> PointerTarget {
        match self.mode {
            EditMode::ElementSelect => PointerTarget::SelectNode,
            EditMode::TextEdit => PointerTarget::PlaceCursor,
        }
    }

    /// Rich-text nodes only receive pointer events while text editing.
    pub fn rich_text_intercepts_pointer(&self) -> bool {
        self.mode == EditMode::TextEdit
    }

    /// Select a node, or clear with `None`.
    ///
    /// The node's transform record is created on first selection. Stale
    /// ids and text runs clear the selection instead.
    pub fn select<L: Layout + ?Sized>(
        &mut self,
        surface: &mut Surface,
        layout: &L,
        viewport: &Viewport,
        id: Option<NodeId>,
    ) {
        let Some(id) = id else {
            self.clear();
            return;
        };
        if self.mode != EditMode::ElementSelect {
            log::debug!("Ignoring selection of {} outside element-select mode", id);
            return;
        }
        if surface.ensure_transform(id).is_none() {
            log::debug!("Cannot select {}: not an attached element", id);
            self.clear();
            return;
        }
        self.state.node = Some(id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        self.refresh_box(surface, layout, viewport);
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::default();
        self.remeasure_at = None;
    }

    /// Re-derive the box from live geometry. A node that has left the
    /// surface clears the selection.
    pub fn refresh_box<L: Layout + ?Sized>(&mut self, surface: &Surface, layout: &L, viewport: &Viewport) {
        if self.hovered.is_some_and(|h| !surface.contains(h)) {
            self.hovered = None;
        }
        let Some(id) = self.state.node else {
            return;
        };
        if !surface.contains(id) {
            log::debug!("Selected node {} was detached; clearing selection", id);
            self.clear();
            return;
        }
        self.state.viewport_box = viewport_box(surface, layout, viewport, id);
        self.state.rotation_degrees = surface.transform(id).map_or(0.0, |r| r.rotation_degrees);
    }

    /// Overwrite the overlay box for immediate drag feedback.
    pub fn set_feedback(&mut self, viewport_box: Rect, rotation_degrees: f64) {
        if self.state.node.is_some() {
            self.state.viewport_box = Some(viewport_box);
            self.state.rotation_degrees = rotation_degrees;
        }
    }

    /// Mark hover on a node. The selected node never shows hover.
    pub fn hover(&mut self, id: Option<NodeId>) {
        self.hovered = match id {
            Some(id) if self.mode == EditMode::ElementSelect && self.state.node != Some(id) => Some(id),
            _ => None,
        };
    }

    pub fn highlight(&self, id: NodeId) -> Highlight {
        if self.state.node == Some(id) {
            Highlight::Selected
        } else if self.hovered == Some(id) {
            Highlight::Hovered
        } else {
            Highlight::Normal
        }
    }

    /// Forget references to a node that is about to leave the surface.
    pub fn forget(&mut self, id: NodeId) {
        if self.state.node == Some(id) {
            self.clear();
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    /// Ask for another measurement once `deadline` passes. A later request
    /// replaces an earlier one.
    pub fn schedule_remeasure(&mut self, deadline: Instant) {
        if self.state.node.is_some() {
            self.remeasure_at = Some(deadline);
        }
    }

    pub fn remeasure_pending(&self) -> bool {
        self.remeasure_at.is_some()
    }

    /// Consume a due re-measure request.
    pub fn take_due_remeasure(&mut self, now: Instant) -> bool {
        match self.remeasure_at {
            Some(deadline) if now >= deadline => {
                self.remeasure_at = None;
                true
            }
            _ => false,
        }
    }

    /// Where the property panel goes: under the box, kept inside the
    /// viewport.
    pub fn panel_anchor(&self, viewport_size: Size) -> Option<Point> {
        let rect = self.state.viewport_box?;
        Some(Point::new(
            rect.x0.min(viewport_size.width - PANEL_WIDTH),
            (rect.y1 + PANEL_GAP).min(viewport_size.height - PANEL_HEIGHT),
        ))
    }

    /// Content-space size of the selection, rounded for display.
    pub fn size_readout(&self, zoom: f64) -> Option<Size> {
        let rect = self.state.viewport_box?;
        Some(Size::new(
            (rect.width() / zoom).round(),
            (rect.height() / zoom).round(),
        ))
    }
}
