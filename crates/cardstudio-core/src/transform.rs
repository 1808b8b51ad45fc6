//! Manipulation handles and drag-session math.

use crate::surface::{NodeId, NodeTransform};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in viewport pixels.
pub const HANDLE_SIZE: f64 = 10.0;
/// Handle hit tolerance in viewport pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;
/// Distance from the box's top edge to the rotation handle.
pub const ROTATE_HANDLE_OFFSET: f64 = 30.0;

/// Resize handle positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compass {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Compass {
    pub const ALL: [Compass; 8] = [
        Compass::NW,
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
    ];

    pub fn grows_north(self) -> bool {
        matches!(self, Compass::N | Compass::NE | Compass::NW)
    }

    pub fn grows_south(self) -> bool {
        matches!(self, Compass::S | Compass::SE | Compass::SW)
    }

    pub fn grows_east(self) -> bool {
        matches!(self, Compass::E | Compass::NE | Compass::SE)
    }

    pub fn grows_west(self) -> bool {
        matches!(self, Compass::W | Compass::NW | Compass::SW)
    }

    /// Handle position on an unrotated box.
    fn anchor(self, bounds: Rect) -> Point {
        let x = if self.grows_west() {
            bounds.x0
        } else if self.grows_east() {
            bounds.x1
        } else {
            bounds.center().x
        };
        let y = if self.grows_north() {
            bounds.y0
        } else if self.grows_south() {
            bounds.y1
        } else {
            bounds.center().y
        };
        Point::new(x, y)
    }
}

/// What a drag manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    /// Drag the whole node.
    Move,
    /// Rotation handle above the top edge.
    Rotate,
    /// Edge or corner resize handle.
    Resize(Compass),
}

/// A selection handle with its viewport position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a viewport point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Resize and rotate handles for a selection box.
///
/// `rotation_degrees` turns the handles about the box centre, matching how
/// the overlay chrome is drawn.
pub fn get_handles(bounds: Rect, rotation_degrees: f64) -> Vec<Handle> {
    let turn = Affine::rotate_about(rotation_degrees.to_radians(), bounds.center());
    let mut handles: Vec<Handle> = Compass::ALL
        .iter()
        .map(|&c| Handle::new(turn * c.anchor(bounds), HandleKind::Resize(c)))
        .collect();
    let rotate = Point::new(bounds.center().x, bounds.y0 - ROTATE_HANDLE_OFFSET);
    handles.push(Handle::new(turn * rotate, HandleKind::Rotate));
    handles
}

/// Find what a pointer-down at `point` would grab: a handle, the body of
/// the box (move), or nothing.
pub fn hit_test_handles(bounds: Rect, rotation_degrees: f64, point: Point, tolerance: f64) -> Option<HandleKind> {
    if let Some(handle) = get_handles(bounds, rotation_degrees)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
    {
        return Some(handle.kind);
    }
    let local = Affine::rotate_about(-rotation_degrees.to_radians(), bounds.center()) * point;
    bounds.contains(local).then_some(HandleKind::Move)
}

/// State captured when a drag starts. Never mutated afterwards; every
/// frame is derived from the current pointer minus `start_point`.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node: NodeId,
    pub handle: HandleKind,
    /// Pointer position at pointer-down, viewport space.
    pub start_point: Point,
    /// Selection box at pointer-down, viewport space.
    pub original_box: Rect,
    pub original_translate: Vec2,
    pub original_rotation: f64,
    /// Size overrides held by the record at pointer-down.
    pub original_width: Option<f64>,
    pub original_height: Option<f64>,
    pub zoom: f64,
}

/// Result of applying the current pointer to a drag session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFrame {
    pub translate: Vec2,
    pub rotation_degrees: f64,
    /// Content width override. An axis the drag left alone carries the
    /// override the record had at pointer-down.
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Overlay box for immediate feedback.
    pub viewport_box: Rect,
}

impl DragSession {
    pub fn new(node: NodeId, handle: HandleKind, start_point: Point, original_box: Rect, record: &NodeTransform, zoom: f64) -> Self {
        Self {
            node,
            handle,
            start_point,
            original_box,
            original_translate: record.translation(),
            original_rotation: record.rotation_degrees,
            original_width: record.width,
            original_height: record.height,
            zoom,
        }
    }

    /// Total pointer delta since pointer-down.
    pub fn delta(&self, pointer: Point) -> Vec2 {
        pointer - self.start_point
    }

    /// The frame that leaves the node exactly as it was.
    fn identity(&self) -> DragFrame {
        DragFrame {
            translate: self.original_translate,
            rotation_degrees: self.original_rotation,
            width: self.original_width,
            height: self.original_height,
            viewport_box: self.original_box,
        }
    }

    /// Compute the node state for the pointer at `pointer`.
    ///
    /// `min_size` is the content-space floor for resized dimensions.
    pub fn frame(&self, pointer: Point, min_size: f64) -> DragFrame {
        let delta = self.delta(pointer);
        if delta == Vec2::ZERO {
            return self.identity();
        }
        match self.handle {
            HandleKind::Move => self.move_frame(delta),
            HandleKind::Resize(compass) => self.resize_frame(compass, delta, min_size),
            HandleKind::Rotate => self.rotate_frame(pointer),
        }
    }

    fn move_frame(&self, delta: Vec2) -> DragFrame {
        DragFrame {
            translate: self.original_translate + delta / self.zoom,
            viewport_box: self.original_box + delta,
            ..self.identity()
        }
    }

    fn resize_frame(&self, compass: Compass, delta: Vec2, min_size: f64) -> DragFrame {
        let min = min_size * self.zoom;
        let b = self.original_box;
        let (w0, h0) = (b.width(), b.height());
        let (mut x, mut y, mut w, mut h) = (b.x0, b.y0, w0, h0);
        let mut translate = self.original_translate;

        if compass.grows_east() {
            w = (w0 + delta.x).max(min);
        }
        if compass.grows_west() {
            w = (w0 - delta.x).max(min);
            x = b.x0 + (w0 - w);
            translate.x += (w0 - w) / self.zoom;
        }
        if compass.grows_south() {
            h = (h0 + delta.y).max(min);
        }
        if compass.grows_north() {
            h = (h0 - delta.y).max(min);
            y = b.y0 + (h0 - h);
            translate.y += (h0 - h) / self.zoom;
        }

        DragFrame {
            translate,
            rotation_degrees: self.original_rotation,
            width: if w != w0 { Some(w / self.zoom) } else { self.original_width },
            height: if h != h0 { Some(h / self.zoom) } else { self.original_height },
            viewport_box: Rect::new(x, y, x + w, y + h),
        }
    }

    fn rotate_frame(&self, pointer: Point) -> DragFrame {
        let center = self.original_box.center();
        let angle = |p: Point| {
            let v = p - center;
            v.y.atan2(v.x)
        };
        let swept = (angle(pointer) - angle(self.start_point)).to_degrees();
        DragFrame {
            rotation_degrees: self.original_rotation + swept,
            ..self.identity()
        }
    }
}

/// Write a frame into a node's transform record.
pub fn apply_frame(record: &mut NodeTransform, frame: &DragFrame) {
    record.set_translation(frame.translate);
    record.rotation_degrees = frame.rotation_degrees;
    record.width = frame.width;
    record.height = frame.height;
}
