//! Viewport module: zoom factor and content/viewport coordinate mapping.

use crate::config::EditorConfig;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Maps between viewport space (pointer events, overlay chrome) and
/// content space (the document's own unscaled geometry).
///
/// Content is drawn at `origin + p * zoom`, where `origin` is the canvas
/// offset inside the viewport minus the current scroll offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current zoom factor.
    zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
    /// Increment used by zoom in/out.
    pub zoom_step: f64,
    /// Where the unscrolled canvas sits in the viewport.
    canvas_offset: Vec2,
    /// Scroll offset of the canvas container.
    scroll: Vec2,
    /// Size of the visible viewport.
    size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl Viewport {
    /// Create a viewport with the configured zoom limits.
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            zoom: config.default_zoom.clamp(config.min_zoom, config.max_zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            canvas_offset: Vec2::ZERO,
            scroll: Vec2::ZERO,
            size: Size::new(1280.0, 800.0),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Request a zoom factor. The value is clamped to the allowed range.
    /// Returns true if the zoom changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        self.zoom = new_zoom;
        true
    }

    /// Step the zoom up by one increment.
    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(snap_to_step(self.zoom + self.zoom_step))
    }

    /// Step the zoom down by one increment.
    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(snap_to_step(self.zoom - self.zoom_step))
    }

    /// Viewport-space position of content (0, 0).
    pub fn origin(&self) -> Point {
        (self.canvas_offset - self.scroll).to_point()
    }

    pub fn set_canvas_offset(&mut self, offset: Vec2) {
        self.canvas_offset = offset;
    }

    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.scroll = scroll;
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Scale a content-space length into viewport space.
    pub fn to_viewport(&self, content: f64) -> f64 {
        content * self.zoom
    }

    /// Scale a viewport-space length into content space.
    pub fn to_content(&self, viewport: f64) -> f64 {
        viewport / self.zoom
    }

    pub fn delta_to_viewport(&self, delta: Vec2) -> Vec2 {
        Vec2::new(self.to_viewport(delta.x), self.to_viewport(delta.y))
    }

    pub fn delta_to_content(&self, delta: Vec2) -> Vec2 {
        Vec2::new(self.to_content(delta.x), self.to_content(delta.y))
    }

    /// Get the affine transform for overlay placement.
    ///
    /// This transform converts content coordinates to viewport coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.origin().to_vec2()) * Affine::scale(self.zoom)
    }

    /// Convert a content point to viewport coordinates.
    pub fn content_to_viewport(&self, point: Point) -> Point {
        self.transform() * point
    }

    /// Convert a viewport point to content coordinates.
    pub fn viewport_to_content(&self, point: Point) -> Point {
        self.transform().inverse() * point
    }

    /// Convert a content rect to its viewport box.
    pub fn content_rect_to_viewport(&self, rect: Rect) -> Rect {
        let origin = self.content_to_viewport(rect.origin());
        Rect::from_origin_size(
            origin,
            Size::new(self.to_viewport(rect.width()), self.to_viewport(rect.height())),
        )
    }
}

/// Round a stepped zoom value so repeated stepping does not drift.
fn snap_to_step(zoom: f64) -> f64 {
    (zoom * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::default();
        assert!((viewport.zoom() - 0.55).abs() < f64::EPSILON);
        assert_eq!(viewport.origin(), Point::ZERO);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(0.01);
        assert!((viewport.zoom() - 0.3).abs() < f64::EPSILON);
        viewport.set_zoom(5.0);
        assert!((viewport.zoom() - 1.0).abs() < f64::EPSILON);
        assert!(!viewport.set_zoom(f64::NAN));
    }

    #[test]
    fn test_zoom_steps_stay_on_grid() {
        let mut viewport = Viewport::default();
        for _ in 0..9 {
            viewport.zoom_in();
        }
        assert!((viewport.zoom() - 1.0).abs() < f64::EPSILON);
        assert!(!viewport.zoom_in());

        for _ in 0..20 {
            viewport.zoom_out();
        }
        assert!((viewport.zoom() - 0.3).abs() < f64::EPSILON);

        viewport.zoom_in();
        assert!((viewport.zoom() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_delta_conversion() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(0.5);
        assert_eq!(viewport.delta_to_content(Vec2::new(100.0, 50.0)), Vec2::new(200.0, 100.0));
        assert_eq!(viewport.delta_to_viewport(Vec2::new(200.0, 100.0)), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_point_mapping_with_scroll() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(0.5);
        viewport.set_canvas_offset(Vec2::new(100.0, 40.0));
        viewport.set_scroll(Vec2::new(0.0, 30.0));

        let screen = viewport.content_to_viewport(Point::new(200.0, 100.0));
        assert!((screen.x - 200.0).abs() < 1e-10);
        assert!((screen.y - 60.0).abs() < 1e-10);

        let back = viewport.viewport_to_content(screen);
        assert!((back.x - 200.0).abs() < 1e-10);
        assert!((back.y - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_rect_mapping() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(0.5);
        let rect = viewport.content_rect_to_viewport(Rect::new(100.0, 100.0, 300.0, 200.0));
        assert_eq!(rect, Rect::new(50.0, 50.0, 150.0, 100.0));
    }
}
