//! Layout seam: where nodes sit in content space before edit transforms.

use crate::surface::{NodeId, Surface};
use crate::viewport::Viewport;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use std::collections::HashMap;

/// Source of untransformed node geometry.
///
/// The returned rect is in content space and already reflects the node's
/// width/height overrides, but not its translate or rotation.
pub trait Layout {
    fn layout_rect(&self, surface: &Surface, id: NodeId) -> Option<Rect>;
}

/// Deterministic layout driven by inline styles.
///
/// Top-level blocks are stacked vertically at a fixed logical size. A
/// descendant sits at its parent's origin plus its `left`/`top`, sized by
/// its override, its inline `width`/`height`, or (width only) its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideLayout {
    block_size: Size,
}

impl Default for SlideLayout {
    fn default() -> Self {
        Self::new(Size::new(1080.0, 1350.0))
    }
}

impl SlideLayout {
    pub fn new(block_size: Size) -> Self {
        Self { block_size }
    }

    pub fn block_size(&self) -> Size {
        self.block_size
    }
}

impl Layout for SlideLayout {
    fn layout_rect(&self, surface: &Surface, id: NodeId) -> Option<Rect> {
        let element = surface.element(id)?;
        let record = surface.transform(id);
        let override_w = record.and_then(|r| r.width);
        let override_h = record.and_then(|r| r.height);

        match surface.parent(id) {
            None => {
                let index = surface.element_roots().iter().position(|&r| r == id)?;
                let origin = Point::new(0.0, index as f64 * self.block_size.height);
                let size = Size::new(
                    override_w.unwrap_or(self.block_size.width),
                    override_h.unwrap_or(self.block_size.height),
                );
                Some(Rect::from_origin_size(origin, size))
            }
            Some(parent) => {
                let parent_rect = self.layout_rect(surface, parent)?;
                let offset = Vec2::new(
                    element.style.px("left").unwrap_or(0.0),
                    element.style.px("top").unwrap_or(0.0),
                );
                let width = override_w
                    .or_else(|| element.style.px("width"))
                    .unwrap_or(parent_rect.width());
                let height = override_h.or_else(|| element.style.px("height"))?;
                Some(Rect::from_origin_size(
                    parent_rect.origin() + offset,
                    Size::new(width, height),
                ))
            }
        }
    }
}

/// Geometry reported by a host that measures a live rendering.
#[derive(Debug, Clone, Default)]
pub struct MeasuredLayout {
    rects: HashMap<NodeId, Rect>,
}

impl MeasuredLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the measured content-space rect of a node.
    pub fn set(&mut self, id: NodeId, rect: Rect) {
        self.rects.insert(id, rect);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Rect> {
        self.rects.remove(&id)
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

impl Layout for MeasuredLayout {
    fn layout_rect(&self, surface: &Surface, id: NodeId) -> Option<Rect> {
        if !surface.contains(id) {
            return None;
        }
        let rect = *self.rects.get(&id)?;
        let record = surface.transform(id);
        let size = Size::new(
            record.and_then(|r| r.width).unwrap_or(rect.width()),
            record.and_then(|r| r.height).unwrap_or(rect.height()),
        );
        Some(Rect::from_origin_size(rect.origin(), size))
    }
}

/// Content-space box of a node with its own and inherited translates
/// applied. Zero-area boxes count as unmeasurable.
pub fn content_box<L: Layout + ?Sized>(surface: &Surface, layout: &L, id: NodeId) -> Option<Rect> {
    let rect = layout.layout_rect(surface, id)?;
    if rect.area() <= 0.0 || !rect.area().is_finite() {
        return None;
    }
    let shift = std::iter::once(id)
        .chain(surface.ancestors(id))
        .filter_map(|n| surface.transform(n))
        .fold(Vec2::ZERO, |acc, record| acc + record.translation());
    Some(rect + shift)
}

/// Viewport-space box of a node (rotation excluded).
pub fn viewport_box<L: Layout + ?Sized>(
    surface: &Surface,
    layout: &L,
    viewport: &Viewport,
    id: NodeId,
) -> Option<Rect> {
    content_box(surface, layout, id).map(|rect| viewport.content_rect_to_viewport(rect))
}

/// Topmost element under a viewport point.
///
/// Later nodes in document order paint over earlier ones, so the last hit
/// wins. Each node's own rotation is undone about its box centre first.
pub fn hit_test<L: Layout + ?Sized>(
    surface: &Surface,
    layout: &L,
    viewport: &Viewport,
    point: Point,
) -> Option<NodeId> {
    surface
        .document_order()
        .into_iter()
        .filter(|&id| surface.element(id).is_some())
        .filter(|&id| {
            let Some(rect) = viewport_box(surface, layout, viewport, id) else {
                return false;
            };
            let rotation = surface.transform(id).map_or(0.0, |r| r.rotation_degrees);
            let local = if rotation == 0.0 {
                point
            } else {
                Affine::rotate_about(-rotation.to_radians(), rect.center()) * point
            };
            rect.contains(local)
        })
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Element;

    fn two_blocks() -> (Surface, NodeId, NodeId, NodeId) {
        let mut surface = Surface::new();
        let first = surface.append_element(None, Element::new("section"));
        let title = surface.append_element(
            Some(first),
            Element::new("h1").with_style("left: 100px; top: 200px; width: 400px; height: 120px"),
        );
        surface.append_text(Some(title), "Title");
        let second = surface.append_element(None, Element::new("section"));
        (surface, first, title, second)
    }

    #[test]
    fn test_blocks_stack_vertically() {
        let (surface, first, _, second) = two_blocks();
        let layout = SlideLayout::default();
        assert_eq!(layout.layout_rect(&surface, first), Some(Rect::new(0.0, 0.0, 1080.0, 1350.0)));
        assert_eq!(
            layout.layout_rect(&surface, second),
            Some(Rect::new(0.0, 1350.0, 1080.0, 2700.0))
        );
    }

    #[test]
    fn test_child_placed_by_inline_style() {
        let (mut surface, _, title, _) = two_blocks();
        let layout = SlideLayout::default();
        assert_eq!(
            layout.layout_rect(&surface, title),
            Some(Rect::new(100.0, 200.0, 500.0, 320.0))
        );

        surface.ensure_transform(title).unwrap().width = Some(600.0);
        assert_eq!(
            layout.layout_rect(&surface, title),
            Some(Rect::new(100.0, 200.0, 700.0, 320.0))
        );
    }

    #[test]
    fn test_missing_height_is_unmeasurable() {
        let (mut surface, first, _, _) = two_blocks();
        let para = surface.append_element(Some(first), Element::new("p"));
        assert_eq!(SlideLayout::default().layout_rect(&surface, para), None);
    }

    #[test]
    fn test_zero_area_box_is_none() {
        let (mut surface, first, _, _) = two_blocks();
        let flat = surface.append_element(Some(first), Element::new("hr").with_style("height: 0px"));
        assert_eq!(content_box(&surface, &SlideLayout::default(), flat), None);
    }

    #[test]
    fn test_translates_are_inherited() {
        let (mut surface, first, title, _) = two_blocks();
        surface.ensure_transform(first).unwrap().translate_x = 10.0;
        surface.ensure_transform(title).unwrap().translate_y = 5.0;
        let rect = content_box(&surface, &SlideLayout::default(), title).unwrap();
        assert_eq!(rect, Rect::new(110.0, 205.0, 510.0, 325.0));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let (surface, first, title, second) = two_blocks();
        let layout = SlideLayout::default();
        let mut viewport = Viewport::default();
        viewport.set_zoom(0.5);

        assert_eq!(hit_test(&surface, &layout, &viewport, Point::new(100.0, 120.0)), Some(title));
        assert_eq!(hit_test(&surface, &layout, &viewport, Point::new(10.0, 10.0)), Some(first));
        assert_eq!(hit_test(&surface, &layout, &viewport, Point::new(10.0, 700.0)), Some(second));
        assert_eq!(hit_test(&surface, &layout, &viewport, Point::new(600.0, 10.0)), None);
    }

    #[test]
    fn test_hit_test_respects_rotation() {
        let (mut surface, _, title, _) = two_blocks();
        let layout = SlideLayout::default();
        let mut viewport = Viewport::default();
        viewport.set_zoom(1.0);
        // Box is (100,200)-(500,320), centre (300,260).
        let corner = Point::new(495.0, 205.0);
        assert_eq!(hit_test(&surface, &layout, &viewport, corner), Some(title));

        surface.ensure_transform(title).unwrap().rotation_degrees = 90.0;
        // Rotated a quarter turn the box spans x 240..360 around the centre.
        assert_ne!(hit_test(&surface, &layout, &viewport, corner), Some(title));
        assert_eq!(hit_test(&surface, &layout, &viewport, Point::new(300.0, 430.0)), Some(title));
    }

    #[test]
    fn test_measured_layout_applies_overrides() {
        let (mut surface, _, title, _) = two_blocks();
        let mut layout = MeasuredLayout::new();
        assert_eq!(layout.layout_rect(&surface, title), None);
        layout.set(title, Rect::new(10.0, 10.0, 50.0, 30.0));
        surface.ensure_transform(title).unwrap().height = Some(100.0);
        assert_eq!(layout.layout_rect(&surface, title), Some(Rect::new(10.0, 10.0, 50.0, 110.0)));
        surface.remove(title);
        assert_eq!(layout.layout_rect(&surface, title), None);
    }
}
