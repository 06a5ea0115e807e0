//! Viewport transforms between document, display and screen space.
//!
//! Document space is the page's logical coordinate system. Display space is
//! document space scaled to fit the container (`display_scale`). Screen space
//! adds the user's zoom and pan on top, relative to the viewport origin.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
pub const MIN_DISPLAY_SCALE: f64 = 0.1;
pub const MAX_DISPLAY_SCALE: f64 = 2.0;
/// Upper bound for the automatically computed fit scale.
pub const MAX_FIT_SCALE: f64 = 1.5;
/// Padding subtracted from each container dimension before fitting.
pub const DEFAULT_DISPLAY_PADDING: f64 = 80.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// User zoom, in [`MIN_ZOOM`, `MAX_ZOOM`].
    pub zoom: f64,
    /// Pan offset in screen pixels.
    pub pan: Vec2,
    /// Fit-to-container scale, in [`MIN_DISPLAY_SCALE`, `MAX_DISPLAY_SCALE`].
    pub display_scale: f64,
    /// Screen-space position of the viewport's top-left corner.
    pub origin: Point,
    /// Logical page size.
    pub canvas_size: Size,
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(crate::document::DEFAULT_CANVAS_SIZE)
    }
}

impl Viewport {
    pub fn new(canvas_size: Size) -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            display_scale: 1.0,
            origin: Point::ZERO,
            canvas_size,
            padding: DEFAULT_DISPLAY_PADDING,
        }
    }

    /// Combined document-to-screen scale factor.
    pub fn effective_scale(&self) -> f64 {
        self.zoom * self.display_scale
    }

    /// Document space to screen space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.origin.to_vec2() + self.pan) * Affine::scale(self.effective_scale())
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        let scale = self.effective_scale();
        let local = screen - self.origin - self.pan;
        Point::new(local.x / scale, local.y / scale)
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        let scale = self.effective_scale();
        self.origin + self.pan + Vec2::new(canvas.x * scale, canvas.y * scale)
    }

    /// Convert a pointer movement into a document-space delta.
    pub fn screen_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.effective_scale()
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn set_display_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.display_scale = scale.clamp(MIN_DISPLAY_SCALE, MAX_DISPLAY_SCALE);
        }
    }

    /// Scale that fits the whole page inside a container, after padding.
    pub fn calculate_optimal_display_scale(&self, container_width: f64, container_height: f64) -> f64 {
        let available_w = (container_width - self.padding).max(1.0);
        let available_h = (container_height - self.padding).max(1.0);
        if self.canvas_size.width <= 0.0 || self.canvas_size.height <= 0.0 {
            return 1.0;
        }
        let scale = (available_w / self.canvas_size.width).min(available_h / self.canvas_size.height);
        scale.clamp(MIN_DISPLAY_SCALE, MAX_FIT_SCALE)
    }

    /// Recompute the display scale for a container and reset zoom and pan.
    pub fn fit(&mut self, container_width: f64, container_height: f64) {
        let scale = self.calculate_optimal_display_scale(container_width, container_height);
        self.set_display_scale(scale);
        self.reset();
    }

    /// Zoom by `factor`, keeping `screen_point` over the same document point.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.screen_to_canvas(screen_point);
        self.zoom = new_zoom;
        let moved = self.canvas_to_screen(anchor);
        self.pan += screen_point - moved;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_canvas_roundtrip() {
        let mut viewport = Viewport::new(Size::new(1200.0, 800.0));
        viewport.origin = Point::new(40.0, 60.0);
        viewport.pan = Vec2::new(-15.0, 22.5);
        viewport.set_zoom(1.75);
        viewport.set_display_scale(0.6);

        for p in [Point::new(0.0, 0.0), Point::new(123.0, 456.0), Point::new(-30.0, 999.0)] {
            let back = viewport.canvas_to_screen(viewport.screen_to_canvas(p));
            assert!((back.x - p.x).abs() < 1e-9);
            assert!((back.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_screen_to_canvas_formula() {
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        viewport.origin = Point::new(100.0, 50.0);
        viewport.pan = Vec2::new(10.0, 10.0);
        viewport.set_zoom(2.0);
        viewport.set_display_scale(0.5);

        let canvas = viewport.screen_to_canvas(Point::new(210.0, 160.0));
        assert!((canvas.x - 100.0).abs() < 1e-9);
        assert!((canvas.y - 100.0).abs() < 1e-9);
        assert_eq!(viewport.transform() * canvas, viewport.canvas_to_screen(canvas));
    }

    #[test]
    fn test_optimal_display_scale() {
        let viewport = Viewport::new(Size::new(800.0, 600.0));
        // (1080 - 80) / 800 = 1.25, (680 - 80) / 600 = 1.0
        assert!((viewport.calculate_optimal_display_scale(1080.0, 680.0) - 1.0).abs() < 1e-9);
        // Huge containers clamp to 1.5
        assert!((viewport.calculate_optimal_display_scale(10_000.0, 10_000.0) - 1.5).abs() < 1e-9);
        // Tiny containers clamp to 0.1
        assert!((viewport.calculate_optimal_display_scale(50.0, 50.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(20.0);
        assert!((viewport.zoom - MAX_ZOOM).abs() < f64::EPSILON);
        viewport.set_zoom(0.0);
        assert!((viewport.zoom - MIN_ZOOM).abs() < f64::EPSILON);
        viewport.set_zoom(f64::NAN);
        assert!((viewport.zoom - MIN_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut viewport = Viewport::default();
        viewport.origin = Point::new(20.0, 20.0);
        let screen = Point::new(300.0, 200.0);
        let before = viewport.screen_to_canvas(screen);
        viewport.zoom_at(screen, 2.5);
        let after = viewport.screen_to_canvas(screen);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }
}
