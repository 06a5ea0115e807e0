//! Painting scene nodes onto a tiny-skia pixmap.

use crate::error::{RenderError, RenderResult};
use crate::images::ImageSet;
use crate::scene::{PageScene, SceneNode};
use crate::text::{FontBook, layout, text_path};
use kurbo::{Affine, Size, Vec2};
use pagecraft_core::element::{ImageContent, ShapeContent, ShapeKind, TextContent};
use pagecraft_core::{BackgroundStyle, ElementContent, SerializableColor};
use tiny_skia::{
    Color, FillRule, FilterQuality, GradientStop, LinearGradient, Paint, Path, PathBuilder, Pattern, Pixmap,
    Point as SkiaPoint, Rect as SkiaRect, Shader, SpreadMode, Stroke, Transform as SkiaTransform,
};

/// Bezier approximation constant for quarter circles.
const KAPPA: f32 = 0.552_284_8;

pub(crate) fn to_skia_transform(affine: Affine) -> SkiaTransform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    SkiaTransform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_color(color: SerializableColor) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn solid_paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia_color(color));
    paint.anti_alias = true;
    paint
}

fn rect_path(x: f32, y: f32, width: f32, height: f32) -> Option<Path> {
    SkiaRect::from_xywh(x, y, width, height).map(PathBuilder::from_rect)
}

/// Rectangle with circular corners, radius clamped to half the shorter side.
pub fn rounded_rect_path(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Option<Path> {
    let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
    if r <= f32::EPSILON {
        return rect_path(x, y, width, height);
    }
    let k = r * KAPPA;
    let (right, bottom) = (x + width, y + height);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Scale and offset that make an image cover a box, cropping the overflow evenly.
pub fn cover_fit(image: Size, target: Size) -> (f64, Vec2) {
    if image.width <= 0.0 || image.height <= 0.0 {
        return (1.0, Vec2::ZERO);
    }
    let scale = (target.width / image.width).max(target.height / image.height);
    let offset = Vec2::new(
        (target.width - image.width * scale) / 2.0,
        (target.height - image.height * scale) / 2.0,
    );
    (scale, offset)
}

fn cover_shader<'a>(pixmap: &'a Pixmap, target: Size, opacity: f32) -> Shader<'a> {
    let natural = Size::new(pixmap.width() as f64, pixmap.height() as f64);
    let (scale, offset) = cover_fit(natural, target);
    let placement = Affine::translate(offset) * Affine::scale(scale);
    Pattern::new(
        pixmap.as_ref(),
        SpreadMode::Pad,
        FilterQuality::Bicubic,
        opacity,
        to_skia_transform(placement),
    )
}

/// Paints a page scene onto pixmaps that may cover only part of the page.
pub struct Painter<'a> {
    fonts: &'a FontBook,
    images: &'a ImageSet,
}

impl<'a> Painter<'a> {
    pub fn new(fonts: &'a FontBook, images: &'a ImageSet) -> Self {
        Self { fonts, images }
    }

    /// Paint the whole scene. `origin` is the page-space position of the pixmap's top-left pixel.
    pub fn paint(&self, pixmap: &mut Pixmap, scene: &PageScene<'_>, origin: Vec2) -> RenderResult<()> {
        let view = Affine::translate(-origin);
        pixmap.fill(Color::TRANSPARENT);

        match scene.background {
            Some(background) => self.paint_background(pixmap, background, scene.canvas_size, view)?,
            None => pixmap.fill(Color::WHITE),
        }

        for node in &scene.nodes {
            self.paint_node(pixmap, node, view)?;
        }
        Ok(())
    }

    fn paint_background(
        &self,
        pixmap: &mut Pixmap,
        background: &BackgroundStyle,
        canvas: Size,
        view: Affine,
    ) -> RenderResult<()> {
        let Some(page) = rect_path(0.0, 0.0, canvas.width as f32, canvas.height as f32) else {
            return Ok(());
        };
        let transform = to_skia_transform(view);

        match background {
            BackgroundStyle::Solid { color } => {
                pixmap.fill_path(&page, &solid_paint(*color), FillRule::Winding, transform, None);
            }
            BackgroundStyle::Gradient { from, to, angle } => {
                let mut paint = solid_paint(*from);
                if let Some(shader) = gradient_shader(*from, *to, *angle, canvas) {
                    paint.shader = shader;
                }
                pixmap.fill_path(&page, &paint, FillRule::Winding, transform, None);
            }
            BackgroundStyle::Image { src } => {
                pixmap.fill_path(&page, &solid_paint(SerializableColor::white()), FillRule::Winding, transform, None);
                let image = self.image(src)?;
                let mut paint = Paint::default();
                paint.anti_alias = true;
                paint.shader = cover_shader(image, canvas, 1.0);
                pixmap.fill_path(&page, &paint, FillRule::Winding, transform, None);
            }
        }
        Ok(())
    }

    fn paint_node(&self, pixmap: &mut Pixmap, node: &SceneNode<'_>, view: Affine) -> RenderResult<()> {
        let transform = to_skia_transform(view * node.affine);
        match node.content {
            ElementContent::Shape(shape) => {
                paint_shape(pixmap, shape, node.size, transform);
                Ok(())
            }
            ElementContent::Image(image) => self.paint_image(pixmap, image, node.size, transform),
            ElementContent::Text(text) => {
                self.paint_text(pixmap, text, node.size, transform);
                Ok(())
            }
        }
    }

    fn image(&self, src: &str) -> RenderResult<&'a Pixmap> {
        self.images.get(src).ok_or_else(|| RenderError::ImageLoad {
            src: src.to_string(),
            reason: "image was not loaded before rendering".to_string(),
        })
    }

    fn paint_image(
        &self,
        pixmap: &mut Pixmap,
        image: &ImageContent,
        size: Size,
        transform: SkiaTransform,
    ) -> RenderResult<()> {
        let source = self.image(&image.src)?;
        let (w, h) = (size.width as f32, size.height as f32);
        let radius = image.corner_radius() as f32;
        let Some(clip) = rounded_rect_path(0.0, 0.0, w, h, radius) else {
            return Ok(());
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.shader = cover_shader(source, size, image.opacity.clamp(0.0, 1.0) as f32);
        pixmap.fill_path(&clip, &paint, FillRule::Winding, transform, None);

        if let Some(border) = image.border.filter(|b| b.width > 0.0) {
            let inset = (border.width as f32 / 2.0).min(w / 2.0).min(h / 2.0);
            let outline = rounded_rect_path(
                inset,
                inset,
                w - 2.0 * inset,
                h - 2.0 * inset,
                (radius - inset).max(0.0),
            );
            if let Some(outline) = outline {
                let color = border.color.with_opacity(image.opacity);
                let stroke = Stroke {
                    width: border.width as f32,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&outline, &solid_paint(color), &stroke, transform, None);
            }
        }
        Ok(())
    }

    fn paint_text(&self, pixmap: &mut Pixmap, text: &TextContent, size: Size, transform: SkiaTransform) {
        if text.content.trim().is_empty() {
            return;
        }
        let Some(face) = self.fonts.resolve(&text.font_family, text.font_weight, text.font_style) else {
            log::warn!("No font registered for '{}', skipping text", text.font_family);
            return;
        };

        let lines = layout(face.font, text, size.width as f32);
        let Some(path) = text_path(face.font, text.font_size, face.slant, &lines) else {
            return;
        };
        pixmap.fill_path(&path, &solid_paint(text.color), FillRule::Winding, transform, None);

        if let Some(outline) = text.active_stroke() {
            let stroke = Stroke {
                width: outline.width as f32,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &solid_paint(outline.color), &stroke, transform, None);
        }
    }
}

fn paint_shape(pixmap: &mut Pixmap, shape: &ShapeContent, size: Size, transform: SkiaTransform) {
    let (w, h) = (size.width as f32, size.height as f32);
    let fill = shape.fill.with_opacity(shape.opacity);
    let stroke_color = shape.stroke.with_opacity(shape.opacity);

    if shape.shape_kind == ShapeKind::Line {
        let thickness = (shape.line_thickness() as f32).min(h.max(1.0));
        if let Some(bar) = rect_path(0.0, (h - thickness) / 2.0, w, thickness) {
            pixmap.fill_path(&bar, &solid_paint(stroke_color), FillRule::Winding, transform, None);
        }
        return;
    }

    let stroke_width = shape.stroke_width.max(0.0) as f32;
    let inset = (stroke_width / 2.0).min(w / 2.0).min(h / 2.0);
    let outline = |inset: f32| -> Option<Path> {
        let (x, y, w, h) = (inset, inset, w - 2.0 * inset, h - 2.0 * inset);
        match shape.shape_kind {
            ShapeKind::Circle => SkiaRect::from_xywh(x, y, w, h).and_then(PathBuilder::from_oval),
            ShapeKind::Polygon => {
                let mut pb = PathBuilder::new();
                pb.move_to(x + w / 2.0, y);
                pb.line_to(x + w, y + h);
                pb.line_to(x, y + h);
                pb.close();
                pb.finish()
            }
            _ => rect_path(x, y, w, h),
        }
    };

    if !fill.is_transparent() {
        if let Some(path) = outline(0.0) {
            pixmap.fill_path(&path, &solid_paint(fill), FillRule::Winding, transform, None);
        }
    }
    if stroke_width > 0.0 && !stroke_color.is_transparent() {
        if let Some(path) = outline(inset) {
            let stroke = Stroke {
                width: stroke_width,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &solid_paint(stroke_color), &stroke, transform, None);
        }
    }
}

/// CSS-style linear gradient across the page: 0° runs bottom to top, 90° left to right.
fn gradient_shader(
    from: SerializableColor,
    to: SerializableColor,
    angle: f64,
    canvas: Size,
) -> Option<Shader<'static>> {
    let radians = angle.to_radians();
    let direction = Vec2::new(radians.sin(), -radians.cos());
    let length = (canvas.width * radians.sin()).abs() + (canvas.height * radians.cos()).abs();
    let center = Vec2::new(canvas.width / 2.0, canvas.height / 2.0);
    let start = center - direction * (length / 2.0);
    let end = center + direction * (length / 2.0);

    LinearGradient::new(
        SkiaPoint::from_xy(start.x as f32, start.y as f32),
        SkiaPoint::from_xy(end.x as f32, end.y as f32),
        vec![
            GradientStop::new(0.0, to_skia_color(from)),
            GradientStop::new(1.0, to_skia_color(to)),
        ],
        SpreadMode::Pad,
        SkiaTransform::identity(),
    )
}
