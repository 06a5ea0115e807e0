//! Font registry and single-box text layout.

use crate::error::{RenderError, RenderResult};
use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve, PxScale, ScaleFont};
use pagecraft_core::element::{FontStyle, FontWeight, TextAlign, TextContent};
use std::collections::HashMap;
use std::path::Path;
use tiny_skia::{Path as SkiaPath, PathBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FaceKey {
    family: String,
    weight: FontWeight,
    style: FontStyle,
}

impl FaceKey {
    fn new(family: &str, weight: FontWeight, style: FontStyle) -> Self {
        Self {
            family: family.trim().to_ascii_lowercase(),
            weight,
            style,
        }
    }
}

/// Registered font faces keyed by family, weight and style.
#[derive(Default, Clone)]
pub struct FontBook {
    faces: HashMap<FaceKey, FontArc>,
    fallback: Option<FontArc>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face from raw font data. The first face registered becomes the fallback.
    pub fn register(
        &mut self,
        family: &str,
        weight: FontWeight,
        style: FontStyle,
        data: Vec<u8>,
    ) -> RenderResult<()> {
        let font = FontArc::try_from_vec(data).map_err(|e| RenderError::Font(format!("{family}: {e}")))?;
        if self.fallback.is_none() {
            self.fallback = Some(font.clone());
        }
        self.faces.insert(FaceKey::new(family, weight, style), font);
        log::debug!("Registered font {} ({:?}, {:?})", family, weight, style);
        Ok(())
    }

    /// Register a font file. Weight and style are guessed from the file name
    /// (`Family-BoldItalic.ttf`).
    pub fn register_file(&mut self, path: &Path) -> RenderResult<()> {
        let data = std::fs::read(path).map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let (family, variant) = stem.split_once('-').unwrap_or((stem, ""));
        let variant = variant.to_ascii_lowercase();
        let weight = if variant.contains("bold") {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        let style = if variant.contains("italic") || variant.contains("oblique") {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        };
        self.register(family, weight, style, data)
    }

    pub fn is_empty(&self) -> bool {
        self.fallback.is_none()
    }

    /// Best face for the request: exact match, then the family's upright face of the
    /// same weight, then its regular face, then the fallback.
    pub fn resolve(&self, family: &str, weight: FontWeight, style: FontStyle) -> Option<ResolvedFace<'_>> {
        if let Some(font) = self.faces.get(&FaceKey::new(family, weight, style)) {
            return Some(ResolvedFace { font, slant: 0.0 });
        }
        let slant = if style == FontStyle::Italic { SYNTHETIC_SLANT } else { 0.0 };
        self.faces
            .get(&FaceKey::new(family, weight, FontStyle::Normal))
            .or_else(|| self.faces.get(&FaceKey::new(family, FontWeight::Normal, FontStyle::Normal)))
            .or(self.fallback.as_ref())
            .map(|font| ResolvedFace { font, slant })
    }
}

const SYNTHETIC_SLANT: f32 = 0.2;

/// A face picked for a text run.
#[derive(Clone, Copy)]
pub struct ResolvedFace<'a> {
    pub font: &'a FontArc,
    /// Horizontal shear applied to glyph outlines when no italic face exists.
    pub slant: f32,
}

/// A laid-out line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
    /// Baseline offset from the top of the box.
    pub baseline: f32,
    /// Left edge offset from the box's left side.
    pub x: f32,
}

fn measure<F: Font>(font: &F, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Greedy word wrap. Explicit newlines always break; a single word wider than
/// the box stays on its own line.
pub fn wrap_lines<F: Font>(font: &F, scale: PxScale, text: &str, max_width: f32) -> Vec<(String, f32)> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && measure(font, scale, &candidate) > max_width {
                let width = measure(font, scale, &current);
                lines.push((std::mem::take(&mut current), width));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        let width = measure(font, scale, &current);
        lines.push((current, width));
    }
    lines
}

/// Lay out text inside a box of the given width.
pub fn layout<F: Font>(font: &F, text: &TextContent, box_width: f32) -> Vec<TextLine> {
    let font_size = text.font_size.max(1.0) as f32;
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);
    let advance = text.line_advance().max(1.0) as f32;
    let glyph_height = scaled.ascent() - scaled.descent();
    let half_leading = (advance - glyph_height) / 2.0;

    wrap_lines(font, scale, &text.content, box_width)
        .into_iter()
        .enumerate()
        .map(|(i, (line, width))| {
            let x = match text.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (box_width - width) / 2.0,
                TextAlign::Right => box_width - width,
            };
            TextLine {
                text: line,
                width,
                baseline: i as f32 * advance + half_leading + scaled.ascent(),
                x,
            }
        })
        .collect()
}

/// Glyph outlines of the laid-out lines as a single fill path in box space.
pub fn text_path<F: Font>(font: &F, font_size: f64, slant: f32, lines: &[TextLine]) -> Option<SkiaPath> {
    let scale = PxScale::from(font_size.max(1.0) as f32);
    let scaled = font.as_scaled(scale);
    let h_factor = scaled.h_scale_factor();
    let v_factor = scaled.v_scale_factor();

    let mut builder = PathBuilder::new();
    for line in lines {
        let mut caret = line.x;
        let mut previous: Option<GlyphId> = None;
        for c in line.text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            if let Some(outline) = font.outline(id) {
                let map = |p: ab_glyph::Point| {
                    let y = p.y * v_factor;
                    (caret + p.x * h_factor + y * slant, line.baseline - y)
                };
                append_outline(&mut builder, &outline.curves, map);
            }
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
    }
    builder.finish()
}

fn append_outline(
    builder: &mut PathBuilder,
    curves: &[OutlineCurve],
    map: impl Fn(ab_glyph::Point) -> (f32, f32),
) {
    let mut last: Option<ab_glyph::Point> = None;
    for curve in curves {
        let start = match curve {
            OutlineCurve::Line(p0, _) | OutlineCurve::Quad(p0, _, _) | OutlineCurve::Cubic(p0, _, _, _) => *p0,
        };
        if last != Some(start) {
            if last.is_some() {
                builder.close();
            }
            let (x, y) = map(start);
            builder.move_to(x, y);
        }
        match curve {
            OutlineCurve::Line(_, p1) => {
                let (x, y) = map(*p1);
                builder.line_to(x, y);
                last = Some(*p1);
            }
            OutlineCurve::Quad(_, p1, p2) => {
                let (x1, y1) = map(*p1);
                let (x2, y2) = map(*p2);
                builder.quad_to(x1, y1, x2, y2);
                last = Some(*p2);
            }
            OutlineCurve::Cubic(_, p1, p2, p3) => {
                let (x1, y1) = map(*p1);
                let (x2, y2) = map(*p2);
                let (x3, y3) = map(*p3);
                builder.cubic_to(x1, y1, x2, y2, x3, y3);
                last = Some(*p3);
            }
        }
    }
    if last.is_some() {
        builder.close();
    }
}
