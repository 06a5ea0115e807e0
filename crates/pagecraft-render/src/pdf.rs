//! Paginated PDF output built from page rasters.

use crate::error::ExportError;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use serde::{Deserialize, Serialize};

/// PDF points per canvas pixel at 96 dpi.
pub const POINTS_PER_PIXEL: f64 = 0.75;

/// Physical page preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    A4,
    A5,
    Letter,
    Square,
    /// Page sized to the canvas pixel dimensions.
    Original,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl ExportFormat {
    /// Portrait size in points, `None` for [`ExportFormat::Original`].
    pub fn preset_points(self) -> Option<(f64, f64)> {
        match self {
            ExportFormat::A4 => Some((595.28, 841.89)),
            ExportFormat::A5 => Some((419.53, 595.28)),
            ExportFormat::Letter => Some((612.0, 792.0)),
            ExportFormat::Square => Some((576.0, 576.0)),
            ExportFormat::Original => None,
        }
    }

    /// Page size in points for a raster of the given pixel size.
    pub fn page_size(self, orientation: Orientation, pixel_width: u32, pixel_height: u32) -> (f64, f64) {
        match self.preset_points() {
            Some((w, h)) => match orientation {
                Orientation::Portrait => (w, h),
                Orientation::Landscape => (h, w),
            },
            None => (
                pixel_width as f64 * POINTS_PER_PIXEL,
                pixel_height as f64 * POINTS_PER_PIXEL,
            ),
        }
    }
}

/// Where a raster lands on its page: `(x, y, width, height)` in points, PDF origin bottom-left.
pub fn place_raster(page: (f64, f64), pixel_width: u32, pixel_height: u32) -> (f64, f64, f64, f64) {
    let (page_w, page_h) = page;
    let (w, h) = (pixel_width.max(1) as f64, pixel_height.max(1) as f64);
    let scale = (page_w / w).min(page_h / h);
    let (draw_w, draw_h) = (w * scale, h * scale);
    ((page_w - draw_w) / 2.0, (page_h - draw_h) / 2.0, draw_w, draw_h)
}

/// Flatten onto white and encode as baseline JPEG.
pub fn encode_jpeg(raster: &RgbaImage, quality: f64) -> Result<Vec<u8>, ExportError> {
    let mut rgb = Vec::with_capacity(raster.width() as usize * raster.height() as usize * 3);
    for px in raster.pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u16;
        let over_white = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        rgb.extend_from_slice(&[over_white(r), over_white(g), over_white(b)]);
    }

    let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(&rgb, raster.width(), raster.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(out)
}

/// Accumulates one image page per raster.
pub struct PdfBuilder {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    format: ExportFormat,
    orientation: Orientation,
    quality: f64,
}

impl PdfBuilder {
    pub fn new(format: ExportFormat, orientation: Orientation, quality: f64) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            format,
            orientation,
            quality,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn add_page(&mut self, raster: &RgbaImage) -> Result<(), ExportError> {
        let (px_w, px_h) = raster.dimensions();
        let jpeg = encode_jpeg(raster, self.quality)?;
        let image_id = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        let page_size = self.format.page_size(self.orientation, px_w, px_h);
        let (x, y, w, h) = place_raster(page_size, px_w, px_h);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        (w as f32).into(),
                        0.into(),
                        0.into(),
                        (h as f32).into(),
                        (x as f32).into(),
                        (y as f32).into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode()?;
        let content_id = self.document.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (page_size.0 as f32).into(), (page_size.1 as f32).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        self.kids.push(page_id.into());
        log::debug!(
            "Added PDF page {} ({}x{} px on {:.2}x{:.2} pt)",
            self.kids.len(),
            px_w,
            px_h,
            page_size.0,
            page_size.1
        );
        Ok(())
    }

    /// Write the page tree and catalog and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
        };
        self.document.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.document
            .save_to(&mut out)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        Ok(out)
    }
}
