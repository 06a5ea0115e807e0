//! Page rasterization, tiled when the page exceeds the surface limit.

use crate::error::{RenderError, RenderResult};
use crate::images::ImageSet;
use crate::paint::Painter;
use crate::scene::PageScene;
use crate::text::FontBook;
use image::RgbaImage;
use kurbo::Vec2;
use tiny_skia::Pixmap;

/// Largest surface rendered in one pass.
pub const DEFAULT_MAX_TILE_SIZE: u32 = 4096;

/// One tile of a page: its offset and size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tile layout covering a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, max_tile: u32) -> Self {
        let max_tile = max_tile.max(1);
        let columns = width.div_ceil(max_tile).max(1);
        let rows = height.div_ceil(max_tile).max(1);

        let mut tiles = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let x = column * max_tile;
                let y = row * max_tile;
                tiles.push(Tile {
                    x,
                    y,
                    width: max_tile.min(width - x),
                    height: max_tile.min(height - y),
                });
            }
        }
        Self { columns, rows, tiles }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_single(&self) -> bool {
        self.tiles.len() == 1
    }
}

/// Result of rasterizing a page: straight-alpha RGBA pixels.
#[derive(Debug)]
pub struct PageRaster {
    pub image: RgbaImage,
    /// Tiles used to produce the image; 1 for a direct render.
    pub tile_count: usize,
}

impl PageRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| RenderError::Surface(format!("cannot allocate {width}x{height}")))
}

fn copy_into(target: &mut RgbaImage, pixmap: &Pixmap, x: u32, y: u32) {
    let width = pixmap.width();
    for (i, px) in pixmap.pixels().iter().enumerate() {
        let color = px.demultiply();
        let tx = x + i as u32 % width;
        let ty = y + i as u32 / width;
        target.put_pixel(tx, ty, image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]));
    }
}

/// Rasterize a page at one pixel per canvas unit.
///
/// Pages no larger than `max_tile` in both dimensions are painted in one pass;
/// larger pages are painted tile by tile, each shifted by the negative tile
/// offset, and composited onto a full-size image.
pub fn rasterize(
    scene: &PageScene<'_>,
    fonts: &FontBook,
    images: &ImageSet,
    max_tile: u32,
) -> RenderResult<PageRaster> {
    let (width, height) = scene.pixel_size();
    let painter = Painter::new(fonts, images);
    let grid = TileGrid::new(width, height, max_tile);
    let mut target = RgbaImage::new(width, height);

    if grid.is_single() {
        let mut pixmap = new_pixmap(width, height)?;
        painter.paint(&mut pixmap, scene, Vec2::ZERO)?;
        copy_into(&mut target, &pixmap, 0, 0);
    } else {
        log::debug!(
            "Rasterizing {}x{} page in {}x{} tiles",
            width,
            height,
            grid.columns,
            grid.rows
        );
        for tile in grid.tiles() {
            let mut pixmap = new_pixmap(tile.width, tile.height)?;
            painter.paint(&mut pixmap, scene, Vec2::new(tile.x as f64, tile.y as f64))?;
            copy_into(&mut target, &pixmap, tile.x, tile.y);
        }
    }

    Ok(PageRaster {
        image: target,
        tile_count: grid.tiles().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use pagecraft_core::element::ShapeKind;
    use pagecraft_core::{BackgroundStyle, ElementSpec, PageDocument, SerializableColor};

    #[test]
    fn test_grid_for_wide_page() {
        let grid = TileGrid::new(5000, 3000, 4096);
        assert_eq!((grid.columns, grid.rows), (2, 1));
        assert_eq!(
            grid.tiles()[1],
            Tile {
                x: 4096,
                y: 0,
                width: 904,
                height: 3000
            }
        );
    }

    #[test]
    fn test_grid_at_limit_is_single() {
        assert!(TileGrid::new(4096, 4096, 4096).is_single());
        assert_eq!(TileGrid::new(4097, 10, 4096).tiles().len(), 2);
    }

    fn seam_document(width: f64, height: f64) -> PageDocument {
        let mut doc = PageDocument::new("p", Size::new(width, height));
        doc.background = Some(BackgroundStyle::Gradient {
            from: SerializableColor::new(255, 200, 0, 255),
            to: SerializableColor::new(0, 40, 120, 255),
            angle: 90.0,
        });
        let mut bar = ElementSpec::shape(width * 0.2, height * 0.3, width * 0.6, height * 0.2, ShapeKind::Circle);
        bar.transform.rotation = 20.0;
        doc.push(bar.into_element(0));
        doc.push(ElementSpec::shape(width * 0.1, height * 0.7, width * 0.8, 8.0, ShapeKind::Line).into_element(1));
        doc
    }

    #[test]
    fn test_tiled_matches_direct_render() {
        // A small max tile forces the tiled path on a page we can also render directly.
        let doc = seam_document(500.0, 300.0);
        let scene = PageScene::build(&doc);
        let fonts = FontBook::new();
        let images = ImageSet::new();

        let direct = rasterize(&scene, &fonts, &images, 4096).unwrap();
        let tiled = rasterize(&scene, &fonts, &images, 409).unwrap();
        assert_eq!(direct.tile_count, 1);
        assert_eq!(tiled.tile_count, 2);

        let max_diff = direct
            .image
            .as_raw()
            .iter()
            .zip(tiled.image.as_raw())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap_or(0);
        assert!(max_diff <= 8, "tiles differ by {max_diff}");
    }

    #[test]
    fn test_large_page_uses_two_tiles() {
        let doc = seam_document(5000.0, 3000.0);
        let scene = PageScene::build(&doc);
        let raster = rasterize(&scene, &FontBook::new(), &ImageSet::new(), DEFAULT_MAX_TILE_SIZE).unwrap();
        assert_eq!(raster.tile_count, 2);
        assert_eq!((raster.width(), raster.height()), (5000, 3000));

        // No seam: pixels on both sides of the tile boundary stay close.
        for y in [10u32, 1500, 2990] {
            let left = raster.image.get_pixel(4095, y).0;
            let right = raster.image.get_pixel(4096, y).0;
            for c in 0..4 {
                assert!(left[c].abs_diff(right[c]) <= 8, "seam at row {y}: {left:?} vs {right:?}");
            }
        }
    }
}
