//! PageCraft Render Library
//!
//! Headless rendering of album pages: scene building, text layout, tiled
//! rasterization with tiny-skia, and PDF/PNG export.

mod error;
pub mod export;
pub mod images;
mod paint;
pub mod pdf;
pub mod progress;
pub mod raster;
pub mod scene;
pub mod text;

pub use error::{ExportError, RenderError, RenderResult};
pub use export::{AlbumExporter, ExportBlob, ExportOptions};
pub use images::{FsImageLoader, ImageLoader, ImageSet};
pub use paint::{Painter, cover_fit};
pub use pdf::{ExportFormat, Orientation, PdfBuilder};
pub use progress::{ExportPhase, ExportProgress};
pub use raster::{DEFAULT_MAX_TILE_SIZE, PageRaster, TileGrid, rasterize};
pub use scene::PageScene;
pub use text::FontBook;
