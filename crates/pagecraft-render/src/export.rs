//! Album export: every page rendered headlessly into one paginated document.

use crate::error::{ExportError, RenderResult};
use crate::images::{ImageLoader, ImageSet};
use crate::pdf::{ExportFormat, Orientation, PdfBuilder};
use crate::progress::{ExportPhase, ExportProgress, ProgressTracker};
use crate::raster::{DEFAULT_MAX_TILE_SIZE, PageRaster, rasterize};
use crate::scene::PageScene;
use crate::text::FontBook;
use pagecraft_core::{AlbumSource, BackgroundResolver, BackgroundScope, PageDocument, PageStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_quality() -> f64 {
    0.92
}

fn default_max_tile_size() -> u32 {
    DEFAULT_MAX_TILE_SIZE
}

/// Options for an album export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// JPEG quality of embedded page images, 0 to 1.
    pub quality: f64,
    pub orientation: Orientation,
    pub max_tile_size: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            quality: default_quality(),
            orientation: Orientation::default(),
            max_tile_size: default_max_tile_size(),
        }
    }
}

/// Finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// Renders albums and pages without a display.
///
/// Exports run pages one at a time. Nothing guards against two exports running
/// concurrently on the same exporter; each call is independent.
pub struct AlbumExporter {
    fonts: FontBook,
    loader: Arc<dyn ImageLoader>,
    backgrounds: Option<(Arc<dyn BackgroundResolver>, BackgroundScope)>,
}

impl AlbumExporter {
    pub fn new(fonts: FontBook, loader: Arc<dyn ImageLoader>) -> Self {
        if fonts.is_empty() {
            log::warn!("No fonts registered, text elements will not be rendered");
        }
        Self {
            fonts,
            loader,
            backgrounds: None,
        }
    }

    /// Resolve page backgrounds through `resolver` when loading pages.
    pub fn with_backgrounds(mut self, resolver: Arc<dyn BackgroundResolver>, scope: BackgroundScope) -> Self {
        self.backgrounds = Some((resolver, scope));
        self
    }

    /// Export every page of an album, in album order, into one PDF.
    ///
    /// Any page that fails to load or render fails the whole export.
    pub async fn export_album<S>(
        &self,
        store: &S,
        album_id: &str,
        options: &ExportOptions,
        on_progress: impl FnMut(ExportProgress),
    ) -> Result<ExportBlob, ExportError>
    where
        S: AlbumSource + PageStore + ?Sized,
    {
        let mut progress = ProgressTracker::new(on_progress);
        progress.report(ExportPhase::Preparing);

        let page_ids = store.album_pages(album_id).await?;
        if page_ids.is_empty() {
            return Err(ExportError::EmptyAlbum(album_id.to_string()));
        }
        let total = page_ids.len();
        log::info!("Exporting album {} ({} pages, {:?})", album_id, total, options.format);

        let mut pdf = PdfBuilder::new(options.format, options.orientation, options.quality);
        progress.report(ExportPhase::Rendering { page: 0, total });
        for (i, page_id) in page_ids.iter().enumerate() {
            let document = self.load_document(store, album_id, page_id).await?;
            let raster = self
                .render_document(&document, options.max_tile_size)
                .await
                .map_err(|source| ExportError::Render {
                    page_id: page_id.clone(),
                    source,
                })?;
            pdf.add_page(&raster.image)?;
            progress.report(ExportPhase::Rendering { page: i + 1, total });
        }

        progress.report(ExportPhase::Generating);
        let data = pdf.finish()?;
        progress.report(ExportPhase::Complete);
        log::info!("Exported album {} ({} bytes)", album_id, data.len());

        Ok(ExportBlob {
            data,
            mime_type: "application/pdf",
        })
    }

    /// Load a page and resolve its background.
    pub async fn load_document<S>(&self, store: &S, album_id: &str, page_id: &str) -> Result<PageDocument, ExportError>
    where
        S: PageStore + ?Sized,
    {
        let loaded = store.load_page(page_id).await?;
        let (mut document, diagnostics) = loaded.into_document(page_id).map_err(StorageError::from)?;
        for diagnostic in &diagnostics {
            log::warn!("Page {}: {}", page_id, diagnostic);
        }

        if let Some((resolver, scope)) = &self.backgrounds {
            let owner = match scope {
                BackgroundScope::Page => page_id,
                BackgroundScope::Album => album_id,
            };
            document.background_scope = *scope;
            match resolver.get_background(owner, *scope).await {
                Ok(style) => document.background = style,
                Err(e) => log::warn!("No background for page {}: {}", page_id, e),
            }
        }
        Ok(document)
    }

    /// Load every image the page references, then rasterize it.
    pub async fn render_document(&self, document: &PageDocument, max_tile: u32) -> RenderResult<PageRaster> {
        let scene = PageScene::build(document);
        let images = ImageSet::load_all(self.loader.as_ref(), &scene.image_sources()).await?;
        rasterize(&scene, &self.fonts, &images, max_tile)
    }

    /// Render one page to PNG bytes.
    pub async fn render_page_png(&self, document: &PageDocument, max_tile: u32) -> Result<Vec<u8>, ExportError> {
        let raster = self
            .render_document(document, max_tile)
            .await
            .map_err(|source| ExportError::Render {
                page_id: document.page_id.clone(),
                source,
            })?;
        encode_png(&raster)
    }
}

fn encode_png(raster: &PageRaster) -> Result<Vec<u8>, ExportError> {
    let encode_error = |e: png::EncodingError| ExportError::Encode(e.to_string());
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, raster.width(), raster.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(encode_error)?;
    writer.write_image_data(raster.image.as_raw()).map_err(encode_error)?;
    writer.finish().map_err(encode_error)?;
    Ok(out)
}
