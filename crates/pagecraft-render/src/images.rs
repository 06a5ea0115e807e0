//! Image resolution and decoding.

use crate::error::{RenderError, RenderResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pagecraft_core::storage::BoxFuture;
use std::collections::HashMap;
use std::path::PathBuf;
use tiny_skia::{IntSize, Pixmap};

/// Fetches the raw bytes behind an image reference.
pub trait ImageLoader: Send + Sync {
    fn load(&self, src: &str) -> BoxFuture<'_, RenderResult<Vec<u8>>>;
}

/// Resolves `data:` URIs and file paths relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    base_dir: PathBuf,
}

impl FsImageLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn read(&self, src: &str) -> RenderResult<Vec<u8>> {
        if let Some(rest) = src.strip_prefix("data:") {
            return decode_data_uri(src, rest);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Err(RenderError::ImageLoad {
                src: src.to_string(),
                reason: "remote images are not supported".to_string(),
            });
        }

        let relative = src.strip_prefix("file://").unwrap_or(src);
        let path = self.base_dir.join(relative);
        std::fs::read(&path).map_err(|e| RenderError::ImageLoad {
            src: src.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, src: &str) -> BoxFuture<'_, RenderResult<Vec<u8>>> {
        let result = self.read(src);
        Box::pin(async move { result })
    }
}

fn decode_data_uri(src: &str, rest: &str) -> RenderResult<Vec<u8>> {
    let load_error = |reason: &str| RenderError::ImageLoad {
        src: truncate_src(src),
        reason: reason.to_string(),
    };
    let (meta, data) = rest.split_once(',').ok_or_else(|| load_error("malformed data URI"))?;
    if !meta.ends_with(";base64") {
        return Err(load_error("only base64 data URIs are supported"));
    }
    STANDARD
        .decode(data.trim())
        .map_err(|e| load_error(&e.to_string()))
}

/// Keep data URIs short in error messages.
fn truncate_src(src: &str) -> String {
    match src.char_indices().nth(48) {
        Some((end, _)) => format!("{}...", &src[..end]),
        None => src.to_string(),
    }
}

/// Decode encoded image bytes into a premultiplied pixmap.
pub fn decode_pixmap(src: &str, bytes: &[u8]) -> RenderResult<Pixmap> {
    let decoded = ::image::load_from_memory(bytes).map_err(|e| RenderError::ImageDecode {
        src: truncate_src(src),
        reason: e.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let size = IntSize::from_wh(width, height).ok_or_else(|| RenderError::ImageDecode {
        src: truncate_src(src),
        reason: "image has zero size".to_string(),
    })?;

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
            px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
            px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
        }
    }

    Pixmap::from_vec(data, size).ok_or_else(|| RenderError::Surface(format!("{width}x{height} image")))
}

/// Decoded images for one page, keyed by source reference.
#[derive(Default)]
pub struct ImageSet {
    images: HashMap<String, Pixmap>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and decode every source. The first failure aborts.
    pub async fn load_all(loader: &dyn ImageLoader, sources: &[&str]) -> RenderResult<Self> {
        let mut set = Self::new();
        for src in sources {
            if set.images.contains_key(*src) {
                continue;
            }
            let bytes = loader.load(src).await?;
            let pixmap = decode_pixmap(src, &bytes)?;
            log::debug!("Decoded image {} ({}x{})", truncate_src(src), pixmap.width(), pixmap.height());
            set.images.insert(src.to_string(), pixmap);
        }
        Ok(set)
    }

    pub fn insert(&mut self, src: impl Into<String>, pixmap: Pixmap) {
        self.images.insert(src.into(), pixmap);
    }

    pub fn get(&self, src: &str) -> Option<&Pixmap> {
        self.images.get(src)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
