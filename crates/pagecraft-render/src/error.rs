//! Error types for rendering and export.

use pagecraft_core::StorageError;
use thiserror::Error;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to load image {src}: {reason}")]
    ImageLoad { src: String, reason: String },
    #[error("Failed to decode image {src}: {reason}")]
    ImageDecode { src: String, reason: String },
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Font error: {0}")]
    Font(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Render error on page {page_id}: {source}")]
    Render {
        page_id: String,
        #[source]
        source: RenderError,
    },
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("Album {0} has no pages")]
    EmptyAlbum(String),
}

impl From<lopdf::Error> for ExportError {
    fn from(e: lopdf::Error) -> Self {
        ExportError::Pdf(e.to_string())
    }
}
