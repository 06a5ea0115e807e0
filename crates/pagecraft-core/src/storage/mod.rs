//! Persistence bridge: page loading/saving and album page lists.

mod autosave;
mod file;
mod memory;

pub use autosave::{DebouncedSaver, SaveHandle, SaveStatus, SaverConfig};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::document::{ImportError, PageDocument, PagePayload};
use chrono::{DateTime, Utc};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<ImportError> for StorageError {
    fn from(e: ImportError) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A page as returned by the persistence bridge.
///
/// `elements` is kept raw so that importing can skip and report bad entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPage {
    pub canvas_size: Size,
    #[serde(default)]
    pub elements: serde_json::Value,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl LoadedPage {
    /// Decode into a document, returning import diagnostics alongside.
    pub fn into_document(self, page_id: &str) -> Result<(PageDocument, Vec<String>), ImportError> {
        let payload = serde_json::json!({
            "canvasSize": self.canvas_size,
            "elements": self.elements,
        });
        let (mut document, diagnostics) = PageDocument::from_payload(page_id, &payload)?;
        document.version = self.version;
        document.last_modified = self.last_modified;
        Ok((document, diagnostics))
    }
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReceipt {
    pub last_modified: DateTime<Utc>,
}

/// Loads and saves individual pages.
pub trait PageStore: Send + Sync {
    fn load_page(&self, page_id: &str) -> BoxFuture<'_, StorageResult<LoadedPage>>;

    fn save_page(&self, page_id: &str, payload: &PagePayload) -> BoxFuture<'_, StorageResult<SaveReceipt>>;
}

/// Lists the pages of an album in order.
pub trait AlbumSource: Send + Sync {
    fn album_pages(&self, album_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

/// Build the record written for a save.
fn stored_page(payload: &PagePayload, version: u64, now: DateTime<Utc>) -> StorageResult<LoadedPage> {
    let elements =
        serde_json::to_value(&payload.elements).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(LoadedPage {
        canvas_size: payload.canvas_size,
        elements,
        version,
        last_modified: Some(now),
    })
}

#[cfg(test)]
pub(crate) mod test_util {
    /// Minimal executor for futures that never actually wait.
    pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }
}
