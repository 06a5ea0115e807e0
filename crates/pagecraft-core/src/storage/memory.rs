//! In-memory page store.

use super::{
    AlbumSource, BoxFuture, LoadedPage, PageStore, SaveReceipt, StorageError, StorageResult, stored_page,
};
use crate::document::PagePayload;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    pages: RwLock<HashMap<String, LoadedPage>>,
    albums: RwLock<HashMap<String, Vec<String>>>,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw page record, replacing any existing one.
    pub fn insert_page(&self, page_id: &str, page: LoadedPage) -> StorageResult<()> {
        self.pages.write().map_err(lock_error)?.insert(page_id.to_string(), page);
        Ok(())
    }

    /// Set the ordered page list of an album.
    pub fn set_album_pages(&self, album_id: &str, pages: Vec<String>) -> StorageResult<()> {
        self.albums.write().map_err(lock_error)?.insert(album_id.to_string(), pages);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.read().map(|p| p.len()).unwrap_or(0)
    }

    fn load_sync(&self, page_id: &str) -> StorageResult<LoadedPage> {
        let pages = self.pages.read().map_err(lock_error)?;
        pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(page_id.to_string()))
    }

    fn save_sync(&self, page_id: &str, payload: &PagePayload) -> StorageResult<SaveReceipt> {
        let mut pages = self.pages.write().map_err(lock_error)?;
        let version = pages.get(page_id).map(|p| p.version + 1).unwrap_or(1);
        let now = Utc::now();
        pages.insert(page_id.to_string(), stored_page(payload, version, now)?);
        Ok(SaveReceipt { last_modified: now })
    }

    fn album_sync(&self, album_id: &str) -> StorageResult<Vec<String>> {
        let albums = self.albums.read().map_err(lock_error)?;
        albums
            .get(album_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(album_id.to_string()))
    }
}

impl PageStore for MemoryStore {
    fn load_page(&self, page_id: &str) -> BoxFuture<'_, StorageResult<LoadedPage>> {
        let result = self.load_sync(page_id);
        Box::pin(async move { result })
    }

    fn save_page(&self, page_id: &str, payload: &PagePayload) -> BoxFuture<'_, StorageResult<SaveReceipt>> {
        let result = self.save_sync(page_id, payload);
        Box::pin(async move { result })
    }
}

impl AlbumSource for MemoryStore {
    fn album_pages(&self, album_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = self.album_sync(album_id);
        Box::pin(async move { result })
    }
}
