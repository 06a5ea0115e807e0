//! JSON file page store.
//!
//! Layout under the base directory:
//! - `pages/<page>.json` holds one page record
//! - `albums/<album>.json` holds `{"pages": [...]}`

use super::{
    AlbumSource, BoxFuture, LoadedPage, PageStore, SaveReceipt, StorageError, StorageResult, stored_page,
};
use crate::document::PagePayload;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlbumIndex {
    pages: Vec<String>,
}

/// File-based storage for pages and album indexes.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path`, creating directories as needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        for dir in [base_path.join("pages"), base_path.join("albums")] {
            fs::create_dir_all(&dir).map_err(|e| {
                StorageError::Io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/pagecraft/`
    /// On Windows: `%LOCALAPPDATA%\pagecraft\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("pagecraft"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn page_path(&self, page_id: &str) -> PathBuf {
        self.base_path.join("pages").join(format!("{}.json", sanitize(page_id)))
    }

    fn album_path(&self, album_id: &str) -> PathBuf {
        self.base_path.join("albums").join(format!("{}.json", sanitize(album_id)))
    }

    /// Write the ordered page list of an album.
    pub fn set_album_pages(&self, album_id: &str, pages: Vec<String>) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&AlbumIndex { pages })
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_file(&self.album_path(album_id), &json)
    }

    fn load_sync(&self, page_id: &str) -> StorageResult<LoadedPage> {
        let path = self.page_path(page_id);
        if !path.exists() {
            return Err(StorageError::NotFound(page_id.to_string()));
        }
        let json = read_file(&path)?;
        serde_json::from_str(&json).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn save_sync(&self, page_id: &str, payload: &PagePayload) -> StorageResult<SaveReceipt> {
        let version = match self.load_sync(page_id) {
            Ok(existing) => existing.version + 1,
            Err(StorageError::NotFound(_)) => 1,
            Err(e) => {
                log::warn!("Overwriting unreadable page {}: {}", page_id, e);
                1
            }
        };
        let now = Utc::now();
        let record = stored_page(payload, version, now)?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_file(&self.page_path(page_id), &json)?;
        log::debug!("Saved page {} (version {})", page_id, version);
        Ok(SaveReceipt { last_modified: now })
    }

    fn album_sync(&self, album_id: &str) -> StorageResult<Vec<String>> {
        let path = self.album_path(album_id);
        if !path.exists() {
            return Err(StorageError::NotFound(album_id.to_string()));
        }
        let index: AlbumIndex = serde_json::from_str(&read_file(&path)?)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(index.pages)
    }
}

/// Keep ids safe for use as file names.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn read_file(path: &Path) -> StorageResult<String> {
    fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

fn write_file(path: &Path, contents: &str) -> StorageResult<()> {
    fs::write(path, contents)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

impl PageStore for FileStore {
    fn load_page(&self, page_id: &str) -> BoxFuture<'_, StorageResult<LoadedPage>> {
        let result = self.load_sync(page_id);
        Box::pin(async move { result })
    }

    fn save_page(&self, page_id: &str, payload: &PagePayload) -> BoxFuture<'_, StorageResult<SaveReceipt>> {
        let result = self.save_sync(page_id, payload);
        Box::pin(async move { result })
    }
}

impl AlbumSource for FileStore {
    fn album_pages(&self, album_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = self.album_sync(album_id);
        Box::pin(async move { result })
    }
}
