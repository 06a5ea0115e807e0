//! PageCraft Core Library
//!
//! Element model, page documents and the editing engine for photo-album pages,
//! plus the persistence bridge shared with the export renderer.

pub mod background;
pub mod config;
pub mod document;
pub mod editor;
pub mod element;
pub mod history;
pub mod interaction;
pub mod picker;
pub mod resize;
pub mod selection;
pub mod snap;
pub mod storage;
pub mod text_edit;
pub mod viewport;

pub use background::{BackgroundResolver, BackgroundScope, BackgroundStyle, StaticBackgrounds};
pub use config::EditorConfig;
pub use document::{ImportError, PageDocument, PagePayload, import_elements};
pub use editor::{BackgroundRequest, Editor, TransformField};
pub use element::{Element, ElementContent, ElementId, ElementKind, ElementSpec, SerializableColor, Transform};
pub use history::HistoryManager;
pub use interaction::{DoubleClickAction, Modifiers, PointerDown, ToolKind};
pub use picker::{FilePicker, PickedImage};
pub use selection::{HandleKind, ResizeHandle, Selection};
pub use snap::GridSnap;
pub use storage::{
    AlbumSource, DebouncedSaver, FileStore, LoadedPage, MemoryStore, PageStore, SaveHandle, SaveStatus,
    StorageError, StorageResult,
};
pub use viewport::Viewport;
