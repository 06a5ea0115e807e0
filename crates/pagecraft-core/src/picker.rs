//! File-pick collaborator used when replacing an image.

use crate::storage::BoxFuture;

/// A resource chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub src: String,
    pub alt: String,
}

/// Asks the user for an image. Resolves to `None` when the pick is cancelled.
pub trait FilePicker: Send + Sync {
    fn pick_image(&self) -> BoxFuture<'_, Option<PickedImage>>;
}
