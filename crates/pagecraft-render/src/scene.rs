//! Off-screen visual tree for a page.

use kurbo::{Affine, Size};
use pagecraft_core::{BackgroundStyle, Element, ElementContent, PageDocument};

/// One positioned box in the visual tree.
#[derive(Debug, Clone)]
pub struct SceneNode<'a> {
    /// Local box space (`0..width`, `0..height`) to page pixels.
    pub affine: Affine,
    pub size: Size,
    pub content: &'a ElementContent,
}

/// Everything needed to paint one page.
#[derive(Debug, Clone)]
pub struct PageScene<'a> {
    pub canvas_size: Size,
    pub background: Option<&'a BackgroundStyle>,
    /// Back to front.
    pub nodes: Vec<SceneNode<'a>>,
}

impl<'a> PageScene<'a> {
    /// Build the visual tree: hidden elements are dropped, the rest are stacked by
    /// z-index with ties kept in document order.
    pub fn build(document: &'a PageDocument) -> Self {
        let mut visible: Vec<&Element> = document.elements.iter().filter(|e| e.visible).collect();
        visible.sort_by_key(|e| e.z_index);

        let nodes = visible
            .into_iter()
            .filter(|e| e.transform.width > 0.0 && e.transform.height > 0.0)
            .map(|e| SceneNode {
                affine: e.transform.local_to_document(),
                size: Size::new(e.transform.width, e.transform.height),
                content: &e.content,
            })
            .collect();

        Self {
            canvas_size: document.canvas_size,
            background: document.background.as_ref(),
            nodes,
        }
    }

    /// Image sources referenced by the page, background first, without duplicates.
    pub fn image_sources(&self) -> Vec<&'a str> {
        let mut sources: Vec<&'a str> = Vec::new();
        if let Some(BackgroundStyle::Image { src }) = self.background {
            sources.push(src.as_str());
        }
        for node in &self.nodes {
            if let ElementContent::Image(image) = node.content {
                if !sources.contains(&image.src.as_str()) {
                    sources.push(image.src.as_str());
                }
            }
        }
        sources
    }

    /// Pixel dimensions of the page raster.
    pub fn pixel_size(&self) -> (u32, u32) {
        let width = self.canvas_size.width.round().max(1.0) as u32;
        let height = self.canvas_size.height.round().max(1.0) as u32;
        (width, height)
    }
}
