//! Selection set and manipulation handles.

use crate::element::{Element, ElementId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;
/// Distance of the rotate handle above the top edge, in local units.
pub const ROTATE_HANDLE_OFFSET: f64 = 30.0;

/// Ordered set of selected element ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.ids.contains(id)
    }

    /// The only selected id, if exactly one element is selected.
    pub fn single(&self) -> Option<&ElementId> {
        match self.ids.as_slice() {
            [id] => Some(id),
            _ => None,
        }
    }

    /// Replace the selection with one id.
    pub fn select(&mut self, id: ElementId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Add or remove an id.
    pub fn toggle(&mut self, id: ElementId) {
        if let Some(index) = self.ids.iter().position(|s| s == &id) {
            self.ids.remove(index);
        } else {
            self.ids.push(id);
        }
    }

    /// Replace the selection with the given ids, keeping order and dropping duplicates.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Drop ids that no longer reference a live element.
    pub fn prune(&mut self, elements: &[Element]) {
        self.ids.retain(|id| elements.iter().any(|e| &e.id == id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// One of the eight resize handles around an element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    Nw,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Nw,
        ResizeHandle::N,
        ResizeHandle::Ne,
        ResizeHandle::E,
        ResizeHandle::Se,
        ResizeHandle::S,
        ResizeHandle::Sw,
        ResizeHandle::W,
    ];

    /// Handle moves the left edge.
    pub fn moves_west(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::W | ResizeHandle::Sw)
    }

    pub fn moves_east(self) -> bool {
        matches!(self, ResizeHandle::Ne | ResizeHandle::E | ResizeHandle::Se)
    }

    /// Handle moves the top edge.
    pub fn moves_north(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::N | ResizeHandle::Ne)
    }

    pub fn moves_south(self) -> bool {
        matches!(self, ResizeHandle::Sw | ResizeHandle::S | ResizeHandle::Se)
    }

    /// Position in the element's local box (`0..width`, `0..height`).
    fn local_position(self, width: f64, height: f64) -> Point {
        let x = if self.moves_west() {
            0.0
        } else if self.moves_east() {
            width
        } else {
            width / 2.0
        };
        let y = if self.moves_north() {
            0.0
        } else if self.moves_south() {
            height
        } else {
            height / 2.0
        };
        Point::new(x, y)
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Resize(ResizeHandle),
    Rotate,
}

/// A selection handle with its document-space position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Resize and rotate handles for an element, following its rotation.
pub fn get_handles(element: &Element) -> Vec<Handle> {
    let t = &element.transform;
    let affine = t.local_to_document();
    let mut handles: Vec<Handle> = ResizeHandle::ALL
        .iter()
        .map(|&h| Handle {
            position: affine * h.local_position(t.width, t.height),
            kind: HandleKind::Resize(h),
        })
        .collect();
    handles.push(Handle {
        position: affine * Point::new(t.width / 2.0, -ROTATE_HANDLE_OFFSET),
        kind: HandleKind::Rotate,
    });
    handles
}

/// Find the handle under a document point. `tolerance` is in document units.
pub fn hit_test_handles(element: &Element, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(element)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}
