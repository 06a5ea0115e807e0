//! Pointer gesture state for the interaction controller.

use crate::element::{ElementId, ShapeKind, Transform};
use crate::selection::{HandleKind, ResizeHandle};
use kurbo::{Point, Size, Vec2};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Additive selection.
    pub shift: bool,
    pub ctrl: bool,
    /// Copy-drag.
    pub alt: bool,
}

impl Modifiers {
    pub fn additive(&self) -> bool {
        self.shift || self.ctrl
    }
}

/// Counts the global pointer listeners held by in-flight gestures.
#[derive(Debug, Clone, Default)]
pub struct PointerListeners(Arc<AtomicUsize>);

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gestures currently holding listeners.
    pub fn active(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn capture(&self) -> PointerCapture {
        self.0.fetch_add(1, Ordering::SeqCst);
        PointerCapture {
            counter: Arc::clone(&self.0),
        }
    }
}

/// Listener registration for one gesture. Released when dropped, so every
/// exit path (drop, cancel, owner teardown) gives it back.
#[derive(Debug)]
pub struct PointerCapture {
    counter: Arc<AtomicUsize>,
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Moving one or more elements.
#[derive(Debug)]
pub struct DragGesture {
    /// Transforms of every element that moves, as they were at drag start.
    pub originals: Vec<(ElementId, Transform)>,
    /// Screen position at drag start.
    pub start: Point,
    /// Copy modifier held at drag start: drop creates duplicates.
    pub copy: bool,
    /// Latest document-space delta.
    pub delta: Vec2,
    _capture: PointerCapture,
}

impl DragGesture {
    pub fn new(
        originals: Vec<(ElementId, Transform)>,
        start: Point,
        copy: bool,
        capture: PointerCapture,
    ) -> Self {
        Self {
            originals,
            start,
            copy,
            delta: Vec2::ZERO,
            _capture: capture,
        }
    }
}

/// Dragging a resize handle.
#[derive(Debug)]
pub struct ResizeGesture {
    pub element: ElementId,
    pub handle: ResizeHandle,
    pub original: Transform,
    pub aspect_ratio: Option<f64>,
    pub start: Point,
    _capture: PointerCapture,
}

impl ResizeGesture {
    pub fn new(
        element: ElementId,
        handle: ResizeHandle,
        original: Transform,
        aspect_ratio: Option<f64>,
        start: Point,
        capture: PointerCapture,
    ) -> Self {
        Self {
            element,
            handle,
            original,
            aspect_ratio,
            start,
            _capture: capture,
        }
    }
}

/// Dragging the rotate handle.
#[derive(Debug)]
pub struct RotateGesture {
    pub element: ElementId,
    pub original: Transform,
    _capture: PointerCapture,
}

impl RotateGesture {
    pub fn new(element: ElementId, original: Transform, capture: PointerCapture) -> Self {
        Self {
            element,
            original,
            _capture: capture,
        }
    }
}

#[derive(Debug)]
pub enum Gesture {
    Drag(DragGesture),
    Resize(ResizeGesture),
    Rotate(RotateGesture),
}

impl Gesture {
    /// Elements whose transforms the gesture previews, with their originals.
    pub fn originals(&self) -> Vec<(ElementId, Transform)> {
        match self {
            Gesture::Drag(drag) if drag.copy => Vec::new(),
            Gesture::Drag(drag) => drag.originals.clone(),
            Gesture::Resize(resize) => vec![(resize.element.clone(), resize.original)],
            Gesture::Rotate(rotate) => vec![(rotate.element.clone(), rotate.original)],
        }
    }
}

/// What a pointer-down did.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerDown {
    /// A handle gesture started on the selected element.
    Handle(HandleKind),
    /// A drag started; the element is selected.
    Drag(ElementId),
    /// Selection changed but nothing can move (locked, toggled off, or being edited).
    Selected(ElementId),
    /// Empty space: selection cleared.
    Cleared,
    /// Another gesture is still running.
    Ignored,
}

/// What a double-click asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoubleClickAction {
    /// Inline editing started on a text element.
    EditText(ElementId),
    /// The caller should pick a replacement image for this element.
    RequestImage(ElementId),
}

/// Element kinds that can be dropped from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Text,
    Shape(ShapeKind),
}

impl ToolKind {
    /// Size of a freshly dropped element.
    pub fn default_size(self) -> Size {
        match self {
            ToolKind::Text => Size::new(200.0, 50.0),
            ToolKind::Shape(ShapeKind::Rectangle) => Size::new(150.0, 100.0),
            ToolKind::Shape(ShapeKind::Circle) => Size::new(100.0, 100.0),
            ToolKind::Shape(ShapeKind::Line) => Size::new(150.0, 20.0),
            ToolKind::Shape(ShapeKind::Polygon) => Size::new(120.0, 120.0),
        }
    }
}

/// Placeholder content for dropped text elements.
pub const DEFAULT_TEXT: &str = "Double-click to edit";
/// Box that dropped images are fitted into.
pub const IMAGE_DROP_BOX: f64 = 300.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_released_on_drop() {
        let listeners = PointerListeners::new();
        let gesture = Gesture::Rotate(RotateGesture::new(
            ElementId::from("a"),
            Transform::new(0.0, 0.0, 10.0, 10.0),
            listeners.capture(),
        ));
        assert_eq!(listeners.active(), 1);
        drop(gesture);
        assert_eq!(listeners.active(), 0);
    }

    #[test]
    fn test_copy_drag_previews_nothing() {
        let listeners = PointerListeners::new();
        let originals = vec![(ElementId::from("a"), Transform::new(0.0, 0.0, 10.0, 10.0))];
        let copy = Gesture::Drag(DragGesture::new(originals.clone(), Point::ZERO, true, listeners.capture()));
        assert!(copy.originals().is_empty());
        let plain = Gesture::Drag(DragGesture::new(originals, Point::ZERO, false, listeners.capture()));
        assert_eq!(plain.originals().len(), 1);
        assert_eq!(listeners.active(), 2);
    }
}
