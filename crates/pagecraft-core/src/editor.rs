//! Editing engine: the document model, selection, history and gestures
//! behind one facade.

use crate::background::{BackgroundResolver, BackgroundScope};
use crate::config::EditorConfig;
use crate::document::{ImportError, PageDocument, PagePayload};
use crate::element::{
    Element, ElementContent, ElementId, ElementKind, ElementSpec, ImageContent, TextContent, Transform,
    fit_within,
};
use crate::history::HistoryManager;
use crate::interaction::{
    DEFAULT_TEXT, DoubleClickAction, DragGesture, Gesture, IMAGE_DROP_BOX, Modifiers, PointerDown,
    PointerListeners, ResizeGesture, RotateGesture, ToolKind,
};
use crate::picker::{FilePicker, PickedImage};
use crate::resize::{resize_transform, rotation_towards};
use crate::selection::{HANDLE_HIT_TOLERANCE, HandleKind, ResizeHandle, Selection, hit_test_handles};
use crate::snap::{GridSnap, normalize_degrees};
use crate::storage::{PageStore, SaveHandle, StorageResult};
use crate::text_edit::{InlineTextEdit, TextEditResult, TextKey, TextModifiers};
use crate::viewport::Viewport;
use chrono::Utc;
use kurbo::{Point, Size, Vec2};
use serde_json::Value;

/// Smallest width or height accepted from field input.
pub const MIN_FIELD_SIZE: f64 = 10.0;

/// Transform field edited through a numeric input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    X,
    Y,
    Width,
    Height,
    Rotation,
}

/// Where a loaded page's background comes from.
pub struct BackgroundRequest<'a> {
    pub resolver: &'a dyn BackgroundResolver,
    pub album_id: &'a str,
    pub scope: BackgroundScope,
}

/// Owns one page and everything needed to edit it.
pub struct Editor {
    document: PageDocument,
    selection: Selection,
    history: HistoryManager,
    pub viewport: Viewport,
    pub snap: GridSnap,
    config: EditorConfig,
    gesture: Option<Gesture>,
    text_edit: Option<InlineTextEdit>,
    listeners: PointerListeners,
    saver: Option<SaveHandle>,
    diagnostics: Vec<String>,
}

impl Editor {
    /// Create an editor for `document`. The config is sanitised first.
    pub fn new(document: PageDocument, config: EditorConfig) -> Self {
        let config = config.sanitized();
        let mut viewport = Viewport::new(document.canvas_size);
        viewport.padding = config.display_padding;
        Self {
            history: HistoryManager::with_limit(document.elements.clone(), config.history_limit),
            snap: GridSnap::new(config.snap_to_grid, config.grid_size),
            document,
            selection: Selection::new(),
            viewport,
            config,
            gesture: None,
            text_edit: None,
            listeners: PointerListeners::new(),
            saver: None,
            diagnostics: Vec::new(),
        }
    }

    /// Push every committed change to a running saver.
    pub fn attach_saver(&mut self, saver: SaveHandle) {
        self.saver = Some(saver);
    }

    /// The page being edited, including live gesture previews.
    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    /// Elements in storage order (not z order).
    pub fn elements(&self) -> &[Element] {
        &self.document.elements
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.document.get(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Undo stack, capped at the configured limit.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Notes recorded while importing payloads.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Snapshot in the shape sent to the persistence bridge.
    pub fn payload(&self) -> PagePayload {
        self.document.to_payload()
    }

    /// Gestures currently holding pointer listeners.
    pub fn active_pointer_listeners(&self) -> usize {
        self.listeners.active()
    }

    /// A drag, resize or rotate is in progress.
    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn text_edit(&self) -> Option<&InlineTextEdit> {
        self.text_edit.as_ref()
    }

    pub fn is_text_editing(&self, id: &ElementId) -> bool {
        self.text_edit.as_ref().is_some_and(|e| e.element_id() == id)
    }

    /// Record the live element list in history and schedule a save.
    fn commit(&mut self, action: &str) {
        self.history.commit(self.document.elements.clone());
        log::debug!("{} (history {}/{})", action, self.history.cursor() + 1, self.history.len());
        if let Some(saver) = &self.saver {
            saver.schedule(&self.document.page_id, self.document.to_payload());
        }
    }

    // Loading

    /// Replace the document with a raw page payload.
    ///
    /// A payload without an element array is rejected and the document is left untouched.
    pub fn import_payload(&mut self, payload: &Value) -> Result<(), ImportError> {
        match PageDocument::from_payload(self.document.page_id.clone(), payload) {
            Ok((mut document, diagnostics)) => {
                document.background = self.document.background.take();
                document.background_scope = self.document.background_scope;
                self.replace_document(document, diagnostics);
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected payload for page {}: {}", self.document.page_id, e);
                self.diagnostics.push(format!("payload rejected: {e}"));
                Err(e)
            }
        }
    }

    /// Load a page from the persistence bridge, replacing the current one.
    pub async fn load_page(
        &mut self,
        store: &dyn PageStore,
        page_id: &str,
        background: Option<BackgroundRequest<'_>>,
    ) -> StorageResult<()> {
        let loaded = store.load_page(page_id).await?;
        let (mut document, diagnostics) = loaded.into_document(page_id).inspect_err(|e| {
            self.diagnostics.push(format!("page {page_id} rejected: {e}"));
        })?;

        if let Some(request) = background {
            let owner = match request.scope {
                BackgroundScope::Page => page_id,
                BackgroundScope::Album => request.album_id,
            };
            document.background_scope = request.scope;
            match request.resolver.get_background(owner, request.scope).await {
                Ok(style) => document.background = style,
                Err(e) => log::warn!("No background for page {}: {}", page_id, e),
            }
        }

        log::info!("Loaded page {} ({} elements)", page_id, document.len());
        self.replace_document(document, diagnostics);
        Ok(())
    }

    fn replace_document(&mut self, document: PageDocument, diagnostics: Vec<String>) {
        self.gesture = None;
        self.text_edit = None;
        self.selection.clear();
        self.history.reset(document.elements.clone());
        self.viewport.canvas_size = document.canvas_size;
        self.diagnostics = diagnostics;
        self.document = document;
    }

    // Document model

    /// Add an element on top of the stack and make it the only selection.
    pub fn add_element(&mut self, spec: ElementSpec) -> ElementId {
        let element = spec.into_element(self.document.len() as i64);
        let id = element.id.clone();
        self.document.push(element);
        self.selection.select(id.clone());
        self.commit("add element");
        id
    }

    /// Mutate an element in place. Unknown ids are ignored.
    pub fn update_element(&mut self, id: &ElementId, f: impl FnOnce(&mut Element)) -> bool {
        let Some(element) = self.document.get_mut(id) else {
            return false;
        };
        f(element);
        element.touch();
        self.commit("update element");
        true
    }

    /// Remove an element, closing its inline edit and dropping it from the selection.
    pub fn delete_element(&mut self, id: &ElementId) -> bool {
        if self.document.remove(id).is_none() {
            return false;
        }
        if self.is_text_editing(id) {
            self.text_edit = None;
        }
        self.selection.prune(&self.document.elements);
        self.commit("delete element");
        true
    }

    /// Remove every selected element. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<ElementId> = self.selection.ids().to_vec();
        let before = self.document.len();
        self.document.elements.retain(|e| !ids.contains(&e.id));
        let removed = before - self.document.len();
        if self.text_edit.as_ref().is_some_and(|e| ids.contains(e.element_id())) {
            self.text_edit = None;
        }
        self.selection.clear();
        if removed > 0 {
            self.commit("delete selection");
        }
        removed
    }

    /// Copy an element with a fresh id, offset and selected. `None` if the source is missing.
    pub fn duplicate_element(&mut self, id: &ElementId) -> Option<ElementId> {
        let source = self.document.get(id)?;
        let mut transform = source.transform;
        transform.translate(Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset));
        let copy = self.copy_of(source, transform);
        let new_id = copy.id.clone();
        self.document.push(copy);
        self.selection.select(new_id.clone());
        self.commit("duplicate element");
        Some(new_id)
    }

    fn copy_of(&self, source: &Element, transform: Transform) -> Element {
        let now = Utc::now();
        Element {
            id: ElementId::generate(),
            transform,
            z_index: self.document.max_z().map(|z| z + 1).unwrap_or(0),
            created_at: now,
            updated_at: now,
            ..source.clone()
        }
    }

    /// Put the element above every other one. False for unknown ids.
    pub fn move_element_to_front(&mut self, id: &ElementId) -> bool {
        self.reorder(id, PageDocument::bring_to_front, "bring to front")
    }

    /// Put the element below every other one.
    pub fn move_element_to_back(&mut self, id: &ElementId) -> bool {
        self.reorder(id, PageDocument::send_to_back, "send to back")
    }

    /// Raise the z index by one.
    pub fn move_element_forward(&mut self, id: &ElementId) -> bool {
        self.reorder(id, PageDocument::bring_forward, "bring forward")
    }

    pub fn move_element_backward(&mut self, id: &ElementId) -> bool {
        self.reorder(id, PageDocument::send_backward, "send backward")
    }

    fn reorder(
        &mut self,
        id: &ElementId,
        f: fn(&mut PageDocument, &ElementId) -> bool,
        action: &str,
    ) -> bool {
        let changed = f(&mut self.document, id);
        if changed {
            self.commit(action);
        }
        changed
    }

    /// Translate an element by a document-space delta.
    pub fn move_element(&mut self, id: &ElementId, delta: Vec2) -> bool {
        self.update_element(id, |e| e.transform.translate(delta))
    }

    /// Apply a handle resize with a document-space delta.
    pub fn resize_element(&mut self, id: &ElementId, handle: ResizeHandle, delta: Vec2) -> bool {
        let Some(element) = self.document.get(id) else {
            return false;
        };
        let transform = resize_transform(&element.transform, handle, delta, element.locked_aspect_ratio(), &self.snap);
        self.update_element(id, |e| e.transform = transform)
    }

    /// Set rotation in degrees, normalised to `[0, 360)`.
    pub fn rotate_element(&mut self, id: &ElementId, degrees: f64) -> bool {
        if !degrees.is_finite() {
            return false;
        }
        self.update_element(id, |e| e.transform.rotation = normalize_degrees(degrees))
    }

    /// Move every selected, unlocked element. One history entry.
    pub fn nudge_selected(&mut self, dx: f64, dy: f64) -> usize {
        let snap = self.snap;
        let mut moved = 0;
        for id in self.selection.ids() {
            if let Some(element) = self.document.get_mut(id) {
                if element.locked {
                    continue;
                }
                let t = &mut element.transform;
                t.x = snap.snap(t.x + dx);
                t.y = snap.snap(t.y + dy);
                element.touch();
                moved += 1;
            }
        }
        if moved > 0 {
            self.commit("nudge selection");
        }
        moved
    }

    /// Set one transform field from user text. Non-numeric input is ignored.
    pub fn set_transform_field(&mut self, id: &ElementId, field: TransformField, input: &str) -> bool {
        let Ok(value) = input.trim().parse::<f64>() else {
            return false;
        };
        if !value.is_finite() {
            return false;
        }
        let Some(element) = self.document.get(id) else {
            return false;
        };
        let ratio = element.locked_aspect_ratio();
        let mut t = element.transform;
        match field {
            TransformField::X => t.x = value,
            TransformField::Y => t.y = value,
            TransformField::Width => {
                t.width = value.max(MIN_FIELD_SIZE);
                if let Some(ratio) = ratio {
                    t.height = t.width / ratio;
                }
            }
            TransformField::Height => {
                t.height = value.max(MIN_FIELD_SIZE);
                if let Some(ratio) = ratio {
                    t.width = t.height * ratio;
                }
            }
            TransformField::Rotation => t.rotation = normalize_degrees(value),
        }
        if let Some(ratio) = ratio {
            if t.width < MIN_FIELD_SIZE || t.height < MIN_FIELD_SIZE {
                if ratio >= 1.0 {
                    t.height = MIN_FIELD_SIZE;
                    t.width = MIN_FIELD_SIZE * ratio;
                } else {
                    t.width = MIN_FIELD_SIZE;
                    t.height = MIN_FIELD_SIZE / ratio;
                }
            }
        }
        self.update_element(id, |e| e.transform = t)
    }

    // Element creation from drops

    /// Drop a toolbar item centred at a screen point.
    pub fn drop_tool(&mut self, tool: ToolKind, screen: Point) -> ElementId {
        let size = tool.default_size();
        let origin = self.drop_origin(screen, size);
        let spec = match tool {
            ToolKind::Text => ElementSpec::text(origin.x, origin.y, size.width, size.height, DEFAULT_TEXT),
            ToolKind::Shape(kind) => ElementSpec::shape(origin.x, origin.y, size.width, size.height, kind),
        };
        self.add_element(spec)
    }

    /// Drop an image file centred at a screen point, fitted into the drop box with its aspect ratio locked.
    pub fn drop_image(&mut self, src: impl Into<String>, alt: impl Into<String>, natural: Size, screen: Point) -> ElementId {
        let (width, height) = fit_within(natural.width, natural.height, IMAGE_DROP_BOX, IMAGE_DROP_BOX);
        let size = Size::new(width.round().max(1.0), height.round().max(1.0));
        let origin = self.drop_origin(screen, size);
        let mut image = ImageContent::new(src);
        image.alt = alt.into();
        image.aspect_ratio_locked = true;
        let spec = ElementSpec::new(
            Transform::new(origin.x, origin.y, size.width, size.height),
            ElementContent::Image(image),
        );
        self.add_element(spec)
    }

    fn drop_origin(&self, screen: Point, size: Size) -> Point {
        let center = self.viewport.screen_to_canvas(screen);
        let origin = Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
        let snapped = self.snap.snap_point(origin);
        Point::new(snapped.x.round(), snapped.y.round())
    }

    // Selection

    /// Non-additive replaces the selection; additive toggles membership.
    pub fn select_element(&mut self, id: &ElementId, additive: bool) {
        if !self.document.contains(id) {
            return;
        }
        if additive {
            self.selection.toggle(id.clone());
        } else {
            self.selection.select(id.clone());
        }
    }

    /// Select every element on the page.
    pub fn select_all(&mut self) {
        self.selection.set(self.document.elements.iter().map(|e| e.id.clone()));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select exactly these ids; unknown ids are dropped.
    pub fn select_multiple(&mut self, ids: &[ElementId]) {
        let live = ids.iter().filter(|id| self.document.contains(id)).cloned();
        self.selection.set(live);
    }

    // History

    /// Step back one history entry.
    ///
    /// Any running gesture or inline edit is abandoned first and the selection is cleared.
    pub fn undo(&mut self) -> bool {
        self.abandon_interaction();
        match self.history.undo() {
            Some(snapshot) => {
                self.document.elements = snapshot.to_vec();
                self.selection.clear();
                self.schedule_save();
                true
            }
            None => false,
        }
    }

    /// Reapply the entry undone last.
    pub fn redo(&mut self) -> bool {
        self.abandon_interaction();
        match self.history.redo() {
            Some(snapshot) => {
                self.document.elements = snapshot.to_vec();
                self.selection.clear();
                self.schedule_save();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn schedule_save(&self) {
        if let Some(saver) = &self.saver {
            saver.schedule(&self.document.page_id, self.document.to_payload());
        }
    }

    /// Drop in-flight gesture and text edit, restoring their previews.
    fn abandon_interaction(&mut self) {
        self.cancel_gesture();
        self.cancel_text_edit();
    }

    // Pointer gestures

    /// Press at a screen point.
    ///
    /// A handle of the single selected element starts a resize or rotate.
    /// Otherwise the topmost element is selected (toggled with the additive
    /// modifier) and a drag begins, copying when Alt is held. Empty space
    /// clears the selection. Ignored while another gesture holds the pointer.
    pub fn pointer_down(&mut self, screen: Point, modifiers: Modifiers) -> PointerDown {
        if self.gesture.is_some() {
            return PointerDown::Ignored;
        }
        let point = self.viewport.screen_to_canvas(screen);

        if let Some(kind) = self.handle_at(point) {
            if let Some(id) = self.selection.single().cloned() {
                if self.begin_handle_gesture(&id, kind, screen) {
                    return PointerDown::Handle(kind);
                }
            }
        }

        let Some(id) = self.document.elements_at_point(point, 0.0).into_iter().next() else {
            self.commit_text_edit();
            self.selection.clear();
            return PointerDown::Cleared;
        };

        if self.is_text_editing(&id) {
            return PointerDown::Selected(id);
        }
        self.commit_text_edit();

        if modifiers.additive() {
            self.selection.toggle(id.clone());
        } else if !self.selection.contains(&id) {
            self.selection.select(id.clone());
        }

        if self.selection.contains(&id) && self.begin_drag(&id, screen, modifiers.alt) {
            PointerDown::Drag(id)
        } else {
            PointerDown::Selected(id)
        }
    }

    /// Handle under a document point on the single selected element.
    fn handle_at(&self, point: Point) -> Option<HandleKind> {
        let id = self.selection.single()?;
        let element = self.document.get(id)?;
        if element.locked || self.is_text_editing(id) {
            return None;
        }
        let tolerance = HANDLE_HIT_TOLERANCE / self.viewport.effective_scale();
        hit_test_handles(element, point, tolerance)
    }

    fn begin_handle_gesture(&mut self, id: &ElementId, kind: HandleKind, screen: Point) -> bool {
        let Some(element) = self.document.get(id) else {
            return false;
        };
        if element.locked {
            return false;
        }
        let capture = self.listeners.capture();
        self.gesture = Some(match kind {
            HandleKind::Resize(handle) => Gesture::Resize(ResizeGesture::new(
                id.clone(),
                handle,
                element.transform,
                element.locked_aspect_ratio(),
                screen,
                capture,
            )),
            HandleKind::Rotate => Gesture::Rotate(RotateGesture::new(id.clone(), element.transform, capture)),
        });
        true
    }

    /// Start dragging `id` (and the rest of the selection if it is part of it).
    ///
    /// Refused while the element is being text-edited, while another gesture
    /// (such as a resize) is active, or when nothing movable is involved.
    pub fn begin_drag(&mut self, id: &ElementId, screen: Point, copy: bool) -> bool {
        if self.gesture.is_some() || self.is_text_editing(id) {
            return false;
        }
        let Some(anchor) = self.document.get(id) else {
            return false;
        };
        if anchor.locked {
            return false;
        }

        let members: Vec<ElementId> = if self.selection.contains(id) && self.selection.len() > 1 {
            self.selection.ids().to_vec()
        } else {
            vec![id.clone()]
        };
        let originals: Vec<(ElementId, Transform)> = members
            .iter()
            .filter_map(|m| self.document.get(m))
            .filter(|e| !e.locked)
            .map(|e| (e.id.clone(), e.transform))
            .collect();

        let capture = self.listeners.capture();
        self.gesture = Some(Gesture::Drag(DragGesture::new(originals, screen, copy, capture)));
        true
    }

    /// Update the running gesture's live preview.
    pub fn pointer_move(&mut self, screen: Point) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        match gesture {
            Gesture::Drag(drag) => {
                drag.delta = self.viewport.screen_delta_to_canvas(screen - drag.start);
                if drag.copy {
                    return;
                }
                let delta = drag.delta;
                for (id, original) in &drag.originals {
                    if let Some(element) = self.document.get_mut(id) {
                        element.transform = Transform {
                            x: original.x + delta.x,
                            y: original.y + delta.y,
                            ..*original
                        };
                    }
                }
            }
            Gesture::Resize(resize) => {
                let delta = self.viewport.screen_delta_to_canvas(screen - resize.start);
                let transform =
                    resize_transform(&resize.original, resize.handle, delta, resize.aspect_ratio, &self.snap);
                if let Some(element) = self.document.get_mut(&resize.element) {
                    element.transform = transform;
                }
            }
            Gesture::Rotate(rotate) => {
                let point = self.viewport.screen_to_canvas(screen);
                let rotation = rotation_towards(&rotate.original, point, self.config.snap_rotation);
                if let Some(element) = self.document.get_mut(&rotate.element) {
                    element.transform.rotation = rotation;
                }
            }
        }
    }

    /// Finish the running gesture and commit its result as one history entry.
    pub fn pointer_up(&mut self, screen: Point) {
        self.pointer_move(screen);
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::Drag(drag) => self.finish_drag(drag),
            Gesture::Resize(resize) => self.finish_transform(&resize.element, resize.original, "resize element"),
            Gesture::Rotate(rotate) => self.finish_transform(&rotate.element, rotate.original, "rotate element"),
        }
    }

    fn finish_drag(&mut self, drag: DragGesture) {
        let delta = drag.delta;
        if delta.hypot2() < f64::EPSILON {
            self.restore(&drag.originals);
            return;
        }
        let snap = self.snap;
        let target = |original: &Transform| Transform {
            x: snap.snap(original.x + delta.x),
            y: snap.snap(original.y + delta.y),
            ..*original
        };

        if drag.copy {
            let mut copies = Vec::with_capacity(drag.originals.len());
            for (id, original) in &drag.originals {
                if let Some(source) = self.document.get(id) {
                    let copy = self.copy_of(source, target(original));
                    copies.push(copy.id.clone());
                    self.document.push(copy);
                }
            }
            if copies.is_empty() {
                return;
            }
            log::debug!("Copy-dropped {} element(s)", copies.len());
            self.selection.set(copies);
            self.commit("copy elements");
        } else {
            for (id, original) in &drag.originals {
                if let Some(element) = self.document.get_mut(id) {
                    element.transform = target(original);
                    element.touch();
                }
            }
            self.commit("move elements");
        }
    }

    fn finish_transform(&mut self, id: &ElementId, original: Transform, action: &str) {
        match self.document.get_mut(id) {
            Some(element) if element.transform != original => {
                element.touch();
                self.commit(action);
            }
            _ => {}
        }
    }

    /// Abort the running gesture, restoring previewed transforms.
    pub fn cancel_gesture(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            self.restore(&gesture.originals());
            log::debug!("Gesture cancelled");
        }
    }

    fn restore(&mut self, originals: &[(ElementId, Transform)]) {
        for (id, original) in originals {
            if let Some(element) = self.document.get_mut(id) {
                element.transform = *original;
            }
        }
    }

    // Double-click and inline editing

    /// Text elements enter inline editing, images ask for a replacement.
    /// Locked elements and shapes do nothing.
    pub fn double_click(&mut self, screen: Point) -> Option<DoubleClickAction> {
        self.cancel_gesture();
        let point = self.viewport.screen_to_canvas(screen);
        let id = self.document.elements_at_point(point, 0.0).into_iter().next()?;
        let element = self.document.get(&id)?;
        if element.locked {
            return None;
        }
        match element.kind() {
            ElementKind::Text => {
                self.begin_text_edit(&id);
                Some(DoubleClickAction::EditText(id))
            }
            ElementKind::Image => {
                self.selection.select(id.clone());
                Some(DoubleClickAction::RequestImage(id))
            }
            ElementKind::Shape => None,
        }
    }

    /// Open the inline editor on a text element, committing any other open edit.
    pub fn begin_text_edit(&mut self, id: &ElementId) -> bool {
        if self.is_text_editing(id) {
            return true;
        }
        self.commit_text_edit();
        let Some(text) = self.document.get(id).and_then(Element::as_text) else {
            return false;
        };
        self.text_edit = Some(InlineTextEdit::new(id.clone(), &text.content));
        self.selection.select(id.clone());
        true
    }

    /// Route a key to the inline editor, previewing the buffer on the element.
    pub fn handle_text_key(&mut self, key: TextKey, modifiers: TextModifiers) -> TextEditResult {
        let Some(edit) = self.text_edit.as_mut() else {
            return TextEditResult::NotHandled;
        };
        let result = edit.handle_key(key, modifiers);
        match result {
            TextEditResult::Handled => {
                let (id, text) = (edit.element_id().clone(), edit.text().to_string());
                self.set_text_preview(&id, text);
            }
            TextEditResult::Commit => self.commit_text_edit(),
            TextEditResult::Cancel => self.cancel_text_edit(),
            TextEditResult::NotHandled => {}
        }
        result
    }

    fn set_text_preview(&mut self, id: &ElementId, content: String) {
        if let Some(text) = self.document.get_mut(id).and_then(Element::as_text_mut) {
            text.content = content;
        }
    }

    /// Keep the edited text; one history entry when it changed.
    pub fn commit_text_edit(&mut self) {
        let Some(edit) = self.text_edit.take() else {
            return;
        };
        let id = edit.element_id().clone();
        self.set_text_preview(&id, edit.text().to_string());
        if edit.is_modified() {
            if let Some(element) = self.document.get_mut(&id) {
                element.touch();
            }
            self.commit("edit text");
        }
    }

    /// Restore the content the element had before editing.
    pub fn cancel_text_edit(&mut self) {
        if let Some(edit) = self.text_edit.take() {
            let id = edit.element_id().clone();
            self.set_text_preview(&id, edit.original().to_string());
        }
    }

    /// Ask the picker for a replacement image and apply it.
    pub async fn replace_image(&mut self, id: &ElementId, picker: &dyn FilePicker) -> bool {
        if self.document.get(id).and_then(Element::as_image).is_none() {
            return false;
        }
        match picker.pick_image().await {
            Some(picked) => self.apply_image_replacement(id, picked),
            None => false,
        }
    }

    /// Swap an image element's source, keeping its box.
    pub fn apply_image_replacement(&mut self, id: &ElementId, picked: PickedImage) -> bool {
        if self.document.get(id).and_then(Element::as_image).is_none() {
            return false;
        }
        self.update_element(id, |e| {
            if let Some(image) = e.as_image_mut() {
                image.src = picked.src;
                image.alt = picked.alt;
            }
        })
    }

    /// Update a text element's typography without touching its content.
    pub fn update_text_style(&mut self, id: &ElementId, f: impl FnOnce(&mut TextContent)) -> bool {
        if self.document.get(id).and_then(Element::as_text).is_none() {
            return false;
        }
        self.update_element(id, |e| {
            if let Some(text) = e.as_text_mut() {
                f(text);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DEFAULT_CANVAS_SIZE;
    use crate::element::{FontWeight, ShapeKind};
    use crate::history::MAX_UNDO_HISTORY;
    use crate::storage::test_util::block_on;
    use crate::storage::{BoxFuture, FileStore, MemoryStore};
    use serde_json::json;
    use std::collections::HashSet;

    fn editor() -> Editor {
        Editor::new(PageDocument::new("page-1", DEFAULT_CANVAS_SIZE), EditorConfig::default())
    }

    fn rect(editor: &mut Editor, x: f64, y: f64) -> ElementId {
        editor.add_element(ElementSpec::shape(x, y, 100.0, 100.0, ShapeKind::Rectangle))
    }

    #[test]
    fn test_add_gives_distinct_ids_and_exclusive_selection() {
        let mut editor = editor();
        let ids: Vec<_> = (0..5).map(|i| rect(&mut editor, i as f64, 0.0)).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 5);
        assert_eq!(editor.selection().ids(), &[ids[4].clone()]);
        assert_eq!(editor.element(&ids[3]).map(|e| e.z_index), Some(3));
    }

    #[test]
    fn test_history_capped_despite_config() {
        let config = EditorConfig {
            history_limit: 500,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(PageDocument::new("page-1", DEFAULT_CANVAS_SIZE), config);
        for i in 0..120 {
            editor.add_element(ElementSpec::shape(i as f64, 0.0, 10.0, 10.0, ShapeKind::Rectangle));
        }
        assert_eq!(editor.history().len(), MAX_UNDO_HISTORY);
        assert_eq!(editor.config().history_limit, MAX_UNDO_HISTORY);
    }

    #[test]
    fn test_front_and_back_order() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let b = rect(&mut editor, 10.0, 0.0);
        let c = rect(&mut editor, 20.0, 0.0);

        editor.move_element_to_front(&a);
        let order: Vec<_> = editor.document().paint_order().iter().map(|e| e.id.clone()).collect();
        assert_eq!(order.last(), Some(&a));

        editor.move_element_to_back(&c);
        let order: Vec<_> = editor.document().paint_order().iter().map(|e| e.id.clone()).collect();
        assert_eq!(order, vec![c, b, a]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut editor = editor();
        rect(&mut editor, 0.0, 0.0);
        let history_len = editor.history().len();
        assert!(!editor.update_element(&ElementId::from("ghost"), |e| e.visible = false));
        assert!(!editor.move_element(&ElementId::from("ghost"), Vec2::new(5.0, 5.0)));
        assert!(!editor.resize_element(&ElementId::from("ghost"), ResizeHandle::Se, Vec2::new(5.0, 5.0)));
        assert_eq!(editor.history().len(), history_len);
    }

    #[test]
    fn test_delete_prunes_selection() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let b = rect(&mut editor, 200.0, 0.0);
        editor.select_all();
        assert!(editor.delete_element(&a));
        assert_eq!(editor.selection().ids(), &[b.clone()]);

        editor.select_multiple(&[b.clone(), a.clone()]);
        assert_eq!(editor.delete_selected(), 1);
        assert!(editor.selection().is_empty());
        assert!(editor.document().is_empty());
    }

    #[test]
    fn test_duplicate() {
        let mut editor = editor();
        let a = rect(&mut editor, 10.0, 10.0);
        let copy = editor.duplicate_element(&a).unwrap();
        assert_ne!(copy, a);
        let t = editor.element(&copy).unwrap().transform;
        assert_eq!((t.x, t.y), (30.0, 30.0));
        assert_eq!(editor.selection().ids(), &[copy]);
        assert!(editor.duplicate_element(&ElementId::from("ghost")).is_none());
    }

    #[test]
    fn test_undo_redo_n_steps() {
        let mut editor = editor();
        let mut states = vec![editor.elements().to_vec()];
        let a = rect(&mut editor, 0.0, 0.0);
        states.push(editor.elements().to_vec());
        editor.move_element(&a, Vec2::new(5.0, 0.0));
        states.push(editor.elements().to_vec());
        rect(&mut editor, 50.0, 50.0);
        states.push(editor.elements().to_vec());

        for expected in states[..3].iter().rev() {
            assert!(editor.undo());
            assert_eq!(editor.elements(), expected.as_slice());
            assert!(editor.selection().is_empty());
        }
        assert!(!editor.undo());
        for expected in &states[1..] {
            assert!(editor.redo());
            assert_eq!(editor.elements(), expected.as_slice());
        }
        assert!(!editor.redo());

        editor.undo();
        editor.undo();
        rect(&mut editor, 300.0, 300.0);
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_drag_snaps_on_drop() {
        let mut editor = editor();
        editor.snap = GridSnap::new(true, 20.0);
        let a = editor.add_element(ElementSpec::shape(10.0, 10.0, 100.0, 100.0, ShapeKind::Rectangle));
        let history_len = editor.history().len();

        assert_eq!(editor.pointer_down(Point::new(50.0, 50.0), Modifiers::default()), PointerDown::Drag(a.clone()));
        assert_eq!(editor.active_pointer_listeners(), 1);
        editor.pointer_move(Point::new(54.0, 52.0));
        let preview = editor.element(&a).unwrap().transform;
        assert_eq!((preview.x, preview.y), (14.0, 12.0));

        editor.pointer_up(Point::new(57.0, 53.0));
        let t = editor.element(&a).unwrap().transform;
        assert_eq!((t.x, t.y), (20.0, 20.0));
        assert_eq!(editor.active_pointer_listeners(), 0);
        assert_eq!(editor.history().len(), history_len + 1);
    }

    #[test]
    fn test_drag_respects_zoom_and_display_scale() {
        let mut editor = editor();
        editor.viewport.set_zoom(2.0);
        editor.viewport.set_display_scale(0.5);
        editor.viewport.zoom = 4.0;
        let a = rect(&mut editor, 0.0, 0.0);
        editor.pointer_down(Point::new(40.0, 40.0), Modifiers::default());
        editor.pointer_up(Point::new(80.0, 60.0));
        let t = editor.element(&a).unwrap().transform;
        assert_eq!((t.x, t.y), (20.0, 10.0));
    }

    #[test]
    fn test_multi_drag_moves_selection() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let b = rect(&mut editor, 300.0, 300.0);
        let locked = rect(&mut editor, 500.0, 0.0);
        editor.update_element(&locked, |e| e.locked = true);
        editor.select_all();

        assert_eq!(editor.pointer_down(Point::new(10.0, 10.0), Modifiers::default()), PointerDown::Drag(a.clone()));
        editor.pointer_up(Point::new(40.0, 20.0));

        assert_eq!(editor.element(&a).map(|e| e.transform.position()), Some(Point::new(30.0, 10.0)));
        assert_eq!(editor.element(&b).map(|e| e.transform.position()), Some(Point::new(330.0, 310.0)));
        assert_eq!(editor.element(&locked).map(|e| e.transform.position()), Some(Point::new(500.0, 0.0)));
    }

    #[test]
    fn test_copy_drag_creates_duplicate() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let copy_mod = Modifiers {
            alt: true,
            ..Default::default()
        };
        editor.pointer_down(Point::new(10.0, 10.0), copy_mod);
        editor.pointer_move(Point::new(60.0, 10.0));
        assert_eq!(editor.element(&a).map(|e| e.transform.x), Some(0.0));
        editor.pointer_up(Point::new(110.0, 10.0));

        assert_eq!(editor.elements().len(), 2);
        assert_eq!(editor.element(&a).map(|e| e.transform.x), Some(0.0));
        let copy = editor.selection().single().cloned().unwrap();
        assert_ne!(copy, a);
        assert_eq!(editor.element(&copy).map(|e| e.transform.x), Some(100.0));
    }

    #[test]
    fn test_locked_element_is_selected_not_dragged() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        editor.update_element(&a, |e| e.locked = true);
        assert_eq!(editor.pointer_down(Point::new(10.0, 10.0), Modifiers::default()), PointerDown::Selected(a));
        assert!(!editor.is_gesture_active());
    }

    #[test]
    fn test_drag_refused_while_editing_text() {
        let mut editor = editor();
        let t = editor.add_element(ElementSpec::text(0.0, 0.0, 200.0, 50.0, "hello"));
        assert!(editor.begin_text_edit(&t));
        assert!(!editor.begin_drag(&t, Point::new(10.0, 10.0), false));
        assert_eq!(editor.pointer_down(Point::new(10.0, 10.0), Modifiers::default()), PointerDown::Selected(t));
        assert_eq!(editor.active_pointer_listeners(), 0);
    }

    #[test]
    fn test_drag_refused_while_resizing() {
        let mut editor = editor();
        let a = rect(&mut editor, 100.0, 100.0);
        // South-east handle of the selected element
        assert_eq!(
            editor.pointer_down(Point::new(200.0, 200.0), Modifiers::default()),
            PointerDown::Handle(HandleKind::Resize(ResizeHandle::Se))
        );
        assert!(!editor.begin_drag(&a, Point::new(150.0, 150.0), false));
        editor.pointer_up(Point::new(240.0, 220.0));
        let t = editor.element(&a).unwrap().transform;
        assert_eq!((t.width, t.height), (140.0, 120.0));
    }

    #[test]
    fn test_cancel_releases_listeners_and_restores() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let history_len = editor.history().len();
        editor.pointer_down(Point::new(10.0, 10.0), Modifiers::default());
        editor.pointer_move(Point::new(90.0, 90.0));
        editor.cancel_gesture();
        assert_eq!(editor.active_pointer_listeners(), 0);
        assert_eq!(editor.element(&a).map(|e| e.transform.position()), Some(Point::ZERO));
        assert_eq!(editor.history().len(), history_len);

        editor.pointer_down(Point::new(10.0, 10.0), Modifiers::default());
        let listeners = editor.listeners.clone();
        drop(editor);
        assert_eq!(listeners.active(), 0);
    }

    #[test]
    fn test_rotate_gesture() {
        let mut editor = editor();
        editor.config.snap_rotation = true;
        let a = rect(&mut editor, 100.0, 100.0);
        // Rotate handle sits above the top-center.
        assert_eq!(
            editor.pointer_down(Point::new(150.0, 70.0), Modifiers::default()),
            PointerDown::Handle(HandleKind::Rotate)
        );
        editor.pointer_up(Point::new(260.0, 152.0));
        assert_eq!(editor.element(&a).map(|e| e.transform.rotation), Some(90.0));
    }

    #[test]
    fn test_text_edit_commit_and_cancel() {
        let mut editor = editor();
        let t = editor.add_element(ElementSpec::text(0.0, 0.0, 200.0, 50.0, "Hi"));
        let base = editor.history().len();

        assert_eq!(editor.double_click(Point::new(10.0, 10.0)), Some(DoubleClickAction::EditText(t.clone())));
        editor.handle_text_key(TextKey::Character("!".into()), TextModifiers::default());
        assert_eq!(editor.element(&t).and_then(|e| e.as_text()).map(|x| x.content.clone()), Some("Hi!".into()));
        assert_eq!(editor.history().len(), base);

        assert_eq!(editor.handle_text_key(TextKey::Enter, TextModifiers::default()), TextEditResult::Commit);
        assert_eq!(editor.history().len(), base + 1);
        assert!(editor.text_edit().is_none());

        editor.begin_text_edit(&t);
        editor.handle_text_key(TextKey::Backspace, TextModifiers::default());
        editor.handle_text_key(TextKey::Escape, TextModifiers::default());
        assert_eq!(editor.element(&t).and_then(|e| e.as_text()).map(|x| x.content.clone()), Some("Hi!".into()));
        assert_eq!(editor.history().len(), base + 1);
    }

    struct OnePick;

    impl FilePicker for OnePick {
        fn pick_image(&self) -> BoxFuture<'_, Option<PickedImage>> {
            Box::pin(async {
                Some(PickedImage {
                    src: "new.jpg".into(),
                    alt: "Beach".into(),
                })
            })
        }
    }

    #[test]
    fn test_double_click_image_requests_replacement() {
        let mut editor = editor();
        let id = editor.drop_image("old.jpg", "", Size::new(1200.0, 600.0), Point::new(400.0, 300.0));
        let image = editor.element(&id).unwrap();
        assert_eq!((image.transform.width, image.transform.height), (300.0, 150.0));
        assert_eq!(image.locked_aspect_ratio(), Some(2.0));

        assert_eq!(editor.double_click(Point::new(400.0, 300.0)), Some(DoubleClickAction::RequestImage(id.clone())));
        assert!(block_on(editor.replace_image(&id, &OnePick)));
        let image = editor.element(&id).and_then(|e| e.as_image()).unwrap();
        assert_eq!((image.src.as_str(), image.alt.as_str()), ("new.jpg", "Beach"));
    }

    #[test]
    fn test_drop_tool_centres_on_pointer() {
        let mut editor = editor();
        let id = editor.drop_tool(ToolKind::Shape(ShapeKind::Circle), Point::new(300.0, 200.0));
        let element = editor.element(&id).unwrap();
        assert_eq!(element.kind(), ElementKind::Shape);
        assert_eq!(element.transform.center(), Point::new(300.0, 200.0));
    }

    #[test]
    fn test_set_transform_field() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        assert!(!editor.set_transform_field(&a, TransformField::X, "abc"));
        assert!(editor.set_transform_field(&a, TransformField::Width, " 3 "));
        assert!(editor.set_transform_field(&a, TransformField::Rotation, "-45"));
        let t = editor.element(&a).unwrap().transform;
        assert_eq!(t.width, MIN_FIELD_SIZE);
        assert_eq!(t.rotation, 315.0);

        let img = editor.drop_image("a.png", "", Size::new(200.0, 100.0), Point::new(300.0, 300.0));
        editor.set_transform_field(&img, TransformField::Width, "400");
        let t = editor.element(&img).unwrap().transform;
        assert_eq!((t.width, t.height), (400.0, 200.0));
    }

    #[test]
    fn test_nudge_selected() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        let b = rect(&mut editor, 50.0, 50.0);
        editor.update_element(&b, |e| e.locked = true);
        editor.select_all();
        assert_eq!(editor.nudge_selected(1.0, -2.0), 1);
        assert_eq!(editor.element(&a).map(|e| e.transform.position()), Some(Point::new(1.0, -2.0)));
    }

    #[test]
    fn test_import_rejects_malformed_payload() {
        let mut editor = editor();
        let a = rect(&mut editor, 0.0, 0.0);
        assert!(editor.import_payload(&json!({"elements": "nope"})).is_err());
        assert!(editor.element(&a).is_some());
        assert_eq!(editor.diagnostics().len(), 1);

        editor
            .import_payload(&json!({"elements": [
                {"id": "x", "type": "shape", "transform": {"x": 1, "y": 1, "width": 5, "height": 5}}
            ]}))
            .unwrap();
        assert_eq!(editor.elements().len(), 1);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_load_page_and_autosave_payload() {
        let store = MemoryStore::new();
        let payload = PagePayload {
            canvas_size: Size::new(1000.0, 500.0),
            elements: vec![ElementSpec::text(0.0, 0.0, 50.0, 20.0, "x").into_element(0)],
        };
        block_on(store.save_page("p9", &payload)).unwrap();

        let mut editor = editor();
        block_on(editor.load_page(&store, "p9", None)).unwrap();
        assert_eq!(editor.document().page_id, "p9");
        assert_eq!(editor.elements(), payload.elements.as_slice());
        assert_eq!(editor.viewport.canvas_size, Size::new(1000.0, 500.0));
        assert_eq!(editor.document().version, 1);

        assert!(block_on(editor.load_page(&store, "missing", None)).is_err());
        assert_eq!(editor.document().page_id, "p9");
    }

    #[test]
    fn test_update_text_style_keeps_content() {
        let mut editor = editor();
        let text = editor.add_element(ElementSpec::text(0.0, 0.0, 200.0, 50.0, "Hello"));
        let shape = rect(&mut editor, 300.0, 0.0);

        assert!(editor.update_text_style(&text, |t| {
            t.font_weight = FontWeight::Bold;
            t.font_size = 48.0;
        }));
        let style = editor.document().get(&text).and_then(Element::as_text).unwrap();
        assert_eq!(style.content, "Hello");
        assert_eq!(style.font_weight, FontWeight::Bold);
        assert!((style.font_size - 48.0).abs() < f64::EPSILON);

        assert!(!editor.update_text_style(&shape, |t| t.font_size = 10.0));
        assert!(editor.undo());
        let style = editor.document().get(&text).and_then(Element::as_text).unwrap();
        assert_eq!(style.font_weight, FontWeight::Normal);
    }

    #[test]
    fn test_load_page_without_elements_records_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(
            dir.path().join("pages").join("bare.json"),
            r#"{"canvasSize": {"width": 800, "height": 600}}"#,
        )
        .unwrap();

        let mut editor = editor();
        editor.add_element(ElementSpec::shape(0.0, 0.0, 10.0, 10.0, ShapeKind::Rectangle));
        assert!(block_on(editor.load_page(&store, "bare", None)).is_err());
        assert_eq!(editor.diagnostics().len(), 1);
        assert!(editor.diagnostics()[0].contains("bare"));
        assert_eq!(editor.elements().len(), 1);
    }
}
