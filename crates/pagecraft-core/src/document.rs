//! Page document: the element store for one album page.

use crate::background::{BackgroundScope, BackgroundStyle};
use crate::element::{Element, ElementId};
use chrono::{DateTime, Utc};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Canvas size used when a payload does not carry one.
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(800.0, 600.0);

/// Errors raised while importing an external page payload.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(String),
    #[error("Payload has no element list")]
    MissingElements,
    #[error("Element list is not an array")]
    ElementsNotArray,
}

/// The persisted form of a page: what gets sent to the persistence bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    pub canvas_size: Size,
    pub elements: Vec<Element>,
}

/// Elements decoded from a raw payload, with a note for every skipped or repaired entry.
#[derive(Debug, Clone, Default)]
pub struct ImportedElements {
    pub elements: Vec<Element>,
    pub diagnostics: Vec<String>,
}

/// Decode the element list of a raw page payload.
///
/// The list itself must be present and an array. Individual entries that fail
/// to decode are skipped; duplicate ids are replaced with fresh ones.
pub fn import_elements(payload: &Value) -> Result<ImportedElements, ImportError> {
    let list = match payload {
        Value::Array(_) => payload,
        Value::Object(map) => map
            .get("elements")
            .filter(|list| !list.is_null())
            .ok_or(ImportError::MissingElements)?,
        _ => return Err(ImportError::MissingElements),
    };
    let entries = list.as_array().ok_or(ImportError::ElementsNotArray)?;

    let mut imported = ImportedElements::default();
    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<Element>(entry.clone()) {
            Ok(mut element) => {
                if !seen.insert(element.id.clone()) {
                    let fresh = ElementId::generate();
                    imported
                        .diagnostics
                        .push(format!("element {index}: duplicate id {} replaced", element.id));
                    element.id = fresh.clone();
                    seen.insert(fresh);
                }
                imported.elements.push(element);
            }
            Err(e) => {
                log::warn!("Skipping element {index} in payload: {e}");
                imported.diagnostics.push(format!("element {index}: {e}"));
            }
        }
    }
    Ok(imported)
}

/// One album page being edited or exported.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    pub page_id: String,
    /// Logical size of the page; defines document space.
    pub canvas_size: Size,
    /// Elements in insertion order. Paint order is derived from `z_index`.
    pub elements: Vec<Element>,
    pub background: Option<BackgroundStyle>,
    pub background_scope: BackgroundScope,
    pub version: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl PageDocument {
    pub fn new(page_id: impl Into<String>, canvas_size: Size) -> Self {
        Self {
            page_id: page_id.into(),
            canvas_size,
            elements: Vec::new(),
            background: None,
            background_scope: BackgroundScope::Page,
            version: 0,
            last_modified: None,
        }
    }

    /// Build a document from a raw payload (`{canvasSize?, elements}`).
    pub fn from_payload(
        page_id: impl Into<String>,
        payload: &Value,
    ) -> Result<(Self, Vec<String>), ImportError> {
        let imported = import_elements(payload)?;
        let canvas_size = payload
            .get("canvasSize")
            .and_then(|v| serde_json::from_value::<Size>(v.clone()).ok())
            .filter(|s| s.width > 0.0 && s.height > 0.0)
            .unwrap_or(DEFAULT_CANVAS_SIZE);

        let mut document = Self::new(page_id, canvas_size);
        document.elements = imported.elements;
        Ok((document, imported.diagnostics))
    }

    /// Parse a JSON string payload.
    pub fn from_json(page_id: impl Into<String>, json: &str) -> Result<(Self, Vec<String>), ImportError> {
        let value: Value = serde_json::from_str(json).map_err(|e| ImportError::Json(e.to_string()))?;
        Self::from_payload(page_id, &value)
    }

    pub fn to_payload(&self) -> PagePayload {
        PagePayload {
            canvas_size: self.canvas_size,
            elements: self.elements.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.iter().any(|e| &e.id == id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let index = self.elements.iter().position(|e| &e.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Elements back to front: ascending `z_index`, ties in insertion order.
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by_key(|e| e.z_index);
        ordered
    }

    pub fn max_z(&self) -> Option<i64> {
        self.elements.iter().map(|e| e.z_index).max()
    }

    pub fn min_z(&self) -> Option<i64> {
        self.elements.iter().map(|e| e.z_index).min()
    }

    /// Ids of visible elements under a document point, topmost first.
    pub fn elements_at_point(&self, point: Point, tolerance: f64) -> Vec<ElementId> {
        self.paint_order()
            .into_iter()
            .rev()
            .filter(|e| e.hit_test(point, tolerance))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Set `z_index` to one above the current maximum.
    pub fn bring_to_front(&mut self, id: &ElementId) -> bool {
        let top = self.max_z().unwrap_or(0);
        self.set_z(id, |_| top + 1)
    }

    /// Set `z_index` to one below the current minimum.
    pub fn send_to_back(&mut self, id: &ElementId) -> bool {
        let bottom = self.min_z().unwrap_or(0);
        self.set_z(id, |_| bottom - 1)
    }

    pub fn bring_forward(&mut self, id: &ElementId) -> bool {
        self.set_z(id, |z| z + 1)
    }

    pub fn send_backward(&mut self, id: &ElementId) -> bool {
        self.set_z(id, |z| z - 1)
    }

    fn set_z(&mut self, id: &ElementId, f: impl FnOnce(i64) -> i64) -> bool {
        match self.get_mut(id) {
            Some(element) => {
                element.z_index = f(element.z_index);
                element.touch();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementSpec, ShapeKind};
    use serde_json::json;

    fn sample() -> PageDocument {
        let mut doc = PageDocument::new("p1", DEFAULT_CANVAS_SIZE);
        for i in 0..3 {
            let spec = ElementSpec::shape(i as f64 * 10.0, 0.0, 50.0, 50.0, ShapeKind::Rectangle);
            doc.push(spec.into_element(i));
        }
        doc
    }

    #[test]
    fn test_paint_order_ties_keep_insertion_order() {
        let mut doc = sample();
        let ids: Vec<_> = doc.elements.iter().map(|e| e.id.clone()).collect();
        for element in &mut doc.elements {
            element.z_index = 1;
        }
        let order: Vec<_> = doc.paint_order().iter().map(|e| e.id.clone()).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_front_and_back() {
        let mut doc = sample();
        let first = doc.elements[0].id.clone();
        let last = doc.elements[2].id.clone();

        assert!(doc.bring_to_front(&first));
        assert_eq!(doc.get(&first).map(|e| e.z_index), Some(3));
        assert_eq!(doc.paint_order().last().map(|e| e.id.clone()), Some(first));

        assert!(doc.send_to_back(&last));
        assert_eq!(doc.get(&last).map(|e| e.z_index), Some(0));
        assert_eq!(doc.paint_order().first().map(|e| e.id.clone()), Some(last.clone()));

        assert!(!doc.bring_forward(&ElementId::from("missing")));
    }

    #[test]
    fn test_elements_at_point_topmost_first() {
        let doc = sample();
        let hits = doc.elements_at_point(Point::new(25.0, 25.0), 0.0);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], doc.elements[2].id);
    }

    #[test]
    fn test_import_rejects_missing_or_non_array() {
        assert!(matches!(
            PageDocument::from_payload("p", &json!({"canvasSize": {"width": 10, "height": 10}})),
            Err(ImportError::MissingElements)
        ));
        assert!(matches!(
            PageDocument::from_payload("p", &json!({"elements": null})),
            Err(ImportError::MissingElements)
        ));
        assert!(matches!(
            PageDocument::from_payload("p", &json!({"elements": {"a": 1}})),
            Err(ImportError::ElementsNotArray)
        ));
    }

    #[test]
    fn test_from_json_text() {
        let (doc, diagnostics) = PageDocument::from_json(
            "p",
            r#"{"canvasSize": {"width": 640, "height": 480}, "elements": []}"#,
        )
        .unwrap();
        assert!(diagnostics.is_empty());
        assert!((doc.canvas_size.width - 640.0).abs() < f64::EPSILON);
        assert!(matches!(PageDocument::from_json("p", "{oops"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_import_skips_bad_elements() {
        let payload = json!({
            "canvasSize": {"width": 1000, "height": 700},
            "elements": [
                {"id": "a", "type": "shape", "transform": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"id": "b", "type": "hologram", "transform": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"id": "a", "type": "text", "content": "dup", "transform": {"x": 0, "y": 0, "width": 10, "height": 10}}
            ]
        });
        let (doc, diagnostics) = PageDocument::from_payload("p", &payload).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(diagnostics.len(), 2);
        assert_ne!(doc.elements[0].id, doc.elements[1].id);
        assert!((doc.canvas_size.width - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_payload_roundtrip_keys() {
        let doc = sample();
        let value = serde_json::to_value(doc.to_payload()).unwrap();
        assert_eq!(value["canvasSize"]["width"], 800.0);
        assert_eq!(value["elements"].as_array().map(Vec::len), Some(3));
    }
}
