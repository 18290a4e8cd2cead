//! Bounding box and per-image annotation records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::geometry::{ImageSize, Rect};

/// Identifier of a box, unique within one image.
pub type BoxId = u64;

/// A labelled rectangle in image-space pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub box_id: BoxId,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Index into the workspace class list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
    /// Display override for the class name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BoundingBox {
    pub fn new(box_id: BoxId, rect: Rect) -> Self {
        Self {
            box_id,
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
            class_id: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_class(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// The box geometry as a plain rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.left = rect.left;
        self.top = rect.top;
        self.width = rect.width;
        self.height = rect.height;
    }
}

/// A partial update to a box. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxPatch {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// `Some(None)` clears the class.
    pub class_id: Option<Option<u32>>,
    /// `Some(None)` clears the label.
    pub label: Option<Option<String>>,
}

impl BoxPatch {
    /// Patch replacing all four geometry fields.
    pub fn rect(rect: Rect) -> Self {
        Self {
            left: Some(rect.left),
            top: Some(rect.top),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    pub fn label(label: Option<String>) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }

    pub fn class(class_id: Option<u32>) -> Self {
        Self {
            class_id: Some(class_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch into a box, field by field.
    pub fn apply_to(&self, target: &mut BoundingBox) {
        if let Some(left) = self.left {
            target.left = left;
        }
        if let Some(top) = self.top {
            target.top = top;
        }
        if let Some(width) = self.width {
            target.width = width;
        }
        if let Some(height) = self.height {
            target.height = height;
        }
        if let Some(class_id) = self.class_id {
            target.class_id = class_id;
        }
        if let Some(label) = &self.label {
            target.label = label.clone();
        }
    }
}

/// Image pixel dimensions as stored alongside the boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl From<ImageSize> for ImageMetadata {
    fn from(size: ImageSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

/// All annotation data for a single image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAnnotation {
    /// Boxes in creation order (later boxes draw on top).
    #[serde(default)]
    pub boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub metadata: ImageMetadata,
    /// Auxiliary image-level labels (e.g. "weather" -> "rain").
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ImageAnnotation {
    /// Create an empty annotation for an image of the given size.
    pub fn new(size: ImageSize) -> Self {
        Self {
            boxes: Vec::new(),
            metadata: size.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.metadata.width, self.metadata.height)
    }

    pub fn find(&self, box_id: BoxId) -> Option<&BoundingBox> {
        self.boxes.iter().find(|b| b.box_id == box_id)
    }

    /// Largest box id in use, or 0 when there are no boxes.
    pub fn max_box_id(&self) -> BoxId {
        self.boxes.iter().map(|b| b.box_id).max().unwrap_or(0)
    }

    /// Id for the next box: one above the running maximum.
    pub fn next_box_id(&self) -> BoxId {
        self.max_box_id() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch_is_identity() {
        let original = BoundingBox::new(3, Rect::new(1.5, 2.5, 30.0, 40.0))
            .with_label("car")
            .with_class(2);
        let mut patched = original.clone();
        let patch = BoxPatch::default();
        assert!(patch.is_empty());
        patch.apply_to(&mut patched);
        assert_eq!(original, patched);
    }

    #[test]
    fn test_patch_clears_label() {
        let mut bbox = BoundingBox::new(1, Rect::new(0.0, 0.0, 10.0, 10.0)).with_label("x");
        BoxPatch::label(None).apply_to(&mut bbox);
        assert_eq!(bbox.label, None);
    }

    #[test]
    fn test_next_box_id_uses_max() {
        let mut ann = ImageAnnotation::new(ImageSize::new(100, 100));
        assert_eq!(ann.next_box_id(), 1);
        ann.boxes.push(BoundingBox::new(5, Rect::new(0.0, 0.0, 10.0, 10.0)));
        ann.boxes.push(BoundingBox::new(2, Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(ann.next_box_id(), 6);
    }

    #[test]
    fn test_json_shape() {
        let mut ann = ImageAnnotation::new(ImageSize::new(640, 480));
        ann.boxes
            .push(BoundingBox::new(1, Rect::new(1.0, 2.0, 30.0, 40.0)).with_label("box_1"));
        let json = serde_json::to_value(&ann).expect("serialize");

        assert_eq!(json["metadata"]["width"], 640);
        assert_eq!(json["boxes"][0]["boxId"], 1);
        assert_eq!(json["boxes"][0]["label"], "box_1");
        assert!(json["boxes"][0].get("classId").is_none());
        assert!(json["labels"].as_object().is_some_and(|m| m.is_empty()));
    }

    #[test]
    fn test_deserialize_without_optional_sections() {
        let json = r#"{"boxes":[{"boxId":4,"left":0,"top":0,"width":12,"height":12}]}"#;
        let ann: ImageAnnotation = serde_json::from_str(json).expect("deserialize");
        assert_eq!(ann.boxes.len(), 1);
        assert!(!ann.size().is_known());
        assert!(ann.labels.is_empty());
    }
}
