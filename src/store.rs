//! Annotation state store.
//!
//! [`AnnotationsState`] is an immutable value: a mapping from image key to its
//! [`ImageAnnotation`]. Every mutation builds a new top-level map that shares all
//! untouched images with the previous one (`Arc` per image), so history snapshots are
//! cheap and "did anything change" is a pointer comparison.
//!
//! [`AnnotationStore`] owns the live value and is the only place it is mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{BoundingBox, BoxId, BoxPatch, ImageAnnotation, ImageSize};

/// Snapshot of every image's annotations, keyed by image name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationsState {
    images: Arc<BTreeMap<String, Arc<ImageAnnotation>>>,
}

impl AnnotationsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the annotation record for an image.
    pub fn get(&self, image_id: &str) -> Option<&ImageAnnotation> {
        self.images.get(image_id).map(Arc::as_ref)
    }

    /// Boxes of an image in creation order; empty for unknown images.
    pub fn boxes(&self, image_id: &str) -> &[BoundingBox] {
        self.get(image_id).map(|a| a.boxes.as_slice()).unwrap_or(&[])
    }

    /// Look up a single box.
    pub fn find_box(&self, image_id: &str, box_id: BoxId) -> Option<&BoundingBox> {
        self.get(image_id).and_then(|a| a.find(box_id))
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.images.contains_key(image_id)
    }

    /// Iterate over `(image key, annotation)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageAnnotation)> {
        self.images.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Number of images with an annotation record.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// True if both values are the very same snapshot (no copy, no change).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.images, &other.images)
    }

    /// True if both snapshots share the same record for `image_id`.
    pub fn shares_image(&self, other: &Self, image_id: &str) -> bool {
        match (self.images.get(image_id), other.images.get(image_id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Export to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn with_image(&self, image_id: &str, annotation: ImageAnnotation) -> Self {
        let mut images = BTreeMap::clone(&self.images);
        images.insert(image_id.to_string(), Arc::new(annotation));
        Self {
            images: Arc::new(images),
        }
    }

    /// Apply `edit` to a copy of one image's record. Returns `None` when the image is
    /// missing or `edit` reports that nothing changed.
    fn modify(
        &self,
        image_id: &str,
        edit: impl FnOnce(&mut ImageAnnotation) -> bool,
    ) -> Option<Self> {
        let mut annotation = ImageAnnotation::clone(self.images.get(image_id)?);
        if !edit(&mut annotation) {
            return None;
        }
        Some(self.with_image(image_id, annotation))
    }
}

impl FromIterator<(String, ImageAnnotation)> for AnnotationsState {
    fn from_iter<I: IntoIterator<Item = (String, ImageAnnotation)>>(iter: I) -> Self {
        Self {
            images: Arc::new(iter.into_iter().map(|(k, v)| (k, Arc::new(v))).collect()),
        }
    }
}

/// Owner of the live [`AnnotationsState`].
///
/// All operations are no-ops when they reference an unknown box, and each returns the
/// (possibly unchanged) current state.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    state: AnnotationsState,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: AnnotationsState) -> Self {
        Self { state }
    }

    /// The current committed state.
    pub fn state(&self) -> &AnnotationsState {
        &self.state
    }

    /// Replace the whole state (undo/redo, workspace load).
    pub fn replace(&mut self, state: AnnotationsState) -> &AnnotationsState {
        self.state = state;
        &self.state
    }

    pub fn annotation(&self, image_id: &str) -> Option<&ImageAnnotation> {
        self.state.get(image_id)
    }

    pub fn boxes(&self, image_id: &str) -> &[BoundingBox] {
        self.state.boxes(image_id)
    }

    /// Id a new box on this image should get.
    pub fn next_box_id(&self, image_id: &str) -> BoxId {
        self.state.get(image_id).map_or(1, ImageAnnotation::next_box_id)
    }

    /// Create an empty record for the image if there is none.
    ///
    /// A record whose dimensions were unknown picks up `size` once it is known.
    pub fn ensure_annotation(&mut self, image_id: &str, size: ImageSize) -> &AnnotationsState {
        let known = self.state.get(image_id).map(|a| a.size().is_known());
        match known {
            None => {
                log::debug!("Creating annotation record for {image_id:?} ({size:?})");
                self.state = self.state.with_image(image_id, ImageAnnotation::new(size));
            }
            Some(false) if size.is_known() => {
                log::debug!("Filling in dimensions {size:?} for {image_id:?}");
                if let Some(next) = self.state.modify(image_id, |a| {
                    a.metadata = size.into();
                    true
                }) {
                    self.state = next;
                }
            }
            Some(_) => {}
        }
        &self.state
    }

    /// Append a box. The caller chooses the id (see [`Self::next_box_id`]).
    pub fn add_box(&mut self, image_id: &str, bbox: BoundingBox) -> &AnnotationsState {
        self.add_boxes(image_id, vec![bbox])
    }

    /// Append several boxes as one state change.
    pub fn add_boxes(&mut self, image_id: &str, boxes: Vec<BoundingBox>) -> &AnnotationsState {
        if boxes.is_empty() {
            return &self.state;
        }
        if !self.state.contains(image_id) {
            self.ensure_annotation(image_id, ImageSize::default());
        }
        if let Some(next) = self.state.modify(image_id, |a| {
            if let Some(dup) = boxes.iter().find(|b| a.find(b.box_id).is_some()) {
                log::warn!("Box id {} already exists on {image_id:?}", dup.box_id);
            }
            a.boxes.extend(boxes);
            true
        }) {
            self.state = next;
        }
        &self.state
    }

    /// Merge `patch` into the box with `box_id`. Unknown ids are ignored.
    pub fn update_box(
        &mut self,
        image_id: &str,
        box_id: BoxId,
        patch: &BoxPatch,
    ) -> &AnnotationsState {
        let next = self.state.modify(image_id, |a| {
            let Some(target) = a.boxes.iter_mut().find(|b| b.box_id == box_id) else {
                log::trace!("update_box: no box {box_id} on {image_id:?}");
                return false;
            };
            let before = target.clone();
            patch.apply_to(target);
            *target != before
        });
        if let Some(next) = next {
            self.state = next;
        }
        &self.state
    }

    /// Remove the box with `box_id`. Unknown ids are ignored.
    pub fn delete_box(&mut self, image_id: &str, box_id: BoxId) -> &AnnotationsState {
        let next = self.state.modify(image_id, |a| {
            let before = a.boxes.len();
            a.boxes.retain(|b| b.box_id != box_id);
            a.boxes.len() != before
        });
        match next {
            Some(next) => {
                log::debug!("Deleted box {box_id} from {image_id:?}");
                self.state = next;
            }
            None => log::trace!("delete_box: no box {box_id} on {image_id:?}"),
        }
        &self.state
    }

    /// Set or clear the display label of a box.
    pub fn relabel(
        &mut self,
        image_id: &str,
        box_id: BoxId,
        label: Option<String>,
    ) -> &AnnotationsState {
        self.update_box(image_id, box_id, &BoxPatch::label(label))
    }

    /// Set or clear the class of a box.
    pub fn reclass(
        &mut self,
        image_id: &str,
        box_id: BoxId,
        class_id: Option<u32>,
    ) -> &AnnotationsState {
        self.update_box(image_id, box_id, &BoxPatch::class(class_id))
    }

    /// Set an image-level label (`None` removes the key).
    pub fn set_image_label(
        &mut self,
        image_id: &str,
        key: &str,
        value: Option<String>,
    ) -> &AnnotationsState {
        if !self.state.contains(image_id) {
            self.ensure_annotation(image_id, ImageSize::default());
        }
        let next = self.state.modify(image_id, |a| match value {
            Some(value) => a.labels.insert(key.to_string(), value.clone()) != Some(value),
            None => a.labels.remove(key).is_some(),
        });
        if let Some(next) = next {
            self.state = next;
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    const IMG: &str = "cat.jpg";

    fn store_with_boxes() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.ensure_annotation(IMG, ImageSize::new(640, 480));
        store.add_box(IMG, BoundingBox::new(1, Rect::new(0.0, 0.0, 20.0, 20.0)));
        store.add_box(IMG, BoundingBox::new(2, Rect::new(50.0, 50.0, 20.0, 20.0)));
        store
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut store = AnnotationStore::new();
        store.ensure_annotation(IMG, ImageSize::new(640, 480));
        let first = store.state().clone();
        store.ensure_annotation(IMG, ImageSize::new(1, 1));
        assert!(store.state().ptr_eq(&first));
        assert_eq!(store.annotation(IMG).map(|a| a.size()), Some(ImageSize::new(640, 480)));
    }

    #[test]
    fn test_ensure_fills_unknown_dimensions() {
        let mut store = AnnotationStore::new();
        store.ensure_annotation(IMG, ImageSize::default());
        store.ensure_annotation(IMG, ImageSize::new(32, 16));
        assert_eq!(store.annotation(IMG).map(|a| a.size()), Some(ImageSize::new(32, 16)));
    }

    #[test]
    fn test_add_preserves_order() {
        let store = store_with_boxes();
        let ids: Vec<_> = store.boxes(IMG).iter().map(|b| b.box_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.next_box_id(IMG), 3);
        assert_eq!(store.next_box_id("other.jpg"), 1);
    }

    #[test]
    fn test_mutation_produces_new_value() {
        let mut store = store_with_boxes();
        let before = store.state().clone();
        store.update_box(IMG, 1, &BoxPatch::rect(Rect::new(5.0, 5.0, 20.0, 20.0)));
        assert!(!store.state().ptr_eq(&before));
        assert_eq!(before.find_box(IMG, 1).map(|b| b.left), Some(0.0));
        assert_eq!(store.state().find_box(IMG, 1).map(|b| b.left), Some(5.0));
    }

    #[test]
    fn test_untouched_images_are_shared() {
        let mut store = store_with_boxes();
        store.ensure_annotation("dog.jpg", ImageSize::new(10, 10));
        let before = store.state().clone();
        store.delete_box(IMG, 2);
        assert!(store.state().shares_image(&before, "dog.jpg"));
        assert!(!store.state().shares_image(&before, IMG));
    }

    #[test]
    fn test_empty_patch_leaves_box_unchanged() {
        let mut store = store_with_boxes();
        let before = store.state().clone();
        store.update_box(IMG, 1, &BoxPatch::default());
        assert_eq!(store.state(), &before);
        assert_eq!(store.state().find_box(IMG, 1), before.find_box(IMG, 1));
    }

    #[test]
    fn test_unknown_box_is_noop() {
        let mut store = store_with_boxes();
        let before = store.state().clone();
        store.update_box(IMG, 99, &BoxPatch::label(Some("x".into())));
        store.delete_box(IMG, 99);
        store.delete_box("missing.jpg", 1);
        assert!(store.state().ptr_eq(&before));
    }

    #[test]
    fn test_relabel_and_reclass() {
        let mut store = store_with_boxes();
        store.relabel(IMG, 2, Some("person".into()));
        store.reclass(IMG, 2, Some(4));
        let bbox = store.state().find_box(IMG, 2).cloned();
        assert_eq!(bbox.as_ref().and_then(|b| b.label.clone()), Some("person".into()));
        assert_eq!(bbox.and_then(|b| b.class_id), Some(4));
    }

    #[test]
    fn test_add_box_creates_record_lazily() {
        let mut store = AnnotationStore::new();
        store.add_box("new.jpg", BoundingBox::new(1, Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(store.boxes("new.jpg").len(), 1);
    }

    #[test]
    fn test_image_labels() {
        let mut store = store_with_boxes();
        store.set_image_label(IMG, "weather", Some("rain".into()));
        let before = store.state().clone();
        store.set_image_label(IMG, "weather", Some("rain".into()));
        assert!(store.state().ptr_eq(&before));
        store.set_image_label(IMG, "weather", None);
        assert!(store.annotation(IMG).is_some_and(|a| a.labels.is_empty()));
    }

    #[test]
    fn test_json_round_trip() {
        let store = store_with_boxes();
        let json = store.state().to_json().expect("export");
        assert!(json.contains("\"cat.jpg\""));
        assert!(json.contains("\"boxId\""));
        let imported = AnnotationsState::from_json(&json).expect("import");
        assert_eq!(&imported, store.state());
    }
}
