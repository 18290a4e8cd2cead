//! Merging object-detector output into the annotation store.
//!
//! The detector itself is a black box that returns corner-form rectangles with a class
//! index and a probability. Results may arrive long after they were requested, so ids
//! are allocated against the store as it is at merge time.

use serde::{Deserialize, Serialize};

use crate::geometry::clamp_to_bounds;
use crate::model::{BoundingBox, BoxId, ImageSize, Point, Rect};
use crate::store::AnnotationStore;

/// Corner-form rectangle as produced by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DetectionRect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
    }

    fn to_rect(self) -> Rect {
        Rect::from_corners(Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }
}

/// One detected object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub bbox: DetectionRect,
    #[serde(alias = "class")]
    pub class_id: u32,
    #[serde(alias = "prob")]
    pub probability: f32,
}

impl Detection {
    pub fn new(bbox: DetectionRect, class_id: u32, probability: f32) -> Self {
        Self {
            bbox,
            class_id,
            probability,
        }
    }
}

/// Convert detections above `threshold` into boxes with ids starting at `first_id`.
///
/// Labels read `Dtc{class}_{index}_{percent}`, where `index` counts kept detections
/// only. Rectangles are clamped into the image when its dimensions are known.
pub fn detections_to_boxes(
    detections: &[Detection],
    threshold: f32,
    first_id: BoxId,
    bounds: ImageSize,
    min_size: f32,
) -> Vec<BoundingBox> {
    detections
        .iter()
        .filter(|d| d.probability > threshold && d.bbox.is_finite())
        .enumerate()
        .map(|(index, detection)| {
            let mut rect = detection.bbox.to_rect();
            if bounds.is_known() {
                rect = clamp_to_bounds(rect, min_size, bounds);
            }
            let percent = (detection.probability * 100.0).round() as u32;
            BoundingBox::new(first_id + index as BoxId, rect)
                .with_class(detection.class_id)
                .with_label(format!("Dtc{}_{}_{}", detection.class_id, index, percent))
        })
        .collect()
}

/// Append detections to an image as one batch. Returns the ids of the new boxes.
pub fn merge_detections(
    store: &mut AnnotationStore,
    image_id: &str,
    detections: &[Detection],
    threshold: f32,
    min_size: f32,
) -> Vec<BoxId> {
    let bounds = store
        .annotation(image_id)
        .map(|a| a.size())
        .unwrap_or_default();
    let first_id = store.next_box_id(image_id);
    let boxes = detections_to_boxes(detections, threshold, first_id, bounds, min_size);
    let ids: Vec<BoxId> = boxes.iter().map(|b| b.box_id).collect();

    log::info!(
        "Merging {} of {} detections into {image_id:?} (threshold {threshold})",
        boxes.len(),
        detections.len()
    );
    store.add_boxes(image_id, boxes);
    ids
}
