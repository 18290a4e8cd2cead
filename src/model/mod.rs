//! Data models for the BBAT core.

mod annotation;
mod geometry;
mod handle;

pub use annotation::{BoundingBox, BoxId, BoxPatch, ImageAnnotation, ImageMetadata};
pub use geometry::{ImageSize, Point, Rect};
pub use handle::{Cursor, ManipulationHandle, hit_test_handle};
