//! Global constants for the BBAT core

/// Minimum width/height of a committed bounding box, in image pixels.
pub const MIN_BOX_SIZE: f32 = 10.0;

/// Number of annotation snapshots kept by the undo/redo history.
pub const UNDO_HISTORY_SIZE: usize = 50;

/// Handle grab radius in device pixels (scaled into image space by the zoom).
pub const HANDLE_HIT_RADIUS: f32 = 6.0;

/// Detections at or below this probability are dropped on merge.
pub const DEFAULT_PROB_THRESHOLD: f32 = 0.7;

/// Pointer-move events processed per second during a drag.
pub const DEFAULT_POINTER_MOVE_HZ: u32 = 60;

/// Smallest scale the viewport will report before it is treated as invalid.
pub const MIN_VIEWPORT_SCALE: f32 = 1e-6;

/// Image key used when no image has been opened yet.
pub const NO_IMAGE_KEY: &str = "__no_image__";
