//! Box geometry engine.
//!
//! Computes new box rectangles for create/move/resize gestures. Every result passes
//! through [`clamp_to_bounds`], which keeps boxes inside the image and at least
//! `min_size` wide and tall.

use crate::model::{ImageSize, ManipulationHandle, Point, Rect};

/// Compute the rectangle produced by dragging `handle` of `original` to `current`.
///
/// `original` is the box as it was when the gesture started and `anchor` the pointer
/// position at that moment; both stay fixed for the whole gesture. Corner and edge
/// handles place the moving edges at the pointer and pin the opposite edges. The body
/// handle translates by `current - anchor`.
pub fn resize(
    original: &Rect,
    handle: ManipulationHandle,
    current: Point,
    anchor: Point,
    min_size: f32,
    bounds: ImageSize,
) -> Rect {
    if !current.is_finite() || !anchor.is_finite() {
        return clamp_to_bounds(*original, min_size, bounds);
    }

    let (width, height) = bounds.extent();
    let cx = current.x.max(0.0).min(width);
    let cy = current.y.max(0.0).min(height);

    let left = original.left;
    let top = original.top;
    let right = original.right();
    let bottom = original.bottom();

    // Moving edges never cross their pinned partner: each is held at least
    // `min_size` away from it.
    let drag_left = || cx.min(right - min_size);
    let drag_right = || cx.max(left + min_size);
    let drag_top = || cy.min(bottom - min_size);
    let drag_bottom = || cy.max(top + min_size);

    let candidate = match handle {
        ManipulationHandle::TopLeft => edges(drag_left(), drag_top(), right, bottom),
        ManipulationHandle::TopRight => edges(left, drag_top(), drag_right(), bottom),
        ManipulationHandle::BottomLeft => edges(drag_left(), top, right, drag_bottom()),
        ManipulationHandle::BottomRight => edges(left, top, drag_right(), drag_bottom()),
        ManipulationHandle::Left => edges(drag_left(), top, right, bottom),
        ManipulationHandle::Right => edges(left, top, drag_right(), bottom),
        ManipulationHandle::Top => edges(left, drag_top(), right, bottom),
        ManipulationHandle::Bottom => edges(left, top, right, drag_bottom()),
        ManipulationHandle::Center => {
            let dx = cx - anchor.x;
            let dy = cy - anchor.y;
            Rect::new(
                (left + dx).min(width - original.width).max(0.0),
                (top + dy).min(height - original.height).max(0.0),
                original.width,
                original.height,
            )
        }
    };

    clamp_to_bounds(candidate, min_size, bounds)
}

/// The rectangle spanned by the gesture anchor and the current pointer.
pub fn create_from_anchor(anchor: Point, current: Point) -> Rect {
    Rect::from_corners(anchor, current)
}

/// Rectangle for a finished creation gesture, or `None` if it is too small to keep.
pub fn finish_creation(
    anchor: Point,
    current: Point,
    min_size: f32,
    bounds: ImageSize,
) -> Option<Rect> {
    if !anchor.is_finite() || !current.is_finite() {
        return None;
    }
    let (width, height) = bounds.extent();
    let clamp = |p: Point| Point::new(p.x.max(0.0).min(width), p.y.max(0.0).min(height));

    let rect = create_from_anchor(clamp(anchor), clamp(current));
    if is_degenerate(&rect, min_size) {
        return None;
    }
    Some(clamp_to_bounds(rect, min_size, bounds))
}

/// Whether a rectangle is below the minimum box size on either axis.
pub fn is_degenerate(rect: &Rect, min_size: f32) -> bool {
    !(rect.width >= min_size && rect.height >= min_size)
}

/// Final authority on box validity.
///
/// Clamps left/top into `[0, dimension - min_size]` and width/height into
/// `[min_size, dimension - left]` (resp. top). Images smaller than `min_size` cannot
/// hold a valid box; the result then simply covers the whole image.
pub fn clamp_to_bounds(rect: Rect, min_size: f32, bounds: ImageSize) -> Rect {
    let (width, height) = bounds.extent();
    let (left, w) = clamp_span(rect.left, rect.width, min_size, width);
    let (top, h) = clamp_span(rect.top, rect.height, min_size, height);
    Rect::new(left, top, w, h)
}

fn clamp_span(position: f32, length: f32, min_size: f32, limit: f32) -> (f32, f32) {
    let position = finite_or(position, 0.0);
    let length = finite_or(length, min_size);
    let position = position.min(limit - min_size).max(0.0);
    let length = length.max(min_size).min(limit - position);
    (position, length)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn edges(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
    Rect::new(left, top, right - left, bottom - top)
}
