//! Manipulation handles: which part of a box is grabbed.

use serde::{Deserialize, Serialize};

use super::annotation::{BoundingBox, BoxId};
use super::geometry::{Point, Rect};

/// A draggable part of a bounding box.
///
/// "No handle" is expressed as `Option<ManipulationHandle>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Left,
    Right,
    Top,
    Bottom,
    /// The body of the box: translates without resizing.
    Center,
}

impl ManipulationHandle {
    /// Corner handles in hit-test priority order.
    pub const CORNERS: [ManipulationHandle; 4] = [
        ManipulationHandle::TopLeft,
        ManipulationHandle::TopRight,
        ManipulationHandle::BottomLeft,
        ManipulationHandle::BottomRight,
    ];

    /// Edge-midpoint handles.
    pub const EDGES: [ManipulationHandle; 4] = [
        ManipulationHandle::Left,
        ManipulationHandle::Right,
        ManipulationHandle::Top,
        ManipulationHandle::Bottom,
    ];

    /// The handle on the far side of the box, which stays pinned while this one moves.
    pub fn opposite(&self) -> ManipulationHandle {
        match self {
            ManipulationHandle::TopLeft => ManipulationHandle::BottomRight,
            ManipulationHandle::TopRight => ManipulationHandle::BottomLeft,
            ManipulationHandle::BottomLeft => ManipulationHandle::TopRight,
            ManipulationHandle::BottomRight => ManipulationHandle::TopLeft,
            ManipulationHandle::Left => ManipulationHandle::Right,
            ManipulationHandle::Right => ManipulationHandle::Left,
            ManipulationHandle::Top => ManipulationHandle::Bottom,
            ManipulationHandle::Bottom => ManipulationHandle::Top,
            ManipulationHandle::Center => ManipulationHandle::Center,
        }
    }

    /// Where this handle sits on a rectangle.
    pub fn position(&self, rect: &Rect) -> Point {
        let center = rect.center();
        match self {
            ManipulationHandle::TopLeft => rect.top_left(),
            ManipulationHandle::TopRight => rect.top_right(),
            ManipulationHandle::BottomLeft => rect.bottom_left(),
            ManipulationHandle::BottomRight => rect.bottom_right(),
            ManipulationHandle::Left => Point::new(rect.left, center.y),
            ManipulationHandle::Right => Point::new(rect.right(), center.y),
            ManipulationHandle::Top => Point::new(center.x, rect.top),
            ManipulationHandle::Bottom => Point::new(center.x, rect.bottom()),
            ManipulationHandle::Center => center,
        }
    }

    /// Pointer cursor shown while hovering or dragging this handle.
    pub fn cursor(&self) -> Cursor {
        match self {
            ManipulationHandle::TopLeft | ManipulationHandle::BottomRight => Cursor::NwseResize,
            ManipulationHandle::TopRight | ManipulationHandle::BottomLeft => Cursor::NeswResize,
            ManipulationHandle::Left | ManipulationHandle::Right => Cursor::ColResize,
            ManipulationHandle::Top | ManipulationHandle::Bottom => Cursor::RowResize,
            ManipulationHandle::Center => Cursor::Move,
        }
    }

    /// Check whether `point` grabs this handle of `rect` within `radius` (image space).
    pub fn hit(&self, rect: &Rect, point: &Point, radius: f32) -> bool {
        let within_x = point.x >= rect.left && point.x <= rect.right();
        let within_y = point.y >= rect.top && point.y <= rect.bottom();
        match self {
            ManipulationHandle::Left => within_y && (point.x - rect.left).abs() <= radius,
            ManipulationHandle::Right => within_y && (point.x - rect.right()).abs() <= radius,
            ManipulationHandle::Top => within_x && (point.y - rect.top).abs() <= radius,
            ManipulationHandle::Bottom => within_x && (point.y - rect.bottom()).abs() <= radius,
            ManipulationHandle::Center => rect.contains(point),
            corner => corner.position(rect).distance_to(point) <= radius,
        }
    }
}

/// Cursor affordance reported to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Move,
    NwseResize,
    NeswResize,
    ColResize,
    RowResize,
}

impl Cursor {
    /// CSS cursor name.
    pub fn name(&self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Crosshair => "crosshair",
            Cursor::Move => "move",
            Cursor::NwseResize => "nwse-resize",
            Cursor::NeswResize => "nesw-resize",
            Cursor::ColResize => "col-resize",
            Cursor::RowResize => "row-resize",
        }
    }
}

/// Find the handle under `point`, searching the topmost (last) box first.
///
/// Corners take priority over edges, and edges over the body, so that small boxes can
/// still be resized.
pub fn hit_test_handle(
    boxes: &[BoundingBox],
    point: &Point,
    radius: f32,
) -> Option<(BoxId, ManipulationHandle)> {
    boxes.iter().rev().find_map(|bbox| {
        let rect = bbox.rect();
        ManipulationHandle::CORNERS
            .iter()
            .chain(ManipulationHandle::EDGES.iter())
            .chain(std::iter::once(&ManipulationHandle::Center))
            .find(|handle| handle.hit(&rect, point, radius))
            .map(|handle| (bbox.box_id, *handle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(1, Rect::new(10.0, 10.0, 50.0, 50.0)),
            BoundingBox::new(2, Rect::new(40.0, 40.0, 50.0, 50.0)),
        ]
    }

    #[test]
    fn test_opposite_is_involution() {
        for handle in ManipulationHandle::CORNERS
            .iter()
            .chain(ManipulationHandle::EDGES.iter())
        {
            assert_eq!(handle.opposite().opposite(), *handle);
            assert_ne!(handle.opposite(), *handle);
        }
    }

    #[test]
    fn test_hit_corner_before_edge() {
        let found = hit_test_handle(&boxes(), &Point::new(11.0, 12.0), 3.0);
        assert_eq!(found, Some((1, ManipulationHandle::TopLeft)));
    }

    #[test]
    fn test_hit_edge_and_body() {
        let found = hit_test_handle(&boxes(), &Point::new(10.5, 30.0), 3.0);
        assert_eq!(found, Some((1, ManipulationHandle::Left)));

        let found = hit_test_handle(&boxes(), &Point::new(25.0, 25.0), 3.0);
        assert_eq!(found, Some((1, ManipulationHandle::Center)));
    }

    #[test]
    fn test_topmost_box_wins() {
        // Inside both boxes; box 2 was created last so it is on top.
        let found = hit_test_handle(&boxes(), &Point::new(50.0, 50.0), 3.0);
        assert_eq!(found, Some((2, ManipulationHandle::Center)));
    }

    #[test]
    fn test_miss() {
        assert_eq!(hit_test_handle(&boxes(), &Point::new(200.0, 5.0), 3.0), None);
    }

    #[test]
    fn test_cursor_names() {
        assert_eq!(ManipulationHandle::TopLeft.cursor().name(), "nwse-resize");
        assert_eq!(ManipulationHandle::BottomLeft.cursor().name(), "nesw-resize");
        assert_eq!(ManipulationHandle::Left.cursor().name(), "col-resize");
        assert_eq!(ManipulationHandle::Bottom.cursor().name(), "row-resize");
        assert_eq!(ManipulationHandle::Center.cursor().name(), "move");
    }
}
