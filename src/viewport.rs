//! Device-to-image coordinate mapping under a pan/zoom transform.
//!
//! The viewport itself is owned by the zoom/pan widget; the core only reads it. The
//! helpers here are pure functions so they can be tested without any UI.

use serde::{Deserialize, Serialize};

use crate::constants::MIN_VIEWPORT_SCALE;
use crate::model::{ImageSize, Point, Rect};

/// Pan offset and scale of the image inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan_x: f32,
    pub pan_y: f32,
    pub scale: f32,
}

impl Viewport {
    pub fn new(pan_x: f32, pan_y: f32, scale: f32) -> Self {
        Self {
            pan_x,
            pan_y,
            scale,
        }
    }

    /// Create an identity viewport (scale=1, no pan).
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Whether the scale is usable as a divisor.
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
            && self.scale >= MIN_VIEWPORT_SCALE
            && self.pan_x.is_finite()
            && self.pan_y.is_finite()
    }

    /// Map a device point to image space and clamp it to the image.
    ///
    /// `(device - origin - pan) / scale` per axis, then clamped into
    /// `[0, dimension]`. Unknown image dimensions clamp into a 1x1 space. An invalid
    /// viewport maps as identity so the result is never NaN or infinite.
    pub fn to_image_space(&self, device: Point, container_origin: Point, image: ImageSize) -> Point {
        let viewport = if self.is_valid() {
            *self
        } else {
            log::warn!("Invalid viewport {:?}, mapping pointer with identity", self);
            Self::identity()
        };
        let (width, height) = image.extent();
        let x = (device.x - container_origin.x - viewport.pan_x) / viewport.scale;
        let y = (device.y - container_origin.y - viewport.pan_y) / viewport.scale;
        Point::new(clamp_axis(x, width), clamp_axis(y, height))
    }

    /// Map an image point back to device space (for overlays drawn by the renderer).
    pub fn to_device_space(&self, image_point: Point, container_origin: Point) -> Point {
        Point::new(
            image_point.x * self.scale + self.pan_x + container_origin.x,
            image_point.y * self.scale + self.pan_y + container_origin.y,
        )
    }

    /// Convert a device-pixel distance into image pixels at this zoom.
    pub fn device_to_image_distance(&self, distance: f32) -> f32 {
        if self.is_valid() {
            distance / self.scale
        } else {
            distance
        }
    }

    /// Viewport that fits the whole image inside the container, centred.
    pub fn fit(image: ImageSize, container_width: f32, container_height: f32) -> Self {
        let (width, height) = image.extent();
        let container_width = if container_width > 0.0 { container_width } else { width };
        let container_height = if container_height > 0.0 { container_height } else { height };

        let ratio = (container_width / width).min(container_height / height);
        Self {
            pan_x: (container_width - width * ratio) / 2.0,
            pan_y: (container_height - height * ratio) / 2.0,
            scale: ratio,
        }
    }

    /// Viewport centring `rect` in the container, zoomed so the box fills half its height.
    pub fn zoom_to_box(rect: Rect, container_width: f32, container_height: f32) -> Self {
        let scale = (container_height / (rect.height.max(1.0) * 2.0)).max(MIN_VIEWPORT_SCALE);
        let center = rect.center();
        Self {
            pan_x: container_width / 2.0 - center.x * scale,
            pan_y: container_height / 2.0 - center.y * scale,
            scale,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

/// Clamp one axis into `[0, max]`, mapping NaN to 0.
fn clamp_axis(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_mapping() {
        let p = Viewport::identity().to_image_space(
            Point::new(30.0, 40.0),
            Point::default(),
            ImageSize::new(100, 100),
        );
        assert_eq!(p, Point::new(30.0, 40.0));
    }

    #[test]
    fn test_pan_scale_and_origin() {
        let viewport = Viewport::new(20.0, 10.0, 2.0);
        let p = viewport.to_image_space(
            Point::new(130.0, 60.0),
            Point::new(10.0, 10.0),
            ImageSize::new(640, 480),
        );
        // (130 - 10 - 20) / 2 = 50, (60 - 10 - 10) / 2 = 20
        assert!(approx_eq(p.x, 50.0));
        assert!(approx_eq(p.y, 20.0));
    }

    #[test]
    fn test_clamps_to_image() {
        let viewport = Viewport::identity();
        let image = ImageSize::new(100, 50);
        let p = viewport.to_image_space(Point::new(-40.0, 900.0), Point::default(), image);
        assert_eq!(p, Point::new(0.0, 50.0));
    }

    #[test]
    fn test_unknown_dimensions_clamp_to_unit() {
        let p = Viewport::identity().to_image_space(
            Point::new(40.0, 40.0),
            Point::default(),
            ImageSize::default(),
        );
        assert_eq!(p, Point::new(1.0, 1.0));
    }

    #[test]
    fn test_extreme_scales_stay_finite() {
        let image = ImageSize::new(100, 100);
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY, 1e-5, 1e6] {
            let p = Viewport::new(0.0, 0.0, scale).to_image_space(
                Point::new(50.0, 50.0),
                Point::default(),
                image,
            );
            assert!(p.is_finite(), "scale {scale} produced {p:?}");
            assert!(p.x >= 0.0 && p.x <= 100.0);
        }
    }

    #[test]
    fn test_device_round_trip() {
        let viewport = Viewport::new(15.0, -5.0, 3.0);
        let origin = Point::new(4.0, 8.0);
        let device = viewport.to_device_space(Point::new(12.0, 7.0), origin);
        let back = viewport.to_image_space(device, origin, ImageSize::new(100, 100));
        assert!(approx_eq(back.x, 12.0));
        assert!(approx_eq(back.y, 7.0));
    }

    #[test]
    fn test_fit_centres_image() {
        let fit = Viewport::fit(ImageSize::new(200, 100), 400.0, 400.0);
        assert!(approx_eq(fit.scale, 2.0));
        assert!(approx_eq(fit.pan_x, 0.0));
        assert!(approx_eq(fit.pan_y, 100.0));
    }

    #[test]
    fn test_zoom_to_box_centres_box() {
        let rect = Rect::new(100.0, 100.0, 20.0, 50.0);
        let viewport = Viewport::zoom_to_box(rect, 800.0, 600.0);
        assert!(approx_eq(viewport.scale, 6.0));
        let center = viewport.to_device_space(rect.center(), Point::default());
        assert!(approx_eq(center.x, 400.0));
        assert!(approx_eq(center.y, 300.0));
    }
}
