//! Thumbnail sizing.
//!
//! Thumbnails are generated at the smallest size that still covers the
//! on-screen cell, in device pixels.

use bridge_traits::Size;

/// Scale `size` so it completely covers `target` while keeping its aspect
/// ratio. The dimension that overflows is rounded up.
///
/// Returns [`Size::ZERO`] for an empty `size`.
pub fn aspect_filling(size: Size, target: Size) -> Size {
    if size.is_empty() {
        return Size::ZERO;
    }

    let width_scale = target.width / size.width;
    let height_scale = target.height / size.height;

    if height_scale > width_scale {
        Size::new((height_scale * size.width).ceil(), target.height)
    } else if width_scale > height_scale {
        Size::new(target.width, (width_scale * size.height).ceil())
    } else {
        target
    }
}

/// Convert a size in points to device pixels.
pub fn scaled_to_screen(size: Size, scale: f64) -> Size {
    Size::new(size.width * scale, size.height * scale)
}

/// Maximum generator size for thumbnails of a video with `pixel_size`, shown
/// in cells of `display_size` points on a screen with `scale` pixels per point.
pub fn thumbnail_size(pixel_size: Size, display_size: Size, scale: f64) -> Size {
    scaled_to_screen(aspect_filling(pixel_size, display_size), scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_fills_height() {
        let filled = aspect_filling(Size::new(1920.0, 1080.0), Size::new(80.0, 80.0));
        // 80/1080 * 1920 = 142.2, rounded up
        assert_eq!(filled, Size::new(143.0, 80.0));
    }

    #[test]
    fn test_portrait_fills_width() {
        let filled = aspect_filling(Size::new(1080.0, 1920.0), Size::new(80.0, 80.0));
        assert_eq!(filled, Size::new(80.0, 143.0));
    }

    #[test]
    fn test_matching_aspect_returns_target() {
        let filled = aspect_filling(Size::new(400.0, 200.0), Size::new(100.0, 50.0));
        assert_eq!(filled, Size::new(100.0, 50.0));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(aspect_filling(Size::ZERO, Size::new(80.0, 80.0)), Size::ZERO);
        assert_eq!(
            aspect_filling(Size::new(0.0, 1080.0), Size::new(80.0, 80.0)),
            Size::ZERO
        );
    }

    #[test]
    fn test_thumbnail_size_applies_screen_scale() {
        let size = thumbnail_size(Size::new(1920.0, 1080.0), Size::new(80.0, 80.0), 2.0);
        assert_eq!(size, Size::new(286.0, 160.0));
    }
}
