//! Integer bounding boxes in pixel-index space.
//!
//! A [`PixelBBox`] describes the usable-pixel extent of an exposure. The only
//! mutation it supports is symmetric padding with [`PixelBBox::grow`], which
//! may leave the box empty — an expected terminal state for edge exposures,
//! not an error.

/// An axis-aligned integer box in pixel-index space.
///
/// `width`/`height` are signed so that negative padding can shrink a box
/// through zero; such a box reports [`is_empty`](Self::is_empty) and is
/// skipped by the footprint pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBBox {
    x0: i64,
    y0: i64,
    width: i64,
    height: i64,
}

impl PixelBBox {
    #[inline]
    pub fn new(x0: i64, y0: i64, width: i64, height: i64) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    #[inline]
    pub fn x0(&self) -> i64 {
        self.x0
    }

    #[inline]
    pub fn y0(&self) -> i64 {
        self.y0
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.height
    }

    /// Pads the box by `margin` pixels on every side.
    ///
    /// Positive margins grow the box, negative margins shrink it. Shrinking
    /// past zero extent is allowed and yields an empty box.
    #[must_use]
    pub fn grow(&self, margin: i64) -> Self {
        Self {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            width: self.width + 2 * margin,
            height: self.height + 2 * margin,
        }
    }

    /// True if the box has zero or negative extent in either dimension.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Pixel positions of the four box corners.
    ///
    /// Fixed winding order: bottom-left, top-left, top-right, bottom-right.
    /// The index-to-position convention is identical on both axes (corner
    /// position = index), so `(x0, y0)` itself is the bottom-left corner and
    /// `(x0 + width, y0 + height)` the top-right.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let x_lo = self.x0 as f64;
        let y_lo = self.y0 as f64;
        let x_hi = (self.x0 + self.width) as f64;
        let y_hi = (self.y0 + self.height) as f64;
        [(x_lo, y_lo), (x_lo, y_hi), (x_hi, y_hi), (x_hi, y_lo)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_positive() {
        let b = PixelBBox::new(10, 20, 100, 50).grow(5);
        assert_eq!(b, PixelBBox::new(5, 15, 110, 60));
        assert!(!b.is_empty());
    }

    #[test]
    fn test_grow_negative_to_empty() {
        let b = PixelBBox::new(0, 0, 8, 8).grow(-4);
        assert!(b.is_empty(), "8x8 box shrunk by 4 must be empty");

        let b2 = PixelBBox::new(0, 0, 8, 8).grow(-10);
        assert!(b2.is_empty(), "negative extent counts as empty");
    }

    #[test]
    fn test_zero_width_is_empty() {
        assert!(PixelBBox::new(0, 0, 0, 8).is_empty());
        assert!(PixelBBox::new(0, 0, 8, 0).is_empty());
        assert!(!PixelBBox::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_corner_winding_order() {
        let corners = PixelBBox::new(2, 3, 4, 5).corners();
        assert_eq!(corners[0], (2.0, 3.0), "bottom-left");
        assert_eq!(corners[1], (2.0, 8.0), "top-left");
        assert_eq!(corners[2], (6.0, 8.0), "top-right");
        assert_eq!(corners[3], (6.0, 3.0), "bottom-right");
    }
}
