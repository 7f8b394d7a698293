//! Footprint computation: pixel bbox + world mapping → sky polygon.
//!
//! [`compute_footprint`] is the pure per-exposure step of the pipeline. It
//! pads the pixel box, projects the four corners through the caller's
//! [`WorldMapping`], and assembles a [`SkyPolygon`]. Failures here are
//! benign per-exposure skips — an empty padded box or a mapping that
//! returns non-finite coordinates — and never panic or abort a batch.

use tracing::warn;

use crate::mapping::{SkyCoord, WorldMapping};
use crate::pixel::PixelBBox;
use crate::polygon::SkyPolygon;

/// Why an exposure produced no footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The padded pixel box has zero or negative extent.
    EmptyBBox,
    /// The world mapping returned NaN or infinity for a corner.
    NonFiniteSky,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBBox => write!(f, "empty bounding box"),
            Self::NonFiniteSky => write!(f, "non-finite sky coordinate - bad mapping"),
        }
    }
}

/// Outcome of a footprint computation.
#[derive(Debug, Clone)]
pub enum Footprint {
    Computed(SkyPolygon),
    Skipped(SkipReason),
}

/// Projects a padded pixel bbox onto the sky as a convex polygon.
///
/// `pad_pixels` is applied to the box before projection; positive values
/// grow the box, negative values shrink it. Skips (never errors) when the
/// padded box is empty or the mapping produces a non-finite coordinate.
pub fn compute_footprint(
    bbox: &PixelBBox,
    mapping: &dyn WorldMapping,
    pad_pixels: i64,
) -> Footprint {
    let padded = bbox.grow(pad_pixels);
    if padded.is_empty() {
        return Footprint::Skipped(SkipReason::EmptyBBox);
    }

    let mut corners = [SkyCoord::new(0.0, 0.0); 4];
    for (slot, (x, y)) in corners.iter_mut().zip(padded.corners()) {
        let coord = mapping.pixel_to_sky(x, y);
        if !coord.is_finite() {
            return Footprint::Skipped(SkipReason::NonFiniteSky);
        }
        *slot = coord;
    }

    match SkyPolygon::from_corners(&corners) {
        Ok(polygon) => Footprint::Computed(polygon),
        Err(err) => {
            // Corners were checked finite above; a constructor failure here
            // still maps to the benign skip path rather than an abort.
            warn!(error = %err, "footprint construction failed after projection");
            Footprint::Skipped(SkipReason::NonFiniteSky)
        }
    }
}
