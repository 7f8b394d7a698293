//! Pixel-to-sky coordinate mappings.
//!
//! The footprint pipeline treats the mapping from pixel positions to sky
//! coordinates as an opaque, caller-supplied transform behind the
//! [`WorldMapping`] trait. A mapping is read-only and this crate never
//! constructs one on its own; [`TanMapping`] is provided as a simple
//! gnomonic (tangent-plane) implementation for callers and tests.

/// A spherical sky coordinate (right ascension / declination equivalent).
///
/// Longitude and latitude in degrees. Values need not be normalized; the
/// unit-vector conversion in [`crate::vector::Vector3::from_sky`] handles any
/// finite angle. Non-finite components mark a malformed mapping result and
/// cause the exposure to be skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    /// Longitude (RA-like), in degrees.
    pub lon_deg: f64,
    /// Latitude (Dec-like), in degrees.
    pub lat_deg: f64,
}

impl SkyCoord {
    #[inline]
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    /// True if both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite()
    }
}

/// A transform from pixel positions to spherical sky coordinates.
///
/// Implementations may return non-finite coordinates for positions they
/// cannot map; the footprint pipeline treats that as a benign per-exposure
/// skip, never a panic.
pub trait WorldMapping {
    fn pixel_to_sky(&self, x: f64, y: f64) -> SkyCoord;
}

/// A gnomonic (tangent-plane, TAN) mapping centered on a reference pixel.
///
/// Pixel offsets from `(crpix_x, crpix_y)` are scaled to tangent-plane
/// degrees and deprojected onto the sphere around `(lon0, lat0)`. Undefined
/// near the poles of the projection; adequate for the small fields this
/// crate indexes.
#[derive(Debug, Clone, Copy)]
pub struct TanMapping {
    lon0_rad: f64,
    sin_lat0: f64,
    cos_lat0: f64,
    crpix_x: f64,
    crpix_y: f64,
    scale_deg: f64,
}

impl TanMapping {
    /// Creates a mapping with sky center `(lon0_deg, lat0_deg)` at pixel
    /// position `(crpix_x, crpix_y)` and a plate scale in degrees per pixel.
    pub fn new(lon0_deg: f64, lat0_deg: f64, crpix_x: f64, crpix_y: f64, scale_deg: f64) -> Self {
        let lat0_rad = lat0_deg.to_radians();
        let (sin_lat0, cos_lat0) = lat0_rad.sin_cos();
        Self {
            lon0_rad: lon0_deg.to_radians(),
            sin_lat0,
            cos_lat0,
            crpix_x,
            crpix_y,
            scale_deg,
        }
    }
}

impl WorldMapping for TanMapping {
    fn pixel_to_sky(&self, x: f64, y: f64) -> SkyCoord {
        // Tangent-plane offsets in radians.
        let xi = ((x - self.crpix_x) * self.scale_deg).to_radians();
        let eta = ((y - self.crpix_y) * self.scale_deg).to_radians();

        // Inverse gnomonic about (lon0, lat0).
        let denom = self.cos_lat0 - eta * self.sin_lat0;
        let lon = self.lon0_rad + xi.atan2(denom);
        let norm = (1.0 + xi * xi + eta * eta).sqrt();
        let lat = ((self.sin_lat0 + eta * self.cos_lat0) / norm).asin();

        SkyCoord::new(lon.to_degrees(), lat.to_degrees())
    }
}
