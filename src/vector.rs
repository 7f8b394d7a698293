//! 3-D Cartesian vectors on the unit sphere.
//!
//! Sky positions are given as spherical coordinates but all footprint
//! geometry (polygon membership, bounding boxes, region relations) is
//! cleanest in Cartesian form, so positions are converted once with
//! [`Vector3::from_sky`] and operated on as unit vectors from there.

use crate::mapping::SkyCoord;

/// A 3-D Cartesian vector.
///
/// Components are public for direct access. Vertices of a sky polygon are
/// unit vectors: `x` toward (lon 0, lat 0), `y` toward (lon 90, lat 0),
/// `z` toward the north pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit vector for a sky coordinate (longitude/latitude in degrees).
    pub fn from_sky(coord: &SkyCoord) -> Self {
        let lon = coord.lon_deg.to_radians();
        let lat = coord.lat_deg.to_radians();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let (sin_lat, cos_lat) = lat.sin_cos();
        Self::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    /// Spherical coordinate of this direction, longitude in [0, 360).
    pub fn to_sky(&self) -> SkyCoord {
        let lon = self.y.atan2(self.x).to_degrees().rem_euclid(360.0);
        let lat = (self.z / self.magnitude()).asin().to_degrees();
        SkyCoord::new(lon, lat)
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction; the zero vector is returned
    /// unchanged to avoid NaN.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            *self
        } else {
            Self::new(self.x / mag, self.y / mag, self.z / mag)
        }
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Angular separation from another unit vector, in radians.
    ///
    /// Uses the atan2 form (cross magnitude over dot), which stays accurate
    /// for both very small and near-antipodal separations where a plain
    /// acos of the dot product loses precision.
    pub fn angular_separation(&self, other: &Self) -> f64 {
        self.cross(other).magnitude().atan2(self.dot(other))
    }
}

impl std::ops::Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
