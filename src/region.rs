//! Query regions and the exact spherical relate test.
//!
//! A query describes a [`Region`] — a spherical cap or another convex
//! polygon. Candidate exposures are first pruned by 3-D bounding-box
//! overlap, then classified exactly with [`SkyPolygon::relate`]; only
//! [`Relation::Disjoint`] results are discarded, so touching, containing,
//! contained, and overlapping footprints all survive.

use crate::mapping::SkyCoord;
use crate::polygon::{BoundingBox3D, SkyPolygon};
use crate::vector::Vector3;

const EPS: f64 = 1e-10;

/// A region of sky to query against the footprint index.
#[derive(Debug, Clone)]
pub enum Region {
    /// Spherical cap: everything within `radius_deg` of `center`.
    Circle {
        center: Vector3,
        radius_deg: f64,
    },
    /// A convex spherical polygon.
    Polygon(SkyPolygon),
}

impl Region {
    /// Convenience constructor for a cap centered on a sky coordinate.
    pub fn circle(center: SkyCoord, radius_deg: f64) -> Self {
        Self::Circle {
            center: Vector3::from_sky(&center),
            radius_deg,
        }
    }

    /// A sound 3-D bounding box for the region.
    ///
    /// For a cap every point is within the chord distance `2 sin(r/2)` of
    /// the center, so each axis interval is the center component plus/minus
    /// the chord, clamped to the unit cube. Looser than the minimal box but
    /// never smaller, which is the property bbox pruning needs.
    pub fn bounding_box(&self) -> BoundingBox3D {
        match self {
            Self::Circle { center, radius_deg } => {
                let chord = 2.0 * (radius_deg.to_radians() / 2.0).sin();
                let mut bbox = BoundingBox3D::empty();
                bbox.expand(center);
                bbox.pad(chord);
                bbox.clamp_unit();
                bbox
            }
            Self::Polygon(polygon) => polygon.bounding_box(),
        }
    }
}

/// Classification of a footprint polygon against a query region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No shared point.
    Disjoint,
    /// Boundaries or interiors overlap without full containment.
    Intersects,
    /// The polygon fully contains the region.
    Contains,
    /// The polygon lies fully within the region.
    Within,
}

impl SkyPolygon {
    /// Exact spherical relation between this polygon and a query region.
    ///
    /// Assumes the polygon is convex and smaller than a hemisphere, which
    /// holds for the four-corner exposure footprints this crate builds.
    /// Cap regions may have any radius, including wider than a hemisphere.
    pub fn relate(&self, region: &Region) -> Relation {
        match region {
            Region::Circle { center, radius_deg } => {
                self.relate_circle(center, radius_deg.to_radians())
            }
            Region::Polygon(other) => self.relate_polygon(other),
        }
    }

    fn relate_circle(&self, center: &Vector3, radius_rad: f64) -> Relation {
        // Polygon within cap: every vertex inside and no edge peaking past
        // the rim. Up to a hemisphere the vertex check alone would do, but
        // a wider cap can lose a mid-edge point, so the edge maxima are
        // bounded explicitly.
        let max_vertex_sep = self
            .vertices()
            .iter()
            .map(|v| center.angular_separation(v))
            .fold(0.0_f64, f64::max);
        if max_vertex_sep <= radius_rad + EPS {
            let max_edge_sep = self
                .edges()
                .map(|(a, b)| point_to_arc_max_distance(center, a, b))
                .fold(0.0_f64, f64::max);
            if max_edge_sep <= radius_rad + EPS {
                return Relation::Within;
            }
        }

        let boundary_dist = self.min_boundary_distance(center);
        if self.contains(center) {
            if boundary_dist >= radius_rad - EPS {
                return Relation::Contains;
            }
            return Relation::Intersects;
        }
        if boundary_dist <= radius_rad + EPS {
            return Relation::Intersects;
        }
        Relation::Disjoint
    }

    fn relate_polygon(&self, other: &SkyPolygon) -> Relation {
        let theirs_inside = other.vertices().iter().filter(|v| self.contains(v)).count();
        let ours_inside = self
            .vertices()
            .iter()
            .filter(|v| other.contains(v))
            .count();

        if theirs_inside == other.vertices().len() && ours_inside < self.vertices().len() {
            return Relation::Contains;
        }
        if ours_inside == self.vertices().len() {
            return Relation::Within;
        }
        if theirs_inside > 0 || ours_inside > 0 {
            return Relation::Intersects;
        }
        for (a, b) in self.edges() {
            for (c, d) in other.edges() {
                if arcs_intersect(a, b, c, d) {
                    return Relation::Intersects;
                }
            }
        }
        Relation::Disjoint
    }

    /// Minimum angular distance from a point to the polygon boundary, in
    /// radians.
    fn min_boundary_distance(&self, p: &Vector3) -> f64 {
        self.edges()
            .map(|(a, b)| point_to_arc_distance(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Angular distance from `p` to the great-circle arc from `a` to `b`.
fn point_to_arc_distance(p: &Vector3, a: &Vector3, b: &Vector3) -> f64 {
    let cross = a.cross(b);
    if cross.magnitude() < EPS {
        // Degenerate edge; fall back to the endpoints.
        return p.angular_separation(a).min(p.angular_separation(b));
    }
    let n = cross.normalize();
    // Foot of the perpendicular from p onto the arc's great circle.
    let off = n.dot(p);
    let foot = Vector3::new(p.x - off * n.x, p.y - off * n.y, p.z - off * n.z).normalize();
    if point_on_arc(&foot, a, b) {
        off.abs().asin()
    } else {
        p.angular_separation(a).min(p.angular_separation(b))
    }
}

/// Angular distance from `p` to the farthest point of the arc from `a` to
/// `b`.
fn point_to_arc_max_distance(p: &Vector3, a: &Vector3, b: &Vector3) -> f64 {
    let cross = a.cross(b);
    if cross.magnitude() < EPS {
        // Degenerate edge; fall back to the endpoints.
        return p.angular_separation(a).max(p.angular_separation(b));
    }
    let n = cross.normalize();
    // The great circle is farthest from p at the antipode of the foot of
    // the perpendicular; the arc peaks there when it covers that point.
    let off = n.dot(p);
    let far = -Vector3::new(p.x - off * n.x, p.y - off * n.y, p.z - off * n.z).normalize();
    if point_on_arc(&far, a, b) {
        p.angular_separation(&far)
    } else {
        p.angular_separation(a).max(p.angular_separation(b))
    }
}

/// True if unit vector `p`, already on the arc's great circle, lies between
/// `a` and `b` along the shorter arc.
fn point_on_arc(p: &Vector3, a: &Vector3, b: &Vector3) -> bool {
    let arc = a.angular_separation(b);
    a.angular_separation(p) + p.angular_separation(b) <= arc + 1e-9
}

/// True if the great-circle arcs `a→b` and `c→d` share a point.
fn arcs_intersect(a: &Vector3, b: &Vector3, c: &Vector3, d: &Vector3) -> bool {
    let n1 = a.cross(b);
    let n2 = c.cross(d);
    let line = n1.cross(&n2);
    if line.magnitude() < EPS {
        // Same great circle: overlap iff an endpoint lies on the other arc.
        return point_on_arc(a, c, d)
            || point_on_arc(b, c, d)
            || point_on_arc(c, a, b)
            || point_on_arc(d, a, b);
    }
    let candidate = line.normalize();
    for p in [candidate, -candidate] {
        if point_on_arc(&p, a, b) && point_on_arc(&p, c, d) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SkyCoord;

    fn quad(lon_lo: f64, lat_lo: f64, lon_hi: f64, lat_hi: f64) -> SkyPolygon {
        SkyPolygon::from_corners(&[
            SkyCoord::new(lon_lo, lat_lo),
            SkyCoord::new(lon_lo, lat_hi),
            SkyCoord::new(lon_hi, lat_hi),
            SkyCoord::new(lon_hi, lat_lo),
        ])
        .expect("valid corners")
    }

    #[test]
    fn test_circle_inside_polygon_is_contains() {
        let p = quad(-10.0, -10.0, 10.0, 10.0);
        let r = Region::circle(SkyCoord::new(0.0, 0.0), 2.0);
        assert_eq!(p.relate(&r), Relation::Contains);
    }

    #[test]
    fn test_polygon_inside_circle_is_within() {
        let p = quad(-1.0, -1.0, 1.0, 1.0);
        let r = Region::circle(SkyCoord::new(0.0, 0.0), 10.0);
        assert_eq!(p.relate(&r), Relation::Within);
    }

    #[test]
    fn test_circle_straddling_edge_intersects() {
        let p = quad(-5.0, -5.0, 5.0, 5.0);
        let r = Region::circle(SkyCoord::new(5.0, 0.0), 1.0);
        assert_eq!(p.relate(&r), Relation::Intersects);
    }

    #[test]
    fn test_circle_outside_near_edge_intersects_within_radius() {
        let p = quad(-5.0, -5.0, 5.0, 5.0);
        // Center ~1 degree outside the east edge, radius 2.
        let r = Region::circle(SkyCoord::new(6.0, 0.0), 2.0);
        assert_eq!(p.relate(&r), Relation::Intersects);
    }

    #[test]
    fn test_wide_cap_edge_bulge_intersects() {
        // Every vertex sits inside the 95-degree cap around the north
        // pole, but the bottom edge geodesic dips to latitude -5.2 and
        // out of it; one more degree of radius takes the whole polygon.
        let p = quad(-40.0, -4.0, 40.0, 30.0);
        let pole = SkyCoord::new(0.0, 90.0);
        assert_eq!(
            p.relate(&Region::circle(pole, 95.0)),
            Relation::Intersects,
            "mid-edge points past the rim"
        );
        assert_eq!(p.relate(&Region::circle(pole, 96.0)), Relation::Within);
    }

    #[test]
    fn test_circle_far_away_is_disjoint() {
        let p = quad(-5.0, -5.0, 5.0, 5.0);
        let r = Region::circle(SkyCoord::new(90.0, 0.0), 2.0);
        assert_eq!(p.relate(&r), Relation::Disjoint);
    }

    #[test]
    fn test_antipodal_circle_is_disjoint() {
        let p = quad(-4.0, -4.0, 4.0, 4.0);
        let r = Region::circle(SkyCoord::new(180.0, 0.0), 1.5);
        assert_eq!(p.relate(&r), Relation::Disjoint);
    }

    #[test]
    fn test_polygon_overlap_intersects() {
        let p = quad(0.0, 0.0, 4.0, 4.0);
        let q = quad(2.0, 2.0, 6.0, 6.0);
        assert_eq!(p.relate(&Region::Polygon(q)), Relation::Intersects);
    }

    #[test]
    fn test_polygon_containment_both_ways() {
        let big = quad(-10.0, -10.0, 10.0, 10.0);
        let small = quad(-1.0, -1.0, 1.0, 1.0);
        assert_eq!(
            big.relate(&Region::Polygon(small.clone())),
            Relation::Contains
        );
        assert_eq!(small.relate(&Region::Polygon(big)), Relation::Within);
    }

    #[test]
    fn test_polygon_disjoint() {
        let p = quad(0.0, 0.0, 4.0, 4.0);
        let q = quad(20.0, 20.0, 24.0, 24.0);
        assert_eq!(p.relate(&Region::Polygon(q)), Relation::Disjoint);
    }

    #[test]
    fn test_crossing_quads_with_no_contained_vertices() {
        // A tall narrow quad crossed by a wide flat one: every vertex of
        // each lies outside the other, only edges cross.
        let tall = quad(-1.0, -10.0, 1.0, 10.0);
        let wide = quad(-10.0, -1.0, 10.0, 1.0);
        assert_eq!(tall.relate(&Region::Polygon(wide)), Relation::Intersects);
    }

    #[test]
    fn test_region_bbox_contains_cap_boundary() {
        let center = SkyCoord::new(30.0, 40.0);
        let r = Region::circle(center, 5.0);
        let bbox = r.bounding_box();
        let c = Vector3::from_sky(&center);
        // Sample points on the cap rim.
        let north = Vector3::from_sky(&SkyCoord::new(30.0, 45.0));
        let south = Vector3::from_sky(&SkyCoord::new(30.0, 35.0));
        assert!(bbox.contains(&c));
        assert!(bbox.contains(&north));
        assert!(bbox.contains(&south));
    }
}
