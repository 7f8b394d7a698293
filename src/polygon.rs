//! Convex spherical polygons and their 3-D bounding boxes.
//!
//! A [`SkyPolygon`] bounds an exposure's footprint on the unit sphere as an
//! ordered list of unit-vector vertices. In this crate every footprint has
//! exactly four vertices, one per pixel-bbox corner, in the corner winding
//! order (bottom-left, top-left, top-right, bottom-right).
//!
//! # Binary encoding
//!
//! Polygons persist as a self-describing little-endian blob:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 4    | magic `SPLY` |
//! | 4      | 4    | format version (u32) |
//! | 8      | 4    | vertex count (u32) |
//! | 12     | 24×n | x, y, z per vertex (f64) |
//!
//! [`SkyPolygon::decode`] rejects anything that does not match this layout,
//! so a blob is decodable without the database schema around it. The
//! encoding round-trips bit-for-bit.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{FootprintError, FootprintResult};
use crate::mapping::SkyCoord;
use crate::vector::Vector3;

const POLYGON_MAGIC: &[u8; 4] = b"SPLY";
const POLYGON_VERSION: u32 = 1;
const VERTEX_SIZE: usize = 24;
const HEADER_SIZE: usize = 12;

/// Edge arcs are sampled at this many points when computing the bounding
/// box; each sub-arc contributes its sagitta bound as padding.
const EDGE_SAMPLES: usize = 8;

/// A convex polygon on the unit sphere.
///
/// Vertices are ordered unit vectors; consecutive vertices (cyclically) are
/// joined by great-circle arcs. Construction from corners trusts the corner
/// ordering to produce a convex quad and does not re-validate convexity,
/// matching the rectangular-footprint assumption of the pipeline. A mapping
/// with strong distortion near the box edges could in principle break that
/// assumption; see DESIGN.md.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyPolygon {
    vertices: Vec<Vector3>,
}

impl SkyPolygon {
    /// Builds a footprint polygon from four sky corners in winding order.
    ///
    /// # Errors
    /// Returns [`FootprintError::InvalidPolygon`] if any corner has a
    /// non-finite component.
    pub fn from_corners(corners: &[SkyCoord; 4]) -> FootprintResult<Self> {
        let mut vertices = Vec::with_capacity(4);
        for corner in corners {
            if !corner.is_finite() {
                return Err(FootprintError::invalid_polygon(
                    "non-finite sky coordinate",
                ));
            }
            vertices.push(Vector3::from_sky(corner));
        }
        Ok(Self { vertices })
    }

    /// Builds a polygon from pre-computed unit vectors.
    ///
    /// # Errors
    /// Returns [`FootprintError::InvalidPolygon`] for fewer than three
    /// vertices or any non-finite component.
    pub fn from_vertices(vertices: Vec<Vector3>) -> FootprintResult<Self> {
        if vertices.len() < 3 {
            return Err(FootprintError::invalid_polygon(format!(
                "{} vertices, need at least 3",
                vertices.len()
            )));
        }
        for v in &vertices {
            if !v.is_finite() {
                return Err(FootprintError::invalid_polygon("non-finite vertex"));
            }
        }
        Ok(Self { vertices })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    /// Edge arcs as (start, end) vertex pairs, cyclic.
    pub(crate) fn edges(&self) -> impl Iterator<Item = (&Vector3, &Vector3)> {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }

    /// Interior-oriented edge-plane normals.
    ///
    /// The normals are `v_i × v_{i+1}`, flipped if necessary so that every
    /// vertex lies on the non-negative side of every edge plane. Either
    /// winding direction of a proper convex polygon is accepted.
    pub(crate) fn interior_normals(&self) -> Vec<Vector3> {
        let mut normals: Vec<Vector3> = self
            .edges()
            .map(|(a, b)| a.cross(b).normalize())
            .collect();
        // Orientation witness: the vertex opposite the first edge.
        let witness = &self.vertices[2 % self.vertices.len()];
        if normals[0].dot(witness) < 0.0 {
            for n in &mut normals {
                *n = -*n;
            }
        }
        normals
    }

    /// True if the unit vector `p` lies inside or on the polygon boundary.
    pub fn contains(&self, p: &Vector3) -> bool {
        const EPS: f64 = 1e-10;
        self.interior_normals().iter().all(|n| n.dot(p) >= -EPS)
    }

    /// Axis-aligned 3-D box containing the whole polygon region.
    ///
    /// Vertices alone are not enough: a great-circle arc bulges beyond the
    /// box of its endpoints. Each edge is sampled at a fixed number of
    /// points and the box is padded by `(1 - cos(β/2)) / cos(β/2)` for the
    /// sub-arc angle β, which bounds how far the arc between two adjacent
    /// samples can exceed them on any axis. The boundary alone is not
    /// enough either: a polygon wrapping an axis extreme (say the +x
    /// direction) reaches `x = 1` in its interior while its boundary stops
    /// short, so each of the six axis poles lying inside the polygon is
    /// expanded in directly. The result contains every point of the
    /// footprint, which is what makes bbox pruning in queries free of
    /// false negatives.
    pub fn bounding_box(&self) -> BoundingBox3D {
        let mut bbox = BoundingBox3D::empty();
        let mut max_pad = 0.0_f64;

        for v in &self.vertices {
            bbox.expand(v);
        }
        for (a, b) in self.edges() {
            let arc = a.angular_separation(b);
            if arc < 1e-12 {
                continue;
            }
            let sin_arc = arc.sin();
            for i in 1..EDGE_SAMPLES {
                let t = i as f64 / EDGE_SAMPLES as f64;
                let wa = ((1.0 - t) * arc).sin() / sin_arc;
                let wb = (t * arc).sin() / sin_arc;
                let p = Vector3::new(
                    wa * a.x + wb * b.x,
                    wa * a.y + wb * b.y,
                    wa * a.z + wb * b.z,
                );
                bbox.expand(&p);
            }
            let half_cos = (arc / (2.0 * EDGE_SAMPLES as f64)).cos();
            max_pad = max_pad.max((1.0 - half_cos) / half_cos);
        }
        for pole in axis_poles() {
            if self.contains(&pole) {
                bbox.expand(&pole);
            }
        }

        bbox.pad(max_pad + 1e-12);
        bbox.clamp_unit();
        bbox
    }

    /// Serializes the polygon to its self-describing binary form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + VERTEX_SIZE * self.vertices.len());
        let mut scratch = [0u8; 8];
        buf.extend_from_slice(POLYGON_MAGIC);
        LittleEndian::write_u32(&mut scratch[..4], POLYGON_VERSION);
        buf.extend_from_slice(&scratch[..4]);
        LittleEndian::write_u32(&mut scratch[..4], self.vertices.len() as u32);
        buf.extend_from_slice(&scratch[..4]);
        for v in &self.vertices {
            for component in [v.x, v.y, v.z] {
                LittleEndian::write_f64(&mut scratch, component);
                buf.extend_from_slice(&scratch);
            }
        }
        buf
    }

    /// Decodes a polygon from its binary form.
    ///
    /// # Errors
    /// Returns [`FootprintError::Decode`] for a bad magic, unknown version,
    /// truncated payload, or non-finite vertex data.
    pub fn decode(bytes: &[u8]) -> FootprintResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FootprintError::decode(format!(
                "blob too small: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != POLYGON_MAGIC {
            return Err(FootprintError::decode("bad magic"));
        }
        let mut cursor = &bytes[4..];
        let version = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| FootprintError::decode(e.to_string()))?;
        if version != POLYGON_VERSION {
            return Err(FootprintError::decode(format!(
                "unsupported version {}",
                version
            )));
        }
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| FootprintError::decode(e.to_string()))? as usize;
        let expected = HEADER_SIZE + VERTEX_SIZE * count;
        if bytes.len() != expected {
            return Err(FootprintError::decode(format!(
                "expected {} bytes for {} vertices, got {}",
                expected,
                count,
                bytes.len()
            )));
        }
        let mut vertices = Vec::with_capacity(count);
        for _ in 0..count {
            let x = cursor
                .read_f64::<LittleEndian>()
                .map_err(|e| FootprintError::decode(e.to_string()))?;
            let y = cursor
                .read_f64::<LittleEndian>()
                .map_err(|e| FootprintError::decode(e.to_string()))?;
            let z = cursor
                .read_f64::<LittleEndian>()
                .map_err(|e| FootprintError::decode(e.to_string()))?;
            vertices.push(Vector3::new(x, y, z));
        }
        Self::from_vertices(vertices).map_err(|e| FootprintError::decode(e.to_string()))
    }
}

/// The six directions where a coordinate axis meets the sphere.
fn axis_poles() -> [Vector3; 6] {
    [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(0.0, 0.0, -1.0),
    ]
}

/// Minimal axis-aligned box in 3-D Cartesian (unit-sphere) space.
///
/// Derived from a [`SkyPolygon`] or a query region, never mutated
/// independently; the index always recomputes it from authoritative
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox3D {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl BoundingBox3D {
    pub(crate) fn empty() -> Self {
        Self {
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
            z_min: f64::INFINITY,
            z_max: f64::NEG_INFINITY,
        }
    }

    pub(crate) fn expand(&mut self, p: &Vector3) {
        self.x_min = self.x_min.min(p.x);
        self.x_max = self.x_max.max(p.x);
        self.y_min = self.y_min.min(p.y);
        self.y_max = self.y_max.max(p.y);
        self.z_min = self.z_min.min(p.z);
        self.z_max = self.z_max.max(p.z);
    }

    pub(crate) fn pad(&mut self, margin: f64) {
        self.x_min -= margin;
        self.x_max += margin;
        self.y_min -= margin;
        self.y_max += margin;
        self.z_min -= margin;
        self.z_max += margin;
    }

    /// Clamps all intervals to the unit cube containing the sphere.
    pub(crate) fn clamp_unit(&mut self) {
        self.x_min = self.x_min.max(-1.0);
        self.x_max = self.x_max.min(1.0);
        self.y_min = self.y_min.max(-1.0);
        self.y_max = self.y_max.min(1.0);
        self.z_min = self.z_min.max(-1.0);
        self.z_max = self.z_max.min(1.0);
    }

    /// True if all three axis intervals overlap (boundary contact counts).
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x_min <= other.x_max
            && self.x_max >= other.x_min
            && self.y_min <= other.y_max
            && self.y_max >= other.y_min
            && self.z_min <= other.z_max
            && self.z_max >= other.z_min
    }

    /// True if the point lies within the box (boundary inclusive).
    pub fn contains(&self, p: &Vector3) -> bool {
        p.x >= self.x_min
            && p.x <= self.x_max
            && p.y >= self.y_min
            && p.y <= self.y_max
            && p.z >= self.z_min
            && p.z <= self.z_max
    }
}
