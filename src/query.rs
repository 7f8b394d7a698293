//! Region intersection queries against the footprint index.
//!
//! Two-stage query, same shape as a cone search over a spatial index:
//! a coarse prune via the R*Tree (six interval comparisons against the
//! region's 3-D bounding box, false positives allowed) followed by an
//! exact spherical relate test on each decoded candidate polygon. The
//! bbox stored for each exposure contains its whole polygon, so the prune
//! never drops a true match.

use rusqlite::params;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{FootprintError, FootprintResult};
use crate::polygon::SkyPolygon;
use crate::region::{Region, Relation};
use crate::store::{ExposureInfo, IndexDb};

/// The R*Tree narrows stored boxes to float32 (rounded outward), so only
/// the query side can lose a boundary case to rounding; this pad keeps it
/// sound.
const QUERY_BBOX_PAD: f64 = 1e-6;

impl IndexDb {
    /// Returns every stored exposure whose footprint is not disjoint from
    /// `region`.
    ///
    /// Touching, overlapping, containing, and contained footprints all
    /// count as intersecting. Result order is unspecified; for fixed
    /// stored data and a fixed region the result set is deterministic.
    ///
    /// # Errors
    /// Fails on storage errors, undecodable polygon blobs, or DataId bytes
    /// that do not deserialize to `I`.
    pub fn find_intersecting<I: DeserializeOwned>(
        &self,
        region: &Region,
    ) -> FootprintResult<Vec<ExposureInfo<I>>> {
        let mut bbox = region.bounding_box();
        bbox.pad(QUERY_BBOX_PAD);

        let mut stmt = self.conn.prepare(
            "SELECT e.serialized_data_id, e.encoded_polygon
             FROM exposure e
             JOIN exposure_bbox_index i ON e.rowid = i.id
             WHERE i.x_max >= ?1 AND i.x_min <= ?2
               AND i.y_max >= ?3 AND i.y_min <= ?4
               AND i.z_max >= ?5 AND i.z_min <= ?6",
        )?;
        let candidates = stmt.query_map(
            params![bbox.x_min, bbox.x_max, bbox.y_min, bbox.y_max, bbox.z_min, bbox.z_max],
            |row| {
                let id_bytes: Vec<u8> = row.get(0)?;
                let polygon_blob: Vec<u8> = row.get(1)?;
                Ok((id_bytes, polygon_blob))
            },
        )?;

        let mut results = Vec::new();
        let mut pruned = 0usize;
        for candidate in candidates {
            let (id_bytes, polygon_blob) = candidate?;
            let polygon = SkyPolygon::decode(&polygon_blob)?;
            if polygon.relate(region) == Relation::Disjoint {
                pruned += 1;
                continue;
            }
            let data_id: I = bincode::deserialize(&id_bytes)
                .map_err(|e| FootprintError::id_codec(e.to_string()))?;
            results.push(ExposureInfo::new(data_id, polygon));
        }
        debug!(
            matched = results.len(),
            false_positives = pruned,
            "region query done"
        );
        Ok(results)
    }
}
