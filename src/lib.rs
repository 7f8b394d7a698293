//! Sky-footprint indexing for astronomical exposures.
//!
//! Converts an exposure's pixel bounding box and world-coordinate mapping
//! into a convex spherical polygon, persists that polygon keyed by an
//! opaque caller identifier, maintains an R*Tree index over each polygon's
//! 3-D bounding box, and answers "which exposures intersect region R"
//! queries with no false negatives.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`pixel`] | [`PixelBBox`] — integer pixel boxes, padding, corner positions |
//! | [`mapping`] | [`WorldMapping`] trait, [`SkyCoord`], gnomonic [`TanMapping`] |
//! | [`vector`] | [`Vector3`] unit-sphere Cartesian math |
//! | [`polygon`] | [`SkyPolygon`], [`BoundingBox3D`], binary encoding |
//! | [`region`] | [`Region`] query shapes and the exact [`Relation`] test |
//! | [`adapter`] | [`compute_footprint`] — bbox + mapping → polygon or skip |
//! | [`store`] | [`IndexDb`] — SQLite persistence, insert/replace semantics |
//! | [`query`] | [`IndexDb::find_intersecting`] — prune via R*Tree, refine exactly |
//! | [`runner`] | [`index_exposures`] — parallel compute, deferred or immediate writes |
//!
//! # Quick Start
//!
//! ```
//! use footprint_index::{
//!     index_exposures, DbConfig, ExposureSource, IndexDb, PixelBBox, Region, RunConfig,
//!     SkyCoord, TanMapping,
//! };
//!
//! # fn main() -> Result<(), footprint_index::FootprintError> {
//! let mut db = IndexDb::open(&DbConfig::in_memory())?;
//!
//! let sources = vec![ExposureSource {
//!     data_id: 42u64,
//!     bbox: PixelBBox::new(0, 0, 2048, 2048),
//!     mapping: TanMapping::new(83.6, -5.4, 1024.0, 1024.0, 0.0003),
//! }];
//! let report = index_exposures(&mut db, &RunConfig::default(), sources)?;
//! assert_eq!(report.stored, 1);
//!
//! let region = Region::circle(SkyCoord::new(83.6, -5.4), 0.1);
//! let hits = db.find_intersecting::<u64>(&region)?;
//! assert_eq!(hits[0].data_id, 42);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod error;
pub mod mapping;
pub mod pixel;
pub mod polygon;
pub mod query;
pub mod region;
pub mod runner;
pub mod store;
pub mod vector;

pub use adapter::{compute_footprint, Footprint, SkipReason};
pub use error::{FootprintError, FootprintResult};
pub use mapping::{SkyCoord, TanMapping, WorldMapping};
pub use pixel::PixelBBox;
pub use polygon::{BoundingBox3D, SkyPolygon};
pub use region::{Region, Relation};
pub use runner::{
    compute_all, index_exposures, ComputeOutcome, ExposureSource, RunConfig, RunReport,
};
pub use store::{DbConfig, DbLocation, ExposureInfo, IndexDb, StoreFailure, StoreReport};
