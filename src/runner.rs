//! Batch orchestration: parallel footprint computation plus serialized
//! persistence.
//!
//! The footprint computation for each exposure is pure and independent, so
//! the batch phase runs on the rayon pool with no shared mutable state.
//! Persistence is the single shared resource (one writer at a time), and
//! the controller owns both phases of the two-phase protocol:
//!
//! 1. [`compute_all`] — parallel, pure, yields computed footprints and
//!    benign skips;
//! 2. storage — either one deferred `store` call with the full collection
//!    (default, one synchronization point per batch) or immediate
//!    streaming of each result to the writer as it is produced.
//!
//! Skips are terminal: they are logged, counted in the [`RunReport`], and
//! never retried or allowed to abort sibling exposures.

use std::sync::mpsc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::adapter::{compute_footprint, Footprint, SkipReason};
use crate::error::FootprintResult;
use crate::mapping::WorldMapping;
use crate::pixel::PixelBBox;
use crate::store::{ExposureInfo, IndexDb, StoreFailure, StoreReport};

/// Options for one indexing run.
///
/// Connection-scoped options (location, init statements) belong to
/// [`DbConfig`](crate::store::DbConfig) and are consumed when the database
/// is opened; everything here applies per run against an already-open
/// handle.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Permit overwrite of an existing DataId (default false).
    pub allow_replace: bool,
    /// Collect all results and store once at the end (default), instead of
    /// storing each result as it is produced.
    pub defer_writes: bool,
    /// Pixel-bbox padding applied before projection (default 0).
    pub pad_pixels: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            allow_replace: false,
            defer_writes: true,
            pad_pixels: 0,
        }
    }
}

/// One exposure to index: caller identifier, usable-pixel extent, and the
/// caller's pixel-to-sky mapping.
#[derive(Debug, Clone)]
pub struct ExposureSource<I, M> {
    pub data_id: I,
    pub bbox: PixelBBox,
    pub mapping: M,
}

/// Per-exposure result of the compute phase.
#[derive(Debug)]
pub enum ComputeOutcome<I> {
    Computed(ExposureInfo<I>),
    Skipped { data_id: I, reason: SkipReason },
}

/// Aggregate result of a run, surfaced once at the end.
#[derive(Debug)]
pub struct RunReport<I> {
    pub stored: usize,
    pub skipped: Vec<(I, SkipReason)>,
    pub failures: Vec<StoreFailure>,
}

impl<I> RunReport<I> {
    fn new() -> Self {
        Self {
            stored: 0,
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Computes footprints for a batch of exposures in parallel.
///
/// Pure phase: no storage access, no shared mutable state. Outcomes come
/// back in input order.
pub fn compute_all<I, M>(
    sources: Vec<ExposureSource<I, M>>,
    pad_pixels: i64,
) -> Vec<ComputeOutcome<I>>
where
    I: Send,
    M: WorldMapping + Sync + Send,
{
    sources
        .into_par_iter()
        .map(|source| outcome_for(source, pad_pixels))
        .collect()
}

fn outcome_for<I, M: WorldMapping>(
    source: ExposureSource<I, M>,
    pad_pixels: i64,
) -> ComputeOutcome<I> {
    match compute_footprint(&source.bbox, &source.mapping, pad_pixels) {
        Footprint::Computed(polygon) => {
            ComputeOutcome::Computed(ExposureInfo::new(source.data_id, polygon))
        }
        Footprint::Skipped(reason) => ComputeOutcome::Skipped {
            data_id: source.data_id,
            reason,
        },
    }
}

/// Indexes a batch of exposures into `db` per `config`.
///
/// Deferred mode collects every computed footprint and issues a single
/// `store` call; immediate mode streams each result to the calling thread
/// (the single writer) over a channel and stores it on arrival. Either way,
/// skips and per-item integrity failures are collected into the report and
/// never abort the batch; only fatal storage errors do.
pub fn index_exposures<I, M>(
    db: &mut IndexDb,
    config: &RunConfig,
    sources: Vec<ExposureSource<I, M>>,
) -> FootprintResult<RunReport<I>>
where
    I: Serialize + Send,
    M: WorldMapping + Sync + Send,
{
    if config.defer_writes {
        index_deferred(db, config, sources)
    } else {
        index_immediate(db, config, sources)
    }
}

fn index_deferred<I, M>(
    db: &mut IndexDb,
    config: &RunConfig,
    sources: Vec<ExposureSource<I, M>>,
) -> FootprintResult<RunReport<I>>
where
    I: Serialize + Send,
    M: WorldMapping + Sync + Send,
{
    let mut report = RunReport::new();
    let mut computed = Vec::new();
    for outcome in compute_all(sources, config.pad_pixels) {
        collect_outcome(outcome, &mut computed, &mut report);
    }
    let store_report = db.store(&computed, config.allow_replace)?;
    merge_store_report(&mut report, store_report);
    Ok(report)
}

fn index_immediate<I, M>(
    db: &mut IndexDb,
    config: &RunConfig,
    sources: Vec<ExposureSource<I, M>>,
) -> FootprintResult<RunReport<I>>
where
    I: Serialize + Send,
    M: WorldMapping + Sync + Send,
{
    let mut report = RunReport::new();
    let (sender, receiver) = mpsc::channel();
    let pad_pixels = config.pad_pixels;

    // The scope must run in place: the drain loop below owns the calling
    // thread and every pool worker stays free for the spawned producer,
    // so a single-thread pool still makes progress.
    rayon::in_place_scope(|scope| -> FootprintResult<()> {
        scope.spawn(move |_| {
            sources.into_par_iter().for_each_with(sender, |tx, source| {
                // A closed channel means the writer bailed on a fatal
                // storage error; nothing useful to do with the result.
                let _ = tx.send(outcome_for(source, pad_pixels));
            });
        });

        // The calling thread is the single writer; workers only compute.
        for outcome in receiver {
            match outcome {
                ComputeOutcome::Computed(info) => {
                    let store_report = db.store(std::slice::from_ref(&info), config.allow_replace)?;
                    merge_store_report(&mut report, store_report);
                }
                ComputeOutcome::Skipped { data_id, reason } => {
                    warn!(%reason, "skipping exposure");
                    report.skipped.push((data_id, reason));
                }
            }
        }
        Ok(())
    })?;

    Ok(report)
}

fn collect_outcome<I>(
    outcome: ComputeOutcome<I>,
    computed: &mut Vec<ExposureInfo<I>>,
    report: &mut RunReport<I>,
) {
    match outcome {
        ComputeOutcome::Computed(info) => computed.push(info),
        ComputeOutcome::Skipped { data_id, reason } => {
            warn!(%reason, "skipping exposure");
            report.skipped.push((data_id, reason));
        }
    }
}

fn merge_store_report<I>(report: &mut RunReport<I>, store_report: StoreReport) {
    report.stored += store_report.stored;
    report.failures.extend(store_report.failures);
}
