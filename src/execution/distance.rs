//! Distance engine.
//!
//! Computes a per-attribute Jaro similarity matrix over candidate pairs.
//! Parallelized in fixed-size row chunks (default 1000 pairs per chunk)
//! using rayon; `par_chunks().flat_map()` preserves the original pair
//! order regardless of worker count, so parallelism never affects results.

use std::collections::HashMap;
use rayon::prelude::*;

use crate::index::Pair;
use crate::model::{Record, RecordId};

/// Default chunk size for parallel distance computation.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Non-fatal, queryable-after-the-run counters.
#[derive(Debug, Clone, Default)]
pub struct RunCounters {
    /// Incremented once per (pair, attribute) where the attribute was
    /// missing on either endpoint. Treated as similarity 0; recorded here
    /// rather than surfaced as an error.
    pub distance_errors: u64,
}

/// Aligned `pairs.len() x attributes.len()` matrix of Jaro similarities.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    pub pairs: Vec<Pair>,
    pub attributes: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    pub fn mean_scores(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| {
                if row.is_empty() { 0.0 } else { row.iter().sum::<f64>() / row.len() as f64 }
            })
            .collect()
    }
}

/// Compute the distance matrix for `pairs`.
///
/// `records` is a single lookup covering both sides — in dedupe mode there
/// is one table; in record-linkage mode left/right ids are globally
/// unique, so one map serves both. Missing attribute on either endpoint
/// contributes `0.0` and increments `RunCounters::distance_errors`.
pub fn compute(
    pairs: &[Pair],
    records: &HashMap<RecordId, Record>,
    attributes: &[String],
    chunk_size: usize,
) -> (DistanceMatrix, RunCounters) {
    let chunk_size = chunk_size.max(1);

    let results: Vec<(Vec<Vec<f64>>, u64)> = pairs
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut errors = 0u64;
            let rows: Vec<Vec<f64>> = chunk
                .iter()
                .map(|(l, r)| {
                    let left = records.get(l);
                    let right = records.get(r);
                    attributes
                        .iter()
                        .map(|attr| {
                            let lv = left.and_then(|rec| rec.get(attr));
                            let rv = right.and_then(|rec| rec.get(attr));
                            match (lv, rv) {
                                (Some(a), Some(b)) => strsim::jaro(a, b),
                                _ => {
                                    errors += 1;
                                    0.0
                                }
                            }
                        })
                        .collect()
                })
                .collect();
            (rows, errors)
        })
        .collect();

    let mut rows = Vec::with_capacity(pairs.len());
    let mut counters = RunCounters::default();
    for (chunk_rows, chunk_errors) in results {
        rows.extend(chunk_rows);
        counters.distance_errors += chunk_errors;
    }

    (
        DistanceMatrix { pairs: pairs.to_vec(), attributes: attributes.to_vec(), rows },
        counters,
    )
}

/// Compute the distance matrix over already-joined record pairs, as
/// returned by `TableStore::join_with_records` — skips the lookup-map step
/// `compute` needs when the caller has already resolved both sides (and
/// already dropped any pair referencing a record no longer in `df`).
pub fn compute_joined(
    joined: &[(Record, Record)],
    attributes: &[String],
    chunk_size: usize,
) -> (DistanceMatrix, RunCounters) {
    let chunk_size = chunk_size.max(1);

    let results: Vec<(Vec<Vec<f64>>, u64)> = joined
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut errors = 0u64;
            let rows: Vec<Vec<f64>> = chunk
                .iter()
                .map(|(left, right)| {
                    attributes
                        .iter()
                        .map(|attr| match (left.get(attr), right.get(attr)) {
                            (Some(a), Some(b)) => strsim::jaro(a, b),
                            _ => {
                                errors += 1;
                                0.0
                            }
                        })
                        .collect()
                })
                .collect();
            (rows, errors)
        })
        .collect();

    let mut rows = Vec::with_capacity(joined.len());
    let mut counters = RunCounters::default();
    for (chunk_rows, chunk_errors) in results {
        rows.extend(chunk_rows);
        counters.distance_errors += chunk_errors;
    }

    let pairs = joined.iter().map(|(l, r)| (l.id, r.id)).collect();
    (DistanceMatrix { pairs, attributes: attributes.to_vec(), rows }, counters)
}
