//! # entity-resolve
//!
//! Entity resolution core: blocking, conjunction search, candidate scoring,
//! and clustering for dedupe and record-linkage workloads.
//!
//! ## Design Principles
//!
//! 1. **Trait-first storage**: `TableStore` is the contract between the
//!    orchestrator and wherever its intermediate tables live.
//! 2. **Clean DTOs**: `Record`, `RecordId`, `Settings` cross every boundary.
//! 3. **Blocking owns nothing**: a scheme is a pure function, record → set.
//! 4. **Backend-agnostic planner**: the conjunction search doesn't know
//!    whether its forward index came from memory or a real store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_resolve::{Deduper, Settings};
//! use std::collections::HashMap;
//!
//! # async fn example() -> entity_resolve::Result<()> {
//! let settings = Settings { attributes: vec!["given".into(), "surname".into()], ..Default::default() };
//! let deduper = Deduper::new(settings)?;
//!
//! let mut row = HashMap::new();
//! row.insert("given".to_string(), "Ann".to_string());
//! row.insert("surname".to_string(), "Lee".to_string());
//!
//! deduper.initialize(vec![row], None, true, false).await?;
//! deduper.fit_blocks().await?;
//! let prediction = deduper.predict().await?;
//! println!("{} clusters found", prediction.clusters.assignments.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | Memory | `storage::memory` | In-memory tables for testing/embedding |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod blocking;
pub mod index;
pub mod labels;
pub mod planner;
pub mod execution;
pub mod storage;
pub mod tx;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Attributes, Record, RecordId, Settings, TableSide};
pub use storage::{MemoryTableStore, TableStore};
pub use execution::{Classification, ClusterAssignment, Clusters};
pub use planner::StatsDict;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use blocking::scheme::catalog;
use blocking::ForwardIndex;
use index::Topology;
use labels::LabelStore;

// ============================================================================
// Run status
// ============================================================================

/// Non-fatal conditions observed while fitting/predicting, queryable after
/// the run instead of raised as an error.
#[derive(Debug, Clone, Default)]
pub struct RunStatus {
    /// Attribute missing on at least one endpoint of a pair; treated as
    /// similarity 0 and counted, never surfaced as `Error`.
    pub distance_errors: u64,
    /// No conjunction reached `min_rr` with positive coverage; `predict`
    /// returns an empty cluster table rather than failing.
    pub empty_candidate_set: bool,
    /// Fewer than 2 positive or 2 negative labels; threshold classification
    /// fell back to `Settings::threshold`.
    pub label_shortage: bool,
}

/// Cluster assignments paired with the run conditions that produced them.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub clusters: Clusters,
    pub status: RunStatus,
}

// ============================================================================
// Deduper
// ============================================================================

/// Top-level entity-resolution handle, wiring blocking, planning, and
/// execution the way a query engine wires parse → plan → optimize →
/// execute: `initialize` loads records and seeds the active-learning
/// tables, `fit_blocks` searches for and materializes a blocking
/// conjunction, `predict` scores and clusters the resulting candidate
/// pairs.
pub struct Deduper {
    settings: Settings,
    store: MemoryTableStore,
    side: RwLock<HashMap<RecordId, TableSide>>,
    next_id: AtomicI64,
}

impl Deduper {
    /// Construct a handle backed by the in-memory reference `TableStore`.
    /// Fails fast on invalid settings, before any table is touched — a
    /// config error surfaces to the caller before any write happens.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            store: MemoryTableStore::new(),
            side: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(0),
        })
    }

    /// Borrow the underlying store — for callers wiring their own
    /// `TableStore` implementation in, or introspecting raw tables.
    pub fn store(&self) -> &MemoryTableStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load records, building `sample`/`pos`/`neg`/`labels` if `reset`, or
    /// redrawing `sample` and recomputing label distances if `resample`.
    /// Transactional at the scope of this call: on error the tables are
    /// left exactly as they were.
    pub async fn initialize(
        &self,
        df: Vec<Attributes>,
        df2: Option<Vec<Attributes>>,
        reset: bool,
        resample: bool,
    ) -> Result<()> {
        for row in df.iter().chain(df2.iter().flatten()) {
            if row.contains_key("_index") {
                return Err(Error::Config("input columns must not include \"_index\"".into()));
            }
        }
        if df2.is_some() && self.settings.dedupe {
            return Err(Error::Config("a second table was supplied but dedupe=true".into()));
        }

        if reset {
            let tx = tx::ResetTransaction::begin(&self.store);
            self.do_reset(df, df2).await?;
            tx.commit();
        } else if resample {
            let tx = tx::ResetTransaction::begin(&self.store);
            self.do_resample().await?;
            tx.commit();
        }
        Ok(())
    }

    async fn do_reset(&self, df: Vec<Attributes>, df2: Option<Vec<Attributes>>) -> Result<()> {
        self.store.truncate_all().await?;
        self.next_id.store(0, Ordering::SeqCst);

        let mut side = HashMap::new();
        let mut records = self.ingest(df, if df2.is_some() { Some(TableSide::Left) } else { None }, &mut side);
        if let Some(right) = df2 {
            records.extend(self.ingest(right, Some(TableSide::Right), &mut side));
        }
        *self.side.write() = side;

        info!(count = records.len(), "loaded records");
        self.store.put_df(records.clone()).await?;

        let sample = draw_sample(&records, self.settings.n);
        self.store.put_sample(sample).await?;

        let mut rng = StdRng::from_entropy();
        let store = labels::seed(&records, &self.settings.attributes, &mut rng);
        self.store.put_pos(store.pos).await?;
        self.store.put_neg(store.neg).await?;
        self.store.put_labels(store.labels).await?;

        Ok(())
    }

    async fn do_resample(&self) -> Result<()> {
        let df = self.store.df().await?;
        let sample = draw_sample(&df, self.settings.n);
        self.store.put_sample(sample).await?;

        let store = LabelStore {
            pos: self.store.pos().await?,
            neg: self.store.neg().await?,
            labels: Vec::new(),
        };
        let relabelled = labels::relabel_distances(&store, &self.settings.attributes);
        self.store.put_labels(relabelled.labels).await?;
        Ok(())
    }

    fn ingest(
        &self,
        rows: Vec<Attributes>,
        side_tag: Option<TableSide>,
        side: &mut HashMap<RecordId, TableSide>,
    ) -> Vec<Record> {
        rows.into_iter()
            .map(|attrs| {
                let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst));
                if let Some(tag) = side_tag {
                    side.insert(id, tag);
                }
                Record::new(id, attrs)
            })
            .collect()
    }

    /// Build forward indices over the current sample and full record set,
    /// search for the best covering conjunction, and materialize
    /// `comparisons`/`full_comparisons`.
    pub async fn fit_blocks(&self) -> Result<()> {
        let schemes = catalog(&self.settings.attributes);
        let sample = self.store.sample().await?;
        let df = self.store.df().await?;
        let labels = LabelStore {
            pos: self.store.pos().await?,
            neg: self.store.neg().await?,
            labels: self.store.labels().await?,
        };

        let sample_forward = ForwardIndex::build(&schemes, &sample);
        self.store.put_blocks_train(sample_forward.triples()).await?;

        let side = self.side.read().clone();
        let topology = if self.settings.dedupe { Topology::Dedupe } else { Topology::Linkage { side: &side } };

        info!(schemes = schemes.len(), sample = sample.len(), "searching for best conjunction");
        let ranked = planner::conjunctions(
            &schemes,
            &sample_forward,
            &labels,
            &topology,
            sample.len(),
            self.settings.k,
            self.settings.min_rr,
            self.settings.cpus,
        );

        if ranked.is_empty() {
            warn!("no admissible conjunction found; candidate set is empty");
            self.store.put_comparisons(Vec::new()).await?;
            self.store.put_full_comparisons(Vec::new()).await?;
            return Ok(());
        }

        let selected = planner::best_schemes(&ranked, self.settings.max_compare as u64);

        let train_pairs: Vec<_> = planner::comparisons(&sample_forward, &selected, &topology).into_iter().collect();
        self.store.put_comparisons(train_pairs).await?;

        let built_full_forward = ForwardIndex::build(&schemes, &df);
        let full_triples = built_full_forward.triples();
        self.store.put_blocks_df(full_triples.clone()).await?;
        // Rehydrate from the rows just persisted rather than reuse the
        // in-memory build, exercising the same path a database-backed
        // `TableStore` would take after a process restart.
        let full_forward = ForwardIndex::from_postings(self.store.grouped_postings(&full_triples).await?);
        let full_pairs: Vec<_> = planner::comparisons(&full_forward, &selected, &topology).into_iter().collect();
        info!(pairs = full_pairs.len(), "materialized full candidate pairs");
        self.store.put_full_comparisons(full_pairs).await?;

        Ok(())
    }

    /// Score candidate pairs and cluster the accepted ones into entities.
    /// Returns an empty cluster table (with `status.empty_candidate_set`
    /// set) when `fit_blocks` found nothing.
    pub async fn predict(&self) -> Result<Prediction> {
        let full_comparisons = self.store.full_comparisons().await?;
        let mut status = RunStatus::default();

        if full_comparisons.is_empty() {
            status.empty_candidate_set = true;
            return Ok(Prediction { clusters: Clusters::default(), status });
        }

        // Join through storage rather than build the lookup map here — drops
        // any pair referencing a record a later `initialize` has already
        // pruned from `df`.
        let joined = self.store.join_with_records(&full_comparisons).await?;
        let (matrix, counters) = execution::distance::compute_joined(
            &joined,
            &self.settings.attributes,
            execution::distance::DEFAULT_CHUNK_SIZE,
        );
        status.distance_errors = counters.distance_errors;

        let df = self.store.df().await?;

        let labels = self.store.labels().await?;
        let labelled: Vec<(f64, u8)> = labels.iter().map(|row| (row.mean_distance(), row.label)).collect();
        let positives = labelled.iter().filter(|(_, l)| *l == 1).count();
        let negatives = labelled.iter().filter(|(_, l)| *l == 0).count();
        status.label_shortage = positives < 2 || negatives < 2;

        let threshold = execution::classify::learn_threshold(&labelled, self.settings.threshold);
        let classified = execution::classify::classify(&matrix, threshold);
        let matches = classified.matches();

        let all_ids: Vec<RecordId> = df.iter().map(|r| r.id).collect();
        let side = self.side.read().clone();
        let clusters = if self.settings.dedupe {
            execution::cluster::components(&matches, &all_ids, None)
        } else {
            execution::cluster::components(&matches, &all_ids, Some(&side))
        };

        info!(clusters = clusters.assignments.len(), "predicted clusters");
        Ok(Prediction { clusters, status })
    }

    /// Up to `limit` rows of the current `sample` table, for labeling tools.
    pub async fn samples(&self, limit: usize) -> Result<Vec<Record>> {
        let mut sample = self.store.sample().await?;
        sample.truncate(limit);
        Ok(sample)
    }

    /// Append a human-supplied label to the `labels` table outside of
    /// `pos`/`neg` seeding — the write surface the active-learning loop
    /// needs.
    pub async fn label_pair(&self, l: RecordId, r: RecordId, label: u8) -> Result<()> {
        let df = self.store.df().await?;
        let by_id: HashMap<RecordId, Record> = df.into_iter().map(|row| (row.id, row)).collect();
        let (ordered_l, ordered_r) = if l < r { (l, r) } else { (r, l) };

        let (matrix, _) = execution::distance::compute(
            &[(ordered_l, ordered_r)],
            &by_id,
            &self.settings.attributes,
            execution::distance::DEFAULT_CHUNK_SIZE,
        );
        let distances = matrix.rows.into_iter().next().unwrap_or_default();

        let mut labels = self.store.labels().await?;
        labels.push(labels::LabelRow { l: ordered_l, r: ordered_r, label, distances });
        self.store.put_labels(labels).await?;
        Ok(())
    }
}

fn draw_sample(records: &[Record], n: usize) -> Vec<Record> {
    if records.len() <= n {
        return records.to_vec();
    }
    let mut rng = StdRng::from_entropy();
    let indices = rand::seq::index::sample(&mut rng, records.len(), n);
    indices.into_iter().map(|i| records[i].clone()).collect()
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
