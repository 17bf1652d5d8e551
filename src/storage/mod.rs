//! # TableStore
//!
//! The contract between entity resolution and wherever its intermediate
//! tables live. Every table — `df`, `sample`, `pos`, `neg`, `labels`,
//! `blocks_df`, `blocks_train`, `comparisons`, `full_comparisons` — is read
//! and written only through this trait.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryTableStore` | `memory` | In-memory for testing/embedding |
//!
//! One async trait, RwLock-protected tables, plus the two read shapes the
//! pipeline needs beyond per-table get/put: a grouped `array_agg` view for
//! rebuilding an index from persisted rows, and a join view for pairing
//! comparisons back up with their source records.

pub mod memory;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::blocking::SchemeId;
use crate::index::Pair;
use crate::labels::LabelRow;
use crate::model::{Record, RecordId};
use crate::Result;

pub use memory::MemoryTableStore;

/// A full snapshot of every table, used by `tx::ResetTransaction` to put
/// the store back exactly as it was if a reset is abandoned partway
/// through.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub df: Vec<Record>,
    pub sample: Vec<Record>,
    pub pos: Vec<Record>,
    pub neg: Vec<Record>,
    pub labels: Vec<LabelRow>,
    pub blocks_df: Vec<(RecordId, SchemeId, String)>,
    pub blocks_train: Vec<(RecordId, SchemeId, String)>,
    pub comparisons: Vec<Pair>,
    pub full_comparisons: Vec<Pair>,
}

/// The universal table contract.
///
/// Intentionally narrow — one method pair per table, plus the two
/// aggregate reads the pipeline actually needs. Trait is `async` even
/// though the in-memory implementation never suspends: storage is a
/// suspension point a future backend (a real database) would need.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn put_df(&self, records: Vec<Record>) -> Result<()>;
    async fn df(&self) -> Result<Vec<Record>>;

    async fn put_sample(&self, records: Vec<Record>) -> Result<()>;
    async fn sample(&self) -> Result<Vec<Record>>;

    async fn put_pos(&self, records: Vec<Record>) -> Result<()>;
    async fn pos(&self) -> Result<Vec<Record>>;

    async fn put_neg(&self, records: Vec<Record>) -> Result<()>;
    async fn neg(&self) -> Result<Vec<Record>>;

    async fn put_labels(&self, rows: Vec<LabelRow>) -> Result<()>;
    async fn labels(&self) -> Result<Vec<LabelRow>>;

    /// `blocks_df`/`blocks_train` are the forward index flattened to
    /// `(record, scheme, signature)` rows — the row-oriented persisted
    /// shape of what `ForwardIndex` holds grouped in memory.
    async fn put_blocks_df(&self, triples: Vec<(RecordId, SchemeId, String)>) -> Result<()>;
    async fn blocks_df(&self) -> Result<Vec<(RecordId, SchemeId, String)>>;

    async fn put_blocks_train(&self, triples: Vec<(RecordId, SchemeId, String)>) -> Result<()>;
    async fn blocks_train(&self) -> Result<Vec<(RecordId, SchemeId, String)>>;

    async fn put_comparisons(&self, pairs: Vec<Pair>) -> Result<()>;
    async fn comparisons(&self) -> Result<Vec<Pair>>;

    async fn put_full_comparisons(&self, pairs: Vec<Pair>) -> Result<()>;
    async fn full_comparisons(&self) -> Result<Vec<Pair>>;

    /// `GROUP BY (scheme, signature)` with `array_agg(record_id)` over a
    /// blocks table — an inverted index reconstructed from persisted rows
    /// rather than built directly from records. Used when rehydrating a
    /// forward index from storage instead of building one fresh with
    /// `ForwardIndex::build`.
    async fn grouped_postings(
        &self,
        triples: &[(RecordId, SchemeId, String)],
    ) -> Result<HashMap<SchemeId, HashMap<String, Vec<RecordId>>>> {
        let mut out: HashMap<SchemeId, HashMap<String, Vec<RecordId>>> = HashMap::new();
        for (id, scheme, signature) in triples {
            out.entry(scheme.clone())
                .or_default()
                .entry(signature.clone())
                .or_default()
                .push(*id);
        }
        for by_signature in out.values_mut() {
            for ids in by_signature.values_mut() {
                ids.sort_unstable();
                ids.dedup();
            }
        }
        Ok(out)
    }

    /// Join `comparisons` (or `full_comparisons`) against `df` on record
    /// id, returning the record pairs a distance computation needs.
    /// Records missing from `df` (stale ids left over from a prior sample)
    /// are silently dropped rather than erroring.
    async fn join_with_records(&self, pairs: &[Pair]) -> Result<Vec<(Record, Record)>> {
        let df = self.df().await?;
        let by_id: HashMap<RecordId, &Record> = df.iter().map(|r| (r.id, r)).collect();
        Ok(pairs
            .iter()
            .filter_map(|(l, r)| Some((by_id.get(l)?.to_owned().clone(), by_id.get(r)?.to_owned().clone())))
            .collect())
    }

    /// Drop every table (`initialize(reset=true)`).
    async fn truncate_all(&self) -> Result<()>;

    fn snapshot(&self) -> Snapshot;
    fn restore(&self, snapshot: Snapshot);
}
