//! In-memory table store.
//!
//! This is the reference implementation of `TableStore`. Each table is a
//! `parking_lot::RwLock<Vec<_>>` behind one shared `Arc` — no real
//! transactions, no persistence across process restarts. Rollback is
//! handled one level up by `tx::ResetTransaction`, which keeps a full
//! `Snapshot` and restores it wholesale rather than asking this store to
//! undo individual writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::blocking::SchemeId;
use crate::index::Pair;
use crate::labels::LabelRow;
use crate::model::{Record, RecordId};
use crate::Result;

use super::{Snapshot, TableStore};

#[derive(Default)]
struct Tables {
    df: Vec<Record>,
    sample: Vec<Record>,
    pos: Vec<Record>,
    neg: Vec<Record>,
    labels: Vec<LabelRow>,
    blocks_df: Vec<(RecordId, SchemeId, String)>,
    blocks_train: Vec<(RecordId, SchemeId, String)>,
    comparisons: Vec<Pair>,
    full_comparisons: Vec<Pair>,
}

/// In-memory `TableStore`.
pub struct MemoryTableStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Tables::default())) }
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryTableStore {
    /// Shares the same underlying tables — cloning a handle, not the data.
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn put_df(&self, records: Vec<Record>) -> Result<()> {
        self.inner.write().df = records;
        Ok(())
    }

    async fn df(&self) -> Result<Vec<Record>> {
        Ok(self.inner.read().df.clone())
    }

    async fn put_sample(&self, records: Vec<Record>) -> Result<()> {
        self.inner.write().sample = records;
        Ok(())
    }

    async fn sample(&self) -> Result<Vec<Record>> {
        Ok(self.inner.read().sample.clone())
    }

    async fn put_pos(&self, records: Vec<Record>) -> Result<()> {
        self.inner.write().pos = records;
        Ok(())
    }

    async fn pos(&self) -> Result<Vec<Record>> {
        Ok(self.inner.read().pos.clone())
    }

    async fn put_neg(&self, records: Vec<Record>) -> Result<()> {
        self.inner.write().neg = records;
        Ok(())
    }

    async fn neg(&self) -> Result<Vec<Record>> {
        Ok(self.inner.read().neg.clone())
    }

    async fn put_labels(&self, rows: Vec<LabelRow>) -> Result<()> {
        self.inner.write().labels = rows;
        Ok(())
    }

    async fn labels(&self) -> Result<Vec<LabelRow>> {
        Ok(self.inner.read().labels.clone())
    }

    async fn put_blocks_df(&self, triples: Vec<(RecordId, SchemeId, String)>) -> Result<()> {
        self.inner.write().blocks_df = triples;
        Ok(())
    }

    async fn blocks_df(&self) -> Result<Vec<(RecordId, SchemeId, String)>> {
        Ok(self.inner.read().blocks_df.clone())
    }

    async fn put_blocks_train(&self, triples: Vec<(RecordId, SchemeId, String)>) -> Result<()> {
        self.inner.write().blocks_train = triples;
        Ok(())
    }

    async fn blocks_train(&self) -> Result<Vec<(RecordId, SchemeId, String)>> {
        Ok(self.inner.read().blocks_train.clone())
    }

    async fn put_comparisons(&self, pairs: Vec<Pair>) -> Result<()> {
        self.inner.write().comparisons = pairs;
        Ok(())
    }

    async fn comparisons(&self) -> Result<Vec<Pair>> {
        Ok(self.inner.read().comparisons.clone())
    }

    async fn put_full_comparisons(&self, pairs: Vec<Pair>) -> Result<()> {
        self.inner.write().full_comparisons = pairs;
        Ok(())
    }

    async fn full_comparisons(&self) -> Result<Vec<Pair>> {
        Ok(self.inner.read().full_comparisons.clone())
    }

    async fn truncate_all(&self) -> Result<()> {
        *self.inner.write() = Tables::default();
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        let t = self.inner.read();
        Snapshot {
            df: t.df.clone(),
            sample: t.sample.clone(),
            pos: t.pos.clone(),
            neg: t.neg.clone(),
            labels: t.labels.clone(),
            blocks_df: t.blocks_df.clone(),
            blocks_train: t.blocks_train.clone(),
            comparisons: t.comparisons.clone(),
            full_comparisons: t.full_comparisons.clone(),
        }
    }

    fn restore(&self, snapshot: Snapshot) {
        let mut t = self.inner.write();
        t.df = snapshot.df;
        t.sample = snapshot.sample;
        t.pos = snapshot.pos;
        t.neg = snapshot.neg;
        t.labels = snapshot.labels;
        t.blocks_df = snapshot.blocks_df;
        t.blocks_train = snapshot.blocks_train;
        t.comparisons = snapshot.comparisons;
        t.full_comparisons = snapshot.full_comparisons;
    }
}
