//! Invocation-scoped transactional reset.
//!
//! `initialize(reset=true)` rebuilds `df`/`sample`/`pos`/`neg`/`labels`
//! across several steps, and if any step fails partway through, the tables
//! already written during this call must not replace what was there before
//! (reset is transactional at the scope of one invocation; cancellation
//! discards partial state).
//!
//! `ResetTransaction` holds a full `storage::Snapshot` taken at `begin()`
//! and restores it on `Drop` unless `commit()` was called, so every caller
//! of `initialize` gets the same all-or-nothing behavior without having to
//! remember to call an explicit `rollback()` on every error path.

use crate::storage::{Snapshot, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    RolledBack,
}

/// Guards one reset. Borrow the store through `store()` while the
/// transaction is open; call `commit()` once every step has succeeded.
pub struct ResetTransaction<'s, S: TableStore> {
    store: &'s S,
    snapshot: Snapshot,
    committed: bool,
}

impl<'s, S: TableStore> ResetTransaction<'s, S> {
    pub fn begin(store: &'s S) -> Self {
        Self { store, snapshot: store.snapshot(), committed: false }
    }

    pub fn store(&self) -> &S {
        self.store
    }

    /// Keep whatever was written during this transaction.
    pub fn commit(mut self) -> TxOutcome {
        self.committed = true;
        TxOutcome::Committed
    }
}

impl<'s, S: TableStore> Drop for ResetTransaction<'s, S> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.restore(std::mem::take(&mut self.snapshot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::storage::MemoryTableStore;
    use std::collections::HashMap;

    fn rec(id: i64) -> Record {
        Record::new(id, HashMap::new())
    }

    #[tokio::test]
    async fn uncommitted_transaction_restores_prior_state_on_drop() {
        let store = MemoryTableStore::new();
        store.put_df(vec![rec(1)]).await.unwrap();
        {
            let tx = ResetTransaction::begin(&store);
            tx.store().put_df(vec![rec(1), rec(2), rec(3)]).await.unwrap();
            // tx dropped without commit()
        }
        assert_eq!(store.df().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn committed_transaction_keeps_writes() {
        let store = MemoryTableStore::new();
        store.put_df(vec![rec(1)]).await.unwrap();
        {
            let tx = ResetTransaction::begin(&store);
            tx.store().put_df(vec![rec(1), rec(2)]).await.unwrap();
            tx.commit();
        }
        assert_eq!(store.df().await.unwrap().len(), 2);
    }
}
