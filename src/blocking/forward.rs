//! Forward-index construction.
//!
//! For every `(scheme, attribute)` in the catalog, builds a table mapping
//! signature → sorted `record_id`s. Building is embarrassingly parallel
//! across schemes (rayon): one task per `(scheme, attr)`, pure CPU.

use std::collections::HashMap;
use rayon::prelude::*;

use crate::blocking::{Scheme, SchemeId};
use crate::model::{Record, RecordId};

/// `scheme_id -> signature -> sorted, deduped record ids that produced it`.
///
/// This is the posting-list form of the logical relation
/// `(record_id, scheme_id, signature)` — the layout the inverted-index
/// pair generator consumes directly.
#[derive(Debug, Clone, Default)]
pub struct ForwardIndex {
    postings: HashMap<SchemeId, HashMap<String, Vec<RecordId>>>,
}

impl ForwardIndex {
    /// Build the forward index for every scheme in `schemes` over `records`.
    ///
    /// Idempotent: the output depends only on the (scheme, record) pairs,
    /// never on build order, since each scheme's postings are sorted before
    /// being stored. Rerunning with the same inputs produces byte-identical
    /// output.
    pub fn build(schemes: &[Scheme], records: &[Record]) -> Self {
        let per_scheme: Vec<(SchemeId, HashMap<String, Vec<RecordId>>)> = schemes
            .par_iter()
            .map(|scheme| {
                let mut postings: HashMap<String, Vec<RecordId>> = HashMap::new();
                for record in records {
                    for sig in scheme.signatures(record) {
                        postings.entry(sig).or_default().push(record.id);
                    }
                }
                for ids in postings.values_mut() {
                    ids.sort_unstable();
                    ids.dedup();
                }
                (scheme.id(), postings)
            })
            .collect();

        let mut postings = HashMap::with_capacity(per_scheme.len());
        postings.extend(per_scheme);
        Self { postings }
    }

    /// Rebuild a forward index from an already-grouped postings map, as
    /// returned by `TableStore::grouped_postings` — used to rehydrate an
    /// index from persisted `blocks_df`/`blocks_train` rows instead of
    /// recomputing signatures from records with `build`.
    pub fn from_postings(postings: HashMap<SchemeId, HashMap<String, Vec<RecordId>>>) -> Self {
        Self { postings }
    }

    pub fn postings(&self, scheme: &SchemeId) -> Option<&HashMap<String, Vec<RecordId>>> {
        self.postings.get(scheme)
    }

    pub fn schemes(&self) -> impl Iterator<Item = &SchemeId> {
        self.postings.keys()
    }

    /// Flatten to the logical `(record_id, scheme_id, signature)` relation,
    /// sorted for deterministic round-tripping.
    pub fn triples(&self) -> Vec<(RecordId, SchemeId, String)> {
        let mut out = Vec::new();
        for (scheme_id, postings) in &self.postings {
            for (sig, ids) in postings {
                for id in ids {
                    out.push((*id, scheme_id.clone(), sig.clone()));
                }
            }
        }
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(&b.2)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::scheme::{Scheme, SchemeKind};
    use std::collections::HashMap as Map;

    fn rec(id: i64, surname: &str) -> Record {
        let mut attrs = Map::new();
        attrs.insert("surname".to_string(), surname.to_string());
        Record::new(id, attrs)
    }

    #[test]
    fn groups_records_sharing_a_signature() {
        let records = vec![rec(1, "Lee"), rec(2, "Lee"), rec(3, "Kim")];
        let schemes = vec![Scheme::new(SchemeKind::Exact, "surname", None)];
        let idx = ForwardIndex::build(&schemes, &records);
        let postings = idx.postings(&schemes[0].id()).unwrap();
        assert_eq!(postings.get("lee").unwrap(), &vec![RecordId(1), RecordId(2)]);
        assert_eq!(postings.get("kim").unwrap(), &vec![RecordId(3)]);
    }

    #[test]
    fn idempotent_across_builds() {
        let records = vec![rec(1, "Lee"), rec(2, "Lea"), rec(3, "Kim")];
        let schemes = vec![Scheme::new(SchemeKind::Ngrams, "surname", Some(2))];
        let a = ForwardIndex::build(&schemes, &records).triples();
        let b = ForwardIndex::build(&schemes, &records).triples();
        assert_eq!(a, b);
    }

    #[test]
    fn round_trips_through_postings() {
        let records = vec![rec(1, "Lee"), rec(2, "Lee"), rec(3, "Kim")];
        let schemes = vec![Scheme::new(SchemeKind::Exact, "surname", None)];
        let built = ForwardIndex::build(&schemes, &records);
        let triples = built.triples();

        let mut postings: HashMap<SchemeId, HashMap<String, Vec<RecordId>>> = HashMap::new();
        for (id, scheme, sig) in &triples {
            postings.entry(scheme.clone()).or_default().entry(sig.clone()).or_default().push(*id);
        }
        let rebuilt = ForwardIndex::from_postings(postings);
        assert_eq!(rebuilt.triples(), triples);
    }
}
