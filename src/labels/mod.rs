//! Label store and distance seeding.
//!
//! One randomly drawn record duplicated into four synthetic-ID positives,
//! ten randomly drawn records as negatives, all intra-bucket pairs
//! labelled, then distances materialized onto each label row.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::execution::distance;
use crate::model::{Record, RecordId};

/// A single row of the `labels` table: `(_index_l, _index_r, label,
/// dist_a1, …, dist_am)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub l: RecordId,
    pub r: RecordId,
    /// `1` for a known match, `0` for a known non-match.
    pub label: u8,
    /// Per-attribute Jaro distances, aligned to the attribute list used to
    /// seed this store.
    pub distances: Vec<f64>,
}

impl LabelRow {
    pub fn mean_distance(&self) -> f64 {
        if self.distances.is_empty() {
            0.0
        } else {
            self.distances.iter().sum::<f64>() / self.distances.len() as f64
        }
    }
}

/// Positive/negative seed records and the labelled pairs derived from them.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    pub pos: Vec<Record>,
    pub neg: Vec<Record>,
    pub labels: Vec<LabelRow>,
}

/// Synthetic IDs minted for the three extra positive copies.
const POS_SYNTHETIC_IDS: [i64; 3] = [-3, -2, -1];
const NEG_COUNT: usize = 10;

/// Draw `pos`/`neg` seeds and build `labels` with materialized distances.
///
/// `records` must be non-empty and contain at least one record (for `pos`);
/// if fewer than `NEG_COUNT` records exist, `neg` draws with replacement is
/// never used — negatives are simply capped at `records.len()`.
pub fn seed(records: &[Record], attributes: &[String], rng: &mut impl Rng) -> LabelStore {
    let pos = init_pos(records, rng);
    let neg = init_neg(records, rng);
    let labels = label_buckets(&pos, &neg, attributes);
    LabelStore { pos, neg, labels }
}

/// Recompute `labels` distances without touching `pos`/`neg` membership —
/// used by `resample` to relabel distances only.
pub fn relabel_distances(store: &LabelStore, attributes: &[String]) -> LabelStore {
    let labels = label_buckets(&store.pos, &store.neg, attributes);
    LabelStore { pos: store.pos.clone(), neg: store.neg.clone(), labels }
}

fn init_pos(records: &[Record], rng: &mut impl Rng) -> Vec<Record> {
    let chosen = records.choose(rng).expect("records must be non-empty to seed positives");
    let mut pos = Vec::with_capacity(4);
    for synthetic_id in POS_SYNTHETIC_IDS {
        pos.push(Record::new(synthetic_id, chosen.attributes.clone()));
    }
    pos.push(chosen.clone());
    pos
}

fn init_neg(records: &[Record], rng: &mut impl Rng) -> Vec<Record> {
    let count = NEG_COUNT.min(records.len());
    let indices = rand::seq::index::sample(rng, records.len(), count);
    indices.into_iter().map(|i| records[i].clone()).collect()
}

/// Intra-bucket pairs only: pos×pos labelled `1`, neg×neg labelled `0`.
/// Cross-bucket pairs are never labelled — positives live in `pos`,
/// negatives live in `neg`, and the two buckets are never compared against
/// each other.
fn label_buckets(pos: &[Record], neg: &[Record], attributes: &[String]) -> Vec<LabelRow> {
    let mut rows = Vec::new();
    rows.extend(pairs_within(pos, 1, attributes));
    rows.extend(pairs_within(neg, 0, attributes));
    rows
}

fn pairs_within(bucket: &[Record], label: u8, attributes: &[String]) -> Vec<LabelRow> {
    let mut by_id: std::collections::HashMap<RecordId, Record> = std::collections::HashMap::new();
    for r in bucket {
        by_id.insert(r.id, r.clone());
    }

    let mut pairs = Vec::new();
    for i in 0..bucket.len() {
        for j in (i + 1)..bucket.len() {
            let (l, r) = if bucket[i].id < bucket[j].id {
                (bucket[i].id, bucket[j].id)
            } else {
                (bucket[j].id, bucket[i].id)
            };
            if l != r {
                pairs.push((l, r));
            }
        }
    }
    pairs.sort_unstable();
    pairs.dedup();

    let (matrix, _counters) = distance::compute(&pairs, &by_id, attributes, distance::DEFAULT_CHUNK_SIZE);
    matrix
        .rows
        .into_iter()
        .zip(matrix.pairs)
        .map(|(distances, (l, r))| LabelRow { l, r, label, distances })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn rec(id: i64, surname: &str) -> Record {
        let mut attrs = HashMap::new();
        attrs.insert("surname".to_string(), surname.to_string());
        Record::new(id, attrs)
    }

    fn sample_records(n: usize) -> Vec<Record> {
        (0..n as i64).map(|i| rec(i, "Lee")).collect()
    }

    #[test]
    fn pos_has_four_records_with_three_synthetic_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = seed(&sample_records(20), &["surname".to_string()], &mut rng);
        assert_eq!(store.pos.len(), 4);
        let mut ids: Vec<i64> = store.pos.iter().map(|r| r.id.0).collect();
        ids.sort_unstable();
        assert_eq!(&ids[..3], &[-3, -2, -1]);
    }

    #[test]
    fn neg_has_ten_records() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = seed(&sample_records(20), &["surname".to_string()], &mut rng);
        assert_eq!(store.neg.len(), 10);
    }

    #[test]
    fn labels_are_only_intra_bucket() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = seed(&sample_records(20), &["surname".to_string()], &mut rng);
        // pos: C(4,2)=6 positives, neg: C(10,2)=45 negatives.
        let positives = store.labels.iter().filter(|l| l.label == 1).count();
        let negatives = store.labels.iter().filter(|l| l.label == 0).count();
        assert_eq!(positives, 6);
        assert_eq!(negatives, 45);
    }

    #[test]
    fn resample_keeps_seeds_recomputes_distances() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = seed(&sample_records(20), &["surname".to_string()], &mut rng);
        let resampled = relabel_distances(&store, &["surname".to_string()]);
        assert_eq!(store.pos, resampled.pos);
        assert_eq!(store.neg, resampled.neg);
        assert_eq!(store.labels.len(), resampled.labels.len());
    }
}
