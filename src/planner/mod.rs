//! Conjunction optimizer and aggregator: searches for which combinations of
//! blocking schemes, ANDed together, are worth running.
//!
//! A dynamic-programming chain per starting scheme, memoized on the sorted
//! scheme tuple, run in parallel across starting schemes and reduced to a
//! top-cover selection. The thing being searched for is a conjunction of
//! blocking schemes, scored by reduction ratio and label coverage rather
//! than picked by rewrite rules.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::blocking::{ForwardIndex, Scheme, SchemeId, SchemeKind};
use crate::index::{self, Topology};
use crate::labels::LabelStore;

/// Per-conjunction evaluation record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsDict {
    /// Sorted tuple of scheme identifiers.
    pub scheme: Vec<SchemeId>,
    pub n_pairs: u64,
    pub rr: f64,
    pub positives: f64,
    pub negatives: f64,
    pub n_scheme: u32,
}

/// `(positives > 0) ∧ (rr < 1) ∧ (n_pairs > 1) ∧ (at most one ngrams scheme)`.
fn is_admissible(stats: &StatsDict, kinds: &HashMap<SchemeId, SchemeKind>) -> bool {
    let ngram_count = stats
        .scheme
        .iter()
        .filter(|id| matches!(kinds.get(*id), Some(SchemeKind::Ngrams)))
        .count();
    stats.positives > 0.0 && stats.rr < 1.0 && stats.n_pairs > 1 && ngram_count <= 1
}

/// Evaluate one conjunction: reduction ratio plus positive/negative
/// coverage against the labelled sample.
fn evaluate(
    names: &[SchemeId],
    sample_forward: &ForwardIndex,
    labels: &LabelStore,
    topology: &Topology,
    n: usize,
) -> StatsDict {
    let train_pairs = index::pairs_for_conjunction(sample_forward, names, topology);
    let n_pairs = train_pairs.len() as u64;
    let n_comparisons = (n as f64) * ((n as f64) - 1.0) / 2.0;
    let rr = if n_comparisons > 0.0 { 1.0 - (n_pairs as f64 / n_comparisons) } else { 1.0 };

    let blocked = |l, r| train_pairs.contains(&(l, r)) || train_pairs.contains(&(r, l));
    let (mut pos_hits, mut pos_total, mut neg_hits, mut neg_total) = (0u64, 0u64, 0u64, 0u64);
    for row in &labels.labels {
        let hit = blocked(row.l, row.r);
        if row.label == 1 {
            pos_total += 1;
            pos_hits += hit as u64;
        } else {
            neg_total += 1;
            neg_hits += hit as u64;
        }
    }
    let positives = if pos_total > 0 { pos_hits as f64 / pos_total as f64 } else { 0.0 };
    let negatives = if neg_total > 0 { neg_hits as f64 / neg_total as f64 } else { 0.0 };

    StatsDict { scheme: names.to_vec(), n_pairs, rr, positives, negatives, n_scheme: names.len() as u32 }
}

/// Memoized wrapper around `evaluate`, keyed on the sorted scheme tuple:
/// the same sub-conjunction is revisited across many starting schemes, so
/// the memo is shared across the whole search.
fn score(
    names: &[SchemeId],
    sample_forward: &ForwardIndex,
    labels: &LabelStore,
    topology: &Topology,
    n: usize,
    memo: &DashMap<Vec<SchemeId>, StatsDict>,
) -> StatsDict {
    let mut sorted = names.to_vec();
    sorted.sort_unstable();
    if let Some(hit) = memo.get(&sorted) {
        return hit.clone();
    }
    let stats = evaluate(&sorted, sample_forward, labels, topology, n);
    memo.insert(sorted, stats.clone());
    stats
}

/// Build the best conjunction chain of length up to `k` starting from
/// `start`.
///
/// Returns `None` if the single-scheme conjunction fails the early-return
/// gate: zero positive coverage, `rr` below `min_rr`, or `rr == 1` (a
/// perfect-pruning scheme that also throws away every true match).
/// Reduction ratio only grows as schemes are ANDed in, so once the
/// starting scheme clears `min_rr` every extension of it does too — no
/// separate `min_rr` check is needed inside the loop.
pub fn best_chain(
    start: &SchemeId,
    catalog_kinds: &HashMap<SchemeId, SchemeKind>,
    sample_forward: &ForwardIndex,
    labels: &LabelStore,
    topology: &Topology,
    n: usize,
    k: usize,
    min_rr: f64,
    memo: &DashMap<Vec<SchemeId>, StatsDict>,
) -> Option<Vec<StatsDict>> {
    let stats0 = score(std::slice::from_ref(start), sample_forward, labels, topology, n, memo);
    if stats0.positives == 0.0 || stats0.rr < min_rr || stats0.rr == 1.0 {
        return None;
    }

    let mut dp = vec![stats0];
    for _ in 1..k {
        let prev = dp.last().unwrap();
        let in_use: HashSet<&SchemeId> = prev.scheme.iter().collect();

        let mut candidates: Vec<StatsDict> = catalog_kinds
            .keys()
            .filter(|x| !in_use.contains(x))
            .map(|x| {
                let mut combo = prev.scheme.clone();
                combo.push(x.clone());
                score(&combo, sample_forward, labels, topology, n, memo)
            })
            .filter(|stats| is_admissible(stats, catalog_kinds))
            .collect();

        if candidates.is_empty() {
            break;
        }

        // Lexicographic: maximize (rr, positives, -negatives, -n_scheme).
        candidates.sort_by(|a, b| {
            a.rr.partial_cmp(&b.rr)
                .unwrap()
                .then_with(|| a.positives.partial_cmp(&b.positives).unwrap())
                .then_with(|| b.negatives.partial_cmp(&a.negatives).unwrap())
                .then_with(|| a.n_scheme.cmp(&b.n_scheme).reverse())
        });
        dp.push(candidates.pop().unwrap());
    }
    Some(dp)
}

/// Run `best_chain` in parallel over every scheme in `catalog`,
/// deduplicate by scheme set, and sort by `rr` descending.
///
/// `cpus` sizes a dedicated rayon pool for this call so worker count never
/// leaks between invocations and never affects the result — output stays
/// deterministic regardless of pool size.
pub fn conjunctions(
    catalog: &[Scheme],
    sample_forward: &ForwardIndex,
    labels: &LabelStore,
    topology: &Topology,
    n: usize,
    k: usize,
    min_rr: f64,
    cpus: Option<usize>,
) -> Vec<StatsDict> {
    let kinds: HashMap<SchemeId, SchemeKind> = catalog.iter().map(|s| (s.id(), s.kind)).collect();
    let memo: DashMap<Vec<SchemeId>, StatsDict> = DashMap::new();

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = cpus {
        builder = builder.num_threads(n);
    }
    let pool = builder.build().expect("failed to build conjunction-search thread pool");

    let chains: Vec<Vec<StatsDict>> = pool.install(|| {
        catalog
            .par_iter()
            .filter_map(|scheme| {
                best_chain(&scheme.id(), &kinds, sample_forward, labels, topology, n, k, min_rr, &memo)
            })
            .collect()
    });

    let mut seen = HashSet::new();
    let mut flat: Vec<StatsDict> =
        chains.into_iter().flatten().filter(|stats| seen.insert(stats.scheme.clone())).collect();

    flat.sort_by(|a, b| b.rr.partial_cmp(&a.rr).unwrap());
    flat
}

/// Prefix of `ranked` whose cumulative `n_pairs` stays below `n_covered`.
pub fn best_schemes(ranked: &[StatsDict], n_covered: u64) -> Vec<Vec<SchemeId>> {
    let mut cumulative = 0u64;
    let mut out = Vec::new();
    for stats in ranked {
        cumulative += stats.n_pairs;
        if cumulative >= n_covered {
            break;
        }
        out.push(stats.scheme.clone());
    }
    out
}

/// Union of `index::pairs_for_conjunction` over every selected scheme set.
/// Called once more against `full`, not `sample`, once a conjunction is
/// finally chosen.
pub fn comparisons(
    forward: &ForwardIndex,
    schemes: &[Vec<SchemeId>],
    topology: &Topology,
) -> HashSet<index::Pair> {
    let mut out = HashSet::new();
    for names in schemes {
        out.extend(index::pairs_for_conjunction(forward, names, topology));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::scheme::{catalog, Scheme as SchemeCtor, SchemeKind as Kind};
    use crate::blocking::ForwardIndex;
    use crate::model::Record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap as Map;

    fn rec(id: i64, given: &str, surname: &str) -> Record {
        let mut attrs = Map::new();
        attrs.insert("given".to_string(), given.to_string());
        attrs.insert("surname".to_string(), surname.to_string());
        Record::new(id, attrs)
    }

    #[test]
    fn admissibility_rejects_multiple_ngram_schemes() {
        let kinds: HashMap<SchemeId, SchemeKind> = [
            (SchemeId("ngrams_given_2".into()), Kind::Ngrams),
            (SchemeId("ngrams_surname_2".into()), Kind::Ngrams),
        ]
        .into_iter()
        .collect();
        let stats = StatsDict {
            scheme: vec![SchemeId("ngrams_given_2".into()), SchemeId("ngrams_surname_2".into())],
            n_pairs: 10,
            rr: 0.9,
            positives: 1.0,
            negatives: 0.1,
            n_scheme: 2,
        };
        assert!(!is_admissible(&stats, &kinds));
    }

    #[test]
    fn full_exact_conjunction_is_rejected_for_rr_one() {
        // 1000 records with all-distinct (given, surname) pairs: AND-ing
        // exact(given) with exact(surname) prunes every pair down to none.
        let records: Vec<Record> =
            (0..1000i64).map(|i| rec(i, &format!("g{i}"), &format!("s{i}"))).collect();
        let attrs = vec!["given".to_string(), "surname".to_string()];
        let schemes =
            vec![SchemeCtor::new(Kind::Exact, "given", None), SchemeCtor::new(Kind::Exact, "surname", None)];
        let forward = ForwardIndex::build(&schemes, &records);
        let names = vec![schemes[0].id(), schemes[1].id()];
        let mut rng = StdRng::seed_from_u64(1);
        let labels = crate::labels::seed(&records, &attrs, &mut rng);
        let stats = evaluate(&names, &forward, &labels, &Topology::Dedupe, records.len());
        assert_eq!(stats.rr, 1.0);
    }

    #[test]
    fn best_chain_respects_min_rr_gate() {
        let records: Vec<Record> = (0..50i64).map(|i| rec(i, "Ann", &format!("s{i}"))).collect();
        let attrs = vec!["given".to_string(), "surname".to_string()];
        let all = catalog(&attrs);
        let kinds: HashMap<SchemeId, SchemeKind> = all.iter().map(|s| (s.id(), s.kind)).collect();
        let forward = ForwardIndex::build(&all, &records);
        let mut rng = StdRng::seed_from_u64(3);
        let labels = crate::labels::seed(&records, &attrs, &mut rng);
        let start = SchemeCtor::new(Kind::LastNChars, "surname", Some(1)).id();
        let memo = DashMap::new();
        let result =
            best_chain(&start, &kinds, &forward, &labels, &Topology::Dedupe, records.len(), 3, 0.99, &memo);
        if let Some(chain) = result {
            assert!(chain[0].rr >= 0.99);
        }
    }

    #[test]
    fn conjunctions_search_is_deterministic_across_pool_sizes() {
        let records: Vec<Record> = (0..60i64).map(|i| rec(i, "Ann", &format!("s{i}"))).collect();
        let attrs = vec!["given".to_string(), "surname".to_string()];
        let all = catalog(&attrs);
        let forward = ForwardIndex::build(&all, &records);
        let mut rng = StdRng::seed_from_u64(9);
        let labels = crate::labels::seed(&records, &attrs, &mut rng);

        let one = conjunctions(&all, &forward, &labels, &Topology::Dedupe, records.len(), 3, 0.99, Some(1));
        let many = conjunctions(&all, &forward, &labels, &Topology::Dedupe, records.len(), 3, 0.99, Some(4));
        assert_eq!(one, many);
    }

    #[test]
    fn best_schemes_stops_before_cumulative_covers_target() {
        let ranked = vec![
            StatsDict { scheme: vec![SchemeId("a".into())], n_pairs: 5, rr: 0.99, positives: 1.0, negatives: 0.0, n_scheme: 1 },
            StatsDict { scheme: vec![SchemeId("b".into())], n_pairs: 5, rr: 0.98, positives: 1.0, negatives: 0.0, n_scheme: 1 },
            StatsDict { scheme: vec![SchemeId("c".into())], n_pairs: 5, rr: 0.97, positives: 1.0, negatives: 0.0, n_scheme: 1 },
        ];
        let picked = best_schemes(&ranked, 10);
        assert_eq!(picked, vec![vec![SchemeId("a".into())]]);
    }
}
