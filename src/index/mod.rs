//! Inverted-index / candidate-pair generator.
//!
//! Two call sites use this module: the in-memory variant runs during
//! conjunction search over the small sample, the same code runs again over
//! the full forward index once a conjunction is selected. A grouped join
//! over the signature tuple `(sig₁,…,sigₘ)` is equivalent to — and
//! implemented here as — the intersection of the per-scheme "records
//! sharing a signature" pair sets, because for Cartesian products
//! `A₁×…×Aₘ` and `B₁×…×Bₘ`, `(A₁×…×Aₘ) ∩ (B₁×…×Bₘ) = (A₁∩B₁)×…×(Aₘ∩Bₘ)`,
//! which is nonempty iff every per-scheme intersection is nonempty. This
//! keeps the cost linear in postings size instead of materializing a cross
//! product per record, and makes monotonicity a direct consequence of set
//! intersection shrinking as more schemes are ANDed in.

use std::collections::{HashMap, HashSet};

use crate::blocking::{ForwardIndex, SchemeId};
use crate::model::{RecordId, TableSide};

/// A candidate pair. `l < r` in dedupe mode; `l` is always the left-table
/// record and `r` the right-table record in record-linkage mode.
pub type Pair = (RecordId, RecordId);

/// How to interpret two records sharing a block: dedupe (one population,
/// `l < r`) or record linkage (bipartite, left → right only).
#[derive(Debug, Clone)]
pub enum Topology<'a> {
    Dedupe,
    Linkage { side: &'a HashMap<RecordId, TableSide> },
}

/// All pairs sharing at least one signature under a single scheme.
fn pairs_for_scheme(forward: &ForwardIndex, scheme: &SchemeId, topology: &Topology) -> HashSet<Pair> {
    let mut pairs = HashSet::new();
    let Some(postings) = forward.postings(scheme) else { return pairs };

    for ids in postings.values() {
        if ids.len() < 2 {
            continue;
        }
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                push_pair(&mut pairs, ids[i], ids[j], topology);
            }
        }
    }
    pairs
}

fn push_pair(pairs: &mut HashSet<Pair>, a: RecordId, b: RecordId, topology: &Topology) {
    match topology {
        Topology::Dedupe => {
            let (l, r) = if a < b { (a, b) } else { (b, a) };
            if l != r {
                pairs.insert((l, r));
            }
        }
        Topology::Linkage { side } => {
            let (Some(sa), Some(sb)) = (side.get(&a), side.get(&b)) else { return };
            match (sa, sb) {
                (TableSide::Left, TableSide::Right) => { pairs.insert((a, b)); }
                (TableSide::Right, TableSide::Left) => { pairs.insert((b, a)); }
                _ => {}
            }
        }
    }
}

/// Candidate pairs for a conjunction: the intersection of every scheme's
/// single-scheme pair set.
///
/// An empty conjunction is rejected upstream (admissibility requires
/// `n_scheme >= 1`); an empty `schemes` slice here returns an empty pair
/// set rather than panicking.
pub fn pairs_for_conjunction(
    forward: &ForwardIndex,
    schemes: &[SchemeId],
    topology: &Topology,
) -> HashSet<Pair> {
    let Some((first, rest)) = schemes.split_first() else { return HashSet::new() };
    let mut acc = pairs_for_scheme(forward, first, topology);
    for scheme in rest {
        if acc.is_empty() {
            break;
        }
        let next = pairs_for_scheme(forward, scheme, topology);
        acc.retain(|pair| next.contains(pair));
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::scheme::{Scheme, SchemeKind};
    use crate::model::Record;
    use std::collections::HashMap as Map;

    fn rec(id: i64, given: &str, surname: &str) -> Record {
        let mut attrs = Map::new();
        attrs.insert("given".to_string(), given.to_string());
        attrs.insert("surname".to_string(), surname.to_string());
        Record::new(id, attrs)
    }

    #[test]
    fn dedupe_pairs_exclude_self_and_are_ordered() {
        let records = vec![rec(2, "Ann", "Lee"), rec(1, "Ann", "Lee"), rec(3, "Bob", "Kim")];
        let scheme = Scheme::new(SchemeKind::Exact, "surname", None);
        let fwd = ForwardIndex::build(&[scheme.clone()], &records);
        let pairs = pairs_for_conjunction(&fwd, &[scheme.id()], &Topology::Dedupe);
        assert_eq!(pairs, HashSet::from([(RecordId(1), RecordId(2))]));
    }

    #[test]
    fn conjunction_is_intersection_of_schemes() {
        // Two records share `given` but not `surname`; AND-ing both schemes
        // should drop the pair even though each scheme alone blocks it with
        // something.
        let records = vec![rec(1, "Ann", "Lee"), rec(2, "Ann", "Kim")];
        let s1 = Scheme::new(SchemeKind::Exact, "given", None);
        let s2 = Scheme::new(SchemeKind::Exact, "surname", None);
        let fwd = ForwardIndex::build(&[s1.clone(), s2.clone()], &records);
        let solo = pairs_for_conjunction(&fwd, &[s1.id()], &Topology::Dedupe);
        assert_eq!(solo.len(), 1);
        let conj = pairs_for_conjunction(&fwd, &[s1.id(), s2.id()], &Topology::Dedupe);
        assert!(conj.is_empty());
    }

    #[test]
    fn linkage_pairs_are_cross_side_only() {
        let left = vec![rec(1, "Ann", "Lee")];
        let right = vec![rec(100, "Ann", "Lee"), rec(101, "Bob", "Kim")];
        let mut side = Map::new();
        side.insert(RecordId(1), TableSide::Left);
        side.insert(RecordId(100), TableSide::Right);
        side.insert(RecordId(101), TableSide::Right);

        let scheme = Scheme::new(SchemeKind::Exact, "given", None);
        let mut all = left.clone();
        all.extend(right);
        let fwd = ForwardIndex::build(&[scheme.clone()], &all);
        let pairs = pairs_for_conjunction(&fwd, &[scheme.id()], &Topology::Linkage { side: &side });
        assert_eq!(pairs, HashSet::from([(RecordId(1), RecordId(100)), (RecordId(1), RecordId(101))]));
    }
}
