//! Cluster builder.
//!
//! Accepted pairs form an undirected graph over record IDs; connected
//! components are entities, built with a path-compressing union-find.
//! Isolated records (no accepted pair) still form their own singleton
//! cluster.

use std::collections::{HashMap, HashSet};

use crate::index::Pair;
use crate::model::{RecordId, TableSide};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    /// Record id, suffixed by table origin in record-linkage mode
    /// (`"1_l"`, `"100_r"`) so the two input tables stay distinguishable
    /// even though they share one cluster-id space.
    pub record: String,
    pub cluster_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Clusters {
    pub assignments: Vec<ClusterAssignment>,
}

struct UnionFind {
    parent: HashMap<RecordId, RecordId>,
}

impl UnionFind {
    fn new(ids: impl IntoIterator<Item = RecordId>) -> Self {
        let parent = ids.into_iter().map(|id| (id, id)).collect();
        Self { parent }
    }

    fn find(&mut self, id: RecordId) -> RecordId {
        let parent = *self.parent.get(&id).unwrap_or(&id);
        if parent == id {
            return id;
        }
        let root = self.find(parent);
        self.parent.insert(id, root);
        root
    }

    fn union(&mut self, a: RecordId, b: RecordId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Smaller id becomes root: makes component numbering
            // deterministic without a separate sort-by-root pass.
            if ra < rb {
                self.parent.insert(rb, ra);
            } else {
                self.parent.insert(ra, rb);
            }
        }
    }
}

/// Build clusters from accepted pairs over the full record population.
///
/// `all_records` must include every record that should appear in the
/// output, not just ones mentioned in `pairs` — unmatched records form
/// singleton clusters. `side` is `Some` in record-linkage mode (pairs are
/// undirected at this stage regardless of topology).
pub fn components(
    pairs: &[Pair],
    all_records: &[RecordId],
    side: Option<&HashMap<RecordId, TableSide>>,
) -> Clusters {
    let mut uf = UnionFind::new(all_records.iter().copied());
    for (l, r) in pairs {
        uf.union(*l, *r);
    }

    let mut roots: HashMap<RecordId, u64> = HashMap::new();
    let mut next_id = 0u64;
    let mut seen: HashSet<RecordId> = HashSet::new();
    let mut assignments = Vec::with_capacity(all_records.len());

    let mut sorted_records = all_records.to_vec();
    sorted_records.sort_unstable();

    for id in sorted_records {
        if !seen.insert(id) {
            continue;
        }
        let root = uf.find(id);
        let cluster_id = *roots.entry(root).or_insert_with(|| {
            let id = next_id;
            next_id += 1;
            id
        });
        let record = match side.and_then(|s| s.get(&id)) {
            Some(TableSide::Left) => format!("{id}_l"),
            Some(TableSide::Right) => format!("{id}_r"),
            None => id.to_string(),
        };
        assignments.push(ClusterAssignment { record, cluster_id });
    }

    Clusters { assignments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_duplicates_cluster_together() {
        let ids = vec![RecordId(1), RecordId(2), RecordId(3)];
        let pairs = vec![(RecordId(1), RecordId(2))];
        let clusters = components(&pairs, &ids, None);
        let c1 = clusters.assignments.iter().find(|a| a.record == "1").unwrap().cluster_id;
        let c2 = clusters.assignments.iter().find(|a| a.record == "2").unwrap().cluster_id;
        let c3 = clusters.assignments.iter().find(|a| a.record == "3").unwrap().cluster_id;
        assert_eq!(c1, c2);
        assert_ne!(c1, c3);
    }

    #[test]
    fn undirected_regardless_of_pair_order() {
        let ids = vec![RecordId(1), RecordId(2)];
        let forward = components(&[(RecordId(1), RecordId(2))], &ids, None);
        let reversed = components(&[(RecordId(2), RecordId(1))], &ids, None);
        assert_eq!(forward.assignments, reversed.assignments);
    }

    #[test]
    fn linkage_bridges_both_sides_with_suffixed_ids() {
        let ids = vec![RecordId(1), RecordId(100)];
        let mut side = HashMap::new();
        side.insert(RecordId(1), TableSide::Left);
        side.insert(RecordId(100), TableSide::Right);
        let clusters = components(&[(RecordId(1), RecordId(100))], &ids, Some(&side));
        let left = clusters.assignments.iter().find(|a| a.record == "1_l").unwrap();
        let right = clusters.assignments.iter().find(|a| a.record == "100_r").unwrap();
        assert_eq!(left.cluster_id, right.cluster_id);
    }
}
