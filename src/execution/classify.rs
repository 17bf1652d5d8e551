//! Threshold classifier.

use crate::execution::distance::DistanceMatrix;
use crate::index::Pair;

/// Per-pair verdict. Dedupe mode renders this as `"Yes"`/`"No"`, record
/// linkage as `1`/`0` — both are this same enum; the string/int rendering
/// is a caller concern, not a classifier concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Match,
    NonMatch,
}

#[derive(Debug, Clone)]
pub struct ClassifiedPairs {
    pub pairs: Vec<Pair>,
    pub scores: Vec<f64>,
    pub labels: Vec<Classification>,
}

impl ClassifiedPairs {
    /// Matches and scores selected by the *same* mask — both come from
    /// `Classification::Match`, not two different, silently divergent
    /// filters.
    pub fn matches(&self) -> Vec<Pair> {
        self.pairs
            .iter()
            .zip(&self.labels)
            .filter(|(_, label)| **label == Classification::Match)
            .map(|(pair, _)| *pair)
            .collect()
    }

    pub fn match_scores(&self) -> Vec<f64> {
        self.scores
            .iter()
            .zip(&self.labels)
            .filter(|(_, label)| **label == Classification::Match)
            .map(|(score, _)| *score)
            .collect()
    }
}

/// Classify every pair in `matrix` against `threshold`.
pub fn classify(matrix: &DistanceMatrix, threshold: f64) -> ClassifiedPairs {
    let scores = matrix.mean_scores();
    let labels = scores
        .iter()
        .map(|s| if *s >= threshold { Classification::Match } else { Classification::NonMatch })
        .collect();
    ClassifiedPairs { pairs: matrix.pairs.clone(), scores, labels }
}

/// Learn a threshold from labelled `(mean_distance, label)` pairs by
/// maximizing F1 over the labelled distance distribution.
///
/// Falls back to `default` when fewer than 2 positives or 2 negatives are
/// present (a label shortage, non-fatal).
pub fn learn_threshold(labelled: &[(f64, u8)], default: f64) -> f64 {
    let positives = labelled.iter().filter(|(_, l)| *l == 1).count();
    let negatives = labelled.iter().filter(|(_, l)| *l == 0).count();
    if positives < 2 || negatives < 2 {
        return default;
    }

    let mut candidates: Vec<f64> = labelled.iter().map(|(s, _)| *s).collect();
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap());
    candidates.dedup();

    let mut best_threshold = default;
    let mut best_f1 = -1.0;
    for t in candidates {
        let f1 = f1_at(t, labelled);
        if f1 > best_f1 {
            best_f1 = f1;
            best_threshold = t;
        }
    }
    best_threshold
}

fn f1_at(threshold: f64, labelled: &[(f64, u8)]) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0u32, 0u32, 0u32);
    for (score, label) in labelled {
        let predicted_match = *score >= threshold;
        let actual_match = *label == 1;
        match (predicted_match, actual_match) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    if tp == 0 {
        return 0.0;
    }
    let precision = tp as f64 / (tp + fp) as f64;
    let recall = tp as f64 / (tp + fn_) as f64;
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordId;

    #[test]
    fn classifies_by_mean_score() {
        let matrix = DistanceMatrix {
            pairs: vec![(RecordId(1), RecordId(2)), (RecordId(3), RecordId(4))],
            attributes: vec!["a".into(), "b".into()],
            rows: vec![vec![1.0, 1.0], vec![0.1, 0.2]],
        };
        let classified = classify(&matrix, 0.85);
        assert_eq!(classified.labels, vec![Classification::Match, Classification::NonMatch]);
        assert_eq!(classified.matches(), vec![(RecordId(1), RecordId(2))]);
    }

    #[test]
    fn label_shortage_falls_back_to_default() {
        let labelled = vec![(0.9, 1), (0.1, 0)];
        assert_eq!(learn_threshold(&labelled, 0.85), 0.85);
    }

    #[test]
    fn learns_threshold_maximizing_f1() {
        let labelled = vec![(0.95, 1), (0.9, 1), (0.3, 0), (0.2, 0), (0.5, 1), (0.4, 0)];
        let t = learn_threshold(&labelled, 0.85);
        // Any threshold in (0.4, 0.5] perfectly separates the classes.
        assert!(t > 0.4 && t <= 0.5, "threshold {t} should separate perfectly");
    }
}
