//! Blocking scheme catalog.
//!
//! Each scheme is a pure function `record -> set<string>`. The catalog is
//! finite and enumerable; parameter grids are fixed here, a small, closed
//! set of blocking strategies the planner chooses among.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::Record;

/// Opaque, canonical scheme identifier: `"{kind}_{attr}_{param}"`.
///
/// Sortable and hashable so it can key the DP memoization map on the
/// sorted tuple of scheme identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemeId(pub String);

impl std::fmt::Display for SchemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of blocking predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeKind {
    Exact,
    FirstNChars,
    LastNChars,
    Ngrams,
    Acronym,
}

impl SchemeKind {
    fn tag(self) -> &'static str {
        match self {
            SchemeKind::Exact => "exact",
            SchemeKind::FirstNChars => "first_nchars",
            SchemeKind::LastNChars => "last_nchars",
            SchemeKind::Ngrams => "ngrams",
            SchemeKind::Acronym => "acronym",
        }
    }
}

/// A single blocking predicate over one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scheme {
    pub kind: SchemeKind,
    pub attribute: String,
    pub param: Option<usize>,
}

impl Scheme {
    pub fn new(kind: SchemeKind, attribute: impl Into<String>, param: Option<usize>) -> Self {
        Self { kind, attribute: attribute.into(), param }
    }

    /// Canonical identifier, stable across process restarts — used as the
    /// forward-index key and as the DP memoization key component.
    pub fn id(&self) -> SchemeId {
        match self.param {
            Some(p) => SchemeId(format!("{}_{}_{p}", self.kind.tag(), self.attribute)),
            None => SchemeId(format!("{}_{}", self.kind.tag(), self.attribute)),
        }
    }

    /// Apply this scheme to a record, producing zero or more signature
    /// tokens. Null/missing attribute values yield the empty set;
    /// whitespace-only signatures are dropped.
    pub fn signatures(&self, record: &Record) -> HashSet<String> {
        let mut out = HashSet::new();
        let Some(value) = record.normalized(&self.attribute) else {
            return out;
        };

        match self.kind {
            SchemeKind::Exact => {
                push(&mut out, value);
            }
            SchemeKind::FirstNChars => {
                let n = self.param.unwrap_or(1);
                let s: String = value.chars().take(n).collect();
                push(&mut out, s);
            }
            SchemeKind::LastNChars => {
                let n = self.param.unwrap_or(1);
                let len = value.chars().count();
                let skip = len.saturating_sub(n);
                let s: String = value.chars().skip(skip).collect();
                push(&mut out, s);
            }
            SchemeKind::Ngrams => {
                let n = self.param.unwrap_or(2);
                let chars: Vec<char> = value.chars().collect();
                if chars.len() >= n {
                    for window in chars.windows(n) {
                        push(&mut out, window.iter().collect());
                    }
                }
            }
            SchemeKind::Acronym => {
                let acronym: String = value
                    .split_whitespace()
                    .filter_map(|tok| tok.chars().next())
                    .collect();
                push(&mut out, acronym);
            }
        }
        out
    }
}

fn push(out: &mut HashSet<String>, s: String) {
    if !s.trim().is_empty() {
        out.insert(s);
    }
}

/// Parameter grids for parameterized scheme kinds.
const FIRST_LAST_N: std::ops::RangeInclusive<usize> = 1..=6;
const NGRAM_N: std::ops::RangeInclusive<usize> = 2..=4;

/// Enumerate the full scheme catalog for a set of attributes.
///
/// Fixed at configuration time: given the same attribute list, this always
/// returns the same schemes in the same order.
pub fn catalog(attributes: &[String]) -> Vec<Scheme> {
    let mut schemes = Vec::new();
    for attr in attributes {
        schemes.push(Scheme::new(SchemeKind::Exact, attr.clone(), None));
        schemes.push(Scheme::new(SchemeKind::Acronym, attr.clone(), None));
        for n in FIRST_LAST_N {
            schemes.push(Scheme::new(SchemeKind::FirstNChars, attr.clone(), Some(n)));
            schemes.push(Scheme::new(SchemeKind::LastNChars, attr.clone(), Some(n)));
        }
        for n in NGRAM_N {
            schemes.push(Scheme::new(SchemeKind::Ngrams, attr.clone(), Some(n)));
        }
    }
    schemes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rec(id: i64, surname: &str) -> Record {
        let mut attrs = HashMap::new();
        attrs.insert("surname".to_string(), surname.to_string());
        Record::new(id, attrs)
    }

    #[test]
    fn exact_lowercases_and_trims() {
        let s = Scheme::new(SchemeKind::Exact, "surname", None);
        let sigs = s.signatures(&rec(1, "  Lee  "));
        assert_eq!(sigs, HashSet::from(["lee".to_string()]));
    }

    #[test]
    fn missing_attribute_is_empty() {
        let s = Scheme::new(SchemeKind::Exact, "missing", None);
        assert!(s.signatures(&rec(1, "Lee")).is_empty());
    }

    #[test]
    fn ngrams_of_two() {
        let s = Scheme::new(SchemeKind::Ngrams, "surname", Some(2));
        let sigs = s.signatures(&rec(1, "Lee"));
        assert_eq!(sigs, HashSet::from(["le".to_string(), "ee".to_string()]));
    }

    #[test]
    fn acronym_concatenates_first_letters() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), "Ann Marie Lee".to_string());
        let rec = Record::new(1, attrs);
        let s = Scheme::new(SchemeKind::Acronym, "name", None);
        assert_eq!(s.signatures(&rec), HashSet::from(["aml".to_string()]));
    }

    #[test]
    fn id_is_canonical() {
        let s = Scheme::new(SchemeKind::FirstNChars, "surname", Some(3));
        assert_eq!(s.id().0, "first_nchars_surname_3");
    }

    #[test]
    fn catalog_is_deterministic() {
        let attrs = vec!["surname".to_string(), "given".to_string()];
        assert_eq!(catalog(&attrs), catalog(&attrs));
    }
}
