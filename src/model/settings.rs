//! Run configuration.

use serde::{Deserialize, Serialize};

/// Settings recognized by the orchestrator.
///
/// `path_database` / `db_schema` are carried only as opaque labels — actual
/// persistence is an external collaborator; the in-memory `TableStore`
/// never reads them, but callers wiring a real tabular store against this
/// crate's `TableStore` trait can thread them through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Single-table dedupe if true, else record linkage.
    pub dedupe: bool,
    /// Sample size for conjunction search.
    pub n: usize,
    /// Maximum conjunction length.
    pub k: usize,
    /// Upper bound on the total pair budget (`max_compare` / `n_covered`).
    pub max_compare: usize,
    /// Worker-pool size. `None` defers to rayon's default (all cores).
    pub cpus: Option<usize>,
    /// Attribute names used by blocking and distance.
    pub attributes: Vec<String>,
    /// Tabular store connection URI (opaque; external collaborator).
    pub path_database: String,
    /// Namespace inside the store (opaque; external collaborator).
    pub db_schema: String,
    /// Admissibility threshold for reduction ratio.
    pub min_rr: f64,
    /// Default classifier threshold when labels are absent.
    pub threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dedupe: true,
            n: 1000,
            k: 3,
            max_compare: 1_000_000,
            cpus: None,
            attributes: Vec::new(),
            path_database: String::new(),
            db_schema: "public".into(),
            min_rr: 0.99,
            threshold: 0.85,
        }
    }
}

impl Settings {
    /// Fails with `ConfigError` semantics: invalid `k`/`n`, or an empty
    /// attribute list.
    pub fn validate(&self) -> crate::Result<()> {
        if self.k == 0 {
            return Err(crate::Error::Config("k must be >= 1".into()));
        }
        if self.n < 2 {
            return Err(crate::Error::Config("n must be >= 2".into()));
        }
        if self.attributes.is_empty() {
            return Err(crate::Error::Config("attributes must be non-empty".into()));
        }
        Ok(())
    }
}
