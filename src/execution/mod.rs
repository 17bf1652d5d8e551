//! Candidate-pair scoring: distance, thresholding, clustering.

pub mod distance;
pub mod classify;
pub mod cluster;

pub use distance::{DistanceMatrix, RunCounters};
pub use classify::{Classification, ClassifiedPairs};
pub use cluster::{ClusterAssignment, Clusters};
