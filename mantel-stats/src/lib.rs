//! Mantel permutation test for the correlation between two distance matrices.
//!
//! - **Distance matrices** — condensed/redundant normalization and validation ([`distance`])
//! - **Ranking** — fractional ranks for Spearman correlation ([`rank`])
//! - **Correlation** — Pearson and Spearman coefficients ([`correlation`])
//! - **Permutation engine** — Monte Carlo null distribution by object relabeling ([`permutation`])
//! - **Mantel test** — z-score, mean, sd and p-value of the veridical correlation ([`mantel`])
//!
//! Enable the `parallel` feature to run seeded permutation trials on rayon,
//! and `serde` for serializable configs and results.

pub mod correlation;
pub mod distance;
pub mod mantel;
pub mod permutation;
pub mod rank;

pub use correlation::CorrelationMethod;
pub use distance::{DistanceInput, DistanceMatrix};
pub use mantel::{mantel, mantel_test, mantel_test_with_rng, MantelConfig, MantelResult};
pub use mantel_core::{MantelError, Result};
