//! Monte Carlo permutation engine for the Mantel test.
//!
//! Each trial draws a uniformly random object order, permutes rows and
//! columns of the Y residual matrix by it, re-condenses the result and
//! correlates it against the fixed X residuals.
//!
//! Two random-source modes are offered:
//!
//! - [`PermutationEngine::run_with_rng`] draws every trial from one
//!   caller-supplied generator, sequentially.
//! - [`PermutationEngine::run_seeded`] gives trial `i` its own ChaCha8 stream
//!   `i` under a shared seed, so the sample set does not depend on how trials
//!   are scheduled. With the `parallel` feature the trials run on rayon.

use mantel_core::{MantelError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::correlation::{dot, PreparedPair};
use crate::distance::{objects_for_len, square_from_condensed};

/// Permutation engine over a prepared pair of residual vectors.
#[derive(Debug, Clone)]
pub struct PermutationEngine<'a> {
    /// Y residuals expanded to a flat row-major `n*n` matrix.
    matrix: Vec<f64>,
    n: usize,
    x_res: &'a [f64],
    denominator: f64,
}

impl<'a> PermutationEngine<'a> {
    /// Expand the Y residuals of `prepared` into matrix form.
    ///
    /// # Errors
    ///
    /// Returns [`MantelError::InvalidInput`] if the residual length is not a
    /// triangular number.
    pub fn new(prepared: &'a PreparedPair) -> Result<Self> {
        let len = prepared.y_res.len();
        let n = objects_for_len(len).ok_or_else(|| {
            MantelError::InvalidInput(format!(
                "permutation: residual length {len} is not n*(n-1)/2 for any n"
            ))
        })?;
        Ok(Self {
            matrix: square_from_condensed(&prepared.y_res, n),
            n,
            x_res: &prepared.x_res,
            denominator: prepared.denominator,
        })
    }

    /// Number of objects being permuted.
    pub fn n_objects(&self) -> usize {
        self.n
    }

    /// Correlation for one trial with object order `order`.
    ///
    /// `buf` receives the condensed form of `M[order, :][:, order]` and is
    /// fully overwritten.
    ///
    /// # Panics
    ///
    /// Panics if `order.len() != n` or `buf.len() != n*(n-1)/2`.
    pub fn sample_with_order(&self, order: &[usize], buf: &mut [f64]) -> f64 {
        assert_eq!(order.len(), self.n, "order must cover every object");
        assert_eq!(buf.len(), self.x_res.len(), "buffer must hold every pair");
        let n = self.n;
        let mut k = 0;
        for i in 0..n {
            let row = &self.matrix[order[i] * n..(order[i] + 1) * n];
            for &oj in &order[i + 1..] {
                buf[k] = row[oj];
                k += 1;
            }
        }
        dot(self.x_res, buf) / self.denominator
    }

    /// Run `perms` trials drawing every order from `rng`.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, perms: usize, rng: &mut R) -> Vec<f64> {
        let mut order: Vec<usize> = (0..self.n).collect();
        let mut buf = vec![0.0; self.x_res.len()];
        (0..perms)
            .map(|_| {
                draw_order(&mut order, &mut *rng);
                self.sample_with_order(&order, &mut buf)
            })
            .collect()
    }

    /// Run `perms` trials, trial `i` drawing from ChaCha8 stream `i` of `seed`.
    ///
    /// The result is identical with and without the `parallel` feature.
    pub fn run_seeded(&self, perms: usize, seed: u64) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        let samples = {
            use rayon::prelude::*;
            (0..perms)
                .into_par_iter()
                .map_init(
                    || ((0..self.n).collect::<Vec<usize>>(), vec![0.0; self.x_res.len()]),
                    |(order, buf), trial| self.seeded_trial(seed, trial, order, buf),
                )
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let samples = {
            let mut order: Vec<usize> = (0..self.n).collect();
            let mut buf = vec![0.0; self.x_res.len()];
            (0..perms)
                .map(|trial| self.seeded_trial(seed, trial, &mut order, &mut buf))
                .collect()
        };
        samples
    }

    fn seeded_trial(&self, seed: u64, trial: usize, order: &mut [usize], buf: &mut [f64]) -> f64 {
        let mut rng = trial_rng(seed, trial);
        draw_order(order, &mut rng);
        self.sample_with_order(order, buf)
    }
}

/// Independent generator for one trial of a seeded run.
fn trial_rng(seed: u64, trial: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial as u64);
    rng
}

/// Reset `order` to the identity and shuffle it uniformly.
fn draw_order<R: Rng + ?Sized>(order: &mut [usize], rng: &mut R) {
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i;
    }
    order.shuffle(rng);
}

// ── Tests ──────────────────────────────────────────────────────────────────
