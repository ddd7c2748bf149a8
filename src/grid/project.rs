// src/grid/project.rs
/*!
Dimensionality reduction: marginalize a grid onto a subset of its axes.

For every cell of the reduced grid, the source cells sharing its sub-index on
the kept axes are folded with `WeightBase::inner_step` starting from `0.0`,
then `WeightBase::outer_transform` is applied once.

| weight        | inner step          | outer transform       |
|---------------|---------------------|-----------------------|
| `Bias`        | `r + exp(β·v)`      | `-(1/β)·ln r`         |
| `Probability` | `r + v`             | `-(1/β)·ln r`         |

The fold is a commutative sum, so the enumeration order over marginalized axes
only affects floating-point rounding. Reduced cells are evaluated in parallel;
the source grid is only read.
*/

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GridError, Result};
use crate::store::dense::DenseStorage;
use crate::store::storage_trait::Storage;

use super::Grid;

// ===================================================================
// ---------------------------- Weights ------------------------------
// ===================================================================

/// How per-cell values combine into a marginal, at inverse temperature `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightBase {
    /// Log-sum-exp of a bias/free-energy surface.
    Bias { beta: f64 },
    /// Plain sum of probabilities converted to a free energy.
    Probability { beta: f64 },
}

impl WeightBase {
    #[inline]
    pub fn bias(beta: f64) -> Self {
        WeightBase::Bias { beta }
    }

    #[inline]
    pub fn probability(beta: f64) -> Self {
        WeightBase::Probability { beta }
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        match *self {
            WeightBase::Bias { beta } | WeightBase::Probability { beta } => beta,
        }
    }

    /// Fold one source value into the running accumulator.
    #[inline]
    pub fn inner_step(&self, running: f64, v: f64) -> f64 {
        match *self {
            WeightBase::Bias { beta } => running + (beta * v).exp(),
            WeightBase::Probability { .. } => running + v,
        }
    }

    /// Convert the accumulator into the stored marginal value.
    #[inline]
    pub fn outer_transform(&self, running: f64) -> f64 {
        -running.ln() / self.beta()
    }
}

// ===================================================================
// --------------------------- Projection ----------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    /// Marginalize onto the axes named in `keep` (in that order).
    ///
    /// The result is a fresh dense grid with the same bounds, bins and
    /// periodicity on the kept axes, without spline or derivatives.
    /// Fails with `InvalidArgument` if `keep` is empty or names an unknown or
    /// repeated axis.
    pub fn project(&self, keep: &[&str], weight: WeightBase) -> Result<Grid<DenseStorage>> {
        if keep.is_empty() {
            return Err(GridError::InvalidArgument("projection needs at least one axis to keep".into()));
        }
        if !(weight.beta().is_finite() && weight.beta() != 0.0) {
            return Err(GridError::InvalidArgument(format!("projection beta must be finite and non-zero, got {}", weight.beta())));
        }

        let mut kept: Vec<usize> = Vec::with_capacity(keep.len());
        for name in keep {
            let pos = self
                .axes()
                .iter()
                .position(|a| a.name == *name)
                .ok_or_else(|| GridError::InvalidArgument(format!("unknown axis '{name}' in projection")))?;
            if kept.contains(&pos) {
                return Err(GridError::InvalidArgument(format!("axis '{name}' listed twice in projection")));
            }
            kept.push(pos);
        }
        let marginal: Vec<usize> = (0..self.dimension()).filter(|k| !kept.contains(k)).collect();

        let small_axes = kept.iter().map(|&k| self.axes()[k].clone()).collect();
        let mut small: Grid<DenseStorage> = Grid::from_axes(&self.label, small_axes, false, false)?;

        let npoints = self.npoints();
        let m_total: usize = marginal.iter().map(|&k| npoints[k]).product();
        debug!(
            label = %self.label,
            ?keep,
            cells = small.size(),
            summed_per_cell = m_total,
            "projecting grid"
        );

        let d = self.dimension();
        let values: Vec<f64> = (0..small.size())
            .into_par_iter()
            .map(|i| {
                let mut sub = vec![0usize; kept.len()];
                small.codec.decompose_into(i, &mut sub);

                let mut full = vec![0usize; d];
                for (&k, &s) in kept.iter().zip(&sub) {
                    full[k] = s;
                }

                // odometer over the marginalized axes
                let mut cursor = vec![0usize; marginal.len()];
                let mut running = 0.0;
                for _ in 0..m_total {
                    for (&k, &c) in marginal.iter().zip(&cursor) {
                        full[k] = c;
                    }
                    running = weight.inner_step(running, self.store.value(self.codec.compose(&full)));
                    for (c, &k) in cursor.iter_mut().zip(&marginal) {
                        *c += 1;
                        if *c < npoints[k] {
                            break;
                        }
                        *c = 0;
                    }
                }
                weight.outer_transform(running)
            })
            .collect();

        let non_finite = values.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            warn!(label = %self.label, non_finite, "projection produced non-finite marginal values");
        }
        for (i, v) in values.into_iter().enumerate() {
            small.store.set_value(i, v);
        }
        Ok(small)
    }
}
