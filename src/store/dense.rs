// src/store/dense.rs
/*!
**Dense** cell storage backed by flat `Vec<f64>` buffers.

- Values: one slot per cell, row-major by flat index.
- Gradients (optional): one contiguous block of `len * dimension` slots, cell `k`
  owning `[k*d, (k+1)*d)`.
- All cells are materialized and zero-initialized at allocation; `clear()`
  zero-fills in place.
- Bulk transforms run through `rayon` `par_iter_mut`.

# Invariants
- `values.len() == len`.
- `gradients.len() == len * dimension` if derivatives are tracked, else `0`.
*/

use rayon::prelude::*;
use serde::Serialize;

use super::storage_trait::{Storage, StoredCell};

//===================================================================
// -------------------------- Basic Struct --------------------------
//===================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DenseStorage {
    dimension: usize,
    use_deriv: bool,
    values: Vec<f64>,
    gradients: Vec<f64>,
}

impl DenseStorage {
    /// Raw value buffer (flat-index order).
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline(always)]
    fn grad_range(&self, k: usize) -> std::ops::Range<usize> {
        k * self.dimension..(k + 1) * self.dimension
    }
}

//===================================================================
// ----------------------- Storage Trait Impl -----------------------
//===================================================================

impl Storage for DenseStorage {
    const MATERIALIZED: bool = true;

    fn allocate(len: usize, dimension: usize, use_deriv: bool) -> Self {
        let gradients = if use_deriv { vec![0.0; len * dimension] } else { Vec::new() };
        Self { dimension, use_deriv, values: vec![0.0; len], gradients }
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    fn populated(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    fn value(&self, k: usize) -> f64 {
        self.values[k]
    }

    #[inline]
    fn value_and_gradient(&self, k: usize, der: &mut [f64]) -> f64 {
        let r = self.grad_range(k);
        der.copy_from_slice(&self.gradients[r]);
        self.values[k]
    }

    #[inline(always)]
    fn set_value(&mut self, k: usize, value: f64) {
        self.values[k] = value;
    }

    #[inline]
    fn set_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]) {
        self.values[k] = value;
        let r = self.grad_range(k);
        self.gradients[r].copy_from_slice(der);
    }

    #[inline(always)]
    fn add_value(&mut self, k: usize, value: f64) {
        self.values[k] += value;
    }

    #[inline]
    fn add_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]) {
        self.values[k] += value;
        let r = self.grad_range(k);
        for (g, &d) in self.gradients[r].iter_mut().zip(der) {
            *g += d;
        }
    }

    fn scale(&mut self, factor: f64) {
        self.values.par_iter_mut().for_each(|v| *v *= factor);
        self.gradients.par_iter_mut().for_each(|g| *g *= factor);
    }

    fn map_in_place<F, G>(&mut self, f: F, fder: G)
    where
        F: Fn(f64) -> f64 + Sync + Send,
        G: Fn(f64) -> f64 + Sync + Send,
    {
        self.values.par_iter_mut().for_each(|v| *v = f(*v));
        self.gradients.par_iter_mut().for_each(|g| *g = fder(*g));
    }

    fn fold_values<F>(&self, init: f64, f: F) -> f64
    where
        F: FnMut(f64, f64) -> f64,
    {
        self.values.iter().copied().fold(init, f)
    }

    fn clear(&mut self) {
        self.values.par_iter_mut().for_each(|v| *v = 0.0);
        self.gradients.par_iter_mut().for_each(|g| *g = 0.0);
    }

    fn entries(&self) -> Vec<StoredCell> {
        (0..self.values.len())
            .map(|k| StoredCell {
                index: k,
                value: self.values[k],
                gradient: if self.use_deriv { self.gradients[self.grad_range(k)].to_vec() } else { Vec::new() },
            })
            .collect()
    }
}
