// src/store/sparse.rs
/*
    A hash-backed sparse cell store.
        - Storage: `AHashMap<flat_index, f64>` for values and `AHashMap<flat_index, Vec<f64>>`
          for gradients; absent cells are implicit zeros.
        - First write to a cell inserts it; `add_*` on an absent cell adds onto zero.
        - Nothing is pruned: `populated()` counts every touched cell, zeros included.
        - With derivatives, both maps always hold the same key set (a value-only
          write materializes a zero gradient).
        - Bulk transforms use rayon over the populated entries only.
*/

use ahash::AHashMap;
use rayon::prelude::*;

use super::storage_trait::{Storage, StoredCell};

// ===================================================================
// --------------------------- Struct Def ----------------------------
// ===================================================================

#[derive(Clone, Debug)]
pub struct SparseStorage {
    len: usize,
    dimension: usize,
    use_deriv: bool,
    values: AHashMap<usize, f64>,       // flat index -> value
    gradients: AHashMap<usize, Vec<f64>>, // flat index -> gradient
}

impl SparseStorage {
    /// True if cell `k` holds an explicit entry.
    #[inline]
    pub fn contains(&self, k: usize) -> bool {
        self.values.contains_key(&k)
    }

    /// Populated flat indices, ascending.
    pub fn keys_sorted(&self) -> Vec<usize> {
        let mut keys: Vec<usize> = self.values.keys().copied().collect();
        keys.par_sort_unstable();
        keys
    }

    #[inline]
    fn gradient_slot(&mut self, k: usize) -> &mut Vec<f64> {
        let d = self.dimension;
        self.gradients.entry(k).or_insert_with(|| vec![0.0; d])
    }
}

// ===================================================================
// ------------------------ Storage Trait Impl -----------------------
// ===================================================================

impl Storage for SparseStorage {
    const MATERIALIZED: bool = false;

    fn allocate(len: usize, dimension: usize, use_deriv: bool) -> Self {
        Self {
            len,
            dimension,
            use_deriv,
            values: AHashMap::default(),
            gradients: AHashMap::default(),
        }
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn populated(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn value(&self, k: usize) -> f64 {
        self.values.get(&k).copied().unwrap_or(0.0)
    }

    #[inline]
    fn value_and_gradient(&self, k: usize, der: &mut [f64]) -> f64 {
        match self.gradients.get(&k) {
            Some(g) => der.copy_from_slice(g),
            None => der.iter_mut().for_each(|d| *d = 0.0),
        }
        self.value(k)
    }

    #[inline]
    fn set_value(&mut self, k: usize, value: f64) {
        self.values.insert(k, value);
        if self.use_deriv {
            self.gradient_slot(k);
        }
    }

    #[inline]
    fn set_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]) {
        self.values.insert(k, value);
        self.gradients.insert(k, der.to_vec());
    }

    #[inline]
    fn add_value(&mut self, k: usize, value: f64) {
        *self.values.entry(k).or_insert(0.0) += value;
        if self.use_deriv {
            self.gradient_slot(k);
        }
    }

    #[inline]
    fn add_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]) {
        *self.values.entry(k).or_insert(0.0) += value;
        for (g, &d) in self.gradient_slot(k).iter_mut().zip(der) {
            *g += d;
        }
    }

    fn scale(&mut self, factor: f64) {
        // `AHashMap` has no native parallel iterator; bridge the serial one.
        self.values.values_mut().par_bridge().for_each(|v| *v *= factor);
        self.gradients
            .values_mut()
            .par_bridge()
            .for_each(|g| g.iter_mut().for_each(|x| *x *= factor));
    }

    fn map_in_place<F, G>(&mut self, f: F, fder: G)
    where
        F: Fn(f64) -> f64 + Sync + Send,
        G: Fn(f64) -> f64 + Sync + Send,
    {
        self.values.values_mut().par_bridge().for_each(|v| *v = f(*v));
        self.gradients
            .values_mut()
            .par_bridge()
            .for_each(|g| g.iter_mut().for_each(|x| *x = fder(*x)));
    }

    fn fold_values<F>(&self, init: f64, f: F) -> f64
    where
        F: FnMut(f64, f64) -> f64,
    {
        self.values.values().copied().fold(init, f)
    }

    fn clear(&mut self) {
        self.values = AHashMap::default();
        self.gradients = AHashMap::default();
    }

    fn entries(&self) -> Vec<StoredCell> {
        self.keys_sorted()
            .into_iter()
            .map(|k| StoredCell {
                index: k,
                value: self.values[&k],
                gradient: if self.use_deriv {
                    self.gradients.get(&k).cloned().unwrap_or_else(|| vec![0.0; self.dimension])
                } else {
                    Vec::new()
                },
            })
            .collect()
    }
}
