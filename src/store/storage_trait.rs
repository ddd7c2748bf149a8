// src/store/storage_trait.rs
/*!
A **unified storage trait** shared by the dense and sparse backends.

The grid orchestrator (geometry, interpolation, projection) is generic over
this trait, so `Grid<DenseStorage>` and `Grid<SparseStorage>` share every
algorithm and differ only in how cells are materialized.

Key points
- Indices are **flat** and already validated by the grid (`k < len()`).
- Reads are pure lookups returning **by copy**; an absent sparse cell reads
  as zero value and zero gradient.
- Gradient slots exist only when the store was allocated with `use_deriv`;
  the gradient methods are never called otherwise.
- Whole-store transforms (`scale`, `map_in_place`) touch every materialized
  cell: dense → all cells, sparse → populated cells only.
*/

/// One populated cell, as yielded by `Storage::entries`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCell {
    pub index: usize,
    pub value: f64,
    /// Empty when the store has no gradients.
    pub gradient: Vec<f64>,
}

/// Unified cell storage (implemented by dense and sparse stores).
pub trait Storage: Send + Sync + Sized {
    /// True if every cell is allocated up front (capacity-limited).
    const MATERIALIZED: bool;

    /// Allocate storage for `len` cells of a `dimension`-dimensional grid.
    fn allocate(len: usize, dimension: usize, use_deriv: bool) -> Self;

    /// Logical capacity (number of addressable cells).
    fn len(&self) -> usize;

    /// Number of cells actually holding data.
    fn populated(&self) -> usize;

    // ------------------------ Element Access ------------------------

    fn value(&self, k: usize) -> f64;

    /// Write the gradient at `k` into `der` and return the value.
    fn value_and_gradient(&self, k: usize, der: &mut [f64]) -> f64;

    fn set_value(&mut self, k: usize, value: f64);

    fn set_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]);

    fn add_value(&mut self, k: usize, value: f64);

    fn add_value_and_gradient(&mut self, k: usize, value: f64, der: &[f64]);

    // ----------------------------- Bulk Ops -----------------------------

    /// `v <- factor * v` and `g_i <- factor * g_i` on every materialized cell.
    fn scale(&mut self, factor: f64);

    /// `v <- f(v)` and `g_i <- fder(g_i)` on every materialized cell.
    ///
    /// Absent sparse cells are not materialized and keep reading as zero, so
    /// when `f(0) != 0` a sparse store diverges from a dense one on those cells.
    fn map_in_place<F, G>(&mut self, f: F, fder: G)
    where
        F: Fn(f64) -> f64 + Sync + Send,
        G: Fn(f64) -> f64 + Sync + Send;

    /// Fold `f` over the values of every materialized cell, in no particular order.
    fn fold_values<F>(&self, init: f64, f: F) -> f64
    where
        F: FnMut(f64, f64) -> f64;

    /// Reset to the freshly-allocated state.
    fn clear(&mut self);

    /// Populated cells in ascending flat-index order.
    fn entries(&self) -> Vec<StoredCell>;
}
