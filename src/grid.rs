// src/grid.rs
/*!
The **grid orchestrator**: geometry, storage and every read/write/accumulate
operation on a sampled scalar field.

`Grid<S>` owns an `IndexCodec` (axes, strides) and a `Storage` backend:

- `Grid` (= `Grid<DenseStorage>`): every cell materialized, capacity-limited.
- `SparseGrid` (= `Grid<SparseStorage>`): only touched cells materialized;
  absent cells read as zero value and zero gradient.

Both share geometry, interpolation (`grid/interpolate.rs`), kernel deposition,
projection (`grid/project.rs`) and table I/O (`grid/table.rs`).

Access forms
------------
- flat index: `value(k)`, `set_value(k, v)`, ...
- index vector: `value_at_indices(&[i0, i1])`, ...
- coordinate: `value_at(&[x0, x1])`, `value_and_derivatives_at(..)`.

Errors: out-of-range flat indices / index vectors → `OutOfRange`; derivative
operations on a grid without derivatives → `Unsupported`.
*/

pub mod interpolate;
pub mod project;
pub mod table;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{GridError, Result};
use crate::space::axis::{AxisDescriptor, AxisSpec};
use crate::space::codec::{corner_count, IndexCodec};
use crate::space::kernel::Kernel;
use crate::store::dense::DenseStorage;
use crate::store::sparse::SparseStorage;
use crate::store::storage_trait::Storage;

pub use project::WeightBase;
pub use table::{GridEntry, GridHeader};

/// Default ceiling on materialized cells (2^28 values, 2 GiB of `f64`).
pub const DEFAULT_CAPACITY_LIMIT: usize = 1 << 28;

fn default_capacity_limit() -> usize {
    DEFAULT_CAPACITY_LIMIT
}

// ===================================================================
// --------------------------- Config --------------------------------
// ===================================================================

/// Construction input for a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Name of the stored function (used as the value column label).
    pub label: String,
    pub axes: Vec<AxisSpec>,
    #[serde(default)]
    pub use_spline: bool,
    #[serde(default)]
    pub use_deriv: bool,
    /// Maximum number of cells a dense grid may allocate.
    #[serde(default = "default_capacity_limit")]
    pub capacity_limit: usize,
}

impl GridConfig {
    pub fn new(label: impl Into<String>, axes: Vec<AxisSpec>) -> Self {
        Self {
            label: label.into(),
            axes,
            use_spline: false,
            use_deriv: false,
            capacity_limit: DEFAULT_CAPACITY_LIMIT,
        }
    }

    pub fn with_spline(mut self, on: bool) -> Self {
        self.use_spline = on;
        self
    }

    pub fn with_deriv(mut self, on: bool) -> Self {
        self.use_deriv = on;
        self
    }

    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = limit;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

// ===================================================================
// ------------------------- Main Struct -----------------------------
// ===================================================================

/// A sampled scalar field over a rectilinear, optionally periodic domain.
#[derive(Debug, Clone)]
pub struct Grid<S: Storage = DenseStorage> {
    label: String,
    codec: IndexCodec,
    store: S,
    use_spline: bool,
    use_deriv: bool,
}

/// Grid backed by a hash map; absent cells read as zero.
pub type SparseGrid = Grid<SparseStorage>;

impl<S: Storage> Grid<S> {
    pub fn new(config: &GridConfig) -> Result<Self> {
        let axes = config
            .axes
            .iter()
            .map(AxisSpec::build)
            .collect::<Result<Vec<_>>>()?;
        Self::build(&config.label, axes, config.use_spline, config.use_deriv, config.capacity_limit)
    }

    /// Build from already-validated axes with the default capacity limit.
    pub fn from_axes(label: &str, axes: Vec<AxisDescriptor>, use_spline: bool, use_deriv: bool) -> Result<Self> {
        Self::build(label, axes, use_spline, use_deriv, DEFAULT_CAPACITY_LIMIT)
    }

    fn build(label: &str, axes: Vec<AxisDescriptor>, use_spline: bool, use_deriv: bool, capacity_limit: usize) -> Result<Self> {
        for (i, a) in axes.iter().enumerate() {
            if axes[..i].iter().any(|b| b.name == a.name) {
                return Err(GridError::InvalidArgument(format!("duplicate axis name '{}'", a.name)));
            }
        }
        let codec = IndexCodec::new(axes)?;
        let size = codec.max_size();
        if use_spline {
            corner_count(codec.dimension())?;
        }

        if S::MATERIALIZED {
            if size > capacity_limit {
                return Err(GridError::Capacity(format!(
                    "dense grid needs {size} cells, limit is {capacity_limit}"
                )));
            }
            if use_deriv && size.checked_mul(codec.dimension()).is_none() {
                return Err(GridError::Capacity(format!("gradient block for {size} cells overflows usize")));
            }
        }

        debug!(
            label,
            dimension = codec.dimension(),
            size,
            use_spline,
            use_deriv,
            materialized = S::MATERIALIZED,
            "allocating grid"
        );
        let store = S::allocate(size, codec.dimension(), use_deriv);
        Ok(Self { label: label.to_string(), codec, store, use_spline, use_deriv })
    }
}

// ===================================================================
// --------------------------- Geometry ------------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn codec(&self) -> &IndexCodec {
        &self.codec
    }

    #[inline]
    pub fn axes(&self) -> &[AxisDescriptor] {
        self.codec.axes()
    }

    pub fn arg_names(&self) -> Vec<String> {
        self.axes().iter().map(|a| a.name.clone()).collect()
    }

    /// Lower bounds as supplied.
    pub fn min(&self) -> Vec<String> {
        self.axes().iter().map(|a| a.str_min.clone()).collect()
    }

    /// Upper bounds as supplied.
    pub fn max(&self) -> Vec<String> {
        self.axes().iter().map(|a| a.str_max.clone()).collect()
    }

    pub fn dx(&self) -> Vec<f64> {
        self.axes().iter().map(|a| a.bin_width).collect()
    }

    pub fn nbins(&self) -> Vec<usize> {
        self.axes().iter().map(|a| a.nbins).collect()
    }

    #[inline]
    pub fn npoints(&self) -> &[usize] {
        self.codec.npoints()
    }

    pub fn is_periodic(&self) -> Vec<bool> {
        self.axes().iter().map(|a| a.periodic).collect()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.codec.dimension()
    }

    #[inline]
    pub fn bin_volume(&self) -> f64 {
        self.codec.bin_volume()
    }

    /// Addressable cells (`Π npoints`), independent of the backend.
    #[inline]
    pub fn size(&self) -> usize {
        self.codec.max_size()
    }

    /// Cells actually holding data (dense: `size()`).
    #[inline]
    pub fn populated(&self) -> usize {
        self.store.populated()
    }

    #[inline]
    pub fn uses_spline(&self) -> bool {
        self.use_spline
    }

    #[inline]
    pub fn uses_deriv(&self) -> bool {
        self.use_deriv
    }

    #[inline]
    pub fn storage(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn indices(&self, k: usize) -> Result<Vec<usize>> {
        self.codec.indices(k)
    }

    #[inline]
    pub fn index_of_point(&self, x: &[f64]) -> Result<usize> {
        self.codec.flat_index_of_point(x)
    }

    #[inline]
    pub fn point(&self, k: usize) -> Result<Vec<f64>> {
        self.codec.point(k)
    }

    pub fn neighbors(&self, k: usize, widths: &[usize]) -> Result<Vec<usize>> {
        self.codec.neighbors_of_flat(k, widths)
    }

    pub fn neighbors_of_indices(&self, indices: &[usize], widths: &[usize]) -> Result<Vec<usize>> {
        self.codec.neighbors(indices, widths)
    }

    pub fn neighbors_of_point(&self, x: &[f64], widths: &[usize]) -> Result<Vec<usize>> {
        self.codec.neighbors_of_point(x, widths)
    }
}

// ===================================================================
// ------------------------ Element Access ---------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    #[inline]
    fn check_index(&self, k: usize) -> Result<()> {
        if k >= self.size() {
            return Err(GridError::OutOfRange(format!("flat index {k} >= grid size {}", self.size())));
        }
        Ok(())
    }

    #[inline]
    fn require_deriv(&self, op: &str) -> Result<()> {
        if !self.use_deriv {
            return Err(GridError::Unsupported(format!(
                "{op}: grid '{}' was built without derivatives",
                self.label
            )));
        }
        Ok(())
    }

    #[inline]
    fn check_gradient(&self, der: &[f64]) -> Result<()> {
        if der.len() != self.dimension() {
            return Err(GridError::InvalidArgument(format!(
                "gradient has {} components, grid dimension is {}",
                der.len(),
                self.dimension()
            )));
        }
        Ok(())
    }

    pub fn value(&self, k: usize) -> Result<f64> {
        self.check_index(k)?;
        Ok(self.store.value(k))
    }

    pub fn value_at_indices(&self, indices: &[usize]) -> Result<f64> {
        let k = self.codec.flat_index(indices)?;
        Ok(self.store.value(k))
    }

    pub fn value_and_derivatives(&self, k: usize) -> Result<(f64, Vec<f64>)> {
        self.require_deriv("value_and_derivatives")?;
        self.check_index(k)?;
        let mut der = vec![0.0; self.dimension()];
        let v = self.store.value_and_gradient(k, &mut der);
        Ok((v, der))
    }

    pub fn value_and_derivatives_at_indices(&self, indices: &[usize]) -> Result<(f64, Vec<f64>)> {
        let k = self.codec.flat_index(indices)?;
        self.value_and_derivatives(k)
    }

    pub fn set_value(&mut self, k: usize, value: f64) -> Result<()> {
        self.check_index(k)?;
        self.store.set_value(k, value);
        Ok(())
    }

    pub fn set_value_at_indices(&mut self, indices: &[usize], value: f64) -> Result<()> {
        let k = self.codec.flat_index(indices)?;
        self.store.set_value(k, value);
        Ok(())
    }

    pub fn set_value_and_derivatives(&mut self, k: usize, value: f64, der: &[f64]) -> Result<()> {
        self.require_deriv("set_value_and_derivatives")?;
        self.check_index(k)?;
        self.check_gradient(der)?;
        self.store.set_value_and_gradient(k, value, der);
        Ok(())
    }

    pub fn set_value_and_derivatives_at_indices(&mut self, indices: &[usize], value: f64, der: &[f64]) -> Result<()> {
        let k = self.codec.flat_index(indices)?;
        self.set_value_and_derivatives(k, value, der)
    }

    pub fn add_value(&mut self, k: usize, value: f64) -> Result<()> {
        self.check_index(k)?;
        self.store.add_value(k, value);
        Ok(())
    }

    pub fn add_value_at_indices(&mut self, indices: &[usize], value: f64) -> Result<()> {
        let k = self.codec.flat_index(indices)?;
        self.store.add_value(k, value);
        Ok(())
    }

    pub fn add_value_and_derivatives(&mut self, k: usize, value: f64, der: &[f64]) -> Result<()> {
        self.require_deriv("add_value_and_derivatives")?;
        self.check_index(k)?;
        self.check_gradient(der)?;
        self.store.add_value_and_gradient(k, value, der);
        Ok(())
    }

    pub fn add_value_and_derivatives_at_indices(&mut self, indices: &[usize], value: f64, der: &[f64]) -> Result<()> {
        let k = self.codec.flat_index(indices)?;
        self.add_value_and_derivatives(k, value, der)
    }
}

// ===================================================================
// --------------------------- Bulk Ops ------------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    /// Multiply every stored value and gradient component by `factor`.
    pub fn scale_all(&mut self, factor: f64) {
        self.store.scale(factor);
    }

    /// Replace every value `v` by `f(v)` and every gradient component `g` by `fder(g)`.
    ///
    /// Sparse grids only transform populated cells.
    pub fn apply_all<F, G>(&mut self, f: F, fder: G)
    where
        F: Fn(f64) -> f64 + Sync + Send,
        G: Fn(f64) -> f64 + Sync + Send,
    {
        self.store.map_in_place(f, fder);
    }

    /// Dense: zero-fill in place. Sparse: drop every entry.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Smallest stored value (sparse: over populated cells, `0.0` if none).
    pub fn min_value(&self) -> f64 {
        self.fold_populated(f64::INFINITY, f64::min)
    }

    /// Largest stored value (sparse: over populated cells, `0.0` if none).
    pub fn max_value(&self) -> f64 {
        self.fold_populated(f64::NEG_INFINITY, f64::max)
    }

    fn fold_populated(&self, init: f64, f: fn(f64, f64) -> f64) -> f64 {
        if self.store.populated() == 0 {
            return 0.0;
        }
        self.store.fold_values(init, f)
    }
}

// ===================================================================
// ----------------------- Kernel Deposition -------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    /// Accumulate `kernel` onto every grid point inside its support window.
    ///
    /// The window is centered on the cell containing the kernel center; each
    /// neighbor's grid point is evaluated once. No normalization is applied.
    pub fn add_kernel(&mut self, kernel: &dyn Kernel) -> Result<()> {
        let support = kernel.support(&self.dx());
        let neighbors = self.codec.neighbors_of_point(kernel.center(), &support)?;
        trace!(label = %self.label, cells = neighbors.len(), ?support, "depositing kernel");

        let d = self.dimension();
        let mut idx = vec![0usize; d];
        for k in neighbors {
            self.codec.decompose_into(k, &mut idx);
            let x = self.codec.corner(&idx);
            let (value, der) = kernel.evaluate(&x);
            if self.use_deriv {
                self.check_gradient(&der)?;
                self.store.add_value_and_gradient(k, value, &der);
            } else {
                self.store.add_value(k, value);
            }
        }
        Ok(())
    }
}
