// src/lib.rs
/*!
Dense and sparse **multi-dimensional grids** for sampled scalar fields
(free-energy surfaces, bias potentials, histograms).

Layout
------
- `space`: axis metadata, flat-index/coordinate codec, deposition kernels.
- `store`: the `Storage` capability with dense (`Vec`) and sparse (`AHashMap`) backends.
- `grid`: the `Grid<S>` orchestrator (accessors, interpolation, kernel deposition,
  projection, table I/O). `Grid` is dense, `SparseGrid` is sparse.
- `error`: crate-wide `GridError` / `Result`.
*/

pub mod error;
pub mod grid;
pub mod space;
pub mod store;

pub use error::{GridError, Result};
pub use grid::{
    Grid, GridConfig, GridEntry, GridHeader, SparseGrid, WeightBase,
    DEFAULT_CAPACITY_LIMIT,
};
pub use space::axis::{AxisDescriptor, AxisSpec};
pub use space::codec::IndexCodec;
pub use space::kernel::{create_kernel, GaussianKernel, Kernel, KernelType, UniformKernel};
pub use store::{dense::DenseStorage, sparse::SparseStorage, storage_trait::{Storage, StoredCell}};
