// src/space/codec.rs
/*!
Bidirectional mapping between **flat cell indices**, **per-axis index vectors**
and **continuous coordinates** on a rectilinear grid.

Layout
------
- Axis 0 varies fastest: `stride_0 = 1`, `stride_{k+1} = stride_k * npoints_k`.
- `flat = Σ_k i_k * stride_k`, `0 <= i_k < npoints_k`.
- Grid points use the cell-corner convention: `x_k = min_k + i_k * dx_k`.

Boundaries
----------
- Periodic axes wrap coordinates into `[min, max)` before binning, and wrap
  neighbor offsets with Euclidean modulo.
- Non-periodic axes reject coordinates outside `[min, max]` and drop
  out-of-range neighbor candidates. Index vectors are never clamped or wrapped
  silently: an out-of-range component is an `OutOfRange` error.
*/

use crate::error::{GridError, Result};
use super::axis::AxisDescriptor;

/// Relative slack (in bins) accepted at the edges of a non-periodic axis.
const EDGE_TOLERANCE: f64 = 1e-9;

//===================================================================
// -------------------------- Basic Struct --------------------------
//===================================================================

/// Index/coordinate codec for a fixed set of axes.
///
/// # Invariants
/// - `npoints.len() == strides.len() == axes.len() >= 1`.
/// - `max_size == Π npoints_k` and did not overflow.
#[derive(Debug, Clone)]
pub struct IndexCodec {
    axes: Vec<AxisDescriptor>,
    npoints: Vec<usize>,
    strides: Vec<usize>,
    max_size: usize,
}

impl IndexCodec {
    /// Build the stride table.
    ///
    /// Fails with `InvalidArgument` on an empty axis list and with `Capacity`
    /// if the point count overflows `usize`.
    pub fn new(axes: Vec<AxisDescriptor>) -> Result<Self> {
        if axes.is_empty() {
            return Err(GridError::InvalidArgument("a grid needs at least one axis".into()));
        }
        let npoints: Vec<usize> = axes.iter().map(AxisDescriptor::npoints).collect();
        let mut strides = Vec::with_capacity(npoints.len());
        let mut size = 1usize;
        for &n in &npoints {
            strides.push(size);
            size = size.checked_mul(n).ok_or_else(|| {
                GridError::Capacity(format!("point counts {npoints:?} overflow usize"))
            })?;
        }
        Ok(Self { axes, npoints, strides, max_size: size })
    }

    #[inline(always)]
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// Total number of addressable cells.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn axes(&self) -> &[AxisDescriptor] {
        &self.axes
    }

    #[inline]
    pub fn npoints(&self) -> &[usize] {
        &self.npoints
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Product of bin widths.
    pub fn bin_volume(&self) -> f64 {
        self.axes.iter().map(|a| a.bin_width).product()
    }
}

//===================================================================
// ------------------------ Index Conversions -----------------------
//===================================================================

impl IndexCodec {
    #[inline]
    fn check_flat(&self, flat: usize) -> Result<()> {
        if flat >= self.max_size {
            return Err(GridError::OutOfRange(format!(
                "flat index {flat} >= grid size {}",
                self.max_size
            )));
        }
        Ok(())
    }

    #[inline]
    fn check_rank(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimension() {
            return Err(GridError::InvalidArgument(format!(
                "{what} has {len} components, grid dimension is {}",
                self.dimension()
            )));
        }
        Ok(())
    }

    /// Inverse row-major decomposition of a flat index.
    pub fn indices(&self, flat: usize) -> Result<Vec<usize>> {
        self.check_flat(flat)?;
        let mut rem = flat;
        let mut out = Vec::with_capacity(self.dimension());
        for &n in &self.npoints {
            out.push(rem % n);
            rem /= n;
        }
        Ok(out)
    }

    /// Flat index of an index vector.
    pub fn flat_index(&self, indices: &[usize]) -> Result<usize> {
        self.check_rank(indices.len(), "index vector")?;
        let mut flat = 0usize;
        for (axis, ((&i, &n), &stride)) in indices.iter().zip(&self.npoints).zip(&self.strides).enumerate() {
            if i >= n {
                return Err(GridError::OutOfRange(format!(
                    "index {i} on axis {axis} ('{}') >= {n} points",
                    self.axes[axis].name
                )));
            }
            flat += i * stride;
        }
        Ok(flat)
    }

    /// Index vector of the cell containing `x`.
    ///
    /// Periodic components are wrapped first. Non-periodic components outside
    /// `[min, max]` are rejected; `x == max` resolves to the last grid point.
    pub fn indices_of_point(&self, x: &[f64]) -> Result<Vec<usize>> {
        self.check_rank(x.len(), "coordinate")?;
        let mut out = Vec::with_capacity(self.dimension());
        for (axis, (a, &xk)) in self.axes.iter().zip(x).enumerate() {
            if !xk.is_finite() {
                return Err(GridError::OutOfRange(format!("non-finite coordinate {xk} on axis {axis}")));
            }
            let xw = a.wrap(xk);
            if !a.periodic {
                let slack = EDGE_TOLERANCE * a.bin_width;
                if xw < a.min - slack || xw > a.max + slack {
                    return Err(GridError::OutOfRange(format!(
                        "coordinate {xk} outside [{}, {}] on axis {axis} ('{}')",
                        a.min, a.max, a.name
                    )));
                }
            }
            let raw = ((xw - a.min) / a.bin_width).floor();
            let last = self.npoints[axis] - 1;
            out.push(if raw <= 0.0 { 0 } else { (raw as usize).min(last) });
        }
        Ok(out)
    }

    #[inline]
    pub fn flat_index_of_point(&self, x: &[f64]) -> Result<usize> {
        let idx = self.indices_of_point(x)?;
        self.flat_index(&idx)
    }

    /// Coordinates of the grid point at `indices`.
    pub fn point_of_indices(&self, indices: &[usize]) -> Result<Vec<f64>> {
        self.flat_index(indices)?;
        Ok(self.corner(indices))
    }

    /// Coordinates of the grid point at flat index `flat`.
    pub fn point(&self, flat: usize) -> Result<Vec<f64>> {
        let idx = self.indices(flat)?;
        Ok(self.corner(&idx))
    }

    /// Grid point at the lower corner of the cell containing `x`.
    pub fn snap_point(&self, x: &[f64]) -> Result<Vec<f64>> {
        let idx = self.indices_of_point(x)?;
        Ok(self.corner(&idx))
    }

    /// Unchecked decomposition into a preallocated index vector (`flat < max_size`).
    #[inline]
    pub(crate) fn decompose_into(&self, flat: usize, out: &mut [usize]) {
        let mut rem = flat;
        for (o, &n) in out.iter_mut().zip(&self.npoints) {
            *o = rem % n;
            rem /= n;
        }
    }

    /// Unchecked flat index (`indices` already validated).
    #[inline]
    pub(crate) fn compose(&self, indices: &[usize]) -> usize {
        indices.iter().zip(&self.strides).map(|(&i, &s)| i * s).sum()
    }

    /// Index vector of the grid point nearest to `x` (rounding, not flooring).
    ///
    /// Used to re-address tabulated grid points whose printed coordinates
    /// carry rounding noise. Periodic components wrap; anything else outside
    /// the point range is `OutOfRange`.
    pub fn nearest_indices(&self, x: &[f64]) -> Result<Vec<usize>> {
        self.check_rank(x.len(), "coordinate")?;
        let mut out = Vec::with_capacity(self.dimension());
        for (axis, (a, &xk)) in self.axes.iter().zip(x).enumerate() {
            let n = self.npoints[axis] as i64;
            let raw = ((xk - a.min) / a.bin_width).round();
            if !raw.is_finite() {
                return Err(GridError::OutOfRange(format!("non-finite coordinate {xk} on axis {axis}")));
            }
            let mut i = raw as i64;
            if a.periodic {
                i = i.rem_euclid(n);
            } else if !(0..n).contains(&i) {
                return Err(GridError::OutOfRange(format!(
                    "coordinate {xk} is not a grid point of axis {axis} ('{}')",
                    a.name
                )));
            }
            out.push(i as usize);
        }
        Ok(out)
    }

    /// Unchecked corner coordinates; callers validate `indices`.
    #[inline]
    pub(crate) fn corner(&self, indices: &[usize]) -> Vec<f64> {
        self.axes
            .iter()
            .zip(indices)
            .map(|(a, &i)| a.min + i as f64 * a.bin_width)
            .collect()
    }
}

//===================================================================
// --------------------------- Neighbors ----------------------------
//===================================================================

impl IndexCodec {
    /// Per-axis candidate indices for a window of half-width `width` around `center`.
    ///
    /// Periodic axes wrap and drop repeats (a window wider than the axis covers
    /// it once); non-periodic axes drop candidates outside `[0, npoints)`.
    /// `width` is capped at the axis length, so any support radius is valid.
    fn axis_window(&self, axis: usize, center: usize, width: usize) -> Vec<usize> {
        let n = self.npoints[axis];
        let w = width.min(n);

        if !self.axes[axis].periodic {
            let lo = center.saturating_sub(w);
            let hi = center.saturating_add(w).min(n - 1);
            return (lo..=hi).collect();
        }

        // start at `center - w` (mod n) and walk upward, at most once around
        let count = w.saturating_mul(2).saturating_add(1).min(n);
        let start = (center as u128 + n as u128 - w as u128) % n as u128;
        (0..count)
            .map(|j| ((start + j as u128) % n as u128) as usize)
            .collect()
    }

    /// Flat indices of all cells within `±widths_k` of `center` on every axis,
    /// enumerated axis-0-fastest, without duplicates.
    pub fn neighbors(&self, center: &[usize], widths: &[usize]) -> Result<Vec<usize>> {
        self.check_rank(widths.len(), "neighbor widths")?;
        self.flat_index(center)?;

        let windows: Vec<Vec<usize>> = (0..self.dimension())
            .map(|k| self.axis_window(k, center[k], widths[k]))
            .collect();
        let total: usize = windows.iter().map(Vec::len).product();

        let mut out = Vec::with_capacity(total);
        let mut cursor = vec![0usize; self.dimension()];
        for _ in 0..total {
            let flat: usize = windows
                .iter()
                .zip(&cursor)
                .zip(&self.strides)
                .map(|((win, &c), &s)| win[c] * s)
                .sum();
            out.push(flat);
            // odometer increment, axis 0 fastest
            for (k, win) in windows.iter().enumerate() {
                cursor[k] += 1;
                if cursor[k] < win.len() {
                    break;
                }
                cursor[k] = 0;
            }
        }
        Ok(out)
    }

    #[inline]
    pub fn neighbors_of_flat(&self, flat: usize, widths: &[usize]) -> Result<Vec<usize>> {
        let idx = self.indices(flat)?;
        self.neighbors(&idx, widths)
    }

    #[inline]
    pub fn neighbors_of_point(&self, x: &[f64], widths: &[usize]) -> Result<Vec<usize>> {
        let idx = self.indices_of_point(x)?;
        self.neighbors(&idx, widths)
    }

    /// The `2^d` corners of the interpolation cell whose lower corner is `indices`,
    /// as `(corner_mask, flat)` pairs in binary-count order (bit `k` ↔ axis `k`).
    ///
    /// Upper corners wrap to 0 on periodic axes and are omitted past the last
    /// point of a non-periodic axis.
    pub(crate) fn spline_corners(&self, indices: &[usize]) -> Result<Vec<(usize, usize)>> {
        self.flat_index(indices)?;
        let d = self.dimension();
        let count = corner_count(d)?;
        let mut out = Vec::with_capacity(count.min(self.max_size));
        'corner: for mask in 0..count {
            let mut flat = 0usize;
            for k in 0..d {
                let mut i = indices[k] + ((mask >> k) & 1);
                if i == self.npoints[k] {
                    if !self.axes[k].periodic {
                        continue 'corner;
                    }
                    i = 0;
                }
                flat += i * self.strides[k];
            }
            out.push((mask, flat));
        }
        Ok(out)
    }

    /// Flat indices of the interpolation-cell corners (see `spline_corners`).
    pub fn spline_neighbors(&self, indices: &[usize]) -> Result<Vec<usize>> {
        Ok(self.spline_corners(indices)?.into_iter().map(|(_, flat)| flat).collect())
    }
}

/// `2^d`, or `Capacity` if it does not fit in `usize`.
#[inline]
pub(crate) fn corner_count(d: usize) -> Result<usize> {
    u32::try_from(d)
        .ok()
        .and_then(|d| 1usize.checked_shl(d))
        .ok_or_else(|| GridError::Capacity(format!("{d} axes give more than usize::MAX interpolation corners")))
}
