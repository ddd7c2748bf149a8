// src/grid/interpolate.rs
/*!
Coordinate-based reads.

Without spline support a coordinate read returns the value of the cell that
contains it. With spline support the field is interpolated **multilinearly**
over the `2^d` corners of that cell:

- `t_k = (x_k - corner_k) / dx_k ∈ [0, 1]`
- `w_c = Π_k (bit_k(c) ? t_k : 1 - t_k)`
- `f(x) = Σ_c w_c v_c`
- `∂f/∂x_k = Σ_c v_c · (bit_k(c) ? 1 : -1) / dx_k · Π_{j≠k} (bit_j(c) ? t_j : 1 - t_j)`

The gradient is that of the interpolant itself; the scheme is multilinear,
not cubic, so it is continuous in value but not in gradient across cells.
*/

use crate::error::{GridError, Result};
use crate::store::storage_trait::Storage;

use super::Grid;

impl<S: Storage> Grid<S> {
    /// Field value at coordinate `x`.
    pub fn value_at(&self, x: &[f64]) -> Result<f64> {
        let idx = self.codec.indices_of_point(x)?;
        if !self.use_spline {
            return Ok(self.store.value(self.codec.compose(&idx)));
        }
        let (value, _) = self.multilinear(x, &idx, false)?;
        Ok(value)
    }

    /// Interpolated value and gradient at coordinate `x`.
    ///
    /// Requires both spline support and derivative tracking.
    pub fn value_and_derivatives_at(&self, x: &[f64]) -> Result<(f64, Vec<f64>)> {
        if !self.use_spline {
            return Err(GridError::Unsupported(format!(
                "value_and_derivatives_at: grid '{}' was built without spline interpolation",
                self.label
            )));
        }
        self.require_deriv("value_and_derivatives_at")?;
        let idx = self.codec.indices_of_point(x)?;
        self.multilinear(x, &idx, true)
    }

    fn multilinear(&self, x: &[f64], idx: &[usize], with_grad: bool) -> Result<(f64, Vec<f64>)> {
        let d = self.dimension();

        // `x == max` on a non-periodic axis resolves to the last point, which has
        // no upper neighbor: interpolate in the last real cell with `t = 1`.
        let lower: Vec<usize> = self
            .axes()
            .iter()
            .zip(idx)
            .zip(self.npoints())
            .map(|((a, &i), &n)| if !a.periodic && i + 1 == n && n > 1 { i - 1 } else { i })
            .collect();

        // fractional offsets inside the cell
        let t: Vec<f64> = self
            .axes()
            .iter()
            .zip(x)
            .zip(&lower)
            .map(|((a, &xk), &i)| {
                let corner = a.min + i as f64 * a.bin_width;
                ((a.wrap(xk) - corner) / a.bin_width).clamp(0.0, 1.0)
            })
            .collect();
        let dx = self.dx();

        let mut value = 0.0;
        let mut grad = vec![0.0; if with_grad { d } else { 0 }];
        let mut factors = vec![0.0; d];

        for (mask, flat) in self.codec.spline_corners(&lower)? {
            for k in 0..d {
                factors[k] = if (mask >> k) & 1 == 1 { t[k] } else { 1.0 - t[k] };
            }
            let v = self.store.value(flat);
            value += v * factors.iter().product::<f64>();

            if with_grad {
                for k in 0..d {
                    let sign = if (mask >> k) & 1 == 1 { 1.0 } else { -1.0 };
                    let others: f64 = factors
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != k)
                        .map(|(_, f)| f)
                        .product();
                    grad[k] += v * sign / dx[k] * others;
                }
            }
        }
        Ok((value, grad))
    }
}
