// src/space/kernel.rs
/*!
Deposition **kernels** accumulated onto grids by `Grid::add_kernel`.

A kernel is an opaque object exposing:
- its center coordinate,
- a per-axis support radius in **bins** (given the grid's bin widths),
- `evaluate(x) -> (value, gradient)`.

The grid only ever calls `evaluate` once per candidate cell inside the
support window, and never normalizes the result.

Shipped kernels
---------------
- `GaussianKernel`: `h · exp(-½ Σ_k (Δ_k/σ_k)²)`, truncated at
  `Σ (Δ/σ)² >= DP2_CUTOFF`. Periodic axes use minimum-image differences.
- `UniformKernel`: flat top-hat of height `h` on `|Δ_k| <= half_width_k`, zero gradient.
*/

use serde::{Deserialize, Serialize};

/// Squared-distance cutoff (in units of σ²) beyond which a Gaussian is zero.
pub const DP2_CUTOFF: f64 = 6.25;

// ======================================================================================
// ------------------------------------ Kernel Trait ------------------------------------
// ======================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Gaussian with per-axis widths. `periods[k] = Some(L)` marks axis `k` periodic with period `L`.
    Gaussian { center: Vec<f64>, sigma: Vec<f64>, height: f64, periods: Vec<Option<f64>> },

    /// Top-hat of height `height` on `|x_k - center_k| <= half_width_k`.
    Uniform { center: Vec<f64>, half_width: Vec<f64>, height: f64 },
}

pub trait Kernel: Send + Sync {
    /// Center coordinate.
    fn center(&self) -> &[f64];
    /// Support radius in bins along each axis.
    fn support(&self, bin_widths: &[f64]) -> Vec<usize>;
    /// Kernel value and gradient at `x`.
    fn evaluate(&self, x: &[f64]) -> (f64, Vec<f64>);
    fn kind(&self) -> KernelType;
    fn boxed_clone(&self) -> Box<dyn Kernel>;
}

impl Clone for Box<dyn Kernel> {
    #[inline]
    fn clone(&self) -> Self { self.boxed_clone() }
}

#[inline]
pub fn create_kernel(kernel_type: KernelType) -> Box<dyn Kernel> {
    match kernel_type {
        KernelType::Gaussian { center, sigma, height, periods } => {
            Box::new(GaussianKernel::new(center, sigma, height).with_periods(periods))
        }
        KernelType::Uniform { center, half_width, height } => {
            Box::new(UniformKernel::new(center, half_width, height))
        }
    }
}

#[inline]
fn bins_for(radius: f64, dx: f64) -> usize {
    (radius / dx).ceil().max(0.0) as usize
}

// ======================================================================================
// ---------------------------------- Concrete Kernels ----------------------------------
// ======================================================================================

/// Truncated Gaussian.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    center: Vec<f64>,
    sigma: Vec<f64>,
    height: f64,
    periods: Vec<Option<f64>>,
}

impl GaussianKernel {
    /// # Panics
    /// Panics if `center` and `sigma` lengths differ or any `σ <= 0`.
    #[inline]
    pub fn new(center: Vec<f64>, sigma: Vec<f64>, height: f64) -> Self {
        assert_eq!(center.len(), sigma.len(), "GaussianKernel: center/sigma rank mismatch");
        assert!(sigma.iter().all(|&s| s > 0.0), "GaussianKernel: require sigma > 0");
        let periods = vec![None; center.len()];
        Self { center, sigma, height, periods }
    }

    /// Mark axes periodic (`Some(period)`); uses minimum-image differences on those axes.
    pub fn with_periods(mut self, periods: Vec<Option<f64>>) -> Self {
        assert_eq!(periods.len(), self.center.len(), "GaussianKernel: periods rank mismatch");
        self.periods = periods;
        self
    }

    #[inline]
    pub fn height(&self) -> f64 { self.height }

    #[inline]
    pub fn sigma(&self) -> &[f64] { &self.sigma }

    #[inline]
    fn delta(&self, k: usize, x: f64) -> f64 {
        let d = x - self.center[k];
        match self.periods[k] {
            Some(p) => d - p * (d / p).round(),
            None => d,
        }
    }
}

impl Kernel for GaussianKernel {
    #[inline]
    fn center(&self) -> &[f64] { &self.center }

    fn support(&self, bin_widths: &[f64]) -> Vec<usize> {
        let cut = (2.0 * DP2_CUTOFF).sqrt();
        self.sigma
            .iter()
            .zip(bin_widths)
            .map(|(&s, &dx)| bins_for(cut * s, dx))
            .collect()
    }

    fn evaluate(&self, x: &[f64]) -> (f64, Vec<f64>) {
        debug_assert_eq!(x.len(), self.center.len());
        let scaled: Vec<f64> = (0..self.center.len())
            .map(|k| self.delta(k, x[k]) / self.sigma[k])
            .collect();
        let r2: f64 = scaled.iter().map(|u| u * u).sum();
        if r2 >= 2.0 * DP2_CUTOFF {
            return (0.0, vec![0.0; x.len()]);
        }
        let value = self.height * (-0.5 * r2).exp();
        let grad = scaled
            .iter()
            .zip(&self.sigma)
            .map(|(&u, &s)| -value * u / s)
            .collect();
        (value, grad)
    }

    #[inline]
    fn kind(&self) -> KernelType {
        KernelType::Gaussian {
            center: self.center.clone(),
            sigma: self.sigma.clone(),
            height: self.height,
            periods: self.periods.clone(),
        }
    }

    #[inline]
    fn boxed_clone(&self) -> Box<dyn Kernel> { Box::new(self.clone()) }
}

/// Flat top-hat.
#[derive(Debug, Clone)]
pub struct UniformKernel {
    center: Vec<f64>,
    half_width: Vec<f64>,
    height: f64,
}

impl UniformKernel {
    #[inline]
    pub fn new(center: Vec<f64>, half_width: Vec<f64>, height: f64) -> Self {
        assert_eq!(center.len(), half_width.len(), "UniformKernel: center/half_width rank mismatch");
        assert!(half_width.iter().all(|&w| w >= 0.0), "UniformKernel: require half_width >= 0");
        Self { center, half_width, height }
    }
}

impl Kernel for UniformKernel {
    #[inline]
    fn center(&self) -> &[f64] { &self.center }

    fn support(&self, bin_widths: &[f64]) -> Vec<usize> {
        self.half_width
            .iter()
            .zip(bin_widths)
            .map(|(&w, &dx)| bins_for(w, dx))
            .collect()
    }

    fn evaluate(&self, x: &[f64]) -> (f64, Vec<f64>) {
        let inside = x
            .iter()
            .zip(&self.center)
            .zip(&self.half_width)
            .all(|((&xk, &c), &w)| (xk - c).abs() <= w);
        let value = if inside { self.height } else { 0.0 };
        (value, vec![0.0; x.len()])
    }

    #[inline]
    fn kind(&self) -> KernelType {
        KernelType::Uniform {
            center: self.center.clone(),
            half_width: self.half_width.clone(),
            height: self.height,
        }
    }

    #[inline]
    fn boxed_clone(&self) -> Box<dyn Kernel> { Box::new(self.clone()) }
}
