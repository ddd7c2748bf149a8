// src/space/axis.rs
/*!
Per-axis metadata for a rectilinear grid.

- `AxisSpec`: construction input as it comes out of a config/parser
  (bounds still textual, but already numeric-parseable).
- `AxisDescriptor`: validated axis with numeric bounds and derived bin width.

Conventions
-----------
- `bin_width = (max - min) / nbins` for both periodic and non-periodic axes.
- Non-periodic axes carry `nbins + 1` grid points (fence-post), periodic axes
  carry `nbins` because `min` and `max` are identified.
*/

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

// ===================================================================
// ---------------------------- Axis Spec ----------------------------
// ===================================================================

/// Unvalidated axis description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub name: String,
    pub min: String,
    pub max: String,
    pub nbins: usize,
    #[serde(default)]
    pub periodic: bool,
}

impl AxisSpec {
    pub fn new(name: impl Into<String>, min: impl Into<String>, max: impl Into<String>, nbins: usize, periodic: bool) -> Self {
        Self { name: name.into(), min: min.into(), max: max.into(), nbins, periodic }
    }

    /// Validate and convert into an `AxisDescriptor`.
    #[inline]
    pub fn build(&self) -> Result<AxisDescriptor> {
        AxisDescriptor::new(&self.name, &self.min, &self.max, self.nbins, self.periodic)
    }
}

// ===================================================================
// ------------------------- Axis Descriptor -------------------------
// ===================================================================

/// A validated grid axis.
///
/// # Invariants
/// - `nbins >= 1`, `max > min`, both finite.
/// - `bin_width == (max - min) / nbins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    pub name: String,
    /// Bounds exactly as supplied, kept for headers.
    pub str_min: String,
    pub str_max: String,
    pub min: f64,
    pub max: f64,
    pub nbins: usize,
    pub bin_width: f64,
    pub periodic: bool,
}

impl AxisDescriptor {
    pub fn new(name: &str, min: &str, max: &str, nbins: usize, periodic: bool) -> Result<Self> {
        let lo = parse_bound(name, "min", min)?;
        let hi = parse_bound(name, "max", max)?;
        if nbins == 0 {
            return Err(GridError::InvalidArgument(format!("axis '{name}': nbins must be >= 1")));
        }
        if !periodic && nbins == usize::MAX {
            return Err(GridError::Capacity(format!("axis '{name}': point count nbins + 1 overflows usize")));
        }
        if hi <= lo {
            return Err(GridError::InvalidArgument(format!(
                "axis '{name}': max ({hi}) must be greater than min ({lo})"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            str_min: min.trim().to_string(),
            str_max: max.trim().to_string(),
            min: lo,
            max: hi,
            nbins,
            bin_width: (hi - lo) / nbins as f64,
            periodic,
        })
    }

    /// Number of grid points along this axis.
    #[inline(always)]
    pub fn npoints(&self) -> usize {
        if self.periodic { self.nbins } else { self.nbins + 1 }
    }

    /// Domain length `max - min`.
    #[inline(always)]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Wrap a coordinate into `[min, max)` (identity on non-periodic axes).
    #[inline]
    pub fn wrap(&self, x: f64) -> f64 {
        if !self.periodic {
            return x;
        }
        let span = self.span();
        let w = self.min + (x - self.min).rem_euclid(span);
        // rem_euclid can round up to exactly `span`
        if w >= self.max { self.min } else { w }
    }

    /// Same bounds, bins and periodicity (names and textual forms ignored).
    pub fn same_geometry(&self, other: &AxisDescriptor) -> bool {
        self.nbins == other.nbins
            && self.periodic == other.periodic
            && approx_same(self.min, other.min)
            && approx_same(self.max, other.max)
    }
}

#[inline]
fn parse_bound(axis: &str, which: &str, s: &str) -> Result<f64> {
    let v: f64 = s.trim().parse().map_err(|_| {
        GridError::InvalidArgument(format!("axis '{axis}': cannot parse {which} bound '{s}'"))
    })?;
    if !v.is_finite() {
        return Err(GridError::InvalidArgument(format!("axis '{axis}': {which} bound must be finite")));
    }
    Ok(v)
}

#[inline]
pub(crate) fn approx_same(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}
