// tests/projection.rs

use approx::assert_relative_eq;
use fes_grid::{AxisSpec, Grid, GridConfig, GridError, SparseGrid, WeightBase};

/// 2×2 points: two periodic axes of two bins each.
fn uniform_2x2() -> Grid {
    let cfg = GridConfig::new(
        "p",
        vec![AxisSpec::new("x", "0", "1", 2, true), AxisSpec::new("y", "0", "1", 2, true)],
    );
    let mut g: Grid = Grid::new(&cfg).unwrap();
    for k in 0..g.size() {
        g.set_value(k, 1.0).unwrap();
    }
    g
}

#[test]
fn probability_projection_of_uniform_grid() {
    let g = uniform_2x2();
    let p = g.project(&["x"], WeightBase::probability(1.0)).unwrap();
    assert_eq!(p.dimension(), 1);
    assert_eq!(p.arg_names(), vec!["x"]);
    assert_eq!(p.size(), 2);
    for k in 0..2 {
        assert_relative_eq!(p.value(k).unwrap(), -(2.0f64).ln(), epsilon = 1e-14);
    }
    // source untouched
    assert_eq!(g.value(3).unwrap(), 1.0);
}

#[test]
fn bias_projection_is_log_sum_exp() {
    let cfg = GridConfig::new(
        "bias",
        vec![AxisSpec::new("x", "0", "1", 2, false), AxisSpec::new("y", "0", "1", 1, false)],
    );
    let mut g: Grid = Grid::new(&cfg).unwrap();
    // x has 3 points, y has 2
    let vals = [0.5, -1.0, 2.0, 0.0, 1.5, -0.25];
    for (k, v) in vals.iter().enumerate() {
        g.set_value(k, *v).unwrap();
    }

    let beta = 0.7;
    let p = g.project(&["y"], WeightBase::bias(beta)).unwrap();
    assert_eq!(p.size(), 2);
    for j in 0..2 {
        let s: f64 = (0..3).map(|i| (beta * vals[i + 3 * j]).exp()).sum();
        assert_relative_eq!(p.value(j).unwrap(), -s.ln() / beta, epsilon = 1e-12);
    }
}

#[test]
fn keeping_every_axis_permutes_and_negates_under_bias_weight() {
    let cfg = GridConfig::new(
        "bias",
        vec![AxisSpec::new("a", "0", "3", 3, false), AxisSpec::new("b", "0", "1", 4, true)],
    );
    let mut g: Grid = Grid::new(&cfg).unwrap();
    for k in 0..g.size() {
        g.set_value(k, 0.1 * k as f64).unwrap();
    }
    let p = g.project(&["b", "a"], WeightBase::bias(2.0)).unwrap();
    assert_eq!(p.arg_names(), vec!["b", "a"]);
    assert_eq!(p.npoints(), &[4, 4]);
    for i in 0..4 {
        for j in 0..4 {
            let src = g.value_at_indices(&[i, j]).unwrap();
            // single-cell fold: -(1/β)·ln(exp(β·v)) = -v
            assert_relative_eq!(p.value_at_indices(&[j, i]).unwrap(), -src, epsilon = 1e-12);
        }
    }
}

#[test]
fn projected_grid_keeps_axis_geometry() {
    let cfg = GridConfig::new(
        "bias",
        vec![
            AxisSpec::new("x", "-1", "1", 4, false),
            AxisSpec::new("y", "0", "6.283185307179586", 10, true),
            AxisSpec::new("z", "0", "1", 2, false),
        ],
    )
    .with_spline(true)
    .with_deriv(true);
    let g: Grid = Grid::new(&cfg).unwrap();
    let p = g.project(&["y", "z"], WeightBase::probability(1.0)).unwrap();
    assert_eq!(p.axes()[0], g.axes()[1]);
    assert_eq!(p.axes()[1], g.axes()[2]);
    assert!(!p.uses_spline());
    assert!(!p.uses_deriv());
}

#[test]
fn sparse_sources_contribute_zero_for_absent_cells() {
    let cfg = GridConfig::new(
        "bias",
        vec![AxisSpec::new("x", "0", "1", 3, true), AxisSpec::new("y", "0", "1", 2, true)],
    );
    let mut g = SparseGrid::new(&cfg).unwrap();
    g.set_value_at_indices(&[1, 0], 2.0).unwrap();

    let p = g.project(&["y"], WeightBase::bias(1.0)).unwrap();
    // y = 0: exp(0) + exp(2) + exp(0); y = 1: three absent cells
    assert_relative_eq!(p.value(0).unwrap(), -(2.0 + 2.0f64.exp()).ln(), epsilon = 1e-12);
    assert_relative_eq!(p.value(1).unwrap(), -(3.0f64).ln(), epsilon = 1e-12);
}

#[test]
fn invalid_projections_are_rejected() {
    let g = uniform_2x2();
    let w = WeightBase::probability(1.0);
    assert!(matches!(g.project(&[], w), Err(GridError::InvalidArgument(_))));
    assert!(matches!(g.project(&["q"], w), Err(GridError::InvalidArgument(_))));
    assert!(matches!(g.project(&["x", "x"], w), Err(GridError::InvalidArgument(_))));
    assert!(matches!(g.project(&["x"], WeightBase::bias(0.0)), Err(GridError::InvalidArgument(_))));
}

#[test]
fn weight_steps() {
    let b = WeightBase::bias(2.0);
    assert_relative_eq!(b.inner_step(1.0, 0.5), 1.0 + 1.0f64.exp(), epsilon = 1e-14);
    assert_relative_eq!(b.outer_transform(std::f64::consts::E), -0.5, epsilon = 1e-14);

    let p = WeightBase::probability(0.5);
    assert_eq!(p.inner_step(1.0, 0.5), 1.5);
    assert_relative_eq!(p.outer_transform(std::f64::consts::E), -2.0, epsilon = 1e-14);
    assert_eq!(p.beta(), 0.5);
}
