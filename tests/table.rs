// tests/table.rs

use std::io::Cursor;

use approx::assert_relative_eq;
use fes_grid::{AxisSpec, Grid, GridConfig, GridError, SparseGrid};

fn specs() -> Vec<AxisSpec> {
    vec![
        AxisSpec::new("x", "0", "1", 4, false),
        AxisSpec::new("phi", "-pi", "pi", 6, true),
    ]
}

fn numeric_specs() -> Vec<AxisSpec> {
    vec![
        AxisSpec::new("x", "0", "1", 4, false),
        AxisSpec::new("phi", "-3", "3", 6, true),
    ]
}

fn filled_dense(use_deriv: bool) -> Grid {
    let cfg = GridConfig::new("bias", numeric_specs()).with_deriv(use_deriv);
    let mut g: Grid = Grid::new(&cfg).unwrap();
    for k in 0..g.size() {
        let v = (k as f64 * 0.37).sin();
        if use_deriv {
            g.set_value_and_derivatives(k, v, &[k as f64, -(k as f64) / 3.0]).unwrap();
        } else {
            g.set_value(k, v).unwrap();
        }
    }
    g
}

fn to_text<S: fes_grid::Storage>(g: &Grid<S>) -> String {
    let mut buf = Vec::new();
    g.write_table(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn textual_bounds_must_be_numeric() {
    let cfg = GridConfig::new("bias", specs());
    assert!(matches!(Grid::<fes_grid::DenseStorage>::new(&cfg), Err(GridError::InvalidArgument(_))));
}

#[test]
fn header_lists_fields_and_axis_settings() {
    let text = to_text(&filled_dense(true));
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("#! FIELDS x phi bias der_x der_phi"));
    assert_eq!(lines.next(), Some("#! SET min_x 0"));
    assert_eq!(lines.next(), Some("#! SET max_x 1"));
    assert_eq!(lines.next(), Some("#! SET nbins_x 4"));
    assert_eq!(lines.next(), Some("#! SET periodic_x false"));
    assert_eq!(lines.next(), Some("#! SET min_phi -3"));

    // one blank line per sweep of axis 0
    let blanks = text.lines().filter(|l| l.trim().is_empty()).count();
    assert_eq!(blanks, 6);
    let rows = text.lines().filter(|l| !l.trim().is_empty() && !l.starts_with('#')).count();
    assert_eq!(rows, 30);
}

#[test]
fn dense_table_round_trips_with_derivatives() {
    let g = filled_dense(true);
    let text = to_text(&g);
    let back: Grid = Grid::create("bias", Cursor::new(text), Some(numeric_specs().as_slice()), false, true).unwrap();

    assert_eq!(back.header(), g.header());
    for k in 0..g.size() {
        let (a, da) = g.value_and_derivatives(k).unwrap();
        let (b, db) = back.value_and_derivatives(k).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-13);
        assert_relative_eq!(da[0], db[0], epsilon = 1e-12);
        assert_relative_eq!(da[1], db[1], epsilon = 1e-12);
    }
}

#[test]
fn sparse_table_writes_only_populated_cells() {
    let cfg = GridConfig::new("fes", numeric_specs());
    let mut g = SparseGrid::new(&cfg).unwrap();
    g.set_value(2, 0.5).unwrap();
    g.set_value(17, -1.5).unwrap();

    let text = to_text(&g);
    let rows = text.lines().filter(|l| !l.trim().is_empty() && !l.starts_with('#')).count();
    assert_eq!(rows, 2);

    let back = SparseGrid::read_table("fes", Cursor::new(text), false, false).unwrap();
    assert_eq!(back.populated(), 2);
    assert_relative_eq!(back.value(17).unwrap(), -1.5, epsilon = 1e-14);
    assert_eq!(back.value(3).unwrap(), 0.0);
}

#[test]
fn rows_use_wide_scientific_columns() {
    let mut g = SparseGrid::new(&GridConfig::new("fes", numeric_specs())).unwrap();
    g.set_value(2, 0.5).unwrap();

    let text = to_text(&g);
    let row = text.lines().find(|l| !l.starts_with('#') && !l.trim().is_empty()).unwrap();
    let expected = format!(" {:>24} {:>24} {:>24}", "5.000000000000000e-1", "-3.000000000000000e0", "5.000000000000000e-1");
    assert_eq!(row, expected);
}

#[test]
fn mismatched_expectations_are_schema_errors() {
    let text = to_text(&filled_dense(false));

    let mut wrong_bins = numeric_specs();
    wrong_bins[0].nbins = 5;
    let r = Grid::<fes_grid::DenseStorage>::create("bias", Cursor::new(text.clone()), Some(wrong_bins.as_slice()), false, false);
    assert!(matches!(r, Err(GridError::SchemaMismatch(_))));

    let mut wrong_max = numeric_specs();
    wrong_max[1].max = "3.5".into();
    let r = Grid::<fes_grid::DenseStorage>::create("bias", Cursor::new(text.clone()), Some(wrong_max.as_slice()), false, false);
    assert!(matches!(r, Err(GridError::SchemaMismatch(_))));

    // same numbers, different spelling
    let mut respelled = numeric_specs();
    respelled[1].min = "-3.0".into();
    assert!(Grid::<fes_grid::DenseStorage>::create("bias", Cursor::new(text.clone()), Some(respelled.as_slice()), false, false).is_ok());

    // no derivative columns in the table
    let r = Grid::<fes_grid::DenseStorage>::create("bias", Cursor::new(text.clone()), None, false, true);
    assert!(matches!(r, Err(GridError::SchemaMismatch(_))));

    // unknown value field
    let r = Grid::<fes_grid::DenseStorage>::create("other", Cursor::new(text), None, false, false);
    assert!(matches!(r, Err(GridError::SchemaMismatch(_))));
}

#[test]
fn malformed_tables_are_parse_errors() {
    let missing_set = "#! FIELDS x f\n#! SET min_x 0\n#! SET max_x 1\n0 1\n";
    let r = Grid::<fes_grid::DenseStorage>::read_table("f", Cursor::new(missing_set), false, false);
    assert!(matches!(r, Err(GridError::Parse(_))));

    let bad_number = "#! FIELDS x f\n#! SET min_x 0\n#! SET max_x 1\n#! SET nbins_x 2\n#! SET periodic_x false\n0 abc\n";
    let r = Grid::<fes_grid::DenseStorage>::read_table("f", Cursor::new(bad_number), false, false);
    assert!(matches!(r, Err(GridError::Parse(_))));
}

#[test]
fn config_loads_from_json_with_defaults() {
    let cfg = GridConfig::from_json_str(
        r#"{ "label": "bias", "axes": [ { "name": "x", "min": "0", "max": "1", "nbins": 4 } ], "use_spline": true }"#,
    )
    .unwrap();
    assert!(cfg.use_spline);
    assert!(!cfg.use_deriv);
    assert!(!cfg.axes[0].periodic);
    assert_eq!(cfg.capacity_limit, fes_grid::DEFAULT_CAPACITY_LIMIT);
}

#[test]
fn json_dump_contains_header_and_entries() {
    let mut g = SparseGrid::new(&GridConfig::new("fes", numeric_specs())).unwrap();
    g.set_value(4, 1.0).unwrap();

    let path = std::env::temp_dir().join(format!("fes_grid_dump_{}.json", std::process::id()));
    g.save_json(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["header"]["label"], "fes");
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
    assert_eq!(json["entries"][0]["index"], 4);
}
