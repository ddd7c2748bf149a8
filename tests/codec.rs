// tests/codec.rs

use fes_grid::{AxisDescriptor, GridError, IndexCodec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// x: [0, 1], 4 bins, non-periodic (5 points); y: [-1, 1), 8 bins, periodic (8 points).
fn codec_2d() -> IndexCodec {
    IndexCodec::new(vec![
        AxisDescriptor::new("x", "0", "1", 4, false).unwrap(),
        AxisDescriptor::new("y", "-1", "1", 8, true).unwrap(),
    ])
    .unwrap()
}

#[test]
fn geometry_and_strides() {
    let c = codec_2d();
    assert_eq!(c.dimension(), 2);
    assert_eq!(c.npoints(), &[5, 8]);
    assert_eq!(c.strides(), &[1, 5]);
    assert_eq!(c.max_size(), 40);
    assert_eq!(c.bin_volume(), 0.25 * 0.25);
}

#[test]
fn index_vector_round_trip() {
    let c = codec_2d();
    for i in 0..5 {
        for j in 0..8 {
            let k = c.flat_index(&[i, j]).unwrap();
            assert_eq!(k, i + 5 * j);
            assert_eq!(c.indices(k).unwrap(), vec![i, j]);
        }
    }
}

#[test]
fn point_round_trip_non_periodic() {
    let c = IndexCodec::new(vec![
        AxisDescriptor::new("a", "-2", "3", 10, false).unwrap(),
        AxisDescriptor::new("b", "0", "1", 4, false).unwrap(),
        AxisDescriptor::new("c", "1", "2", 2, false).unwrap(),
    ])
    .unwrap();
    for k in 0..c.max_size() {
        let p = c.point(k).unwrap();
        let idx = c.indices_of_point(&p).unwrap();
        assert_eq!(c.flat_index(&idx).unwrap(), k, "point {p:?}");
    }
}

#[test]
fn random_index_round_trip() {
    let c = codec_2d();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let idx = vec![rng.random_range(0..5), rng.random_range(0..8)];
        let k = c.flat_index(&idx).unwrap();
        assert_eq!(c.indices(k).unwrap(), idx);
    }
}

#[test]
fn periodic_coordinates_wrap() {
    let c = IndexCodec::new(vec![AxisDescriptor::new("phi", "0", "1", 4, true).unwrap()]).unwrap();
    assert_eq!(c.indices_of_point(&[1.05]).unwrap(), c.indices_of_point(&[0.05]).unwrap());
    assert_eq!(c.indices_of_point(&[-0.2]).unwrap(), vec![3]);
    assert_eq!(c.indices_of_point(&[1.0]).unwrap(), vec![0]);
}

#[test]
fn coordinates_bin_by_floor_and_edges_clamp() {
    let c = codec_2d();
    assert_eq!(c.indices_of_point(&[0.3, -0.9]).unwrap(), vec![1, 0]);
    assert_eq!(c.indices_of_point(&[1.0, 0.0]).unwrap(), vec![4, 4]);
    assert_eq!(c.snap_point(&[0.3, 0.1]).unwrap(), vec![0.25, 0.0]);
}

#[test]
fn out_of_range_is_reported() {
    let c = codec_2d();
    assert!(matches!(c.flat_index(&[5, 0]), Err(GridError::OutOfRange(_))));
    assert!(matches!(c.indices(40), Err(GridError::OutOfRange(_))));
    assert!(matches!(c.indices_of_point(&[1.5, 0.0]), Err(GridError::OutOfRange(_))));
    assert!(matches!(c.indices_of_point(&[-0.5, 0.0]), Err(GridError::OutOfRange(_))));
    assert!(matches!(c.flat_index(&[0]), Err(GridError::InvalidArgument(_))));
}

#[test]
fn neighbors_wrap_clip_and_keep_order() {
    let c = codec_2d();
    // x clipped at 0, y wraps 7 -> 0 -> 1; axis 0 fastest
    assert_eq!(c.neighbors(&[0, 0], &[1, 1]).unwrap(), vec![35, 36, 0, 1, 5, 6]);
    assert_eq!(c.neighbors(&[2, 3], &[0, 0]).unwrap(), vec![2 + 15]);
}

#[test]
fn wide_periodic_window_has_no_duplicates() {
    let c = codec_2d();
    let n = c.neighbors(&[2, 0], &[0, 10]).unwrap();
    assert_eq!(n.len(), 8);
    let mut sorted = n.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 8);

    let full = c.neighbors(&[2, 4], &[10, 10]).unwrap();
    assert_eq!(full.len(), 40);
}

#[test]
fn unbounded_widths_are_capped_at_the_axis_length() {
    let c = codec_2d();
    assert_eq!(c.neighbors(&[0, 0], &[usize::MAX, 0]).unwrap(), vec![0, 1, 2, 3, 4]);

    let all = c.neighbors(&[2, 3], &[usize::MAX, usize::MAX]).unwrap();
    let mut sorted = all.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..40).collect::<Vec<_>>());
}

#[test]
fn spline_neighbors_interior_and_edges() {
    let c = codec_2d();
    assert_eq!(c.spline_neighbors(&[1, 2]).unwrap(), vec![11, 12, 16, 17]);
    // x upper corner dropped (non-periodic), y upper corner wraps to 0
    assert_eq!(c.spline_neighbors(&[4, 7]).unwrap(), vec![39, 4]);
}

#[test]
fn construction_validates_axes() {
    assert!(matches!(AxisDescriptor::new("x", "0", "1", 0, false), Err(GridError::InvalidArgument(_))));
    assert!(matches!(AxisDescriptor::new("x", "1", "0", 4, false), Err(GridError::InvalidArgument(_))));
    assert!(matches!(AxisDescriptor::new("x", "zero", "1", 4, false), Err(GridError::InvalidArgument(_))));
    assert!(matches!(IndexCodec::new(Vec::new()), Err(GridError::InvalidArgument(_))));

    let a = AxisDescriptor::new("x", " -3.5 ", "0.5", 8, false).unwrap();
    assert_eq!(a.min, -3.5);
    assert_eq!(a.str_min, "-3.5");
    assert_eq!(a.bin_width, 0.5);
    assert_eq!(a.npoints(), 9);
}
