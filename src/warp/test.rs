use approx::assert_relative_eq;

use crate::raster::{Extent, Kind, Origin, Raster};
use crate::warp::{reduce, reproject, resample, threshold, AlignmentError, Reduction, Resampling, Stack};

fn grid(values: Vec<f64>, (rows, cols): (usize, usize), extent: Extent) -> Raster {
    Raster::new(values, (rows, cols, 1), extent, Origin::Upper).unwrap()
}

fn unit(rows: usize, cols: usize) -> Extent {
    Extent::new(0.0, cols as f64, 0.0, rows as f64).unwrap()
}

fn mask(values: [f64; 4]) -> Raster {
    threshold(&grid(values.map(|v| 1.0 - v).to_vec(), (2, 2), unit(2, 2)), 0.5)
}

#[test_log::test]
fn reprojected_layers_take_the_reference_shape() {
    let reference = grid(vec![0.0; 12], (3, 4), unit(3, 4));
    let coarse = grid(vec![1.0, 2.0, 3.0, 4.0], (2, 2), unit(3, 4));
    let fine = grid((0..48).map(f64::from).collect(), (6, 8), unit(3, 4));

    let stack = reproject(&reference, &[&coarse, &fine], Resampling::Bilinear).unwrap();

    assert_eq!(stack.len(), 2);
    for layer in stack.layers() {
        assert_eq!(layer.shape(), reference.shape());
        assert!(layer.is_congruent(&reference));
    }
}

#[test]
fn cells_outside_the_source_become_nan() {
    let reference = grid(vec![0.0; 4], (1, 4), Extent::new(0.0, 4.0, 0.0, 1.0).unwrap());
    let source = grid(vec![5.0, 6.0], (1, 2), Extent::new(0.0, 2.0, 0.0, 1.0).unwrap());

    let warped = resample(&reference, &source, Resampling::Nearest);

    assert_eq!(&warped.data()[..2], &[5.0, 6.0]);
    assert!(warped.data()[2..].iter().all(|v| v.is_nan()));
}

#[test]
fn bilinear_interpolates_between_centres() {
    let source = grid(vec![0.0, 10.0], (1, 2), Extent::new(0.0, 2.0, 0.0, 1.0).unwrap());
    let reference = grid(vec![0.0; 4], (1, 4), Extent::new(0.0, 2.0, 0.0, 1.0).unwrap());

    let warped = resample(&reference, &source, Resampling::Bilinear);

    // Centres at x = 0.25 and 1.75 sit past the outer source centres.
    assert_relative_eq!(warped.data()[0], 0.0);
    assert_relative_eq!(warped.data()[1], 2.5);
    assert_relative_eq!(warped.data()[2], 7.5);
    assert_relative_eq!(warped.data()[3], 10.0);
}

#[test]
fn bilinear_keeps_unreachable_cells_unreachable() {
    let source = grid(vec![5.0, f64::INFINITY], (1, 2), Extent::new(0.0, 2.0, 0.0, 1.0).unwrap());
    let reference = grid(vec![0.0; 4], (1, 4), Extent::new(0.0, 2.0, 0.0, 1.0).unwrap());

    let warped = resample(&reference, &source, Resampling::Bilinear);

    assert_eq!(warped.data(), &[5.0, 5.0, f64::INFINITY, f64::INFINITY]);
}

#[test]
fn masks_stay_masks_when_warped() {
    let source = mask([1.0, 0.0, 0.0, 1.0]);
    let reference = grid(vec![0.0; 16], (4, 4), unit(2, 2));

    let warped = resample(&reference, &source, Resampling::Bilinear);

    assert_eq!(warped.kind(), Kind::Mask);
    assert!(warped.data().iter().all(|v| *v == 0.0 || *v == 1.0));
}

#[test]
fn composite_and_of_two_masks() {
    let a = mask([1.0, 0.0, 1.0, 1.0]);
    let b = mask([1.0, 1.0, 0.0, 1.0]);

    let stack = Stack::new(vec![a, b]).unwrap();
    let both = reduce(&stack, Reduction::All);

    assert_eq!(both.kind(), Kind::Mask);
    assert_eq!(both.data(), &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn min_and_mean_skip_nan() {
    let extent = unit(1, 3);
    let a = grid(vec![1.0, f64::NAN, f64::NAN], (1, 3), extent);
    let b = grid(vec![3.0, 4.0, f64::NAN], (1, 3), extent);
    let stack = Stack::new(vec![a, b]).unwrap();

    let min = stack.reduce(Reduction::Min);
    assert_eq!(&min.data()[..2], &[1.0, 4.0]);
    assert!(min.data()[2].is_nan());

    let mean = stack.reduce(Reduction::Mean);
    assert_eq!(&mean.data()[..2], &[2.0, 4.0]);
    assert!(mean.data()[2].is_nan());

    // NaN is false under AND.
    assert_eq!(stack.reduce(Reduction::All).data(), &[1.0, 0.0, 0.0]);
}

#[test]
fn combining_unaligned_rasters_is_rejected() {
    let a = grid(vec![0.0; 4], (2, 2), unit(2, 2));
    let b = grid(vec![0.0; 6], (2, 3), unit(2, 3));

    assert!(matches!(Stack::new(vec![a.clone(), b]), Err(AlignmentError::Incongruent { .. })));
    assert!(matches!(Stack::new(vec![a.clone(), a.with_origin(Origin::Lower)]), Err(AlignmentError::Incongruent { .. })));
    assert!(matches!(Stack::new(Vec::new()), Err(AlignmentError::EmptyStack)));
}

#[test]
fn threshold_is_idempotent() {
    let field = grid(vec![1.0, 10.0, f64::NAN, f64::INFINITY], (2, 2), unit(2, 2));

    let once = threshold(&field, 5.0);
    let twice = threshold(&once, 5.0);

    assert_eq!(once.data(), &[1.0, 0.0, 0.0, 0.0]);
    assert_eq!(once, twice);
}

#[test]
fn masks_pass_through_any_cutoff() {
    let passing = mask([1.0, 0.0, 0.0, 1.0]);
    assert_eq!(passing.data(), &[1.0, 0.0, 0.0, 1.0]);

    for cutoff in [0.0, 0.5, 1.0, 2.0] {
        assert_eq!(threshold(&passing, cutoff), passing);
    }

    // A continuous field of the same values is compared.
    let field = grid(vec![1.0, 0.0, 0.0, 1.0], (2, 2), unit(2, 2));
    assert_eq!(threshold(&field, 0.5).data(), &[0.0, 1.0, 1.0, 0.0]);
}
